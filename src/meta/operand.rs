//! Operand definitions: one canonical extraction expression per declared
//! instruction-argument kind, keyed by name in declaration order.

use std::num::NonZeroU32;

use ahash::AHashMap;

use crate::loader::TableRow;

use super::bitfield::{BitLayout, Extend, ExtractionExpr};
use super::error::MetaError;

/// Dense handle into the [`OperandCatalog`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OperandId(NonZeroU32);

impl OperandId {
    fn from_index(index: usize) -> Self {
        let raw = NonZeroU32::new((index as u32) + 1).expect("operand index overflow");
        Self(raw)
    }

    pub fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

/// Operand kind column vocabulary. Signed and offset immediates sign-extend,
/// unsigned immediates zero-extend, everything else (plain register-index
/// fields and the like) is consumed raw.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperandKind {
    Signed,
    Offset,
    Unsigned,
    Other,
}

impl OperandKind {
    pub fn from_column(column: &str) -> Self {
        match column {
            "simm" => OperandKind::Signed,
            "offset" => OperandKind::Offset,
            "uimm" => OperandKind::Unsigned,
            _ => OperandKind::Other,
        }
    }

    pub fn is_immediate(self) -> bool {
        !matches!(self, OperandKind::Other)
    }

    pub fn extend(self) -> Extend {
        match self {
            OperandKind::Signed | OperandKind::Offset => Extend::Sign,
            OperandKind::Unsigned => Extend::Zero,
            OperandKind::Other => Extend::None,
        }
    }
}

/// One declared instruction-argument kind. Constructed once from its table
/// row; immutable thereafter.
#[derive(Debug)]
pub struct Operand {
    pub name: String,
    pub kind: OperandKind,
    pub expr: ExtractionExpr,
    pub description: String,
}

impl Operand {
    fn from_row(row: &TableRow) -> Result<Self, MetaError> {
        let name = row.tokens[0].clone();
        let spec = &row.tokens[1];
        let kind = OperandKind::from_column(&row.tokens[2]);
        let layout = BitLayout::parse(&name, spec)?;
        let expr = layout.compile(kind.extend());
        Ok(Self {
            name,
            kind,
            expr,
            description: row.tokens[3..].join(" "),
        })
    }
}

/// Declaration-ordered operand storage with a name lookup on the side, so
/// iteration always follows source order.
#[derive(Debug, Default)]
pub struct OperandCatalog {
    items: Vec<Operand>,
    lookup: AHashMap<String, OperandId>,
}

impl OperandCatalog {
    pub fn from_rows(rows: &[TableRow]) -> Result<Self, MetaError> {
        let mut catalog = Self::default();
        for row in rows {
            if row.tokens.len() < 3 {
                return Err(MetaError::MalformedBitSpec {
                    operand: row.tokens.first().cloned().unwrap_or_default(),
                    detail: format!("operands table line {} has too few columns", row.line),
                });
            }
            catalog.push(Operand::from_row(row)?);
        }
        Ok(catalog)
    }

    fn push(&mut self, operand: Operand) -> OperandId {
        let id = OperandId::from_index(self.items.len());
        self.lookup.insert(operand.name.clone(), id);
        self.items.push(operand);
        id
    }

    pub fn id_of(&self, name: &str) -> Option<OperandId> {
        self.lookup.get(name).copied()
    }

    pub fn get(&self, id: OperandId) -> &Operand {
        &self.items[id.index()]
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Operands in declaration order, paired with their handles.
    pub fn iter(&self) -> impl Iterator<Item = (OperandId, &Operand)> {
        self.items
            .iter()
            .enumerate()
            .map(|(index, operand)| (OperandId::from_index(index), operand))
    }
}
