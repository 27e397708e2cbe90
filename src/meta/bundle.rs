//! The immutable catalog bundle and the extension filter that scopes it to a
//! compilation target.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use crate::loader::TableSet;

use super::codec::CodecSet;
use super::csr::CsrCatalog;
use super::error::MetaError;
use super::instruction::InstructionCatalog;
use super::operand::{OperandCatalog, OperandId};

/// Everything parsed from the table directory, built once by [`MetaBundle::load`]
/// and passed by reference to each emitter. No hidden shared state: emitters
/// only ever see this value and their own output buffer.
#[derive(Debug)]
pub struct MetaBundle {
    pub operands: OperandCatalog,
    pub instructions: InstructionCatalog,
    pub codecs: CodecSet,
    /// Known extension names from the extensions table, used to flag likely
    /// target typos.
    pub extension_names: Vec<String>,
    pub csrs: CsrCatalog,
    digest_hex: String,
}

impl MetaBundle {
    /// Reads and parses the table directory in dependency order: operands
    /// before opcodes (opcode parsing needs operand names to distinguish
    /// references from constraints), everything before any emitter runs.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self, MetaError> {
        let tables = TableSet::read_dir(dir)?;
        Self::from_tables(&tables)
    }

    pub fn from_tables(tables: &TableSet) -> Result<Self, MetaError> {
        let operands = OperandCatalog::from_rows(tables.operands())?;
        let codecs = CodecSet::from_rows(tables.codecs());
        let instructions = InstructionCatalog::from_rows(tables.opcodes(), &operands, &codecs)?;
        let extension_names = tables
            .extensions()
            .iter()
            .filter_map(|row| row.tokens.first().cloned())
            .collect();
        let csrs = CsrCatalog::from_rows(tables.csrs())?;
        Ok(Self {
            operands,
            instructions,
            codecs,
            extension_names,
            csrs,
            digest_hex: tables.digest_hex(),
        })
    }

    /// Hex digest of the source tables, stamped into artifact headers.
    pub fn digest_hex(&self) -> &str {
        &self.digest_hex
    }

    /// Filters the bundle down to the instructions and operands in scope for
    /// `target`. The view is recomputed fresh on every call; nothing is
    /// cached between requests.
    pub fn compile(&self, target: &Target) -> CompiledModel<'_> {
        let inst_in_scope: Vec<bool> = self
            .instructions
            .iter()
            .map(|inst| inst.extension_tags.iter().any(|tag| target.includes_tag(tag)))
            .collect();
        let mut operand_in_scope = vec![false; self.operands.len()];
        for (inst, in_scope) in self.instructions.iter().zip(&inst_in_scope) {
            if *in_scope {
                for id in &inst.operand_refs {
                    operand_in_scope[id.index()] = true;
                }
            }
        }
        CompiledModel {
            bundle: self,
            inst_in_scope,
            operand_in_scope,
        }
    }

    /// Target letters whose `<base><letter>` name is absent from the
    /// extensions table; likely authoring typos worth warning about.
    pub fn unknown_target_extensions(&self, target: &Target) -> Vec<String> {
        target
            .extension_names()
            .into_iter()
            .filter(|name| !self.extension_names.iter().any(|known| known == name))
            .collect()
    }
}

/// A compilation target: base ISA name plus the set of extension letters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    base: String,
    letters: BTreeSet<char>,
}

impl Target {
    pub fn new(base: impl Into<String>, letters: &str) -> Self {
        Self {
            base: base.into(),
            letters: letters.chars().collect(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// True when `tag` starts with the base name and every remaining
    /// character is one of the requested extension letters.
    pub fn includes_tag(&self, tag: &str) -> bool {
        tag.strip_prefix(self.base.as_str())
            .is_some_and(|rest| rest.chars().all(|c| self.letters.contains(&c)))
    }

    /// `<base><letter>` names for each requested letter, in letter order.
    pub fn extension_names(&self) -> Vec<String> {
        self.letters
            .iter()
            .map(|letter| format!("{}{}", self.base, letter))
            .collect()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)?;
        for letter in &self.letters {
            write!(f, "{letter}")?;
        }
        Ok(())
    }
}

/// Read-only filtered view over a [`MetaBundle`]: which instructions and
/// operands are in scope for one compilation target.
pub struct CompiledModel<'a> {
    bundle: &'a MetaBundle,
    inst_in_scope: Vec<bool>,
    operand_in_scope: Vec<bool>,
}

impl<'a> CompiledModel<'a> {
    pub fn bundle(&self) -> &'a MetaBundle {
        self.bundle
    }

    /// Every catalog instruction in source order, flagged with its scope.
    /// Emitters that only care about in-scope rows filter on the flag; the
    /// constants backend also walks the out-of-scope remainder.
    pub fn instructions(&self) -> impl Iterator<Item = (&'a super::instruction::Instruction, bool)> {
        self.bundle
            .instructions
            .iter()
            .zip(self.inst_in_scope.iter().copied())
    }

    pub fn operand_in_scope(&self, id: OperandId) -> bool {
        self.operand_in_scope[id.index()]
    }

    /// In-scope operands in declaration order.
    pub fn scoped_operands(&self) -> impl Iterator<Item = (OperandId, &'a super::operand::Operand)> {
        self.bundle
            .operands
            .iter()
            .filter(|(id, _)| self.operand_in_scope[id.index()])
    }

    pub fn scoped_instruction_count(&self) -> usize {
        self.inst_in_scope.iter().filter(|flag| **flag).count()
    }
}
