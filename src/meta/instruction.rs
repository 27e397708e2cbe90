//! Opcode-row parsing: match/mask construction from bit constraints, operand
//! reference collection, and register/immediate role classification.

use smallvec::SmallVec;

use crate::loader::TableRow;

use super::codec::{CodecId, CodecSet};
use super::error::MetaError;
use super::operand::{OperandCatalog, OperandId};

/// A pair of 32-bit patterns where `mask_bits` marks constrained positions and
/// `match_bits` gives their required values; unmasked bits are don't-care.
/// Invariant: `match_bits & mask_bits == match_bits`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MatchMask {
    pub match_bits: u32,
    pub mask_bits: u32,
}

/// Register-file namespace an operand slot selects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegRole {
    Gpr,
    Fpu,
}

/// Immediate bit-layout shape classes recognized by the decode backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImmClass {
    U,
    UJ,
    I,
    S,
    SB,
    Z,
}

impl ImmClass {
    pub fn name(self) -> &'static str {
        match self {
            ImmClass::U => "U",
            ImmClass::UJ => "UJ",
            ImmClass::I => "I",
            ImmClass::S => "S",
            ImmClass::SB => "SB",
            ImmClass::Z => "Z",
        }
    }
}

/// Immediate-operand names in classification priority order. When a row
/// references more than one name the first listed here wins; the order is the
/// declared tie-break, not an accident of storage.
const IMM_CLASSES: [(&str, ImmClass); 10] = [
    ("imm20", ImmClass::U),
    ("oimm20", ImmClass::U),
    ("jimm20", ImmClass::UJ),
    ("imm12", ImmClass::I),
    ("oimm12", ImmClass::I),
    ("simm12", ImmClass::S),
    ("sbimm12", ImmClass::SB),
    ("zimm", ImmClass::Z),
    ("shamt5", ImmClass::I),
    ("shamt6", ImmClass::I),
];

const REG_SLOTS: [&str; 4] = ["rd", "rs1", "rs2", "rs3"];

/// Per-instruction operand roles consumed by the decode backends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RoleTuple {
    pub rd: Option<RegRole>,
    pub rs1: Option<RegRole>,
    pub rs2: Option<RegRole>,
    pub rs3: Option<RegRole>,
    pub imm: Option<ImmClass>,
}

impl RoleTuple {
    /// Derives roles from the referenced operand names. The lookup is by name
    /// pattern: an exact slot name selects the integer file, its `f`-prefixed
    /// variant the floating file, absence leaves the slot unused.
    pub fn classify(refs: &[OperandId], operands: &OperandCatalog) -> Self {
        let names: SmallVec<[&str; 6]> = refs
            .iter()
            .map(|id| operands.get(*id).name.as_str())
            .collect();
        let reg = |slot: &str| {
            if names.contains(&slot) {
                Some(RegRole::Gpr)
            } else if names.iter().any(|n| n.strip_prefix('f') == Some(slot)) {
                Some(RegRole::Fpu)
            } else {
                None
            }
        };
        let imm = IMM_CLASSES
            .iter()
            .find(|(name, _)| names.contains(name))
            .map(|(_, class)| *class);
        Self {
            rd: reg(REG_SLOTS[0]),
            rs1: reg(REG_SLOTS[1]),
            rs2: reg(REG_SLOTS[2]),
            rs3: reg(REG_SLOTS[3]),
            imm,
        }
    }
}

/// One real opcode row. Constructed once during catalog build; never mutated.
#[derive(Debug)]
pub struct Instruction {
    pub name: String,
    /// Referenced operands in declaration order.
    pub operand_refs: SmallVec<[OperandId; 6]>,
    pub pattern: MatchMask,
    pub codec: CodecId,
    /// `<base><letters>` tags naming the targets this row belongs to.
    pub extension_tags: Vec<String>,
    pub roles: RoleTuple,
}

/// Source-ordered instruction storage.
#[derive(Debug, Default)]
pub struct InstructionCatalog {
    items: Vec<Instruction>,
}

impl InstructionCatalog {
    /// Parses every real opcode row. Rows whose name contains `@` are
    /// pseudo/template entries and are skipped entirely.
    pub fn from_rows(
        rows: &[TableRow],
        operands: &OperandCatalog,
        codecs: &CodecSet,
    ) -> Result<Self, MetaError> {
        let mut catalog = Self::default();
        for row in rows {
            if let Some(inst) = parse_row(row, operands, codecs)? {
                catalog.items.push(inst);
            }
        }
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instruction> {
        self.items.iter()
    }

    pub fn get(&self, index: usize) -> &Instruction {
        &self.items[index]
    }
}

fn parse_row(
    row: &TableRow,
    operands: &OperandCatalog,
    codecs: &CodecSet,
) -> Result<Option<Instruction>, MetaError> {
    let name = row.tokens[0].clone();
    if name.contains('@') {
        return Ok(None);
    }

    let mut refs: SmallVec<[OperandId; 6]> = SmallVec::new();
    let mut pattern = MatchMask::default();
    let mut tokens = row.tokens[1..].iter();
    let codec = loop {
        let token = tokens
            .next()
            .ok_or_else(|| MetaError::UnterminatedRow {
                instruction: name.clone(),
            })?;
        if let Some(codec) = codecs.id_of(token) {
            break codec;
        }
        if let Some(id) = operands.id_of(token) {
            refs.push(id);
        } else {
            apply_constraint(&name, token, &mut pattern)?;
        }
    };
    let extension_tags: Vec<String> = tokens.cloned().collect();

    let roles = RoleTuple::classify(&refs, operands);
    Ok(Some(Instruction {
        name,
        operand_refs: refs,
        pattern,
        codec,
        extension_tags,
        roles,
    }))
}

/// Parses a `bits=value` constraint and folds it into the accumulated
/// match/mask pair. `value` may be `ignore` (a documented no-op) or an
/// integer literal in C-style radix notation.
fn apply_constraint(name: &str, token: &str, pattern: &mut MatchMask) -> Result<(), MetaError> {
    let malformed = || MetaError::MalformedConstraint {
        instruction: name.to_owned(),
        token: token.to_owned(),
    };
    let (bits, value) = token.split_once('=').ok_or_else(malformed)?;
    if value == "ignore" {
        return Ok(());
    }

    let (hi, lo) = match bits.split_once("..") {
        Some((hi, lo)) => (
            parse_position(hi).ok_or_else(malformed)?,
            parse_position(lo).ok_or_else(malformed)?,
        ),
        None => {
            let bit = parse_position(bits).ok_or_else(malformed)?;
            (bit, bit)
        }
    };
    if lo > hi {
        return Err(malformed());
    }

    let width = hi - lo + 1;
    let mask = (((1u64 << width) - 1) << lo) as u32;
    let value = parse_int(value).ok_or_else(malformed)?;
    let shifted = u64::from(value) << lo;
    let matched = shifted as u32;
    if shifted > u64::from(u32::MAX) || matched & mask != matched {
        return Err(MetaError::ConstraintValueTooWide {
            instruction: name.to_owned(),
            token: token.to_owned(),
        });
    }
    if pattern.mask_bits & mask != 0 {
        return Err(MetaError::ConflictingConstraint {
            instruction: name.to_owned(),
            token: token.to_owned(),
        });
    }
    pattern.mask_bits |= mask;
    pattern.match_bits |= matched;
    Ok(())
}

fn parse_position(token: &str) -> Option<u32> {
    let value: u32 = token.parse().ok()?;
    (value < 32).then_some(value)
}

fn parse_int(token: &str) -> Option<u32> {
    if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = token.strip_prefix("0b").or_else(|| token.strip_prefix("0B")) {
        u32::from_str_radix(bin, 2).ok()
    } else if let Some(oct) = token.strip_prefix("0o").or_else(|| token.strip_prefix("0O")) {
        u32::from_str_radix(oct, 8).ok()
    } else {
        token.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(tokens: &[&str]) -> TableRow {
        TableRow {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            line: 1,
        }
    }

    fn fixture() -> (OperandCatalog, CodecSet) {
        let operands = OperandCatalog::from_rows(&[
            row(&["rd", "11:7", "arg", "dst"]),
            row(&["rs1", "19:15", "arg", "src1"]),
            row(&["rs2", "24:20", "arg", "src2"]),
            row(&["frd", "11:7", "arg", "fp", "dst"]),
            row(&["frs1", "19:15", "arg", "fp", "src1"]),
            row(&["frs2", "24:20", "arg", "fp", "src2"]),
            row(&["rm", "14:12", "arg", "rounding"]),
            row(&["imm12", "31:20[11:0]", "simm", "immediate"]),
            row(&["sbimm12", "31[12],30:25[10:5],11:8[4:1],7[11]", "offset", "branch"]),
            row(&["shamt5", "24:20[4:0]", "uimm", "shift"]),
        ])
        .expect("operand fixture");
        let codecs = CodecSet::from_rows(&[
            row(&["i", "immediate"]),
            row(&["sb", "branch"]),
            row(&["r", "register"]),
            row(&["r.m", "register", "rounded"]),
        ]);
        (operands, codecs)
    }

    #[test]
    fn parses_match_mask_and_refs() {
        let (operands, codecs) = fixture();
        let catalog = InstructionCatalog::from_rows(
            &[row(&[
                "addi", "rd", "rs1", "imm12", "14..12=0", "6..2=0x04", "1..0=3", "i", "rv32i",
                "rv64i",
            ])],
            &operands,
            &codecs,
        )
        .expect("catalog");
        assert_eq!(catalog.len(), 1);
        let addi = catalog.get(0);
        assert_eq!(addi.pattern.mask_bits, 0x0000_707F);
        assert_eq!(addi.pattern.match_bits, 0x0000_0013);
        assert_eq!(
            addi.pattern.match_bits & addi.pattern.mask_bits,
            addi.pattern.match_bits,
            "every matched bit must lie within the mask"
        );
        assert_eq!(addi.operand_refs.len(), 3);
        assert_eq!(addi.extension_tags, vec!["rv32i", "rv64i"]);
        assert_eq!(codecs.name(addi.codec), "i");
    }

    #[test]
    fn classifies_branch_without_destination() {
        let (operands, codecs) = fixture();
        let catalog = InstructionCatalog::from_rows(
            &[row(&[
                "beq", "rs1", "rs2", "sbimm12", "14..12=0", "6..2=0x18", "1..0=3", "sb", "rv32i",
            ])],
            &operands,
            &codecs,
        )
        .expect("catalog");
        let beq = catalog.get(0).roles;
        assert_eq!(beq.rd, None, "branch has no destination role");
        assert_eq!(beq.rs1, Some(RegRole::Gpr));
        assert_eq!(beq.rs2, Some(RegRole::Gpr));
        assert_eq!(beq.imm, Some(ImmClass::SB));
    }

    #[test]
    fn classifies_floating_slots() {
        let (operands, codecs) = fixture();
        let catalog = InstructionCatalog::from_rows(
            &[row(&[
                "fadd.s", "frd", "frs1", "frs2", "rm", "31..27=0", "26..25=0", "6..2=0x14",
                "1..0=3", "r.m", "rv32f",
            ])],
            &operands,
            &codecs,
        )
        .expect("catalog");
        let roles = catalog.get(0).roles;
        assert_eq!(roles.rd, Some(RegRole::Fpu));
        assert_eq!(roles.rs1, Some(RegRole::Fpu));
        assert_eq!(roles.rs2, Some(RegRole::Fpu));
        assert_eq!(roles.rs3, None);
        assert_eq!(roles.imm, None, "rounding mode is not an immediate class");
    }

    #[test]
    fn immediate_priority_prefers_earlier_names() {
        let (operands, codecs) = fixture();
        // Contrived row referencing two immediate names; imm12 outranks shamt5.
        let catalog = InstructionCatalog::from_rows(
            &[row(&["weird", "rd", "shamt5", "imm12", "1..0=3", "i", "rv32i"])],
            &operands,
            &codecs,
        )
        .expect("catalog");
        assert_eq!(catalog.get(0).roles.imm, Some(ImmClass::I));
    }

    #[test]
    fn pseudo_rows_are_skipped() {
        let (operands, codecs) = fixture();
        let catalog = InstructionCatalog::from_rows(
            &[row(&["@nop", "rd", "rs1", "imm12", "1..0=3", "i", "rv32i"])],
            &operands,
            &codecs,
        )
        .expect("catalog");
        assert!(catalog.is_empty(), "rows named with '@' are templates");
    }

    #[test]
    fn ignore_constraint_claims_no_bits() {
        let (operands, codecs) = fixture();
        let catalog = InstructionCatalog::from_rows(
            &[row(&["fence", "31..28=ignore", "1..0=3", "i", "rv32i"])],
            &operands,
            &codecs,
        )
        .expect("catalog");
        assert_eq!(catalog.get(0).pattern.mask_bits, 0x0000_0003);
    }

    #[test]
    fn oversized_value_is_fatal() {
        let (operands, codecs) = fixture();
        let err = InstructionCatalog::from_rows(
            &[row(&["bad", "6..2=0x20", "i", "rv32i"])],
            &operands,
            &codecs,
        )
        .expect_err("0x20 needs six bits");
        assert!(matches!(err, MetaError::ConstraintValueTooWide { .. }));
    }

    #[test]
    fn overlapping_constraints_are_fatal() {
        let (operands, codecs) = fixture();
        let err = InstructionCatalog::from_rows(
            &[row(&["bad", "6..2=0x04", "4..0=1", "i", "rv32i"])],
            &operands,
            &codecs,
        )
        .expect_err("bit ranges overlap");
        assert!(matches!(err, MetaError::ConflictingConstraint { .. }));
    }

    #[test]
    fn unterminated_row_is_fatal() {
        let (operands, codecs) = fixture();
        let err = InstructionCatalog::from_rows(
            &[row(&["bad", "rd", "rs1", "1..0=3"])],
            &operands,
            &codecs,
        )
        .expect_err("no codec token");
        assert!(matches!(err, MetaError::UnterminatedRow { .. }));
    }

    #[test]
    fn unknown_reference_surfaces_as_malformed_constraint() {
        let (operands, codecs) = fixture();
        let err = InstructionCatalog::from_rows(
            &[row(&["bad", "rdx", "1..0=3", "i", "rv32i"])],
            &operands,
            &codecs,
        )
        .expect_err("rdx is neither operand, constraint, nor codec");
        assert!(matches!(err, MetaError::MalformedConstraint { .. }));
    }
}
