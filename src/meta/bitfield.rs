//! Bit-layout algebra for operand fields: parses scatter specifications and
//! recombines them into minimal contiguous-run extraction expressions.
//!
//! Source tables describe immediates as scattered instruction bit groups (a
//! RISC encoding technique that keeps hardware field extraction cheap). The
//! compiler's job is to find the minimal sequence of contiguous instruction
//! slices that reconstructs the logical immediate value, because every slice
//! becomes one extraction operation in each downstream backend.

use smallvec::SmallVec;

use super::error::MetaError;

/// Width of the instruction word all layouts are expressed against.
pub const INST_BITS: u8 = 32;

/// Extension applied around an extraction expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Extend {
    None,
    Sign,
    Zero,
}

/// One piece of an extraction expression, most-significant first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Segment {
    /// A contiguous instruction-bit slice `inst[hi:lo]` (inclusive, `hi >= lo`).
    Slice { hi: u8, lo: u8 },
    /// A literal zero fill of `width` bits.
    Zero { width: u8 },
}

impl Segment {
    pub fn width(&self) -> u8 {
        match self {
            Segment::Slice { hi, lo } => hi - lo + 1,
            Segment::Zero { width } => *width,
        }
    }
}

/// Canonical recipe for reconstructing an operand value from instruction bits.
///
/// Built once at operand construction and immutable thereafter. Equality is
/// structural, so two operands with the same layout and extension policy share
/// one dispatch entry in the immediate backend.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ExtractionExpr {
    pub segments: SmallVec<[Segment; 4]>,
    pub extend: Extend,
}

impl ExtractionExpr {
    /// Direct single-slice expression for scalar (unscrambled) fields.
    pub fn scalar(hi: u8, lo: u8) -> Self {
        let mut segments = SmallVec::new();
        segments.push(Segment::Slice { hi, lo });
        Self {
            segments,
            extend: Extend::None,
        }
    }

    /// Total number of bits produced before any extension.
    pub fn data_width(&self) -> u8 {
        self.segments.iter().map(Segment::width).sum()
    }

    /// True when the expression is one contiguous slice with no zero fill.
    pub fn is_single_slice(&self) -> bool {
        self.segments.len() == 1 && matches!(self.segments[0], Segment::Slice { .. })
    }

    /// Reconstructs the immediate-position -> instruction-position mapping the
    /// expression encodes, walking segments most-significant first. Used to
    /// check the round-trip property against the declared layout.
    pub fn immediate_layout(&self) -> Vec<(u8, u8)> {
        let mut pairs = Vec::new();
        let mut cursor = self.data_width();
        for segment in &self.segments {
            match segment {
                Segment::Slice { hi, lo } => {
                    for inst_pos in (*lo..=*hi).rev() {
                        cursor -= 1;
                        pairs.push((cursor, inst_pos));
                    }
                }
                Segment::Zero { width } => cursor -= width,
            }
        }
        pairs
    }
}

/// A parsed bit-layout column: either one contiguous field or a scatter map
/// from immediate positions to instruction positions.
#[derive(Debug, PartialEq, Eq)]
pub enum BitLayout {
    Scalar { hi: u8, lo: u8 },
    Scatter(ScatterMap),
}

impl BitLayout {
    /// Parses an operands-table bit spec. Specs without brackets are scalar
    /// (`11:7`, `14:12`, `7`); bracketed specs are comma-separated fragments
    /// `instrange[immpos|immpos|...]` pairing instruction positions with the
    /// immediate positions they populate, left to right.
    pub fn parse(operand: &str, spec: &str) -> Result<Self, MetaError> {
        if !spec.contains('[') {
            let (hi, lo) = parse_inst_range(operand, spec)?;
            return Ok(BitLayout::Scalar { hi, lo });
        }
        let mut map = ScatterMap::new();
        for fragment in spec.split(',') {
            let (inst_part, rest) = fragment
                .split_once('[')
                .ok_or_else(|| malformed(operand, fragment, "missing '['"))?;
            let imm_part = rest
                .strip_suffix(']')
                .ok_or_else(|| malformed(operand, fragment, "missing ']'"))?;

            let mut inst_positions = Vec::new();
            let (hi, lo) = parse_inst_range(operand, inst_part)?;
            inst_positions.extend((lo..=hi).rev());

            let mut imm_positions = Vec::new();
            for piece in imm_part.split('|') {
                let (hi, lo) = parse_inst_range(operand, piece)?;
                imm_positions.extend((lo..=hi).rev());
            }

            if inst_positions.len() != imm_positions.len() {
                return Err(malformed(
                    operand,
                    fragment,
                    "instruction and immediate sides differ in width",
                ));
            }
            for (imm_pos, inst_pos) in imm_positions.into_iter().zip(inst_positions) {
                map.insert(operand, imm_pos, inst_pos)?;
            }
        }
        Ok(BitLayout::Scatter(map))
    }

    /// Compiles the layout into its canonical extraction expression.
    ///
    /// Scalar layouts become a bare single slice; the extension policy only
    /// wraps scatter-derived expressions, matching the source tables'
    /// convention that unscrambled fields are consumed raw.
    pub fn compile(&self, extend: Extend) -> ExtractionExpr {
        match self {
            BitLayout::Scalar { hi, lo } => ExtractionExpr::scalar(*hi, *lo),
            BitLayout::Scatter(map) => map.recombine(extend),
        }
    }
}

/// Immediate-position -> instruction-position mapping, dense over bit 31..0.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ScatterMap {
    slots: [Option<u8>; INST_BITS as usize],
}

impl ScatterMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, operand: &str, imm_pos: u8, inst_pos: u8) -> Result<(), MetaError> {
        let slot = &mut self.slots[imm_pos as usize];
        if slot.is_some() {
            return Err(MetaError::DuplicateImmediateBit {
                operand: operand.to_owned(),
                bit: imm_pos,
            });
        }
        *slot = Some(inst_pos);
        Ok(())
    }

    fn get(&self, imm_pos: u8) -> Option<u8> {
        self.slots[imm_pos as usize]
    }

    /// Greedy descending-run recombination, scanning immediate bit 31 down to
    /// bit 0. A run extends while the next-lower immediate position maps to
    /// exactly one less on the instruction side; each maximal run becomes one
    /// slice. Absent spans after the first populated bit become zero fills.
    /// Taking maximal runs eagerly from the top is minimal here: runs broken
    /// by a discontinuity on either side can never merge.
    fn recombine(&self, extend: Extend) -> ExtractionExpr {
        let mut segments: SmallVec<[Segment; 4]> = SmallVec::new();
        let mut started = false;
        let mut i: i8 = (INST_BITS - 1) as i8;
        while i >= 0 {
            let imm_pos = i as u8;
            if let Some(inst_hi) = self.get(imm_pos) {
                started = true;
                let mut cursor = imm_pos;
                while cursor > 0
                    && let Some(next) = self.get(cursor - 1)
                    && let Some(current) = self.get(cursor)
                    && next + 1 == current
                {
                    cursor -= 1;
                }
                let inst_lo = self.get(cursor).unwrap_or(inst_hi);
                segments.push(Segment::Slice { hi: inst_hi, lo: inst_lo });
                i = cursor as i8 - 1;
            } else if started {
                let mut width = 0u8;
                while i >= 0 && self.get(i as u8).is_none() {
                    width += 1;
                    i -= 1;
                }
                segments.push(Segment::Zero { width });
            } else {
                i -= 1;
            }
        }
        ExtractionExpr { segments, extend }
    }
}

fn parse_inst_range(operand: &str, token: &str) -> Result<(u8, u8), MetaError> {
    let token = token.trim();
    let (hi, lo) = match token.split_once(':') {
        Some((hi, lo)) => (parse_bit(operand, hi)?, parse_bit(operand, lo)?),
        None => {
            let bit = parse_bit(operand, token)?;
            (bit, bit)
        }
    };
    if lo > hi {
        return Err(malformed(operand, token, "range must descend"));
    }
    Ok((hi, lo))
}

fn parse_bit(operand: &str, token: &str) -> Result<u8, MetaError> {
    let value: u8 = token
        .trim()
        .parse()
        .map_err(|_| malformed(operand, token, "expected a bit index"))?;
    if value >= INST_BITS {
        return Err(malformed(operand, token, "bit index exceeds instruction width"));
    }
    Ok(value)
}

fn malformed(operand: &str, token: &str, why: &str) -> MetaError {
    MetaError::MalformedBitSpec {
        operand: operand.to_owned(),
        detail: format!("'{}': {}", token.trim(), why),
    }
}
