use std::fmt;

/// Represents any failure that can occur while loading or compiling the
/// encoding tables. Every variant is a construction-time condition; once a
/// [`MetaBundle`](super::MetaBundle) exists, emission cannot fail.
#[derive(Debug)]
pub enum MetaError {
    Io(std::io::Error),
    /// A bit-layout specification in the operands table could not be parsed.
    MalformedBitSpec {
        operand: String,
        detail: String,
    },
    /// Two fragments of one operand layout claim the same immediate bit.
    DuplicateImmediateBit {
        operand: String,
        bit: u8,
    },
    /// A constraint token on an opcode row is not of the form `bits=value`,
    /// or references bit positions outside the 32-bit instruction word.
    MalformedConstraint {
        instruction: String,
        token: String,
    },
    /// A constraint value does not fit within its declared bit width.
    ConstraintValueTooWide {
        instruction: String,
        token: String,
    },
    /// Two constraint tokens on one opcode row claim overlapping mask bits.
    ConflictingConstraint {
        instruction: String,
        token: String,
    },
    /// An opcode row ran out of tokens before naming a known codec.
    UnterminatedRow {
        instruction: String,
    },
    /// A CSR row is missing columns or carries an unparseable address.
    MalformedCsr {
        line: usize,
        detail: String,
    },
}

impl From<std::io::Error> for MetaError {
    fn from(err: std::io::Error) -> Self {
        MetaError::Io(err)
    }
}

impl fmt::Display for MetaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaError::Io(err) => write!(f, "I/O error: {err}"),
            MetaError::MalformedBitSpec { operand, detail } => {
                write!(f, "operand '{operand}': malformed bit spec: {detail}")
            }
            MetaError::DuplicateImmediateBit { operand, bit } => {
                write!(f, "operand '{operand}': immediate bit {bit} mapped more than once")
            }
            MetaError::MalformedConstraint { instruction, token } => {
                write!(f, "instruction '{instruction}': malformed constraint '{token}'")
            }
            MetaError::ConstraintValueTooWide { instruction, token } => {
                write!(
                    f,
                    "instruction '{instruction}': constraint '{token}' value exceeds its bit width"
                )
            }
            MetaError::ConflictingConstraint { instruction, token } => {
                write!(
                    f,
                    "instruction '{instruction}': constraint '{token}' overlaps a previously constrained bit"
                )
            }
            MetaError::UnterminatedRow { instruction } => {
                write!(f, "instruction '{instruction}': row ended before a known codec name")
            }
            MetaError::MalformedCsr { line, detail } => {
                write!(f, "csrs table line {line}: {detail}")
            }
        }
    }
}

impl std::error::Error for MetaError {}
