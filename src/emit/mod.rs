//! Backend emitters. Each renders one textual artifact from a
//! [`CompiledModel`]; all share the same iteration contract (source order,
//! skip out-of-scope rows, one stanza per instruction plus a default) and
//! none reads another's output.

use std::fs;
use std::path::Path;

use bitflags::bitflags;

use crate::meta::bitfield::{Extend, ExtractionExpr, Segment};
use crate::meta::instruction::{ImmClass, MatchMask, RegRole};
use crate::meta::{CompiledModel, MetaError};

pub mod constants;
pub mod immediate;
pub mod logic;
pub mod registers;
pub mod structural;

pub use immediate::ImmGroup;

bitflags! {
    /// Selects which backend artifacts to render.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ArtifactSet: u8 {
        const STRUCTURAL = 1 << 0;
        const LOGIC      = 1 << 1;
        const CONSTANTS  = 1 << 2;
        const CSRS       = 1 << 3;
        const IMMEDIATE  = 1 << 4;
    }
}

impl ArtifactSet {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "structural" => Some(Self::STRUCTURAL),
            "logic" => Some(Self::LOGIC),
            "constants" => Some(Self::CONSTANTS),
            "csrs" => Some(Self::CSRS),
            "immediate" => Some(Self::IMMEDIATE),
            _ => None,
        }
    }
}

/// One rendered artifact awaiting the final file write.
#[derive(Debug)]
pub struct Artifact {
    pub file_name: &'static str,
    pub text: String,
}

/// Renders every selected artifact to memory. Files are only written
/// afterwards by [`write_all`], so a failure anywhere leaves no partial
/// output set on disk.
pub fn render(model: &CompiledModel<'_>, select: ArtifactSet) -> Vec<Artifact> {
    let mut artifacts = Vec::new();
    if select.contains(ArtifactSet::STRUCTURAL) {
        artifacts.push(Artifact {
            file_name: "Opcodes.bsv",
            text: structural::emit(model),
        });
    }
    if select.contains(ArtifactSet::LOGIC) {
        artifacts.push(Artifact {
            file_name: "toInstType_verilog.v",
            text: logic::emit(model),
        });
    }
    if select.contains(ArtifactSet::CONSTANTS) {
        artifacts.push(Artifact {
            file_name: "Opcodes.defines",
            text: constants::emit(model),
        });
    }
    if select.contains(ArtifactSet::CSRS) {
        artifacts.push(Artifact {
            file_name: "CSRs.stub.bsv",
            text: registers::emit(model),
        });
    }
    if select.contains(ArtifactSet::IMMEDIATE) {
        artifacts.push(Artifact {
            file_name: "Imm.stub.bsv",
            text: immediate::emit(model),
        });
    }
    artifacts
}

pub fn write_all(artifacts: &[Artifact], out_dir: &Path) -> Result<(), MetaError> {
    fs::create_dir_all(out_dir)?;
    for artifact in artifacts {
        fs::write(out_dir.join(artifact.file_name), &artifact.text)?;
    }
    Ok(())
}

/// Banner stamped at the top of every artifact, carrying the table digest so
/// generated sources can be traced back to their table revision.
pub(crate) fn artifact_header(digest_hex: &str) -> String {
    format!(
        "/* Automatically generated by rvdecgen */\n/* source tables sha256: {digest_hex} */\n"
    )
}

/// Symbolic constant name derived from an instruction name: dots become
/// underscores, the rest is upper-cased.
pub(crate) fn macro_name(name: &str) -> String {
    name.replace('.', "_").to_uppercase()
}

/// Don't-care-aware bit pattern: `32'b` followed by one character per bit,
/// most significant first, `?` where the mask leaves the bit unconstrained.
pub(crate) fn bit_pattern(pattern: &MatchMask) -> String {
    let mut out = String::with_capacity(36);
    out.push_str("32'b");
    for bit in (0..32).rev() {
        if pattern.mask_bits >> bit & 1 == 1 {
            out.push(if pattern.match_bits >> bit & 1 == 1 { '1' } else { '0' });
        } else {
            out.push('?');
        }
    }
    out
}

pub(crate) fn reg_letter(role: Option<RegRole>) -> &'static str {
    match role {
        Some(RegRole::Gpr) => "i",
        Some(RegRole::Fpu) => "f",
        None => "n",
    }
}

pub(crate) fn imm_name(class: Option<ImmClass>) -> &'static str {
    match class {
        Some(class) => class.name(),
        None => "None",
    }
}

/// Formats an extraction expression the way the BSV backend spells it: a bare
/// slice for scalar fields, a brace-concatenation for recombined ones, with
/// the extension wrapper outermost.
pub(crate) fn render_extraction(expr: &ExtractionExpr) -> String {
    if expr.is_single_slice() && expr.extend == Extend::None {
        return render_segment(&expr.segments[0]);
    }
    let body: Vec<String> = expr.segments.iter().map(render_segment).collect();
    let braced = format!("{{{}}}", body.join(", "));
    match expr.extend {
        Extend::Sign => format!("signExtend({braced})"),
        Extend::Zero => format!("zeroExtend({braced})"),
        Extend::None => braced,
    }
}

fn render_segment(segment: &Segment) -> String {
    match segment {
        Segment::Slice { hi, lo } if hi == lo => format!("inst[{hi}]"),
        Segment::Slice { hi, lo } => format!("inst[{hi}:{lo}]"),
        Segment::Zero { width } => format!("{width}'b0"),
    }
}
