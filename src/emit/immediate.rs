//! Immediate-extraction backend: an `ImmType` enumeration over the in-scope
//! immediate operands and a `getImm` dispatch returning each operand's
//! recombined extraction expression.

use crate::meta::CompiledModel;

use super::{artifact_header, render_extraction};

/// Operands sharing one extraction expression, surfaced for inspection so
/// table authors can spot aliased encodings.
#[derive(Debug, PartialEq, Eq)]
pub struct ImmGroup {
    pub expression: String,
    pub operands: Vec<String>,
}

/// Groups the in-scope immediate operands by structural expression equality,
/// ordered by expression text for reproducible reports.
pub fn groups(model: &CompiledModel<'_>) -> Vec<ImmGroup> {
    let mut grouped: Vec<ImmGroup> = Vec::new();
    for (_, operand) in model.scoped_operands() {
        if !operand.kind.is_immediate() {
            continue;
        }
        let expression = render_extraction(&operand.expr);
        match grouped.iter_mut().find(|group| group.expression == expression) {
            Some(group) => group.operands.push(operand.name.clone()),
            None => grouped.push(ImmGroup {
                expression,
                operands: vec![operand.name.clone()],
            }),
        }
    }
    grouped.sort_by(|a, b| a.expression.cmp(&b.expression));
    grouped
}

pub fn emit(model: &CompiledModel<'_>) -> String {
    let mut out = artifact_header(model.bundle().digest_hex());
    out.push('\n');

    out.push_str("typedef enum {\n");
    out.push_str("    IMM_NONE");
    for (_, operand) in model.scoped_operands() {
        if operand.kind.is_immediate() {
            out.push_str(&format!(",\n    IMM_{}", operand.name.to_uppercase()));
        }
    }
    out.push_str("\n} ImmType deriving (Bits, Eq, FShow);\n\n");

    out.push_str("function Maybe#(Data) getImm(Bit#(32) inst, ImmType immType);\n");
    out.push_str("    return (case (immType)\n");
    for (_, operand) in model.scoped_operands() {
        if operand.kind.is_immediate() {
            out.push_str(&format!(
                "            IMM_{}: tagged Valid {};\n",
                operand.name.to_uppercase(),
                render_extraction(&operand.expr)
            ));
        }
    }
    out.push_str("            default: tagged Invalid;\n");
    out.push_str("        endcase);\n");
    out.push_str("endfunction\n");
    out
}
