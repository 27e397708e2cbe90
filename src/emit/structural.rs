//! Structural decode backend: a BSV case function mapping each in-scope
//! opcode pattern to its operand-role tuple.

use crate::meta::CompiledModel;

use super::{artifact_header, imm_name, macro_name, reg_letter};

const PRELUDE: &str = r#"
`include "Opcodes.defines"
import RVTypes::*;

typedef struct {
    Maybe#(RegType) rs1;
    Maybe#(RegType) rs2;
    Maybe#(RegType) rs3;
    Maybe#(RegType) dst;
    ImmType imm;
} InstType deriving (Bits, Eq, FShow);

function InstType toInstType(Instruction inst);
    Maybe#(RegType) i = tagged Valid Gpr;
    Maybe#(RegType) f = tagged Valid Fpu;
    Maybe#(RegType) n = tagged Invalid;
    InstType ret = (case (inst) matches
"#;

// An integer destination encoding register index 0 is architecturally wired
// to zero and never a real write target; the generated logic cancels the
// role after the table-driven tuple is selected.
const POSTLUDE: &str = r#"            default:        ?;
        endcase);
    if ((ret.dst == tagged Valid Gpr) && (getInstFields(inst).rd == 0)) begin
        ret.dst = tagged Invalid;
    end
    return ret;
endfunction
"#;

pub fn emit(model: &CompiledModel<'_>) -> String {
    let mut out = artifact_header(model.bundle().digest_hex());
    out.push_str(PRELUDE);
    for (inst, in_scope) in model.instructions() {
        if !in_scope {
            continue;
        }
        let tag = format!("`{}:", macro_name(&inst.name));
        out.push_str(&format!(
            "            {:<16}InstType{{rs1: {}, rs2: {}, rs3: {}, dst: {}, imm: {:<4}}};\n",
            tag,
            reg_letter(inst.roles.rs1),
            reg_letter(inst.roles.rs2),
            reg_letter(inst.roles.rs3),
            reg_letter(inst.roles.rd),
            imm_name(inst.roles.imm),
        ));
    }
    out.push_str(POSTLUDE);
    out
}

#[cfg(test)]
mod tests {
    use crate::meta::{MetaBundle, Target};
    use crate::meta::bundle::tests_support::small_bundle;

    use super::*;

    fn render(bundle: &MetaBundle, target: &Target) -> String {
        emit(&bundle.compile(target))
    }

    #[test]
    fn emits_one_line_per_scoped_instruction() {
        let bundle = small_bundle();
        let text = render(&bundle, &Target::new("rv64", "i"));
        assert!(
            text.contains("`ADDI:          InstType{rs1: i, rs2: n, rs3: n, dst: i, imm: I   };"),
            "addi role tuple missing or misformatted:\n{text}"
        );
        assert!(!text.contains("`MUL:"), "rv64im row must be skipped for letters={{i}}");
    }

    #[test]
    fn branch_suppresses_destination_by_table() {
        let bundle = small_bundle();
        let text = render(&bundle, &Target::new("rv64", "i"));
        assert!(
            text.contains("`BEQ:           InstType{rs1: i, rs2: i, rs3: n, dst: n, imm: SB  };"),
            "beq must carry no destination role:\n{text}"
        );
    }

    #[test]
    fn zero_destination_cancellation_is_generated() {
        let bundle = small_bundle();
        let text = render(&bundle, &Target::new("rv64", "i"));
        assert!(text.contains("getInstFields(inst).rd == 0"));
        assert!(text.contains("ret.dst = tagged Invalid;"));
    }

    #[test]
    fn default_stanza_is_present() {
        let bundle = small_bundle();
        let text = render(&bundle, &Target::new("rv64", "i"));
        assert!(text.contains("default:        ?;"));
    }
}
