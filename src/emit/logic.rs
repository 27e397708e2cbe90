//! Flattened-logic decode backend: a Verilog `casez` over literal
//! don't-care-aware bit patterns, producing a packed role-code tuple.

use crate::meta::CompiledModel;
use crate::meta::instruction::{ImmClass, RegRole};

use super::{artifact_header, bit_pattern};

const PRELUDE: &str = r#"
module toInstType_verilog (in, out);
    input [31:0] in;
    output [10:0] out;

    wire [1:0] i;
    wire [1:0] f;

    wire [2:0] None;
    wire [2:0] I;
    wire [2:0] S;
    wire [2:0] SB;
    wire [2:0] U;
    wire [2:0] UJ;
    wire [2:0] Z;

    reg [10:0] out_tmp;
    reg [10:0] out;

    assign i = 2'b10;
    assign f = 2'b11;

    assign None = 3'b000;
    assign I    = 3'b001;
    assign S    = 3'b010;
    assign SB   = 3'b011;
    assign U    = 3'b100;
    assign UJ   = 3'b101;
    assign Z    = 3'b110;

    always @ (in)
        casez (in)
"#;

// out_tmp[4:3] carries the destination role code; a gpr destination whose
// concrete rd field (in[11:7]) is zero gets masked back out, since x0 is
// hardwired and never written.
const POSTLUDE: &str = r#"            default: out_tmp = 11'bxxxxxxxxxxx;
        endcase

    always @ (in or out_tmp)
        if ((out_tmp[4:3] == 2'b10) && (in[11:7] == 5'b00000))
            out = out_tmp & 11'b11111100111;
        else
            out = out_tmp;

endmodule
"#;

fn reg_code(role: Option<RegRole>) -> &'static str {
    match role {
        Some(RegRole::Gpr) => "i",
        Some(RegRole::Fpu) => "f",
        None => "2'b0x",
    }
}

fn imm_code(class: Option<ImmClass>) -> &'static str {
    match class {
        Some(class) => class.name(),
        None => "None",
    }
}

pub fn emit(model: &CompiledModel<'_>) -> String {
    let mut out = artifact_header(model.bundle().digest_hex());
    out.push_str(PRELUDE);
    for (inst, in_scope) in model.instructions() {
        if !in_scope {
            continue;
        }
        out.push_str(&format!(
            "            {}: out_tmp = {{{}, {}, {}, {}, {}}};\n",
            bit_pattern(&inst.pattern),
            reg_code(inst.roles.rs1),
            reg_code(inst.roles.rs2),
            reg_code(inst.roles.rs3),
            reg_code(inst.roles.rd),
            imm_code(inst.roles.imm),
        ));
    }
    out.push_str(POSTLUDE);
    out
}

#[cfg(test)]
mod tests {
    use crate::meta::Target;
    use crate::meta::bundle::tests_support::small_bundle;

    use super::*;

    #[test]
    fn emits_dont_care_patterns_with_packed_codes() {
        let bundle = small_bundle();
        let text = emit(&bundle.compile(&Target::new("rv64", "i")));
        assert!(
            text.contains(
                "32'b?????????????????000?????0010011: out_tmp = {i, 2'b0x, 2'b0x, i, I};"
            ),
            "addi pattern line missing:\n{text}"
        );
        assert!(
            text.contains(
                "32'b?????????????????000?????1100011: out_tmp = {i, i, 2'b0x, 2'b0x, SB};"
            ),
            "beq pattern line missing:\n{text}"
        );
    }

    #[test]
    fn floating_rows_use_fpu_code() {
        let bundle = small_bundle();
        let text = emit(&bundle.compile(&Target::new("rv64", "if")));
        assert!(
            text.contains("out_tmp = {f, f, 2'b0x, f, None};"),
            "fadd.s must select the floating file:\n{text}"
        );
    }

    #[test]
    fn zero_destination_masking_is_generated() {
        let bundle = small_bundle();
        let text = emit(&bundle.compile(&Target::new("rv64", "i")));
        assert!(text.contains("out = out_tmp & 11'b11111100111;"));
        assert!(text.contains("default: out_tmp = 11'bxxxxxxxxxxx;"));
    }

    #[test]
    fn out_of_scope_rows_are_absent() {
        let bundle = small_bundle();
        let text = emit(&bundle.compile(&Target::new("rv64", "i")));
        // mul is rv64im only; its funct7=1 pattern must not appear.
        assert!(!text.contains("0000001??????????000?????0110011"), "mul leaked:\n{text}");
    }
}
