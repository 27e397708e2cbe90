//! Bit-pattern constant backend: one `` `define `` per in-scope instruction,
//! plus fallback definitions for every name left out of scope so downstream
//! sources can reference any opcode unconditionally.

use ahash::AHashSet;

use crate::meta::CompiledModel;

use super::{artifact_header, bit_pattern, macro_name};

pub fn emit(model: &CompiledModel<'_>) -> String {
    let mut out = artifact_header(model.bundle().digest_hex());
    out.push('\n');

    let mut defined: AHashSet<String> = AHashSet::new();
    for (inst, in_scope) in model.instructions() {
        if !in_scope {
            continue;
        }
        let name = macro_name(&inst.name);
        out.push_str(&format!("`define {:<18} {}\n", name, bit_pattern(&inst.pattern)));
        defined.insert(name);
    }

    out.push_str("\n// unused macros\n");
    for (inst, in_scope) in model.instructions() {
        if in_scope {
            continue;
        }
        let name = macro_name(&inst.name);
        if defined.insert(name.clone()) {
            out.push_str(&format!("`define {:<18} {}\n", name, bit_pattern(&inst.pattern)));
        }
    }
    out
}
