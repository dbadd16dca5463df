//! Assembly text emission

use crate::AsmInst;

/// Render instructions one per line; everything but labels is tab-indented
pub fn emit_instructions(instructions: &[AsmInst]) -> String {
    let mut out = String::new();
    for inst in instructions {
        if !inst.is_label() {
            out.push('\t');
        }
        out.push_str(&inst.to_string());
        out.push('\n');
    }
    out
}
