//! LittleC Compiler - MIPS Code Generation Support
//! 
//! The target-side half of the backend. The register allocator in
//! `lcc-backend` produces `AsmInst` sequences; this crate defines them and
//! turns them into SPIM/MARS assembly text:
//! 
//! - Register and instruction model
//! - Text emission
//! - Runtime-support routines linked into every program
//! - Fixed-point peephole optimizer

pub mod asm;
pub mod emit;
pub mod peephole;
pub mod runtime;

pub use asm::{AsmInst, DataValue, Mem, Reg, Section};
pub use emit::emit_instructions;
pub use peephole::optimize;
pub use runtime::{entry_trampoline, runtime_library};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimized_emission() {
        let slot = Mem::Offset(-8, Reg::Fp);
        let instructions = vec![
            AsmInst::Label("gf_main".to_string()),
            AsmInst::Li(Reg::T0, 42),
            AsmInst::Sw(Reg::T0, slot.clone()),
            AsmInst::Lw(Reg::T1, slot),
            AsmInst::Jr(Reg::Ra),
        ];

        let asm = emit_instructions(&optimize(instructions));
        assert!(asm.contains("gf_main:\n"));
        assert!(asm.contains("\tli $t0, 42\n"));
        assert!(asm.contains("\tsw $t0, -8($fp)\n"));
        assert!(asm.contains("\tmove $t1, $t0\n"));
        assert!(!asm.contains("lw"));
    }
}
