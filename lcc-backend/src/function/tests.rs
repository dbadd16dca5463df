// Tests for frame layout and prologue back-patching
use super::*;
use crate::regmgmt::{CanonicalLocation, Home};
use indoc::indoc;
use lcc_codegen::{emit_instructions, AsmInst, Mem, Reg};
use lcc_common::{CompilerError, Width};
use lcc_ir::{parse_program, Address, CompilationContext, Program};
use pretty_assertions::assert_eq;

const PROGRAM: &str = indoc! {"
    gf_fact: .fnStart 4 1
    \tl4@0 = 1
    \treturn4 l4@0
    \t.fnEnd
    mf_helper: .fnStart 6 6
    \tt4_3 = p4@0 + p4@16
    \tt4_1 = t4_3 * 2
    \tparam4 t4_1
    \tparam4 p4@4
    \tt4_2 = call gf_fact,2
    \treturn4 t4_2
    \t.fnEnd
    gf_main: .fnStart 0 0
    \tparam4 5
    \tt4_9 = call gf_fact,1
    \treturn
    \t.fnEnd
"};

fn program() -> Program {
    let mut ctx = CompilationContext::new();
    parse_program(PROGRAM, &mut ctx).unwrap()
}

fn frame(program: &Program, index: usize) -> FunctionFrame {
    let functions = program.function_blocks().unwrap();
    FunctionFrame::analyze(&functions[index]).unwrap()
}

#[test]
fn test_leaf_frame_geometry() {
    let program = program();
    let fact = frame(&program, 0);
    assert!(!fact.makes_calls());
    assert_eq!(fact.saved_args(), 0);
    assert_eq!(fact.temp_count(), 0);
    // locals 4 + $fp + $s7
    assert_eq!(fact.size().unwrap(), 16);
    assert_eq!(fact.epilogue_label(), "xf_fact");
}

#[test]
fn test_calling_frame_geometry() {
    let program = program();
    let helper = frame(&program, 1);
    assert!(helper.makes_calls());
    assert_eq!(helper.param_count(), 6);
    assert_eq!(helper.saved_args(), 2);
    assert_eq!(helper.temp_count(), 3);
    // 2 saved + 3 temps + 8 local bytes + $ra/$fp/$s7 = 40
    assert_eq!(helper.size().unwrap(), 40);
    assert_eq!(helper.label(), "mf_helper");
}

#[test]
fn test_canonical_locations() {
    let program = program();
    let mut helper = frame(&program, 1);

    // Temporaries get slots in first-reference order
    assert_eq!(
        helper.home(&Address::temp(3, Width::Word).unwrap()).unwrap(),
        Home::Memory(Mem::Offset(-12, Reg::Fp))
    );
    assert_eq!(
        helper.home(&Address::temp(2, Width::Word).unwrap()).unwrap(),
        Home::Memory(Mem::Offset(-20, Reg::Fp))
    );
    assert_eq!(
        helper.home(&Address::local(4, Width::Word)).unwrap(),
        Home::Memory(Mem::Offset(-4, Reg::Fp))
    );

    // Preserved, unpreserved and stack-passed parameters
    assert_eq!(helper.home(&Address::param(0, Width::Word)).unwrap(), Home::Register(Reg::S0));
    assert_eq!(helper.home(&Address::param(8, Width::Word)).unwrap(), Home::Register(Reg::A2));
    assert_eq!(
        helper.home(&Address::param(20, Width::Word)).unwrap(),
        Home::Memory(Mem::Offset(4, Reg::S7))
    );

    assert_eq!(
        helper.home(&Address::module_static("count", Width::Word)).unwrap(),
        Home::Memory(Mem::Symbol("m4_count".into()))
    );
    assert!(matches!(
        helper.home(&Address::literal(3)),
        Err(CompilerError::InternalError { .. })
    ));
    assert!(helper.home(&Address::function("fact", true)).is_err());
}

#[test]
fn test_prologue_and_epilogue_of_calling_function() {
    let program = program();
    let main = frame(&program, 2);
    // 1 saved + 1 temp + $ra/$fp/$s7 = 20, aligned to 24
    assert_eq!(main.size().unwrap(), 24);
    assert_eq!(
        emit_instructions(&main.prologue().unwrap()),
        indoc! {"
            gf_main:
            \t.globl gf_main
            \tsubu $sp, $sp, 24
            \tsw $ra, 20($sp)
            \tsw $fp, 16($sp)
            \tsw $s7, 12($sp)
            \tsw $s0, 8($sp)
            \tmove $s0, $a0
            \taddiu $fp, $sp, 8
            \taddiu $s7, $sp, 24
        "}
    );
    assert_eq!(
        emit_instructions(&main.epilogue().unwrap()),
        indoc! {"
            xf_main:
            \tlw $s0, 8($sp)
            \tlw $s7, 12($sp)
            \tlw $fp, 16($sp)
            \tlw $ra, 20($sp)
            \taddiu $sp, $sp, 24
            \tjr $ra
        "}
    );
}

#[test]
fn test_module_function_is_not_exported() {
    let program = program();
    let helper = frame(&program, 1);
    assert!(!helper.prologue().unwrap().iter().any(|inst| matches!(inst, AsmInst::Globl(_))));
}

#[test]
fn test_builder_back_patches_prologue() {
    let program = program();
    let fact = frame(&program, 0);
    assert_eq!(fact.size().unwrap(), 16);

    let mut builder = FunctionBuilder::new(fact);
    builder.begin().unwrap();
    // Temporaries first seen while lowering grow the frame
    for id in [7, 8] {
        builder.frame_mut().home(&Address::temp(id, Width::Word).unwrap()).unwrap();
    }
    assert_eq!(builder.frame().size().unwrap(), 24);
    builder.add_instructions(vec![AsmInst::Li(Reg::T0, 1)]);
    let insts = builder.finish().unwrap();

    assert_eq!(insts[0], AsmInst::Label("gf_fact".into()));
    assert!(insts.contains(&AsmInst::SubuImm(Reg::Sp, Reg::Sp, 24)));
    assert!(insts.contains(&AsmInst::Addiu(Reg::Sp, Reg::Sp, 24)));
    let body = insts.iter().position(|inst| *inst == AsmInst::Li(Reg::T0, 1)).unwrap();
    let subu = insts.iter().position(|inst| matches!(inst, AsmInst::SubuImm(..))).unwrap();
    assert!(subu < body);
    assert_eq!(insts.last(), Some(&AsmInst::Jr(Reg::Ra)));
}

#[test]
fn test_builder_requires_begin() {
    let program = program();
    let builder = FunctionBuilder::new(frame(&program, 0));
    assert!(builder.finish().is_err());

    let mut builder = FunctionBuilder::new(frame(&program, 0));
    builder.begin().unwrap();
    assert!(builder.begin().is_err());
}

#[test]
fn test_oversized_frame_is_internal() {
    let mut ctx = CompilationContext::new();
    let program = parse_program("gf_huge: .fnStart 4294967294 0\n.fnEnd\n", &mut ctx).unwrap();
    let functions = program.function_blocks().unwrap();
    assert!(matches!(
        FunctionFrame::analyze(&functions[0]),
        Err(CompilerError::InternalError { .. })
    ));
}
