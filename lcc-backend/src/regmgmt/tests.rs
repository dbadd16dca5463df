// Tests for RegisterState - internal to the register management module
use super::*;
use lcc_codegen::AsmInst;
use lcc_common::Width;
use lcc_ir::Location;
use pretty_assertions::assert_eq;

/// Every temp `t_n` lives at `-4n($fp)`, params in `$a<i>`, statics by name
struct FlatFrame;

impl CanonicalLocation for FlatFrame {
    fn home(&mut self, addr: &Address) -> Result<Home, CompilerError> {
        match addr.location() {
            Location::Temporary(id) => Ok(Home::Memory(Mem::Offset(-4 * *id as i32, Reg::Fp))),
            Location::Local(off) => Ok(Home::Memory(Mem::Offset(*off as i32 - 64, Reg::Fp))),
            Location::Parameter(off) => Ok(Home::Register(Reg::arg(off / 4).unwrap())),
            Location::Global(_) | Location::ModuleStatic(_) | Location::StringLiteral(_) => {
                Ok(Home::Memory(Mem::Symbol(addr.to_string())))
            }
            _ => Err(CompilerError::internal(format!("no home for {}", addr))),
        }
    }
}

fn t(id: u32) -> Address {
    Address::temp(id, Width::Word).unwrap()
}

fn fp(offset: i32) -> Mem {
    Mem::Offset(offset, Reg::Fp)
}

#[test]
fn test_operand_loads_once_per_block() {
    let mut state = RegisterState::new();
    let r1 = state.operand(&t(1), &[], &mut FlatFrame).unwrap();
    let r2 = state.operand(&t(1), &[], &mut FlatFrame).unwrap();
    assert_eq!(r1, Reg::T0);
    assert_eq!(r1, r2);
    assert_eq!(state.take_instructions(), vec![AsmInst::Lw(Reg::T0, fp(-4))]);
    state.check_consistency().unwrap();
}

#[test]
fn test_load_kinds() {
    let mut state = RegisterState::new();
    state.operand(&Address::literal(7), &[], &mut FlatFrame).unwrap();
    state.operand(&Address::local(0, Width::Byte), &[], &mut FlatFrame).unwrap();
    state.operand(&Address::local(4, Width::Unsized), &[], &mut FlatFrame).unwrap();
    state.operand(&Address::string(1), &[], &mut FlatFrame).unwrap();
    let param = state.operand(&Address::param(4, Width::Word), &[], &mut FlatFrame).unwrap();

    assert_eq!(param, Reg::A1);
    assert_eq!(
        state.take_instructions(),
        vec![
            AsmInst::Li(Reg::T0, 7),
            AsmInst::Lb(Reg::T1, fp(-64)),
            AsmInst::La(Reg::T2, fp(-60)),
            AsmInst::La(Reg::T3, Mem::Symbol("S0_1".into())),
        ]
    );
}

#[test]
fn test_fresh_temp_stays_in_register() {
    let mut state = RegisterState::new();
    let lhs = state.operand(&Address::literal(2), &[], &mut FlatFrame).unwrap();
    let rhs = state.operand(&Address::literal(3), &[lhs], &mut FlatFrame).unwrap();
    let dest = state.destination(&t(1), &[lhs, rhs], &mut FlatFrame).unwrap();
    state.emit(AsmInst::Addu(dest.reg, lhs, rhs));
    state.commit(dest, &t(1), &mut FlatFrame).unwrap();

    assert_eq!(
        state.take_instructions(),
        vec![
            AsmInst::Li(Reg::T0, 2),
            AsmInst::Li(Reg::T1, 3),
            AsmInst::Addu(Reg::T2, Reg::T0, Reg::T1),
        ]
    );
    assert_eq!(state.current_reg(&t(1)), Some(Reg::T2));
    assert!(state.is_dirty(&t(1)));
    state.check_consistency().unwrap();

    // A temporary dies with the frame; only a full flush writes it back
    state.flush(FlushScope::StaticOnly, &mut FlatFrame).unwrap();
    assert!(state.take_instructions().is_empty());
    state.flush(FlushScope::All, &mut FlatFrame).unwrap();
    assert_eq!(state.take_instructions(), vec![AsmInst::Sw(Reg::T2, fp(-4))]);
    assert!(!state.is_dirty(&t(1)));
}

#[test]
fn test_fresh_local_is_stored() {
    let mut state = RegisterState::new();
    let local = Address::local(4, Width::Word);
    let src = state.operand(&t(1), &[], &mut FlatFrame).unwrap();
    let dest = state.destination(&local, &[src], &mut FlatFrame).unwrap();
    state.emit(AsmInst::Negu(dest.reg, src));
    state.commit(dest, &local, &mut FlatFrame).unwrap();

    assert_eq!(
        state.take_instructions(),
        vec![
            AsmInst::Lw(Reg::T0, fp(-4)),
            AsmInst::Negu(Reg::T1, Reg::T0),
            AsmInst::Sw(Reg::T1, fp(-60)),
        ]
    );
    assert!(!state.is_dirty(&local));
    assert_eq!(state.current_reg(&local), Some(Reg::T1));
}

#[test]
fn test_byte_store_does_not_cache_the_word() {
    let mut state = RegisterState::new();
    let c = Address::local(0, Width::Byte);
    let src = state.operand(&Address::literal(300), &[], &mut FlatFrame).unwrap();
    state.assign(&c, src, &mut FlatFrame).unwrap();
    assert_eq!(state.current_reg(&c), None);

    // Reading the byte back sees what memory holds
    let reg = state.operand(&c, &[], &mut FlatFrame).unwrap();
    assert_ne!(reg, src);
    assert_eq!(
        state.take_instructions(),
        vec![
            AsmInst::Li(Reg::T0, 300),
            AsmInst::Sb(Reg::T0, fp(-64)),
            AsmInst::Lb(Reg::T1, fp(-64)),
        ]
    );
    state.check_consistency().unwrap();
}

#[test]
fn test_byte_result_is_narrowed() {
    let mut state = RegisterState::new();
    let c = Address::local(0, Width::Byte);
    let reg = state.operand(&c, &[], &mut FlatFrame).unwrap();
    let one = state.operand(&Address::literal(1), &[reg], &mut FlatFrame).unwrap();
    let dest = state.destination(&c, &[reg, one], &mut FlatFrame).unwrap();
    assert_eq!(dest.reg, reg);
    state.emit(AsmInst::Addu(dest.reg, reg, one));
    state.commit(dest, &c, &mut FlatFrame).unwrap();
    state.flush(FlushScope::All, &mut FlatFrame).unwrap();

    assert_eq!(
        state.take_instructions(),
        vec![
            AsmInst::Lb(Reg::T0, fp(-64)),
            AsmInst::Li(Reg::T1, 1),
            AsmInst::Addu(Reg::T0, Reg::T0, Reg::T1),
            AsmInst::Sll(Reg::T0, Reg::T0, 24),
            AsmInst::Sra(Reg::T0, Reg::T0, 24),
            AsmInst::Sb(Reg::T0, fp(-64)),
        ]
    );

    // A byte load is already sign-extended
    let byte = Address::temp(2, Width::Byte).unwrap();
    let dest = state.destination(&byte, &[], &mut FlatFrame).unwrap();
    state.emit(AsmInst::Lb(dest.reg, Mem::Offset(4, Reg::T0)));
    state.commit(dest, &byte, &mut FlatFrame).unwrap();
    assert_eq!(state.take_instructions(), vec![AsmInst::Lb(Reg::T2, Mem::Offset(4, Reg::T0))]);
}

#[test]
fn test_resident_destination_is_written_lazily() {
    let mut state = RegisterState::new();
    let x = Address::global("x", Width::Word);
    let reg = state.operand(&x, &[], &mut FlatFrame).unwrap();
    let one = state.operand(&Address::literal(1), &[reg], &mut FlatFrame).unwrap();
    let dest = state.destination(&x, &[reg, one], &mut FlatFrame).unwrap();
    assert_eq!(dest.reg, reg);
    state.emit(AsmInst::Addu(dest.reg, reg, one));
    state.commit(dest, &x, &mut FlatFrame).unwrap();
    state.take_instructions();

    assert!(state.is_dirty(&x));
    state.flush(FlushScope::All, &mut FlatFrame).unwrap();
    assert_eq!(state.take_instructions(), vec![AsmInst::Sw(Reg::T0, Mem::Symbol("g4_x".into()))]);
    assert!(!state.is_dirty(&x));
}

#[test]
fn test_static_only_flush_skips_locals() {
    let mut state = RegisterState::new();
    let x = Address::global("x", Width::Word);
    let local = Address::local(0, Width::Word);
    for addr in [&x, &local] {
        let reg = state.operand(addr, &[], &mut FlatFrame).unwrap();
        let dest = state.destination(addr, &[reg], &mut FlatFrame).unwrap();
        state.commit(dest, addr, &mut FlatFrame).unwrap();
    }
    state.take_instructions();

    state.flush(FlushScope::StaticOnly, &mut FlatFrame).unwrap();
    assert_eq!(state.take_instructions(), vec![AsmInst::Sw(Reg::T0, Mem::Symbol("g4_x".into()))]);
    assert!(state.is_dirty(&local));
}

#[test]
fn test_shared_register_is_not_reused_as_destination() {
    let mut state = RegisterState::new();
    let src = state.operand(&t(1), &[], &mut FlatFrame).unwrap();
    state.assign(&t(2), src, &mut FlatFrame).unwrap();
    assert_eq!(state.holds(src).len(), 2);

    assert!(state.is_dirty(&t(2)));

    // Overwriting t2 must not clobber t1's copy
    let dest = state.destination(&t(2), &[], &mut FlatFrame).unwrap();
    assert_ne!(dest.reg, src);
    state.commit(dest, &t(2), &mut FlatFrame).unwrap();
    assert_eq!(state.holds(src), vec![&t(1)]);
    state.check_consistency().unwrap();
}

#[test]
fn test_assign_to_register_parameter_moves() {
    let mut state = RegisterState::new();
    let src = state.operand(&t(1), &[], &mut FlatFrame).unwrap();
    state.take_instructions();
    state.assign(&Address::param(0, Width::Word), src, &mut FlatFrame).unwrap();
    assert_eq!(state.take_instructions(), vec![AsmInst::Move(Reg::A0, Reg::T0)]);
    assert_eq!(state.holds(src), vec![&t(1)]);
}

#[test]
fn test_fallback_eviction_spills_dirty_values() {
    let mut state = RegisterState::new();
    let x = Address::global("x", Width::Word);
    let reg = state.operand(&x, &[], &mut FlatFrame).unwrap();
    assert_eq!(reg, Reg::T0);
    let dest = state.destination(&x, &[], &mut FlatFrame).unwrap();
    state.commit(dest, &x, &mut FlatFrame).unwrap();

    for id in 1..10 {
        state.operand(&t(id), &[], &mut FlatFrame).unwrap();
    }
    state.take_instructions();

    // All ten registers are busy; $t0 is the first fallback
    let reg = state.operand(&t(10), &[], &mut FlatFrame).unwrap();
    assert_eq!(reg, Reg::T0);
    assert_eq!(
        state.take_instructions(),
        vec![
            AsmInst::Sw(Reg::T0, Mem::Symbol("g4_x".into())),
            AsmInst::Lw(Reg::T0, fp(-40)),
        ]
    );
    assert!(!state.is_dirty(&x));
    assert_eq!(state.current_reg(&x), None);

    // Avoided fallbacks are skipped
    let reg = state.scratch(&[Reg::T0], &mut FlatFrame).unwrap();
    assert_eq!(reg, Reg::T1);
    state.check_consistency().unwrap();
}

#[test]
fn test_call_boundary() {
    let mut state = RegisterState::new();
    let x = Address::global("x", Width::Word);
    let reg = state.operand(&x, &[], &mut FlatFrame).unwrap();
    let dest = state.destination(&x, &[reg], &mut FlatFrame).unwrap();
    state.commit(dest, &x, &mut FlatFrame).unwrap();

    assert!(state.invalidate_scratch().is_err());
    state.flush(FlushScope::All, &mut FlatFrame).unwrap();
    state.invalidate_scratch().unwrap();
    assert_eq!(state.current_reg(&x), None);
}

#[test]
fn test_forget_all_clears_block_state() {
    let mut state = RegisterState::new();
    state.operand(&t(1), &[], &mut FlatFrame).unwrap();
    state.forget_all();
    assert_eq!(state.current_reg(&t(1)), None);
    state.check_consistency().unwrap();
}

#[test]
fn test_literal_destination_is_internal() {
    let mut state = RegisterState::new();
    assert!(matches!(
        state.destination(&Address::literal(1), &[], &mut FlatFrame),
        Err(CompilerError::InternalError { .. })
    ));
}
