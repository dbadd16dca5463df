//! Instruction Lowering
//!
//! One rule per IR instruction family. Every rule follows the same
//! discipline: obtain operand registers from the allocator, compute into a
//! destination register, then hand the destination back to the allocator,
//! which decides whether the result is stored now or later.

use crate::function::FunctionFrame;
use crate::regmgmt::{FlushScope, RegisterState};
use lcc_codegen::{AsmInst, Mem, Reg};
use lcc_common::{CompilerError, Width};
use lcc_ir::{Address, BinaryOp, CastKind, Condition, Instruction, RelOp, UnaryOp};
use log::debug;

/// Arrays keep their element count in the first word
const ARRAY_HEADER: i32 = 4;

/// Lower one instruction; the output accumulates in `state`
pub fn lower_instruction(
    state: &mut RegisterState,
    frame: &mut FunctionFrame,
    inst: &Instruction,
) -> Result<(), CompilerError> {
    debug!("lowering `{}`", inst);

    match inst {
        Instruction::FunctionStart { .. } => {}

        Instruction::FunctionEnd => state.flush(FlushScope::StaticOnly, frame)?,

        Instruction::Label(label) => state.emit(AsmInst::Label(label.clone())),

        Instruction::Goto(label) => {
            state.flush(FlushScope::All, frame)?;
            state.emit(AsmInst::J(label.clone()));
        }

        Instruction::Branch { condition, target } => lower_branch(state, frame, condition, target)?,

        Instruction::Assign { dest, src } => {
            let reg = state.operand(src, &[], frame)?;
            state.assign(dest, reg, frame)?;
        }

        Instruction::Cast { kind, dest, src } => {
            let src = state.operand(src, &[], frame)?;
            let d = state.destination(dest, &[src], frame)?;
            match kind {
                CastKind::Widen => state.emit(AsmInst::Move(d.reg, src)),
                CastKind::Narrow => {
                    state.emit(AsmInst::Sll(d.reg, src, 24));
                    state.emit(AsmInst::Sra(d.reg, d.reg, 24));
                }
            }
            state.commit(d, dest, frame)?;
        }

        Instruction::Unary { op, dest, src } => {
            let src = state.operand(src, &[], frame)?;
            let d = state.destination(dest, &[src], frame)?;
            state.emit(match op {
                UnaryOp::Neg => AsmInst::Negu(d.reg, src),
                UnaryOp::Not => AsmInst::Seq(d.reg, src, Reg::Zero),
                UnaryOp::BitNot => AsmInst::Not(d.reg, src),
                UnaryOp::AddressOf => AsmInst::Move(d.reg, src),
                UnaryOp::Length => AsmInst::Lw(d.reg, Mem::Offset(0, src)),
            });
            state.commit(d, dest, frame)?;
        }

        Instruction::Binary { op, dest, lhs, rhs } => {
            let lhs = state.operand(&lhs.adopt_width(dest.width()), &[], frame)?;
            let rhs = state.operand(&rhs.adopt_width(dest.width()), &[lhs], frame)?;
            let d = state.destination(dest, &[lhs, rhs], frame)?;
            state.emit(binary(*op, d.reg, lhs, rhs));
            state.commit(d, dest, frame)?;
        }

        Instruction::SetSize { array, count, .. } => {
            let count = i32::try_from(*count)
                .map_err(|_| CompilerError::internal(format!("array size {} out of range", count)))?;
            let base = state.operand(array, &[], frame)?;
            let count = state.operand(&Address::literal(count), &[base], frame)?;
            state.emit(AsmInst::Sw(count, Mem::Offset(0, base)));
        }

        Instruction::IndexedStore { array, index, value, width } => {
            let value = state.operand(&value.adopt_width(*width), &[], frame)?;
            let element = element_address(state, frame, array, index, *width, &[value])?;
            state.emit(match width {
                Width::Byte => AsmInst::Sb(value, element),
                _ => AsmInst::Sw(value, element),
            });
        }

        Instruction::IndexedLoad { dest, array, index, width } => {
            let element = element_address(state, frame, array, index, *width, &[])?;
            let avoid = match &element {
                Mem::Offset(_, reg) => vec![*reg],
                Mem::Symbol(_) => Vec::new(),
            };
            let d = state.destination(dest, &avoid, frame)?;
            state.emit(match width {
                Width::Byte => AsmInst::Lb(d.reg, element),
                _ => AsmInst::Lw(d.reg, element),
            });
            state.commit(d, dest, frame)?;
        }

        Instruction::Param { width, value } => {
            let reg = state.operand(&value.adopt_width(*width), &[], frame)?;
            state.emit(AsmInst::SubuImm(Reg::Sp, Reg::Sp, 4));
            state.emit(AsmInst::Sw(reg, Mem::Offset(0, Reg::Sp)));
        }

        Instruction::Call { dest, function, args } => lower_call(state, frame, dest.as_ref(), function, *args)?,

        Instruction::Return { value, .. } => {
            if let Some(value) = value {
                let reg = state.operand(value, &[], frame)?;
                state.emit(AsmInst::Move(Reg::V0, reg));
            }
            state.flush(FlushScope::StaticOnly, frame)?;
            state.emit(AsmInst::B(frame.epilogue_label()));
        }

        Instruction::GlobalDecl { .. } | Instruction::Data { .. } => {
            return Err(CompilerError::internal(format!(
                "data declaration `{}` inside {}",
                inst,
                frame.label()
            )));
        }
    }

    Ok(())
}

fn binary(op: BinaryOp, rd: Reg, rs: Reg, rt: Reg) -> AsmInst {
    match op {
        BinaryOp::Add => AsmInst::Addu(rd, rs, rt),
        BinaryOp::Sub => AsmInst::Subu(rd, rs, rt),
        BinaryOp::Mul => AsmInst::Mul(rd, rs, rt),
        BinaryOp::Div => AsmInst::Div(rd, rs, rt),
        BinaryOp::Rem => AsmInst::Rem(rd, rs, rt),
        BinaryOp::LogicalAnd | BinaryOp::BitAnd => AsmInst::And(rd, rs, rt),
        BinaryOp::LogicalOr | BinaryOp::BitOr => AsmInst::Or(rd, rs, rt),
        BinaryOp::BitXor => AsmInst::Xor(rd, rs, rt),
        BinaryOp::Shl => AsmInst::Sllv(rd, rs, rt),
        BinaryOp::Shr => AsmInst::Srav(rd, rs, rt),
        BinaryOp::Compare(rel) => match rel {
            RelOp::Lt => AsmInst::Slt(rd, rs, rt),
            RelOp::Le => AsmInst::Sle(rd, rs, rt),
            RelOp::Gt => AsmInst::Sgt(rd, rs, rt),
            RelOp::Ge => AsmInst::Sge(rd, rs, rt),
            RelOp::Eq => AsmInst::Seq(rd, rs, rt),
            RelOp::Ne => AsmInst::Sne(rd, rs, rt),
        },
    }
}

/// Address of `array[index]`, computed into a scratch register.
/// `keep` lists registers already holding operands of the same instruction.
fn element_address(
    state: &mut RegisterState,
    frame: &mut FunctionFrame,
    array: &Address,
    index: &Address,
    width: Width,
    keep: &[Reg],
) -> Result<Mem, CompilerError> {
    let shift = match width {
        Width::Word => 2,
        Width::Byte => 0,
        other => {
            return Err(CompilerError::internal(format!(
                "cannot index {} with element width {}",
                array, other
            )))
        }
    };

    let base = state.operand(array, keep, frame)?;
    let mut avoid = keep.to_vec();
    avoid.push(base);
    let index = state.operand(&index.adopt_width(Width::Word), &avoid, frame)?;
    avoid.push(index);
    let offset = state.scratch(&avoid, frame)?;

    state.emit(AsmInst::Move(offset, index));
    if shift > 0 {
        state.emit(AsmInst::Sll(offset, offset, shift));
    }
    state.emit(AsmInst::Addu(offset, offset, base));
    Ok(Mem::Offset(ARRAY_HEADER, offset))
}

fn lower_branch(
    state: &mut RegisterState,
    frame: &mut FunctionFrame,
    condition: &Condition,
    target: &str,
) -> Result<(), CompilerError> {
    let target = target.to_string();
    let branch = match condition {
        Condition::Compare { op, lhs, rhs } => {
            let lhs = state.operand(lhs, &[], frame)?;
            let rhs = state.operand(&rhs.adopt_width(Width::Word), &[lhs], frame)?;
            match op {
                RelOp::Lt => AsmInst::Blt(lhs, rhs, target),
                RelOp::Le => AsmInst::Ble(lhs, rhs, target),
                RelOp::Gt => AsmInst::Bgt(lhs, rhs, target),
                RelOp::Ge => AsmInst::Bge(lhs, rhs, target),
                RelOp::Eq => AsmInst::Beq(lhs, rhs, target),
                RelOp::Ne => AsmInst::Bne(lhs, rhs, target),
            }
        }
        Condition::IfTrue(value) => AsmInst::Bnez(state.operand(value, &[], frame)?, target),
        Condition::IfFalse(value) => AsmInst::Beqz(state.operand(value, &[], frame)?, target),
    };
    state.flush(FlushScope::All, frame)?;
    state.emit(branch);
    Ok(())
}

/// Arguments were pushed last-first, so the first `min(n, 4)` pops land in
/// `$a0`.. in order and the rest stay where the callee expects them.
fn lower_call(
    state: &mut RegisterState,
    frame: &mut FunctionFrame,
    dest: Option<&Address>,
    function: &Address,
    args: u32,
) -> Result<(), CompilerError> {
    if !function.is_function() {
        return Err(CompilerError::internal(format!("call to non-function {}", function)));
    }

    state.flush(FlushScope::All, frame)?;
    for i in 0..args.min(4) {
        let reg = Reg::arg(i).ok_or_else(|| CompilerError::internal(format!("no argument register {}", i)))?;
        state.emit(AsmInst::Lw(reg, Mem::Offset(0, Reg::Sp)));
        state.emit(AsmInst::AdduImm(Reg::Sp, Reg::Sp, 4));
    }
    state.emit(AsmInst::Jal(function.to_string()));
    if args > 4 {
        state.emit(AsmInst::AdduImm(Reg::Sp, Reg::Sp, ((args - 4) * 4) as i32));
    }
    state.invalidate_scratch()?;

    if let Some(dest) = dest {
        let d = state.destination(dest, &[], frame)?;
        state.emit(AsmInst::Move(d.reg, Reg::V0));
        state.commit(d, dest, frame)?;
    }
    Ok(())
}
