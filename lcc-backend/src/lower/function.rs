//! Function Lowering
//!
//! Lowers one function block by block. Register contents never cross a
//! block boundary: unless a block returns, everything dirty is written back
//! at its end, and the descriptors are cleared before the next block starts.

use super::instruction::lower_instruction;
use crate::function::{FunctionBuilder, FunctionFrame};
use crate::regmgmt::{FlushScope, RegisterState};
use lcc_codegen::AsmInst;
use lcc_common::CompilerError;
use lcc_ir::{FunctionBlock, Instruction};
use log::{info, trace};

/// Lower a function to assembly, prologue and epilogue included
pub fn lower_function(function: &FunctionBlock<'_>) -> Result<Vec<AsmInst>, CompilerError> {
    let label = function.label();
    lower_body(function).map_err(|err| err.in_function(&label))
}

fn lower_body(function: &FunctionBlock<'_>) -> Result<Vec<AsmInst>, CompilerError> {
    let frame = FunctionFrame::analyze(function)?;
    let mut builder = FunctionBuilder::new(frame);
    builder.begin()?;

    let mut state = RegisterState::new();
    let blocks = function.basic_blocks();

    for block in &blocks {
        trace!("block at {} ({} instructions)", block.start, block.len());
        for inst in block.instructions {
            lower_instruction(&mut state, builder.frame_mut(), inst)?;
            builder.add_instructions(state.take_instructions());
            state.check_consistency()?;
        }

        // A call ends its block with the result still in a register
        let returns = matches!(
            block.terminator(),
            Some(Instruction::Return { .. } | Instruction::FunctionEnd)
        );
        if !returns {
            state.flush(FlushScope::All, builder.frame_mut())?;
            builder.add_instructions(state.take_instructions());
        }
        state.forget_all();
    }

    let size = builder.frame().size()?;
    info!(
        "lowered {}: {} basic blocks, {} temps, frame {} bytes",
        builder.frame().label(),
        blocks.len(),
        builder.frame().temp_count(),
        size
    );
    builder.finish()
}
