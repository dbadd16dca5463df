//! Function assembly with a back-patched prologue
//!
//! The frame size is only final once every temporary has been given a slot,
//! which happens while the body is lowered. The builder therefore reserves
//! the prologue position up front and splices the prologue in at `finish`.

use super::frame::FunctionFrame;
use lcc_codegen::AsmInst;
use lcc_common::CompilerError;
use log::{debug, trace};

pub struct FunctionBuilder {
    frame: FunctionFrame,
    instructions: Vec<AsmInst>,
    /// Where the prologue goes once the frame is final
    prologue_slot: Option<usize>,
}

impl FunctionBuilder {
    pub fn new(frame: FunctionFrame) -> Self {
        Self {
            frame,
            instructions: Vec::new(),
            prologue_slot: None,
        }
    }

    /// Reserve the prologue position. Must precede any body instructions.
    pub fn begin(&mut self) -> Result<&mut Self, CompilerError> {
        if self.prologue_slot.is_some() {
            return Err(CompilerError::internal(format!(
                "{} already has a prologue slot",
                self.frame.label()
            )));
        }
        trace!("reserving prologue slot for {} at {}", self.frame.label(), self.instructions.len());
        self.prologue_slot = Some(self.instructions.len());
        Ok(self)
    }

    pub fn frame(&self) -> &FunctionFrame {
        &self.frame
    }

    /// The frame also serves as the allocator's source of canonical locations
    pub fn frame_mut(&mut self) -> &mut FunctionFrame {
        &mut self.frame
    }

    pub fn add_instructions(&mut self, insts: Vec<AsmInst>) -> &mut Self {
        self.instructions.extend(insts);
        self
    }

    /// Append the epilogue, splice in the prologue and return the function
    pub fn finish(self) -> Result<Vec<AsmInst>, CompilerError> {
        let slot = self.prologue_slot.ok_or_else(|| {
            CompilerError::internal(format!("{} finished without begin", self.frame.label()))
        })?;

        let prologue = self.frame.prologue()?;
        let epilogue = self.frame.epilogue()?;
        debug!(
            "finishing {}: frame {} bytes, prologue {} / body {} / epilogue {} instructions",
            self.frame.label(),
            self.frame.size()?,
            prologue.len(),
            self.instructions.len(),
            epilogue.len()
        );

        let mut insts = self.instructions;
        insts.splice(slot..slot, prologue);
        insts.extend(epilogue);
        Ok(insts)
    }
}
