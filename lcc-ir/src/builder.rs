//! IR construction helper
//!
//! Front ends (and tests) emit instructions through `IrBuilder`, which
//! keeps the compilation context and the current function's activation
//! record in step. A function header cannot be written until the body has
//! allocated all its locals, so `begin_function` only remembers where the
//! header goes and `end_function` back-patches it.

use crate::{
    ActivationRecord, Address, CompilationContext, DataItem, DataKind, Instruction, Program,
};
use lcc_common::{CompilerError, Width};
use log::debug;

struct OpenFunction {
    slot: usize,
    name: Address,
    record: ActivationRecord,
}

pub struct IrBuilder<'ctx> {
    ctx: &'ctx mut CompilationContext,
    program: Program,
    function: Option<OpenFunction>,
}

impl<'ctx> IrBuilder<'ctx> {
    pub fn new(ctx: &'ctx mut CompilationContext) -> Self {
        Self {
            ctx,
            program: Program::new(),
            function: None,
        }
    }

    pub fn context(&mut self) -> &mut CompilationContext {
        &mut *self.ctx
    }

    /// Append an instruction to the program
    pub fn emit(&mut self, inst: Instruction) {
        self.program.push(inst);
    }

    /// Declare a scalar global with its initial value
    pub fn global(&mut self, name: &str, width: Width, value: i64) -> Result<Address, CompilerError> {
        let addr = self.ctx.new_global(name, width)?;
        let kind = if width == Width::Byte { DataKind::Byte } else { DataKind::Word };
        self.emit(Instruction::GlobalDecl { name: addr.clone(), kind, value });
        Ok(addr)
    }

    /// Declare a global array of `count` elements followed by its initializer
    pub fn global_array(
        &mut self,
        name: &str,
        element: Width,
        count: u32,
        items: Vec<DataItem>,
    ) -> Result<Address, CompilerError> {
        let addr = self.ctx.new_global(name, Width::Unsized)?;
        self.emit(Instruction::GlobalDecl {
            name: addr.clone(),
            kind: DataKind::Word,
            value: i64::from(count),
        });
        let kind = if element == Width::Byte { DataKind::Byte } else { DataKind::Word };
        self.emit(Instruction::Data { kind, items });
        Ok(addr)
    }

    pub fn string(&mut self, raw: &str) -> Address {
        self.ctx.new_string_literal(raw)
    }

    pub fn temp(&mut self, width: Width) -> Result<Address, CompilerError> {
        self.ctx.new_temp(width)
    }

    pub fn new_label(&mut self) -> String {
        self.ctx.new_label()
    }

    pub fn label(&mut self, label: &str) {
        self.emit(Instruction::Label(label.to_string()));
    }

    /// Open a function; its `.fnStart` is written by `end_function`
    pub fn begin_function(&mut self, name: &str, exported: bool) -> Result<Address, CompilerError> {
        if let Some(open) = &self.function {
            return Err(CompilerError::internal(format!(
                "function {} begins before {} ends",
                name, open.name
            )));
        }
        let addr = self.ctx.new_function(name, exported);
        self.function = Some(OpenFunction {
            slot: self.program.len(),
            name: addr.clone(),
            record: ActivationRecord::new(),
        });
        Ok(addr)
    }

    fn record(&mut self) -> Result<&mut ActivationRecord, CompilerError> {
        self.function
            .as_mut()
            .map(|open| &mut open.record)
            .ok_or_else(|| CompilerError::internal("no function is open"))
    }

    pub fn param(&mut self, name: &str, width: Width) -> Result<Address, CompilerError> {
        self.record()?.new_param(name, width)
    }

    pub fn local(&mut self, name: &str, width: Width) -> Result<Address, CompilerError> {
        self.record()?.new_local(name, width)
    }

    /// Allocate a local array and record its element count in the length word
    pub fn local_array(&mut self, name: &str, element: Width, count: u32) -> Result<Address, CompilerError> {
        let array = self.record()?.new_local_array(name, element.bytes() * count)?;
        self.emit(Instruction::SetSize { array: array.clone(), width: element, count });
        Ok(array)
    }

    /// Close the open function: back-patch its header and append `.fnEnd`
    pub fn end_function(&mut self) -> Result<(), CompilerError> {
        let open = self
            .function
            .take()
            .ok_or_else(|| CompilerError::internal(".fnEnd without an open function"))?;
        let header = Instruction::FunctionStart {
            name: open.name,
            locals: open.record.local_bytes(),
            params: open.record.param_count(),
        };
        debug!("closing function: {}", header);
        self.program.insert(open.slot, header)?;
        self.emit(Instruction::FunctionEnd);
        Ok(())
    }

    pub fn finish(self) -> Result<Program, CompilerError> {
        if let Some(open) = self.function {
            return Err(CompilerError::internal(format!("function {} never ends", open.name)));
        }
        Ok(self.program)
    }
}
