//! Program - the ordered instruction store of one compilation unit

use crate::{partition, Address, BasicBlock, CompilationContext, Instruction, QuadTable};
use lcc_common::CompilerError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    instructions: Vec<Instruction>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, inst: Instruction) {
        self.instructions.push(inst);
    }

    /// Insert before position `at`. This is how a header reserved at `at`
    /// gets back-patched once the body after it is complete.
    pub fn insert(&mut self, at: usize, inst: Instruction) -> Result<(), CompilerError> {
        if at > self.instructions.len() {
            return Err(CompilerError::internal(format!(
                "cannot insert `{}` at line {}: program has {} lines",
                inst,
                at,
                self.instructions.len()
            )));
        }
        self.instructions.insert(at, inst);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Basic blocks of the whole program
    pub fn basic_blocks(&self) -> Vec<BasicBlock<'_>> {
        partition(&self.instructions)
    }

    /// Every `.fnStart` ... `.fnEnd` span, in program order
    pub fn function_blocks(&self) -> Result<Vec<FunctionBlock<'_>>, CompilerError> {
        let mut functions = Vec::new();
        let mut open: Option<usize> = None;

        for (i, inst) in self.instructions.iter().enumerate() {
            match inst {
                Instruction::FunctionStart { name, .. } => {
                    if let Some(start) = open {
                        return Err(CompilerError::internal(format!(
                            "function {} starts at line {} before the function at line {} ends",
                            name, i, start
                        )));
                    }
                    open = Some(i);
                }
                Instruction::FunctionEnd => {
                    let start = open.take().ok_or_else(|| {
                        CompilerError::internal(format!(".fnEnd at line {} outside a function", i))
                    })?;
                    functions.push(FunctionBlock::new(start, &self.instructions[start..=i])?);
                }
                _ => {}
            }
        }

        if let Some(start) = open {
            return Err(CompilerError::internal(format!(
                "function starting at line {} has no .fnEnd",
                start
            )));
        }

        Ok(functions)
    }

    /// Column view of the program
    pub fn quad_table(&self) -> Result<QuadTable, CompilerError> {
        let mut table = QuadTable::new();
        for inst in &self.instructions {
            table.add_line(inst.quadruple())?;
        }
        Ok(table)
    }

    /// Full IR text: the instructions followed by the string table
    pub fn render(&self, ctx: &CompilationContext) -> String {
        let mut out = self.to_string();
        for entry in ctx.strings() {
            out.push_str(&entry.to_string());
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for inst in &self.instructions {
            if inst.is_indented() {
                write!(f, "\t")?;
            }
            writeln!(f, "{}", inst)?;
        }
        Ok(())
    }
}

/// All instructions of one function, header and `.fnEnd` included
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionBlock<'a> {
    /// Index of the `.fnStart` line within the program
    pub start: usize,
    pub name: &'a Address,
    pub locals: u32,
    pub params: u32,
    pub instructions: &'a [Instruction],
}

impl<'a> FunctionBlock<'a> {
    fn new(start: usize, instructions: &'a [Instruction]) -> Result<Self, CompilerError> {
        match instructions.first() {
            Some(Instruction::FunctionStart { name, locals, params }) => Ok(Self {
                start,
                name,
                locals: *locals,
                params: *params,
                instructions,
            }),
            _ => Err(CompilerError::internal(format!(
                "function block at line {} does not begin with .fnStart",
                start
            ))),
        }
    }

    /// Label the function is entered through, e.g. `gf_main`
    pub fn label(&self) -> String {
        self.name.to_string()
    }

    /// Basic blocks of this function; `start` offsets are relative to the
    /// function's first line
    pub fn basic_blocks(&self) -> Vec<BasicBlock<'a>> {
        partition(self.instructions)
    }
}
