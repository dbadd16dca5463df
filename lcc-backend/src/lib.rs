//! LittleC Compiler - Backend
//!
//! Lowers three-address IR to MIPS assembly.
//!
//! ## Architecture
//!
//! - `regmgmt` - Register and address descriptors for the scratch registers
//! - `function` - Frame layout, prologue/epilogue and the function builder
//! - `lower` - Instruction, function and module lowering

pub mod function;
pub mod lower;
pub mod regmgmt;

pub use function::{FunctionBuilder, FunctionFrame};
pub use lower::{generate_assembly, lower_function, lower_instruction};
pub use regmgmt::{CanonicalLocation, FlushScope, Home, RegisterState};

use lcc_common::CompilerError;
use lcc_ir::{parse_program, CompilationContext};
use serde::{Deserialize, Serialize};

/// Options for code generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodegenOptions {
    /// Run the peephole optimizer over every function
    pub optimize: bool,
    /// Emit the runtime library and the `main` entry point
    pub runtime: bool,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            optimize: true,
            runtime: true,
        }
    }
}

/// Parse IR text in a fresh context and generate assembly for it
pub fn compile_ir(text: &str, options: &CodegenOptions) -> Result<String, CompilerError> {
    let mut ctx = CompilationContext::new();
    let program = parse_program(text, &mut ctx)?;
    generate_assembly(&program, &ctx, options)
}
