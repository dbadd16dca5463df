//! Lowering Module
//!
//! Entry points for turning IR into MIPS assembly, from a single
//! instruction up to a whole program.

mod function;
mod instruction;
mod module;

pub use function::lower_function;
pub use instruction::lower_instruction;
pub use module::generate_assembly;
