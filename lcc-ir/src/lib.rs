//! LittleC Compiler - Intermediate Representation
//! 
//! Three-address code as consumed by the MIPS backend.
//! 
//! ## Architecture
//! 
//! - `address` - Tagged storage locations and their textual encoding
//! - `context` - Program-wide tables (labels, temps, strings, globals)
//! - `activation` - Per-function local/parameter allocation
//! - `instruction` - The closed instruction variant and its IR text form
//! - `quad` - Legacy 4-column quadruple view and debugging table
//! - `program` - Ordered instruction store and function blocks
//! - `blocks` - Basic-block partitioning
//! - `parse` - IR text parser
//! - `builder` - Construction helper for front ends and tests

pub use self::address::{Address, AddressError, AddressKind, Location};
pub use self::context::{CompilationContext, StringEntry};
pub use self::activation::ActivationRecord;
pub use self::instruction::{
    BinaryOp, CastKind, Condition, DataItem, DataKind, Instruction, RelOp, UnaryOp,
};
pub use self::quad::{QuadTable, Quadruple};
pub use self::program::{FunctionBlock, Program};
pub use self::blocks::{partition, BasicBlock};
pub use self::parse::parse_program;
pub use self::builder::IrBuilder;

mod address;
mod context;
mod activation;
mod instruction;
mod quad;
mod program;
mod blocks;
mod parse;
mod builder;
