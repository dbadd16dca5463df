//! LittleC Compiler - Common Types and Utilities
//! 
//! This crate contains the error type and the small value types shared
//! by the IR, code generation and driver crates.

pub mod error;
pub mod types;

pub use error::CompilerError;
pub use types::*;
