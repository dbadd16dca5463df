//! Register Management
//! 
//! Descriptor-based allocation of the MIPS scratch registers for one
//! function at a time.
//! 
//! ## Architecture
//! 
//! - `RegisterState` - address and register descriptors, load/store emission
//! - `CanonicalLocation` - where a value lives when it is not in a register;
//!   implemented by the function frame
//! 
//! ## Invariants
//! 
//! - `A ∈ reg_desc[R]` exactly when `R ∈ addr_desc[A]`
//! - A dirty value (register newer than memory) is held in some register
//! - Descriptor contents never outlive a basic block

use lcc_codegen::{Mem, Reg};
use lcc_common::CompilerError;
use lcc_ir::Address;

pub use self::state::{Dest, FlushScope, RegisterState};

mod state;

#[cfg(test)]
mod tests;

/// Canonical location of a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Home {
    /// Lives permanently in a register (register-passed parameters)
    Register(Reg),
    Memory(Mem),
}

/// Resolves addresses to their canonical locations
pub trait CanonicalLocation {
    fn home(&mut self, addr: &Address) -> Result<Home, CompilerError>;
}
