//! Common types used throughout the compiler
//!
//! The IR only distinguishes a handful of storage widths; everything else
//! about LittleC's type system is gone by the time code reaches the backend.

use crate::CompilerError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Temporary variable identifier for IR
pub type TempId = u32;

/// String-literal identifier (the `<id>` in `S0_<id>`)
pub type StringId = u32;

/// Storage width of an IR address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Width {
    /// Arrays and strings: the address names a block, not a scalar (0)
    Unsized,
    /// char (1 byte)
    Byte,
    /// int (4 bytes)
    Word,
    /// Code label; written `f` in address encodings
    Function,
}

impl Width {
    /// Map a byte count from the front end onto a width.
    /// Only 0, 1 and 4 are legal.
    pub fn from_bytes(bytes: u32) -> Result<Self, CompilerError> {
        match bytes {
            0 => Ok(Width::Unsized),
            1 => Ok(Width::Byte),
            4 => Ok(Width::Word),
            other => Err(CompilerError::internal(format!(
                "cannot have non-byte or non-word width {}",
                other
            ))),
        }
    }

    /// Parse the width tag used inside address encodings and operator suffixes
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "0" => Some(Width::Unsized),
            "1" => Some(Width::Byte),
            "4" => Some(Width::Word),
            "f" => Some(Width::Function),
            _ => None,
        }
    }

    /// Size in bytes of a scalar of this width
    pub fn bytes(&self) -> u32 {
        match self {
            Width::Unsized | Width::Function => 0,
            Width::Byte => 1,
            Width::Word => 4,
        }
    }

    /// Widths that can be loaded into a register and stored back
    pub fn is_scalar(&self) -> bool {
        matches!(self, Width::Byte | Width::Word)
    }

    /// Natural width of an integer literal
    pub fn for_literal(value: i64) -> Self {
        if (-127..128).contains(&value) {
            Width::Byte
        } else {
            Width::Word
        }
    }
}

impl fmt::Display for Width {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Width::Unsized => write!(f, "0"),
            Width::Byte => write!(f, "1"),
            Width::Word => write!(f, "4"),
            Width::Function => write!(f, "f"),
        }
    }
}

/// Round `value` up to the next multiple of `align` (a power of two)
pub fn align_to(value: u32, align: u32) -> Result<u32, CompilerError> {
    debug_assert!(align.is_power_of_two());
    value
        .checked_add(align - 1)
        .map(|padded| padded & !(align - 1))
        .ok_or_else(|| CompilerError::internal(format!("{} bytes cannot be aligned to {}", value, align)))
}
