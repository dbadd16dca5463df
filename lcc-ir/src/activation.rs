//! Activation Records
//!
//! One record per function being compiled. It hands out local and
//! parameter addresses and remembers which source name each was given to.

use crate::Address;
use lcc_common::{align_to, CompilerError, Width};
use log::trace;
use std::collections::HashMap;

/// Size of the length word stored in front of every array
pub const ARRAY_HEADER_BYTES: u32 = 4;

#[derive(Debug, Clone, Default)]
pub struct ActivationRecord {
    next_local: u32,
    next_param: u32,
    locals: HashMap<String, Address>,
    params: HashMap<String, Address>,
}

impl ActivationRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a scalar local. Word-sized locals start on a 4-byte boundary.
    pub fn new_local(&mut self, name: &str, width: Width) -> Result<Address, CompilerError> {
        if !width.is_scalar() {
            return Err(CompilerError::internal(format!(
                "local `{}` has width {}; arrays go through new_local_array",
                name, width
            )));
        }
        if width == Width::Word {
            self.next_local = align_to(self.next_local, 4)?;
        }
        let addr = Address::local(self.next_local, width);
        self.next_local += width.bytes();
        trace!("local {} -> {}", name, addr);
        self.locals.insert(name.to_string(), addr.clone());
        Ok(addr)
    }

    /// Allocate a local array of `bytes` bytes plus its length header
    pub fn new_local_array(&mut self, name: &str, bytes: u32) -> Result<Address, CompilerError> {
        self.next_local = align_to(self.next_local, 4)?;
        let addr = Address::local(self.next_local, Width::Unsized);
        self.next_local += bytes + ARRAY_HEADER_BYTES;
        trace!("local array {} ({} bytes) -> {}", name, bytes, addr);
        self.locals.insert(name.to_string(), addr.clone());
        Ok(addr)
    }

    /// Allocate the next parameter. Every parameter takes one 4-byte slot,
    /// whatever its width, so `offset / 4` is its position in the call.
    /// Unlike locals, a byte parameter is never packed next to another.
    pub fn new_param(&mut self, name: &str, width: Width) -> Result<Address, CompilerError> {
        if width == Width::Function {
            return Err(CompilerError::internal(format!(
                "cannot have non-byte or non-word width for parameter `{}`",
                name
            )));
        }
        let addr = Address::param(self.next_param, width);
        self.next_param += 4;
        self.params.insert(name.to_string(), addr.clone());
        Ok(addr)
    }

    pub fn local(&self, name: &str) -> Option<&Address> {
        self.locals.get(name)
    }

    pub fn param(&self, name: &str) -> Option<&Address> {
        self.params.get(name)
    }

    /// Bytes of local storage handed out so far
    pub fn local_bytes(&self) -> u32 {
        self.next_local
    }

    pub fn param_count(&self) -> u32 {
        self.next_param / 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_width_locals_stay_aligned() {
        let mut ar = ActivationRecord::new();
        let c = ar.new_local("c", Width::Byte).unwrap();
        let i = ar.new_local("i", Width::Word).unwrap();
        let d = ar.new_local("d", Width::Byte).unwrap();

        assert_eq!(c.to_string(), "l1@0");
        assert_eq!(i.to_string(), "l4@4");
        assert_eq!(d.to_string(), "l1@8");
        assert_eq!(ar.local_bytes(), 9);
        assert_eq!(ar.local("i"), Some(&i));
    }

    #[test]
    fn test_array_reserves_header() {
        let mut ar = ActivationRecord::new();
        ar.new_local("c", Width::Byte).unwrap();
        let arr = ar.new_local_array("buf", 10).unwrap();
        assert_eq!(arr.to_string(), "l0@4");
        assert_eq!(ar.local_bytes(), 18);
    }

    #[test]
    fn test_params_take_word_slots() {
        let mut ar = ActivationRecord::new();
        let a = ar.new_param("a", Width::Byte).unwrap();
        let b = ar.new_param("b", Width::Word).unwrap();
        let s = ar.new_param("s", Width::Unsized).unwrap();

        assert_eq!(a.to_string(), "p1@0");
        assert_eq!(b.to_string(), "p4@4");
        assert_eq!(s.to_string(), "p0@8");
        assert_eq!(s.param_index(), Some(2));
        assert_eq!(ar.param_count(), 3);
    }

    #[test]
    fn test_bad_widths_are_internal_errors() {
        let mut ar = ActivationRecord::new();
        assert!(matches!(
            ar.new_local("x", Width::Unsized),
            Err(CompilerError::InternalError { .. })
        ));
        assert!(ar.new_param("f", Width::Function).is_err());
    }
}
