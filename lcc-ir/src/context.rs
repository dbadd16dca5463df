//! Compilation Context
//!
//! Program-scope state shared by every function of one compilation unit:
//! label and temporary counters, the string-literal table and the global
//! name tables. A context lives for one compilation; `reset` returns it to
//! the freshly constructed state so independent compilations never share
//! numbering.

use crate::Address;
use lcc_common::{CompilerError, StringId, TempId, Width};
use log::trace;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// One interned string literal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StringEntry {
    id: StringId,
    text: String,
}

impl StringEntry {
    pub fn id(&self) -> StringId {
        self.id
    }

    /// Decoded text (escape sequences already turned into characters)
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn address(&self) -> Address {
        Address::string(self.id)
    }

    /// Character count including the terminating NUL, as stored in the
    /// literal's length word
    pub fn declared_length(&self) -> u32 {
        self.text.chars().count() as u32 + 1
    }

    /// Byte values of the literal, NUL terminator included
    pub fn byte_values(&self) -> Vec<u32> {
        self.text.chars().map(|c| c as u32).chain(std::iter::once(0)).collect()
    }
}

impl fmt::Display for StringEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes: Vec<String> = self.byte_values().iter().map(|b| b.to_string()).collect();
        write!(
            f,
            "{}: .dw {}\n.db {}",
            self.address(),
            self.declared_length(),
            bytes.join(", ")
        )
    }
}

/// Decode the escape sequences LittleC string literals may contain
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('0') => out.push('\0'),
            Some('t') => out.push('\t'),
            Some('b') => out.push('\u{8}'),
            Some('r') => out.push('\r'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[derive(Debug, Clone, Default)]
pub struct CompilationContext {
    next_label: u32,
    next_temp: TempId,
    strings: Vec<StringEntry>,
    globals: BTreeMap<String, Address>,
    statics: BTreeMap<String, Address>,
}

impl CompilationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget every table and restart all counters
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Fresh jump label, `L1`, `L2`, ...
    pub fn new_label(&mut self) -> String {
        self.next_label += 1;
        format!("L{}", self.next_label)
    }

    /// Fresh temporary; ids are never reused within a compilation
    pub fn new_temp(&mut self, width: Width) -> Result<Address, CompilerError> {
        if !width.is_scalar() {
            return Err(CompilerError::internal(format!(
                "cannot have non-byte or non-word width {} for temporary variable",
                width
            )));
        }
        self.next_temp += 1;
        Ok(Address::temp(self.next_temp, width)?)
    }

    /// Keep the counters ahead of names read back from IR text
    pub(crate) fn observe(&mut self, addr: &Address) {
        if let crate::Location::Temporary(id) = addr.location() {
            self.next_temp = self.next_temp.max(*id);
        }
    }

    pub(crate) fn observe_label(&mut self, label: &str) {
        if let Some(n) = label.strip_prefix('L').and_then(|n| n.parse::<u32>().ok()) {
            self.next_label = self.next_label.max(n);
        }
    }

    pub fn new_global(&mut self, name: &str, width: Width) -> Result<Address, CompilerError> {
        check_variable_width(width, "global variable")?;
        let addr = Address::global(name, width);
        trace!("global {} -> {}", name, addr);
        self.globals.insert(name.to_string(), addr.clone());
        Ok(addr)
    }

    pub fn new_module(&mut self, name: &str, width: Width) -> Result<Address, CompilerError> {
        check_variable_width(width, "module-static variable")?;
        let addr = Address::module_static(name, width);
        self.statics.insert(name.to_string(), addr.clone());
        Ok(addr)
    }

    /// Register a function label in the matching name table
    pub fn new_function(&mut self, name: &str, exported: bool) -> Address {
        let addr = Address::function(name, exported);
        let table = if exported { &mut self.globals } else { &mut self.statics };
        table.insert(name.to_string(), addr.clone());
        addr
    }

    /// Intern a literal as written in source, decoding its escapes
    pub fn new_string_literal(&mut self, raw: &str) -> Address {
        self.intern_string(&unescape(raw))
    }

    /// Intern already-decoded text; identical texts share one entry
    pub fn intern_string(&mut self, text: &str) -> Address {
        if let Some(entry) = self.strings.iter().find(|e| e.text == text) {
            return entry.address();
        }
        let id = self.strings.iter().map(|e| e.id).max().unwrap_or(0) + 1;
        self.strings.push(StringEntry { id, text: text.to_string() });
        Address::string(id)
    }

    /// Register a string under a fixed id, as read back from IR text
    pub fn insert_string(&mut self, id: StringId, text: &str) -> Result<Address, CompilerError> {
        match self.strings.iter().find(|e| e.id == id) {
            Some(entry) if entry.text == text => return Ok(entry.address()),
            Some(_) => {
                return Err(CompilerError::internal(format!(
                    "string literal S0_{} defined twice with different contents",
                    id
                )))
            }
            None => {}
        }
        self.strings.push(StringEntry { id, text: text.to_string() });
        self.strings.sort_by_key(|e| e.id);
        Ok(Address::string(id))
    }

    pub fn strings(&self) -> &[StringEntry] {
        &self.strings
    }

    pub fn string(&self, id: StringId) -> Option<&StringEntry> {
        self.strings.iter().find(|e| e.id == id)
    }

    pub fn global(&self, name: &str) -> Option<&Address> {
        self.globals.get(name)
    }

    pub fn module_static(&self, name: &str) -> Option<&Address> {
        self.statics.get(name)
    }
}

fn check_variable_width(width: Width, what: &str) -> Result<(), CompilerError> {
    if width == Width::Function {
        return Err(CompilerError::internal(format!(
            "cannot have non-byte or non-word width for {}",
            what
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_labels_and_temps_are_monotonic() {
        let mut ctx = CompilationContext::new();
        assert_eq!(ctx.new_label(), "L1");
        assert_eq!(ctx.new_label(), "L2");
        assert_eq!(ctx.new_temp(Width::Word).unwrap().to_string(), "t4_1");
        assert_eq!(ctx.new_temp(Width::Byte).unwrap().to_string(), "t1_2");
        assert!(ctx.new_temp(Width::Unsized).is_err());
    }

    #[test]
    fn test_reset_restarts_numbering() {
        let mut ctx = CompilationContext::new();
        ctx.new_label();
        ctx.new_temp(Width::Word).unwrap();
        ctx.new_global("x", Width::Word).unwrap();
        ctx.new_string_literal("hi");

        ctx.reset();
        assert_eq!(ctx.new_label(), "L1");
        assert_eq!(ctx.new_temp(Width::Word).unwrap().to_string(), "t4_1");
        assert!(ctx.global("x").is_none());
        assert!(ctx.strings().is_empty());
    }

    #[test]
    fn test_string_interning_and_escapes() {
        let mut ctx = CompilationContext::new();
        let a = ctx.new_string_literal("hi\\n");
        let b = ctx.new_string_literal("bye");
        let c = ctx.new_string_literal("hi\\n");
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(ctx.strings().len(), 2);

        let entry = ctx.string(1).unwrap();
        assert_eq!(entry.text(), "hi\n");
        assert_eq!(entry.declared_length(), 4);
        assert_eq!(entry.to_string(), "S0_1: .dw 4\n.db 104, 105, 10, 0");
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"a\tb\0\r\b"), "a\tb\0\r\u{8}");
        assert_eq!(unescape(r"keep\q"), "keep\\q");
        assert_eq!(unescape("trailing\\"), "trailing\\");
    }

    #[test]
    fn test_insert_string_conflicts() {
        let mut ctx = CompilationContext::new();
        ctx.insert_string(2, "two").unwrap();
        ctx.insert_string(1, "one").unwrap();
        assert_eq!(ctx.strings()[0].id(), 1);
        assert!(ctx.insert_string(2, "two").is_ok());
        assert!(matches!(
            ctx.insert_string(2, "deux"),
            Err(CompilerError::InternalError { .. })
        ));
    }

    #[test]
    fn test_global_tables() {
        let mut ctx = CompilationContext::new();
        let g = ctx.new_global("count", Width::Word).unwrap();
        let m = ctx.new_module("buf", Width::Unsized).unwrap();
        let f = ctx.new_function("main", true);
        assert_eq!(ctx.global("count"), Some(&g));
        assert_eq!(ctx.module_static("buf"), Some(&m));
        assert_eq!(ctx.global("main"), Some(&f));
        assert!(ctx.new_global("bad", Width::Function).is_err());
    }
}
