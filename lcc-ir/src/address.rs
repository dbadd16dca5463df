//! IR Addresses
//!
//! An address names one storage location or literal. Its textual encoding
//! (`g4_x`, `l1@3`, `t4_7`, `S0_2`, `42`, ...) is both the IR concrete syntax
//! and the key the register allocator files values under, so equality,
//! ordering and hashing all go through the encoding.

use lcc_common::{CompilerError, StringId, TempId, Width};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("malformed address `{0}`")]
    Malformed(String),

    #[error("integer literal `{0}` does not fit in 32 bits")]
    LiteralOutOfRange(String),

    #[error("cannot change the width of non-literal address `{0}`")]
    FixedWidth(String),

    #[error("temporary {id} cannot have width {width}")]
    TempWidth { id: TempId, width: Width },
}

impl From<AddressError> for CompilerError {
    fn from(err: AddressError) -> Self {
        CompilerError::internal(err.to_string())
    }
}

/// Storage class of an address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressKind {
    Global,
    ModuleStatic,
    Local,
    Parameter,
    Temporary,
    IntLiteral,
    StringLiteral,
    Indexed,
}

/// Where an address lives. Offsets are byte offsets within the storage class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Global(String),
    ModuleStatic(String),
    Local(u32),
    Parameter(u32),
    Temporary(TempId),
    IntLiteral(i32),
    StringLiteral(StringId),
    Indexed { base: Box<Address>, index: Box<Address> },
}

#[derive(Debug, Clone)]
pub struct Address {
    location: Location,
    width: Width,
    encoded: String,
}

static NAMED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([gm])([014f])_([A-Za-z_][A-Za-z0-9_]*)$").expect("valid regex")
});
static OFFSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([lp])([014])@(\d+)$").expect("valid regex"));
static TEMP: Lazy<Regex> = Lazy::new(|| Regex::new(r"^t([14])_(\d+)$").expect("valid regex"));
static STRING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^S0_(\d+)$").expect("valid regex"));
static LITERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+$").expect("valid regex"));
static INDEXED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^\[\]]+)\[(.+)\]$").expect("valid regex"));

impl Address {
    fn new(location: Location, width: Width) -> Self {
        let encoded = encode(&location, width);
        Self { location, width, encoded }
    }

    pub fn global(name: &str, width: Width) -> Self {
        Self::new(Location::Global(name.to_string()), width)
    }

    pub fn module_static(name: &str, width: Width) -> Self {
        Self::new(Location::ModuleStatic(name.to_string()), width)
    }

    /// Code label for an exported (`gf_`) or file-local (`mf_`) function
    pub fn function(name: &str, exported: bool) -> Self {
        if exported {
            Self::global(name, Width::Function)
        } else {
            Self::module_static(name, Width::Function)
        }
    }

    pub fn local(offset: u32, width: Width) -> Self {
        Self::new(Location::Local(offset), width)
    }

    pub fn param(offset: u32, width: Width) -> Self {
        Self::new(Location::Parameter(offset), width)
    }

    /// Temporaries are always bytes or words
    pub fn temp(id: TempId, width: Width) -> Result<Self, AddressError> {
        if !width.is_scalar() {
            return Err(AddressError::TempWidth { id, width });
        }
        Ok(Self::new(Location::Temporary(id), width))
    }

    /// Integer literal at its natural width
    pub fn literal(value: i32) -> Self {
        Self::new(Location::IntLiteral(value), Width::for_literal(value as i64))
    }

    pub fn string(id: StringId) -> Self {
        Self::new(Location::StringLiteral(id), Width::Unsized)
    }

    pub fn indexed(base: Address, index: Address, width: Width) -> Self {
        Self::new(
            Location::Indexed {
                base: Box::new(base),
                index: Box::new(index),
            },
            width,
        )
    }

    /// Parse the textual encoding back into an address
    pub fn parse(text: &str) -> Result<Self, AddressError> {
        let malformed = || AddressError::Malformed(text.to_string());

        if LITERAL.is_match(text) {
            let value: i64 = text
                .parse()
                .map_err(|_| AddressError::LiteralOutOfRange(text.to_string()))?;
            let value = i32::try_from(value)
                .map_err(|_| AddressError::LiteralOutOfRange(text.to_string()))?;
            return Ok(Self::literal(value));
        }

        if let Some(caps) = NAMED.captures(text) {
            let width = Width::from_tag(&caps[2]).ok_or_else(malformed)?;
            let name = &caps[3];
            return Ok(match &caps[1] {
                "g" => Self::global(name, width),
                _ => Self::module_static(name, width),
            });
        }

        if let Some(caps) = OFFSET.captures(text) {
            let width = Width::from_tag(&caps[2]).ok_or_else(malformed)?;
            let offset: u32 = caps[3].parse().map_err(|_| malformed())?;
            return Ok(match &caps[1] {
                "l" => Self::local(offset, width),
                _ => Self::param(offset, width),
            });
        }

        if let Some(caps) = TEMP.captures(text) {
            let width = Width::from_tag(&caps[1]).ok_or_else(malformed)?;
            let id: TempId = caps[2].parse().map_err(|_| malformed())?;
            return Self::temp(id, width);
        }

        if let Some(caps) = STRING.captures(text) {
            let id: StringId = caps[1].parse().map_err(|_| malformed())?;
            return Ok(Self::string(id));
        }

        if let Some(caps) = INDEXED.captures(text) {
            let base = Self::parse(&caps[1])?;
            let index = Self::parse(&caps[2])?;
            let width = base.width;
            return Ok(Self::indexed(base, index, width));
        }

        Err(malformed())
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn width(&self) -> Width {
        self.width
    }

    /// The canonical encoding, also used as the allocator key
    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    pub fn kind(&self) -> AddressKind {
        match self.location {
            Location::Global(_) => AddressKind::Global,
            Location::ModuleStatic(_) => AddressKind::ModuleStatic,
            Location::Local(_) => AddressKind::Local,
            Location::Parameter(_) => AddressKind::Parameter,
            Location::Temporary(_) => AddressKind::Temporary,
            Location::IntLiteral(_) => AddressKind::IntLiteral,
            Location::StringLiteral(_) => AddressKind::StringLiteral,
            Location::Indexed { .. } => AddressKind::Indexed,
        }
    }

    /// Coerce a literal to the width of the context it is used in
    pub fn set_width(&mut self, width: Width) -> Result<(), AddressError> {
        if !self.is_literal() {
            return Err(AddressError::FixedWidth(self.encoded.clone()));
        }
        self.width = width;
        Ok(())
    }

    /// Copy of this address as seen from a context of the given width.
    /// Literals adopt the width; every other address is returned unchanged.
    pub fn adopt_width(&self, width: Width) -> Address {
        let mut adopted = self.clone();
        if adopted.is_literal() && width.is_scalar() {
            adopted.width = width;
        }
        adopted
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.location, Location::IntLiteral(_))
    }

    pub fn literal_value(&self) -> Option<i32> {
        match self.location {
            Location::IntLiteral(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_temp(&self) -> bool {
        matches!(self.location, Location::Temporary(_))
    }

    /// Globals and module statics: named storage that outlives the function
    pub fn is_static_storage(&self) -> bool {
        matches!(self.location, Location::Global(_) | Location::ModuleStatic(_))
            && self.width != Width::Function
    }

    pub fn is_function(&self) -> bool {
        self.width == Width::Function
    }

    /// Symbol name for globals, module statics and functions
    pub fn name(&self) -> Option<&str> {
        match &self.location {
            Location::Global(name) | Location::ModuleStatic(name) => Some(name),
            _ => None,
        }
    }

    /// Zero-based parameter index; every parameter occupies one 4-byte slot
    pub fn param_index(&self) -> Option<u32> {
        match self.location {
            Location::Parameter(offset) => Some(offset / 4),
            _ => None,
        }
    }
}

fn encode(location: &Location, width: Width) -> String {
    match location {
        Location::Global(name) => format!("g{}_{}", width, name),
        Location::ModuleStatic(name) => format!("m{}_{}", width, name),
        Location::Local(offset) => format!("l{}@{}", width, offset),
        Location::Parameter(offset) => format!("p{}@{}", width, offset),
        Location::Temporary(id) => format!("t{}_{}", width, id),
        Location::IntLiteral(value) => value.to_string(),
        Location::StringLiteral(id) => format!("S0_{}", id),
        Location::Indexed { base, index } => format!("{}[{}]", base, index),
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.encoded == other.encoded
    }
}

impl Eq for Address {}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.encoded.hash(state);
    }
}

impl PartialOrd for Address {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Address {
    fn cmp(&self, other: &Self) -> Ordering {
        self.encoded.cmp(&other.encoded)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encoded)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Address::parse(&text).map_err(serde::de::Error::custom)
    }
}
