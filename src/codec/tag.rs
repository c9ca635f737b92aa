//! Type tag definitions
//!
//! The tag travels in the item's 32-bit flags. Numbers are shared by every
//! client reading the same cache: append new kinds, never renumber.

use std::fmt;

/// Value kind stored in an item's flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum TypeTag {
    /// Bytes stored verbatim. Zero so foreign items with no flags read as raw.
    Raw = 0,
    Number = 1,
    Nil = 2,
    Boolean = 3,
    Generic = 4,
}

impl TypeTag {
    /// Map a flags word back to a tag; `None` for kinds this build does not know
    pub fn from_flags(flags: u32) -> Option<Self> {
        match flags {
            0 => Some(TypeTag::Raw),
            1 => Some(TypeTag::Number),
            2 => Some(TypeTag::Nil),
            3 => Some(TypeTag::Boolean),
            4 => Some(TypeTag::Generic),
            _ => None,
        }
    }

    /// Flags word written alongside the payload
    pub fn flags(self) -> u32 {
        self as u32
    }

    /// Lowercase name used in logs and error messages
    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Raw => "raw",
            TypeTag::Number => "number",
            TypeTag::Nil => "nil",
            TypeTag::Boolean => "boolean",
            TypeTag::Generic => "generic",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
