//! Qubit and classical bit types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a qubit within a circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QubitId(pub u32);

impl fmt::Display for QubitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

impl From<u32> for QubitId {
    fn from(id: u32) -> Self {
        QubitId(id)
    }
}

/// Identifier of a classical bit within a circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClbitId(pub u32);

impl fmt::Display for ClbitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

impl From<u32> for ClbitId {
    fn from(id: u32) -> Self {
        ClbitId(id)
    }
}

/// A qubit and the register slot it occupies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Qubit {
    /// Circuit-wide identifier.
    pub id: QubitId,
    /// Owning register name.
    pub register: String,
    /// Index within the register.
    pub index: u32,
}

impl Qubit {
    /// Create a qubit belonging to `register` at `index`.
    pub fn new(id: QubitId, register: impl Into<String>, index: u32) -> Self {
        Self {
            id,
            register: register.into(),
            index,
        }
    }
}

impl fmt::Display for Qubit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.register, self.index)
    }
}

/// A classical bit and the register slot it occupies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Clbit {
    /// Circuit-wide identifier.
    pub id: ClbitId,
    /// Owning register name.
    pub register: String,
    /// Index within the register.
    pub index: u32,
}

impl Clbit {
    /// Create a classical bit belonging to `register` at `index`.
    pub fn new(id: ClbitId, register: impl Into<String>, index: u32) -> Self {
        Self {
            id,
            register: register.into(),
            index,
        }
    }
}

impl fmt::Display for Clbit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.register, self.index)
    }
}
