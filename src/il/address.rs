//! Address resolver.
//!
//! Every operand that names a storage cell goes through here. The prefix
//! letter picks the domain:
//!
//! | Prefix | Domain          | Identifier form |
//! |--------|-----------------|-----------------|
//! | `I`    | input           | `byte.bit`      |
//! | `Q`    | output          | `byte.bit`      |
//! | `M`    | boolean memory  | integer         |
//! | `T`    | timer           | integer         |
//! | `C`    | counter         | integer         |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The address space an operand lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    Input,
    Output,
    Memory,
    Timer,
    Counter,
}

impl Domain {
    /// Map a prefix letter to its domain.
    pub fn from_prefix(c: char) -> Option<Self> {
        match c {
            'I' => Some(Domain::Input),
            'Q' => Some(Domain::Output),
            'M' => Some(Domain::Memory),
            'T' => Some(Domain::Timer),
            'C' => Some(Domain::Counter),
            _ => None,
        }
    }

    /// The prefix letter used in program text.
    pub fn prefix(self) -> char {
        match self {
            Domain::Input => 'I',
            Domain::Output => 'Q',
            Domain::Memory => 'M',
            Domain::Timer => 'T',
            Domain::Counter => 'C',
        }
    }

    /// True for the domains backed by the memory-variable table.
    pub fn is_memory(self) -> bool {
        matches!(self, Domain::Memory | Domain::Timer | Domain::Counter)
    }

    /// True for the physical I/O domains.
    pub fn is_io(self) -> bool {
        matches!(self, Domain::Input | Domain::Output)
    }

    /// True for timer and counter cells, which expose their done bit when read.
    pub fn reads_done_bit(self) -> bool {
        matches!(self, Domain::Timer | Domain::Counter)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Domain::Input => "input",
            Domain::Output => "output",
            Domain::Memory => "memory",
            Domain::Timer => "timer",
            Domain::Counter => "counter",
        };
        f.write_str(name)
    }
}

/// Numeric identity of an address within its domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Index {
    /// `byte.bit` form used by inputs and outputs.
    Bit { byte: u32, bit: u32 },
    /// Plain integer used by memory, timer and counter cells.
    Word(u32),
}

/// A resolved address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    pub domain: Domain,
    pub index: Index,
}

impl Address {
    /// Resolve an address string.
    ///
    /// Case is normalised before matching, so `m1` and `M1` are the same cell.
    pub fn parse(text: &str) -> Result<Self, AddressError> {
        let text = text.trim();
        let mut chars = text.chars();
        let prefix = chars
            .next()
            .ok_or(AddressError::Empty)?
            .to_ascii_uppercase();
        let domain = Domain::from_prefix(prefix)
            .ok_or_else(|| AddressError::UnknownDomain(text.to_string()))?;
        let rest = chars.as_str();

        let index = if domain.is_io() {
            parse_bit_index(rest)
        } else {
            parse_word(rest).map(Index::Word)
        }
        .ok_or_else(|| AddressError::Malformed(text.to_string()))?;

        Ok(Self { domain, index })
    }

    /// Canonical key used by the tables (`I0.3`, `M12`, ...).
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Index::Bit { byte, bit } => write!(f, "{}{}.{}", self.domain.prefix(), byte, bit),
            Index::Word(n) => write!(f, "{}{}", self.domain.prefix(), n),
        }
    }
}

fn parse_word(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_bit_index(s: &str) -> Option<Index> {
    let (byte, bit) = s.split_once('.')?;
    Some(Index::Bit {
        byte: parse_word(byte)?,
        bit: parse_word(bit)?,
    })
}

/// Errors produced while resolving an address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("missing address")]
    Empty,

    #[error("address {0} does not name an input, output, memory, timer or counter")]
    UnknownDomain(String),

    #[error("address {0} is malformed")]
    Malformed(String),
}
