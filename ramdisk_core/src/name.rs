//! 64-bit base-32 names used for accounts and file names.
//!
//! A name packs up to 13 characters into a `u64`. The first 12 characters
//! take 5 bits each (most significant first) and the 13th takes the low 4
//! bits:
//!
//! ```text
//! alphabet: .12345abcdefghijklmnopqrstuvwxyz   ('.' = 0, 'z' = 31)
//! 13th char: .12345abcdefghij only
//! ```
//!
//! Trailing dots are not significant, so `"abc"` is the canonical spelling
//! and `"abc."` is rejected when parsing.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Maximum number of characters in a name.
pub const MAX_NAME_LEN: usize = 13;

const CHARMAP: &[u8; 32] = b".12345abcdefghijklmnopqrstuvwxyz";

/// A 64-bit name.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Name(u64);

fn char_to_symbol(c: u8) -> Option<u64> {
    match c {
        b'a'..=b'z' => Some(u64::from(c - b'a') + 6),
        b'1'..=b'5' => Some(u64::from(c - b'1') + 1),
        b'.' => Some(0),
        _ => None,
    }
}

impl Name {
    /// The empty name (value 0).
    pub const EMPTY: Name = Name(0);

    /// Create a name from its raw value.
    pub const fn from_u64(value: u64) -> Self {
        Name(value)
    }

    /// Get the raw value.
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Parse a name from its string form.
    pub fn parse(s: &str) -> Result<Self> {
        let bytes = s.as_bytes();
        if bytes.len() > MAX_NAME_LEN {
            return Err(Error::invalid_name(
                s,
                format!("longer than {} characters", MAX_NAME_LEN),
            ));
        }

        let mut value = 0u64;
        for (i, &c) in bytes.iter().enumerate() {
            let symbol = char_to_symbol(c).ok_or_else(|| {
                Error::invalid_name(s, format!("invalid character '{}'", c as char))
            })?;

            if i < MAX_NAME_LEN - 1 {
                value |= symbol << (64 - 5 * (i + 1));
            } else {
                if symbol > 0x0f {
                    return Err(Error::invalid_name(
                        s,
                        "13th character must be one of .12345abcdefghij",
                    ));
                }
                value |= symbol;
            }
        }

        if s.ends_with('.') {
            return Err(Error::invalid_name(s, "trailing dots are not allowed"));
        }

        Ok(Name(value))
    }

    /// True for the empty name.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// The 13 character symbols, most significant first.
    fn symbols(&self) -> [u64; MAX_NAME_LEN] {
        let mut symbols = [0u64; MAX_NAME_LEN];
        for (i, symbol) in symbols.iter_mut().take(MAX_NAME_LEN - 1).enumerate() {
            *symbol = (self.0 >> (59 - 5 * i)) & 0x1f;
        }
        symbols[MAX_NAME_LEN - 1] = self.0 & 0x0f;
        symbols
    }

    /// Number of characters up to and including the last non-dot one.
    pub fn length(&self) -> usize {
        self.symbols()
            .iter()
            .rposition(|&symbol| symbol != 0)
            .map_or(0, |last| last + 1)
    }

    /// The part of the name after its last dot.
    ///
    /// Returns the name itself when it contains no dot before its last
    /// character, so `a.b.c` has suffix `c` and `alice` has suffix `alice`.
    pub fn suffix(&self) -> Name {
        let symbols = self.symbols();
        let len = self.length();

        let Some(dot) = symbols[..len].iter().rposition(|&symbol| symbol == 0) else {
            return *self;
        };

        let value = symbols[dot + 1..len]
            .iter()
            .enumerate()
            .fold(0u64, |acc, (i, &symbol)| acc | (symbol << (64 - 5 * (i + 1))));
        Name(value)
    }
}

impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Name::parse(s)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbols = self.symbols();
        let text: String = symbols[..self.length()]
            .iter()
            .map(|&symbol| CHARMAP[symbol as usize] as char)
            .collect();
        f.write_str(&text)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self)
    }
}

impl Serialize for Name {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Name::parse(&s).map_err(serde::de::Error::custom)
    }
}
