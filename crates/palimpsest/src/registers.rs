//! Named registers for yank and put.

use std::collections::BTreeMap;
use std::fmt;

/// Register used by yank/put when no register is named.
pub const DEFAULT_REGISTER: char = '"';

/// A stored text fragment. `line_wise` marks whole-line content for paste.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Register {
    pub text: String,
    pub line_wise: bool,
}

impl Register {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            line_wise: false,
        }
    }

    pub fn line_wise(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            line_wise: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Register key. A `char` and the equivalent one-character string are the same key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegisterName(String);

impl RegisterName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<char> for RegisterName {
    fn from(c: char) -> Self {
        Self(c.to_string())
    }
}

impl From<&str> for RegisterName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RegisterName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for RegisterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Registers {
    map: BTreeMap<RegisterName, Register>,
}

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<RegisterName>, register: Register) {
        self.map.insert(name.into(), register);
    }

    pub fn set_text(&mut self, name: impl Into<RegisterName>, text: impl Into<String>) {
        self.set(name, Register::new(text));
    }

    /// Returns the register, creating an empty one on first use.
    pub fn get(&mut self, name: impl Into<RegisterName>) -> &mut Register {
        self.map.entry(name.into()).or_default()
    }

    /// Read-only lookup that does not create anything.
    pub fn peek(&self, name: impl Into<RegisterName>) -> Option<&Register> {
        self.map.get(&name.into())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RegisterName, &Register)> {
        self.map.iter()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
