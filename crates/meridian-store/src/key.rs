//! Composite index keys.
//!
//! A key is an ordered sequence of parts; `Vec`'s lexicographic `Ord` gives
//! composite-key ordering for free, and a shorter key sorts before every key
//! it prefixes, which is what makes prefix scans contiguous.

use serde::{Deserialize, Serialize};

/// One segment of a composite key. Keys within a single index must use the
/// same segment shapes so cross-variant ordering never matters.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KeyPart {
    Bool(bool),
    U64(u64),
    I64(i64),
    Str(String),
}

impl From<bool> for KeyPart {
    fn from(v: bool) -> Self {
        KeyPart::Bool(v)
    }
}

impl From<u64> for KeyPart {
    fn from(v: u64) -> Self {
        KeyPart::U64(v)
    }
}

impl From<u32> for KeyPart {
    fn from(v: u32) -> Self {
        KeyPart::U64(v as u64)
    }
}

impl From<u16> for KeyPart {
    fn from(v: u16) -> Self {
        KeyPart::U64(v as u64)
    }
}

impl From<i64> for KeyPart {
    fn from(v: i64) -> Self {
        KeyPart::I64(v)
    }
}

impl From<&str> for KeyPart {
    fn from(v: &str) -> Self {
        KeyPart::Str(v.to_owned())
    }
}

impl From<String> for KeyPart {
    fn from(v: String) -> Self {
        KeyPart::Str(v)
    }
}

/// A composite key: ordered parts, compared lexicographically.
pub type Key = Vec<KeyPart>;

/// Build a key from anything convertible into parts.
#[macro_export]
macro_rules! key {
    ($($part:expr),* $(,)?) => {
        vec![$($crate::KeyPart::from($part)),*]
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_ordering_is_lexicographic() {
        let a: Key = key!["alice", 1u64];
        let b: Key = key!["alice", 2u64];
        let c: Key = key!["bob", 0u64];
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn prefix_sorts_before_extensions() {
        let prefix: Key = key!["alice"];
        let extended: Key = key!["alice", 0u64];
        assert!(prefix < extended);
        assert!(extended.starts_with(&prefix));
    }
}
