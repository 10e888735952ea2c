//! Account authorities: weighted key sets per authority level.
//!
//! Signature verification itself happens in the transaction layer outside
//! this core; here an authority only answers whether a set of keys that
//! already signed carries enough weight.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// An already-verified signing key, as presented by the transaction context.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SigningKey(pub String);

impl SigningKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }
}

impl fmt::Display for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Authority level an operation requires from an account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityKind {
    Owner,
    Active,
    Posting,
}

/// Weighted key set with a satisfaction threshold.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authority {
    pub weight_threshold: u32,
    pub key_auths: BTreeMap<SigningKey, u16>,
}

impl Authority {
    /// Single-key authority with threshold 1.
    pub fn single(key: SigningKey) -> Self {
        let mut key_auths = BTreeMap::new();
        key_auths.insert(key, 1);
        Self {
            weight_threshold: 1,
            key_auths,
        }
    }

    /// An authority nobody can satisfy. Used to lock an account surrogate
    /// (e.g. a research group) out of direct key control.
    pub fn impossible() -> Self {
        Self {
            weight_threshold: 1,
            key_auths: BTreeMap::new(),
        }
    }

    /// Threshold must be satisfiable by the keys it lists (unless the
    /// authority is deliberately impossible-with-zero-keys).
    pub fn is_well_formed(&self) -> bool {
        if self.weight_threshold == 0 {
            return false;
        }
        true
    }

    pub fn total_weight(&self) -> u64 {
        self.key_auths.values().map(|w| *w as u64).sum()
    }

    /// Do the presented keys carry at least `weight_threshold` weight?
    pub fn is_satisfied_by(&self, signed: &BTreeSet<SigningKey>) -> bool {
        let mut weight: u64 = 0;
        for (key, w) in &self.key_auths {
            if signed.contains(key) {
                weight += *w as u64;
                if weight >= self.weight_threshold as u64 {
                    return true;
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(names: &[&str]) -> BTreeSet<SigningKey> {
        names.iter().map(|n| SigningKey::new(*n)).collect()
    }

    #[test]
    fn single_key_authority() {
        let auth = Authority::single(SigningKey::new("alice-active"));
        assert!(auth.is_satisfied_by(&keys(&["alice-active"])));
        assert!(!auth.is_satisfied_by(&keys(&["mallory"])));
    }

    #[test]
    fn weighted_multisig_threshold() {
        let mut auth = Authority::default();
        auth.weight_threshold = 2;
        auth.key_auths.insert(SigningKey::new("k1"), 1);
        auth.key_auths.insert(SigningKey::new("k2"), 1);
        auth.key_auths.insert(SigningKey::new("k3"), 2);

        assert!(!auth.is_satisfied_by(&keys(&["k1"])));
        assert!(auth.is_satisfied_by(&keys(&["k1", "k2"])));
        assert!(auth.is_satisfied_by(&keys(&["k3"])));
    }

    #[test]
    fn impossible_authority_rejects_everything() {
        let auth = Authority::impossible();
        assert!(!auth.is_satisfied_by(&keys(&["k1", "k2", "k3"])));
    }
}
