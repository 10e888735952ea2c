//! Indexed in-memory object store.
//!
//! One `Table<T>` per entity type: a primary arena keyed by a monotonically
//! assigned integer id plus explicit ordered secondary indices (unique or
//! ranged) declared by the row type. Index maintenance is transactional with
//! the primary mutation: `insert`, `update` and `remove` either apply fully
//! (row and every index) or fail without touching anything.
//!
//! Iteration over the primary arena and over every secondary index is in
//! ascending key order, which replaying nodes rely on for bit-identical
//! state.

#![deny(unsafe_code)]

mod key;
mod table;

pub use key::{Key, KeyPart};
pub use table::{IndexEntry, IndexSpec, Row, Table};

use thiserror::Error;

/// Failures of the object store itself.
///
/// `NotFound` is the one expected, routinely handled kind; the rest indicate
/// a violated caller contract (duplicate unique key, unknown index name).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{entity} with id {id} does not exist")]
    NotFound { entity: &'static str, id: u64 },

    #[error("duplicate key in unique index {index} of {entity}")]
    DuplicateKey {
        entity: &'static str,
        index: &'static str,
    },

    #[error("{entity} has no index named {index}")]
    UnknownIndex {
        entity: &'static str,
        index: &'static str,
    },

    #[error("update must not change the id of {entity} row {id}")]
    IdMutation { entity: &'static str, id: u64 },
}
