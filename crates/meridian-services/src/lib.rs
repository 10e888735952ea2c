//! Business logic of the chain: one service per domain, all reached
//! through [`ServiceRegistry`].
//!
//! Services validate preconditions up front and only then mutate, so a
//! rejected call leaves the registry untouched. State lives in the
//! registry's tables; side effects interesting to the outside world are
//! recorded as virtual operations for the dispatch layer to drain.

#![deny(unsafe_code)]

pub mod genesis;

mod error;
mod registry;
pub mod rows;
pub mod services;

pub use error::ChainError;
pub use registry::ServiceRegistry;
