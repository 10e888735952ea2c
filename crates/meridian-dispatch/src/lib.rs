//! Operation dispatch and block-edge processing.
//!
//! The outer node hands this layer a validated-signature context (the set
//! of keys that signed) and an [`Operation`]; it derives the required
//! authority, checks it against the stored account authorities, and routes
//! the operation to its single evaluator. Between operations the node
//! calls [`block::process_block_end`] once per block.
//!
//! [`Operation`]: meridian_protocol::Operation

#![deny(unsafe_code)]

pub mod block;

mod apply;
mod error;

pub use apply::apply_operation;
pub use error::DispatchError;
