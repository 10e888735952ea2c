//! Core types shared by every Meridian crate.
//!
//! Ids are dense sequential integers assigned by the object store — replay
//! on any node must produce the same id for the same row, so nothing here
//! is random. Amounts are integer minor units of an asset.

#![deny(unsafe_code)]

pub mod asset;
pub mod authority;
pub mod clock;
pub mod config;
pub mod ids;
pub mod percent;

pub use asset::{Asset, AssetError, AssetSymbol, Share};
pub use authority::{Authority, AuthorityKind, SigningKey};
pub use clock::BlockClock;
pub use ids::*;
pub use percent::Percent;
