//! Protocol constants.
//!
//! These values are consensus-critical: changing any of them changes the
//! post-state every node computes for the same operation log.

use crate::asset::{AssetSymbol, Share};

/// 100% on the protocol percent basis.
pub const PERCENT_100: u16 = 10_000;
/// 1% on the protocol percent basis.
pub const PERCENT_1: u16 = 100;

/// Ticker of the chain's native asset.
pub const NATIVE_SYMBOL: &str = "MRD";
/// Decimal places of the native asset.
pub const NATIVE_PRECISION: u8 = 3;

pub fn native_symbol() -> AssetSymbol {
    AssetSymbol::new(NATIVE_SYMBOL)
}

/// Seconds between blocks, used to convert time spans into block counts.
pub const BLOCK_INTERVAL_SECS: i64 = 3;

/// Minimum per-block payout a fund engine may be created with. Guards
/// against sub-unit rates that could never pay out.
pub const MIN_FUND_PER_BLOCK: Share = 1;

/// Per-owner cap on simultaneously active fund engine rows.
pub const MAX_FUNDS_PER_OWNER: usize = 100;

/// Proposal lifetime bounds, seconds.
pub const PROPOSAL_LIFETIME_MIN_SECS: i64 = 60 * 60 * 24;
pub const PROPOSAL_LIFETIME_MAX_SECS: i64 = 60 * 60 * 24 * 10;

/// How long a membership invite stays open before the sweep removes it.
pub const INVITE_LIFETIME_SECS: i64 = 60 * 60 * 24 * 14;
/// How long a join request stays open before the sweep removes it.
pub const JOIN_REQUEST_LIFETIME_SECS: i64 = 60 * 60 * 24 * 14;

/// Activity window length for announcements, milestones and reviews.
pub const ACTIVITY_WINDOW_INTERMEDIATE_SECS: i64 = 60 * 60 * 24 * 14;
/// Activity window length for final results.
pub const ACTIVITY_WINDOW_FINAL_SECS: i64 = 60 * 60 * 24 * 60;

/// Full expertise voting power on the regeneration scale.
pub const VOTING_POWER_FULL: i64 = PERCENT_100 as i64;
/// Seconds to regenerate from zero to full voting power.
pub const VOTE_REGENERATION_SECS: i64 = 60 * 60 * 24 * 5;

/// ECI reviewer influence factor (`Cea` in the contribution formula).
pub const ECI_REVIEWER_INFLUENCE: f64 = 1.0;
/// ECI curator influence factor (`Cva` in the contribution formula).
pub const ECI_CURATOR_INFLUENCE: f64 = 1.0;

/// Minimum fee a creator must pay for a new account. The fee becomes the
/// new account's common tokens, so it is a floor, not a burn.
pub const ACCOUNT_CREATION_FEE: Share = 1;
