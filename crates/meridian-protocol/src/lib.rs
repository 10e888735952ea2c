//! The Meridian operation protocol.
//!
//! Operations form a closed sum type: every variant is matched exhaustively
//! by the dispatch layer, so adding an operation without an evaluator is a
//! compile error, not a runtime surprise. Each operation carries a stateless
//! `validate()` (shape checks only; stateful preconditions live in the
//! services) and a required-authority derivation consumed by dispatch.

#![deny(unsafe_code)]

mod operations;
mod proposal_action;
mod virtual_ops;

pub use operations::{Operation, RequiredAuthority};
pub use proposal_action::{GroupTokenShare, ProposalAction};
pub use virtual_ops::{FundKind, VirtualOperation};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of a research content item. The activity window length depends on
/// it: intermediate kinds stay relevant for two weeks, a final result for
/// two months.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchContentType {
    Announcement,
    Milestone,
    Review,
    FinalResult,
}

/// Lifecycle of a governance proposal. `Approved` is transient within a
/// single apply: a proposal that reaches quorum executes immediately and is
/// recorded as `Executed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Pending,
    Approved,
    Executed,
    Rejected,
    Expired,
}

/// Lifecycle of a research token sale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenSaleStatus {
    Inactive,
    Active,
    Finished,
    Expired,
}

/// Stateless validation failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("invalid account name: {0}")]
    InvalidAccountName(String),

    #[error("invalid asset symbol: {0}")]
    InvalidAssetSymbol(String),

    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(i64),

    #[error("percent out of range: {0}")]
    InvalidPercent(u16),

    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("{0}")]
    InvalidWindow(&'static str),

    #[error("soft cap must not exceed hard cap")]
    CapsInverted,
}
