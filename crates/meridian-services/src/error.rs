use meridian_types::{AssetError, Share};
use meridian_store::StoreError;
use thiserror::Error;

/// Failures raised by the service layer.
///
/// `NotFound` and `NotFoundByKey` signal a missing entity; every other
/// variant is a precondition violation. Either way the enclosing operation
/// aborts with zero partial mutation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChainError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error("{entity} not found by {key}")]
    NotFoundByKey { entity: &'static str, key: String },

    #[error("{entity} already exists for {key}")]
    AlreadyExists { entity: &'static str, key: String },

    #[error("account {account} has {available} {symbol}, needs {required}")]
    InsufficientFunds {
        account: String,
        symbol: String,
        available: Share,
        required: Share,
    },

    #[error("{holder} holds {available} tokens, needs {required}")]
    InsufficientTokens {
        holder: String,
        available: Share,
        required: Share,
    },

    #[error("invalid amount: {0}")]
    InvalidAmount(Share),

    #[error("fee {paid} is below the minimum of {minimum}")]
    FeeTooLow { paid: Share, minimum: Share },

    #[error("percent out of range: {0}")]
    InvalidPercent(u16),

    #[error("{voter} already voted on {target}")]
    DuplicateVote { voter: String, target: String },

    #[error("{account} is not a member of research group {group}")]
    NotAMember { account: String, group: u64 },

    #[error("{0}")]
    WindowViolation(&'static str),

    #[error("fund per-block allocation {per_block} is below the minimum")]
    FundTooThin { per_block: Share },

    #[error("owner {owner} already runs the maximum number of funds")]
    TooManyFunds { owner: String },

    #[error("{0}")]
    InvalidState(&'static str),

    #[error("{0}")]
    InvalidReference(&'static str),
}

impl ChainError {
    pub fn not_found_by_key(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFoundByKey {
            entity,
            key: key.into(),
        }
    }

    pub fn already_exists(entity: &'static str, key: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity,
            key: key.into(),
        }
    }
}
