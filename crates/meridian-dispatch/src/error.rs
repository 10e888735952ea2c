use meridian_protocol::ProtocolError;
use meridian_services::ChainError;
use meridian_types::AuthorityKind;
use thiserror::Error;

/// Failures surfacing from operation application.
///
/// Validation and authorization reject before any evaluator runs; a
/// `Chain` error means the evaluator itself refused, again with zero
/// partial mutation.
#[derive(Debug, Error, PartialEq)]
pub enum DispatchError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("signing keys do not satisfy the {kind:?} authority of {account}")]
    MissingAuthority {
        account: String,
        kind: AuthorityKind,
    },
}
