//! Error types for HD key derivation.

use thiserror::Error;

use crate::derivation::ChildIndex;

/// Result type for HD key derivation.
pub type Result<T> = core::result::Result<T, HdError>;

/// Errors produced while turning seed material and a path into a key pair.
///
/// Every variant is a deterministic function of the seed and path; none is
/// transient, so none is retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HdError {
    /// Malformed hex seed, empty seed bytes or an empty mnemonic.
    #[error("invalid seed encoding: {0}")]
    InvalidSeedEncoding(String),

    /// Master scalar is zero or not below the curve order.
    #[error("master key derived from seed is out of range")]
    InvalidMasterKey,

    /// Child scalar is zero or `IL` is not below the curve order.
    ///
    /// The caller may retry with the next index.
    #[error("child key at depth {depth} for index {index} is invalid")]
    InvalidChildKey { depth: u8, index: ChildIndex },

    /// Path text does not follow `m(/n['|H])*`, or an index is out of range.
    #[error("invalid derivation path: {0}")]
    InvalidPathSyntax(String),

    /// A path with no components was passed where a child is required.
    #[error("derivation path has no components")]
    EmptyPathError,

    /// The final scalar was rejected by the signing primitive.
    #[error("failed to construct key pair from derived scalar")]
    KeyPairConstructionError,
}
