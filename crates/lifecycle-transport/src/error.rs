//! Error taxonomy for transport actions (§7).
use thiserror::Error;

/// Errors a [`crate::TransportBackend`] may return.
///
/// [`TransportError::IndexNotFound`] and (on delete) [`TransportError::SnapshotInProgress`] are
/// given special handling by the thin wrappers in [`crate::TransportClient`]; everything else is
/// a plain transient per-index error recorded in the `ErrorStore` by the caller.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Idempotence-absorbed: the target index is already gone. Treated as success.
    #[error("index '{0}' not found")]
    IndexNotFound(String),

    /// A snapshot is in progress against the index being deleted; the next run retries.
    #[error("a snapshot of index '{0}' is in progress, delete deferred")]
    SnapshotInProgress(String),

    /// One or more shards explicitly reported a failure.
    #[error("{count} shard(s) failed: {detail}")]
    ShardFailure { count: u32, detail: String },

    /// The request was not acknowledged and no more specific reason was reported.
    #[error("request was not acknowledged")]
    NotAcknowledged,

    /// Any other transient transport-level failure.
    #[error("{0}")]
    Other(String),
}
