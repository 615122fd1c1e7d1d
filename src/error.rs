use crate::transport::TransportError;
use std::sync::Arc;
use thiserror::Error;

/// Unified error type for the cache engine.
///
/// Storage-layer failures are recovered internally by degrading to "no
/// cache"; the variants below are the ones that can actually reach a
/// caller, plus the store/serialization classes the engine handles (and
/// logs) on its own read/write paths.
#[derive(Debug, Error)]
pub enum Error {
    /// Network transport failure on a path the caller is waiting on.
    ///
    /// Reference-counted because a coalesced fetch has several waiters
    /// and each of them observes the same rejection.
    #[error("network transport error: {0}")]
    Transport(Arc<TransportError>),

    /// Backend storage failure (disk store reads/writes, directory ops).
    #[error("store error: {0}")]
    Store(#[from] std::io::Error),

    /// A payload or stored entry could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The task driving a coalesced foreground fetch panicked. Every
    /// waiter joined on that fetch observes this error; the pending slot
    /// is still released.
    #[error("coalesced request task panicked: {0}")]
    RequestPanicked(String),
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        Error::Transport(Arc::new(err))
    }
}

impl Error {
    /// True when retrying the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::RequestPanicked(_))
    }
}
