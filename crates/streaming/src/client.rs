//! Boundaries to the detail and network-trace collaborators.
//!
//! Everything runs on one cooperative event loop, so futures are not
//! required to be `Send`.

use std::future::Future;
use std::pin::Pin;

use foundation::{FeatureKind, FeatureUid, SubId, TraceDirection};

use crate::protocol::DetailPayload;

pub type LocalBoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    Transport(String),
    /// Non-success HTTP status.
    Status(u16),
    Decode(String),
    /// The request was aborted because a newer click superseded it.
    Cancelled,
}

impl FetchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Transport(msg) => write!(f, "transport error: {msg}"),
            FetchError::Status(status) => write!(f, "HTTP {status}"),
            FetchError::Decode(msg) => write!(f, "decode error: {msg}"),
            FetchError::Cancelled => write!(f, "request cancelled"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Per-feature detail lookup.
pub trait DetailService {
    fn fetch_detail(
        &self,
        kind: FeatureKind,
        subid: &SubId,
    ) -> LocalBoxFuture<'_, Result<DetailPayload, FetchError>>;
}

/// Upstream/downstream member lookup.
///
/// Implementations may or may not drop the clicked feature from the list;
/// callers filter it themselves.
pub trait TraceService {
    fn fetch_trace(
        &self,
        direction: TraceDirection,
        subid: &SubId,
    ) -> LocalBoxFuture<'_, Result<Vec<FeatureUid>, FetchError>>;
}
