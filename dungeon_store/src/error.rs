use dungeon_proto::PayloadError;
use thiserror::Error;

/// Failure to reach the store at all (network, TLS, non-success status).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("http status {0}")]
    Status(u16),
}

/// Error raised by a single store operation.
///
/// Authentication failures are indistinguishable from other application
/// errors; both surface as `ERR`-prefixed bodies and land in [`StoreError::Api`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("transport: {0}")]
    Transport(#[from] TransportError),
    #[error("{page}: store answered '{body}'")]
    Api { page: &'static str, body: String },
    #[error("{page}: malformed payload: {source}")]
    Malformed {
        page: &'static str,
        #[source]
        source: PayloadError,
    },
}

impl StoreError {
    pub(crate) fn malformed(page: &'static str, source: PayloadError) -> Self {
        StoreError::Malformed { page, source }
    }
}
