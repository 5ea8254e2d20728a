use thiserror::Error;

/// Errors surfaced by the pipeline.
///
/// `Configuration` is fatal and only ever raised while building a session,
/// before any capture thread exists. `Network` is recoverable: the consumer
/// loop absorbs it per iteration and keeps streaming. `Internal` covers
/// local faults with no better home (thread spawn, in-memory WAV encoding)
/// and maps to a generic server error over HTTP.
#[derive(Debug, Error)]
pub enum LuminoError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("audio device error: {0}")]
    Device(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("session is already running")]
    AlreadyRunning,

    #[error("operation `{0}` requires an idle session")]
    NotIdle(&'static str),
}

impl From<reqwest::Error> for LuminoError {
    fn from(err: reqwest::Error) -> Self {
        LuminoError::Network(err.to_string())
    }
}

pub type Result<T, E = LuminoError> = std::result::Result<T, E>;
