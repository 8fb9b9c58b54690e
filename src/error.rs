//! Error types shared by every component of the integration engine.

/// Result type for integration operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failures reported by the integration engine.
///
/// Every variant is a local, recoverable misuse of the API. None of them leave the session in a
/// partially updated state.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A cycle was requested with a sample count of zero.
    #[error("invalid sample count {0}: a cycle needs at least one sample")]
    InvalidSampleCount(u64),

    /// A cycle or reset arrived while another cycle was still running.
    #[error("integration session is busy running another cycle")]
    SessionBusy,

    /// An estimate was requested before any samples were accumulated.
    #[error("no samples accumulated yet, the estimate is undefined")]
    UninitializedAccumulator,

    /// The session configuration cannot be used.
    #[error("invalid session configuration: {0}")]
    InvalidConfig(String),

    /// The sampling domain is empty, inverted, or not finite.
    #[error("invalid bounding box: {0}")]
    InvalidBoundingBox(String),
}
