//! Error taxonomy shared by every operation in the crate.

/// Failures surfaced to callers.
///
/// A missing route arc between two known nodes is not an error; it degrades
/// to a straight segment instead.
#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    /// Caller-fixable bad or missing parameters.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A referenced tour, point, node or polygon does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The isochrone or geocoding service failed, timed out or returned an
    /// unusable payload.
    #[error("Upstream service unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The relational store could not complete a read or an atomic write.
    #[error("Persistence failure: {0}")]
    Persistence(#[from] rusqlite::Error),
}

impl From<reqwest::Error> for GeoError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GeoError::UpstreamUnavailable(format!("request timed out: {}", err))
        } else {
            GeoError::UpstreamUnavailable(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, GeoError>;
