//! Unified error handling for the swim-course library.
//!
//! The geometry core is infallible: degenerate input produces empty or zero
//! results. Errors only arise at the edges, when a session is handed bad
//! coordinates or unknown ids, when documents are (de)serialized, and when
//! share links or export files are produced.

use thiserror::Error;

/// Unified error type for swim-course operations.
#[derive(Debug, Error)]
pub enum CourseError {
    /// Coordinates outside [-90, 90] x [-180, 180] or not finite
    #[error("Element '{id}' has invalid coordinates ({lat}, {lng})")]
    InvalidCoordinates { id: String, lat: f64, lng: f64 },

    /// No element with this id exists in the course
    #[error("Element '{id}' not found")]
    ElementNotFound { id: String },

    /// Lap count below 1
    #[error("Lap count must be at least 1, got {laps}")]
    InvalidLaps { laps: u32 },

    /// Course document (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Share code could not be decoded into a course
    #[error("Share link decode failed: {message}")]
    ShareDecode { message: String },

    /// GPX/KML/CSV writer failed
    #[error("Export failed: {message}")]
    Export { message: String },
}

/// Result type alias for swim-course operations.
pub type Result<T> = std::result::Result<T, CourseError>;

/// Extension trait for converting lookups into course errors.
pub trait OptionExt<T> {
    /// Convert Option to Result with an element-not-found error.
    fn ok_or_not_found(self, id: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, id: &str) -> Result<T> {
        self.ok_or_else(|| CourseError::ElementNotFound { id: id.to_string() })
    }
}
