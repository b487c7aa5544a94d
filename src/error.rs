//! Error type shared by every filter entry point.

/// Errors returned by the oil paint filters and their orchestration layer.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// A parameter is outside the supported range.
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Name of the offending parameter.
        name: &'static str,
        /// Human readable description of the violated constraint.
        reason: String,
    },

    /// The image is empty, has an unsupported channel count, or its buffer
    /// does not match its dimensions.
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// The caller cancelled the operation before it completed.
    #[error("Filter cancelled")]
    Cancelled,

    /// The output buffer could not be allocated.
    #[error("Failed to allocate {bytes} bytes for the output image")]
    OutOfMemory {
        /// Size of the allocation that failed.
        bytes: usize,
    },
}

impl FilterError {
    pub(crate) fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        FilterError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

impl From<ndarray::ShapeError> for FilterError {
    fn from(err: ndarray::ShapeError) -> Self {
        FilterError::InvalidImage(err.to_string())
    }
}
