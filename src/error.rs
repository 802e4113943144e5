use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid tracker config: `{field}` = {value}")]
    InvalidConfig { field: &'static str, value: f32 },

    #[error("malformed container code: {0:?}")]
    InvalidContainerCode(String),

    #[error("container code not recognized: {0:?}")]
    Unrecognized(String),
}

/// Reason an upstream detector produced no usable output for a frame.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("detector failed: {reason}")]
pub struct DetectorError {
    pub reason: String,
}

impl DetectorError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}
