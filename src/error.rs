//! Error type shared by every stage of the sketch pipeline.

pub type SketchResult<T> = Result<T, SketchError>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SketchError {
    /// Zero dimensions or a pixel buffer whose length does not match them.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The caller's [`crate::pipeline::CancelToken`] fired between stages.
    #[error("sketch generation cancelled")]
    Cancelled,
}

impl SketchError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }
}
