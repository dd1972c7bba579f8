use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("No V4L2 devices specified")]
    NoDevices,
    #[error("Camera {0} not found")]
    UnknownCamera(String),
    #[error("{0}")]
    Invalid(String),
    #[error("{0}")]
    CommandFailed(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ControlError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}
