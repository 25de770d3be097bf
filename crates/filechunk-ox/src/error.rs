use filechunk_common::CommonRequestError;
use thiserror::Error;

/// Errors that can occur while configuring or running an upload
#[derive(Debug, Error)]
pub enum FilechunkError {
    /// The upload context (or field settings) cannot be used
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Network or connection failure, no usable response
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a body that is not the expected JSON
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The server answered with a non-success status
    #[error("{message}")]
    Server { status: u16, message: String },

    /// Success status on the terminal chunk but no file id or hash
    #[error("File could not be completely uploaded")]
    IncompleteUpload,

    /// The upload was cancelled between or during chunk requests
    #[error("Upload cancelled")]
    Cancelled,

    /// Reading the local file failed
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A persisted field value could not be parsed
    #[error("Invalid field value: {0}")]
    InvalidFieldValue(String),

    /// Accepting more files would exceed the field's maximum
    #[error("A maximum of {max} elements is allowed")]
    TooManyFiles { max: usize },
}

impl From<CommonRequestError> for FilechunkError {
    fn from(error: CommonRequestError) -> Self {
        match error {
            CommonRequestError::Http(e) => FilechunkError::Transport(e),
            CommonRequestError::InvalidHeader { name, reason } => {
                FilechunkError::InvalidConfiguration(format!("header {name} cannot be sent: {reason}"))
            }
        }
    }
}

impl FilechunkError {
    /// HTTP status of a server rejection, if that is what this is
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            FilechunkError::Server { status, .. } => Some(*status),
            FilechunkError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        FilechunkError::InvalidConfiguration(message.into())
    }
}
