use crate::transport::ApiResponse;

/// Everything a client operation can fail with.
///
/// `Validation`, `AuthRequired` and `NoActiveThread` are decided locally and
/// never cost a round trip.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("{0}")]
    Validation(String),
    #[error("you need to log in first")]
    AuthRequired,
    #[error("no comment thread is open")]
    NoActiveThread,
    #[error("server rejected the request ({status}): {message}")]
    Remote { status: u16, message: String },
    #[error("could not load tracks ({status}): {message}")]
    Fetch { status: u16, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("track '{name}' was created but its file upload failed: {message}")]
    PartialCommit { name: String, message: String },
    #[error("unexpected response from server: {0}")]
    UnexpectedResponse(String),
}

impl ClientError {
    pub fn validation(message: impl Into<String>) -> Self {
        ClientError::Validation(message.into())
    }

    /// Build a `Remote` error from a non-success response.
    pub fn remote(response: &ApiResponse) -> Self {
        ClientError::Remote {
            status: response.status,
            message: response.error_message(),
        }
    }

    /// True for errors that never reached the network.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            ClientError::Validation(_) | ClientError::AuthRequired | ClientError::NoActiveThread
        )
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
