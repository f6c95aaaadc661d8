//! Error taxonomy for the favorites client

use crate::models::FolderId;

/// Errors produced by the backend client, the stores, and the controller
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No response was received (connection refused, DNS, timeout)
    #[error("Network error calling {endpoint}: {message}")]
    Network { endpoint: String, message: String },

    /// The server answered with a non-2xx status
    #[error("HTTP {status} from {endpoint}")]
    Fetch { status: u16, endpoint: String },

    /// A 2xx response whose body could not be decoded
    #[error("Invalid response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    /// Rejected client-side before any request was made
    #[error("{0}")]
    Validation(String),

    #[error("Folder {0} not found")]
    FolderNotFound(FolderId),

    #[error("The root folder cannot be deleted, moved, or renamed")]
    RootFolder,
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// Whether the error was raised locally without talking to the server
    pub fn is_client_side(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::FolderNotFound(_) | Error::RootFolder
        )
    }

    /// HTTP status for `Fetch` errors
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Fetch { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = Error::Fetch {
            status: 404,
            endpoint: "GET /api/folders/9".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 404 from GET /api/folders/9");
        assert_eq!(err.status(), Some(404));
        assert!(!err.is_client_side());

        let err = Error::FolderNotFound(FolderId(9));
        assert_eq!(err.to_string(), "Folder 9 not found");
        assert!(err.is_client_side());
        assert!(err.status().is_none());
    }
}
