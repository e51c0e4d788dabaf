//! Unified error type for the GitCode connector.
//!
//! Configuration errors abort a whole upload or removal batch before any
//! network call is made; every other variant is scoped to a single item and
//! is caught, logged, and reported at the item boundary.

/// Exact substring the remote API puts in its error body when the target
/// path already exists. Matched verbatim; do not loosen it, the wording is
/// part of the observable contract with the platform.
pub const DUPLICATE_SIGNATURE: &str = "A file with this name already exists";

/// Error type covering all failure modes of the connector.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No settings are stored under the connector's key.
    #[error("GitCode uploader is not configured")]
    ConfigurationMissing,

    /// Settings are present but malformed or fail validation.
    #[error("Invalid GitCode configuration: {0}")]
    Validation(String),

    /// The remote repository already contains a file at the target path.
    #[error("A file with this name already exists in the repository")]
    DuplicateName,

    /// Any other transport or HTTP failure during create, hash-fetch, or
    /// delete.
    #[error("{message}")]
    RemoteRequest {
        /// Raw error text, surfaced to the user as-is.
        message: String,
    },

    /// The hash-fetch response could not be parsed or lacks the `sha` field.
    #[error("Malformed content metadata response: {0}")]
    MalformedHashResponse(String),
}

impl Error {
    /// Classify a remote error body from a failed create request.
    ///
    /// The duplicate-name condition is recognised by an exact substring
    /// match; everything else is reported with the raw text.
    pub fn classify_remote(body: &str) -> Self {
        if body.contains(DUPLICATE_SIGNATURE) {
            Self::DuplicateName
        } else {
            Self::RemoteRequest {
                message: body.to_string(),
            }
        }
    }

    /// Create a new RemoteRequest error.
    pub fn remote<S: Into<String>>(message: S) -> Self {
        Self::RemoteRequest {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::RemoteRequest {
            message: err.to_string(),
        }
    }
}

/// Result type alias using the connector Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn classify_duplicate_by_signature() {
        let body = r#"{"message":"A file with this name already exists."}"#;
        assert_matches!(Error::classify_remote(body), Error::DuplicateName);
    }

    #[test]
    fn classify_other_errors_keep_raw_text() {
        let err = Error::classify_remote("401 Unauthorized");
        assert_matches!(
            err,
            Error::RemoteRequest { ref message } if message == "401 Unauthorized"
        );
        assert_eq!(err.to_string(), "401 Unauthorized");
    }

    #[test]
    fn configuration_missing_display() {
        assert_eq!(
            Error::ConfigurationMissing.to_string(),
            "GitCode uploader is not configured"
        );
    }
}
