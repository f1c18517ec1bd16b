use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or incomplete request, caused by the client.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Similarity search against the context store failed.
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Writing a turn into the context store failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The completion engine failed or returned an unusable response.
    #[error("Completion error: {message}")]
    Completion {
        /// HTTP status of a non-success response, if the engine answered at all
        status: Option<u16>,
        message: String,
    },

    /// Raw adapter failure, before a service classifies it.
    #[error("Context store error: {0}")]
    Store(String),

    #[error("A message is already being processed")]
    ConversationBusy,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl Error {
    /// Helper for creating validation errors
    ///
    /// # Example
    /// ```
    /// use praytell_core::Error;
    /// let err = Error::validation("Missing required fields");
    /// assert!(err.is_validation());
    /// ```
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Helper for creating completion errors that never reached a response
    pub fn completion(msg: impl Into<String>) -> Self {
        Error::Completion {
            status: None,
            message: msg.into(),
        }
    }

    /// Helper for completion errors caused by a non-success HTTP status
    pub fn completion_status(status: u16, msg: impl Into<String>) -> Self {
        Error::Completion {
            status: Some(status),
            message: msg.into(),
        }
    }

    /// Helper for creating adapter-level store errors
    pub fn store(msg: impl Into<String>) -> Self {
        Error::Store(msg.into())
    }

    /// Helper for creating configuration errors
    ///
    /// # Example
    /// ```
    /// use praytell_core::Error;
    /// let err = Error::config_error("Unknown store provider");
    /// ```
    pub fn config_error(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    pub fn is_completion(&self) -> bool {
        matches!(self, Error::Completion { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_status_is_kept() {
        let err = Error::completion_status(503, "Service Unavailable");
        match err {
            Error::Completion { status, ref message } => {
                assert_eq!(status, Some(503));
                assert_eq!(message, "Service Unavailable");
            }
            _ => panic!("expected completion error"),
        }
        assert!(err.is_completion());
        assert!(!err.is_validation());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Error::validation("Missing required fields").to_string(),
            "Validation error: Missing required fields"
        );
        assert_eq!(
            Error::ConversationBusy.to_string(),
            "A message is already being processed"
        );
    }
}
