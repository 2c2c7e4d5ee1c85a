use thiserror::Error;

/// Message shown to the user when the generation call fails for any reason.
pub const COMPLETION_FAILED_MESSAGE: &str =
    "An error occurred while optimizing the query. Please check your API key and try again.";

/// Message shown when submit is pressed with nothing to analyze.
pub const EMPTY_QUERY_MESSAGE: &str = "Please enter a query or code to optimize.";

#[derive(Error, Debug)]
pub enum SqleanError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error("Generation API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Rendering error: {0}")]
    Rendering(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, SqleanError>;

/// Any failure of the remote generation call, normalized to one kind.
///
/// Transport, auth, remote-side and malformed-response failures all end up
/// here. The underlying cause is logged where the error is created and is
/// deliberately not carried, so it can never leak into the UI.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct CompletionError {
    message: String,
}

impl CompletionError {
    pub fn new() -> Self {
        Self {
            message: COMPLETION_FAILED_MESSAGE.to_string(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Default for CompletionError {
    fn default() -> Self {
        Self::new()
    }
}
