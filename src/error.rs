use thiserror::Error;

/// Every way a task submission can fail.
///
/// None of these are fatal: the dispatcher turns them into the message shown
/// in the result panel.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TaskError {
    #[error("required field '{field}' is empty")]
    Validation { field: String },

    #[error("API key not configured")]
    MissingApiKey,

    #[error("unrecognized task type: {0}")]
    UnrecognizedTask(String),

    #[error("prompt construction failed")]
    EmptyPrompt,

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("provider error: {0}")]
    Provider(String),

    #[error("request failed: {0}")]
    Transport(String),
}

impl TaskError {
    pub fn validation(field: impl Into<String>) -> Self {
        TaskError::Validation {
            field: field.into(),
        }
    }

    /// Errors raised before anything was sent over the network.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            TaskError::Validation { .. }
                | TaskError::MissingApiKey
                | TaskError::UnrecognizedTask(_)
                | TaskError::EmptyPrompt
        )
    }
}

impl From<reqwest::Error> for TaskError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TaskError::Transport(format!("request timed out: {}", err))
        } else {
            TaskError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for TaskError {
    fn from(err: serde_json::Error) -> Self {
        TaskError::Transport(format!("failed to parse response: {}", err))
    }
}
