use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutoStateError {
    /// A schedule tag could not be evaluated (cron syntax, field count, timezone).
    #[error("Invalid schedule: {0}")]
    Validation(String),

    /// An invocation payload, trigger event or ARN had an unexpected shape.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The resource-description API failed for a reason other than "not found".
    #[error("Describe error: {0}")]
    Describe(String),

    /// The scheduling collaborator rejected a schedule request.
    #[error("Schedule error: {0}")]
    Schedule(String),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AutoStateError {
    /// Whether this error came from evaluating a schedule tag.
    pub fn is_validation(&self) -> bool {
        matches!(self, AutoStateError::Validation(_))
    }
}
