use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{kind} '{key}' already exists")]
    DuplicateKey { kind: &'static str, key: String },
    #[error("{kind} '{key}' not found")]
    NotFound { kind: &'static str, key: String },
    #[error("invalid command '{command}': {reason}")]
    InvalidCommand { command: String, reason: String },
    #[error("precondition violated: {0}")]
    PreconditionViolation(String),
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(String),
}

impl CoreError {
    pub(crate) fn duplicate(kind: &'static str, key: impl Into<String>) -> Self {
        Self::DuplicateKey {
            kind,
            key: key.into(),
        }
    }

    pub(crate) fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            key: key.into(),
        }
    }

    pub(crate) fn invalid_command(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCommand {
            command: command.into(),
            reason: reason.into(),
        }
    }
}
