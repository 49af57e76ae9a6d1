// Error taxonomy surfaced to callers of the store, importer and API.
// Field-level extraction gaps are not errors: they end up as `None` on the record.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// No record matched a lookup or filter
    #[error("{0}")]
    NotFound(String),

    /// A required input was missing; nothing was persisted
    #[error("{message}")]
    Validation {
        message: String,
        path: Option<String>,
    },

    /// The import document is malformed at the envelope level
    #[error("{message}: {details}")]
    Parse { message: String, details: String },

    /// Persistence failure
    #[error("storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    pub fn not_found(message: impl Into<String>) -> Self {
        LedgerError::NotFound(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        LedgerError::Validation {
            message: message.into(),
            path: None,
        }
    }

    pub fn parse(message: impl Into<String>, details: impl ToString) -> Self {
        LedgerError::Parse {
            message: message.into(),
            details: details.to_string(),
        }
    }

    /// Short, human-readable headline (the `error` field of the API envelope)
    pub fn headline(&self) -> String {
        match self {
            LedgerError::NotFound(msg) => msg.clone(),
            LedgerError::Validation { message, .. } => message.clone(),
            LedgerError::Parse { message, .. } => message.clone(),
            LedgerError::Storage(_) => "Internal Server Error".to_string(),
        }
    }

    /// Underlying diagnostic detail, where there is one
    pub fn details(&self) -> Option<String> {
        match self {
            LedgerError::Parse { details, .. } => Some(details.clone()),
            LedgerError::Storage(details) => Some(details.clone()),
            LedgerError::NotFound(_) | LedgerError::Validation { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(err: rusqlite::Error) -> Self {
        LedgerError::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
