//! Job-level error types

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A batch flush failed; every mutation in the batch shares this error
#[derive(Debug, Clone, Error)]
#[error("Failed to write batch of {mutations} mutation(s) to table '{table}': {message}")]
pub struct WriteError {
    pub table: String,
    pub mutations: usize,
    pub message: String,
}

impl WriteError {
    pub fn new(table: impl Into<String>, mutations: usize, message: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            mutations,
            message: message.into(),
        }
    }
}

/// Table administration failed
#[derive(Debug, Clone, Error)]
#[error("Table admin operation on '{table}' failed: {message}")]
pub struct AdminError {
    pub table: String,
    pub message: String,
}

impl AdminError {
    pub fn new(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            message: message.into(),
        }
    }
}

/// Why an import job ended in the failed state
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Table '{table}' does not exist and table creation is disabled")]
    MissingTable { table: String },

    #[error("Store client is unavailable: {reason}")]
    ClientUnavailable { reason: String },

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    Admin(#[from] AdminError),

    #[error("Failed to read from record source")]
    Source(#[source] BoxError),

    #[error("Failed to transform record")]
    Transform(#[source] BoxError),

    #[error("Import cancelled")]
    Cancelled,

    #[error("Import job has already run")]
    AlreadyRun,

    #[error("Import worker stopped unexpectedly: {0}")]
    Worker(String),
}

impl ImportError {
    pub(crate) fn source_error(report: eyre::Report) -> Self {
        Self::Source(report.into())
    }

    pub(crate) fn transform_error(report: eyre::Report) -> Self {
        Self::Transform(report.into())
    }

    /// Short name of the failure kind, as reported by the CLI
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingTable { .. } => "MissingTable",
            Self::ClientUnavailable { .. } => "ClientUnavailable",
            Self::Write(_) => "Write",
            Self::Admin(_) => "Admin",
            Self::Source(_) => "Source",
            Self::Transform(_) => "Transform",
            Self::Cancelled => "Cancelled",
            Self::AlreadyRun => "AlreadyRun",
            Self::Worker(_) => "Worker",
        }
    }

    /// Prerequisite failures happen before any row is read
    pub fn is_prerequisite(&self) -> bool {
        matches!(
            self,
            Self::MissingTable { .. } | Self::ClientUnavailable { .. } | Self::Admin(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_error_message() {
        let err = WriteError::new("t", 3, "connection reset");
        assert_eq!(
            err.to_string(),
            "Failed to write batch of 3 mutation(s) to table 't': connection reset"
        );
    }

    #[test]
    fn test_kinds() {
        let missing = ImportError::MissingTable {
            table: "t".to_string(),
        };
        assert_eq!(missing.kind(), "MissingTable");
        assert!(missing.is_prerequisite());

        let write: ImportError = WriteError::new("t", 1, "boom").into();
        assert_eq!(write.kind(), "Write");
        assert!(!write.is_prerequisite());

        let source = ImportError::source_error(eyre::eyre!("bad line"));
        assert_eq!(source.kind(), "Source");
        assert!(std::error::Error::source(&source).is_some());
    }
}
