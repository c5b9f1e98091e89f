use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("forbidden")]
    Forbidden,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid credentials")]
    Unauthenticated,

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("search index error: {0}")]
    Index(#[from] tantivy::TantivyError),

    #[error("operation timed out: {0}")]
    Timeout(String),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("corrupt record: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{completed} succeeded for {path} but {failed} failed: {source}")]
    PartialFailure {
        path: String,
        completed: &'static str,
        failed: &'static str,
        #[source]
        source: Box<Error>,
    },

    #[error("schema provisioning failed: {}", ProvisionFailures(.0))]
    Provisioning(Vec<ProvisionFailure>),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification used by callers to map errors onto status-like outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Forbidden,
    InvalidInput,
    Unauthenticated,
    BackendUnavailable,
    PartialFailure,
    Internal,
}

impl Error {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Forbidden => ErrorKind::Forbidden,
            Self::InvalidInput(_) | Self::Config(_) => ErrorKind::InvalidInput,
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::Database(_)
            | Self::Io(_)
            | Self::Index(_)
            | Self::Timeout(_)
            | Self::Task(_)
            | Self::Provisioning(_) => ErrorKind::BackendUnavailable,
            Self::PartialFailure { .. } => ErrorKind::PartialFailure,
            Self::Corrupt(_) => ErrorKind::Internal,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub(crate) fn not_found(what: impl fmt::Display) -> Self {
        Self::NotFound(what.to_string())
    }

    pub(crate) fn partial(
        path: impl Into<String>,
        completed: &'static str,
        failed: &'static str,
        source: Error,
    ) -> Self {
        Self::PartialFailure {
            path: path.into(),
            completed,
            failed,
            source: Box::new(source),
        }
    }
}

/// One collection that could not be provisioned.
#[derive(Debug)]
pub struct ProvisionFailure {
    pub collection: String,
    pub error: Error,
}

struct ProvisionFailures<'a>(&'a [ProvisionFailure]);

impl fmt::Display for ProvisionFailures<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", failure.collection, failure.error)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(Error::not_found("/a").kind(), ErrorKind::NotFound);
        assert_eq!(Error::Forbidden.kind(), ErrorKind::Forbidden);
        assert_eq!(
            Error::Timeout("read".into()).kind(),
            ErrorKind::BackendUnavailable
        );
        let partial = Error::partial("/a", "content write", "metadata write", Error::Forbidden);
        assert_eq!(partial.kind(), ErrorKind::PartialFailure);
    }

    #[test]
    fn test_provisioning_lists_every_collection() {
        let err = Error::Provisioning(vec![
            ProvisionFailure {
                collection: "ds_user".into(),
                error: Error::Timeout("create".into()),
            },
            ProvisionFailure {
                collection: "ds_doc".into(),
                error: Error::Timeout("create".into()),
            },
        ]);
        let message = err.to_string();
        assert!(message.contains("ds_user"));
        assert!(message.contains("ds_doc"));
    }
}
