use thiserror::Error;

use super::types::CredentialKind;

/// Failures of a [`RowStore`](super::RowStore) implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown table `{0}`")]
    UnknownTable(String),
    #[error("unknown column `{column}` in table `{table}`")]
    UnknownColumn { table: String, column: String },
    #[error("duplicate value for unique key ({}) in table `{table}`", key.join(", "))]
    UniqueViolation { table: String, key: Vec<String> },
    #[error("no rows to be inserted into `{0}`")]
    EmptyInsert(String),
    #[error("store lock poisoned")]
    Poisoned,
    #[error("storage backend failure: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub(crate) fn unknown_column(table: &str, column: &str) -> Self {
        Self::UnknownColumn {
            table: table.to_string(),
            column: column.to_string(),
        }
    }
}

/// Failures of the typed credential adapter.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("a {kind} credential for `{identifier}` already exists")]
    Conflict {
        identifier: String,
        kind: CredentialKind,
    },
    #[error("no {kind} credential for `{identifier}`")]
    NotFound {
        identifier: String,
        kind: CredentialKind,
    },
    #[error("credential row has an invalid `{column}` column")]
    Corrupt { column: &'static str },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CredentialError {
    pub(crate) fn conflict(identifier: &str, kind: CredentialKind) -> Self {
        Self::Conflict {
            identifier: identifier.to_string(),
            kind,
        }
    }

    pub(crate) fn not_found(identifier: &str, kind: CredentialKind) -> Self {
        Self::NotFound {
            identifier: identifier.to_string(),
            kind,
        }
    }
}
