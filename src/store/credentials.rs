use chrono::{DateTime, Utc};
use tracing::debug;

use super::{
    Credential, CredentialError, CredentialKind, FailedAttempt, Predicate, Row, RowStore,
    StoreError, StoredSecret, TableSchema, Value,
};

pub const CREDENTIALS_TABLE: &str = "credentials";
pub const FAILED_ATTEMPTS_TABLE: &str = "failed_attempts";

/// Tables the credential adapter needs.
pub fn schema() -> Vec<TableSchema> {
    vec![
        TableSchema::new(
            CREDENTIALS_TABLE,
            [
                "id",
                "identifier",
                "kind",
                "secret_hash",
                "is_super",
                "created_at",
                "modified_at",
                "last_log_in",
            ],
        )
        .with_auto_id("id")
        .with_unique(["identifier", "kind"]),
        TableSchema::new(FAILED_ATTEMPTS_TABLE, ["id", "credential", "at"]).with_auto_id("id"),
    ]
}

/// Typed credential operations over any [`RowStore`].
#[derive(Debug, Clone)]
pub struct CredentialStore<S> {
    store: S,
}

fn key(identifier: &str, kind: CredentialKind) -> Predicate {
    Predicate::all()
        .and_eq("identifier", identifier)
        .and_eq("kind", kind.as_str())
}

fn column<'r>(row: &'r Row, name: &'static str) -> Result<&'r Value, CredentialError> {
    row.get(name).ok_or(CredentialError::Corrupt { column: name })
}

fn int(row: &Row, name: &'static str) -> Result<i64, CredentialError> {
    column(row, name)?
        .as_int()
        .ok_or(CredentialError::Corrupt { column: name })
}

fn timestamp(row: &Row, name: &'static str) -> Result<DateTime<Utc>, CredentialError> {
    column(row, name)?
        .as_timestamp()
        .ok_or(CredentialError::Corrupt { column: name })
}

fn bytes(row: &Row, name: &'static str) -> Result<Vec<u8>, CredentialError> {
    column(row, name)?
        .as_bytes()
        .map(<[u8]>::to_vec)
        .ok_or(CredentialError::Corrupt { column: name })
}

impl<S: RowStore> CredentialStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn inner(&self) -> &S {
        &self.store
    }

    pub fn create_tables(&self) -> Result<(), StoreError> {
        self.store.create_tables(&schema())
    }

    pub fn exists(&self, identifier: &str, kind: CredentialKind) -> Result<bool, StoreError> {
        let rows = self
            .store
            .select(CREDENTIALS_TABLE, &["id"], &key(identifier, kind))?;
        Ok(!rows.is_empty())
    }

    /// Adds a credential and returns its id.
    ///
    /// The existence check gives a clean [`CredentialError::Conflict`] in
    /// the common case; a racing insert that slips past it is caught by the
    /// unique key and reported the same way.
    pub fn insert(
        &self,
        identifier: &str,
        kind: CredentialKind,
        secret_hash: &[u8],
        at: DateTime<Utc>,
    ) -> Result<i64, CredentialError> {
        if self.exists(identifier, kind)? {
            return Err(CredentialError::conflict(identifier, kind));
        }

        let row = Row::from([
            ("identifier".to_string(), Value::from(identifier)),
            ("kind".to_string(), Value::from(kind.as_str())),
            ("secret_hash".to_string(), Value::from(secret_hash.to_vec())),
            ("is_super".to_string(), Value::from(false)),
            ("created_at".to_string(), Value::from(at)),
            ("modified_at".to_string(), Value::from(at)),
            ("last_log_in".to_string(), Value::Null),
        ]);
        let id = match self.store.insert(CREDENTIALS_TABLE, vec![row]) {
            Ok(id) => id,
            Err(StoreError::UniqueViolation { .. }) => {
                return Err(CredentialError::conflict(identifier, kind));
            }
            Err(err) => return Err(err.into()),
        };
        debug!(identifier, %kind, "credential stored");

        match id {
            Some(id) => Ok(id),
            // backends without generated ids
            None => self.fetch_secret(identifier, kind).map(|secret| secret.id),
        }
    }

    pub fn fetch_secret(
        &self,
        identifier: &str,
        kind: CredentialKind,
    ) -> Result<StoredSecret, CredentialError> {
        let rows = self.store.select(
            CREDENTIALS_TABLE,
            &["id", "secret_hash"],
            &key(identifier, kind),
        )?;
        let row = rows
            .first()
            .ok_or_else(|| CredentialError::not_found(identifier, kind))?;
        Ok(StoredSecret {
            id: int(row, "id")?,
            hash: bytes(row, "secret_hash")?,
        })
    }

    pub fn fetch(
        &self,
        identifier: &str,
        kind: CredentialKind,
    ) -> Result<Credential, CredentialError> {
        let rows = self
            .store
            .select(CREDENTIALS_TABLE, &[], &key(identifier, kind))?;
        let row = rows
            .first()
            .ok_or_else(|| CredentialError::not_found(identifier, kind))?;

        let kind = column(row, "kind")?
            .as_text()
            .and_then(CredentialKind::parse)
            .ok_or(CredentialError::Corrupt { column: "kind" })?;
        let last_log_in = match column(row, "last_log_in")? {
            Value::Null => None,
            value => Some(
                value
                    .as_timestamp()
                    .ok_or(CredentialError::Corrupt { column: "last_log_in" })?,
            ),
        };
        Ok(Credential {
            id: int(row, "id")?,
            identifier: column(row, "identifier")?
                .as_text()
                .ok_or(CredentialError::Corrupt { column: "identifier" })?
                .to_string(),
            kind,
            secret_hash: bytes(row, "secret_hash")?,
            is_super: column(row, "is_super")?
                .as_bool()
                .ok_or(CredentialError::Corrupt { column: "is_super" })?,
            created_at: timestamp(row, "created_at")?,
            modified_at: timestamp(row, "modified_at")?,
            last_log_in,
        })
    }

    /// Removes the credential. Its failed-attempt rows are left in place.
    pub fn delete(&self, identifier: &str, kind: CredentialKind) -> Result<(), CredentialError> {
        let removed = self
            .store
            .delete(CREDENTIALS_TABLE, &key(identifier, kind))?;
        if removed == 0 {
            return Err(CredentialError::not_found(identifier, kind));
        }
        debug!(identifier, %kind, "credential removed");
        Ok(())
    }

    pub fn touch_last_login(&self, id: i64, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.store.update(
            CREDENTIALS_TABLE,
            Row::from([("last_log_in".to_string(), Value::from(at))]),
            &Predicate::all().and_eq("id", id),
        )?;
        Ok(())
    }

    pub fn record_failed_attempt(&self, id: i64, at: DateTime<Utc>) -> Result<(), StoreError> {
        let row = Row::from([
            ("credential".to_string(), Value::from(id)),
            ("at".to_string(), Value::from(at)),
        ]);
        self.store.insert(FAILED_ATTEMPTS_TABLE, vec![row])?;
        Ok(())
    }

    pub fn failed_attempts(&self, id: i64) -> Result<Vec<FailedAttempt>, CredentialError> {
        self.store
            .select(
                FAILED_ATTEMPTS_TABLE,
                &["credential", "at"],
                &Predicate::all().and_eq("credential", id),
            )?
            .iter()
            .map(|row| {
                Ok(FailedAttempt {
                    credential: int(row, "credential")?,
                    at: timestamp(row, "at")?,
                })
            })
            .collect()
    }
}
