//! Row storage behind the credential state machine.
//!
//! [`RowStore`] is the narrow contract a backend must offer: equality
//! selects, batch inserts, updates, deletes and idempotent table creation.
//! Unique keys are enforced by the backend at write time, so a concurrent
//! duplicate surfaces as [`StoreError::UniqueViolation`] rather than a
//! second row. [`CredentialStore`] maps credential operations onto it.

mod credentials;
mod error;
mod memory;
mod types;

pub use credentials::{CREDENTIALS_TABLE, CredentialStore, FAILED_ATTEMPTS_TABLE, schema};
pub use error::{CredentialError, StoreError};
pub use memory::MemoryStore;
pub use types::{
    Credential, CredentialKind, FailedAttempt, Predicate, Row, StoredSecret, TableSchema, Value,
};

/// Minimal relational contract. Implementations synchronise internally.
pub trait RowStore: Send + Sync {
    /// Creates every table that does not exist yet.
    fn create_tables(&self, schemas: &[TableSchema]) -> Result<(), StoreError>;

    /// Rows of `table` matching `predicate`, restricted to `columns`
    /// (all columns when empty).
    fn select(
        &self,
        table: &str,
        columns: &[&str],
        predicate: &Predicate,
    ) -> Result<Vec<Row>, StoreError>;

    /// Inserts all rows or none. Returns the id assigned to the last row
    /// when the table has an auto id.
    fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Option<i64>, StoreError>;

    /// Applies `assignments` to every matching row, returns the count.
    fn update(&self, table: &str, assignments: Row, predicate: &Predicate)
    -> Result<u64, StoreError>;

    /// Removes every matching row, returns the count.
    fn delete(&self, table: &str, predicate: &Predicate) -> Result<u64, StoreError>;
}

impl<T: RowStore + ?Sized> RowStore for &T {
    fn create_tables(&self, schemas: &[TableSchema]) -> Result<(), StoreError> {
        (**self).create_tables(schemas)
    }

    fn select(
        &self,
        table: &str,
        columns: &[&str],
        predicate: &Predicate,
    ) -> Result<Vec<Row>, StoreError> {
        (**self).select(table, columns, predicate)
    }

    fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Option<i64>, StoreError> {
        (**self).insert(table, rows)
    }

    fn update(
        &self,
        table: &str,
        assignments: Row,
        predicate: &Predicate,
    ) -> Result<u64, StoreError> {
        (**self).update(table, assignments, predicate)
    }

    fn delete(&self, table: &str, predicate: &Predicate) -> Result<u64, StoreError> {
        (**self).delete(table, predicate)
    }
}

impl<T: RowStore + ?Sized> RowStore for std::sync::Arc<T> {
    fn create_tables(&self, schemas: &[TableSchema]) -> Result<(), StoreError> {
        (**self).create_tables(schemas)
    }

    fn select(
        &self,
        table: &str,
        columns: &[&str],
        predicate: &Predicate,
    ) -> Result<Vec<Row>, StoreError> {
        (**self).select(table, columns, predicate)
    }

    fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Option<i64>, StoreError> {
        (**self).insert(table, rows)
    }

    fn update(
        &self,
        table: &str,
        assignments: Row,
        predicate: &Predicate,
    ) -> Result<u64, StoreError> {
        (**self).update(table, assignments, predicate)
    }

    fn delete(&self, table: &str, predicate: &Predicate) -> Result<u64, StoreError> {
        (**self).delete(table, predicate)
    }
}
