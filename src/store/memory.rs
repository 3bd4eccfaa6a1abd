use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use tracing::trace;

use super::{Predicate, Row, RowStore, StoreError, TableSchema, Value};

#[derive(Debug)]
struct Table {
    schema: TableSchema,
    rows: Vec<Row>,
    next_id: i64,
}

impl Table {
    fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
            next_id: 1,
        }
    }

    fn check_columns<'a>(&self, columns: impl IntoIterator<Item = &'a String>) -> Result<(), StoreError> {
        for column in columns {
            if !self.schema.has_column(column) {
                return Err(StoreError::unknown_column(&self.schema.name, column));
            }
        }
        Ok(())
    }

    /// First unique key that `row` shares with one of `others`. Nulls never collide.
    fn collision<'r>(
        &self,
        row: &Row,
        others: impl Iterator<Item = &'r Row> + Clone,
    ) -> Option<&Vec<String>> {
        self.schema.unique.iter().find(|key| {
            let probe: Vec<&Value> = key.iter().filter_map(|c| row.get(c)).collect();
            if probe.len() != key.len() || probe.iter().any(|v| v.is_null()) {
                return false;
            }
            others.clone().any(|other| {
                key.iter()
                    .zip(&probe)
                    .all(|(column, value)| other.get(column) == Some(*value))
            })
        })
    }

    fn violation(&self, key: &[String]) -> StoreError {
        StoreError::UniqueViolation {
            table: self.schema.name.clone(),
            key: key.to_vec(),
        }
    }
}

/// Process-local [`RowStore`]. Every operation holds one lock, so each call
/// is atomic with respect to the others.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Table>>, StoreError> {
        self.tables.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn table_mut<'a>(
    tables: &'a mut HashMap<String, Table>,
    name: &str,
) -> Result<&'a mut Table, StoreError> {
    tables
        .get_mut(name)
        .ok_or_else(|| StoreError::UnknownTable(name.to_string()))
}

impl RowStore for MemoryStore {
    fn create_tables(&self, schemas: &[TableSchema]) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        for schema in schemas {
            if !tables.contains_key(&schema.name) {
                trace!(table = %schema.name, "creating table");
                tables.insert(schema.name.clone(), Table::new(schema.clone()));
            }
        }
        Ok(())
    }

    fn select(
        &self,
        table: &str,
        columns: &[&str],
        predicate: &Predicate,
    ) -> Result<Vec<Row>, StoreError> {
        let tables = self.lock()?;
        let table = tables
            .get(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;
        for column in columns {
            if !table.schema.has_column(column) {
                return Err(StoreError::unknown_column(&table.schema.name, column));
            }
        }
        table.check_columns(predicate.conditions().iter().map(|(c, _)| c))?;

        Ok(table
            .rows
            .iter()
            .filter(|row| predicate.matches(row))
            .map(|row| {
                if columns.is_empty() {
                    row.clone()
                } else {
                    row.iter()
                        .filter(|(c, _)| columns.contains(&c.as_str()))
                        .map(|(c, v)| (c.clone(), v.clone()))
                        .collect()
                }
            })
            .collect())
    }

    fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Option<i64>, StoreError> {
        if rows.is_empty() {
            return Err(StoreError::EmptyInsert(table.to_string()));
        }
        let mut tables = self.lock()?;
        let table = table_mut(&mut tables, table)?;

        // build the full batch before touching the table
        let mut next_id = table.next_id;
        let mut last_id = None;
        let mut batch = Vec::with_capacity(rows.len());
        for mut row in rows {
            table.check_columns(row.keys())?;
            if let Some(id_column) = &table.schema.auto_id {
                let id = match row.get(id_column).and_then(Value::as_int) {
                    Some(id) => id,
                    None => {
                        let id = next_id;
                        row.insert(id_column.clone(), Value::Int(id));
                        id
                    }
                };
                next_id = next_id.max(id + 1);
                last_id = Some(id);
            }
            for column in &table.schema.columns {
                row.entry(column.clone()).or_insert(Value::Null);
            }
            if let Some(key) = table.collision(&row, table.rows.iter().chain(batch.iter())) {
                return Err(table.violation(key));
            }
            batch.push(row);
        }

        table.next_id = next_id;
        table.rows.extend(batch);
        Ok(last_id)
    }

    fn update(
        &self,
        table: &str,
        assignments: Row,
        predicate: &Predicate,
    ) -> Result<u64, StoreError> {
        let mut tables = self.lock()?;
        let table = table_mut(&mut tables, table)?;
        table.check_columns(assignments.keys())?;
        table.check_columns(predicate.conditions().iter().map(|(c, _)| c))?;

        let mut changes: Vec<(usize, Row)> = Vec::new();
        for (idx, row) in table.rows.iter().enumerate() {
            if predicate.matches(row) {
                let mut next = row.clone();
                next.extend(assignments.iter().map(|(c, v)| (c.clone(), v.clone())));
                changes.push((idx, next));
            }
        }

        // untouched key columns cannot start colliding
        let touches_key = table
            .schema
            .unique
            .iter()
            .flatten()
            .any(|column| assignments.contains_key(column));
        if touches_key {
            let changed: HashSet<usize> = changes.iter().map(|(idx, _)| *idx).collect();
            for (pos, (_, row)) in changes.iter().enumerate() {
                let untouched = table
                    .rows
                    .iter()
                    .enumerate()
                    .filter(|(idx, _)| !changed.contains(idx))
                    .map(|(_, r)| r);
                let siblings = changes
                    .iter()
                    .enumerate()
                    .filter(move |(other, _)| *other != pos)
                    .map(|(_, (_, r))| r);
                if let Some(key) = table.collision(row, untouched.chain(siblings)) {
                    return Err(table.violation(key));
                }
            }
        }

        let count = changes.len() as u64;
        for (idx, row) in changes {
            if let Some(slot) = table.rows.get_mut(idx) {
                *slot = row;
            }
        }
        Ok(count)
    }

    fn delete(&self, table: &str, predicate: &Predicate) -> Result<u64, StoreError> {
        let mut tables = self.lock()?;
        let table = table_mut(&mut tables, table)?;
        table.check_columns(predicate.conditions().iter().map(|(c, _)| c))?;
        let before = table.rows.len();
        table.rows.retain(|row| !predicate.matches(row));
        Ok((before - table.rows.len()) as u64)
    }
}
