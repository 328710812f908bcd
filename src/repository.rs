//! Keyed lookups on an annotation database. A missing row is `Ok(None)`.

use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::{PiError, PiResult};
use crate::model::{Experiment, NormalizedRecord, User};

pub struct Experiments<'conn> {
    connection: &'conn Connection,
}

impl<'conn> Experiments<'conn> {
    #[must_use]
    pub const fn new(connection: &'conn Connection) -> Self {
        Self { connection }
    }

    pub fn get_by_id(&self, id: i64) -> PiResult<Option<Experiment>> {
        self.connection
            .query_row(
                "SELECT id, name, description FROM experiments WHERE id = ?1",
                params![id],
                row_to_experiment,
            )
            .optional()
            .map_err(|error| PiError::storage("get experiment", error))
    }

    pub fn get_by_name(&self, name: &str) -> PiResult<Option<Experiment>> {
        self.connection
            .query_row(
                "SELECT id, name, description FROM experiments WHERE name = ?1",
                params![name],
                row_to_experiment,
            )
            .optional()
            .map_err(|error| PiError::storage("get experiment", error))
    }
}

fn row_to_experiment(row: &Row<'_>) -> rusqlite::Result<Experiment> {
    Ok(Experiment {
        id: row.get(0)?,
        name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        description: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
    })
}

pub struct Users<'conn> {
    connection: &'conn Connection,
}

impl<'conn> Users<'conn> {
    #[must_use]
    pub const fn new(connection: &'conn Connection) -> Self {
        Self { connection }
    }

    pub fn get_by_id(&self, id: i64) -> PiResult<Option<User>> {
        self.connection
            .query_row(
                "SELECT id, github_username, auth, role FROM users WHERE id = ?1",
                params![id],
                row_to_user,
            )
            .optional()
            .map_err(|error| PiError::storage("get user", error))
    }

    pub fn get_by_username(&self, github_username: &str) -> PiResult<Option<User>> {
        self.connection
            .query_row(
                "SELECT id, github_username, auth, role FROM users WHERE github_username = ?1",
                params![github_username],
                row_to_user,
            )
            .optional()
            .map_err(|error| PiError::storage("get user", error))
    }
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        github_username: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        auth: row.get(2)?,
        role: row.get(3)?,
    })
}

/// Imported pairs, as read back by the annotation side.
pub struct FilePairs<'conn> {
    connection: &'conn Connection,
}

impl<'conn> FilePairs<'conn> {
    #[must_use]
    pub const fn new(connection: &'conn Connection) -> Self {
        Self { connection }
    }

    pub fn get_by_id(&self, id: i64) -> PiResult<Option<NormalizedRecord>> {
        self.connection
            .query_row(
                "SELECT name_a, name_b, hash_a, hash_b, content_a, content_b, diff, experiment_id \
                 FROM file_pairs WHERE id = ?1",
                params![id],
                row_to_record,
            )
            .optional()
            .map_err(|error| PiError::storage("get file pair", error))
    }

    /// Pairs of one experiment in insertion order.
    pub fn list_by_experiment(&self, experiment_id: i64) -> PiResult<Vec<NormalizedRecord>> {
        let mut statement = self
            .connection
            .prepare(
                "SELECT name_a, name_b, hash_a, hash_b, content_a, content_b, diff, experiment_id \
                 FROM file_pairs WHERE experiment_id = ?1 ORDER BY id ASC",
            )
            .map_err(|error| PiError::storage("list file pairs", error))?;
        statement
            .query_map(params![experiment_id], row_to_record)
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(|error| PiError::storage("list file pairs", error))
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<NormalizedRecord> {
    Ok(NormalizedRecord {
        name_a: row.get(0)?,
        name_b: row.get(1)?,
        hash_a: row.get(2)?,
        hash_b: row.get(3)?,
        content_a: row.get(4)?,
        content_b: row.get(5)?,
        diff: row.get(6)?,
        experiment_id: row.get(7)?,
    })
}
