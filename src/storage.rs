use std::fs;
use std::path::Path;
use std::time::Duration;

use rusqlite::types::{Type, ValueRef};
use rusqlite::{Connection, OpenFlags, Row, Statement, Transaction, params};

use crate::error::{PiError, PiResult};
use crate::import::PairBatch;
use crate::model::{Experiment, NormalizedRecord, RawPair};
use crate::repository::Experiments;

const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

const SELECT_FILES_SQL: &str = "SELECT name_a, name_b, content_a, content_b FROM files";

const INSERT_PAIR_SQL: &str = "INSERT INTO file_pairs \
     (name_a, name_b, hash_a, hash_b, content_a, content_b, diff, experiment_id) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";

// file_pairs has no uniqueness constraint: re-importing a pair adds a new row.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER,
    github_username TEXT,
    auth TEXT,
    role INTEGER,
    PRIMARY KEY (id)
);

CREATE TABLE IF NOT EXISTS experiments (
    id INTEGER,
    name TEXT UNIQUE,
    description TEXT,
    PRIMARY KEY (id)
);

CREATE TABLE IF NOT EXISTS file_pairs (
    id INTEGER,
    name_a TEXT,
    name_b TEXT,
    hash_a TEXT,
    hash_b TEXT,
    content_a TEXT,
    content_b TEXT,
    diff TEXT,
    experiment_id INTEGER,
    PRIMARY KEY (id),
    FOREIGN KEY (experiment_id) REFERENCES experiments(id)
);

CREATE TABLE IF NOT EXISTS assignments (
    user_id INTEGER,
    pair_id INTEGER,
    experiment_id INTEGER,
    answer INTEGER,
    duration INTEGER,
    PRIMARY KEY (user_id, pair_id),
    FOREIGN KEY (user_id) REFERENCES users(id),
    FOREIGN KEY (pair_id) REFERENCES file_pairs(id),
    FOREIGN KEY (experiment_id) REFERENCES experiments(id)
);
"#;

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// Read-only handle on a database holding a
/// `files (name_a, name_b, content_a, content_b)` table.
pub struct SourceStore {
    connection: Connection,
}

impl std::fmt::Debug for SourceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceStore").finish_non_exhaustive()
    }
}

impl SourceStore {
    pub fn open(db_path: &Path) -> PiResult<Self> {
        if !db_path.exists() {
            return Err(PiError::MissingInput(db_path.to_path_buf()));
        }

        let connection = Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|error| PiError::storage("open source", error))?;
        connection
            .busy_timeout(BUSY_TIMEOUT)
            .map_err(|error| PiError::storage("open source", error))?;

        Ok(Self { connection })
    }

    /// Prepares the cursor over every source pair.
    pub fn cursor(&self) -> PiResult<PairCursor<'_>> {
        let statement = self
            .connection
            .prepare(SELECT_FILES_SQL)
            .map_err(|error| PiError::storage("open source cursor", error))?;
        Ok(PairCursor { statement })
    }
}

pub struct PairCursor<'conn> {
    statement: Statement<'conn>,
}

impl std::fmt::Debug for PairCursor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PairCursor").finish_non_exhaustive()
    }
}

impl PairCursor<'_> {
    /// Rows in storage order. Row-level read errors are yielded, not skipped.
    pub fn pairs(&mut self) -> PiResult<impl Iterator<Item = PiResult<RawPair>> + '_> {
        let rows = self
            .statement
            .query_map([], row_to_pair)
            .map_err(|error| PiError::storage("open source cursor", error))?;
        Ok(rows.map(|row| row.map_err(|error| PiError::storage("read source row", error))))
    }
}

fn row_to_pair(row: &Row<'_>) -> rusqlite::Result<RawPair> {
    Ok(RawPair {
        name_a: column_text(row, 0)?,
        name_b: column_text(row, 1)?,
        content_a: column_text(row, 2)?,
        content_b: column_text(row, 3)?,
    })
}

/// TEXT columns, or BLOB columns holding UTF-8. NULL is a read error.
fn column_text(row: &Row<'_>, idx: usize) -> rusqlite::Result<String> {
    match row.get_ref(idx)? {
        ValueRef::Blob(bytes) => String::from_utf8(bytes.to_vec()).map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(idx, Type::Blob, Box::new(error))
        }),
        _ => row.get(idx),
    }
}

// ---------------------------------------------------------------------------
// Destination
// ---------------------------------------------------------------------------

pub struct DestinationStore {
    connection: Connection,
}

impl std::fmt::Debug for DestinationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DestinationStore").finish_non_exhaustive()
    }
}

impl DestinationStore {
    /// Opens (creating if needed) the destination database.
    pub fn open(db_path: &Path) -> PiResult<Self> {
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let connection =
            Connection::open(db_path).map_err(|error| PiError::storage("open destination", error))?;
        Self::from_connection(connection)
    }

    pub fn open_in_memory() -> PiResult<Self> {
        let connection = Connection::open_in_memory()
            .map_err(|error| PiError::storage("open destination", error))?;
        Self::from_connection(connection)
    }

    fn from_connection(connection: Connection) -> PiResult<Self> {
        connection
            .busy_timeout(BUSY_TIMEOUT)
            .map_err(|error| PiError::storage("open destination", error))?;
        connection
            .execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|error| PiError::storage("open destination", error))?;
        Ok(Self { connection })
    }

    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Creates the annotation tables. Safe to call on a bootstrapped database.
    pub fn ensure_schema(&self) -> PiResult<()> {
        self.connection
            .execute_batch(SCHEMA_SQL)
            .map_err(|error| PiError::storage("create schema", error))
    }

    /// Seeds `experiment` unless its id is already present.
    ///
    /// An existing row with the same id is kept as is. When the id is absent
    /// but another experiment already owns the name, nothing can be seeded
    /// and the call fails with [`PiError::InvalidRequest`].
    pub fn ensure_experiment(&self, experiment: &Experiment) -> PiResult<()> {
        self.connection
            .execute(
                "INSERT OR IGNORE INTO experiments (id, name, description) VALUES (?1, ?2, ?3)",
                params![experiment.id, experiment.name, experiment.description],
            )
            .map_err(|error| PiError::storage("seed experiment", error))?;

        let experiments = Experiments::new(&self.connection);
        if experiments.get_by_id(experiment.id)?.is_some() {
            return Ok(());
        }
        let owner = experiments.get_by_name(&experiment.name)?.map_or_else(
            || "another experiment".to_owned(),
            |other| format!("experiment {}", other.id),
        );
        Err(PiError::InvalidRequest(format!(
            "cannot create experiment {}: name {:?} is already used by {owner}",
            experiment.id, experiment.name
        )))
    }

    /// Schema plus the experiment every imported pair will reference.
    pub fn bootstrap(&self, experiment: &Experiment) -> PiResult<()> {
        self.ensure_schema()?;
        self.ensure_experiment(experiment)?;
        tracing::debug!(
            experiment_id = experiment.id,
            experiment = %experiment.name,
            "destination bootstrapped"
        );
        Ok(())
    }

    /// Starts the single write transaction of an import run and prepares the
    /// pair insert.
    ///
    /// Foreign keys are checked at commit, so a run against a missing
    /// experiment fails as a whole instead of row by row.
    pub fn begin_batch(&mut self) -> PiResult<SqliteBatch<'_>> {
        let tx = self
            .connection
            .transaction()
            .map_err(|error| PiError::storage("begin transaction", error))?;
        tx.execute_batch("PRAGMA defer_foreign_keys = ON;")
            .map_err(|error| PiError::storage("begin transaction", error))?;
        tx.prepare_cached(INSERT_PAIR_SQL)
            .map_err(|error| PiError::storage("prepare insert", error))?;
        Ok(SqliteBatch { tx })
    }

    pub fn count_pairs(&self) -> PiResult<u64> {
        let count: i64 = self
            .connection
            .query_row("SELECT COUNT(*) FROM file_pairs", [], |row| row.get(0))
            .map_err(|error| PiError::storage("count pairs", error))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

/// Open write transaction on a [`DestinationStore`]. Dropping it without
/// [`PairBatch::commit`] rolls back every insert.
pub struct SqliteBatch<'conn> {
    tx: Transaction<'conn>,
}

impl std::fmt::Debug for SqliteBatch<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteBatch").finish_non_exhaustive()
    }
}

impl PairBatch for SqliteBatch<'_> {
    fn insert(&mut self, record: &NormalizedRecord) -> PiResult<usize> {
        let mut statement = self.tx.prepare_cached(INSERT_PAIR_SQL)?;
        let affected = statement.execute(params![
            record.name_a,
            record.name_b,
            record.hash_a,
            record.hash_b,
            record.content_a,
            record.content_b,
            record.diff,
            record.experiment_id,
        ])?;
        Ok(affected)
    }

    fn commit(self) -> PiResult<()> {
        self.tx
            .commit()
            .map_err(|error| PiError::storage("commit", error))
    }
}
