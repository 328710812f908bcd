//! Batch import of raw pairs into the destination store.
//!
//! One run owns one source cursor and one destination transaction:
//!
//! ```text
//! Idle -> Reading -> { Normalizing -> Inserting }* -> Committing -> Done
//!            |                                            |
//!            +------------------> Failed <----------------+
//! ```
//!
//! A pair that fails to normalize or insert is dropped and counted; the run
//! goes back to reading. Only cursor errors and a failed commit end the run,
//! and in that case the transaction is rolled back.

use std::path::Path;

use chrono::Utc;

use crate::diff;
use crate::error::PiResult;
use crate::fingerprint::FingerprintAlgorithm;
use crate::model::{
    DEFAULT_EXPERIMENT_ID, Experiment, ImportFailure, ImportResult, ImportStage,
    NormalizedRecord, RawPair,
};
use crate::normalize::Normalizer;
use crate::storage::{DestinationStore, SourceStore};

/// Write side of an import run: a transaction with a prepared insert.
pub trait PairBatch {
    /// Inserts one record and returns the number of rows affected.
    fn insert(&mut self, record: &NormalizedRecord) -> PiResult<usize>;

    /// Makes every insert of this batch visible. On error nothing is.
    fn commit(self) -> PiResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    pub experiment_id: i64,
    pub algorithm: FingerprintAlgorithm,
    pub context_lines: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            experiment_id: DEFAULT_EXPERIMENT_ID,
            algorithm: FingerprintAlgorithm::Md5,
            context_lines: diff::DEFAULT_CONTEXT,
        }
    }
}

impl ImportOptions {
    fn normalizer(&self) -> Normalizer {
        Normalizer {
            algorithm: self.algorithm,
            context_lines: self.context_lines,
        }
    }
}

/// Normalizes and inserts every pair of `source` into `batch`, then commits.
///
/// Returns `Err` only when the source yields an error or the commit fails;
/// `batch` is dropped uncommitted in both cases.
pub fn import_pairs<I, B>(
    source: I,
    mut batch: B,
    options: &ImportOptions,
) -> PiResult<ImportResult>
where
    I: IntoIterator<Item = PiResult<RawPair>>,
    B: PairBatch,
{
    let run_id = uuid::Uuid::new_v4().to_string();
    let span = tracing::info_span!(
        "import",
        run_id = %run_id,
        experiment_id = options.experiment_id,
        fingerprint = options.algorithm.as_str()
    );
    let _guard = span.enter();

    let normalizer = options.normalizer();
    let mut result = ImportResult {
        run_id,
        experiment_id: options.experiment_id,
        started_at_rfc3339: Utc::now().to_rfc3339(),
        finished_at_rfc3339: String::new(),
        success_count: 0,
        failure_count: 0,
        skipped_count: 0,
        failures: Vec::new(),
    };

    for (index, row) in (0u64..).zip(source) {
        let pair = row.inspect_err(|error| {
            log_abort(&result, ImportStage::Read, error);
        })?;

        let record = match normalizer.normalize(&pair, options.experiment_id) {
            Ok(record) => record,
            Err(error) => {
                record_failure(&mut result, index, &pair, ImportStage::Normalize, &error);
                continue;
            }
        };

        match batch.insert(&record) {
            Ok(0) => {
                tracing::debug!(
                    index,
                    name_a = %pair.name_a,
                    name_b = %pair.name_b,
                    "insert affected no rows"
                );
                result.skipped_count += 1;
            }
            Ok(affected) => result.success_count += affected as u64,
            Err(error) => record_failure(&mut result, index, &pair, ImportStage::Insert, &error),
        }
    }

    batch.commit().inspect_err(|error| {
        log_abort(&result, ImportStage::Commit, error);
    })?;

    result.finished_at_rfc3339 = Utc::now().to_rfc3339();
    tracing::info!(
        imported = result.success_count,
        failed = result.failure_count,
        skipped = result.skipped_count,
        "import committed"
    );
    Ok(result)
}

fn record_failure(
    result: &mut ImportResult,
    index: u64,
    pair: &RawPair,
    stage: ImportStage,
    error: &dyn std::fmt::Display,
) {
    tracing::warn!(
        index,
        stage = stage.as_str(),
        name_a = %pair.name_a,
        name_b = %pair.name_b,
        error = %error,
        "failed to import file pair"
    );
    result.failure_count += 1;
    result.failures.push(ImportFailure {
        index,
        name_a: pair.name_a.clone(),
        name_b: pair.name_b.clone(),
        stage,
        reason: error.to_string(),
    });
}

fn log_abort(result: &ImportResult, stage: ImportStage, error: &dyn std::fmt::Display) {
    tracing::error!(
        stage = stage.as_str(),
        imported = result.success_count,
        failed = result.failure_count,
        error = %error,
        "import aborted; transaction rolled back"
    );
}

/// Imports every pair of `source` into `destination` in one transaction.
pub fn import_files(
    source: &SourceStore,
    destination: &mut DestinationStore,
    options: &ImportOptions,
) -> PiResult<ImportResult> {
    let mut cursor = source.cursor()?;
    let pairs = cursor.pairs()?;
    let batch = destination.begin_batch()?;
    import_pairs(pairs, batch, options)
}

/// Opens both databases, bootstraps the destination with `experiment`, and
/// imports every source pair into it.
pub fn import_database(
    input: &Path,
    output: &Path,
    experiment: &Experiment,
    options: &ImportOptions,
) -> PiResult<ImportResult> {
    let source = SourceStore::open(input)?;
    let mut destination = DestinationStore::open(output)?;
    destination.bootstrap(experiment)?;

    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        "importing file pairs"
    );
    import_files(&source, &mut destination, options)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::error::PiError;
    use crate::fingerprint::fingerprint;

    #[derive(Default)]
    struct Recorded {
        inserted: Vec<NormalizedRecord>,
        committed: Vec<NormalizedRecord>,
        commit_calls: usize,
    }

    /// In-memory batch with scripted insert and commit outcomes.
    struct MemoryBatch {
        state: Rc<RefCell<Recorded>>,
        fail_insert_for: Option<&'static str>,
        zero_rows_for: Option<&'static str>,
        fail_commit: bool,
    }

    impl MemoryBatch {
        fn new(state: &Rc<RefCell<Recorded>>) -> Self {
            Self {
                state: Rc::clone(state),
                fail_insert_for: None,
                zero_rows_for: None,
                fail_commit: false,
            }
        }
    }

    impl PairBatch for MemoryBatch {
        fn insert(&mut self, record: &NormalizedRecord) -> PiResult<usize> {
            if self.fail_insert_for == Some(record.name_a.as_str()) {
                return Err(PiError::Storage("UNIQUE constraint failed".to_owned()));
            }
            if self.zero_rows_for == Some(record.name_a.as_str()) {
                return Ok(0);
            }
            self.state.borrow_mut().inserted.push(record.clone());
            Ok(1)
        }

        fn commit(self) -> PiResult<()> {
            let mut state = self.state.borrow_mut();
            state.commit_calls += 1;
            if self.fail_commit {
                return Err(PiError::storage("commit", "disk I/O error"));
            }
            let inserted = std::mem::take(&mut state.inserted);
            state.committed.extend(inserted);
            Ok(())
        }
    }

    fn ok_rows(pairs: Vec<RawPair>) -> Vec<PiResult<RawPair>> {
        pairs.into_iter().map(Ok).collect()
    }

    fn sample_pairs(n: usize) -> Vec<RawPair> {
        (0..n)
            .map(|i| {
                RawPair::new(
                    format!("a{i}.txt"),
                    format!("b{i}.txt"),
                    format!("line {i}\n"),
                    format!("line {i}\nextra\n"),
                )
            })
            .collect()
    }

    #[test]
    fn imports_every_pair_and_commits() {
        let state = Rc::new(RefCell::new(Recorded::default()));
        let result = import_pairs(
            ok_rows(sample_pairs(3)),
            MemoryBatch::new(&state),
            &ImportOptions::default(),
        )
        .expect("import");

        assert_eq!(result.success_count, 3);
        assert_eq!(result.failure_count, 0);
        assert!(result.failures.is_empty());
        assert!(!result.finished_at_rfc3339.is_empty());

        let state = state.borrow();
        assert_eq!(state.commit_calls, 1);
        assert_eq!(state.committed.len(), 3);
        assert!(state.committed.iter().all(|r| r.experiment_id == 1));
        assert_eq!(state.committed[0].hash_a, fingerprint("line 0\n"));
    }

    #[test]
    fn normalize_failure_skips_only_that_pair() {
        let mut pairs = sample_pairs(5);
        pairs[2].content_b = "binary\0payload".to_owned();

        let state = Rc::new(RefCell::new(Recorded::default()));
        let result = import_pairs(
            ok_rows(pairs),
            MemoryBatch::new(&state),
            &ImportOptions::default(),
        )
        .expect("import");

        assert_eq!(result.success_count, 4);
        assert_eq!(result.failure_count, 1);
        assert_eq!(result.success_count + result.failure_count, 5);

        let failure = &result.failures[0];
        assert_eq!(failure.index, 2);
        assert_eq!(failure.name_a, "a2.txt");
        assert_eq!(failure.name_b, "b2.txt");
        assert_eq!(failure.stage, ImportStage::Normalize);
        assert!(failure.reason.contains("NUL"), "{}", failure.reason);

        let names: Vec<String> = state
            .borrow()
            .committed
            .iter()
            .map(|r| r.name_a.clone())
            .collect();
        assert_eq!(names, vec!["a0.txt", "a1.txt", "a3.txt", "a4.txt"]);
    }

    #[test]
    fn insert_failure_is_counted_and_run_continues() {
        let state = Rc::new(RefCell::new(Recorded::default()));
        let mut batch = MemoryBatch::new(&state);
        batch.fail_insert_for = Some("a0.txt");

        let result =
            import_pairs(ok_rows(sample_pairs(3)), batch, &ImportOptions::default()).expect("import");

        assert_eq!(result.success_count, 2);
        assert_eq!(result.failure_count, 1);
        assert_eq!(result.failures[0].stage, ImportStage::Insert);
        assert!(result.failures[0].reason.contains("UNIQUE"));
        assert_eq!(state.borrow().committed.len(), 2);
    }

    #[test]
    fn zero_rows_affected_is_neither_success_nor_failure() {
        let state = Rc::new(RefCell::new(Recorded::default()));
        let mut batch = MemoryBatch::new(&state);
        batch.zero_rows_for = Some("a1.txt");

        let result =
            import_pairs(ok_rows(sample_pairs(3)), batch, &ImportOptions::default()).expect("import");

        assert_eq!(result.success_count, 2);
        assert_eq!(result.failure_count, 0);
        assert_eq!(result.skipped_count, 1);
        assert_eq!(result.processed(), 3);
    }

    #[test]
    fn source_error_aborts_without_commit() {
        let mut rows = ok_rows(sample_pairs(2));
        rows.push(Err(PiError::storage("read source row", "malformed")));
        rows.extend(ok_rows(sample_pairs(2)));

        let state = Rc::new(RefCell::new(Recorded::default()));
        let error = import_pairs(rows, MemoryBatch::new(&state), &ImportOptions::default())
            .unwrap_err();

        assert!(error.to_string().contains("read source row"));
        let state = state.borrow();
        assert_eq!(state.commit_calls, 0);
        assert!(state.committed.is_empty());
    }

    #[test]
    fn commit_failure_is_fatal_and_nothing_is_committed() {
        let state = Rc::new(RefCell::new(Recorded::default()));
        let mut batch = MemoryBatch::new(&state);
        batch.fail_commit = true;

        let error = import_pairs(ok_rows(sample_pairs(3)), batch, &ImportOptions::default())
            .unwrap_err();

        assert!(matches!(error, PiError::Storage(ref message) if message.starts_with("commit")));
        let state = state.borrow();
        assert_eq!(state.commit_calls, 1);
        assert!(state.committed.is_empty());
    }

    #[test]
    fn empty_source_still_commits() {
        let state = Rc::new(RefCell::new(Recorded::default()));
        let result = import_pairs(
            Vec::<PiResult<RawPair>>::new(),
            MemoryBatch::new(&state),
            &ImportOptions::default(),
        )
        .expect("import");

        assert_eq!(result.processed(), 0);
        assert_eq!(state.borrow().commit_calls, 1);
    }

    #[test]
    fn options_flow_into_records() {
        let state = Rc::new(RefCell::new(Recorded::default()));
        let options = ImportOptions {
            experiment_id: 9,
            algorithm: FingerprintAlgorithm::Sha256,
            context_lines: 0,
        };
        let pairs = vec![RawPair::new("a", "b", "1\n2\n3\n", "1\nx\n3\n")];

        let result = import_pairs(ok_rows(pairs), MemoryBatch::new(&state), &options).expect("import");
        assert_eq!(result.experiment_id, 9);

        let state = state.borrow();
        let record = &state.committed[0];
        assert_eq!(record.experiment_id, 9);
        assert_eq!(record.hash_a.len(), 64);
        assert_eq!(record.diff, "--- a\n+++ b\n@@ -2 +2 @@\n-2\n+x\n");
    }

    #[test]
    fn import_files_against_sqlite_stores() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("origin.db");
        rusqlite::Connection::open(&input)
            .expect("create origin")
            .execute_batch(
                "CREATE TABLE files (name_a TEXT, name_b TEXT, content_a TEXT, content_b TEXT);
                 INSERT INTO files VALUES ('a.txt', 'b.txt', 'x\n', 'y\n');
                 INSERT INTO files VALUES ('c.txt', 'd.txt', 'same\n', 'same\n');",
            )
            .expect("seed origin");

        let source = SourceStore::open(&input).expect("open source");
        let mut destination = DestinationStore::open_in_memory().expect("open destination");
        destination.bootstrap(&Experiment::default()).expect("bootstrap");

        let result =
            import_files(&source, &mut destination, &ImportOptions::default()).expect("import");
        assert_eq!(result.success_count, 2);
        assert_eq!(destination.count_pairs().expect("count"), 2);
    }
}
