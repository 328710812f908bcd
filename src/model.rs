use serde::{Deserialize, Serialize};

pub const DEFAULT_EXPERIMENT_ID: i64 = 1;
pub const DEFAULT_EXPERIMENT_NAME: &str = "default";
pub const DEFAULT_EXPERIMENT_DESCRIPTION: &str = "Default experiment";

// ---------------------------------------------------------------------------
// Source / destination records
// ---------------------------------------------------------------------------

/// One row of the source `files` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPair {
    pub name_a: String,
    pub name_b: String,
    pub content_a: String,
    pub content_b: String,
}

impl RawPair {
    #[must_use]
    pub fn new(
        name_a: impl Into<String>,
        name_b: impl Into<String>,
        content_a: impl Into<String>,
        content_b: impl Into<String>,
    ) -> Self {
        Self {
            name_a: name_a.into(),
            name_b: name_b.into(),
            content_a: content_a.into(),
            content_b: content_b.into(),
        }
    }
}

/// One row of the destination `file_pairs` table, minus its generated id.
///
/// `hash_a`/`hash_b` fingerprint `content_a`/`content_b`, and `diff` is the
/// unified diff from `content_a` to `content_b` labelled with the two names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub name_a: String,
    pub name_b: String,
    pub hash_a: String,
    pub hash_b: String,
    pub content_a: String,
    pub content_b: String,
    pub diff: String,
    pub experiment_id: i64,
}

// ---------------------------------------------------------------------------
// Import outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStage {
    Read,
    Normalize,
    Insert,
    Commit,
}

impl ImportStage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Normalize => "normalize",
            Self::Insert => "insert",
            Self::Commit => "commit",
        }
    }
}

/// A pair that was dropped from the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportFailure {
    /// Zero-based position of the pair in the source cursor.
    pub index: u64,
    pub name_a: String,
    pub name_b: String,
    pub stage: ImportStage,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    pub run_id: String,
    pub experiment_id: i64,
    pub started_at_rfc3339: String,
    pub finished_at_rfc3339: String,
    pub success_count: u64,
    pub failure_count: u64,
    /// Pairs read but neither imported nor failed (insert affected no rows).
    pub skipped_count: u64,
    pub failures: Vec<ImportFailure>,
}

impl ImportResult {
    #[must_use]
    pub fn processed(&self) -> u64 {
        self.success_count + self.failure_count + self.skipped_count
    }
}

// ---------------------------------------------------------------------------
// Destination-side lookups
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experiment {
    pub id: i64,
    pub name: String,
    pub description: String,
}

impl Default for Experiment {
    fn default() -> Self {
        Self {
            id: DEFAULT_EXPERIMENT_ID,
            name: DEFAULT_EXPERIMENT_NAME.to_owned(),
            description: DEFAULT_EXPERIMENT_DESCRIPTION.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub github_username: String,
    pub auth: Option<String>,
    pub role: Option<i64>,
}
