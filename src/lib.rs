#![forbid(unsafe_code)]

pub mod cli;
pub mod diff;
pub mod error;
pub mod fingerprint;
pub mod import;
pub mod logging;
pub mod model;
pub mod normalize;
pub mod repository;
pub mod storage;

pub use error::{PiError, PiResult};
pub use import::{ImportOptions, PairBatch, import_database, import_files, import_pairs};
pub use model::{ImportResult, NormalizedRecord, RawPair};
