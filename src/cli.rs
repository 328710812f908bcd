use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::fingerprint::FingerprintAlgorithm;
use crate::import::ImportOptions;
use crate::model::{
    DEFAULT_EXPERIMENT_DESCRIPTION, DEFAULT_EXPERIMENT_ID, DEFAULT_EXPERIMENT_NAME, Experiment,
};

const IMPORT_ABOUT: &str = "Imports pairs of files from the input database to the output database.
If the destination file does not exist, it will be created.
The destination database does not need to be empty, new imported file pairs can
be added to previous imports.

The input database must contain the table
    files (name_a TEXT, name_b TEXT, content_a TEXT, content_b TEXT)";

#[derive(Debug, Parser)]
#[command(name = "pair_import")]
#[command(about = "Import file pairs into an annotation database")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Import every file pair of INPUT into OUTPUT.
    #[command(long_about = IMPORT_ABOUT)]
    Import(ImportArgs),
    /// Create the annotation schema and default experiment in OUTPUT.
    Init(InitArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Plain,
    Json,
}

#[derive(Debug, Clone, Args)]
pub struct ExperimentArgs {
    /// Experiment every imported pair is assigned to.
    #[arg(long, default_value_t = DEFAULT_EXPERIMENT_ID)]
    pub experiment_id: i64,

    /// Name used when the experiment has to be created.
    /// Defaults to "default" for the default id, "experiment-<ID>" otherwise.
    #[arg(long)]
    pub experiment_name: Option<String>,

    /// Description used when the experiment has to be created.
    #[arg(long, default_value = DEFAULT_EXPERIMENT_DESCRIPTION)]
    pub experiment_description: String,
}

impl ExperimentArgs {
    #[must_use]
    pub fn to_experiment(&self) -> Experiment {
        let name = self.experiment_name.clone().unwrap_or_else(|| {
            if self.experiment_id == DEFAULT_EXPERIMENT_ID {
                DEFAULT_EXPERIMENT_NAME.to_owned()
            } else {
                format!("experiment-{}", self.experiment_id)
            }
        });
        Experiment {
            id: self.experiment_id,
            name,
            description: self.experiment_description.clone(),
        }
    }
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// SQLite database filepath to read file pairs from.
    pub input: PathBuf,

    /// SQLite database filepath to write file pairs to.
    pub output: PathBuf,

    #[command(flatten)]
    pub experiment: ExperimentArgs,

    /// Digest used for the hash_a / hash_b columns.
    #[arg(long, value_enum, default_value_t = FingerprintAlgorithm::Md5)]
    pub fingerprint: FingerprintAlgorithm,

    /// Summary output format.
    #[arg(long, value_enum, default_value_t = ReportFormat::Plain)]
    pub format: ReportFormat,
}

impl ImportArgs {
    #[must_use]
    pub fn to_options(&self) -> ImportOptions {
        ImportOptions {
            experiment_id: self.experiment.experiment_id,
            algorithm: self.fingerprint,
            ..ImportOptions::default()
        }
    }
}

#[derive(Debug, Args)]
pub struct InitArgs {
    /// SQLite database filepath to bootstrap.
    pub output: PathBuf,

    #[command(flatten)]
    pub experiment: ExperimentArgs,
}
