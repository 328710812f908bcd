use clap::Parser;
use pair_import::cli::{Cli, Command, ReportFormat};
use pair_import::storage::DestinationStore;
use pair_import::{ImportResult, PiResult};

fn main() {
    pair_import::logging::init();

    if let Err(error) = run() {
        tracing::debug!(code = error.error_code(), "fatal error");
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run() -> PiResult<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Import(args) => {
            let experiment = args.experiment.to_experiment();
            let result = pair_import::import_database(
                &args.input,
                &args.output,
                &experiment,
                &args.to_options(),
            )?;
            print_report(&result, args.format)
        }
        Command::Init(args) => {
            let store = DestinationStore::open(&args.output)?;
            store.bootstrap(&args.experiment.to_experiment())?;
            println!("Initialized {}", args.output.display());
            Ok(())
        }
    }
}

fn print_report(result: &ImportResult, format: ReportFormat) -> PiResult<()> {
    match format {
        ReportFormat::Plain => {
            println!("Imported {} file pairs successfully", result.success_count);
            if result.failure_count > 0 {
                println!("Failed to import {} file pairs", result.failure_count);
            }
        }
        ReportFormat::Json => {
            println!("{}", serde_json::to_string_pretty(result)?);
        }
    }
    Ok(())
}
