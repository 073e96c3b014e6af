//! Command-line front end for record verification.
//!
//! # Responsibility
//! - Load the rule store, taxon dictionary and settings named on the command
//!   line, then verify a JSON batch of records.
//! - Map failures to a printed message and a non-zero exit code.

use clap::{Parser, Subcommand};
use log::info;
use occurrence_core::db::open_db;
use occurrence_core::{
    init_from_config, HelmertProjector, OrgGroupRules, RecordInput, RuleRepository,
    RuleSetHandle, SqliteRuleRepository, SqliteTaxonRepository, VerificationService,
    VerifyConfig,
};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

const EXIT_ERROR: u8 = 1;
const EXIT_USAGE: u8 = 2;

#[derive(Parser)]
#[command(name = "occurrence")]
#[command(about = "Verify biological occurrence records against organisation rule sets")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify a JSON array of records and print the results as JSON
    #[command(after_help = "\
Examples:
  occurrence verify rules.db records.json
  cat records.json | occurrence verify rules.db -
  occurrence verify rules.db records.json --org BRC:Moths:period+phenology")]
    Verify {
        /// Rule store created by a rule reload
        rules_db: PathBuf,

        /// Records file, or `-` for stdin
        records: PathBuf,

        /// TOML settings file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Restrict rules to `organisation:group[:rule+rule]`. Repeatable.
        #[arg(long = "org", value_name = "FILTER")]
        orgs: Vec<String>,

        /// Give up on records not started within this many milliseconds
        #[arg(long, value_name = "MS")]
        deadline_ms: Option<u64>,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },

    /// Print the core library version
    Version,
}

/// CLI failure with its exit code.
struct CliError {
    code: u8,
    message: String,
}

impl CliError {
    fn runtime(message: impl Into<String>) -> Self {
        Self {
            code: EXIT_ERROR,
            message: message.into(),
        }
    }

    fn usage(message: impl Into<String>) -> Self {
        Self {
            code: EXIT_USAGE,
            message: message.into(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Verify {
            rules_db,
            records,
            config,
            orgs,
            deadline_ms,
            pretty,
        } => verify(&rules_db, &records, config.as_deref(), &orgs, deadline_ms, pretty),
        Commands::Version => {
            println!("occurrence_core {}", occurrence_core::core_version());
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            ExitCode::from(err.code)
        }
    }
}

fn verify(
    rules_db: &Path,
    records: &Path,
    config: Option<&Path>,
    orgs: &[String],
    deadline_ms: Option<u64>,
    pretty: bool,
) -> Result<(), CliError> {
    let config = match config {
        Some(path) => VerifyConfig::load(path).map_err(|err| CliError::usage(err.to_string()))?,
        None => VerifyConfig::default(),
    };
    init_from_config(&config.logging).map_err(|err| CliError::runtime(err.to_string()))?;

    let filter = orgs
        .iter()
        .map(|text| OrgGroupRules::parse(text))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| CliError::usage(err.to_string()))?;
    let records = read_records(records)?;
    let started_at = Instant::now();

    let conn = open_db(rules_db).map_err(|err| CliError::runtime(err.to_string()))?;
    let snapshot = SqliteRuleRepository::try_new(&conn)
        .and_then(|repo| repo.load_snapshot())
        .map_err(|err| CliError::runtime(err.to_string()))?;
    let dictionary = SqliteTaxonRepository::try_new(&conn)
        .and_then(|repo| repo.load_dictionary())
        .map_err(|err| CliError::runtime(err.to_string()))?;

    let service = VerificationService::new(
        dictionary,
        HelmertProjector,
        Arc::new(RuleSetHandle::new(snapshot)),
        config,
    );
    let deadline = deadline_ms.map(|ms| started_at + Duration::from_millis(ms));
    let filter = (!filter.is_empty()).then_some(filter.as_slice());
    let outputs = service
        .verify_batch(&records, filter, deadline)
        .map_err(|err| CliError::usage(err.to_string()))?;

    let json = if pretty {
        serde_json::to_string_pretty(&outputs)
    } else {
        serde_json::to_string(&outputs)
    }
    .map_err(|err| CliError::runtime(format!("cannot encode results: {err}")))?;
    println!("{json}");

    info!(
        "event=cli_verify module=cli status=ok records={} duration_ms={}",
        outputs.len(),
        started_at.elapsed().as_millis()
    );
    Ok(())
}

fn read_records(path: &Path) -> Result<Vec<RecordInput>, CliError> {
    let mut text = String::new();
    if path.as_os_str() == "-" {
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|err| CliError::runtime(format!("cannot read stdin: {err}")))?;
    } else {
        text = std::fs::read_to_string(path).map_err(|err| {
            CliError::runtime(format!("cannot read `{}`: {err}", path.display()))
        })?;
    }
    serde_json::from_str(&text)
        .map_err(|err| CliError::usage(format!("invalid records JSON: {err}")))
}
