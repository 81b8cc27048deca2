use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde_json::Value as JsonValue;
use tracing::Level;

use sql_model::prelude::*;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Run one call (getAssocUsersByEmail, setUsersAndGetId, ...) against a SQLite database"
)]
struct Cli {
    /// Database file; an in-memory database when neither this nor --config is given
    #[arg(long, conflicts_with = "config")]
    db: Option<PathBuf>,
    /// JSON options file (`db_path`, `wal`, `busy_timeout_ms`)
    #[arg(long)]
    config: Option<PathBuf>,
    /// SQL file executed before the call (schema, fixtures)
    #[arg(long)]
    init: Option<PathBuf>,
    /// Call name, e.g. `getObjectsUsersLikeEmail`
    call: String,
    /// Call argument as JSON: a scalar, a row object, an array of rows, or a condition bundle
    #[arg(long)]
    args: Option<String>,
    /// Log every statement to stderr
    #[arg(long, short)]
    verbose: bool,
}

fn options(cli: &Cli) -> Result<DatabaseOptions, SqlModelError> {
    match (&cli.config, &cli.db) {
        (Some(path), _) => DatabaseOptions::from_json_file(path),
        (None, Some(path)) => Ok(DatabaseOptions::new(path.display().to_string())),
        (None, None) => Ok(DatabaseOptions::in_memory()),
    }
}

fn run(cli: &Cli) -> Result<JsonValue, SqlModelError> {
    let mut model = Model::open(options(cli)?)?;

    if let Some(path) = &cli.init {
        let sql = std::fs::read_to_string(path).map_err(|e| {
            SqlModelError::ConfigError(format!("cannot read {}: {e}", path.display()))
        })?;
        model.execute_raw(&sql)?;
    }

    let args = match &cli.args {
        Some(raw) => Args::from_json(&serde_json::from_str(raw)?)?,
        None => Args::None,
    };
    model.call(&cli.call, args)?.into_json()
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    match run(&cli) {
        Ok(out) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&out).unwrap_or_else(|_| out.to_string())
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}: {err}", cli.call);
            ExitCode::FAILURE
        }
    }
}
