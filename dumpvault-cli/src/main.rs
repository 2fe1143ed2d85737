use clap::{Parser, Subcommand};
use dumpvault_core::{BackupRepository, BackupService, ServiceContext, VaultConfig, VaultError};
use dumpvault_mysql::MySqlSource;
use std::io;
use std::path::PathBuf;

mod commands;
mod output;

use commands::{run_service_command, seal_password};
use output::Output;

#[derive(Parser, Debug)]
#[command(name = "dumpvault", version)]
#[command(about = "Logical backup and restore of MySQL databases")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print results and logs as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List user databases on the server
    Databases,
    /// Dump a database into a new backup file
    Backup {
        /// Database to back up
        database: String,
    },
    /// List stored backups, newest first
    List,
    /// Delete a stored backup
    Delete {
        /// Backup file name as shown by `list`
        filename: String,
    },
    /// Replace a database's contents with a backup
    Restore {
        /// Backup file name as shown by `list`
        filename: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Seal a password read from stdin for use as `password_sealed`
    SealPassword,
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to encode output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Usage(String),

    #[error("aborted by user")]
    Aborted,
}

fn init_logging(json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env();
    let env_filter = match "info".parse() {
        Ok(directive) => env_filter.add_directive(directive),
        Err(_) => env_filter,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = VaultConfig::load(cli.config.as_deref())?;
    let context = ServiceContext::init(config);
    let output = Output::from_flag(cli.json);
    let stdout = io::stdout();
    let stdin = io::stdin();

    if let Commands::SealPassword = cli.command {
        return seal_password(context.key(), output, &mut stdout.lock(), &mut stdin.lock());
    }

    let config = context.config();
    let password = context.database_password()?;
    // Lazy pool: `list` and `delete` never open a connection.
    let source = MySqlSource::connect_lazy(&config.database, password.as_ref())?;
    let service = BackupService::new(source, BackupRepository::new(&config.backup.directory))
        .with_split_mode(config.backup.split_mode);

    run_service_command(&service, cli.command, output, &mut stdout.lock(), &mut stdin.lock()).await
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.json);

    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
