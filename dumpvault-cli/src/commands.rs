//! Subcommand execution against a [`BackupService`].

use dumpvault_core::{BackupFileName, BackupService, HostKey, SessionSource};
use std::io::{BufRead, Write};

use crate::output::{Output, confirm};
use crate::{CliError, Commands};

/// Run every subcommand that goes through the service.
pub async fn run_service_command<P, W, R>(
    service: &BackupService<P>,
    command: Commands,
    output: Output,
    out: &mut W,
    input: &mut R,
) -> Result<(), CliError>
where
    P: SessionSource,
    W: Write,
    R: BufRead,
{
    match command {
        Commands::Databases => {
            let databases = service.list_databases().await?;
            output.databases(out, &databases)
        }
        Commands::Backup { database } => {
            let backup = service.create_backup(&database).await?;
            output.backup(out, &backup)
        }
        Commands::List => {
            let backups = service.list_backups().await?;
            output.backups(out, &backups)
        }
        Commands::Delete { filename } => {
            service.delete_backup(&filename).await?;
            output.deleted(out, &filename)
        }
        Commands::Restore { filename, yes } => {
            let name = BackupFileName::parse(&filename)?;
            if !yes {
                let question = format!(
                    "Restoring {} drops every table in `{}`. Continue?",
                    name,
                    name.database()
                );
                if !confirm(input, &question)? {
                    return Err(CliError::Aborted);
                }
            }
            let summary = service.restore_backup(name.as_str()).await?;
            output.restored(out, &summary)
        }
        Commands::SealPassword => Err(CliError::Usage(
            "seal-password does not use a database connection".to_string(),
        )),
    }
}

/// Read one password line from `input` and seal it with `key`.
pub fn seal_password<W, R>(key: &HostKey, output: Output, out: &mut W, input: &mut R) -> Result<(), CliError>
where
    W: Write,
    R: BufRead,
{
    let mut line = String::new();
    input.read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        return Err(CliError::Usage("no password given on stdin".to_string()));
    }
    let sealed = key.seal(password)?;
    output.sealed(out, &sealed)
}
