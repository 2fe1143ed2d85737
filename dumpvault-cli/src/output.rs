//! Human and JSON rendering of command results.

use dumpvault_core::{BackupDescriptor, RestoreSummary};
use serde::Serialize;
use std::io::{self, Write};

use crate::CliError;

/// Output sink chosen by the global `--json` flag.
#[derive(Debug, Clone, Copy)]
pub enum Output {
    Human,
    Json,
}

impl Output {
    pub fn from_flag(json: bool) -> Self {
        if json { Output::Json } else { Output::Human }
    }

    fn json<T: Serialize>(&self, out: &mut impl Write, value: &T) -> Result<(), CliError> {
        serde_json::to_writer_pretty(&mut *out, value)?;
        writeln!(out)?;
        Ok(())
    }

    pub fn databases(&self, out: &mut impl Write, databases: &[String]) -> Result<(), CliError> {
        match self {
            Output::Json => self.json(out, &databases),
            Output::Human => {
                for database in databases {
                    writeln!(out, "{}", database)?;
                }
                Ok(())
            }
        }
    }

    pub fn backup(&self, out: &mut impl Write, backup: &BackupDescriptor) -> Result<(), CliError> {
        match self {
            Output::Json => self.json(out, backup),
            Output::Human => {
                writeln!(
                    out,
                    "Created {} ({})",
                    backup.filename,
                    format_size(backup.size_bytes)
                )?;
                Ok(())
            }
        }
    }

    pub fn backups(&self, out: &mut impl Write, backups: &[BackupDescriptor]) -> Result<(), CliError> {
        match self {
            Output::Json => self.json(out, &backups),
            Output::Human => {
                if backups.is_empty() {
                    writeln!(out, "No backups found")?;
                    return Ok(());
                }
                writeln!(out, "{:<24} {:>10}  {:<20} FILE", "DATABASE", "SIZE", "CREATED")?;
                for backup in backups {
                    writeln!(
                        out,
                        "{:<24} {:>10}  {:<20} {}",
                        backup.database,
                        format_size(backup.size_bytes),
                        backup.created_at.format("%Y-%m-%d %H:%M:%S"),
                        backup.filename
                    )?;
                }
                Ok(())
            }
        }
    }

    pub fn deleted(&self, out: &mut impl Write, filename: &str) -> Result<(), CliError> {
        match self {
            Output::Json => self.json(out, &serde_json::json!({ "deleted": filename })),
            Output::Human => {
                writeln!(out, "Deleted {}", filename)?;
                Ok(())
            }
        }
    }

    pub fn restored(&self, out: &mut impl Write, summary: &RestoreSummary) -> Result<(), CliError> {
        match self {
            Output::Json => self.json(out, summary),
            Output::Human => {
                writeln!(out, "{}", summary.message)?;
                Ok(())
            }
        }
    }

    pub fn sealed(&self, out: &mut impl Write, sealed: &str) -> Result<(), CliError> {
        match self {
            Output::Json => self.json(out, &serde_json::json!({ "password_sealed": sealed })),
            Output::Human => {
                writeln!(out, "password_sealed = \"{}\"", sealed)?;
                Ok(())
            }
        }
    }
}

/// Byte count in the largest binary unit that keeps it above one.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

/// Ask a yes/no question on stderr, reading the answer from `input`.
pub fn confirm(input: &mut impl io::BufRead, question: &str) -> io::Result<bool> {
    eprint!("{} [y/N] ", question);
    io::stderr().flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
