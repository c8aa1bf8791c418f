//! Command-line front end: loads a `QueueConfig`, builds the configured
//! queue variant and runs one queue operation against it.

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::{debug, info};

use crate::configuration::{BackendKind, QueueConfig};
use crate::error_handling::types::{CliError, StorageError};
use crate::queue::Queue;
use crate::storage::{Backend, DatabaseBackend, FileBackend, NewRecord, RecordId};

#[derive(Parser, Debug)]
#[command(name = "intake-queue")]
#[command(version)]
#[command(about = "Pending-request intake queue for asynchronous security analysis")]
pub struct Args {
    /// TOML configuration file
    #[arg(long, env = "INTAKE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Overrides `storage_path` from the configuration file
    #[arg(long, env = "INTAKE_STORAGE_DIR")]
    pub storage_path: Option<PathBuf>,

    /// Overrides `backend` from the configuration file (`file` or `database`)
    #[arg(long, value_enum)]
    pub backend: Option<BackendKind>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Store an intercepted request and print its id
    Enqueue {
        /// Origin address of the request
        #[arg(long)]
        remote_ip: String,
        /// Request field as SECTION.NAME=VALUE, e.g. POST.user=admin
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, String, String)>,
    },
    /// Print pending records, one JSON document per line
    Pending {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Flag a record as analysed
    MarkProcessed { id: String },
}

fn parse_field(raw: &str) -> Result<(String, String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected SECTION.NAME=VALUE, got {:?}", raw))?;
    let (section, name) = key
        .split_once('.')
        .ok_or_else(|| format!("expected SECTION.NAME before '=', got {:?}", key))?;
    if section.is_empty() || name.is_empty() {
        return Err(format!("section and field name must be non-empty in {:?}", raw));
    }
    Ok((section.to_uppercase(), name.to_string(), value.to_string()))
}

impl Args {
    /// Configuration file (or defaults) with command-line overrides applied.
    pub fn resolve_config(&self) -> Result<QueueConfig, CliError> {
        let mut config = match &self.config {
            Some(path) => QueueConfig::from_file(path)?,
            None => QueueConfig::default(),
        };
        if let Some(ref path) = self.storage_path {
            config.storage_path = path.clone();
        }
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        config.validate()?;
        Ok(config)
    }
}

pub fn run<W: Write>(args: &Args, out: &mut W) -> Result<(), CliError> {
    let config = args.resolve_config()?;
    info!("Using {} backend", config.backend);
    match config.backend {
        BackendKind::File => execute(
            &Queue::with_adapter(FileBackend::new(), config.file_adapter()),
            &args.command,
            &config,
            out,
        ),
        BackendKind::Database => execute(
            &Queue::with_adapter(DatabaseBackend::new()?, config.database_adapter()),
            &args.command,
            &config,
            out,
        ),
    }
}

pub fn execute<B: Backend, W: Write>(
    queue: &Queue<B>,
    command: &Command,
    config: &QueueConfig,
    out: &mut W,
) -> Result<(), CliError> {
    match command {
        Command::Enqueue { remote_ip, fields } => {
            let record = fields
                .iter()
                .fold(NewRecord::new(remote_ip.as_str()), |record, (section, name, value)| {
                    record.with_field(section.as_str(), name.as_str(), value.as_str())
                });
            let id = queue.enqueue(record)?;
            writeln!(out, "{}", id)?;
        }
        Command::Pending { limit } => {
            let records = match limit.or(config.pending_limit) {
                Some(limit) => queue.get_pending_limited(limit)?,
                None => queue.get_pending()?,
            };
            debug!("Printing {} pending record(s)", records.len());
            for record in &records {
                let line = serde_json::to_string(record)
                    .map_err(|e| StorageError::Corrupted(e.to_string()))?;
                writeln!(out, "{}", line)?;
            }
        }
        Command::MarkProcessed { id } => {
            let id = RecordId::from(id.as_str());
            queue.mark_processed(&id)?;
            writeln!(out, "{}", id)?;
        }
    }
    Ok(())
}
