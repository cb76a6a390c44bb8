// Outcome log for retired generations
//
// Writes one JSON line per retired generation, fire-and-forget on the tokio
// runtime so the tick driver never waits on disk. The synchronous reader backs
// `headless --summarize`.

use log::{error, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::types::{GenerationSummary, Outcome};

/// A single line of the outcome log
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OutcomeLogEntry {
    pub summary: GenerationSummary,
    pub outcomes: Vec<Outcome>,
    pub timestamp: String,
}

/// Shared outcome logger state
/// Uses Arc<Mutex<File>> so concurrent writes land as whole lines
#[derive(Clone)]
pub struct OutcomeLogger {
    file: Arc<Mutex<Option<File>>>,
    enabled: bool,
}

impl OutcomeLogger {
    /// Creates a new outcome logger
    /// If enabled is true, initializes the log file (truncating if it exists)
    pub async fn new(enabled: bool, log_file_path: &str) -> Self {
        if !enabled {
            return Self::disabled();
        }

        match OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(log_file_path)
            .await
        {
            Ok(file) => {
                info!("Outcome logging enabled: {}", log_file_path);
                OutcomeLogger {
                    file: Arc::new(Mutex::new(Some(file))),
                    enabled: true,
                }
            }
            Err(e) => {
                error!("Failed to create outcome log file '{}': {}", log_file_path, e);
                Self::disabled()
            }
        }
    }

    /// Creates a disabled logger (no-op)
    pub fn disabled() -> Self {
        OutcomeLogger {
            file: Arc::new(Mutex::new(None)),
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Logs a retired generation without blocking the caller
    /// Must be called from within a tokio runtime when enabled
    pub fn log_generation(&self, summary: GenerationSummary, outcomes: Vec<Outcome>) {
        if !self.enabled {
            return;
        }

        let file_handle = self.file.clone();
        tokio::spawn(async move {
            Self::write_entry(file_handle, summary, outcomes).await;
        });
    }

    /// Logs a retired generation and waits for the write to finish
    pub async fn log_generation_now(&self, summary: GenerationSummary, outcomes: Vec<Outcome>) {
        if !self.enabled {
            return;
        }
        Self::write_entry(self.file.clone(), summary, outcomes).await;
    }

    async fn write_entry(
        file_handle: Arc<Mutex<Option<File>>>,
        summary: GenerationSummary,
        outcomes: Vec<Outcome>,
    ) {
        let mut file_guard = file_handle.lock().await;

        if let Some(file) = file_guard.as_mut() {
            let entry = OutcomeLogEntry {
                summary,
                outcomes,
                timestamp: chrono::Utc::now().to_rfc3339(),
            };

            match serde_json::to_string(&entry) {
                Ok(json_line) => {
                    let line_with_newline = format!("{}\n", json_line);
                    if let Err(e) = file.write_all(line_with_newline.as_bytes()).await {
                        error!("Failed to write outcome log entry: {}", e);
                    } else if let Err(e) = file.flush().await {
                        error!("Failed to flush outcome log: {}", e);
                    }
                }
                Err(e) => {
                    error!("Failed to serialize outcome log entry: {}", e);
                }
            }
        }
    }
}

/// Loads all entries from an outcome log, skipping blank lines
pub fn read_log<P: AsRef<Path>>(log_path: P) -> Result<Vec<OutcomeLogEntry>, String> {
    let file = fs::File::open(log_path.as_ref())
        .map_err(|e| format!("Failed to open log file: {}", e))?;

    let reader = BufReader::new(file);
    let mut entries = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| format!("Failed to read line {}: {}", line_num + 1, e))?;

        if line.trim().is_empty() {
            continue;
        }

        let entry: OutcomeLogEntry = serde_json::from_str(&line)
            .map_err(|e| format!("Failed to parse JSON on line {}: {}", line_num + 1, e))?;

        entries.push(entry);
    }

    Ok(entries)
}
