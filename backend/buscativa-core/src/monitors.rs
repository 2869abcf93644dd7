// src/monitors.rs
use std::collections::HashMap;
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::AppError;

const HEADER_FIRST_FIELD: &str = "usuario";

/// One row of the monitor credentials file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorProfile {
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub shift: String,
}

/// Read-only view over the `usuario;senha;nome_completo;turno` file.
///
/// The file is re-read on every call, so edits take effect without a restart.
#[derive(Debug, Clone)]
pub struct MonitorDirectory {
    path: PathBuf,
}

impl MonitorDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads every well-formed row keyed by username. Later rows win on duplicates.
    ///
    /// A missing file means no monitors are configured and yields an empty map.
    pub fn load(&self) -> Result<HashMap<String, MonitorProfile>, AppError> {
        let mut monitors = HashMap::new();

        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(
                    "Monitor file {} not found. No monitors configured.",
                    self.path.display()
                );
                return Ok(monitors);
            }
            Err(e) => {
                return Err(AppError::MonitorFile {
                    path: self.path.clone(),
                    source: e.into(),
                })
            }
        };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .flexible(true)
            .from_reader(file);

        for (index, result) in reader.records().enumerate() {
            let row = match result {
                Ok(row) => row,
                Err(e) if e.is_io_error() => {
                    return Err(AppError::MonitorFile {
                        path: self.path.clone(),
                        source: e,
                    })
                }
                Err(e) => {
                    warn!("Skipping unreadable monitor line {}: {}", index + 1, e);
                    continue;
                }
            };

            let first = row.get(0).map(str::trim).unwrap_or_default();
            if row.len() == 1 && first.is_empty() {
                continue;
            }
            if first.eq_ignore_ascii_case(HEADER_FIRST_FIELD) {
                continue;
            }
            if row.len() < 4 {
                debug!("Skipping malformed monitor line {} ({} fields)", index + 1, row.len());
                continue;
            }

            let profile = MonitorProfile {
                username: first.to_string(),
                password: row[1].trim().to_string(),
                full_name: row[2].trim().to_string(),
                shift: row[3].trim().to_string(),
            };
            monitors.insert(profile.username.clone(), profile);
        }

        Ok(monitors)
    }

    /// Exact match on the trimmed username and on the password.
    pub fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<MonitorProfile>, AppError> {
        let mut monitors = self.load()?;
        Ok(monitors
            .remove(username.trim())
            .filter(|profile| profile.password == password))
    }
}
