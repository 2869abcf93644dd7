// src/ledger.rs
use chrono::{Datelike, Local, NaiveDateTime};
use serde::Deserialize;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::error::AppError;
use crate::session::SessionIdentity;

pub const LEDGER_HEADER: [&str; 7] = [
    "timestamp",
    "monitor_usuario",
    "monitor_nome",
    "monitor_turno",
    "aluno_nome",
    "data_falta",
    "motivo",
];

pub const MONTHS_PT: [&str; 12] = [
    "janeiro",
    "fevereiro",
    "março",
    "abril",
    "maio",
    "junho",
    "julho",
    "agosto",
    "setembro",
    "outubro",
    "novembro",
    "dezembro",
];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

// --- Clock ---

pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Server-local wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

// --- Records ---

/// Absence fields as submitted by the registration form.
///
/// Missing form fields become empty strings here and nowhere else.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AbsenceForm {
    #[serde(default)]
    pub aluno_nome: String,
    #[serde(default)]
    pub data_falta: String,
    #[serde(default)]
    pub motivo: String,
}

impl AbsenceForm {
    pub fn trimmed(self) -> Self {
        Self {
            aluno_nome: self.aluno_nome.trim().to_string(),
            data_falta: self.data_falta.trim().to_string(),
            motivo: self.motivo.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbsenceRecord {
    pub recorded_at: NaiveDateTime,
    pub monitor_username: String,
    pub monitor_name: String,
    pub monitor_shift: String,
    pub student_name: String,
    pub absence_date: String,
    pub reason: String,
}

impl AbsenceRecord {
    pub fn new(identity: &SessionIdentity, form: AbsenceForm, recorded_at: NaiveDateTime) -> Self {
        Self {
            recorded_at,
            monitor_username: identity.username.clone(),
            monitor_name: identity.full_name.clone(),
            monitor_shift: identity.shift.clone(),
            student_name: form.aluno_nome,
            absence_date: form.data_falta,
            reason: form.motivo,
        }
    }

    pub fn timestamp(&self) -> String {
        self.recorded_at.format(TIMESTAMP_FORMAT).to_string()
    }

    fn to_row(&self) -> [String; 7] {
        [
            self.timestamp(),
            self.monitor_username.clone(),
            self.monitor_name.clone(),
            self.monitor_shift.clone(),
            self.student_name.clone(),
            self.absence_date.clone(),
            self.reason.clone(),
        ]
    }
}

/// What the recorder hands to the notification step.
#[derive(Debug, Clone)]
pub struct RecordedAbsence {
    pub record: AbsenceRecord,
    pub ledger_path: PathBuf,
}

// --- Ledger ---

/// Resolves and appends to the monthly `faltas_<mes>_<ano>.csv` files.
///
/// Appends are not synchronized: two requests writing the same month at the
/// same moment may interleave their rows.
#[derive(Clone)]
pub struct Ledger {
    root: PathBuf,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger").field("root", &self.root).finish()
    }
}

impl Ledger {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_clock(root, Arc::new(SystemClock))
    }

    pub fn with_clock(root: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            root: root.into(),
            clock,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    pub fn ensure_root(&self) -> Result<(), AppError> {
        fs::create_dir_all(&self.root).map_err(|source| AppError::LedgerIo {
            path: self.root.clone(),
            source,
        })
    }

    /// Ledger path for the calendar month containing `at`.
    pub fn resolve_ledger_path(&self, at: NaiveDateTime) -> PathBuf {
        self.root.join(ledger_file_name(at))
    }

    pub fn current_ledger_path(&self) -> PathBuf {
        self.resolve_ledger_path(self.clock.now())
    }

    /// Appends one record to the ledger of the current month and returns it with its path.
    pub fn append_record(
        &self,
        identity: &SessionIdentity,
        form: AbsenceForm,
    ) -> Result<RecordedAbsence, AppError> {
        let recorded_at = self.clock.now();
        let path = self.resolve_ledger_path(recorded_at);
        let record = AbsenceRecord::new(identity, form, recorded_at);

        self.ensure_root()?;
        let io_err = |source: std::io::Error| AppError::LedgerIo {
            path: path.clone(),
            source,
        };
        let csv_err = |source: csv::Error| AppError::LedgerCsv {
            path: path.clone(),
            source,
        };

        let exists = path.exists();
        {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(io_err)?;
            let mut writer = csv::WriterBuilder::new()
                .terminator(csv::Terminator::CRLF)
                .from_writer(file);
            if !exists {
                writer.write_record(LEDGER_HEADER).map_err(csv_err)?;
            }
            writer.write_record(record.to_row()).map_err(csv_err)?;
            writer.flush().map_err(io_err)?;
        }

        info!(
            "Absence for '{}' recorded by {} in {}",
            record.student_name,
            record.monitor_username,
            path.display()
        );
        Ok(RecordedAbsence {
            record,
            ledger_path: path,
        })
    }
}

pub fn ledger_file_name(at: NaiveDateTime) -> String {
    let month_name = MONTHS_PT[at.month0() as usize];
    format!("faltas_{}_{:04}.csv", month_name, at.year())
}

/// Re-parses a ledger file, skipping its header row.
pub fn read_records(path: &Path) -> Result<Vec<AbsenceRecord>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|source| AppError::LedgerCsv {
            path: path.to_path_buf(),
            source,
        })?;

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result.map_err(|source| AppError::LedgerCsv {
            path: path.to_path_buf(),
            source,
        })?;
        let field = |i: usize| row.get(i).unwrap_or_default().to_string();
        let Ok(recorded_at) = NaiveDateTime::parse_from_str(&field(0), TIMESTAMP_FORMAT) else {
            continue;
        };
        records.push(AbsenceRecord {
            recorded_at,
            monitor_username: field(1),
            monitor_name: field(2),
            monitor_shift: field(3),
            student_name: field(4),
            absence_date: field(5),
            reason: field(6),
        });
    }
    Ok(records)
}
