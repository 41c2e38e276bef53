//! State storage: named fields keyed by time record.
//!
//! `StateStore` is the contract the energy model relies on for `restart`,
//! `bootstrap` and `write_model_state`. `JsonStateFile` is the adapter shipped
//! with the crate: a JSON document holding a time axis and one array per
//! variable per record.

use crate::error::{EnergyError, EnergyResult};
use crate::field::FieldMetadata;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Read/write access to stored model fields
pub trait StateStore {
    /// Human-readable location used in log messages
    fn location(&self) -> String;

    /// Number of time records
    fn time_length(&self) -> usize;

    fn has_variable(&self, name: &str) -> bool;

    /// Variable `name` has data at `time_index`
    fn has_record(&self, name: &str, time_index: usize) -> bool;

    /// Values of `name` at `time_index`; `MissingData` if absent
    fn read_field(&self, name: &str, time_index: usize) -> EnergyResult<Vec<f64>>;

    /// Write `data` into the last time record
    fn write_field(&mut self, metadata: &FieldMetadata, shape: &[usize], data: &[f64]) -> EnergyResult<()> {
        self.write_fields(&[FieldRecord::new(metadata, shape, data)])
    }

    /// Write several variables into the last time record. Every variable is
    /// checked first; on error nothing is written.
    fn write_fields(&mut self, fields: &[FieldRecord<'_>]) -> EnergyResult<()>;
}

/// One variable of a record passed to `StateStore::write_fields`
#[derive(Debug, Clone, Copy)]
pub struct FieldRecord<'a> {
    pub metadata: &'a FieldMetadata,
    pub shape: &'a [usize],
    pub data: &'a [f64],
}

impl<'a> FieldRecord<'a> {
    pub fn new(metadata: &'a FieldMetadata, shape: &'a [usize], data: &'a [f64]) -> Self {
        Self { metadata, shape, data }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoMode {
    /// Existing file, no writes
    ReadOnly,
    /// Existing file is opened for appending, a missing one is created
    ReadWrite,
    /// An existing file is renamed to `<path>~` and a new one is started
    ReadWriteMove,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TimeAxis {
    name: String,
    calendar: String,
    units: String,
    values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct StoredVariable {
    metadata: FieldMetadata,
    shape: Vec<usize>,
    records: BTreeMap<usize, Vec<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct StateDocument {
    time: Option<TimeAxis>,
    variables: BTreeMap<String, StoredVariable>,
}

#[derive(Debug)]
pub struct JsonStateFile {
    path: PathBuf,
    mode: IoMode,
    document: StateDocument,
    dirty: bool,
}

impl JsonStateFile {
    pub fn open<P: AsRef<Path>>(path: P, mode: IoMode) -> EnergyResult<Self> {
        let path = path.as_ref().to_path_buf();
        let document = match mode {
            IoMode::ReadOnly => read_document(&path)?,
            IoMode::ReadWrite => {
                if path.exists() {
                    read_document(&path)?
                } else {
                    StateDocument::default()
                }
            }
            IoMode::ReadWriteMove => {
                if path.exists() {
                    let backup = backup_path(&path);
                    fs::rename(&path, &backup)
                        .map_err(|e| EnergyError::io(&path, format!("failed to move to {}", backup.display()), e))?;
                    log::info!("moved existing {} to {}", path.display(), backup.display());
                }
                StateDocument::default()
            }
        };
        Ok(Self {
            path,
            mode,
            document,
            dirty: mode == IoMode::ReadWriteMove,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> IoMode {
        self.mode
    }

    fn check_writable(&self) -> EnergyResult<()> {
        if self.mode == IoMode::ReadOnly {
            return Err(EnergyError::storage(&self.path, "file is open read-only"));
        }
        Ok(())
    }

    /// Data length matches the shape, and the shape matches an earlier definition
    fn check_record(&self, field: &FieldRecord<'_>) -> EnergyResult<()> {
        let expected: usize = field.shape.iter().product();
        if expected != field.data.len() {
            return Err(EnergyError::validation(format!(
                "variable '{}' has shape {:?} but {} values were given",
                field.metadata.name,
                field.shape,
                field.data.len()
            )));
        }
        match self.variable_shape(&field.metadata.name) {
            Some(shape) if shape != field.shape => Err(EnergyError::storage(
                &self.path,
                format!(
                    "variable '{}' was defined with shape {:?}, got {:?}",
                    field.metadata.name, shape, field.shape
                ),
            )),
            _ => Ok(()),
        }
    }

    /// Create the time axis; repeating an identical definition is a no-op
    pub fn define_time(&mut self, name: &str, calendar: &str, units: &str) -> EnergyResult<()> {
        self.check_writable()?;
        match &self.document.time {
            Some(axis) if axis.name == name => Ok(()),
            Some(axis) => Err(EnergyError::storage(
                &self.path,
                format!("time dimension '{}' already defined, cannot define '{}'", axis.name, name),
            )),
            None => {
                self.document.time = Some(TimeAxis {
                    name: name.to_string(),
                    calendar: calendar.to_string(),
                    units: units.to_string(),
                    values: Vec::new(),
                });
                self.dirty = true;
                Ok(())
            }
        }
    }

    /// Start a new time record at `time` (seconds)
    pub fn append_time(&mut self, name: &str, time: f64) -> EnergyResult<()> {
        self.check_writable()?;
        let path = self.path.clone();
        match self.document.time.as_mut() {
            Some(axis) if axis.name == name => {
                axis.values.push(time);
                self.dirty = true;
                Ok(())
            }
            _ => Err(EnergyError::storage(path, format!("time dimension '{}' is not defined", name))),
        }
    }

    pub fn time_values(&self) -> &[f64] {
        self.document.time.as_ref().map(|axis| axis.values.as_slice()).unwrap_or(&[])
    }

    pub fn calendar(&self) -> Option<&str> {
        self.document.time.as_ref().map(|axis| axis.calendar.as_str())
    }

    pub fn variable_shape(&self, name: &str) -> Option<&[usize]> {
        self.document.variables.get(name).map(|var| var.shape.as_slice())
    }

    pub fn variable_metadata(&self, name: &str) -> Option<&FieldMetadata> {
        self.document.variables.get(name).map(|var| &var.metadata)
    }

    /// Flush pending changes to disk
    pub fn sync(&mut self) -> EnergyResult<()> {
        if self.mode == IoMode::ReadOnly || !self.dirty {
            return Ok(());
        }
        let json_str = serde_json::to_string(&self.document)?;
        fs::write(&self.path, json_str).map_err(|e| EnergyError::io(&self.path, "failed to write state file", e))?;
        self.dirty = false;
        Ok(())
    }

    pub fn close(mut self) -> EnergyResult<()> {
        self.sync()
    }
}

impl StateStore for JsonStateFile {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn time_length(&self) -> usize {
        self.time_values().len()
    }

    fn has_variable(&self, name: &str) -> bool {
        self.document.variables.contains_key(name)
    }

    fn has_record(&self, name: &str, time_index: usize) -> bool {
        self.document
            .variables
            .get(name)
            .is_some_and(|var| var.records.contains_key(&time_index))
    }

    fn read_field(&self, name: &str, time_index: usize) -> EnergyResult<Vec<f64>> {
        self.document
            .variables
            .get(name)
            .and_then(|var| var.records.get(&time_index))
            .cloned()
            .ok_or_else(|| EnergyError::MissingData {
                variable: name.to_string(),
                time_index,
            })
    }

    fn write_fields(&mut self, fields: &[FieldRecord<'_>]) -> EnergyResult<()> {
        self.check_writable()?;
        let record = match self.time_length() {
            0 => return Err(EnergyError::storage(&self.path, "no time record to write to; call append_time first")),
            n => n - 1,
        };
        for field in fields {
            self.check_record(field)?;
        }

        for field in fields {
            let variable = self
                .document
                .variables
                .entry(field.metadata.name.clone())
                .or_insert_with(|| StoredVariable {
                    metadata: field.metadata.clone(),
                    shape: field.shape.to_vec(),
                    records: BTreeMap::new(),
                });
            variable.metadata = field.metadata.clone();
            variable.records.insert(record, field.data.to_vec());
        }
        self.dirty = true;
        Ok(())
    }
}

fn read_document(path: &Path) -> EnergyResult<StateDocument> {
    let json_str = fs::read_to_string(path).map_err(|e| EnergyError::io(path, "failed to read state file", e))?;
    serde_json::from_str(&json_str)
        .map_err(|e| EnergyError::storage(path, format!("not a readable state file: {}", e)))
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push("~");
    PathBuf::from(name)
}
