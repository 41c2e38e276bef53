//! Error type shared by the energy model, its fields and the state store.

use std::path::PathBuf;
use thiserror::Error;

pub type EnergyResult<T> = Result<T, EnergyError>;

#[derive(Error, Debug)]
pub enum EnergyError {
    /// Operation called in a lifecycle state that does not allow it
    #[error("{operation}: energy model is {state}; call initialize, restart or bootstrap first")]
    Precondition {
        operation: &'static str,
        state: &'static str,
    },

    /// Operation is declared but never implemented
    #[error("{operation} is not supported: pass a fresh EnergyModelInputs bundle every step")]
    Unsupported { operation: &'static str },

    /// Malformed or incompatible inputs
    #[error("invalid input: {0}")]
    Validation(String),

    /// Stored state lacks a variable needed for an exact restart
    #[error("variable '{variable}' is missing at time index {time_index}")]
    MissingData {
        variable: String,
        time_index: usize,
    },

    /// A temperature field cannot be derived from the current state
    #[error("cannot derive temperature: {0}")]
    DerivationUnsupported(String),

    /// Column system had a zero pivot
    #[error("tridiagonal solve failed in column ({i}, {j})")]
    SolverFailure { i: usize, j: usize },

    #[error("storage error ({path}): {message}")]
    Storage {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl EnergyError {
    pub fn validation(message: impl Into<String>) -> Self {
        EnergyError::Validation(message.into())
    }

    pub fn storage(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        EnergyError::Storage {
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn io(path: impl Into<PathBuf>, message: impl Into<String>, source: std::io::Error) -> Self {
        EnergyError::Storage {
            path: path.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn is_precondition(&self) -> bool {
        matches!(self, EnergyError::Precondition { .. })
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, EnergyError::Unsupported { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, EnergyError::Validation(_))
    }

    pub fn is_missing_data(&self) -> bool {
        matches!(self, EnergyError::MissingData { .. })
    }

    pub fn is_derivation_unsupported(&self) -> bool {
        matches!(self, EnergyError::DerivationUnsupported(_))
    }
}
