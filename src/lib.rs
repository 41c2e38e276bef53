pub mod config;
pub mod constants;
pub mod energy;
pub mod enthalpy_converter;
pub mod error;
pub mod field;
pub mod field_store;
pub mod grid;
pub mod logging;
pub mod math_utils;
pub mod persistence;
pub mod units;

pub use energy::{EnergyModel, EnergyModelInputs, EnergyModelStats, Lifecycle, ModelVariant};
pub use error::{EnergyError, EnergyResult};
