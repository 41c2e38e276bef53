//! Conversion between the handful of units drivers use to prepare forcing
//! (heat flux in mW m-2, time steps in years, melt rates per year, ...).

use crate::constants::{MILLI, SECONDS_PER_DAY, SECONDS_PER_YEAR, TO_KELVIN};
use crate::error::{EnergyError, EnergyResult};
use once_cell::sync::Lazy;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Dimension {
    Time,
    Length,
    Velocity,
    HeatFlux,
    Temperature,
    SpecificEnergy,
    Pressure,
}

#[derive(Debug, Clone, Copy)]
struct UnitDef {
    dimension: Dimension,
    /// Multiply by this to get the SI value
    scale: f64,
    /// Added after scaling (temperatures only)
    offset: f64,
}

impl UnitDef {
    const fn linear(dimension: Dimension, scale: f64) -> Self {
        Self { dimension, scale, offset: 0.0 }
    }
}

static UNITS: Lazy<HashMap<&'static str, UnitDef>> = Lazy::new(|| {
    use Dimension::*;
    let mut m = HashMap::new();

    for name in ["s", "second", "seconds"] {
        m.insert(name, UnitDef::linear(Time, 1.0));
    }
    for name in ["day", "days"] {
        m.insert(name, UnitDef::linear(Time, SECONDS_PER_DAY));
    }
    for name in ["a", "yr", "year", "years"] {
        m.insert(name, UnitDef::linear(Time, SECONDS_PER_YEAR));
    }

    m.insert("m", UnitDef::linear(Length, 1.0));
    m.insert("km", UnitDef::linear(Length, 1000.0));
    m.insert("mm", UnitDef::linear(Length, MILLI));

    m.insert("m s-1", UnitDef::linear(Velocity, 1.0));
    m.insert("m year-1", UnitDef::linear(Velocity, 1.0 / SECONDS_PER_YEAR));
    m.insert("mm year-1", UnitDef::linear(Velocity, MILLI / SECONDS_PER_YEAR));
    m.insert("km year-1", UnitDef::linear(Velocity, 1000.0 / SECONDS_PER_YEAR));

    m.insert("W m-2", UnitDef::linear(HeatFlux, 1.0));
    m.insert("mW m-2", UnitDef::linear(HeatFlux, MILLI));

    m.insert("K", UnitDef::linear(Temperature, 1.0));
    m.insert("Kelvin", UnitDef::linear(Temperature, 1.0));
    m.insert(
        "Celsius",
        UnitDef { dimension: Temperature, scale: 1.0, offset: TO_KELVIN },
    );

    m.insert("J kg-1", UnitDef::linear(SpecificEnergy, 1.0));
    m.insert("kJ kg-1", UnitDef::linear(SpecificEnergy, 1000.0));

    m.insert("Pa", UnitDef::linear(Pressure, 1.0));
    m.insert("kPa", UnitDef::linear(Pressure, 1000.0));
    m.insert("bar", UnitDef::linear(Pressure, 1.0e5));

    m
});

/// Stateless unit converter; constructed by drivers and handed to whatever
/// prepares forcing fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitSystem;

impl UnitSystem {
    pub fn new() -> Self {
        UnitSystem
    }

    pub fn is_known(&self, unit: &str) -> bool {
        UNITS.contains_key(unit.trim())
    }

    /// Convert `value` from `from` to `to`; both units must measure the same quantity
    pub fn convert(&self, value: f64, from: &str, to: &str) -> EnergyResult<f64> {
        let from_def = lookup(from)?;
        let to_def = lookup(to)?;
        if from_def.dimension != to_def.dimension {
            return Err(EnergyError::validation(format!(
                "cannot convert from '{}' to '{}': incompatible units",
                from, to
            )));
        }
        let si = value * from_def.scale + from_def.offset;
        Ok((si - to_def.offset) / to_def.scale)
    }
}

fn lookup(unit: &str) -> EnergyResult<UnitDef> {
    UNITS
        .get(unit.trim())
        .copied()
        .ok_or_else(|| EnergyError::validation(format!("unknown unit '{}'", unit)))
}
