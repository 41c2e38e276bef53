use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::AddAssign;

/// Per-step summary of the energy solve. Columns are processed independently
/// and their counters merged with `+=`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyModelStats {
    /// Points where explicit advection undershoot had to be clipped
    pub bulge_counter: u64,
    /// Columns where the horizontal CFL number exceeded one
    pub reduced_accuracy_counter: u64,
    /// Points colder than the configured low-temperature threshold
    pub low_temperature_counter: u64,
    /// Ice volume (m³) turned to water beyond the liquid limit
    pub liquified_ice_volume: f64,
}

impl EnergyModelStats {
    pub fn is_clean(&self) -> bool {
        self.bulge_counter == 0
            && self.reduced_accuracy_counter == 0
            && self.low_temperature_counter == 0
            && self.liquified_ice_volume == 0.0
    }
}

impl AddAssign for EnergyModelStats {
    fn add_assign(&mut self, other: Self) {
        self.bulge_counter += other.bulge_counter;
        self.reduced_accuracy_counter += other.reduced_accuracy_counter;
        self.low_temperature_counter += other.low_temperature_counter;
        self.liquified_ice_volume += other.liquified_ice_volume;
    }
}

impl fmt::Display for EnergyModelStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bulges: {}, reduced accuracy columns: {}, low temperature points: {}, liquified ice: {:.3e} m³",
            self.bulge_counter, self.reduced_accuracy_counter, self.low_temperature_counter, self.liquified_ice_volume
        )
    }
}
