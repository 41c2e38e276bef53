//! Conversion between enthalpy and (temperature, water fraction) for ice at a
//! given pressure.
//!
//! Enthalpy is measured from the reference temperature `T0`:
//! - cold ice: `E = c_i (T - T0)`, with `T` below the pressure melting point
//! - temperate ice: `E = E_cts(p) + omega L`, where `E_cts` is the enthalpy of
//!   the cold-temperate transition surface and `omega` the water fraction
//! - `E >= E_cts(p) + L` has no ice left and no temperature representation here

use crate::config::EnergyConfig;
use crate::error::{EnergyError, EnergyResult};
use serde::{Deserialize, Serialize};

/// Phase of the ice/water mixture at a point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IcePhase {
    Cold,
    Temperate,
    Liquid,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnthalpyConverter {
    ice_density: f64,
    gravity: f64,
    c_i: f64,
    latent_heat: f64,
    beta: f64,
    melting_point: f64,
    reference_temperature: f64,
    surface_pressure: f64,
}

impl EnthalpyConverter {
    pub fn new(config: &EnergyConfig) -> Self {
        Self {
            ice_density: config.ice_density_kgm3,
            gravity: config.gravity_ms2,
            c_i: config.ice_specific_heat_j_per_kg_k,
            latent_heat: config.latent_heat_fusion_j_per_kg,
            beta: config.clausius_clapeyron_k_per_pa,
            melting_point: config.melting_point_k,
            reference_temperature: config.reference_temperature_k,
            surface_pressure: config.surface_pressure_pa,
        }
    }

    pub fn specific_heat(&self) -> f64 {
        self.c_i
    }

    pub fn latent_heat(&self) -> f64 {
        self.latent_heat
    }

    /// Hydrostatic pressure at `depth` m below the ice surface
    pub fn pressure(&self, depth: f64) -> f64 {
        self.surface_pressure + self.ice_density * self.gravity * depth.max(0.0)
    }

    /// Pressures at levels `z[0..=ks]` of a column of ice `thickness` m thick
    pub fn pressures(&self, thickness: f64, z: &[f64]) -> Vec<f64> {
        z.iter().map(|&level| self.pressure(thickness - level)).collect()
    }

    pub fn melting_temperature(&self, pressure: f64) -> f64 {
        self.melting_point - self.beta * pressure
    }

    /// Enthalpy of the cold-temperate transition at `pressure`
    pub fn enthalpy_cts(&self, pressure: f64) -> f64 {
        self.c_i * (self.melting_temperature(pressure) - self.reference_temperature)
    }

    /// Enthalpy at which the mixture is fully liquid
    pub fn enthalpy_liquid(&self, pressure: f64) -> f64 {
        self.enthalpy_cts(pressure) + self.latent_heat
    }

    pub fn phase(&self, enthalpy: f64, pressure: f64) -> IcePhase {
        if enthalpy < self.enthalpy_cts(pressure) {
            IcePhase::Cold
        } else if enthalpy < self.enthalpy_liquid(pressure) {
            IcePhase::Temperate
        } else {
            IcePhase::Liquid
        }
    }

    pub fn is_temperate(&self, enthalpy: f64, pressure: f64) -> bool {
        enthalpy >= self.enthalpy_cts(pressure)
    }

    /// Enthalpy of ice at temperature `temperature` holding water fraction `omega`
    pub fn enthalpy(&self, temperature: f64, omega: f64, pressure: f64) -> EnergyResult<f64> {
        let t_melting = self.melting_temperature(pressure);
        if temperature > t_melting + 1e-9 {
            return Err(EnergyError::validation(format!(
                "T = {:.6} K exceeds the pressure melting temperature {:.6} K at p = {:.1} Pa",
                temperature, t_melting, pressure
            )));
        }
        if !(0.0..=1.0).contains(&omega) {
            return Err(EnergyError::validation(format!("water fraction {} is outside [0, 1]", omega)));
        }
        if temperature < t_melting {
            Ok(self.c_i * (temperature - self.reference_temperature))
        } else {
            Ok(self.enthalpy_cts(pressure) + omega * self.latent_heat)
        }
    }

    /// Enthalpy of water-free ice at `temperature`; needs no pressure since
    /// `E_cts(p)` is this expression at `T_m(p)`
    pub fn cold_enthalpy(&self, temperature: f64) -> f64 {
        self.c_i * (temperature - self.reference_temperature)
    }

    /// Enthalpy of ice at `temperature` capped at pressure melting, with no water
    pub fn enthalpy_permissive(&self, temperature: f64, omega: f64, pressure: f64) -> f64 {
        let t_melting = self.melting_temperature(pressure);
        if temperature < t_melting {
            self.c_i * (temperature - self.reference_temperature)
        } else {
            self.enthalpy_cts(pressure) + omega.clamp(0.0, 1.0) * self.latent_heat
        }
    }

    /// Temperature of the mixture; fails once no ice is left
    pub fn temperature(&self, enthalpy: f64, pressure: f64) -> EnergyResult<f64> {
        match self.phase(enthalpy, pressure) {
            IcePhase::Cold => Ok(enthalpy / self.c_i + self.reference_temperature),
            IcePhase::Temperate => Ok(self.melting_temperature(pressure)),
            IcePhase::Liquid => Err(EnergyError::DerivationUnsupported(format!(
                "E = {:.1} J/kg at p = {:.1} Pa is at or above the liquid limit {:.1} J/kg",
                enthalpy,
                pressure,
                self.enthalpy_liquid(pressure)
            ))),
        }
    }

    /// Temperature relative to the pressure melting point (<= 0 for valid states)
    pub fn pressure_adjusted_temperature(&self, enthalpy: f64, pressure: f64) -> EnergyResult<f64> {
        Ok(self.temperature(enthalpy, pressure)? - self.melting_temperature(pressure) + self.melting_point)
    }

    pub fn water_fraction(&self, enthalpy: f64, pressure: f64) -> f64 {
        let e_cts = self.enthalpy_cts(pressure);
        if enthalpy <= e_cts {
            0.0
        } else {
            ((enthalpy - e_cts) / self.latent_heat).min(1.0)
        }
    }
}
