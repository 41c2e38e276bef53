// src/config.rs - Run configuration passed explicitly to grids and energy models

use crate::constants::*;
use crate::error::{EnergyError, EnergyResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Distribution of the vertical levels between the base (z = 0) and `lz`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VerticalSpacing {
    Equal,
    /// Levels concentrated near the base; `lambda` = 1 gives equal spacing at the top,
    /// larger values squeeze the bottom layers
    Quadratic { lambda: f64 },
}

/// Shape of the computational domain
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridParameters {
    pub mx: usize,
    pub my: usize,
    pub mz: usize,
    /// Half-width of the domain in x (m)
    pub lx: f64,
    /// Half-width of the domain in y (m)
    pub ly: f64,
    /// Height of the computational box (m)
    pub lz: f64,
    pub vertical_spacing: VerticalSpacing,
}

impl Default for GridParameters {
    fn default() -> Self {
        Self {
            mx: 3,
            my: 3,
            mz: 41,
            lx: 1500.0 * KM_TO_M,
            ly: 1500.0 * KM_TO_M,
            lz: 4000.0,
            vertical_spacing: VerticalSpacing::Quadratic { lambda: 4.0 },
        }
    }
}

impl GridParameters {
    pub fn validate(&self) -> EnergyResult<()> {
        if self.mx < 3 || self.my < 3 {
            return Err(EnergyError::Config(format!(
                "need at least 3x3 horizontal points, got {}x{}",
                self.mx, self.my
            )));
        }
        if self.mz < 2 {
            return Err(EnergyError::Config(format!("need at least 2 vertical levels, got {}", self.mz)));
        }
        if !(self.lx > 0.0 && self.ly > 0.0 && self.lz > 0.0) {
            return Err(EnergyError::Config(format!(
                "domain extents must be positive (Lx={}, Ly={}, Lz={})",
                self.lx, self.ly, self.lz
            )));
        }
        if let VerticalSpacing::Quadratic { lambda } = self.vertical_spacing {
            // below 1 the base layers get coarser; below 0.5 levels rise above lz
            if lambda.is_nan() || lambda < 1.0 {
                return Err(EnergyError::Config(format!("quadratic spacing lambda must be at least 1, got {}", lambda)));
            }
        }
        Ok(())
    }
}

/// Time axis metadata written next to the model state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    pub dimension_name: String,
    pub calendar: String,
    pub units: String,
    /// Model time (s) recorded by drivers when appending a time record
    pub current_s: f64,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            dimension_name: "time".to_string(),
            calendar: "365_day".to_string(),
            units: "seconds since 1-1-1".to_string(),
            current_s: 0.0,
        }
    }
}

/// Physical parameters of ice and meltwater plus the tuning knobs of the column solves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyConfig {
    pub ice_density_kgm3: f64,
    pub water_density_kgm3: f64,
    pub gravity_ms2: f64,
    pub ice_specific_heat_j_per_kg_k: f64,
    pub water_specific_heat_j_per_kg_k: f64,
    pub ice_thermal_conductivity_w_m_k: f64,
    pub latent_heat_fusion_j_per_kg: f64,
    pub clausius_clapeyron_k_per_pa: f64,
    pub melting_point_k: f64,
    pub reference_temperature_k: f64,
    pub surface_pressure_pa: f64,
    /// Enthalpy conductivity of temperate ice relative to cold ice
    pub temperate_conductivity_ratio: f64,
    /// Water fraction above this is drained to the bed
    pub max_water_fraction: f64,
    pub cold_bulge_max_j_per_kg: f64,
    pub low_temperature_k: f64,
    /// Thinner ice is treated as ice-free
    pub min_ice_thickness_m: f64,
    /// Basal melt rate (m/s) used when bootstrapping from a file without one
    pub bootstrap_basal_melt_rate: f64,
    pub time: TimeConfig,
    pub grid: GridParameters,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            ice_density_kgm3: ICE_DENSITY_KGM3,
            water_density_kgm3: WATER_DENSITY_KGM3,
            gravity_ms2: STANDARD_GRAVITY_MS2,
            ice_specific_heat_j_per_kg_k: ICE_SPECIFIC_HEAT_J_PER_KG_K,
            water_specific_heat_j_per_kg_k: WATER_SPECIFIC_HEAT_J_PER_KG_K,
            ice_thermal_conductivity_w_m_k: ICE_THERMAL_CONDUCTIVITY_W_M_K,
            latent_heat_fusion_j_per_kg: WATER_LATENT_HEAT_FUSION_J_PER_KG,
            clausius_clapeyron_k_per_pa: CLAUSIUS_CLAPEYRON_K_PER_PA,
            melting_point_k: WATER_MELTING_POINT_K,
            reference_temperature_k: ENTHALPY_REFERENCE_TEMP_K,
            surface_pressure_pa: 0.0,
            temperate_conductivity_ratio: 0.1,
            max_water_fraction: 0.01,
            cold_bulge_max_j_per_kg: COLD_BULGE_MAX_J_PER_KG,
            low_temperature_k: LOW_TEMPERATURE_K,
            min_ice_thickness_m: 0.1,
            bootstrap_basal_melt_rate: 0.0,
            time: TimeConfig::default(),
            grid: GridParameters::default(),
        }
    }
}

impl EnergyConfig {
    /// Parse a JSON document; keys that are absent keep their defaults
    pub fn from_json_str(json_str: &str) -> EnergyResult<Self> {
        let config: EnergyConfig = serde_json::from_str(json_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(file_path: P) -> EnergyResult<Self> {
        let path = file_path.as_ref();
        let json_str = fs::read_to_string(path)
            .map_err(|e| EnergyError::io(path, "failed to read configuration", e))?;
        Self::from_json_str(&json_str)
    }

    pub fn to_json_string(&self) -> EnergyResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Thermal diffusivity of cold ice (m²/s)
    pub fn ice_diffusivity_m2_s(&self) -> f64 {
        self.ice_thermal_conductivity_w_m_k / (self.ice_density_kgm3 * self.ice_specific_heat_j_per_kg_k)
    }

    /// Temperature undershoot equivalent to the enthalpy bulge limit
    pub fn cold_bulge_max_k(&self) -> f64 {
        self.cold_bulge_max_j_per_kg / self.ice_specific_heat_j_per_kg_k
    }

    pub fn validate(&self) -> EnergyResult<()> {
        let positive = [
            ("ice_density_kgm3", self.ice_density_kgm3),
            ("water_density_kgm3", self.water_density_kgm3),
            ("gravity_ms2", self.gravity_ms2),
            ("ice_specific_heat_j_per_kg_k", self.ice_specific_heat_j_per_kg_k),
            ("ice_thermal_conductivity_w_m_k", self.ice_thermal_conductivity_w_m_k),
            ("latent_heat_fusion_j_per_kg", self.latent_heat_fusion_j_per_kg),
            ("melting_point_k", self.melting_point_k),
            ("temperate_conductivity_ratio", self.temperate_conductivity_ratio),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(EnergyError::Config(format!("{} must be positive, got {}", name, value)));
            }
        }
        if self.reference_temperature_k >= self.melting_point_k {
            return Err(EnergyError::Config(format!(
                "reference temperature {} K must be below the melting point {} K",
                self.reference_temperature_k, self.melting_point_k
            )));
        }
        if !(0.0..1.0).contains(&self.max_water_fraction) {
            return Err(EnergyError::Config(format!(
                "max_water_fraction must be in [0, 1), got {}",
                self.max_water_fraction
            )));
        }
        if self.min_ice_thickness_m < 0.0 {
            return Err(EnergyError::Config("min_ice_thickness_m must be non-negative".to_string()));
        }
        self.grid.validate()
    }
}
