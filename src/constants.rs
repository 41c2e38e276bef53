// Unit conversions and reference values shared across the energy model.
// Physical parameters that a run may override live in `config::EnergyConfig`.

pub const SECONDS_PER_DAY: f64 = 86_400.0;
pub const DAYS_PER_YEAR: f64 = 365.0; // "365_day" calendar
pub const SECONDS_PER_YEAR: f64 = SECONDS_PER_DAY * DAYS_PER_YEAR;
pub const TO_KELVIN: f64 = 273.15;
pub const MILLI: f64 = 1.0e-3;
pub const KM_TO_M: f64 = 1000.0;

// Default physical parameters of glacier ice and meltwater
pub const ICE_DENSITY_KGM3: f64 = 910.0;
pub const WATER_DENSITY_KGM3: f64 = 1000.0;
pub const STANDARD_GRAVITY_MS2: f64 = 9.81;
pub const ICE_SPECIFIC_HEAT_J_PER_KG_K: f64 = 2009.0;
pub const WATER_SPECIFIC_HEAT_J_PER_KG_K: f64 = 4170.0;
pub const ICE_THERMAL_CONDUCTIVITY_W_M_K: f64 = 2.10;
pub const WATER_LATENT_HEAT_FUSION_J_PER_KG: f64 = 3.34e5;
pub const CLAUSIUS_CLAPEYRON_K_PER_PA: f64 = 7.9e-8;
pub const WATER_MELTING_POINT_K: f64 = 273.15;
pub const ENTHALPY_REFERENCE_TEMP_K: f64 = 223.15;

/// Enthalpy undershoot (J/kg) tolerated from explicit horizontal advection
/// before the value is clipped and counted as a cold bulge.
pub const COLD_BULGE_MAX_J_PER_KG: f64 = 61_800.0;

/// Points colder than this are reported after each step.
pub const LOW_TEMPERATURE_K: f64 = 200.0;

/// Field names that must round-trip through a state store.
pub const ENTHALPY_VARIABLE: &str = "enthalpy";
pub const TEMPERATURE_VARIABLE: &str = "temp";
pub const BASAL_MELT_RATE_VARIABLE: &str = "basal_melt_rate_grounded";
