//! Polymorphic ice energy model.
//!
//! An `EnergyModel` owns the 3D enthalpy field and the grounded basal melt
//! rate. It starts `Uninitialized` and becomes usable after `initialize`,
//! `restart` or `bootstrap`. Every `update` borrows a fresh
//! `EnergyModelInputs` bundle, solves into work fields and only then swaps
//! them in, so a failed step leaves the model exactly as it was.

mod bootstrap;
mod column;
mod dummy_model;
mod enthalpy_model;
mod inputs;
mod stats;
mod temperature_model;

use dummy_model::DummyEnergyModel;
use enthalpy_model::EnthalpyModel;
pub use inputs::EnergyModelInputs;
pub use stats::EnergyModelStats;
use temperature_model::TemperatureModel;

use crate::config::EnergyConfig;
use crate::constants::{BASAL_MELT_RATE_VARIABLE, ENTHALPY_VARIABLE, TEMPERATURE_VARIABLE};
use crate::enthalpy_converter::EnthalpyConverter;
use crate::error::{EnergyError, EnergyResult};
use crate::field::{Field2, Field3, Ghosts, GridField};
use crate::grid::Grid;
use crate::persistence::{FieldRecord, StateStore};
use bootstrap::ColdStart;
use inputs::Forcing;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::Arc;

/// Lifecycle of a model instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lifecycle {
    Uninitialized,
    Initialized,
    Stepped,
}

impl Lifecycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifecycle::Uninitialized => "uninitialized",
            Lifecycle::Initialized => "initialized",
            Lifecycle::Stepped => "stepped",
        }
    }

    pub fn is_ready(&self) -> bool {
        !matches!(self, Lifecycle::Uninitialized)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelVariant {
    Enthalpy,
    Temperature,
    Dummy,
}

impl ModelVariant {
    pub const ALL: [ModelVariant; 3] = [ModelVariant::Enthalpy, ModelVariant::Temperature, ModelVariant::Dummy];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelVariant::Enthalpy => "enthalpy",
            ModelVariant::Temperature => "temperature",
            ModelVariant::Dummy => "dummy",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "enthalpy" => Some(ModelVariant::Enthalpy),
            "temperature" | "cold" => Some(ModelVariant::Temperature),
            "dummy" | "none" => Some(ModelVariant::Dummy),
            _ => None,
        }
    }
}

/// Grid, parameters and the two fields every variant owns
#[derive(Debug, Clone)]
pub(crate) struct ModelCore {
    pub grid: Arc<Grid>,
    pub config: EnergyConfig,
    pub converter: EnthalpyConverter,
    pub ice_enthalpy: Field3,
    pub basal_melt_rate: Field2,
}

/// Complete new state produced by a step or an initialization path
#[derive(Debug)]
pub(crate) struct ModelUpdate {
    pub enthalpy: Field3,
    pub basal_melt_rate: Field2,
    pub temperature: Option<Field3>,
    pub stats: EnergyModelStats,
}

/// Per-variant step physics
pub(crate) trait EnergyModelImpl {
    fn variant(&self) -> ModelVariant;

    /// Leading character of the per-step status flags; empty when the
    /// variant reports nothing
    fn stdout_prefix(&self) -> &'static str;

    /// Prognostic temperature kept next to the enthalpy
    fn temperature(&self) -> Option<&Field3> {
        None
    }

    fn replace_temperature(&mut self, _temperature: Field3) {}

    fn keeps_temperature(&self) -> bool {
        self.temperature().is_some()
    }

    /// Solve one step of `dt` seconds without touching `core`
    fn step(&self, core: &ModelCore, dt: f64, forcing: &Forcing<'_>) -> EnergyResult<ModelUpdate>;
}

/// Closed set of energy model implementations
#[derive(Debug, Clone)]
pub(crate) enum EnergyModelKind {
    Enthalpy(EnthalpyModel),
    Temperature(TemperatureModel),
    Dummy(DummyEnergyModel),
}

impl EnergyModelKind {
    fn as_impl(&self) -> &dyn EnergyModelImpl {
        match self {
            EnergyModelKind::Enthalpy(model) => model,
            EnergyModelKind::Temperature(model) => model,
            EnergyModelKind::Dummy(model) => model,
        }
    }

    fn as_impl_mut(&mut self) -> &mut dyn EnergyModelImpl {
        match self {
            EnergyModelKind::Enthalpy(model) => model,
            EnergyModelKind::Temperature(model) => model,
            EnergyModelKind::Dummy(model) => model,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnergyModel {
    core: ModelCore,
    kind: EnergyModelKind,
    lifecycle: Lifecycle,
    stats: EnergyModelStats,
    stdout_flags: String,
}

pub(crate) fn enthalpy_field(grid: &Arc<Grid>) -> Field3 {
    Field3::new(grid, ENTHALPY_VARIABLE, Ghosts::WithGhosts { width: 1 })
        .with_attrs("ice enthalpy (includes sensible heat, latent heat, pressure)", "J kg-1")
}

pub(crate) fn temperature_field(grid: &Arc<Grid>) -> Field3 {
    Field3::new(grid, TEMPERATURE_VARIABLE, Ghosts::WithGhosts { width: 1 }).with_attrs("ice temperature", "K")
}

pub(crate) fn basal_melt_rate_field(grid: &Arc<Grid>) -> Field2 {
    Field2::new(grid, BASAL_MELT_RATE_VARIABLE, Ghosts::WithoutGhosts)
        .with_attrs("ice basal melt rate from energy conservation, in ice thickness per time", "m s-1")
}

fn read_field3(store: &dyn StateStore, template: Field3, time_index: usize) -> EnergyResult<Field3> {
    let mut field = template;
    let values = store.read_field(field.name(), time_index)?;
    field.set_values(&values)?;
    Ok(field)
}

fn read_field2(store: &dyn StateStore, template: Field2, time_index: usize) -> EnergyResult<Field2> {
    let mut field = template;
    let values = store.read_field(field.name(), time_index)?;
    field.set_values(&values)?;
    Ok(field)
}

impl EnergyModel {
    pub fn new(variant: ModelVariant, grid: &Arc<Grid>, config: &EnergyConfig) -> EnergyResult<Self> {
        config.validate()?;
        let kind = match variant {
            ModelVariant::Enthalpy => EnergyModelKind::Enthalpy(EnthalpyModel::new()),
            ModelVariant::Temperature => EnergyModelKind::Temperature(TemperatureModel::new(grid)),
            ModelVariant::Dummy => EnergyModelKind::Dummy(DummyEnergyModel::new()),
        };
        debug!("created {} energy model on a {}x{}x{} grid", variant.as_str(), grid.mx(), grid.my(), grid.mz());
        Ok(Self {
            core: ModelCore {
                grid: Arc::clone(grid),
                config: config.clone(),
                converter: EnthalpyConverter::new(config),
                ice_enthalpy: enthalpy_field(grid),
                basal_melt_rate: basal_melt_rate_field(grid),
            },
            kind,
            lifecycle: Lifecycle::Uninitialized,
            stats: EnergyModelStats::default(),
            stdout_flags: String::new(),
        })
    }

    pub fn enthalpy(grid: &Arc<Grid>, config: &EnergyConfig) -> EnergyResult<Self> {
        Self::new(ModelVariant::Enthalpy, grid, config)
    }

    pub fn temperature(grid: &Arc<Grid>, config: &EnergyConfig) -> EnergyResult<Self> {
        Self::new(ModelVariant::Temperature, grid, config)
    }

    pub fn dummy(grid: &Arc<Grid>, config: &EnergyConfig) -> EnergyResult<Self> {
        Self::new(ModelVariant::Dummy, grid, config)
    }

    pub fn variant(&self) -> ModelVariant {
        self.kind.as_impl().variant()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn grid(&self) -> &Arc<Grid> {
        &self.core.grid
    }

    pub fn config(&self) -> &EnergyConfig {
        &self.core.config
    }

    pub fn converter(&self) -> &EnthalpyConverter {
        &self.core.converter
    }

    fn require_ready(&self, operation: &'static str) -> EnergyResult<()> {
        if self.lifecycle.is_ready() {
            Ok(())
        } else {
            Err(EnergyError::Precondition {
                operation,
                state: self.lifecycle.as_str(),
            })
        }
    }

    fn commit(&mut self, update: ModelUpdate, lifecycle: Lifecycle) {
        self.core.ice_enthalpy = update.enthalpy;
        self.core.basal_melt_rate = update.basal_melt_rate;
        if let Some(temperature) = update.temperature {
            self.kind.as_impl_mut().replace_temperature(temperature);
        }
        self.stdout_flags = match (lifecycle, self.kind.as_impl().stdout_prefix()) {
            (Lifecycle::Stepped, prefix) if !prefix.is_empty() => {
                let mut flags = prefix.to_string();
                if update.stats.reduced_accuracy_counter > 0 {
                    flags.push('x');
                }
                if update.stats.bulge_counter > 0 {
                    flags.push('b');
                }
                flags
            }
            _ => String::new(),
        };
        self.stats = update.stats;
        self.lifecycle = lifecycle;
    }

    /// Enthalpy, and for the temperature variant the temperature, from a
    /// heuristic column profile
    fn cold_start(&self, cold: &ColdStart<'_>) -> EnergyResult<(Field3, Option<Field3>)> {
        let core = &self.core;
        let temperature = bootstrap::heuristic_temperature(&core.grid, &core.config, &core.converter, cold)?;
        let enthalpy = bootstrap::enthalpy_from_temperature(&core.grid, &core.converter, &temperature);
        Ok((enthalpy, self.kind.as_impl().keeps_temperature().then_some(temperature)))
    }

    /// Cold start from 2D fields. The energy state is guessed from the
    /// surface temperature, accumulation and geothermal flux; the basal melt
    /// rate is copied.
    pub fn initialize(
        &mut self,
        basal_melt_rate: &Field2,
        ice_thickness: &Field2,
        surface_temp: &Field2,
        climatic_mass_balance: &Field2,
        basal_heat_flux: &Field2,
    ) -> EnergyResult<()> {
        info!("* Initializing the {} energy model from heuristics", self.variant().as_str());
        let cold = ColdStart {
            ice_thickness,
            surface_temp,
            climatic_mass_balance,
            basal_heat_flux,
        };
        cold.check(&self.core.grid)?;
        basal_melt_rate.check_grid(&self.core.grid)?;

        let (enthalpy, temperature) = self.cold_start(&cold)?;
        let mut melt = basal_melt_rate_field(&self.core.grid);
        melt.set_values(basal_melt_rate.values())?;

        self.commit(
            ModelUpdate {
                enthalpy,
                basal_melt_rate: melt,
                temperature,
                stats: EnergyModelStats::default(),
            },
            Lifecycle::Initialized,
        );
        Ok(())
    }

    /// Exact restart from record `time_index` of `store`. All variables the
    /// variant needs must be present; nothing changes if one is missing.
    pub fn restart(&mut self, store: &dyn StateStore, time_index: usize) -> EnergyResult<()> {
        info!(
            "* Restarting the {} energy model from {} (record {})",
            self.variant().as_str(),
            store.location(),
            time_index
        );
        let grid = &self.core.grid;
        let melt = read_field2(store, basal_melt_rate_field(grid), time_index)?;
        let (enthalpy, temperature) = if self.kind.as_impl().keeps_temperature() {
            let temperature = read_field3(store, temperature_field(grid), time_index)?;
            let enthalpy = bootstrap::enthalpy_from_temperature(grid, &self.core.converter, &temperature);
            (enthalpy, Some(temperature))
        } else {
            (read_field3(store, enthalpy_field(grid), time_index)?, None)
        };

        self.commit(
            ModelUpdate {
                enthalpy,
                basal_melt_rate: melt,
                temperature,
                stats: EnergyModelStats::default(),
            },
            Lifecycle::Initialized,
        );
        Ok(())
    }

    /// Start from the last record of `store`, filling whatever it lacks with
    /// the cold-start heuristics
    pub fn bootstrap(
        &mut self,
        store: &dyn StateStore,
        ice_thickness: &Field2,
        surface_temp: &Field2,
        climatic_mass_balance: &Field2,
        basal_heat_flux: &Field2,
    ) -> EnergyResult<()> {
        let record = match store.time_length() {
            0 => {
                return Err(EnergyError::storage(
                    store.location(),
                    "no time records to bootstrap from",
                ));
            }
            n => n - 1,
        };
        info!(
            "* Bootstrapping the {} energy model from {} (record {})",
            self.variant().as_str(),
            store.location(),
            record
        );
        let cold = ColdStart {
            ice_thickness,
            surface_temp,
            climatic_mass_balance,
            basal_heat_flux,
        };
        cold.check(&self.core.grid)?;

        let grid = &self.core.grid;
        let melt = if store.has_record(BASAL_MELT_RATE_VARIABLE, record) {
            read_field2(store, basal_melt_rate_field(grid), record)?
        } else {
            warn!(
                "{} not found in {}; using {} m/s",
                BASAL_MELT_RATE_VARIABLE,
                store.location(),
                self.core.config.bootstrap_basal_melt_rate
            );
            let mut melt = basal_melt_rate_field(grid);
            melt.set(self.core.config.bootstrap_basal_melt_rate);
            melt
        };

        let keeps_temperature = self.kind.as_impl().keeps_temperature();
        let stored = if keeps_temperature { TEMPERATURE_VARIABLE } else { ENTHALPY_VARIABLE };
        let (enthalpy, temperature) = if store.has_record(stored, record) {
            if keeps_temperature {
                let temperature = read_field3(store, temperature_field(grid), record)?;
                let enthalpy = bootstrap::enthalpy_from_temperature(grid, &self.core.converter, &temperature);
                (enthalpy, Some(temperature))
            } else {
                (read_field3(store, enthalpy_field(grid), record)?, None)
            }
        } else {
            warn!("{} not found in {}; using a heuristic column profile", stored, store.location());
            self.cold_start(&cold)?
        };

        self.commit(
            ModelUpdate {
                enthalpy,
                basal_melt_rate: melt,
                temperature,
                stats: EnergyModelStats::default(),
            },
            Lifecycle::Initialized,
        );
        Ok(())
    }

    /// Advance the state from `t` to `t + dt` (seconds). On error the model
    /// is left unchanged.
    pub fn update(&mut self, t: f64, dt: f64, inputs: &EnergyModelInputs<'_>) -> EnergyResult<()> {
        self.require_ready("update")?;
        if !t.is_finite() || !(dt > 0.0) || !dt.is_finite() {
            return Err(EnergyError::validation(format!(
                "energy step needs a finite time and a positive time step (t = {}, dt = {})",
                t, dt
            )));
        }
        let forcing = inputs.resolve(&self.core.grid)?;
        let update = self.kind.as_impl().step(&self.core, dt, &forcing)?;

        if update.stats.low_temperature_counter > 0 {
            warn!(
                "{} points colder than {} K after the energy step at t = {} s",
                update.stats.low_temperature_counter, self.core.config.low_temperature_k, t
            );
        }
        debug!("{} energy step t = {} s, dt = {} s: {}", self.variant().as_str(), t, dt, update.stats);
        self.commit(update, Lifecycle::Stepped);
        Ok(())
    }

    /// Step reusing the inputs of a previous call; never implemented
    pub fn update_reusing_inputs(&mut self, _t: f64, _dt: f64) -> EnergyResult<()> {
        Err(EnergyError::Unsupported {
            operation: "update_reusing_inputs",
        })
    }

    /// Time step restriction of the energy solve; never implemented
    pub fn max_timestep(&self, _t: f64) -> EnergyResult<f64> {
        Err(EnergyError::Unsupported {
            operation: "max_timestep",
        })
    }

    /// Append the state needed for an exact restart to the last record of `store`
    pub fn write_model_state(&self, store: &mut dyn StateStore) -> EnergyResult<()> {
        self.require_ready("write_model_state")?;
        let enthalpy = &self.core.ice_enthalpy;
        let melt = &self.core.basal_melt_rate;
        let layered_shape = enthalpy.shape();
        let planar_shape = melt.shape();
        let mut fields = vec![
            FieldRecord::new(enthalpy.metadata(), &layered_shape, enthalpy.values()),
            FieldRecord::new(melt.metadata(), &planar_shape, melt.values()),
        ];
        if let Some(temperature) = self.kind.as_impl().temperature() {
            fields.push(FieldRecord::new(temperature.metadata(), &layered_shape, temperature.values()));
        }
        store.write_fields(&fields)?;
        debug!("wrote {} energy model state to {}", self.variant().as_str(), store.location());
        Ok(())
    }

    pub fn get_enthalpy(&self) -> EnergyResult<&Field3> {
        self.require_ready("get_enthalpy")?;
        Ok(&self.core.ice_enthalpy)
    }

    pub fn get_basal_melt_rate(&self) -> EnergyResult<&Field2> {
        self.require_ready("get_basal_melt_rate")?;
        Ok(&self.core.basal_melt_rate)
    }

    /// Ice temperature. The temperature variant returns its own field.
    /// Otherwise it is derived from enthalpy, which works only where the ice
    /// is cold at every thickness the grid allows.
    pub fn get_temperature(&self) -> EnergyResult<Cow<'_, Field3>> {
        self.require_ready("get_temperature")?;
        match self.kind.as_impl().temperature() {
            Some(temperature) => Ok(Cow::Borrowed(temperature)),
            None => temperature_from_enthalpy(&self.core).map(Cow::Owned),
        }
    }

    /// Counters of the last step; zero right after initialization
    pub fn stats(&self) -> EnergyResult<&EnergyModelStats> {
        self.require_ready("stats")?;
        Ok(&self.stats)
    }

    /// Status flags of the last step, e.g. "E" or "Txb"
    pub fn stdout_flags(&self) -> EnergyResult<&str> {
        self.require_ready("stdout_flags")?;
        Ok(&self.stdout_flags)
    }
}

/// Temperature where the enthalpy alone decides it. A point at level `z` is
/// cold for any ice thickness when its enthalpy is below `E_cts` at the
/// deepest burial the grid allows, `Lz - z`.
fn temperature_from_enthalpy(core: &ModelCore) -> EnergyResult<Field3> {
    let grid = &core.grid;
    let converter = &core.converter;
    let z = grid.z();
    let mut temperature = temperature_field(grid);
    let mut undetermined = 0usize;
    let mut first = None;

    for (i, j) in grid.points() {
        let enthalpy = core.ice_enthalpy.column(i, j);
        for (k, value) in temperature.column_mut(i, j).iter_mut().enumerate() {
            let deepest = converter.pressure(grid.lz() - z[k]);
            if enthalpy[k] < converter.enthalpy_cts(deepest) {
                *value = converter.temperature(enthalpy[k], deepest)?;
            } else {
                undetermined += 1;
                first.get_or_insert((i, j, k));
            }
        }
    }

    match first {
        None => Ok(temperature),
        Some((i, j, k)) => Err(EnergyError::DerivationUnsupported(format!(
            "{} points may be temperate, first at ({}, {}, {}); their temperature depends on the ice thickness",
            undetermined, i, j, k
        ))),
    }
}
