//! Energy model that keeps its state fixed: enthalpy and basal melt rate
//! stay at whatever initialization produced.

use super::inputs::Forcing;
use super::stats::EnergyModelStats;
use super::{EnergyModelImpl, ModelCore, ModelUpdate, ModelVariant};
use crate::error::EnergyResult;

#[derive(Debug, Clone, Default)]
pub struct DummyEnergyModel;

impl DummyEnergyModel {
    pub fn new() -> Self {
        Self
    }
}

impl EnergyModelImpl for DummyEnergyModel {
    fn variant(&self) -> ModelVariant {
        ModelVariant::Dummy
    }

    fn stdout_prefix(&self) -> &'static str {
        ""
    }

    fn step(&self, core: &ModelCore, _dt: f64, _forcing: &Forcing<'_>) -> EnergyResult<ModelUpdate> {
        Ok(ModelUpdate {
            enthalpy: core.ice_enthalpy.clone(),
            basal_melt_rate: core.basal_melt_rate.clone(),
            temperature: None,
            stats: EnergyModelStats::default(),
        })
    }
}
