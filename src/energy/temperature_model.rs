//! Temperature-based ("cold ice") energy balance.
//!
//! Temperature is the prognostic variable and is capped at the pressure
//! melting point; energy beyond the cap goes to basal melt. Enthalpy is
//! kept in step as `c_i (T - T0)`, so there is never any liquid water.

use super::column::{self, BasalBoundary, ColumnSystem};
use super::inputs::Forcing;
use super::stats::EnergyModelStats;
use super::{EnergyModelImpl, ModelCore, ModelUpdate, ModelVariant};
use crate::error::{EnergyError, EnergyResult};
use crate::field::Field3;
use crate::grid::Grid;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct TemperatureModel {
    temperature: Field3,
}

impl TemperatureModel {
    pub fn new(grid: &Arc<Grid>) -> Self {
        Self {
            temperature: super::temperature_field(grid),
        }
    }

    /// Returns the grounded melt rate and the column counters
    fn update_column(
        &self,
        core: &ModelCore,
        forcing: &Forcing<'_>,
        dt: f64,
        (i, j): (usize, usize),
        new_column: &mut [f64],
    ) -> EnergyResult<(f64, EnergyModelStats)> {
        let grid = &core.grid;
        let config = &core.config;
        let ec = &core.converter;
        let mut stats = EnergyModelStats::default();

        let thickness = forcing.ice_thickness.get(i, j);
        let cell = forcing.cell_type.get(i, j);
        let t_surface = forcing.surface_temp.get(i, j).min(ec.melting_temperature(ec.pressure(0.0)));

        let ks = if cell.ice_free() || thickness < config.min_ice_thickness_m {
            0
        } else {
            grid.k_below_height(thickness)?
        };
        if ks == 0 {
            new_column.fill(t_surface);
            return Ok((0.0, stats));
        }

        let z = &grid.z()[..=ks];
        let n = z.len();
        let pressure = ec.pressures(thickness, z);
        let melting: Vec<f64> = pressure.iter().map(|&p| ec.melting_temperature(p)).collect();
        let old = self.temperature.column(i, j);
        let strain_heating = forcing.strain_heating3.column(i, j);
        let heat_capacity = config.ice_density_kgm3 * ec.specific_heat();
        let bulge_max = config.cold_bulge_max_k();

        let mut explicit = vec![0.0; n];
        let mut w = vec![0.0; n];
        let mut reduced_accuracy = false;
        for k in 0..n {
            let velocity = column::velocity(forcing.u3, forcing.v3, forcing.w3, i, j, k);
            w[k] = velocity.z;
            reduced_accuracy |= column::horizontal_cfl(velocity, dt, grid.dx(), grid.dy()) > 1.0;

            let mut change = -dt * column::horizontal_advection(&self.temperature, i, j, k, velocity, grid.dx(), grid.dy());
            if change < -bulge_max {
                change = -bulge_max;
                stats.bulge_counter += 1;
            }
            explicit[k] = old[k] + change + dt * strain_heating[k] / heat_capacity;
        }
        if reduced_accuracy {
            stats.reduced_accuracy_counter += 1;
        }

        let kappa = config.ice_diffusivity_m2_s();
        let diffusivity = vec![kappa; n];

        let floating = cell.floating_ice();
        let heat_flux = forcing.basal_heat_flux.get(i, j) + forcing.basal_frictional_heating.get(i, j);
        let till_water = forcing.till_water_thickness.get(i, j);
        let at_melting_base = !floating && (old[0] >= melting[0] - 1e-9 || till_water > 0.0);

        let basal = if floating {
            BasalBoundary::Value(forcing.shelf_base_temp.get(i, j).min(melting[0]))
        } else if at_melting_base {
            BasalBoundary::Value(melting[0])
        } else {
            BasalBoundary::Flux(heat_flux / heat_capacity)
        };

        let mut x = ColumnSystem::assemble(z, dt, &explicit, &diffusivity, &w, t_surface, basal)
            .solve()
            .ok_or(EnergyError::SolverFailure { i, j })?;

        let rho_latent = config.ice_density_kgm3 * ec.latent_heat();
        let mut melt = 0.0;
        if !floating && at_melting_base {
            let dz = z[1] - z[0];
            let conducted = config.ice_thermal_conductivity_w_m_k * (x[0] - x[1]) / dz;
            melt = (heat_flux - conducted) / rho_latent;
            if till_water <= 0.0 {
                melt = melt.max(0.0);
            }
        }

        // anything above pressure melting is melted in place
        for k in 0..n {
            if x[k] > melting[k] {
                if !floating {
                    melt += (x[k] - melting[k]) * heat_capacity * column::layer_thickness(z, k) / (rho_latent * dt);
                }
                x[k] = melting[k];
            }
            if x[k] < config.low_temperature_k {
                stats.low_temperature_counter += 1;
            }
        }

        new_column[..n].copy_from_slice(&x);
        new_column[n..].fill(t_surface);
        Ok((if floating { 0.0 } else { melt }, stats))
    }
}

impl EnergyModelImpl for TemperatureModel {
    fn variant(&self) -> ModelVariant {
        ModelVariant::Temperature
    }

    fn stdout_prefix(&self) -> &'static str {
        "T"
    }

    fn temperature(&self) -> Option<&Field3> {
        Some(&self.temperature)
    }

    fn replace_temperature(&mut self, temperature: Field3) {
        self.temperature = temperature;
    }

    fn step(&self, core: &ModelCore, dt: f64, forcing: &Forcing<'_>) -> EnergyResult<ModelUpdate> {
        let mut temperature = self.temperature.clone();
        let mut basal_melt_rate = core.basal_melt_rate.clone();
        let mut stats = EnergyModelStats::default();

        for (i, j) in core.grid.points() {
            let (melt, column_stats) = self.update_column(core, forcing, dt, (i, j), temperature.column_mut(i, j))?;
            basal_melt_rate.set_at(i, j, melt);
            stats += column_stats;
        }

        let enthalpy = super::bootstrap::enthalpy_from_temperature(&core.grid, &core.converter, &temperature);
        Ok(ModelUpdate {
            enthalpy,
            basal_melt_rate,
            temperature: Some(temperature),
            stats,
        })
    }
}
