//! Enthalpy-based energy balance: cold and temperate ice in one variable.

use super::column::{self, BasalBoundary, ColumnSystem};
use super::inputs::Forcing;
use super::stats::EnergyModelStats;
use super::{EnergyModelImpl, ModelCore, ModelUpdate, ModelVariant};
use crate::enthalpy_converter::IcePhase;
use crate::error::{EnergyError, EnergyResult};

#[derive(Debug, Clone, Default)]
pub struct EnthalpyModel;

/// Grounded basal melt rate (m/s) and counters of one column
struct ColumnResult {
    melt: f64,
    stats: EnergyModelStats,
}

impl EnthalpyModel {
    pub fn new() -> Self {
        Self
    }

    fn update_column(
        &self,
        core: &ModelCore,
        forcing: &Forcing<'_>,
        dt: f64,
        (i, j): (usize, usize),
        new_column: &mut [f64],
    ) -> EnergyResult<ColumnResult> {
        let grid = &core.grid;
        let config = &core.config;
        let ec = &core.converter;
        let mut stats = EnergyModelStats::default();

        let thickness = forcing.ice_thickness.get(i, j);
        let cell = forcing.cell_type.get(i, j);
        let e_surface = ec.enthalpy_permissive(
            forcing.surface_temp.get(i, j),
            forcing.surface_liquid_fraction.get(i, j),
            ec.pressure(0.0),
        );

        let ks = if cell.ice_free() || thickness < config.min_ice_thickness_m {
            0
        } else {
            grid.k_below_height(thickness)?
        };
        if ks == 0 {
            new_column.fill(e_surface);
            return Ok(ColumnResult { melt: 0.0, stats });
        }

        let z = &grid.z()[..=ks];
        let n = z.len();
        let pressure = ec.pressures(thickness, z);
        let old = core.ice_enthalpy.column(i, j);
        let strain_heating = forcing.strain_heating3.column(i, j);
        let rho = config.ice_density_kgm3;
        let kappa = config.ice_diffusivity_m2_s();
        let latent = ec.latent_heat();

        // explicit part: horizontal advection and strain heating
        let mut explicit = vec![0.0; n];
        let mut w = vec![0.0; n];
        let mut reduced_accuracy = false;
        for k in 0..n {
            let velocity = column::velocity(forcing.u3, forcing.v3, forcing.w3, i, j, k);
            w[k] = velocity.z;
            reduced_accuracy |= column::horizontal_cfl(velocity, dt, grid.dx(), grid.dy()) > 1.0;

            let mut change = -dt * column::horizontal_advection(&core.ice_enthalpy, i, j, k, velocity, grid.dx(), grid.dy());
            if change < -config.cold_bulge_max_j_per_kg {
                change = -config.cold_bulge_max_j_per_kg;
                stats.bulge_counter += 1;
            }
            explicit[k] = old[k] + change + dt * strain_heating[k] / rho;
        }
        if reduced_accuracy {
            stats.reduced_accuracy_counter += 1;
        }

        let diffusivity: Vec<f64> = old[..n]
            .iter()
            .zip(&pressure)
            .map(|(&e, &p)| {
                if ec.is_temperate(e, p) {
                    kappa * config.temperate_conductivity_ratio
                } else {
                    kappa
                }
            })
            .collect();

        let floating = cell.floating_ice();
        let e_cts_base = ec.enthalpy_cts(pressure[0]);
        let heat_flux = forcing.basal_heat_flux.get(i, j) + forcing.basal_frictional_heating.get(i, j);
        let till_water = forcing.till_water_thickness.get(i, j);
        let temperate_base = !floating && (old[0] >= e_cts_base || till_water > 0.0);

        let basal = if floating {
            BasalBoundary::Value(ec.enthalpy_permissive(forcing.shelf_base_temp.get(i, j), 0.0, pressure[0]))
        } else if temperate_base {
            BasalBoundary::Value(e_cts_base)
        } else {
            BasalBoundary::Flux(heat_flux / rho)
        };

        let mut x = ColumnSystem::assemble(z, dt, &explicit, &diffusivity, &w, e_surface, basal)
            .solve()
            .ok_or(EnergyError::SolverFailure { i, j })?;

        let mut melt = 0.0;
        if !floating {
            if temperate_base {
                // heat arriving at the base minus what the ice conducts away
                let dz = z[1] - z[0];
                let conducted = rho * 0.5 * (diffusivity[0] + diffusivity[1]) * (x[0] - x[1]) / dz;
                melt = (heat_flux - conducted) / (rho * latent);
                if till_water <= 0.0 {
                    melt = melt.max(0.0);
                }
            } else if x[0] > e_cts_base {
                melt = (x[0] - e_cts_base) * column::layer_thickness(z, 0) / (latent * dt);
                x[0] = e_cts_base;
            }
        }

        let cell_area = grid.cell_area();
        for k in 0..n {
            let p = pressure[k];
            let layer = column::layer_thickness(z, k);
            let e_liquid = ec.enthalpy_liquid(p);
            if x[k] >= e_liquid {
                stats.liquified_ice_volume += layer * cell_area;
                x[k] = e_liquid;
            }
            let omega = ec.water_fraction(x[k], p);
            if omega > config.max_water_fraction && k < n - 1 {
                let drained = omega - config.max_water_fraction;
                x[k] -= drained * latent;
                if !floating {
                    melt += drained * layer / dt;
                }
            }
            if ec.phase(x[k], p) == IcePhase::Cold {
                if let Ok(t) = ec.temperature(x[k], p) {
                    if t < config.low_temperature_k {
                        stats.low_temperature_counter += 1;
                    }
                }
            }
        }

        new_column[..n].copy_from_slice(&x);
        new_column[n..].fill(e_surface);
        Ok(ColumnResult {
            melt: if floating { 0.0 } else { melt },
            stats,
        })
    }
}

impl EnergyModelImpl for EnthalpyModel {
    fn variant(&self) -> ModelVariant {
        ModelVariant::Enthalpy
    }

    fn stdout_prefix(&self) -> &'static str {
        "E"
    }

    fn step(&self, core: &ModelCore, dt: f64, forcing: &Forcing<'_>) -> EnergyResult<ModelUpdate> {
        let mut enthalpy = core.ice_enthalpy.clone();
        let mut basal_melt_rate = core.basal_melt_rate.clone();
        let mut stats = EnergyModelStats::default();

        for (i, j) in core.grid.points() {
            let result = self.update_column(core, forcing, dt, (i, j), enthalpy.column_mut(i, j))?;
            basal_melt_rate.set_at(i, j, result.melt);
            stats += result.stats;
        }

        Ok(ModelUpdate {
            enthalpy,
            basal_melt_rate,
            temperature: None,
            stats,
        })
    }
}
