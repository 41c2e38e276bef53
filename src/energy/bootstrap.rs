//! Cold-start heuristics used when no complete stored state is available.

use super::inputs::check_thickness;
use crate::config::EnergyConfig;
use crate::enthalpy_converter::EnthalpyConverter;
use crate::error::EnergyResult;
use crate::field::{Field2, Field3, GridField};
use crate::grid::Grid;
use crate::math_utils::erf;
use std::f64::consts::PI;
use std::sync::Arc;

/// 2D fields a column temperature guess is built from
#[derive(Debug, Clone, Copy)]
pub(crate) struct ColdStart<'a> {
    pub ice_thickness: &'a Field2,
    /// K
    pub surface_temp: &'a Field2,
    /// kg m-2 s-1
    pub climatic_mass_balance: &'a Field2,
    /// W m-2
    pub basal_heat_flux: &'a Field2,
}

impl ColdStart<'_> {
    pub fn check(&self, grid: &Grid) -> EnergyResult<()> {
        self.ice_thickness.check_grid(grid)?;
        self.surface_temp.check_grid(grid)?;
        self.climatic_mass_balance.check_grid(grid)?;
        self.basal_heat_flux.check_grid(grid)?;
        check_thickness(self.ice_thickness, grid)
    }
}

/// Temperature guess for every column, capped at the pressure melting point.
///
/// Where ice accumulates the Robin (1955) steady profile is used,
/// `T(z) = Ts + sqrt(pi)/2 L (G/k) (erf(H/L) - erf(z/L))` with
/// `L = sqrt(2 kappa H / m)`. Elsewhere the profile is linear with the
/// geothermal gradient `G/k`. Levels above the ice get the surface value.
pub(crate) fn heuristic_temperature(
    grid: &Arc<Grid>,
    config: &EnergyConfig,
    converter: &EnthalpyConverter,
    cold: &ColdStart<'_>,
) -> EnergyResult<Field3> {
    let k_ice = config.ice_thermal_conductivity_w_m_k;
    let kappa = config.ice_diffusivity_m2_s();
    let z = grid.z();
    let surface_melting = converter.melting_temperature(converter.pressure(0.0));
    let mut temperature = super::temperature_field(grid);

    for (i, j) in grid.points() {
        let thickness = cold.ice_thickness.get(i, j);
        let t_surface = cold.surface_temp.get(i, j).min(surface_melting);
        let gradient = cold.basal_heat_flux.get(i, j) / k_ice;
        let accumulation = cold.climatic_mass_balance.get(i, j) / config.ice_density_kgm3;
        let column = temperature.column_mut(i, j);

        if thickness < config.min_ice_thickness_m {
            column.fill(t_surface);
            continue;
        }
        let ks = grid.k_below_height(thickness)?;
        let robin_length = (accumulation > 0.0).then(|| (2.0 * kappa * thickness / accumulation).sqrt());

        for (k, value) in column.iter_mut().enumerate() {
            if k > ks {
                *value = t_surface;
                continue;
            }
            let depth = thickness - z[k];
            let guess = match robin_length {
                Some(l) => t_surface + 0.5 * PI.sqrt() * l * gradient * (erf(thickness / l) - erf(z[k] / l)),
                None => t_surface + gradient * depth,
            };
            *value = guess.min(converter.melting_temperature(converter.pressure(depth)));
        }
    }
    Ok(temperature)
}

/// Enthalpy of water-free ice at the given temperatures
pub(crate) fn enthalpy_from_temperature(grid: &Arc<Grid>, converter: &EnthalpyConverter, temperature: &Field3) -> Field3 {
    let mut enthalpy = super::enthalpy_field(grid);
    for (i, j) in grid.points() {
        let source = temperature.column(i, j);
        for (e, &t) in enthalpy.column_mut(i, j).iter_mut().zip(source) {
            *e = converter.cold_enthalpy(t);
        }
    }
    enthalpy
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GridParameters, VerticalSpacing};
    use crate::field::Ghosts;
    use approx::assert_abs_diff_eq;
    use more_asserts::{assert_ge, assert_le};

    fn setup(thickness: f64, t_surface: f64, smb: f64, flux: f64) -> (Arc<Grid>, [Field2; 4]) {
        let grid = Grid::new(GridParameters {
            mx: 3,
            my: 3,
            mz: 21,
            lz: 4000.0,
            vertical_spacing: VerticalSpacing::Equal,
            ..GridParameters::default()
        })
        .unwrap();
        let mut fields = [
            Field2::new(&grid, "thk", Ghosts::WithoutGhosts),
            Field2::new(&grid, "ts", Ghosts::WithoutGhosts),
            Field2::new(&grid, "smb", Ghosts::WithoutGhosts),
            Field2::new(&grid, "ghf", Ghosts::WithoutGhosts),
        ];
        fields[0].set(thickness);
        fields[1].set(t_surface);
        fields[2].set(smb);
        fields[3].set(flux);
        (grid, fields)
    }

    fn guess(grid: &Arc<Grid>, fields: &[Field2; 4]) -> Field3 {
        let config = EnergyConfig::default();
        let converter = EnthalpyConverter::new(&config);
        let cold = ColdStart {
            ice_thickness: &fields[0],
            surface_temp: &fields[1],
            climatic_mass_balance: &fields[2],
            basal_heat_flux: &fields[3],
        };
        cold.check(grid).unwrap();
        heuristic_temperature(grid, &config, &converter, &cold).unwrap()
    }

    #[test]
    fn test_linear_profile_without_accumulation() {
        let (grid, fields) = setup(2000.0, 240.0, 0.0, 0.042);
        let temp = guess(&grid, &fields);
        let column = temp.column(1, 1);
        // base: 240 + 0.042 / 2.1 * 2000
        assert_abs_diff_eq!(column[0], 280.0f64.min(273.15 - 7.9e-8 * 910.0 * 9.81 * 2000.0), epsilon = 1e-9);
        // level 10 is the ice surface at 2000 m
        assert_abs_diff_eq!(column[10], 240.0, epsilon = 1e-9);
        assert_abs_diff_eq!(column[20], 240.0);
    }

    #[test]
    fn test_robin_profile_is_colder_at_depth() {
        // 0.3 m/yr of ice accumulation
        let smb = 0.3 * 910.0 / crate::constants::SECONDS_PER_YEAR;
        let (grid, fields) = setup(3000.0, 230.0, smb, 0.05);
        let robin = guess(&grid, &fields);
        let (_, linear_fields) = setup(3000.0, 230.0, 0.0, 0.05);
        let linear = guess(&grid, &linear_fields);

        assert_abs_diff_eq!(robin.get(0, 0, 15), 230.0, epsilon = 1e-9);
        for k in 1..15 {
            assert_le!(robin.get(0, 0, k), linear.get(0, 0, k) + 1e-4);
            assert_ge!(robin.get(0, 0, k), 230.0 - 1e-4);
        }
    }

    #[test]
    fn test_warm_surface_is_capped_and_ice_free_takes_surface() {
        let (grid, fields) = setup(0.0, 280.0, 0.0, 0.05);
        let temp = guess(&grid, &fields);
        assert_abs_diff_eq!(temp.max(), 273.15);
        assert_abs_diff_eq!(temp.min(), 273.15);
    }

    #[test]
    fn test_enthalpy_from_temperature() {
        let (grid, fields) = setup(1000.0, 250.0, 0.0, 0.0);
        let temp = guess(&grid, &fields);
        let converter = EnthalpyConverter::new(&EnergyConfig::default());
        let enthalpy = enthalpy_from_temperature(&grid, &converter, &temp);
        assert_abs_diff_eq!(enthalpy.get(2, 2, 3), 2009.0 * (250.0 - 223.15), epsilon = 1e-9);
        assert_eq!(enthalpy.name(), "enthalpy");
    }
}
