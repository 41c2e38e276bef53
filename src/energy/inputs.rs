use crate::error::{EnergyError, EnergyResult};
use crate::field::{CellTypeField, Field2, Field3, GridField};
use crate::grid::Grid;

/// Boundary and source fields for one energy step.
///
/// The bundle only borrows; it is filled in by the caller before every
/// `EnergyModel::update` and cannot outlive the fields it points to.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnergyModelInputs<'a> {
    pub cell_type: Option<&'a CellTypeField>,
    /// W m-2
    pub basal_frictional_heating: Option<&'a Field2>,
    /// Geothermal flux into the ice base, W m-2
    pub basal_heat_flux: Option<&'a Field2>,
    /// m
    pub ice_thickness: Option<&'a Field2>,
    pub surface_liquid_fraction: Option<&'a Field2>,
    /// K
    pub shelf_base_temp: Option<&'a Field2>,
    /// K
    pub surface_temp: Option<&'a Field2>,
    /// m
    pub till_water_thickness: Option<&'a Field2>,
    /// Volumetric strain heating, W m-3
    pub strain_heating3: Option<&'a Field3>,
    /// Ice velocity components, m s-1
    pub u3: Option<&'a Field3>,
    pub v3: Option<&'a Field3>,
    pub w3: Option<&'a Field3>,
}

/// A bundle that passed `check`: every field present and on the model grid
#[derive(Debug, Clone, Copy)]
pub(crate) struct Forcing<'a> {
    pub cell_type: &'a CellTypeField,
    pub basal_frictional_heating: &'a Field2,
    pub basal_heat_flux: &'a Field2,
    pub ice_thickness: &'a Field2,
    pub surface_liquid_fraction: &'a Field2,
    pub shelf_base_temp: &'a Field2,
    pub surface_temp: &'a Field2,
    pub till_water_thickness: &'a Field2,
    pub strain_heating3: &'a Field3,
    pub u3: &'a Field3,
    pub v3: &'a Field3,
    pub w3: &'a Field3,
}

fn require<'a, T: GridField>(field: Option<&'a T>, name: &str, grid: &Grid) -> EnergyResult<&'a T> {
    let field = field.ok_or_else(|| EnergyError::validation(format!("energy model input '{}' is not set", name)))?;
    field.check_grid(grid)?;
    Ok(field)
}

impl<'a> EnergyModelInputs<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every field is set and lives on `grid`, and the ice fits in the grid
    pub fn check(&self, grid: &Grid) -> EnergyResult<()> {
        self.resolve(grid).map(|_| ())
    }

    pub(crate) fn resolve(&self, grid: &Grid) -> EnergyResult<Forcing<'a>> {
        let forcing = Forcing {
            cell_type: require(self.cell_type, "cell_type", grid)?,
            basal_frictional_heating: require(self.basal_frictional_heating, "basal_frictional_heating", grid)?,
            basal_heat_flux: require(self.basal_heat_flux, "basal_heat_flux", grid)?,
            ice_thickness: require(self.ice_thickness, "ice_thickness", grid)?,
            surface_liquid_fraction: require(self.surface_liquid_fraction, "surface_liquid_fraction", grid)?,
            shelf_base_temp: require(self.shelf_base_temp, "shelf_base_temp", grid)?,
            surface_temp: require(self.surface_temp, "surface_temp", grid)?,
            till_water_thickness: require(self.till_water_thickness, "till_water_thickness", grid)?,
            strain_heating3: require(self.strain_heating3, "strain_heating3", grid)?,
            u3: require(self.u3, "u3", grid)?,
            v3: require(self.v3, "v3", grid)?,
            w3: require(self.w3, "w3", grid)?,
        };
        check_thickness(forcing.ice_thickness, grid)?;
        Ok(forcing)
    }
}

/// Ice thickness must be finite, non-negative and no taller than the grid
pub(crate) fn check_thickness(ice_thickness: &Field2, grid: &Grid) -> EnergyResult<()> {
    let (min, max) = (ice_thickness.min(), ice_thickness.max());
    if !min.is_finite() || !max.is_finite() || min < 0.0 {
        return Err(EnergyError::validation(format!(
            "ice thickness '{}' must be finite and non-negative (range [{}, {}])",
            ice_thickness.name(),
            min,
            max
        )));
    }
    grid.k_below_height(max).map(|_| ())
}
