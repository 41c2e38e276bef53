// Shared fixture: a 3x3 grid with 4 km of grounded ice, 260 K at the surface
// and 10 mW m-2 of geothermal flux, no flow.
#![allow(dead_code)]

use ice_energy_rust::config::{EnergyConfig, GridParameters};
use ice_energy_rust::energy::EnergyModelInputs;
use ice_energy_rust::field::{CellType, CellTypeField, Field2, Field3, Ghosts};
use ice_energy_rust::grid::Grid;
use ice_energy_rust::units::UnitSystem;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

pub struct Fixture {
    pub config: EnergyConfig,
    pub grid: Arc<Grid>,
    pub zero: Field2,
    pub cell_type: CellTypeField,
    pub basal_heat_flux: Field2,
    pub ice_thickness: Field2,
    pub shelf_base_temp: Field2,
    pub surface_temp: Field2,
    pub strain_heating3: Field3,
    pub u: Field3,
    pub v: Field3,
    pub w: Field3,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_grid(GridParameters::default())
    }

    pub fn with_grid(params: GridParameters) -> Self {
        let config = EnergyConfig {
            grid: params,
            ..EnergyConfig::default()
        };
        ice_energy_rust::logging::init_logging(Some("warn"));
        let grid = Grid::new(params).unwrap();
        let units = UnitSystem::new();

        let zero = Field2::new(&grid, "zero", Ghosts::WithoutGhosts);

        let mut cell_type = CellTypeField::new(&grid, "mask", Ghosts::WithoutGhosts);
        cell_type.set(CellType::Grounded);

        let mut basal_heat_flux = Field2::new(&grid, "bheatflx", Ghosts::WithoutGhosts).with_attrs("geothermal flux", "W m-2");
        basal_heat_flux.set(units.convert(10.0, "mW m-2", "W m-2").unwrap());

        let mut ice_thickness = Field2::new(&grid, "thk", Ghosts::WithGhosts { width: 2 });
        ice_thickness.set(4000.0);

        let mut shelf_base_temp = Field2::new(&grid, "shelfbtemp", Ghosts::WithoutGhosts);
        shelf_base_temp.set(260.0);

        let mut surface_temp = Field2::new(&grid, "surface_temp", Ghosts::WithoutGhosts);
        surface_temp.set(260.0);

        Self {
            config,
            zero,
            cell_type,
            basal_heat_flux,
            ice_thickness,
            shelf_base_temp,
            surface_temp,
            strain_heating3: Field3::new(&grid, "sigma", Ghosts::WithoutGhosts),
            u: Field3::new(&grid, "u", Ghosts::WithoutGhosts),
            v: Field3::new(&grid, "v", Ghosts::WithoutGhosts),
            w: Field3::new(&grid, "w", Ghosts::WithoutGhosts),
            grid,
        }
    }

    pub fn inputs(&self) -> EnergyModelInputs<'_> {
        let mut inputs = EnergyModelInputs::new();
        inputs.cell_type = Some(&self.cell_type);
        inputs.basal_frictional_heating = Some(&self.zero);
        inputs.basal_heat_flux = Some(&self.basal_heat_flux);
        inputs.ice_thickness = Some(&self.ice_thickness);
        inputs.surface_liquid_fraction = Some(&self.zero);
        inputs.shelf_base_temp = Some(&self.shelf_base_temp);
        inputs.surface_temp = Some(&self.surface_temp);
        inputs.till_water_thickness = Some(&self.zero);
        inputs.strain_heating3 = Some(&self.strain_heating3);
        inputs.u3 = Some(&self.u);
        inputs.v3 = Some(&self.v);
        inputs.w3 = Some(&self.w);
        inputs
    }
}

pub fn one_year() -> f64 {
    UnitSystem::new().convert(1.0, "years", "seconds").unwrap()
}

/// State file path inside a scratch directory the test keeps alive
pub fn scratch_file(dir: &TempDir, tag: &str) -> PathBuf {
    dir.path().join(format!("{}.json", tag))
}
