// Lifecycle and step behaviour of every energy model variant

mod common;

use approx::assert_abs_diff_eq;
use common::{Fixture, one_year};
use ice_energy_rust::assert_deviation;
use ice_energy_rust::config::{GridParameters, VerticalSpacing};
use ice_energy_rust::energy::{EnergyModel, EnergyModelInputs, Lifecycle, ModelVariant};
use ice_energy_rust::field::{CellType, Field2, Ghosts, GridField, Layering};
use ice_energy_rust::field_store::FieldStore;
use ice_energy_rust::grid::Grid;
use more_asserts::{assert_ge, assert_gt, assert_le, assert_lt};

fn initialize(model: &mut EnergyModel, fx: &Fixture) {
    model
        .initialize(&fx.zero, &fx.ice_thickness, &fx.surface_temp, &fx.zero, &fx.basal_heat_flux)
        .unwrap();
}

fn new_model(variant: ModelVariant, fx: &Fixture) -> EnergyModel {
    EnergyModel::new(variant, &fx.grid, &fx.config).unwrap()
}

/// 1 km of ice at 240 K everywhere with no heat input
fn cold_fixture() -> Fixture {
    let mut fx = Fixture::new();
    fx.ice_thickness.set(1000.0);
    fx.surface_temp.set(240.0);
    fx.basal_heat_flux.set(0.0);
    fx
}

#[test]
fn test_reference_scenario_for_all_variants() {
    let fx = Fixture::new();
    let dt = one_year();

    for variant in ModelVariant::ALL {
        println!("Testing {} energy model", variant.as_str());
        let mut model = new_model(variant, &fx);

        initialize(&mut model, &fx);
        assert_eq!(model.lifecycle(), Lifecycle::Initialized);

        model.update(0.0, dt, &fx.inputs()).unwrap();
        assert_eq!(model.lifecycle(), Lifecycle::Stepped);

        assert!(model.update_reusing_inputs(0.0, dt).unwrap_err().is_unsupported());
        assert!(model.max_timestep(0.0).unwrap_err().is_unsupported());

        let flags = model.stdout_flags().unwrap();
        let expected = match variant {
            ModelVariant::Enthalpy => "E",
            ModelVariant::Temperature => "T",
            ModelVariant::Dummy => "",
        };
        assert_eq!(flags, expected, "no flow means no reduced accuracy and no bulges");

        let stats = model.stats().unwrap();
        assert_eq!(stats.bulge_counter, 0);
        assert_eq!(stats.reduced_accuracy_counter, 0);

        let enthalpy = model.get_enthalpy().unwrap();
        assert_eq!(enthalpy.name(), "enthalpy");
        let bmr = model.get_basal_melt_rate().unwrap();
        assert_eq!(bmr.name(), "basal_melt_rate_grounded");
        assert_ge!(bmr.min(), 0.0);

        // allowed to fail, but only with the dedicated error
        if let Err(err) = model.get_temperature() {
            assert!(err.is_derivation_unsupported(), "unexpected error: {}", err);
        }
        println!("   ✅ {} model passed", variant.as_str());
    }
}

#[test]
fn test_operations_before_initialization() {
    let fx = Fixture::new();
    for variant in ModelVariant::ALL {
        let mut model = new_model(variant, &fx);
        assert_eq!(model.lifecycle(), Lifecycle::Uninitialized);

        assert!(model.update(0.0, one_year(), &fx.inputs()).unwrap_err().is_precondition());
        assert!(model.get_enthalpy().unwrap_err().is_precondition());
        assert!(model.get_basal_melt_rate().unwrap_err().is_precondition());
        assert!(model.get_temperature().unwrap_err().is_precondition());
        assert!(model.stats().unwrap_err().is_precondition());

        // never implemented, whatever the state
        assert!(model.update_reusing_inputs(0.0, one_year()).unwrap_err().is_unsupported());
        assert!(model.max_timestep(0.0).unwrap_err().is_unsupported());
        assert_eq!(model.lifecycle(), Lifecycle::Uninitialized);
    }
}

#[test]
fn test_reads_are_idempotent() {
    let fx = Fixture::new();
    for variant in ModelVariant::ALL {
        let mut model = new_model(variant, &fx);
        initialize(&mut model, &fx);
        model.update(0.0, one_year(), &fx.inputs()).unwrap();

        let first = model.get_enthalpy().unwrap().clone();
        let second = model.get_enthalpy().unwrap();
        assert_eq!(&first, second);
        let bmr = model.get_basal_melt_rate().unwrap().clone();
        assert_eq!(&bmr, model.get_basal_melt_rate().unwrap());
        let flags = model.stdout_flags().unwrap().to_string();
        assert_eq!(flags, model.stdout_flags().unwrap());
        let stats = *model.stats().unwrap();
        assert_eq!(&stats, model.stats().unwrap());
    }
}

#[test]
fn test_temperature_variant_always_has_temperature() {
    let fx = Fixture::new();
    let mut model = EnergyModel::temperature(&fx.grid, &fx.config).unwrap();
    initialize(&mut model, &fx);
    model.update(0.0, one_year(), &fx.inputs()).unwrap();

    let temperature = model.get_temperature().unwrap().into_owned();
    let again = model.get_temperature().unwrap();
    assert_eq!(&temperature, &*again);

    // surface held at 260 K, nothing above pressure melting
    assert_ge!(temperature.min(), 260.0 - 1e-6);
    assert_le!(temperature.max(), 273.15);

    let converter = model.converter();
    let enthalpy = model.get_enthalpy().unwrap();
    for (i, j) in fx.grid.points() {
        for k in 0..fx.grid.mz() {
            assert_abs_diff_eq!(
                enthalpy.get(i, j, k),
                converter.cold_enthalpy(temperature.get(i, j, k)),
                epsilon = 1e-6
            );
        }
    }
}

#[test]
fn test_temperate_base_blocks_temperature_derivation() {
    // 4 km of ice over 10 mW m-2 reaches pressure melting at the base
    let fx = Fixture::new();
    for variant in [ModelVariant::Enthalpy, ModelVariant::Dummy] {
        let mut model = new_model(variant, &fx);
        initialize(&mut model, &fx);
        model.update(0.0, one_year(), &fx.inputs()).unwrap();

        let before = model.get_enthalpy().unwrap().clone();
        let err = model.get_temperature().unwrap_err();
        assert!(err.is_derivation_unsupported());
        assert_eq!(&before, model.get_enthalpy().unwrap(), "failed derivation must not touch the state");
        assert_eq!(model.lifecycle(), Lifecycle::Stepped);
    }
}

#[test]
fn test_cold_ice_temperature_is_derived_from_enthalpy() {
    let fx = cold_fixture();
    let mut model = EnergyModel::enthalpy(&fx.grid, &fx.config).unwrap();
    initialize(&mut model, &fx);
    model.update(0.0, one_year(), &fx.inputs()).unwrap();

    let temperature = model.get_temperature().unwrap();
    assert_abs_diff_eq!(temperature.min(), 240.0, epsilon = 1e-6);
    assert_abs_diff_eq!(temperature.max(), 240.0, epsilon = 1e-6);
}

#[test]
fn test_dummy_model_keeps_state() {
    let fx = Fixture::new();
    let mut model = EnergyModel::dummy(&fx.grid, &fx.config).unwrap();
    initialize(&mut model, &fx);
    let enthalpy = model.get_enthalpy().unwrap().clone();
    let bmr = model.get_basal_melt_rate().unwrap().clone();

    for step in 0..3 {
        model.update(step as f64 * one_year(), one_year(), &fx.inputs()).unwrap();
    }
    assert_eq!(&enthalpy, model.get_enthalpy().unwrap());
    assert_eq!(&bmr, model.get_basal_melt_rate().unwrap());
    assert!(model.stats().unwrap().is_clean());
}

#[test]
fn test_invalid_inputs_leave_state_unchanged() {
    let fx = Fixture::new();
    let other_grid = Grid::new(GridParameters {
        mx: 5,
        ..GridParameters::default()
    })
    .unwrap();
    let foreign = Field2::new(&other_grid, "bheatflx", Ghosts::WithoutGhosts);
    let mut too_thick = fx.ice_thickness.clone();
    too_thick.set(fx.grid.lz() + 500.0);

    for variant in ModelVariant::ALL {
        let mut model = new_model(variant, &fx);
        initialize(&mut model, &fx);
        let enthalpy = model.get_enthalpy().unwrap().clone();
        let bmr = model.get_basal_melt_rate().unwrap().clone();

        let mut missing = fx.inputs();
        missing.w3 = None;
        let err = model.update(0.0, one_year(), &missing).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("w3"));

        let mut mismatched = fx.inputs();
        mismatched.basal_heat_flux = Some(&foreign);
        assert!(model.update(0.0, one_year(), &mismatched).unwrap_err().is_validation());

        let mut overfull = fx.inputs();
        overfull.ice_thickness = Some(&too_thick);
        assert!(model.update(0.0, one_year(), &overfull).unwrap_err().is_validation());

        assert!(model.update(0.0, 0.0, &fx.inputs()).unwrap_err().is_validation());
        assert!(model.update(0.0, -one_year(), &fx.inputs()).unwrap_err().is_validation());

        assert_eq!(&enthalpy, model.get_enthalpy().unwrap());
        assert_eq!(&bmr, model.get_basal_melt_rate().unwrap());
        assert_eq!(model.lifecycle(), Lifecycle::Initialized);
    }
}

#[test]
fn test_initialize_rejects_ice_taller_than_grid() {
    let fx = Fixture::new();
    let mut thick = fx.ice_thickness.clone();
    thick.set(fx.grid.lz() * 2.0);
    let mut model = EnergyModel::enthalpy(&fx.grid, &fx.config).unwrap();
    let err = model
        .initialize(&fx.zero, &thick, &fx.surface_temp, &fx.zero, &fx.basal_heat_flux)
        .unwrap_err();
    assert!(err.is_validation());
    assert_eq!(model.lifecycle(), Lifecycle::Uninitialized);
}

#[test]
fn test_fast_flow_sets_reduced_accuracy_and_bulge_flags() {
    let mut fx = Fixture::new();
    // CFL is about 20 for 1 m/s over 1500 km cells and a one year step
    fx.u.set(1.0);
    let mut surface_temp = fx.surface_temp.clone();
    for j in 0..fx.grid.my() {
        surface_temp.set_at(0, j, 210.0);
    }
    fx.surface_temp = surface_temp;

    for (variant, expected) in [(ModelVariant::Enthalpy, "Exb"), (ModelVariant::Temperature, "Txb"), (ModelVariant::Dummy, "")] {
        let mut model = new_model(variant, &fx);
        initialize(&mut model, &fx);
        model.update(0.0, one_year(), &fx.inputs()).unwrap();

        assert_eq!(model.stdout_flags().unwrap(), expected, "{} flags", variant.as_str());
        if variant != ModelVariant::Dummy {
            let stats = model.stats().unwrap();
            assert_eq!(stats.reduced_accuracy_counter, fx.grid.point_count() as u64);
            assert_gt!(stats.bulge_counter, 0);
        }
    }
}

#[test]
fn test_geothermal_flux_warms_cold_base() {
    let mut fx = cold_fixture();
    let mut model = EnergyModel::enthalpy(&fx.grid, &fx.config).unwrap();
    initialize(&mut model, &fx);
    let before = model.get_enthalpy().unwrap().get(1, 1, 0);

    fx.basal_heat_flux.set(0.1);
    model.update(0.0, one_year(), &fx.inputs()).unwrap();
    let after = model.get_enthalpy().unwrap().get(1, 1, 0);

    assert_gt!(after, before);
    // still far below melting, so no melt
    assert_eq!(model.get_basal_melt_rate().unwrap().max(), 0.0);
}

#[test]
fn test_ice_free_and_floating_columns() {
    let params = GridParameters {
        mz: 21,
        vertical_spacing: VerticalSpacing::Equal,
        ..GridParameters::default()
    };
    let mut fx = Fixture::with_grid(params);
    fx.cell_type.set_at(0, 0, CellType::IceFreeBedrock);
    fx.ice_thickness.set_at(0, 0, 0.0);
    fx.cell_type.set_at(2, 2, CellType::Floating);
    fx.ice_thickness.set_at(2, 2, 500.0);
    fx.shelf_base_temp.set_at(2, 2, 265.0);

    for variant in [ModelVariant::Enthalpy, ModelVariant::Temperature] {
        let mut model = new_model(variant, &fx);
        initialize(&mut model, &fx);
        model.update(0.0, one_year(), &fx.inputs()).unwrap();

        let converter = *model.converter();
        let enthalpy = model.get_enthalpy().unwrap();
        let bmr = model.get_basal_melt_rate().unwrap();

        for &e in enthalpy.column(0, 0) {
            assert_abs_diff_eq!(e, converter.cold_enthalpy(260.0), epsilon = 1e-6);
        }
        assert_eq!(bmr.get(0, 0), 0.0);

        assert_abs_diff_eq!(enthalpy.get(2, 2, 0), converter.cold_enthalpy(265.0), epsilon = 1e-6);
        assert_eq!(bmr.get(2, 2), 0.0);
    }
}

#[test]
fn test_repeated_steps_stay_bounded() {
    let fx = Fixture::new();
    let mut model = EnergyModel::enthalpy(&fx.grid, &fx.config).unwrap();
    initialize(&mut model, &fx);
    for step in 0..10 {
        model.update(step as f64 * one_year(), one_year(), &fx.inputs()).unwrap();
    }
    let converter = model.converter();
    let enthalpy = model.get_enthalpy().unwrap();
    let z = fx.grid.z();
    for (i, j) in fx.grid.points() {
        for k in 0..fx.grid.mz() {
            let p = converter.pressure(4000.0 - z[k]);
            let omega = converter.water_fraction(enthalpy.get(i, j, k), p);
            assert_le!(omega, fx.config.max_water_fraction + 1e-12);
            assert_ge!(enthalpy.get(i, j, k), converter.cold_enthalpy(260.0) - 1e-6);
        }
    }
    assert!(model.stats().unwrap().liquified_ice_volume == 0.0);
}

#[test]
fn test_steady_geothermal_profile_is_kept() {
    // linear profile with gradient G/k is the steady state under a flux base
    let mut fx = cold_fixture();
    let flux = 0.02;
    fx.basal_heat_flux.set(flux);
    let k_ice = fx.config.ice_thermal_conductivity_w_m_k;

    for variant in [ModelVariant::Enthalpy, ModelVariant::Temperature] {
        let mut model = new_model(variant, &fx);
        initialize(&mut model, &fx);
        for step in 0..10 {
            model.update(step as f64 * one_year(), one_year(), &fx.inputs()).unwrap();
        }
        let temperature = model.get_temperature().unwrap();
        let expected = 240.0 + flux / k_ice * 1000.0;
        assert_deviation!(temperature.get(1, 1, 0), expected, 0.5, "{} base temperature", variant.as_str());
        assert_eq!(model.get_basal_melt_rate().unwrap().max(), 0.0);
    }
}

#[test]
fn test_inputs_borrowed_from_field_store() {
    let fx = Fixture::new();
    let mut store = FieldStore::new(&fx.grid);
    for name in ["zero", "thk", "ts", "bheatflx", "shelfbtemp"] {
        store.create(name, Layering::Planar, Ghosts::WithoutGhosts).unwrap();
    }
    for name in ["sigma", "u", "v", "w"] {
        store.create(name, Layering::Layered, Ghosts::WithoutGhosts).unwrap();
    }
    store.set("thk", 4000.0).unwrap();
    store.set("ts", 260.0).unwrap();
    store.set("shelfbtemp", 260.0).unwrap();
    store.get2_mut("bheatflx").unwrap().copy_from(&fx.basal_heat_flux).unwrap();

    let mut model = EnergyModel::enthalpy(&fx.grid, &fx.config).unwrap();
    model
        .initialize(
            store.get2("zero").unwrap(),
            store.get2("thk").unwrap(),
            store.get2("ts").unwrap(),
            store.get2("zero").unwrap(),
            store.get2("bheatflx").unwrap(),
        )
        .unwrap();

    let inputs = EnergyModelInputs {
        cell_type: Some(&fx.cell_type),
        basal_frictional_heating: Some(store.get2("zero").unwrap()),
        basal_heat_flux: Some(store.get2("bheatflx").unwrap()),
        ice_thickness: Some(store.get2("thk").unwrap()),
        surface_liquid_fraction: Some(store.get2("zero").unwrap()),
        shelf_base_temp: Some(store.get2("shelfbtemp").unwrap()),
        surface_temp: Some(store.get2("ts").unwrap()),
        till_water_thickness: Some(store.get2("zero").unwrap()),
        strain_heating3: Some(store.get3("sigma").unwrap()),
        u3: Some(store.get3("u").unwrap()),
        v3: Some(store.get3("v").unwrap()),
        w3: Some(store.get3("w").unwrap()),
    };
    inputs.check(&fx.grid).unwrap();
    model.update(0.0, one_year(), &inputs).unwrap();

    // same forcing as the fixture, same answer
    let mut reference = EnergyModel::enthalpy(&fx.grid, &fx.config).unwrap();
    initialize(&mut reference, &fx);
    reference.update(0.0, one_year(), &fx.inputs()).unwrap();
    assert_eq!(
        model.get_enthalpy().unwrap().values(),
        reference.get_enthalpy().unwrap().values()
    );
}

#[test]
fn test_strong_geothermal_flux_melts_temperate_base() {
    let mut fx = Fixture::new();
    let heat_flux = 0.3;
    fx.basal_heat_flux.set(heat_flux);
    let conductivity = fx.config.ice_thermal_conductivity_w_m_k;
    let z = fx.grid.z();

    let mut mean_rates = Vec::new();
    for variant in [ModelVariant::Enthalpy, ModelVariant::Temperature] {
        let mut model = new_model(variant, &fx);
        initialize(&mut model, &fx);
        for step in 0..5 {
            model.update(step as f64 * one_year(), one_year(), &fx.inputs()).unwrap();
        }
        let rho_latent = fx.config.ice_density_kgm3 * model.converter().latent_heat();
        let bmr = model.get_basal_melt_rate().unwrap();
        assert_gt!(bmr.min(), 0.0, "{} base should melt", variant.as_str());

        // a base at pressure melting conducts almost nothing away
        assert_deviation!(bmr.max(), heat_flux / rho_latent, 5.0);

        if variant == ModelVariant::Temperature {
            let temperature = model.get_temperature().unwrap();
            for (i, j) in fx.grid.points() {
                let column = temperature.column(i, j);
                let conducted = conductivity * (column[0] - column[1]) / (z[1] - z[0]);
                assert_deviation!(bmr.get(i, j), (heat_flux - conducted) / rho_latent, 2.0);
            }
        }
        let mean = bmr.sum() / fx.grid.point_count() as f64;
        println!("   {} basal melt: {:.4} m/yr", variant.as_str(), mean * one_year());
        mean_rates.push(mean);
    }
    assert_deviation!(mean_rates[0], mean_rates[1], 3.0);
}

#[test]
fn test_cold_base_overshoot_becomes_melt() {
    let mut fx = cold_fixture();
    let mut model = EnergyModel::enthalpy(&fx.grid, &fx.config).unwrap();
    initialize(&mut model, &fx);

    let heat_flux = 200.0;
    fx.basal_heat_flux.set(heat_flux);
    model.update(0.0, one_year(), &fx.inputs()).unwrap();

    let ec = model.converter();
    let rho_latent = fx.config.ice_density_kgm3 * ec.latent_heat();
    let bmr = model.get_basal_melt_rate().unwrap();
    // part of the flux went into warming the base up to pressure melting
    assert_gt!(bmr.min(), 0.5 * heat_flux / rho_latent);
    assert_lt!(bmr.max(), heat_flux / rho_latent);

    let e_cts_base = ec.enthalpy_cts(ec.pressure(1000.0));
    let enthalpy = model.get_enthalpy().unwrap();
    for (i, j) in fx.grid.points() {
        assert_abs_diff_eq!(enthalpy.get(i, j, 0), e_cts_base, epsilon = 1e-6);
    }
}

#[test]
fn test_strain_heating_is_capped_at_liquid() {
    let mut fx = Fixture::new();
    fx.strain_heating3.set(100.0);
    let thickness = 4000.0;
    let z = fx.grid.z();

    println!("* Enthalpy variant");
    let mut model = EnergyModel::enthalpy(&fx.grid, &fx.config).unwrap();
    initialize(&mut model, &fx);
    model.update(0.0, one_year(), &fx.inputs()).unwrap();

    let stats = model.stats().unwrap();
    assert_gt!(stats.liquified_ice_volume, 0.0);
    let ec = model.converter();
    let max_water_fraction = model.config().max_water_fraction;
    let enthalpy = model.get_enthalpy().unwrap();
    for (i, j) in fx.grid.points() {
        let column = enthalpy.column(i, j);
        for k in 0..z.len() - 1 {
            let p = ec.pressure(thickness - z[k]);
            assert_lt!(column[k], ec.enthalpy_liquid(p));
            assert_le!(ec.water_fraction(column[k], p), max_water_fraction + 1e-9);
        }
    }
    // drained water reaches the bed
    assert_gt!(model.get_basal_melt_rate().unwrap().min(), 0.0);

    println!("* Temperature variant");
    let mut model = EnergyModel::temperature(&fx.grid, &fx.config).unwrap();
    initialize(&mut model, &fx);
    model.update(0.0, one_year(), &fx.inputs()).unwrap();

    let ec = model.converter();
    let temperature = model.get_temperature().unwrap();
    for (i, j) in fx.grid.points() {
        let column = temperature.column(i, j);
        for k in 0..z.len() {
            let melting = ec.melting_temperature(ec.pressure(thickness - z[k]));
            assert_le!(column[k], melting + 1e-9);
        }
    }
    assert_gt!(model.get_basal_melt_rate().unwrap().min(), 0.0);
}
