use std::sync::Arc;

use pv_yield_simulator::domain::IrradianceComponents;
use pv_yield_simulator::pipeline::{
    transpose, ClearSkyConditions, CloudCover, DerateFactors, DiffuseModel, IamModel, ModelSet,
    Pipeline, SkyCondition, DEFAULT_ALBEDO,
};
use pv_yield_simulator::solar::SpaIneichen;
use rstest::rstest;

use super::{mid_latitude_site, south_array, ts};

fn isotropic_pipeline() -> Pipeline {
    let panel = south_array();
    let models = ModelSet {
        diffuse: DiffuseModel::Isotropic,
        ..ModelSet::for_panel(&panel)
    };
    Pipeline::new(
        Arc::new(SpaIneichen::default()),
        models,
        DEFAULT_ALBEDO,
        DerateFactors::default(),
    )
    .unwrap()
}

#[test]
fn clear_sky_noon_matches_nameplate_within_five_percent() {
    let pipeline = isotropic_pipeline();
    let panel = south_array();
    let sky = SkyCondition::ClearSky(ClearSkyConditions {
        ambient_temp_c: 20.0,
        wind_speed: 1.0,
        cloud_cover: CloudCover::Percent(0.0),
    });
    let sample = pipeline
        .evaluate(ts("2024-03-20T12:07:00Z"), &mid_latitude_site(), &panel, sky)
        .unwrap();

    assert!(
        (900.0..=1150.0).contains(&sample.poa.global),
        "poa = {}",
        sample.poa.global
    );
    assert!(sample.cell_temperature_c > 20.0);
    let expected = panel.area_m2() * panel.efficiency() * 1000.0 * sample.temperature_factor;
    let deviation = (sample.dc_power_w - expected).abs() / expected;
    assert!(deviation < 0.05, "dc = {}, expected ~{expected}", sample.dc_power_w);
}

#[rstest]
#[case("2024-03-20T07:30:00Z")]
#[case("2024-03-20T12:07:00Z")]
#[case("2024-06-21T17:00:00Z")]
#[case("2024-12-21T12:00:00Z")]
fn full_overcast_is_dim_but_never_dark(#[case] at: &str) {
    let pipeline = Pipeline::with_defaults(&south_array());
    let clear = pipeline
        .evaluate(
            ts(at),
            &mid_latitude_site(),
            &south_array(),
            SkyCondition::ClearSky(ClearSkyConditions::default()),
        )
        .unwrap();
    let overcast = pipeline
        .evaluate(
            ts(at),
            &mid_latitude_site(),
            &south_array(),
            SkyCondition::ClearSky(ClearSkyConditions {
                cloud_cover: CloudCover::Percent(100.0),
                ..Default::default()
            }),
        )
        .unwrap();

    assert!(overcast.sun.is_above_horizon());
    assert!(overcast.poa.global > 0.0);
    assert!(overcast.poa.global < clear.poa.global);
    assert!(overcast.irradiance.dhi > 0.0);
    assert_eq!(overcast.irradiance.dni, 0.0);
}

#[test]
fn beam_vanishes_at_grazing_incidence() {
    // sun due north at zenith 55° sits exactly in the plane of a 35° south-facing module
    let irradiance = IrradianceComponents::new(600.0, 700.0, 200.0);
    let poa = transpose(
        irradiance,
        55.0,
        0.0,
        35.0,
        180.0,
        DEFAULT_ALBEDO,
        DiffuseModel::Isotropic,
        IamModel::Physical,
    )
    .unwrap();
    assert!((poa.aoi_deg - 90.0).abs() < 1e-6);
    assert_eq!(poa.direct, 0.0);
}

#[rstest]
#[case(IamModel::Ashrae)]
#[case(IamModel::Physical)]
#[case(IamModel::MartinRuiz)]
fn normal_incidence_has_no_reflection_loss(#[case] iam: IamModel) {
    let irradiance = IrradianceComponents::new(800.0, 850.0, 100.0);
    let poa = transpose(irradiance, 35.0, 180.0, 35.0, 180.0, 0.0, DiffuseModel::Isotropic, iam)
        .unwrap();
    assert!(poa.aoi_deg.abs() < 1e-6);
    assert!((poa.iam - 1.0).abs() < 1e-12);
    assert!((poa.direct - 850.0).abs() < 1e-9);
}

#[rstest]
fn uniform_sky_is_model_and_azimuth_independent(
    #[values(0.0, 20.0, 45.0, 90.0)] tilt: f64,
    #[values(0.0, 90.0, 180.0, 270.0)] azimuth: f64,
) {
    let diffuse_only = IrradianceComponents::new(250.0, 0.0, 250.0);
    let reference = transpose(
        diffuse_only,
        50.0,
        135.0,
        tilt,
        180.0,
        DEFAULT_ALBEDO,
        DiffuseModel::Isotropic,
        IamModel::default(),
    )
    .unwrap()
    .global;
    for model in [DiffuseModel::Isotropic, DiffuseModel::Perez, DiffuseModel::HayDavies] {
        let global = transpose(
            diffuse_only,
            50.0,
            135.0,
            tilt,
            azimuth,
            DEFAULT_ALBEDO,
            model,
            IamModel::default(),
        )
        .unwrap()
        .global;
        assert!((global - reference).abs() < 1e-9, "{model} at {tilt}/{azimuth}");
    }
}

#[test]
fn soiling_outside_unit_interval_is_rejected() {
    let panel = south_array();
    for soiling in [0.0, 1.01, -0.5] {
        let derate = DerateFactors {
            soiling,
            ..Default::default()
        };
        assert!(Pipeline::new(
            Arc::new(SpaIneichen::default()),
            ModelSet::for_panel(&panel),
            DEFAULT_ALBEDO,
            derate
        )
        .is_err());
    }
}
