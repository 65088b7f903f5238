use std::sync::Arc;

use pv_yield_simulator::domain::{Location, PanelArray};
use pv_yield_simulator::pipeline::{ClearSkyConditions, DerateFactors, ModelSet, Pipeline};
use pv_yield_simulator::simulation::{
    export, Progress, RunStatus, SimulationEngine, SimulationOptions, SimulationPeriod,
    SimulationResult, WeatherInput,
};
use pv_yield_simulator::solar::SpaIneichen;
use rstest::rstest;
use tokio_util::sync::CancellationToken;

use super::{mid_latitude_site, south_array};

fn engine_for(location: Location, panel: PanelArray, interval_minutes: u32) -> SimulationEngine {
    let options = SimulationOptions {
        interval_minutes,
        ..Default::default()
    };
    engine_with(location, panel, options)
}

fn engine_with(location: Location, panel: PanelArray, options: SimulationOptions) -> SimulationEngine {
    let pipeline = Pipeline::new(
        Arc::new(SpaIneichen::default()),
        ModelSet::for_panel(&panel),
        0.2,
        DerateFactors {
            soiling: 0.98,
            degradation: 0.99,
            inverter_efficiency: Some(0.96),
        },
    )
    .unwrap();
    SimulationEngine::new(location, panel, pipeline, options).unwrap()
}

fn clear_year(engine: &SimulationEngine, year: i32) -> SimulationResult {
    engine
        .run(
            SimulationPeriod::Year(year),
            WeatherInput::ClearSky(ClearSkyConditions::default()),
            None,
            &CancellationToken::new(),
        )
        .unwrap()
}

#[rstest]
#[case(2023, 8760)]
#[case(2024, 8784)]
fn hourly_year_has_one_sample_per_hour(#[case] year: i32, #[case] expected: usize) {
    let engine = engine_for(mid_latitude_site(), south_array(), 60);
    let result = clear_year(&engine, year);

    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.samples.len(), expected);
    assert_eq!(result.statistics.sample_count, expected);
    assert!(result.samples.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    for sample in &result.samples {
        assert!(sample.dc_power_w >= 0.0);
        let ac = sample.ac_power_w.unwrap();
        assert!(ac <= sample.dc_power_w);
        if sample.sun.elevation_deg <= 0.0 {
            assert_eq!(sample.dc_power_w, 0.0, "power at night: {}", sample.timestamp);
        }
    }
}

#[test]
fn annual_statistics_are_consistent() {
    let engine = engine_for(mid_latitude_site(), south_array(), 60);
    let result = clear_year(&engine, 2023);
    let stats = &result.statistics;

    assert_eq!(result.monthly_summary().len(), 12);
    assert_eq!(result.daily_summary().len(), 365);
    let monthly_sum: f64 = result.monthly_summary().values().map(|m| m.energy_kwh).sum();
    let daily_sum: f64 = result.daily_summary().values().map(|d| d.energy_kwh).sum();
    assert!((monthly_sum - stats.total_energy_kwh).abs() < 1e-6);
    assert!((daily_sum - stats.total_energy_kwh).abs() < 1e-6);

    // 2 kWp under a permanently clear sky
    assert!(stats.total_energy_kwh > 3_000.0 && stats.total_energy_kwh < 6_500.0);
    assert!(stats.capacity_factor > 0.15 && stats.capacity_factor < 0.4);
    assert!(stats.performance_ratio > 0.7 && stats.performance_ratio < 1.0);
    assert!(stats.peak_power_w <= 2_000.0 * 1.2);
    assert!(stats.daylight_hours > 4_000.0 && stats.daylight_hours < 4_800.0);
    let ac = stats.ac_energy_kwh.unwrap();
    assert!((ac - stats.total_energy_kwh * 0.96).abs() < 1e-6);

    let june = result.monthly_summary().iter().find(|(k, _)| k.month == 6).unwrap().1;
    let december = result.monthly_summary().iter().find(|(k, _)| k.month == 12).unwrap().1;
    assert!(june.energy_kwh > december.energy_kwh);
}

#[test]
fn local_year_starts_at_local_midnight() {
    let berlin = Location::new(52.52, 13.405, 34.0, "Europe/Berlin").unwrap();
    let engine = engine_for(berlin, south_array(), 60);
    let result = clear_year(&engine, 2023);
    assert_eq!(result.samples.len(), 8760);
    assert_eq!(result.samples[0].timestamp.to_rfc3339(), "2023-01-01T00:00:00+01:00");
    let last = result.samples.last().unwrap();
    assert_eq!(last.timestamp.to_rfc3339(), "2023-12-31T23:00:00+01:00");
}

#[test]
fn export_writes_header_and_one_row_per_sample() {
    let engine = engine_for(mid_latitude_site(), south_array(), 60);
    let result = clear_year(&engine, 2023);

    let mut out = Vec::new();
    export::write_samples(&mut out, &result.samples).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text.lines().count(), 8761);
    assert!(text.starts_with("timestamp,dc_power_w,ac_power_w,poa_global,"));

    let mut rollup = Vec::new();
    export::write_rollup(&mut rollup, result.monthly_summary()).unwrap();
    let rollup = String::from_utf8(rollup).unwrap();
    assert_eq!(rollup.lines().count(), 13);
    assert!(rollup.lines().nth(1).unwrap().starts_with("2023-01,"));
}

#[test]
fn cancelled_year_reports_partial_status() {
    let engine = engine_with(
        mid_latitude_site(),
        south_array(),
        SimulationOptions {
            parallel: false,
            ..Default::default()
        },
    );
    let cancel = CancellationToken::new();
    let trip = |_: Progress| cancel.cancel();
    let result = engine
        .run(
            SimulationPeriod::Year(2023),
            WeatherInput::ClearSky(ClearSkyConditions::default()),
            Some(&trip),
            &cancel,
        )
        .unwrap();
    assert_eq!(result.status, RunStatus::Cancelled);
    assert!(result.samples.len() < 8760);
}

#[test]
#[ignore]
fn minute_resolution_year() {
    let engine = engine_for(mid_latitude_site(), south_array(), 1);
    let result = clear_year(&engine, 2023);
    assert_eq!(result.samples.len(), 525_600);
    let hourly = clear_year(&engine_for(mid_latitude_site(), south_array(), 60), 2023);
    let ratio = result.statistics.total_energy_kwh / hourly.statistics.total_energy_kwh;
    assert!((ratio - 1.0).abs() < 0.02, "ratio = {ratio}");
}
