use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pv_yield_simulator::domain::{Location, PanelArray};
use pv_yield_simulator::pipeline::{ClearSkyConditions, Pipeline, SkyCondition};
use pv_yield_simulator::simulation::{
    SimulationEngine, SimulationOptions, SimulationPeriod, WeatherInput,
};
use tokio_util::sync::CancellationToken;

fn engine(parallel: bool) -> SimulationEngine {
    let location = Location::new(48.14, 11.58, 520.0, "Europe/Berlin").expect("location");
    let panel = PanelArray::new(16.0, 0.21, 30.0, 180.0).expect("panel");
    let pipeline = Pipeline::with_defaults(&panel);
    let options = SimulationOptions {
        parallel,
        ..Default::default()
    };
    SimulationEngine::new(location, panel, pipeline, options).expect("engine")
}

fn bench_pipeline(c: &mut Criterion) {
    let location = Location::new(48.14, 11.58, 520.0, "Europe/Berlin").expect("location");
    let panel = PanelArray::new(16.0, 0.21, 30.0, 180.0).expect("panel");
    let pipeline = Pipeline::with_defaults(&panel);
    let noon = chrono::DateTime::parse_from_rfc3339("2024-06-21T13:00:00+02:00").expect("timestamp");
    let sky = SkyCondition::ClearSky(ClearSkyConditions::default());

    c.bench_function("pipeline_single_timestamp", |b| {
        b.iter(|| pipeline.evaluate(black_box(noon), &location, &panel, sky))
    });
}

fn bench_annual(c: &mut Criterion) {
    let mut group = c.benchmark_group("annual_clear_sky_hourly");
    group.sample_size(10);
    for (name, parallel) in [("sequential", false), ("parallel", true)] {
        let engine = engine(parallel);
        group.bench_function(name, |b| {
            b.iter(|| {
                // 8784 steps, leap year
                engine.run(
                    SimulationPeriod::Year(2024),
                    WeatherInput::ClearSky(ClearSkyConditions::default()),
                    None,
                    &CancellationToken::new(),
                )
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_pipeline, bench_annual);
criterion_main!(benches);
