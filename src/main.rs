use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use config::Config;
use pv_yield_simulator::simulation::{
    export, Progress, SimulationEngine, SimulationPeriod, SimulationResult, WeatherInput,
};
use pv_yield_simulator::weather::{CachedSource, StaticSource, WeatherSeries};
use pv_yield_simulator::{config, telemetry};
use telemetry::init_tracing;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cfg = Config::load()?;
    let engine = Arc::new(cfg.engine()?);
    let period = SimulationPeriod::Year(cfg.simulation.year);

    let weather = match &cfg.simulation.weather_file {
        Some(path) => load_weather(&cfg, &engine, path, period).await?,
        None => WeatherInput::ClearSky(cfg.simulation.clear_sky()),
    };

    info!(
        year = cfg.simulation.year,
        latitude = engine.location().latitude(),
        longitude = engine.location().longitude(),
        rated_power_w = engine.panel().rated_power_w(),
        "starting PV yield simulation"
    );

    let cancel = CancellationToken::new();
    let mut run = {
        let engine = engine.clone();
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || {
            let report = |p: Progress| {
                info!(
                    processed = p.processed,
                    total = p.total,
                    percent = format!("{:.0}", p.fraction() * 100.0),
                    "simulation progress"
                );
            };
            engine.run(period, weather, Some(&report), &cancel)
        })
    };

    let result = tokio::select! {
        finished = &mut run => finished??,
        _ = telemetry::shutdown_signal() => {
            warn!("cancelling simulation");
            cancel.cancel();
            run.await??
        }
    };

    if let Some(report) = &result.quality {
        info!(quality_percent = report.quality_percent(), "{}", report.render());
    }
    write_outputs(&cfg, &result)?;

    let stats = &result.statistics;
    info!(
        status = %result.status,
        energy_kwh = stats.total_energy_kwh,
        peak_power_w = stats.peak_power_w,
        capacity_factor = stats.capacity_factor,
        performance_ratio = stats.performance_ratio,
        skipped = result.skipped.len(),
        "simulation finished"
    );
    Ok(())
}

async fn load_weather(
    cfg: &Config,
    engine: &SimulationEngine,
    path: &Path,
    period: SimulationPeriod,
) -> Result<WeatherInput> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading weather file {}", path.display()))?;
    let series: WeatherSeries = serde_json::from_slice(&bytes)
        .with_context(|| format!("parsing weather file {}", path.display()))?;
    let source = CachedSource::new(
        StaticSource::new(path.display().to_string(), series),
        Arc::new(cfg.cache.build()?),
    );
    Ok(engine.fetch_weather(&source, period)?)
}

fn write_outputs(cfg: &Config, result: &SimulationResult) -> Result<()> {
    let out = &cfg.output;
    for path in [&out.samples_csv, &out.monthly_csv, &out.daily_csv, &out.statistics_json]
        .into_iter()
        .flatten()
    {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating output directory {}", dir.display()))?;
        }
    }
    if let Some(path) = &out.samples_csv {
        export::write_samples_file(path, &result.samples)
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), rows = result.samples.len(), "wrote power samples");
    }
    if let Some(path) = &out.monthly_csv {
        export::write_rollup_file(path, result.monthly_summary())
            .with_context(|| format!("writing {}", path.display()))?;
    }
    if let Some(path) = &out.daily_csv {
        export::write_rollup_file(path, result.daily_summary())
            .with_context(|| format!("writing {}", path.display()))?;
    }
    if let Some(path) = &out.statistics_json {
        let file = std::fs::File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        serde_json::to_writer_pretty(file, &result.statistics)?;
    }
    Ok(())
}
