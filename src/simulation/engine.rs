//! # Simulation Engine
//!
//! Drives the [`Pipeline`] over a [`TimeGrid`]. Timestamps are split into
//! chunks, each chunk is mapped through the pipeline (in parallel with
//! rayon unless disabled) and reduced into a [`StatisticsAccumulator`].
//!
//! Observed weather goes through the quality gate first, as a synchronous
//! pre-pass: schema check and quality flags, then implausible values are
//! cleared and filled together with the gaps, the series is interpolated
//! onto the simulation grid and checked again. Whatever is still malformed
//! falls to the [`SampleErrorPolicy`]. Nothing inside the chunk loop
//! performs I/O.
//!
//! Cancellation is checked before every chunk. A cancelled run returns the
//! chunks that had already finished, with [`RunStatus::Cancelled`].

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, FixedOffset, NaiveDate};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::statistics::{MonthKey, PeriodSummary, SimulationStatistics, StatisticsAccumulator};
use super::timegrid::TimeGrid;
use crate::domain::{Location, PanelArray, PowerSample, WeatherColumn, WeatherSample};
use crate::error::{Result, SimError};
use crate::pipeline::{ClearSkyConditions, Pipeline, SkyCondition};
use crate::weather::{
    self, Cadence, FillMethod, FillOptions, OversizeGap, QualityFlags, QualityReport,
    QualityThresholds, WeatherSeries, WeatherSource,
};

pub const DEFAULT_CHUNK_SIZE: usize = 744;
pub const DEFAULT_PROGRESS_EVERY: usize = 1000;

/// What the engine does with a weather sample it cannot use
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SampleErrorPolicy {
    /// Fail the whole run
    #[default]
    Abort,
    /// Leave the timestamp out of the results and record it in
    /// [`SimulationResult::skipped`]
    SkipAndFlag,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOptions {
    /// Grid spacing, 1 to 60 minutes
    pub interval_minutes: u32,
    /// Timestamps per unit of work
    pub chunk_size: usize,
    /// Progress callback cadence, in processed samples
    pub progress_every: usize,
    pub parallel: bool,
    pub on_invalid_sample: SampleErrorPolicy,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            interval_minutes: 60,
            chunk_size: DEFAULT_CHUNK_SIZE,
            progress_every: DEFAULT_PROGRESS_EVERY,
            parallel: true,
            on_invalid_sample: SampleErrorPolicy::default(),
        }
    }
}

impl SimulationOptions {
    pub fn validate(&self) -> Result<()> {
        if !(1..=60).contains(&self.interval_minutes) {
            return Err(SimError::invalid(
                "interval_minutes",
                format!("{} outside [1, 60]", self.interval_minutes),
            ));
        }
        if self.chunk_size == 0 {
            return Err(SimError::invalid("chunk_size", "must be positive"));
        }
        if self.progress_every == 0 {
            return Err(SimError::invalid("progress_every", "must be positive"));
        }
        Ok(())
    }
}

/// Quality gate settings applied to observed weather before a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherGate {
    pub thresholds: QualityThresholds,
    /// `None` disables gap filling
    pub fill: Option<FillOptions>,
}

impl Default for WeatherGate {
    fn default() -> Self {
        Self {
            thresholds: QualityThresholds::default(),
            fill: Some(FillOptions::default()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimulationPeriod {
    /// Local calendar year of the site
    Year(i32),
    Range {
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    },
}

#[derive(Debug, Clone)]
pub enum WeatherInput {
    ClearSky(ClearSkyConditions),
    Observed(WeatherSeries),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedSample {
    pub timestamp: DateTime<FixedOffset>,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
}

impl Progress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.processed as f64 / self.total as f64
        }
    }
}

pub type ProgressCallback<'a> = &'a (dyn Fn(Progress) + Send + Sync);

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    /// Power samples in timestamp order
    pub samples: Vec<PowerSample>,
    pub statistics: SimulationStatistics,
    pub status: RunStatus,
    pub skipped: Vec<SkippedSample>,
    /// Present for runs over observed weather
    pub quality: Option<QualityReport>,
}

impl SimulationResult {
    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Completed
    }

    pub fn monthly_summary(&self) -> &BTreeMap<MonthKey, PeriodSummary> {
        &self.statistics.monthly
    }

    pub fn daily_summary(&self) -> &BTreeMap<NaiveDate, PeriodSummary> {
        &self.statistics.daily
    }
}

/// Weather after the gate, indexed by instant
enum PreparedWeather {
    ClearSky(ClearSkyConditions),
    Observed {
        samples: Vec<WeatherSample>,
        flags: Vec<QualityFlags>,
        index: HashMap<i64, usize>,
    },
}

struct ChunkOutput {
    samples: Vec<PowerSample>,
    skipped: Vec<SkippedSample>,
    statistics: StatisticsAccumulator,
}

#[derive(Debug)]
pub struct SimulationEngine {
    location: Location,
    panel: PanelArray,
    pipeline: Pipeline,
    options: SimulationOptions,
    gate: WeatherGate,
}

impl SimulationEngine {
    pub fn new(
        location: Location,
        panel: PanelArray,
        pipeline: Pipeline,
        options: SimulationOptions,
    ) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            location,
            panel,
            pipeline,
            options,
            gate: WeatherGate::default(),
        })
    }

    pub fn with_gate(mut self, gate: WeatherGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn panel(&self) -> &PanelArray {
        &self.panel
    }

    pub fn options(&self) -> &SimulationOptions {
        &self.options
    }

    pub fn grid(&self, period: SimulationPeriod) -> Result<TimeGrid> {
        let tz = self.location.timezone();
        match period {
            SimulationPeriod::Year(year) => TimeGrid::for_year(year, tz, self.options.interval_minutes),
            SimulationPeriod::Range { start, end } => {
                TimeGrid::new(start, end, self.options.interval_minutes, tz)
            }
        }
    }

    /// Fetch observed weather covering `period` from `source`.
    pub fn fetch_weather(
        &self,
        source: &dyn WeatherSource,
        period: SimulationPeriod,
    ) -> Result<WeatherInput> {
        let grid = self.grid(period)?;
        let series = source.fetch(&self.location, grid.start(), grid.end())?;
        debug!(source = source.name(), samples = series.len(), "weather fetched");
        Ok(WeatherInput::Observed(series))
    }

    pub fn run(
        &self,
        period: SimulationPeriod,
        weather: WeatherInput,
        progress: Option<ProgressCallback<'_>>,
        cancel: &CancellationToken,
    ) -> Result<SimulationResult> {
        let grid = self.grid(period)?;
        let timestamps = grid.timestamps();
        let total = timestamps.len();
        let interval_hours = grid.interval_hours();

        let (prepared, quality) = match weather {
            WeatherInput::ClearSky(conditions) => (PreparedWeather::ClearSky(conditions), None),
            WeatherInput::Observed(series) => {
                let (prepared, report) = self.prepare_observed(&series, &grid)?;
                (prepared, Some(report))
            }
        };

        info!(
            samples = total,
            interval_minutes = grid.interval_minutes(),
            parallel = self.options.parallel,
            "starting simulation"
        );

        let processed = AtomicUsize::new(0);
        let every = self.options.progress_every;
        let work = |chunk: &[DateTime<FixedOffset>]| -> Result<Option<ChunkOutput>> {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            let output = self.run_chunk(chunk, &prepared, interval_hours)?;
            let before = processed.fetch_add(chunk.len(), Ordering::Relaxed);
            let after = before + chunk.len();
            if let Some(callback) = progress {
                if before / every != after / every {
                    callback(Progress {
                        processed: after,
                        total,
                    });
                }
            }
            Ok(Some(output))
        };

        let chunk_size = self.options.chunk_size;
        let outputs: Vec<Option<ChunkOutput>> = if self.options.parallel {
            timestamps
                .par_chunks(chunk_size)
                .map(&work)
                .collect::<Result<_>>()?
        } else {
            timestamps
                .chunks(chunk_size)
                .map(&work)
                .collect::<Result<_>>()?
        };

        let status = if outputs.iter().all(Option::is_some) {
            RunStatus::Completed
        } else {
            RunStatus::Cancelled
        };

        let mut samples = Vec::with_capacity(total);
        let mut skipped = Vec::new();
        let mut statistics = StatisticsAccumulator::new(interval_hours, grid.timezone());
        for output in outputs.into_iter().flatten() {
            samples.extend(output.samples);
            skipped.extend(output.skipped);
            statistics = statistics.merge(output.statistics);
        }

        if let Some(callback) = progress {
            callback(Progress {
                processed: processed.load(Ordering::Relaxed),
                total,
            });
        }

        let statistics = statistics.finish(&self.panel);
        match status {
            RunStatus::Completed => info!(
                samples = samples.len(),
                skipped = skipped.len(),
                energy_kwh = statistics.total_energy_kwh,
                peak_power_w = statistics.peak_power_w,
                capacity_factor = statistics.capacity_factor,
                "simulation completed"
            ),
            RunStatus::Cancelled => warn!(
                samples = samples.len(),
                total,
                "simulation cancelled, returning partial results"
            ),
        }

        Ok(SimulationResult {
            samples,
            statistics,
            status,
            skipped,
            quality,
        })
    }

    fn prepare_observed(
        &self,
        series: &WeatherSeries,
        grid: &TimeGrid,
    ) -> Result<(PreparedWeather, QualityReport)> {
        let series = series.slice(grid.start(), grid.end());
        series.require_schema()?;

        let flags = self.check(&series)?;
        let report = QualityReport::from_flags(&series, &flags);
        if report.flagged_samples > 0 {
            warn!(
                flagged = report.flagged_samples,
                total = report.total_samples,
                quality_percent = report.quality_percent(),
                "weather quality issues found"
            );
        } else {
            debug!(total = report.total_samples, "weather passed quality checks");
        }

        let series = match &self.gate.fill {
            Some(options) => {
                let (masked, cleared) = mask_malformed(series, &flags)?;
                let filled = weather::fill(&masked, options)?;
                let aligned = align_to_grid(filled, Some(options), grid)?;
                restore_unrepaired(aligned, &cleared)?
            }
            None => align_to_grid(series, None, grid)?,
        };
        let flags = self.check(&series)?;

        let samples = series.into_samples();
        let index = samples
            .iter()
            .enumerate()
            .map(|(i, s)| (s.timestamp.timestamp(), i))
            .collect();
        Ok((
            PreparedWeather::Observed {
                samples,
                flags,
                index,
            },
            report,
        ))
    }

    fn check(&self, series: &WeatherSeries) -> Result<Vec<QualityFlags>> {
        weather::check(
            series,
            &self.location,
            self.pipeline.geometry(),
            &self.gate.thresholds,
        )
    }

    fn run_chunk(
        &self,
        chunk: &[DateTime<FixedOffset>],
        weather: &PreparedWeather,
        interval_hours: f64,
    ) -> Result<ChunkOutput> {
        let mut output = ChunkOutput {
            samples: Vec::with_capacity(chunk.len()),
            skipped: Vec::new(),
            statistics: StatisticsAccumulator::new(interval_hours, self.location.timezone()),
        };
        for &timestamp in chunk {
            match self.evaluate(timestamp, weather) {
                Ok(sample) => {
                    output.statistics.push(&sample);
                    output.samples.push(sample);
                }
                Err(err @ SimError::DataQuality { .. })
                    if self.options.on_invalid_sample == SampleErrorPolicy::SkipAndFlag =>
                {
                    debug!(%timestamp, error = %err, "skipping weather sample");
                    output.skipped.push(SkippedSample {
                        timestamp,
                        reason: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }
        Ok(output)
    }

    fn evaluate(
        &self,
        timestamp: DateTime<FixedOffset>,
        weather: &PreparedWeather,
    ) -> Result<PowerSample> {
        let sky = match weather {
            PreparedWeather::ClearSky(conditions) => SkyCondition::ClearSky(*conditions),
            PreparedWeather::Observed {
                samples,
                flags,
                index,
            } => {
                let i = *index.get(&timestamp.timestamp()).ok_or_else(|| {
                    SimError::bad_sample(
                        timestamp,
                        "timestamp",
                        None,
                        "no weather sample for simulated timestamp",
                    )
                })?;
                let sample = &samples[i];
                if flags[i].is_malformed() {
                    return Err(malformed(sample, &flags[i]));
                }
                SkyCondition::Observed(sample)
            }
        };
        self.pipeline
            .evaluate(timestamp, &self.location, &self.panel, sky)
    }
}

/// Value cleared from a malformed sample before filling
struct ClearedValue {
    timestamp: DateTime<FixedOffset>,
    column: WeatherColumn,
    value: Option<f64>,
}

/// Blank out the implausible values of flagged samples so the fill can
/// repair them like any other gap.
fn mask_malformed(
    series: WeatherSeries,
    flags: &[QualityFlags],
) -> Result<(WeatherSeries, Vec<ClearedValue>)> {
    let mut samples = series.into_samples();
    let mut cleared = Vec::new();
    for (sample, flag) in samples.iter_mut().zip(flags) {
        if !flag.is_malformed() {
            continue;
        }
        for column in weather::malformed_columns(sample) {
            cleared.push(ClearedValue {
                timestamp: sample.timestamp,
                column,
                value: sample.get(column),
            });
            sample.set(column, None);
        }
    }
    if !cleared.is_empty() {
        debug!(values = cleared.len(), "cleared malformed weather values for filling");
    }
    Ok((WeatherSeries::new(samples)?, cleared))
}

/// Put back cleared values the fill could not replace, so the sample is
/// still reported as malformed.
fn restore_unrepaired(series: WeatherSeries, cleared: &[ClearedValue]) -> Result<WeatherSeries> {
    if cleared.is_empty() {
        return Ok(series);
    }
    let mut samples = series.into_samples();
    let mut repaired = 0;
    for entry in cleared {
        let Ok(i) = samples.binary_search_by(|s| s.timestamp.cmp(&entry.timestamp)) else {
            continue;
        };
        if samples[i].get(entry.column).is_some() {
            repaired += 1;
        } else {
            samples[i].set(entry.column, entry.value);
        }
    }
    info!(
        repaired,
        unrepaired = cleared.len() - repaired,
        "malformed weather values filled"
    );
    WeatherSeries::new(samples)
}

/// Interpolate a coarser series onto the simulation grid. Only the steps
/// between two neighbouring observations are filled, so gaps that survived
/// the fill stay open.
fn align_to_grid(
    series: WeatherSeries,
    options: Option<&FillOptions>,
    grid: &TimeGrid,
) -> Result<WeatherSeries> {
    if series.len() < 2 {
        return Ok(series);
    }
    let native = match options.and_then(|o| o.cadence) {
        Some(cadence) => cadence,
        None => series.infer_cadence()?,
    };
    let step = Cadence::from_minutes(i64::from(grid.interval_minutes()))?;
    if step.seconds() >= native.seconds() {
        return Ok(series);
    }
    let between = (native.seconds() + step.seconds() - 1) / step.seconds() - 1;
    let upsample = FillOptions {
        method: options.map_or(FillMethod::Time, |o| o.method),
        limit: Some(between as usize),
        columns: options.and_then(|o| o.columns.clone()),
        cadence: Some(step),
        oversize: OversizeGap::LeaveMissing,
    };
    debug!(native = %native, step = %step, "interpolating weather onto the simulation grid");
    weather::fill(&series, &upsample)
}

fn malformed(sample: &WeatherSample, flags: &QualityFlags) -> SimError {
    let negative = WeatherColumn::ALL
        .into_iter()
        .find_map(|c| sample.get(c).filter(|v| *v < 0.0).map(|v| (c, v)));
    match negative {
        Some((column, value)) if flags.negative_value => SimError::bad_sample(
            sample.timestamp,
            column.to_string(),
            Some(value),
            "negative weather value",
        ),
        _ => SimError::bad_sample(
            sample.timestamp,
            "weather",
            None,
            "weather value outside its physical range",
        ),
    }
}
