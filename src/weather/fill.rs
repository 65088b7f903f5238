//! # Gap Filling
//!
//! Fills missing values in a weather series. The series is first laid onto
//! its regular cadence grid so that absent timestamps become empty rows;
//! every missing run of a column is then filled by the chosen method unless
//! it is longer than the configured limit. Long runs are left missing (or
//! rejected, or taken from a fallback source), never interpolated.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use tracing::{debug, warn};

use super::gaps::grid_points_between;
use super::{Cadence, WeatherSeries};
use crate::domain::{WeatherColumn, WeatherSample};
use crate::error::{Result, SimError};

/// Longest run filled by default, in samples
pub const DEFAULT_MAX_GAP: usize = 6;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FillMethod {
    /// Carry the last value forward
    Forward,
    /// Carry the next value backward
    Backward,
    /// Forward fill, with a backward fill for a leading run
    ForwardBackward,
    /// Straight line by sample position
    #[default]
    Linear,
    /// Straight line weighted by elapsed time
    Time,
    /// Natural cubic spline through every known value of the column
    Cubic,
}

/// What to do with a run longer than the limit
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OversizeGap {
    #[default]
    LeaveMissing,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillOptions {
    pub method: FillMethod,
    /// Longest run of missing samples that may be filled; `None` = unlimited
    pub limit: Option<usize>,
    /// Columns to fill; `None` = all
    pub columns: Option<Vec<WeatherColumn>>,
    /// Grid spacing; inferred from the series when absent
    pub cadence: Option<Cadence>,
    pub oversize: OversizeGap,
}

impl Default for FillOptions {
    fn default() -> Self {
        Self {
            method: FillMethod::default(),
            limit: Some(DEFAULT_MAX_GAP),
            columns: None,
            cadence: None,
            oversize: OversizeGap::default(),
        }
    }
}

impl FillOptions {
    pub fn new(method: FillMethod) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn columns(mut self, columns: impl IntoIterator<Item = WeatherColumn>) -> Self {
        self.columns = Some(columns.into_iter().collect());
        self
    }

    pub fn cadence(mut self, cadence: Cadence) -> Self {
        self.cadence = Some(cadence);
        self
    }

    pub fn oversize(mut self, oversize: OversizeGap) -> Self {
        self.oversize = oversize;
        self
    }

    fn selected(&self) -> Vec<WeatherColumn> {
        self.columns
            .clone()
            .unwrap_or_else(|| WeatherColumn::ALL.to_vec())
    }
}

/// Fill missing timestamps and values according to `options`.
pub fn fill(series: &WeatherSeries, options: &FillOptions) -> Result<WeatherSeries> {
    let mut grid = Grid::regularize(series, options)?;
    let unfilled = grid.fill(options)?;
    if !unfilled.is_empty() {
        warn!(
            runs = unfilled.len(),
            limit = ?options.limit,
            "weather gaps left unfilled"
        );
    }
    grid.finish()
}

/// Fill like [`fill`], then take whatever the method may not fill from
/// `fallback` at identical timestamps.
pub fn fill_with_fallback(
    series: &WeatherSeries,
    fallback: &WeatherSeries,
    options: &FillOptions,
) -> Result<WeatherSeries> {
    let lenient = FillOptions {
        oversize: OversizeGap::LeaveMissing,
        ..options.clone()
    };
    let mut grid = Grid::regularize(series, &lenient)?;
    let unfilled = grid.fill(&lenient)?;
    for run in &unfilled {
        for i in run.start..=run.end {
            let ts = grid.rows[i].timestamp;
            let value = fallback.get(ts).and_then(|s| s.get(run.column));
            match value {
                Some(v) => grid.rows[i].set(run.column, Some(v)),
                None => return Err(grid.unfillable(run, options.limit)),
            }
        }
    }
    debug!(runs = unfilled.len(), "filled oversize gaps from fallback source");
    grid.finish()
}

/// Missing run of one column, inclusive row indices
#[derive(Debug, Clone, Copy)]
struct Run {
    column: WeatherColumn,
    start: usize,
    end: usize,
}

impl Run {
    fn len(&self) -> usize {
        self.end - self.start + 1
    }
}

struct Grid {
    rows: Vec<WeatherSample>,
    placeholder: Vec<bool>,
}

impl Grid {
    fn regularize(series: &WeatherSeries, options: &FillOptions) -> Result<Self> {
        let mut rows = Vec::with_capacity(series.len());
        let mut placeholder = Vec::with_capacity(series.len());
        let Some(anchor) = series.start() else {
            return Ok(Self { rows, placeholder });
        };
        let cadence = match options.cadence {
            Some(c) => c,
            None if series.len() < 2 => return Ok(Self {
                rows: series.samples().to_vec(),
                placeholder: vec![false; series.len()],
            }),
            None => series.infer_cadence()?,
        };

        for (i, sample) in series.iter().enumerate() {
            if i > 0 {
                let prev = series.samples()[i - 1].timestamp;
                for ts in grid_points_between(anchor, cadence, prev, sample.timestamp) {
                    rows.push(WeatherSample::empty(ts));
                    placeholder.push(true);
                }
            }
            rows.push(sample.clone());
            placeholder.push(false);
        }
        Ok(Self { rows, placeholder })
    }

    /// Fills in place; returns the interior runs that stayed missing.
    fn fill(&mut self, options: &FillOptions) -> Result<Vec<Run>> {
        let mut unfilled = Vec::new();
        for column in options.selected() {
            let values: Vec<Option<f64>> = self.rows.iter().map(|r| r.get(column)).collect();
            if values.iter().all(Option::is_none) {
                continue;
            }
            let spline = (options.method == FillMethod::Cubic).then(|| {
                let (xs, ys): (Vec<f64>, Vec<f64>) = values
                    .iter()
                    .enumerate()
                    .filter_map(|(i, v)| v.map(|v| (self.seconds(i), v)))
                    .unzip();
                NaturalSpline::new(xs, ys)
            });

            for run in missing_runs(&values, column) {
                let left = run.start.checked_sub(1);
                let right = (run.end + 1 < values.len()).then_some(run.end + 1);
                let interior = left.is_some() && right.is_some();

                if options.limit.is_some_and(|limit| run.len() > limit) {
                    if interior {
                        if options.oversize == OversizeGap::Fail {
                            return Err(self.unfillable(&run, options.limit));
                        }
                        unfilled.push(run);
                    }
                    continue;
                }

                let value_at = |i: Option<usize>| i.and_then(|i| values[i]);
                for i in run.start..=run.end {
                    let filled = match options.method {
                        FillMethod::Forward => value_at(left),
                        FillMethod::Backward => value_at(right),
                        FillMethod::ForwardBackward => value_at(left).or(value_at(right)),
                        FillMethod::Linear => match (left, right) {
                            (Some(l), Some(r)) => {
                                let w = (i - l) as f64 / (r - l) as f64;
                                value_at(left).zip(value_at(right)).map(|(a, b)| a + (b - a) * w)
                            }
                            _ => None,
                        },
                        FillMethod::Time => match (left, right) {
                            (Some(l), Some(r)) => {
                                let w = (self.seconds(i) - self.seconds(l))
                                    / (self.seconds(r) - self.seconds(l));
                                value_at(left).zip(value_at(right)).map(|(a, b)| a + (b - a) * w)
                            }
                            _ => None,
                        },
                        FillMethod::Cubic => match (interior, &spline) {
                            (true, Some(s)) => Some(s.eval(self.seconds(i))),
                            _ => None,
                        },
                    };
                    if filled.is_some() {
                        self.rows[i].set(column, filled);
                    }
                }
            }
        }
        Ok(unfilled)
    }

    fn seconds(&self, i: usize) -> f64 {
        (self.rows[i].timestamp - self.rows[0].timestamp).num_milliseconds() as f64 / 1000.0
    }

    fn unfillable(&self, run: &Run, limit: Option<usize>) -> SimError {
        SimError::UnfillableGap {
            column: run.column.to_string(),
            start: self.rows[run.start].timestamp,
            end: self.rows[run.end].timestamp,
            missing_points: run.len(),
            max_gap: limit.unwrap_or(usize::MAX),
        }
    }

    /// Drops inserted rows that are still empty, so their timestamps keep
    /// showing up as gaps.
    fn finish(self) -> Result<WeatherSeries> {
        let rows = self
            .rows
            .into_iter()
            .zip(self.placeholder)
            .filter(|(row, inserted)| !(*inserted && row.is_blank()))
            .map(|(row, _)| row)
            .collect();
        WeatherSeries::new(rows)
    }
}

fn missing_runs(values: &[Option<f64>], column: WeatherColumn) -> Vec<Run> {
    let mut runs = Vec::new();
    let mut start = None;
    for (i, v) in values.iter().enumerate() {
        match (v, start) {
            (None, None) => start = Some(i),
            (Some(_), Some(s)) => {
                runs.push(Run { column, start: s, end: i - 1 });
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push(Run { column, start: s, end: values.len() - 1 });
    }
    runs
}

/// Interpolating cubic spline with zero curvature at both ends
struct NaturalSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    second: Vec<f64>,
}

impl NaturalSpline {
    fn new(xs: Vec<f64>, ys: Vec<f64>) -> Self {
        let n = xs.len();
        let mut second = vec![0.0; n];
        if n >= 3 {
            let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();
            let mut c_prime = vec![0.0; n];
            let mut d_prime = vec![0.0; n];
            for i in 1..n - 1 {
                let sub = h[i - 1];
                let diag = 2.0 * (h[i - 1] + h[i]);
                let sup = h[i];
                let rhs = 6.0 * ((ys[i + 1] - ys[i]) / h[i] - (ys[i] - ys[i - 1]) / h[i - 1]);
                let denom = diag - sub * c_prime[i - 1];
                c_prime[i] = sup / denom;
                d_prime[i] = (rhs - sub * d_prime[i - 1]) / denom;
            }
            for i in (1..n - 1).rev() {
                second[i] = d_prime[i] - c_prime[i] * second[i + 1];
            }
        }
        Self { xs, ys, second }
    }

    fn eval(&self, x: f64) -> f64 {
        let n = self.xs.len();
        if n == 1 {
            return self.ys[0];
        }
        let i = self.xs.partition_point(|v| *v <= x).clamp(1, n - 1) - 1;
        let h = self.xs[i + 1] - self.xs[i];
        let a = (self.xs[i + 1] - x) / h;
        let b = (x - self.xs[i]) / h;
        a * self.ys[i]
            + b * self.ys[i + 1]
            + ((a.powi(3) - a) * self.second[i] + (b.powi(3) - b) * self.second[i + 1]) * h * h
                / 6.0
    }
}
