//! # Yield Simulation
//!
//! Applies the irradiance-to-power pipeline across a time range and
//! aggregates the results.
//!
//! ## Components
//!
//! - **TimeGrid**: evenly spaced, time-zone aware timestamps for a range or a calendar year
//! - **Engine**: chunked (optionally parallel) evaluation with progress reporting and cooperative cancellation
//! - **Statistics**: mergeable accumulator for energy, capacity factor, performance ratio and monthly/daily rollups
//! - **Export**: CSV writers with a fixed column order
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pv_yield_simulator::domain::{Location, PanelArray};
//! use pv_yield_simulator::pipeline::{ClearSkyConditions, Pipeline};
//! use pv_yield_simulator::simulation::{
//!     SimulationEngine, SimulationOptions, SimulationPeriod, WeatherInput,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! # fn main() -> pv_yield_simulator::error::Result<()> {
//! let location = Location::new(48.14, 11.58, 520.0, "Europe/Berlin")?;
//! let panel = PanelArray::new(16.0, 0.21, 30.0, 180.0)?;
//! let pipeline = Pipeline::with_defaults(&panel);
//! let engine = SimulationEngine::new(location, panel, pipeline, SimulationOptions::default())?;
//!
//! let result = engine.run(
//!     SimulationPeriod::Year(2024),
//!     WeatherInput::ClearSky(ClearSkyConditions::default()),
//!     None,
//!     &CancellationToken::new(),
//! )?;
//! println!("{:.0} kWh", result.statistics.total_energy_kwh);
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod export;
pub mod statistics;
pub mod timegrid;

pub use engine::{
    Progress, ProgressCallback, RunStatus, SampleErrorPolicy, SimulationEngine,
    SimulationOptions, SimulationPeriod, SimulationResult, SkippedSample, WeatherGate,
    WeatherInput,
};
pub use statistics::{MonthKey, PeriodSummary, SimulationStatistics, StatisticsAccumulator};
pub use timegrid::TimeGrid;
