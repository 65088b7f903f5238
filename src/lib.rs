//! # PV Yield Simulator
//!
//! Estimates photovoltaic power and energy yield for a fixed installation,
//! from clear-sky assumptions or observed weather.
//!
//! - [`solar`]: sun position and clear-sky irradiance
//! - [`pipeline`]: cloud attenuation, transposition, cell temperature and power stages
//! - [`weather`]: quality checks, gap detection and filling, sources and cache
//! - [`simulation`]: time grids, the chunked engine, statistics and CSV export

pub mod config;
pub mod domain;
pub mod error;
pub mod pipeline;
pub mod simulation;
pub mod solar;
pub mod telemetry;
pub mod weather;

pub use error::{Result, SimError};
