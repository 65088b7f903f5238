//! # Tabular Export
//!
//! CSV writers for power samples and period rollups. Column order is fixed
//! and downstream tooling relies on it; append new columns at the end.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use super::statistics::PeriodSummary;
use crate::domain::PowerSample;
use crate::error::Result;

pub const SAMPLE_COLUMNS: [&str; 16] = [
    "timestamp",
    "dc_power_w",
    "ac_power_w",
    "poa_global",
    "poa_direct",
    "poa_diffuse",
    "poa_ground",
    "aoi_deg",
    "cell_temperature_c",
    "temperature_factor",
    "ghi",
    "dni",
    "dhi",
    "solar_zenith",
    "solar_elevation",
    "solar_azimuth",
];

pub const ROLLUP_COLUMNS: [&str; 4] = ["period", "energy_kwh", "avg_power_w", "peak_power_w"];

#[derive(Serialize)]
struct SampleRow {
    timestamp: String,
    dc_power_w: f64,
    ac_power_w: Option<f64>,
    poa_global: f64,
    poa_direct: f64,
    poa_diffuse: f64,
    poa_ground: f64,
    aoi_deg: f64,
    cell_temperature_c: f64,
    temperature_factor: f64,
    ghi: f64,
    dni: f64,
    dhi: f64,
    solar_zenith: f64,
    solar_elevation: f64,
    solar_azimuth: f64,
}

impl From<&PowerSample> for SampleRow {
    fn from(s: &PowerSample) -> Self {
        Self {
            timestamp: s.timestamp.to_rfc3339(),
            dc_power_w: s.dc_power_w,
            ac_power_w: s.ac_power_w,
            poa_global: s.poa.global,
            poa_direct: s.poa.direct,
            poa_diffuse: s.poa.sky_diffuse,
            poa_ground: s.poa.ground_diffuse,
            aoi_deg: s.poa.aoi_deg,
            cell_temperature_c: s.cell_temperature_c,
            temperature_factor: s.temperature_factor,
            ghi: s.irradiance.ghi,
            dni: s.irradiance.dni,
            dhi: s.irradiance.dhi,
            solar_zenith: s.sun.zenith_deg,
            solar_elevation: s.sun.elevation_deg,
            solar_azimuth: s.sun.azimuth_deg,
        }
    }
}

#[derive(Serialize)]
struct RollupRow {
    period: String,
    energy_kwh: f64,
    avg_power_w: f64,
    peak_power_w: f64,
}

pub fn write_samples<W: Write>(writer: W, samples: &[PowerSample]) -> Result<()> {
    let mut table = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    table.write_record(SAMPLE_COLUMNS)?;
    for sample in samples {
        table.serialize(SampleRow::from(sample))?;
    }
    table.flush()?;
    Ok(())
}

pub fn write_samples_file(path: impl AsRef<Path>, samples: &[PowerSample]) -> Result<()> {
    let file = BufWriter::new(File::create(path)?);
    write_samples(file, samples)
}

/// One row per period; keys render through `Display` ("2024-06", "2024-06-21").
pub fn write_rollup<W: Write, K: Display>(
    writer: W,
    rollup: &BTreeMap<K, PeriodSummary>,
) -> Result<()> {
    let mut table = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    table.write_record(ROLLUP_COLUMNS)?;
    for (period, summary) in rollup {
        table.serialize(RollupRow {
            period: period.to_string(),
            energy_kwh: summary.energy_kwh,
            avg_power_w: summary.average_power_w,
            peak_power_w: summary.peak_power_w,
        })?;
    }
    table.flush()?;
    Ok(())
}

pub fn write_rollup_file<K: Display>(
    path: impl AsRef<Path>,
    rollup: &BTreeMap<K, PeriodSummary>,
) -> Result<()> {
    let file = BufWriter::new(File::create(path)?);
    write_rollup(file, rollup)
}
