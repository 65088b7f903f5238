use chrono::{DateTime, FixedOffset};
use solar_positioning::{spa, time::DeltaT, RefractionCorrection};

use crate::domain::{Location, SunPosition};
use crate::error::{Result, SimError};

/// Apparent sun position from the NREL SPA with standard refraction.
pub fn spa_position(timestamp: DateTime<FixedOffset>, location: &Location) -> Result<SunPosition> {
    let delta_t = DeltaT::estimate_from_date_like(timestamp)
        .map_err(|e| SimError::Geometry(format!("delta T for {timestamp}: {e}")))?;
    let position = spa::solar_position(
        timestamp,
        location.latitude(),
        location.longitude(),
        location.altitude(),
        delta_t,
        Some(RefractionCorrection::standard()),
    )
    .map_err(|e| SimError::Geometry(format!("sun position for {timestamp}: {e}")))?;

    Ok(SunPosition {
        zenith_deg: position.zenith_angle(),
        elevation_deg: position.elevation_angle(),
        azimuth_deg: position.azimuth(),
    })
}
