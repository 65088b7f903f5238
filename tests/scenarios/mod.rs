mod annual;
mod pipeline;
mod weather_gate;

use chrono::{DateTime, FixedOffset};
use pv_yield_simulator::domain::{Location, PanelArray};

/// Sea-level mid-latitude site on the prime meridian
pub fn mid_latitude_site() -> Location {
    Location::new(40.0, 0.0, 0.0, "UTC").unwrap()
}

/// 10 m² at 20 %, south facing, 35° tilt
pub fn south_array() -> PanelArray {
    PanelArray::new(10.0, 0.2, 35.0, 180.0).unwrap()
}

pub fn ts(rfc3339: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(rfc3339).unwrap()
}
