//! # Weather Quality Gate
//!
//! Everything that happens to weather data before it reaches the pipeline:
//! validation of the series, per-sample quality flags, gap detection and
//! gap filling, plus the sources and cache that supply the data.

pub mod cache;
pub mod cadence;
pub mod fill;
pub mod gaps;
pub mod quality;
pub mod series;
pub mod source;

pub use cache::{CacheKey, WeatherCache, DEFAULT_TTL};
pub use cadence::Cadence;
pub use fill::{fill, fill_with_fallback, FillMethod, FillOptions, OversizeGap, DEFAULT_MAX_GAP};
pub use gaps::{detect_gaps, detect_gaps_with, Gap};
pub use quality::{check, malformed_columns, QualityFlags, QualityReport, QualityThresholds};
pub use series::WeatherSeries;
pub use source::{CachedSource, StaticSource, WeatherSource};
