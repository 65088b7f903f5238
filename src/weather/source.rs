use std::sync::Arc;

use chrono::{DateTime, FixedOffset};

use super::cache::{CacheKey, WeatherCache};
use super::WeatherSeries;
use crate::domain::Location;
use crate::error::Result;

/// Provider of observed or modelled weather for a site and time range
pub trait WeatherSource: Send + Sync {
    fn name(&self) -> &str;

    fn fetch(
        &self,
        location: &Location,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<WeatherSeries>;
}

/// Serves slices of a series held in memory
#[derive(Debug, Clone)]
pub struct StaticSource {
    name: String,
    series: WeatherSeries,
}

impl StaticSource {
    pub fn new(name: impl Into<String>, series: WeatherSeries) -> Self {
        Self {
            name: name.into(),
            series,
        }
    }
}

impl WeatherSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(
        &self,
        _location: &Location,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<WeatherSeries> {
        Ok(self.series.slice(start, end))
    }
}

/// Wraps a source with a [`WeatherCache`]
pub struct CachedSource<S> {
    inner: S,
    cache: Arc<WeatherCache>,
}

impl<S: WeatherSource> CachedSource<S> {
    pub fn new(inner: S, cache: Arc<WeatherCache>) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &WeatherCache {
        &self.cache
    }
}

impl<S: WeatherSource> WeatherSource for CachedSource<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn fetch(
        &self,
        location: &Location,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<WeatherSeries> {
        let key = CacheKey::new(location, start, end, self.inner.name());
        self.cache
            .get_or_fetch(key, || self.inner.fetch(location, start, end))
    }
}
