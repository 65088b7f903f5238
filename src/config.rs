use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use figment::{providers::{Env, Format, Toml}, Figment};
use serde::Deserialize;

use crate::domain::{Location, PanelArray, DEFAULT_TEMP_COEFFICIENT};
use crate::pipeline::{
    ClearSkyConditions, CloudCover, CloudModel, DerateFactors, DiffuseModel, IamModel, ModelSet,
    Pipeline, ThermalModel, ThermalModelKind, DEFAULT_ALBEDO, DEFAULT_WIND_SPEED,
};
use crate::simulation::{
    engine::{DEFAULT_CHUNK_SIZE, DEFAULT_PROGRESS_EVERY},
    SampleErrorPolicy, SimulationEngine, SimulationOptions, WeatherGate,
};
use crate::solar::{SpaIneichen, DEFAULT_LINKE_TURBIDITY};
use crate::weather::{
    FillMethod, FillOptions, OversizeGap, QualityThresholds, WeatherCache, DEFAULT_MAX_GAP,
};

pub const DEFAULT_CONFIG_FILE: &str = "config/default.toml";
pub const ENV_PREFIX: &str = "PVSIM__";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    pub array: ArrayConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub quality: QualityConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude: f64,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}
impl SiteConfig {
    pub fn location(&self) -> Result<Location> {
        Ok(Location::new(self.latitude, self.longitude, self.altitude, &self.timezone)?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArrayConfig {
    pub area_m2: f64,
    pub efficiency: f64,
    pub tilt_deg: f64,
    pub azimuth_deg: f64,
    #[serde(default = "default_temp_coefficient")]
    pub temp_coefficient: f64,
    pub noct_c: Option<f64>,
}
impl ArrayConfig {
    pub fn panel(&self) -> Result<PanelArray> {
        Ok(PanelArray::from_parts(
            self.area_m2,
            self.efficiency,
            self.tilt_deg,
            self.azimuth_deg,
            self.temp_coefficient,
            self.noct_c,
        )?)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub cloud: CloudModel,
    pub diffuse: DiffuseModel,
    pub iam: IamModel,
    pub thermal: ThermalModelKind,
    pub albedo: f64,
    pub linke_turbidity: f64,
}
impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            cloud: CloudModel::default(),
            diffuse: DiffuseModel::default(),
            iam: IamModel::default(),
            thermal: ThermalModelKind::default(),
            albedo: DEFAULT_ALBEDO,
            linke_turbidity: DEFAULT_LINKE_TURBIDITY,
        }
    }
}
impl ModelsConfig {
    pub fn model_set(&self, panel: &PanelArray) -> ModelSet {
        ModelSet {
            cloud: self.cloud,
            diffuse: self.diffuse,
            iam: self.iam,
            thermal: ThermalModel::standard(self.thermal, panel),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub year: i32,
    pub interval_minutes: u32,
    pub chunk_size: usize,
    pub progress_every: usize,
    pub parallel: bool,
    pub skip_invalid_samples: bool,
    /// Observed weather as a JSON array of samples; clear sky when absent
    pub weather_file: Option<PathBuf>,
    pub ambient_temp_c: f64,
    pub wind_speed: f64,
    pub cloud_cover_percent: f64,
    pub soiling: f64,
    pub degradation: f64,
    pub inverter_efficiency: Option<f64>,
}
impl Default for SimulationConfig {
    fn default() -> Self {
        let clear = ClearSkyConditions::default();
        Self {
            year: 2024,
            interval_minutes: 60,
            chunk_size: DEFAULT_CHUNK_SIZE,
            progress_every: DEFAULT_PROGRESS_EVERY,
            parallel: true,
            skip_invalid_samples: false,
            weather_file: None,
            ambient_temp_c: clear.ambient_temp_c,
            wind_speed: DEFAULT_WIND_SPEED,
            cloud_cover_percent: 0.0,
            soiling: 1.0,
            degradation: 1.0,
            inverter_efficiency: None,
        }
    }
}
impl SimulationConfig {
    pub fn options(&self) -> SimulationOptions {
        SimulationOptions {
            interval_minutes: self.interval_minutes,
            chunk_size: self.chunk_size,
            progress_every: self.progress_every,
            parallel: self.parallel,
            on_invalid_sample: if self.skip_invalid_samples {
                SampleErrorPolicy::SkipAndFlag
            } else {
                SampleErrorPolicy::Abort
            },
        }
    }

    pub fn derate(&self) -> DerateFactors {
        DerateFactors {
            soiling: self.soiling,
            degradation: self.degradation,
            inverter_efficiency: self.inverter_efficiency,
        }
    }

    pub fn clear_sky(&self) -> ClearSkyConditions {
        ClearSkyConditions {
            ambient_temp_c: self.ambient_temp_c,
            wind_speed: self.wind_speed,
            cloud_cover: CloudCover::Percent(self.cloud_cover_percent),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    pub night_irradiance: f64,
    pub consistency_tolerance: f64,
    pub fill: bool,
    pub fill_method: FillMethod,
    /// Longest run filled, in samples; `None` fills every run
    pub max_gap: Option<usize>,
    pub oversize: OversizeGap,
}
impl Default for QualityConfig {
    fn default() -> Self {
        let thresholds = QualityThresholds::default();
        Self {
            night_irradiance: thresholds.night_irradiance,
            consistency_tolerance: thresholds.consistency_tolerance,
            fill: true,
            fill_method: FillMethod::default(),
            max_gap: Some(DEFAULT_MAX_GAP),
            oversize: OversizeGap::default(),
        }
    }
}
impl QualityConfig {
    pub fn gate(&self) -> WeatherGate {
        WeatherGate {
            thresholds: QualityThresholds {
                night_irradiance: self.night_irradiance,
                consistency_tolerance: self.consistency_tolerance,
            },
            fill: self.fill.then(|| {
                FillOptions::new(self.fill_method)
                    .limit(self.max_gap)
                    .oversize(self.oversize)
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory for cached series; memory only when absent
    pub dir: Option<PathBuf>,
    pub ttl_seconds: u64,
}
impl Default for CacheConfig {
    fn default() -> Self {
        Self { dir: None, ttl_seconds: 86_400 }
    }
}
impl CacheConfig {
    pub fn build(&self) -> Result<WeatherCache> {
        let ttl = Duration::from_secs(self.ttl_seconds);
        match &self.dir {
            Some(dir) => WeatherCache::on_disk(dir, ttl)
                .with_context(|| format!("opening weather cache at {}", dir.display())),
            None => Ok(WeatherCache::in_memory(ttl)),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub samples_csv: Option<PathBuf>,
    pub monthly_csv: Option<PathBuf>,
    pub daily_csv: Option<PathBuf>,
    pub statistics_json: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        // a missing .env is fine
        let _ = dotenvy::dotenv();
        let figment = Figment::new()
            .merge(Toml::file(DEFAULT_CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(figment)
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        figment.extract().context("invalid configuration")
    }

    pub fn pipeline(&self, panel: &PanelArray) -> Result<Pipeline> {
        let geometry = Arc::new(SpaIneichen::new(self.models.linke_turbidity)?);
        Ok(Pipeline::new(
            geometry,
            self.models.model_set(panel),
            self.models.albedo,
            self.simulation.derate(),
        )?)
    }

    /// Location, array, pipeline and gate assembled into a ready engine
    pub fn engine(&self) -> Result<SimulationEngine> {
        let location = self.site.location()?;
        let panel = self.array.panel()?;
        let pipeline = self.pipeline(&panel)?;
        let engine = SimulationEngine::new(location, panel, pipeline, self.simulation.options())?
            .with_gate(self.quality.gate());
        Ok(engine)
    }
}

fn default_timezone() -> String {
    "UTC".into()
}

fn default_temp_coefficient() -> f64 {
    DEFAULT_TEMP_COEFFICIENT
}
