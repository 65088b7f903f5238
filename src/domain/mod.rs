//! Core value types shared by the pipeline, the weather gate and the engine.

pub mod irradiance;
pub mod sample;
pub mod site;
pub mod weather;

pub use irradiance::*;
pub use sample::*;
pub use site::{Location, PanelArray, DEFAULT_TEMP_COEFFICIENT};
pub use weather::*;
