use chrono::{DateTime, FixedOffset};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("data quality error{}: {message}", describe_location(.timestamp, .column, .value))]
    DataQuality {
        timestamp: Option<DateTime<FixedOffset>>,
        column: Option<String>,
        value: Option<f64>,
        message: String,
    },

    #[error(
        "unfillable gap in `{column}` from {start} to {end}: {missing_points} missing points exceeds limit of {max_gap}"
    )]
    UnfillableGap {
        column: String,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
        missing_points: usize,
        max_gap: usize,
    },

    #[error("solar geometry error: {0}")]
    Geometry(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SimError {
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        SimError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn data_quality(message: impl Into<String>) -> Self {
        SimError::DataQuality {
            timestamp: None,
            column: None,
            value: None,
            message: message.into(),
        }
    }

    /// Data quality error pinned to a single offending value.
    pub fn bad_sample(
        timestamp: DateTime<FixedOffset>,
        column: impl Into<String>,
        value: Option<f64>,
        message: impl Into<String>,
    ) -> Self {
        SimError::DataQuality {
            timestamp: Some(timestamp),
            column: Some(column.into()),
            value,
            message: message.into(),
        }
    }
}

impl From<validator::ValidationErrors> for SimError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors.errors().keys().map(|k| k.to_string()).collect();
        fields.sort();
        SimError::InvalidParameter {
            name: fields.join(", "),
            reason: errors.to_string(),
        }
    }
}

fn describe_location(
    timestamp: &Option<DateTime<FixedOffset>>,
    column: &Option<String>,
    value: &Option<f64>,
) -> String {
    let mut out = String::new();
    if let Some(ts) = timestamp {
        out.push_str(&format!(" at {ts}"));
    }
    if let Some(col) = column {
        out.push_str(&format!(" in `{col}`"));
    }
    if let Some(v) = value {
        out.push_str(&format!(" (value {v})"));
    }
    out
}
