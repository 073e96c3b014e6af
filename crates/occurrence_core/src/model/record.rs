//! Record shapes exchanged with callers.
//!
//! # Invariants
//! - Field names are camelCase on the wire.
//! - A failed record echoes its input fields and carries no derived values.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Caller-supplied record identifier, numeric or text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(i64),
    Text(String),
}

impl Display for RecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Spatial reference as supplied: one of grid reference, easting/northing
/// or latitude/longitude, with the system id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SrefInput {
    pub srid: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gridref: Option<String>,
    #[serde(default, alias = "lat", skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, alias = "lon", skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub easting: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub northing: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<u32>,
}

impl SrefInput {
    pub fn gridref(srid: u32, gridref: impl Into<String>) -> Self {
        Self {
            srid,
            gridref: Some(gridref.into()),
            ..Self::default()
        }
    }

    pub fn easting_northing(srid: u32, easting: f64, northing: f64, accuracy: u32) -> Self {
        Self {
            srid,
            easting: Some(easting),
            northing: Some(northing),
            accuracy: Some(accuracy),
            ..Self::default()
        }
    }

    pub fn lat_lon(latitude: f64, longitude: f64, accuracy: u32) -> Self {
        Self {
            srid: crate::sref::SRID_WGS84,
            latitude: Some(latitude),
            longitude: Some(longitude),
            accuracy: Some(accuracy),
            ..Self::default()
        }
    }
}

/// One occurrence record submitted for verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordInput {
    pub id: RecordId,
    pub date: String,
    pub sref: SrefInput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tvk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
}

/// Overall outcome for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Warn,
    Fail,
}

/// Normalized spatial reference in output records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SrefOutput {
    pub srid: u32,
    pub gridref: String,
    pub country: String,
    pub accuracy: u32,
    pub km100: String,
    pub km10: Option<String>,
}

/// Verification result for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordOutput {
    pub id: RecordId,
    /// Canonical date string, or the input text when parsing failed.
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tvk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_tvk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sref: Option<SrefOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_difficulty: Option<u8>,
    pub result: Verdict,
    pub messages: Vec<String>,
}

impl RecordOutput {
    /// Failure output that only echoes the input.
    pub fn failed(input: &RecordInput, message: impl Into<String>) -> Self {
        Self {
            id: input.id.clone(),
            date: input.date.clone(),
            tvk: input.tvk.clone(),
            name: input.name.clone(),
            stage: input.stage.clone(),
            preferred_tvk: None,
            sref: None,
            id_difficulty: None,
            result: Verdict::Fail,
            messages: vec![message.into()],
        }
    }
}
