use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// One timestamped, geolocated point of a path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Entry {
    /// Epoch milliseconds
    #[ts(type = "number")]
    pub time: i64,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub other: String,
    #[serde(default)]
    pub town: String,
    #[serde(default)]
    pub postal: String,
    #[serde(default)]
    pub comment: String,
}
