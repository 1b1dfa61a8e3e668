use serde::{Deserialize, Serialize};

/// A byte sequence that passed framing and checksum validation, ready for
/// the frame builder. Ownership transfers from the frame reader to the
/// frame builder across the frame queue.
pub type RawFrame = Vec<u8>;

/// Positional dataset values produced by the decoder: the i-th string is
/// the value of the i-th declared dataset.
pub type ChannelList = Vec<String>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DatasetValue {
    Text(String),
    Number(f64),
}

impl DatasetValue {
    pub fn as_str_lossy(&self) -> String {
        match self {
            DatasetValue::Text(s) => s.clone(),
            DatasetValue::Number(n) => n.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub title: String,
    pub units: String,
    pub widget: String,
    /// Stable 1-based position matching the project descriptor's `index`.
    pub index: u32,
    pub value: DatasetValue,
    #[serde(rename = "alarmLow", skip_serializing_if = "Option::is_none")]
    pub alarm_low: Option<f64>,
    #[serde(rename = "alarmHigh", skip_serializing_if = "Option::is_none")]
    pub alarm_high: Option<f64>,
    #[serde(default)]
    pub fft: bool,
    #[serde(default)]
    pub log: bool,
    #[serde(rename = "historyDepth", skip_serializing_if = "Option::is_none")]
    pub history_depth: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub title: String,
    pub widget: String,
    pub datasets: Vec<Dataset>,
}

/// A fully decoded telemetry sample, ready for dispatch to the
/// visualization aggregator, CSV writer, and plugin broadcaster.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TelemetryFrame {
    pub title: String,
    pub groups: Vec<Group>,
}

impl TelemetryFrame {
    pub fn dataset_count(&self) -> usize {
        self.groups.iter().map(|g| g.datasets.len()).sum()
    }

    pub fn datasets(&self) -> impl Iterator<Item = &Dataset> {
        self.groups.iter().flat_map(|g| g.datasets.iter())
    }

    pub fn datasets_mut(&mut self) -> impl Iterator<Item = &mut Dataset> {
        self.groups.iter_mut().flat_map(|g| g.datasets.iter_mut())
    }
}
