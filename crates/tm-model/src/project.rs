use serde::{Deserialize, Serialize};

/// Selects how raw frames become [`crate::TelemetryFrame`]s.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperatingMode {
    ProjectFile,
    QuickPlot,
    DeviceSendsJSON,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum PayloadEncoding {
    PlainText,
    Hexadecimal,
    Base64,
    Binary,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Accepted for compatibility with project files that still say "js";
    /// the decoder host interprets the source as a scripting-engine script
    /// regardless of this field's value.
    pub language: String,
    pub source: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatasetDescriptor {
    pub title: String,
    #[serde(default)]
    pub units: String,
    pub widget: String,
    pub index: u32,
    #[serde(rename = "alarmLow", skip_serializing_if = "Option::is_none")]
    pub alarm_low: Option<f64>,
    #[serde(rename = "alarmHigh", skip_serializing_if = "Option::is_none")]
    pub alarm_high: Option<f64>,
    #[serde(default)]
    pub fft: bool,
    #[serde(default)]
    pub log: bool,
    #[serde(default)]
    pub graph: bool,
    #[serde(rename = "historyDepth", skip_serializing_if = "Option::is_none")]
    pub history_depth: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupDescriptor {
    pub title: String,
    pub widget: String,
    pub datasets: Vec<DatasetDescriptor>,
}

/// The user-declared shape of the telemetry this project produces, as
/// loaded from a project file. Immutable once a session connects.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectDescriptor {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decoder: Option<DecoderConfig>,
    #[serde(rename = "frameStart", default)]
    pub frame_start: String,
    #[serde(rename = "frameEnd", default)]
    pub frame_end: String,
    #[serde(rename = "frameDetection")]
    pub frame_detection: crate::framing::FrameDetection,
    pub checksum: String,
    #[serde(rename = "payloadEncoding")]
    pub payload_encoding: PayloadEncoding,
    pub groups: Vec<GroupDescriptor>,
}

impl ProjectDescriptor {
    pub fn dataset_count(&self) -> usize {
        self.groups.iter().map(|g| g.datasets.len()).sum()
    }

    /// Datasets in declaration order, flattened across groups. Index `i`
    /// here corresponds to `ChannelList[i]` per the positional contract.
    pub fn datasets_in_order(&self) -> impl Iterator<Item = &DatasetDescriptor> {
        self.groups.iter().flat_map(|g| g.datasets.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FrameDetection;

    #[test]
    fn parses_minimal_descriptor() {
        let json = r#"{
            "title": "demo",
            "frameStart": "",
            "frameEnd": "\n",
            "frameDetection": "EndDelimiter",
            "checksum": "none",
            "payloadEncoding": "PlainText",
            "groups": [
                { "title": "g1", "widget": "group", "datasets": [
                    { "title": "Temp", "units": "C", "widget": "plot", "index": 1 }
                ]}
            ]
        }"#;
        let proj: ProjectDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(proj.dataset_count(), 1);
        assert_eq!(proj.frame_detection, FrameDetection::EndDelimiter);
    }
}
