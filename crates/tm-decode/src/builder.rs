use tm_model::{
    ChannelList, Dataset, DatasetValue, DecoderConfig, Group, OperatingMode, ProjectDescriptor,
    TelemetryFrame,
};

use crate::error::DecodeError;
use crate::payload::decode_payload;
use crate::script_host::ScriptHost;

/// A dataset is treated as numeric when the project descriptor attaches any
/// numeric-only facet to it (alarms, min/max bounds, FFT/log plotting).
/// Datasets without any of these are left as opaque text, matching widgets
/// like a raw terminal view that never needs to parse their value.
fn dataset_is_numeric(d: &tm_model::DatasetDescriptor) -> bool {
    d.alarm_low.is_some() || d.alarm_high.is_some() || d.min.is_some() || d.max.is_some() || d.fft || d.log
}

pub struct BuildResult {
    pub structural_change: bool,
    pub frame: TelemetryFrame,
}

/// Transforms validated raw frames into [`TelemetryFrame`]s per the active
/// [`OperatingMode`]. Lives on the ingest thread downstream of the frame
/// queue; has no back-reference to the manager.
pub struct FrameBuilder {
    mode: OperatingMode,
    project: Option<ProjectDescriptor>,
    script_host: Option<ScriptHost>,
    skeleton: TelemetryFrame,
    pub channel_count_mismatches: u64,
    pub field_parse_errors: u64,
}

impl FrameBuilder {
    /// ProjectFile mode: the skeleton is fixed for the session, loaded from
    /// `project` at construction (mirroring the "immutable snapshot taken at
    /// Connect" rule).
    pub fn for_project_file(project: ProjectDescriptor) -> Result<Self, DecodeError> {
        let script_host = match &project.decoder {
            Some(DecoderConfig { source, .. }) => Some(ScriptHost::compile(source)?),
            None => None,
        };
        let skeleton = skeleton_from_project(&project);
        Ok(Self {
            mode: OperatingMode::ProjectFile,
            project: Some(project),
            script_host,
            skeleton,
            channel_count_mismatches: 0,
            field_parse_errors: 0,
        })
    }

    pub fn for_quick_plot() -> Self {
        Self {
            mode: OperatingMode::QuickPlot,
            project: None,
            script_host: None,
            skeleton: TelemetryFrame { title: "QuickPlot".to_string(), groups: Vec::new() },
            channel_count_mismatches: 0,
            field_parse_errors: 0,
        }
    }

    pub fn for_device_sends_json() -> Self {
        Self {
            mode: OperatingMode::DeviceSendsJSON,
            project: None,
            script_host: None,
            skeleton: TelemetryFrame { title: "Device".to_string(), groups: Vec::new() },
            channel_count_mismatches: 0,
            field_parse_errors: 0,
        }
    }

    pub fn build(&mut self, raw: &[u8]) -> Result<Option<BuildResult>, DecodeError> {
        match self.mode {
            OperatingMode::ProjectFile => self.build_project_file(raw),
            OperatingMode::QuickPlot => Ok(Some(self.build_quick_plot(raw))),
            OperatingMode::DeviceSendsJSON => self.build_device_json(raw),
        }
    }

    fn build_project_file(&mut self, raw: &[u8]) -> Result<Option<BuildResult>, DecodeError> {
        let project = self.project.as_ref().expect("project snapshot set for ProjectFile mode");
        let converted = decode_payload(project.payload_encoding, raw)?;

        let channels: ChannelList = match &self.script_host {
            Some(host) => {
                let text = String::from_utf8_lossy(&converted).into_owned();
                host.parse(&text)?
            }
            None => {
                let text = String::from_utf8_lossy(&converted).into_owned();
                text.split(',').map(|s| s.trim().to_string()).collect()
            }
        };

        let declared = project.dataset_count();
        if channels.len() != declared {
            self.channel_count_mismatches += 1;
            return Ok(None);
        }

        let descriptors: Vec<_> = project.datasets_in_order().collect();
        for (dataset, value) in self.skeleton.datasets_mut().zip(channels.iter()) {
            let descriptor = descriptors.iter().find(|d| d.index == dataset.index);
            let numeric = descriptor.map(dataset_is_numeric).unwrap_or(false);
            if numeric {
                match value.parse::<f64>() {
                    Ok(n) => dataset.value = DatasetValue::Number(n),
                    Err(_) => self.field_parse_errors += 1,
                }
            } else {
                dataset.value = DatasetValue::Text(value.clone());
            }
        }

        Ok(Some(BuildResult { structural_change: false, frame: self.skeleton.clone() }))
    }

    fn build_quick_plot(&mut self, raw: &[u8]) -> BuildResult {
        let text = String::from_utf8_lossy(raw);
        let values: Vec<String> = text.trim().split(',').map(|s| s.trim().to_string()).collect();

        let structural_change = values.len() != self.skeleton.dataset_count();
        if structural_change {
            self.skeleton = quick_plot_skeleton(values.len());
        }

        for (dataset, value) in self.skeleton.datasets_mut().zip(values.iter()) {
            dataset.value = match value.parse::<f64>() {
                Ok(n) => DatasetValue::Number(n),
                Err(_) => DatasetValue::Text(value.clone()),
            };
        }

        BuildResult { structural_change, frame: self.skeleton.clone() }
    }

    fn build_device_json(&mut self, raw: &[u8]) -> Result<Option<BuildResult>, DecodeError> {
        let frame: TelemetryFrame = match serde_json::from_slice(raw) {
            Ok(f) => f,
            Err(_) => return Ok(None),
        };
        self.skeleton = frame.clone();
        Ok(Some(BuildResult { structural_change: true, frame }))
    }
}

fn skeleton_from_project(project: &ProjectDescriptor) -> TelemetryFrame {
    let groups = project
        .groups
        .iter()
        .map(|g| Group {
            title: g.title.clone(),
            widget: g.widget.clone(),
            datasets: g
                .datasets
                .iter()
                .map(|d| Dataset {
                    title: d.title.clone(),
                    units: d.units.clone(),
                    widget: d.widget.clone(),
                    index: d.index,
                    value: if dataset_is_numeric(d) { DatasetValue::Number(0.0) } else { DatasetValue::Text(String::new()) },
                    alarm_low: d.alarm_low,
                    alarm_high: d.alarm_high,
                    fft: d.fft,
                    log: d.log,
                    history_depth: d.history_depth,
                })
                .collect(),
        })
        .collect();
    TelemetryFrame { title: project.title.clone(), groups }
}

fn quick_plot_skeleton(column_count: usize) -> TelemetryFrame {
    let datasets = (0..column_count)
        .map(|i| Dataset {
            title: format!("Series {}", i + 1),
            units: String::new(),
            widget: "plot".to_string(),
            index: i as u32 + 1,
            value: DatasetValue::Number(0.0),
            alarm_low: None,
            alarm_high: None,
            fft: false,
            log: false,
            history_depth: None,
        })
        .collect();
    TelemetryFrame {
        title: "QuickPlot".to_string(),
        groups: vec![Group { title: "QuickPlot".to_string(), widget: "group".to_string(), datasets }],
    }
}

#[cfg(test)]
mod tests {
    use tm_model::{DatasetDescriptor, FrameDetection, GroupDescriptor, PayloadEncoding};

    use super::*;

    fn sample_project() -> ProjectDescriptor {
        ProjectDescriptor {
            title: "demo".to_string(),
            decoder: None,
            frame_start: String::new(),
            frame_end: "\n".to_string(),
            frame_detection: FrameDetection::EndDelimiter,
            checksum: "none".to_string(),
            payload_encoding: PayloadEncoding::PlainText,
            groups: vec![GroupDescriptor {
                title: "g1".to_string(),
                widget: "group".to_string(),
                datasets: vec![
                    DatasetDescriptor {
                        title: "Temp".to_string(),
                        units: "C".to_string(),
                        widget: "plot".to_string(),
                        index: 1,
                        alarm_low: Some(0.0),
                        alarm_high: Some(100.0),
                        fft: false,
                        log: false,
                        graph: true,
                        history_depth: None,
                        min: None,
                        max: None,
                    },
                    DatasetDescriptor {
                        title: "Label".to_string(),
                        units: String::new(),
                        widget: "terminal".to_string(),
                        index: 2,
                        alarm_low: None,
                        alarm_high: None,
                        fft: false,
                        log: false,
                        graph: false,
                        history_depth: None,
                        min: None,
                        max: None,
                    },
                ],
            }],
        }
    }

    #[test]
    fn project_file_assigns_values_positionally() {
        let mut builder = FrameBuilder::for_project_file(sample_project()).unwrap();
        let result = builder.build(b"42.5,ready").unwrap().unwrap();
        assert_eq!(result.frame.groups[0].datasets[0].value, DatasetValue::Number(42.5));
        assert_eq!(result.frame.groups[0].datasets[1].value, DatasetValue::Text("ready".to_string()));
    }

    #[test]
    fn project_file_drops_on_channel_count_mismatch() {
        let mut builder = FrameBuilder::for_project_file(sample_project()).unwrap();
        assert!(builder.build(b"only_one_field").unwrap().is_none());
        assert_eq!(builder.channel_count_mismatches, 1);
    }

    #[test]
    fn project_file_keeps_previous_value_on_parse_failure() {
        let mut builder = FrameBuilder::for_project_file(sample_project()).unwrap();
        builder.build(b"42.5,ready").unwrap();
        let result = builder.build(b"not_a_number,still_ready").unwrap().unwrap();
        assert_eq!(result.frame.groups[0].datasets[0].value, DatasetValue::Number(42.5));
        assert_eq!(builder.field_parse_errors, 1);
    }

    #[test]
    fn quick_plot_rebuilds_skeleton_on_column_change() {
        let mut builder = FrameBuilder::for_quick_plot();
        let first = builder.build(b"1,2,3").unwrap().unwrap();
        assert!(first.structural_change);
        assert_eq!(first.frame.dataset_count(), 3);

        let second = builder.build(b"4,5,6").unwrap().unwrap();
        assert!(!second.structural_change);

        let third = builder.build(b"7,8").unwrap().unwrap();
        assert!(third.structural_change);
        assert_eq!(third.frame.dataset_count(), 2);
    }

    #[test]
    fn device_json_replaces_skeleton_each_frame() {
        let mut builder = FrameBuilder::for_device_sends_json();
        let json = br#"{"title":"dev","groups":[{"title":"g","widget":"group","datasets":[
            {"title":"x","units":"","widget":"plot","index":1,"value":{"Number":1.0},"fft":false,"log":false}
        ]}]}"#;
        let result = builder.build(json).unwrap().unwrap();
        assert!(result.structural_change);
        assert_eq!(result.frame.title, "dev");
    }

    #[test]
    fn device_json_drops_on_parse_failure() {
        let mut builder = FrameBuilder::for_device_sends_json();
        assert!(builder.build(b"not json").unwrap().is_none());
    }
}
