mod frame;
mod framing;
mod project;
mod state;

pub use frame::{ChannelList, Dataset, DatasetValue, Group, RawFrame, TelemetryFrame};
pub use framing::{FrameDetection, FramingConfig};
pub use project::{
    DatasetDescriptor, DecoderConfig, GroupDescriptor, OperatingMode, PayloadEncoding,
    ProjectDescriptor,
};
pub use state::{DriverState, ManagerState};
