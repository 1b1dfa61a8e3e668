mod builder;
mod error;
mod payload;
mod script_host;

pub use builder::{BuildResult, FrameBuilder};
pub use error::DecodeError;
pub use payload::decode_payload;
pub use script_host::ScriptHost;
