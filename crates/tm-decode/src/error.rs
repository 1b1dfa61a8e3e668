use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is not valid hexadecimal: {0}")]
    InvalidHex(String),
    #[error("payload is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("payload is not valid utf-8")]
    InvalidUtf8,
    #[error("decoder script failed to compile: {0}")]
    ScriptCompile(String),
    #[error("decoder script raised a runtime error: {0}")]
    ScriptRuntime(String),
    #[error("decoder script's parse() did not return an array of strings")]
    ScriptReturnType,
    #[error("channel count mismatch: decoder produced {produced}, project declares {declared}")]
    ChannelCountMismatch { produced: usize, declared: usize },
    #[error("frame is not valid json")]
    InvalidJson(#[from] serde_json::Error),
    #[error("frame does not match the project descriptor schema")]
    SchemaMismatch,
}
