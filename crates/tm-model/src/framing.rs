use serde::{Deserialize, Serialize};

/// How the frame reader recovers application frames from a byte stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameDetection {
    EndDelimiter,
    StartAndEndDelimiter,
    StartOnly,
    NoDelimiters,
}

/// Immutable framing parameters for one session. Changing this at runtime
/// requires draining the ring buffer and rebuilding the frame reader.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FramingConfig {
    mode: FrameDetection,
    #[serde(with = "bytes_as_string", rename = "frameStart")]
    start_seq: Vec<u8>,
    #[serde(with = "bytes_as_string", rename = "frameEnd")]
    end_seq: Vec<u8>,
    #[serde(rename = "checksum")]
    checksum_name: String,
}

impl FramingConfig {
    pub fn new(
        mode: FrameDetection,
        start_seq: impl Into<Vec<u8>>,
        end_seq: impl Into<Vec<u8>>,
        checksum_name: impl Into<String>,
    ) -> Self {
        let start_seq = start_seq.into();
        let end_seq = end_seq.into();
        // startSeq == endSeq under StartAndEndDelimiter is pinned to
        // EndDelimiter semantics: with identical delimiters there is no
        // meaningful "start" to anchor on.
        let mode = if mode == FrameDetection::StartAndEndDelimiter
            && !start_seq.is_empty()
            && start_seq == end_seq
        {
            FrameDetection::EndDelimiter
        } else {
            mode
        };
        Self { mode, start_seq, end_seq, checksum_name: checksum_name.into() }
    }

    pub fn mode(&self) -> FrameDetection {
        self.mode
    }

    pub fn start_seq(&self) -> &[u8] {
        &self.start_seq
    }

    pub fn end_seq(&self) -> &[u8] {
        &self.end_seq
    }

    pub fn checksum_name(&self) -> &str {
        &self.checksum_name
    }
}

mod bytes_as_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(s.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_start_and_end_downgrades_to_end_delimiter() {
        let cfg = FramingConfig::new(FrameDetection::StartAndEndDelimiter, "||", "||", "none");
        assert_eq!(cfg.mode(), FrameDetection::EndDelimiter);
    }

    #[test]
    fn distinct_delimiters_keep_mode() {
        let cfg = FramingConfig::new(FrameDetection::StartAndEndDelimiter, "$", "#", "none");
        assert_eq!(cfg.mode(), FrameDetection::StartAndEndDelimiter);
    }

    #[test]
    fn roundtrips_through_json() {
        let cfg = FramingConfig::new(FrameDetection::EndDelimiter, "", "\n", "CRC-8");
        let json = serde_json::to_string(&cfg).unwrap();
        let back: FramingConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }
}
