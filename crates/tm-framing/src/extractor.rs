use tm_checksum::Checksum;
use tm_model::{FrameDetection, FramingConfig};

use crate::ring_buffer::RingBuffer;

/// Outcome of one attempt to pull a frame out of the ring buffer.
pub enum ExtractStep {
    /// Not enough bytes buffered yet; try again after the next `append`.
    NotEnoughData,
    /// A frame passed framing and checksum validation.
    Emitted(Vec<u8>),
    /// A frame was recovered by the delimiter policy but its checksum did
    /// not match; it was dropped and the buffer advanced past it.
    ChecksumMismatch,
}

/// Stateful frame extraction over one `RingBuffer`, per the active
/// `FramingConfig`. One extractor instance lives for the lifetime of a
/// connection; re-configuring framing requires draining and rebuilding it.
pub struct FrameExtractor {
    config: FramingConfig,
    checksum: &'static dyn Checksum,
    buf: RingBuffer,
    /// `StartOnly` only: offset just past the most recently seen `startSeq`,
    /// i.e. where the in-progress frame begins.
    pending_start: Option<usize>,
    pub checksum_failures: u64,
}

impl FrameExtractor {
    pub fn new(config: FramingConfig, checksum: &'static dyn Checksum, max_buffer_bytes: usize) -> Self {
        Self {
            config,
            checksum,
            buf: RingBuffer::new(max_buffer_bytes),
            pending_start: None,
            checksum_failures: 0,
        }
    }

    pub fn append(&mut self, chunk: &[u8]) {
        self.buf.append(chunk);
    }

    pub fn oversize_drops(&self) -> u64 {
        self.buf.oversize_drops
    }

    /// Drains as many frames as are currently extractable.
    pub fn drain_ready(&mut self) -> Vec<ExtractStep> {
        let mut out = Vec::new();
        loop {
            match self.extract_next() {
                ExtractStep::NotEnoughData => break,
                step => out.push(step),
            }
        }
        out
    }

    pub fn extract_next(&mut self) -> ExtractStep {
        match self.config.mode() {
            FrameDetection::EndDelimiter => self.try_end_delimiter(),
            FrameDetection::StartAndEndDelimiter => self.try_start_and_end(),
            FrameDetection::StartOnly => self.try_start_only(),
            FrameDetection::NoDelimiters => self.try_no_delimiters(),
        }
    }

    fn digest_available(&self, consume_to: usize, digest_len: usize) -> bool {
        digest_len == 0 || self.buf.end_offset() >= consume_to + digest_len
    }

    fn verify(&mut self, payload: &[u8], digest: &[u8]) -> bool {
        if self.checksum.digest_len() == 0 {
            return true;
        }
        let expected = self.checksum.compute(payload);
        if expected == digest {
            true
        } else {
            self.checksum_failures += 1;
            false
        }
    }

    fn try_end_delimiter(&mut self) -> ExtractStep {
        let end_seq = self.config.end_seq().to_vec();
        let Some(end_pos) = self.buf.find(&end_seq, self.buf.base_offset()) else {
            return ExtractStep::NotEnoughData;
        };
        let frame_start = self.buf.base_offset();
        let consume_to = end_pos + end_seq.len();
        let digest_len = self.checksum.digest_len();
        if !self.digest_available(consume_to, digest_len) {
            return ExtractStep::NotEnoughData;
        }
        let payload = self.buf.slice(frame_start, end_pos);
        let digest = self.buf.slice(consume_to, consume_to + digest_len);
        self.buf.consume(consume_to + digest_len);
        if payload.is_empty() {
            return self.extract_next_or_keep_trying();
        }
        self.emit(payload, &digest)
    }

    fn try_start_and_end(&mut self) -> ExtractStep {
        let start_seq = self.config.start_seq().to_vec();
        let end_seq = self.config.end_seq().to_vec();
        loop {
            let Some(start_pos) = self.buf.find(&start_seq, self.buf.base_offset()) else {
                return ExtractStep::NotEnoughData;
            };
            self.buf.consume(start_pos);
            let after_start = start_pos + start_seq.len();
            let Some(end_pos) = self.buf.find(&end_seq, after_start) else {
                return ExtractStep::NotEnoughData;
            };
            if let Some(next_start) = self.buf.find(&start_seq, after_start) {
                if next_start < end_pos {
                    self.buf.consume(next_start);
                    continue;
                }
            }
            let consume_to = end_pos + end_seq.len();
            let digest_len = self.checksum.digest_len();
            if !self.digest_available(consume_to, digest_len) {
                return ExtractStep::NotEnoughData;
            }
            let payload = self.buf.slice(after_start, end_pos);
            let digest = self.buf.slice(consume_to, consume_to + digest_len);
            self.buf.consume(consume_to + digest_len);
            return self.emit(payload, &digest);
        }
    }

    fn try_start_only(&mut self) -> ExtractStep {
        let start_seq = self.config.start_seq().to_vec();
        if self.pending_start.is_none() {
            let Some(pos) = self.buf.find(&start_seq, self.buf.base_offset()) else {
                return ExtractStep::NotEnoughData;
            };
            self.buf.consume(pos);
            self.pending_start = Some(pos + start_seq.len());
        }
        let start = self.pending_start.unwrap();
        let Some(next_pos) = self.buf.find(&start_seq, start) else {
            return ExtractStep::NotEnoughData;
        };
        self.pending_start = Some(next_pos + start_seq.len());
        let digest_len = self.checksum.digest_len();
        let (payload_end, digest_start) = (next_pos.saturating_sub(digest_len), next_pos - digest_len);
        let payload = self.buf.slice(start, payload_end);
        let digest = self.buf.slice(digest_start, next_pos);
        self.buf.consume(next_pos);
        if payload.is_empty() {
            return self.extract_next_or_keep_trying();
        }
        self.emit(payload, &digest)
    }

    fn try_no_delimiters(&mut self) -> ExtractStep {
        if self.buf.is_empty() {
            return ExtractStep::NotEnoughData;
        }
        let digest_len = self.checksum.digest_len();
        let end = self.buf.end_offset();
        let start = self.buf.base_offset();
        if end - start < digest_len {
            return ExtractStep::NotEnoughData;
        }
        let payload_end = end - digest_len;
        let payload = self.buf.slice(start, payload_end);
        let digest = self.buf.slice(payload_end, end);
        self.buf.consume(end);
        self.emit(payload, &digest)
    }

    fn emit(&mut self, payload: Vec<u8>, digest: &[u8]) -> ExtractStep {
        if self.verify(&payload, digest) {
            ExtractStep::Emitted(payload)
        } else {
            ExtractStep::ChecksumMismatch
        }
    }

    /// An empty frame was discarded per the `EndDelimiter`/`StartOnly`
    /// "empty frames are discarded" rule; immediately try for the next one
    /// instead of surfacing a spurious step to the caller.
    fn extract_next_or_keep_trying(&mut self) -> ExtractStep {
        self.extract_next()
    }
}

#[cfg(test)]
mod tests {
    use tm_checksum::lookup;
    use tm_model::FrameDetection;

    use super::*;

    fn extractor(mode: FrameDetection, start: &str, end: &str, checksum: &str) -> FrameExtractor {
        let cfg = FramingConfig::new(mode, start.as_bytes().to_vec(), end.as_bytes().to_vec(), checksum);
        FrameExtractor::new(cfg, lookup(checksum).unwrap(), crate::ring_buffer::DEFAULT_MAX_BUFFER_BYTES)
    }

    #[test]
    fn end_delimiter_emits_between_appends() {
        let mut ex = extractor(FrameDetection::EndDelimiter, "", "\n", "none");
        ex.append(b"abc\ndef\n");
        let steps = ex.drain_ready();
        assert_eq!(steps.len(), 2);
        assert!(matches!(&steps[0], ExtractStep::Emitted(p) if p == b"abc"));
        assert!(matches!(&steps[1], ExtractStep::Emitted(p) if p == b"def"));
    }

    #[test]
    fn end_delimiter_discards_empty_frames() {
        let mut ex = extractor(FrameDetection::EndDelimiter, "", "\n", "none");
        ex.append(b"\n\nabc\n");
        let steps = ex.drain_ready();
        assert_eq!(steps.len(), 1);
        assert!(matches!(&steps[0], ExtractStep::Emitted(p) if p == b"abc"));
    }

    #[test]
    fn start_and_end_resyncs_to_latest_start() {
        let mut ex = extractor(FrameDetection::StartAndEndDelimiter, "$", "#", "none");
        ex.append(b"$junk$abc#");
        let steps = ex.drain_ready();
        assert_eq!(steps.len(), 1);
        assert!(matches!(&steps[0], ExtractStep::Emitted(p) if p == b"abc"));
    }

    #[test]
    fn start_and_end_across_chunk_boundary() {
        let mut ex = extractor(FrameDetection::StartAndEndDelimiter, "/*", "*/", "none");
        ex.append(b"/*abc*");
        assert!(matches!(ex.extract_next(), ExtractStep::NotEnoughData));
        ex.append(b"/def*/");
        let steps = ex.drain_ready();
        assert_eq!(steps.len(), 1);
        assert!(matches!(&steps[0], ExtractStep::Emitted(p) if p == b"abc"));
    }

    #[test]
    fn start_only_buffers_until_second_start() {
        let mut ex = extractor(FrameDetection::StartOnly, "$", "", "none");
        ex.append(b"$abc");
        assert!(matches!(ex.extract_next(), ExtractStep::NotEnoughData));
        ex.append(b"$def");
        assert!(matches!(ex.extract_next(), ExtractStep::Emitted(p) if p == b"abc"));
    }

    #[test]
    fn no_delimiters_emits_each_chunk() {
        let mut ex = extractor(FrameDetection::NoDelimiters, "", "", "none");
        ex.append(b"1,2,3");
        assert!(matches!(ex.extract_next(), ExtractStep::Emitted(p) if p == b"1,2,3"));
    }

    #[test]
    fn checksum_mismatch_is_dropped_not_emitted() {
        let mut ex = extractor(FrameDetection::EndDelimiter, "", "\n", "xor-8");
        ex.append(b"abc\n\x00\n"); // wrong digest byte
        assert!(matches!(ex.extract_next(), ExtractStep::ChecksumMismatch));
    }

    #[test]
    fn start_and_end_reads_digest_after_end_seq() {
        // Digest placement is `startSeq + payload + endSeq + digest`,
        // matching the EndDelimiter path rather than a digest sandwiched
        // between payload and endSeq.
        let checksum = lookup("xor-8").unwrap();
        let payload = b"hello";
        let digest = checksum.compute(payload);
        let mut ex = extractor(FrameDetection::StartAndEndDelimiter, "$", "#", "xor-8");
        ex.append(b"$hello#");
        ex.append(&digest);
        assert!(matches!(ex.extract_next(), ExtractStep::Emitted(p) if p == payload));
    }

    #[test]
    fn checksum_round_trip_with_correct_digest() {
        let checksum = lookup("xor-8").unwrap();
        let payload = b"abc";
        let digest = checksum.compute(payload);
        let mut ex = extractor(FrameDetection::EndDelimiter, "", "\n", "xor-8");
        ex.append(payload);
        ex.append(b"\n");
        ex.append(&digest);
        assert!(matches!(ex.extract_next(), ExtractStep::Emitted(p) if p == payload));
    }
}
