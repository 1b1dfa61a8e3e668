use tm_utils::ArrayVec;

/// Max bytes a single validated frame may carry through the frame queue.
///
/// The queue is built on fixed-size `Seqlock` slots, so frames are copied
/// into a capacity-bounded buffer here rather than boxed individually.
/// Frames larger than this are dropped at the reader with an oversize
/// `FrameError`, same family as the ring buffer's high-water drop.
pub const MAX_FRAME_BYTES: usize = 65536;

pub type RawFrameSlot = ArrayVec<u8, MAX_FRAME_BYTES>;

pub fn slot_from_bytes(bytes: &[u8]) -> Option<RawFrameSlot> {
    if bytes.len() > MAX_FRAME_BYTES {
        return None;
    }
    let mut slot = RawFrameSlot::default();
    slot.extend(bytes.iter().copied());
    Some(slot)
}
