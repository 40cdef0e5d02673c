//! Sparse, frame-stamped event channels.
//!
//! Each record is a little-endian `u32` frame number followed by a payload
//! in the caller's [`EventPayload`] encoding. Records are written in
//! non-decreasing frame order and must be consumed on exactly the frame
//! they were recorded on.

use tracing::warn;

use retrace_core::FrameId;

use crate::codec::{write_f32_le, write_i32_le, write_u32_le, write_u8, ByteCursor};
use crate::error::CodecError;

/// A value that can ride on an event channel.
///
/// The encoding is not self-describing: the reader must decode with the
/// same type the writer used.
pub trait EventPayload: Sized {
    /// Append the encoded payload.
    fn encode(&self, buf: &mut Vec<u8>);
    /// Decode one payload.
    fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self, CodecError>;
}

impl EventPayload for () {
    fn encode(&self, _buf: &mut Vec<u8>) {}

    fn decode(_cursor: &mut ByteCursor<'_>) -> Result<Self, CodecError> {
        Ok(())
    }
}

impl EventPayload for bool {
    fn encode(&self, buf: &mut Vec<u8>) {
        write_u8(buf, u8::from(*self));
    }

    fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self, CodecError> {
        Ok(cursor.read_u8()? != 0)
    }
}

impl EventPayload for u8 {
    fn encode(&self, buf: &mut Vec<u8>) {
        write_u8(buf, *self);
    }

    fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self, CodecError> {
        cursor.read_u8()
    }
}

impl EventPayload for u32 {
    fn encode(&self, buf: &mut Vec<u8>) {
        write_u32_le(buf, *self);
    }

    fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self, CodecError> {
        cursor.read_u32_le()
    }
}

impl EventPayload for i32 {
    fn encode(&self, buf: &mut Vec<u8>) {
        write_i32_le(buf, *self);
    }

    fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self, CodecError> {
        cursor.read_i32_le()
    }
}

impl EventPayload for f32 {
    fn encode(&self, buf: &mut Vec<u8>) {
        write_f32_le(buf, *self);
    }

    fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self, CodecError> {
        cursor.read_f32_le()
    }
}

impl<const N: usize> EventPayload for [f32; N] {
    fn encode(&self, buf: &mut Vec<u8>) {
        for &v in self {
            write_f32_le(buf, v);
        }
    }

    fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self, CodecError> {
        let mut out = [0.0; N];
        for v in &mut out {
            *v = cursor.read_f32_le()?;
        }
        Ok(out)
    }
}

/// A frame-stamped record stream for one entity.
#[derive(Clone, Debug)]
pub struct EventChannel {
    name: String,
    data: Vec<u8>,
    writable: bool,
    attached: bool,
    position: usize,
    pending: Option<FrameId>,
    last_written: Option<FrameId>,
}

impl EventChannel {
    /// An empty event channel ready for recording.
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty.
    pub fn for_recording(name: impl Into<String>) -> Self {
        let name = name.into();
        assert!(!name.is_empty(), "event channel name must not be empty");
        Self {
            name,
            data: Vec::new(),
            writable: true,
            attached: false,
            position: 0,
            pending: None,
            last_written: None,
        }
    }

    /// An event channel over previously recorded bytes.
    pub fn from_recorded(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
            writable: false,
            attached: false,
            position: 0,
            pending: None,
            last_written: None,
        }
    }

    /// The channel's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Recorded bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Number of recorded bytes.
    pub fn len_bytes(&self) -> usize {
        self.data.len()
    }

    /// Whether this channel accepts writes.
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Whether a handle currently holds this channel.
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub(crate) fn attach(&mut self, entity: impl std::fmt::Display) {
        assert!(
            !self.attached,
            "event channel '{}' on entity {entity} already has an open handle",
            self.name
        );
        self.attached = true;
    }

    pub(crate) fn detach(&mut self) {
        self.attached = false;
    }

    /// Turn this channel into a read port at the first record.
    pub fn rewind(&mut self) {
        self.writable = false;
        self.position = 0;
        self.pending = None;
    }

    /// Append one record stamped with `frame`.
    ///
    /// # Panics
    ///
    /// Panics on a read port, or if `frame` is earlier than the last
    /// written frame.
    pub fn write<P: EventPayload>(&mut self, frame: FrameId, payload: &P) {
        assert!(
            self.writable,
            "event channel '{}' is open for playback and cannot be written",
            self.name
        );
        if let Some(last) = self.last_written {
            assert!(
                frame >= last,
                "event channel '{}' written at frame {frame} after frame {last}",
                self.name
            );
        }
        write_u32_le(&mut self.data, frame.0);
        payload.encode(&mut self.data);
        self.last_written = Some(frame);
    }

    /// Consume the next record if it was recorded on frame `now`.
    ///
    /// Returns `None` when the next record lies in the future or the
    /// channel is exhausted. Several records on the same frame come back
    /// from successive calls.
    ///
    /// # Panics
    ///
    /// Panics on a write port, or if the next record's frame is earlier
    /// than `now` (the caller skipped polling on that frame).
    pub fn try_read<P: EventPayload>(&mut self, now: FrameId) -> Option<P> {
        assert!(
            !self.writable,
            "event channel '{}' is open for recording and cannot be read",
            self.name
        );
        let frame = match self.pending {
            Some(frame) => frame,
            None => {
                let mut cursor = ByteCursor::at(&self.data, self.position);
                if cursor.is_exhausted() {
                    return None;
                }
                match cursor.read_u32_le() {
                    Ok(raw) => {
                        self.position = cursor.position();
                        let frame = FrameId(raw);
                        self.pending = Some(frame);
                        frame
                    }
                    Err(e) => {
                        self.truncate(e);
                        return None;
                    }
                }
            }
        };

        assert!(
            frame >= now,
            "replay event on '{}' from frame {frame} was not processed on its recorded frame (now {now})",
            self.name
        );
        if frame > now {
            return None;
        }

        let mut cursor = ByteCursor::at(&self.data, self.position);
        match P::decode(&mut cursor) {
            Ok(payload) => {
                self.position = cursor.position();
                self.pending = None;
                Some(payload)
            }
            Err(e) => {
                self.truncate(e);
                None
            }
        }
    }

    fn truncate(&mut self, error: CodecError) {
        warn!(event_channel = %self.name, position = self.position, error = %error, "event channel ends in a truncated record");
        self.position = self.data.len();
        self.pending = None;
    }

    /// Decode every record as `(frame, payload)` from the start,
    /// independent of any read position. Stops at a truncated tail.
    pub fn records<P: EventPayload>(&self) -> Vec<(FrameId, P)> {
        let mut cursor = ByteCursor::new(&self.data);
        let mut out = Vec::new();
        while !cursor.is_exhausted() {
            let Ok(frame) = cursor.read_u32_le() else {
                break;
            };
            let Ok(payload) = P::decode(&mut cursor) else {
                break;
            };
            out.push((FrameId(frame), payload));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorded(frames: &[(u32, u32)]) -> EventChannel {
        let mut ch = EventChannel::for_recording("hits");
        for &(frame, payload) in frames {
            ch.write(FrameId(frame), &payload);
        }
        ch.rewind();
        ch
    }

    #[test]
    fn events_come_back_on_their_frames() {
        let mut ch = recorded(&[(5, 1), (5, 2), (9, 3)]);
        let mut seen = Vec::new();
        for frame in 0..=10 {
            while let Some(p) = ch.try_read::<u32>(FrameId(frame)) {
                seen.push((frame, p));
            }
        }
        assert_eq!(seen, vec![(5, 1), (5, 2), (9, 3)]);
    }

    #[test]
    fn future_event_is_not_consumed() {
        let mut ch = recorded(&[(3, 7)]);
        assert_eq!(ch.try_read::<u32>(FrameId(1)), None);
        assert_eq!(ch.try_read::<u32>(FrameId(2)), None);
        assert_eq!(ch.try_read::<u32>(FrameId(3)), Some(7));
        assert_eq!(ch.try_read::<u32>(FrameId(3)), None);
    }

    #[test]
    fn unit_payload_is_just_a_frame() {
        let mut ch = EventChannel::for_recording("jump");
        ch.write(FrameId(2), &());
        assert_eq!(ch.len_bytes(), 4);
        ch.rewind();
        assert!(ch.try_read::<()>(FrameId(2)).is_some());
    }

    #[test]
    fn array_payload_roundtrips() {
        let mut ch = EventChannel::for_recording("launch");
        ch.write(FrameId(0), &[1.0f32, -2.0, 3.5]);
        ch.rewind();
        assert_eq!(ch.try_read::<[f32; 3]>(FrameId(0)), Some([1.0, -2.0, 3.5]));
    }

    #[test]
    fn records_lists_everything() {
        let ch = recorded(&[(1, 10), (4, 40)]);
        assert_eq!(
            ch.records::<u32>(),
            vec![(FrameId(1), 10), (FrameId(4), 40)]
        );
    }

    #[test]
    fn truncated_payload_ends_the_channel() {
        let mut data = 0u32.to_le_bytes().to_vec();
        data.push(1);
        let mut ch = EventChannel::from_recorded("x", data);
        assert_eq!(ch.try_read::<u32>(FrameId(0)), None);
        assert_eq!(ch.try_read::<u32>(FrameId(1)), None);
    }

    #[test]
    #[should_panic(expected = "was not processed on its recorded frame")]
    fn skipped_frame_panics() {
        let mut ch = recorded(&[(5, 1)]);
        ch.try_read::<u32>(FrameId(6));
    }

    #[test]
    #[should_panic(expected = "after frame 9")]
    fn out_of_order_write_panics() {
        let mut ch = EventChannel::for_recording("x");
        ch.write(FrameId(9), &());
        ch.write(FrameId(3), &());
    }
}
