//! Continuous channels: one named, fixed-stride value sequence per entity.
//!
//! A channel is either a write port (recording, append-only) or a read
//! port (playback, sequential). Writes commit one keyframe every
//! `keyframe_interval` samples; reads reconstruct the skipped samples
//! through one [`Interpolator`] per component and freeze at the last
//! keyframe once the bytes run out.

use retrace_core::ChannelDescriptor;
use smallvec::SmallVec;
use tracing::warn;

use crate::codec::{ByteCursor, SampleCodec};
use crate::interp::Interpolator;

/// One stride-tuple of channel values.
pub type Sample = SmallVec<[f32; 4]>;

#[derive(Clone, Debug)]
struct WriteState {
    codec: SampleCodec,
    pending: Sample,
    phase: u32,
    writes: u64,
    uncommitted: bool,
    finished: bool,
}

#[derive(Clone, Debug)]
struct ReadState {
    codec: SampleCodec,
    position: usize,
    interpolators: SmallVec<[Interpolator; 4]>,
    primed: bool,
    exhausted: bool,
}

#[derive(Clone, Debug)]
enum Port {
    Write(WriteState),
    Read(ReadState),
}

/// A recorded value stream for one entity.
#[derive(Clone, Debug)]
pub struct Channel {
    descriptor: ChannelDescriptor,
    data: Vec<u8>,
    port: Port,
    attached: bool,
}

impl Channel {
    /// An empty channel ready for recording.
    ///
    /// # Panics
    ///
    /// Panics if the descriptor is invalid.
    pub fn for_recording(descriptor: ChannelDescriptor) -> Self {
        if let Err(e) = descriptor.validate() {
            panic!("cannot record channel: {e}");
        }
        let write = WriteState {
            codec: SampleCodec::for_descriptor(&descriptor),
            pending: SmallVec::from_elem(0.0, descriptor.stride()),
            phase: 0,
            writes: 0,
            uncommitted: false,
            finished: false,
        };
        Self {
            descriptor,
            data: Vec::new(),
            port: Port::Write(write),
            attached: false,
        }
    }

    /// A channel over previously recorded bytes, ready for playback.
    ///
    /// The descriptor is trusted to have been validated by the caller.
    pub fn from_recorded(descriptor: ChannelDescriptor, data: Vec<u8>) -> Self {
        let port = Port::Read(Self::fresh_read_state(&descriptor));
        Self {
            descriptor,
            data,
            port,
            attached: false,
        }
    }

    fn fresh_read_state(descriptor: &ChannelDescriptor) -> ReadState {
        let steps = descriptor.steps_per_keyframe();
        ReadState {
            codec: SampleCodec::for_descriptor(descriptor),
            position: 0,
            interpolators: (0..descriptor.stride())
                .map(|_| Interpolator::new(descriptor.interpolation, steps))
                .collect(),
            primed: false,
            exhausted: false,
        }
    }

    /// The channel's descriptor.
    pub fn descriptor(&self) -> &ChannelDescriptor {
        &self.descriptor
    }

    /// The channel's name.
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Committed bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Number of committed bytes.
    pub fn len_bytes(&self) -> usize {
        self.data.len()
    }

    /// Whether this channel accepts writes.
    pub fn is_writable(&self) -> bool {
        matches!(self.port, Port::Write(_))
    }

    /// Whether a handle currently holds this channel.
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub(crate) fn attach(&mut self, entity: impl std::fmt::Display) {
        assert!(
            !self.attached,
            "channel '{}' on entity {entity} already has an open handle",
            self.descriptor.name
        );
        self.attached = true;
    }

    pub(crate) fn detach(&mut self) {
        self.attached = false;
    }

    /// Append one sample.
    ///
    /// The sample is committed immediately on keyframe boundaries and
    /// otherwise held until the next boundary or [`finish`](Self::finish).
    ///
    /// # Panics
    ///
    /// Panics if the channel is a read port, has been finished, or
    /// `sample.len()` differs from the stride.
    pub fn write(&mut self, sample: &[f32]) {
        let steps = self.descriptor.steps_per_keyframe();
        let name = &self.descriptor.name;
        let Port::Write(state) = &mut self.port else {
            panic!("channel '{name}' is open for playback and cannot be written");
        };
        assert!(!state.finished, "channel '{name}' written after finish");
        assert_eq!(
            sample.len(),
            state.pending.len(),
            "channel '{name}' expects {} values per sample",
            state.pending.len()
        );
        state.pending.copy_from_slice(sample);
        if state.phase == 0 {
            state.codec.encode(&state.pending, &mut self.data);
            state.uncommitted = false;
        } else {
            state.uncommitted = true;
        }
        state.phase = (state.phase + 1) % steps;
        state.writes += 1;
    }

    /// Commit the last written sample if it fell between keyframes, so
    /// playback has a terminal keyframe. Further writes panic.
    ///
    /// Idempotent, and a no-op on read ports.
    pub fn finish(&mut self) {
        if let Port::Write(state) = &mut self.port {
            if state.uncommitted {
                state.codec.encode(&state.pending, &mut self.data);
                state.uncommitted = false;
            }
            state.finished = true;
        }
    }

    /// Number of samples written so far (committed or not).
    pub fn writes(&self) -> u64 {
        match &self.port {
            Port::Write(state) => state.writes,
            Port::Read(_) => 0,
        }
    }

    /// Finish any write state and turn this channel into a read port at
    /// the first byte.
    pub fn rewind(&mut self) {
        self.finish();
        self.port = Port::Read(Self::fresh_read_state(&self.descriptor));
    }

    /// Reconstruct the next playback sample into `out`.
    ///
    /// Returns `false` only when the channel never had a sample to give.
    /// Once the bytes run out the last keyframe repeats indefinitely.
    ///
    /// # Panics
    ///
    /// Panics if the channel is a write port or `out.len()` differs from
    /// the stride.
    pub fn read_into(&mut self, out: &mut [f32]) -> bool {
        let stride = self.descriptor.stride();
        let name = &self.descriptor.name;
        assert_eq!(
            out.len(),
            stride,
            "channel '{name}' yields {stride} values per sample"
        );
        let Port::Read(state) = &mut self.port else {
            panic!("channel '{name}' is open for recording and cannot be read");
        };

        let mut keyframe: Sample = SmallVec::from_elem(0.0, stride);
        if !state.primed {
            if !next_keyframe(state, &self.data, name, &mut keyframe) {
                return false;
            }
            let first = keyframe.clone();
            if !next_keyframe(state, &self.data, name, &mut keyframe) {
                keyframe.copy_from_slice(&first);
            }
            for ((it, &a), &b) in state.interpolators.iter_mut().zip(&first).zip(&keyframe) {
                it.prime(a, b);
            }
            state.primed = true;
        } else if state.interpolators[0].at_keyframe() {
            if next_keyframe(state, &self.data, name, &mut keyframe) {
                for (it, &k) in state.interpolators.iter_mut().zip(&keyframe) {
                    it.push(k);
                }
            } else {
                for it in state.interpolators.iter_mut() {
                    it.hold();
                }
            }
        }

        for (slot, it) in out.iter_mut().zip(state.interpolators.iter_mut()) {
            *slot = it.step();
        }
        true
    }

    /// Allocating form of [`read_into`](Self::read_into).
    pub fn read(&mut self) -> Option<Sample> {
        let mut out: Sample = SmallVec::from_elem(0.0, self.descriptor.stride());
        self.read_into(&mut out).then_some(out)
    }

    /// Decode every committed keyframe from the start, independent of any
    /// read position. Stops quietly at a truncated tail.
    pub fn keyframes(&self) -> Vec<Sample> {
        let mut codec = SampleCodec::for_descriptor(&self.descriptor);
        let mut cursor = ByteCursor::new(&self.data);
        let mut out = Vec::new();
        while !cursor.is_exhausted() {
            let mut sample: Sample = SmallVec::from_elem(0.0, self.descriptor.stride());
            if codec.decode(&mut cursor, &mut sample).is_err() {
                break;
            }
            out.push(sample);
        }
        out
    }
}

/// Decode the keyframe at the read position. Returns `false` (and marks
/// the state exhausted) at the end of the data or on a truncated tail.
fn next_keyframe(state: &mut ReadState, data: &[u8], name: &str, out: &mut [f32]) -> bool {
    if state.exhausted {
        return false;
    }
    let mut cursor = ByteCursor::at(data, state.position);
    if cursor.is_exhausted() {
        state.exhausted = true;
        return false;
    }
    match state.codec.decode(&mut cursor, out) {
        Ok(()) => {
            state.position = cursor.position();
            true
        }
        Err(e) => {
            warn!(channel = name, position = state.position, error = %e, "channel ends in a truncated sample");
            state.exhausted = true;
            false
        }
    }
}
