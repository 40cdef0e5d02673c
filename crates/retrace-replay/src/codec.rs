//! Byte-level encode/decode for channel and event buffers.
//!
//! All integers are little-endian. Channel values go through one of four
//! codecs selected by [`DataType`]:
//!
//! - `Float32`: raw 4-byte IEEE-754.
//! - `Quant16`: `round(value * scale)` as a 2-byte signed integer.
//! - `QuantAuto`: scaled integer in a tagged 1-4 byte encoding.
//! - `QuantDelta`: tagged encoding of the difference from the previous
//!   quantised value of the same component.
//!
//! # Tagged encoding
//!
//! ```text
//! bit  31 ..................... 3   2      1 0
//!      |<----- magnitude ----->|  sign | len-1 |
//! ```
//!
//! Only the low `len` bytes are stored, so magnitudes up to 31, 8191,
//! 2^21-1 and 2^29-1 take 1, 2, 3 and 4 bytes. Larger magnitudes are a
//! caller error and panic; pick a smaller scale.

use retrace_core::{ChannelDescriptor, DataType, Interpolation};
use smallvec::SmallVec;

use crate::angle::wrap_degrees;
use crate::error::CodecError;

/// Largest magnitude representable with 1, 2, 3 and 4 tagged bytes.
pub const TAGGED_MAX_MAGNITUDE: [u32; 4] = [(1 << 5) - 1, (1 << 13) - 1, (1 << 21) - 1, (1 << 29) - 1];

const SIGN_BIT: u32 = 0b100;
const LEN_MASK: u8 = 0b011;

// ── Primitive writers ───────────────────────────────────────────

/// Append a single byte.
pub fn write_u8(buf: &mut Vec<u8>, v: u8) {
    buf.push(v);
}

/// Append a little-endian i16.
pub fn write_i16_le(buf: &mut Vec<u8>, v: i16) {
    buf.extend_from_slice(&v.to_le_bytes());
}

/// Append a little-endian u32.
pub fn write_u32_le(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

/// Append a little-endian i32.
pub fn write_i32_le(buf: &mut Vec<u8>, v: i32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

/// Append a little-endian f32.
pub fn write_f32_le(buf: &mut Vec<u8>, v: f32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

// ── Primitive reader ────────────────────────────────────────────

/// Sequential reader over a borrowed byte buffer.
///
/// Channels and event channels keep only the byte position between
/// frames and rebuild a cursor on each read.
#[derive(Clone, Debug)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    /// Cursor at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Cursor at byte offset `pos` of `data` (clamped to the end).
    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Self {
            data,
            pos: pos.min(data.len()),
        }
    }

    /// Current byte offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Whether every byte has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let available = self.remaining();
        if available < N {
            return Err(CodecError::Truncated {
                needed: N,
                available,
            });
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.pos..self.pos + N]);
        self.pos += N;
        Ok(out)
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take::<1>()?[0])
    }

    /// Read a little-endian i16.
    pub fn read_i16_le(&mut self) -> Result<i16, CodecError> {
        Ok(i16::from_le_bytes(self.take()?))
    }

    /// Read a little-endian u32.
    pub fn read_u32_le(&mut self) -> Result<u32, CodecError> {
        Ok(u32::from_le_bytes(self.take()?))
    }

    /// Read a little-endian i32.
    pub fn read_i32_le(&mut self) -> Result<i32, CodecError> {
        Ok(i32::from_le_bytes(self.take()?))
    }

    /// Read a little-endian f32.
    pub fn read_f32_le(&mut self) -> Result<f32, CodecError> {
        Ok(f32::from_le_bytes(self.take()?))
    }
}

// ── Quantisation ────────────────────────────────────────────────

/// Quantise for the 16-bit codec.
///
/// # Panics
///
/// Panics if `value * scale` rounds outside the `i16` range.
pub fn quantise16(value: f32, scale: i32) -> i16 {
    let scaled = (value * scale as f32).round_ties_even();
    assert!(
        scaled >= i16::MIN as f32 && scaled <= i16::MAX as f32,
        "Quant16 value {value} at scale {scale} does not fit in 16 bits"
    );
    scaled as i16
}

/// Quantise for the tagged codecs, wrapping angles first if asked.
///
/// # Panics
///
/// Panics if the scaled magnitude exceeds the 4-byte tagged range.
pub fn quantise_tagged(value: f32, scale: i32, angular: bool) -> i32 {
    let value = if angular { wrap_degrees(value) } else { value };
    let scaled = (value * scale as f32).round_ties_even();
    let limit = TAGGED_MAX_MAGNITUDE[3] as f32;
    assert!(
        scaled >= -limit && scaled <= limit,
        "quantised value {value} at scale {scale} exceeds the 30-bit tagged range"
    );
    scaled as i32
}

/// Map a quantised integer back to a float.
pub fn unquantise(quantised: i32, scale: i32) -> f32 {
    quantised as f32 / scale as f32
}

/// Bytes needed to store `magnitude` in the tagged encoding, if it fits.
pub fn tagged_byte_count(magnitude: u32) -> Option<usize> {
    TAGGED_MAX_MAGNITUDE
        .iter()
        .position(|&max| magnitude <= max)
        .map(|i| i + 1)
}

/// Append `value` in the tagged variable-length encoding.
///
/// # Panics
///
/// Panics if `|value|` exceeds 2^29 - 1.
pub fn write_tagged(buf: &mut Vec<u8>, value: i32) {
    let magnitude = value.unsigned_abs();
    let Some(byte_count) = tagged_byte_count(magnitude) else {
        panic!("tagged magnitude {magnitude} exceeds the 30-bit range");
    };
    let sign = if value < 0 { SIGN_BIT } else { 0 };
    let encoded = (magnitude << 3) | sign | (byte_count as u32 - 1);
    buf.extend_from_slice(&encoded.to_le_bytes()[..byte_count]);
}

/// Read one value in the tagged variable-length encoding.
pub fn read_tagged(cursor: &mut ByteCursor<'_>) -> Result<i32, CodecError> {
    let first = cursor.read_u8()?;
    let byte_count = (first & LEN_MASK) as usize + 1;
    let mut bytes = [first, 0, 0, 0];
    for slot in bytes.iter_mut().take(byte_count).skip(1) {
        *slot = cursor.read_u8()?;
    }
    let encoded = u32::from_le_bytes(bytes);
    let magnitude = (encoded >> 3) as i32;
    Ok(if encoded & SIGN_BIT != 0 {
        -magnitude
    } else {
        magnitude
    })
}

// ── Sample codec ────────────────────────────────────────────────

/// One codec instance per channel direction.
///
/// Encodes and decodes whole samples (`stride` values, component 0
/// first). `QuantDelta` carries a running accumulator per component, so
/// a codec must see every sample of its channel in order.
#[derive(Clone, Debug, PartialEq)]
pub enum SampleCodec {
    /// Raw IEEE-754.
    Float32,
    /// Fixed 16-bit quantisation.
    Quant16 {
        /// Quantisation scale.
        scale: i32,
    },
    /// Tagged absolute quantisation.
    QuantAuto {
        /// Quantisation scale.
        scale: i32,
        /// Wrap values into (-180, 180] before quantising.
        angular: bool,
    },
    /// Tagged delta quantisation.
    QuantDelta {
        /// Quantisation scale.
        scale: i32,
        /// Wrap values into (-180, 180] before quantising.
        angular: bool,
        /// Last quantised value of each component.
        accumulators: SmallVec<[i32; 4]>,
    },
}

impl SampleCodec {
    /// Build a fresh codec for a channel.
    pub fn for_descriptor(descriptor: &ChannelDescriptor) -> Self {
        let scale = descriptor.quantise_scale;
        let angular = descriptor.interpolation == Interpolation::Angular;
        match descriptor.data_type {
            DataType::Float32 => Self::Float32,
            DataType::Quant16 => Self::Quant16 { scale },
            DataType::QuantAuto => Self::QuantAuto { scale, angular },
            DataType::QuantDelta => Self::QuantDelta {
                scale,
                angular,
                accumulators: SmallVec::from_elem(0, descriptor.stride()),
            },
        }
    }

    /// Append one sample to `buf`.
    pub fn encode(&mut self, sample: &[f32], buf: &mut Vec<u8>) {
        for (component, &value) in sample.iter().enumerate() {
            self.encode_value(component, value, buf);
        }
    }

    /// Decode one sample into `out`.
    ///
    /// On error `out` may be partially written and the codec must not be
    /// used again.
    pub fn decode(
        &mut self,
        cursor: &mut ByteCursor<'_>,
        out: &mut [f32],
    ) -> Result<(), CodecError> {
        for (component, slot) in out.iter_mut().enumerate() {
            *slot = self.decode_value(component, cursor)?;
        }
        Ok(())
    }

    fn encode_value(&mut self, component: usize, value: f32, buf: &mut Vec<u8>) {
        match self {
            Self::Float32 => write_f32_le(buf, value),
            Self::Quant16 { scale } => write_i16_le(buf, quantise16(value, *scale)),
            Self::QuantAuto { scale, angular } => {
                write_tagged(buf, quantise_tagged(value, *scale, *angular));
            }
            Self::QuantDelta {
                scale,
                angular,
                accumulators,
            } => {
                let quantised = quantise_tagged(value, *scale, *angular);
                let previous = accumulators[component];
                let delta = quantised.checked_sub(previous).unwrap_or_else(|| {
                    panic!("QuantDelta step {previous} -> {quantised} overflows i32")
                });
                write_tagged(buf, delta);
                accumulators[component] = quantised;
            }
        }
    }

    fn decode_value(
        &mut self,
        component: usize,
        cursor: &mut ByteCursor<'_>,
    ) -> Result<f32, CodecError> {
        match self {
            Self::Float32 => cursor.read_f32_le(),
            Self::Quant16 { scale } => {
                let stored = cursor.read_i16_le()?;
                Ok(unquantise(stored as i32, *scale))
            }
            Self::QuantAuto { scale, .. } => {
                let quantised = read_tagged(cursor)?;
                Ok(unquantise(quantised, *scale))
            }
            Self::QuantDelta {
                scale,
                accumulators,
                ..
            } => {
                let delta = read_tagged(cursor)?;
                let current = accumulators[component].wrapping_add(delta);
                accumulators[component] = current;
                Ok(unquantise(current, *scale))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn descriptor(data_type: DataType, stride: u32, scale: i32) -> ChannelDescriptor {
        ChannelDescriptor::new("test", data_type, stride).with_quantise_scale(scale)
    }

    fn roundtrip(d: &ChannelDescriptor, samples: &[Vec<f32>]) -> Vec<Vec<f32>> {
        let mut buf = Vec::new();
        let mut enc = SampleCodec::for_descriptor(d);
        for s in samples {
            enc.encode(s, &mut buf);
        }
        let mut dec = SampleCodec::for_descriptor(d);
        let mut cursor = ByteCursor::new(&buf);
        let mut out = Vec::new();
        for _ in samples {
            let mut sample = vec![0.0; d.stride()];
            dec.decode(&mut cursor, &mut sample).unwrap();
            out.push(sample);
        }
        assert!(cursor.is_exhausted());
        out
    }

    // ── Primitive round-trips ───────────────────────────────────

    proptest! {
        #[test]
        fn roundtrip_u32(v in any::<u32>()) {
            let mut buf = Vec::new();
            write_u32_le(&mut buf, v);
            prop_assert_eq!(ByteCursor::new(&buf).read_u32_le().unwrap(), v);
        }

        #[test]
        fn roundtrip_i32(v in any::<i32>()) {
            let mut buf = Vec::new();
            write_i32_le(&mut buf, v);
            prop_assert_eq!(ByteCursor::new(&buf).read_i32_le().unwrap(), v);
        }
    }

    #[test]
    fn truncated_read_reports_sizes() {
        let buf = [1u8, 2];
        let mut cursor = ByteCursor::new(&buf);
        assert_eq!(
            cursor.read_u32_le(),
            Err(CodecError::Truncated {
                needed: 4,
                available: 2
            })
        );
        // A failed read does not consume.
        assert_eq!(cursor.position(), 0);
    }

    // ── Float32 ─────────────────────────────────────────────────

    proptest! {
        #[test]
        fn float32_is_bit_exact(bits in any::<u32>()) {
            let v = f32::from_bits(bits);
            let d = descriptor(DataType::Float32, 1, 1);
            let got = roundtrip(&d, &[vec![v]]);
            prop_assert_eq!(got[0][0].to_bits(), bits);
        }
    }

    // ── Quant16 ─────────────────────────────────────────────────

    proptest! {
        #[test]
        fn quant16_error_bounded(v in -300.0f32..300.0, scale in 1i32..=100) {
            let d = descriptor(DataType::Quant16, 1, scale);
            let got = roundtrip(&d, &[vec![v]])[0][0];
            prop_assert!((got - v).abs() <= 0.5 / scale as f32 + 1e-4);
        }
    }

    #[test]
    fn quant16_is_two_bytes() {
        let mut buf = Vec::new();
        let mut codec = SampleCodec::for_descriptor(&descriptor(DataType::Quant16, 3, 100));
        codec.encode(&[1.0, -2.5, 3.25], &mut buf);
        assert_eq!(buf.len(), 6);
    }

    #[test]
    #[should_panic(expected = "does not fit in 16 bits")]
    fn quant16_out_of_range_panics() {
        quantise16(400.0, 100);
    }

    #[test]
    #[should_panic(expected = "does not fit in 16 bits")]
    fn quant16_nan_panics() {
        quantise16(f32::NAN, 1);
    }

    // ── Tagged encoding ─────────────────────────────────────────

    #[test]
    fn tagged_byte_count_boundaries() {
        assert_eq!(tagged_byte_count(0), Some(1));
        assert_eq!(tagged_byte_count(31), Some(1));
        assert_eq!(tagged_byte_count(32), Some(2));
        assert_eq!(tagged_byte_count(8191), Some(2));
        assert_eq!(tagged_byte_count(8192), Some(3));
        assert_eq!(tagged_byte_count((1 << 21) - 1), Some(3));
        assert_eq!(tagged_byte_count(1 << 21), Some(4));
        assert_eq!(tagged_byte_count((1 << 29) - 1), Some(4));
        assert_eq!(tagged_byte_count(1 << 29), None);
    }

    #[test]
    fn tagged_negative_minimum_of_each_width_roundtrips() {
        for v in [-31, -32, -8191, -8192, -(1 << 21), -((1 << 29) - 1)] {
            let mut buf = Vec::new();
            write_tagged(&mut buf, v);
            assert_eq!(read_tagged(&mut ByteCursor::new(&buf)).unwrap(), v);
        }
    }

    #[test]
    fn tagged_layout() {
        let mut buf = Vec::new();
        write_tagged(&mut buf, -5);
        assert_eq!(buf, vec![(5 << 3) | 0b100]);

        buf.clear();
        write_tagged(&mut buf, 32);
        assert_eq!(buf, vec![((32u32 << 3) as u8) | 0b001, 1]);
    }

    #[test]
    #[should_panic(expected = "exceeds the 30-bit range")]
    fn tagged_overflow_panics() {
        write_tagged(&mut Vec::new(), 1 << 29);
    }

    proptest! {
        #[test]
        fn tagged_is_minimal(v in -((1i32 << 29) - 1)..(1i32 << 29)) {
            let mut buf = Vec::new();
            write_tagged(&mut buf, v);
            prop_assert_eq!(Some(buf.len()), tagged_byte_count(v.unsigned_abs()));
            if buf.len() > 1 {
                // The next smaller width could not have held it.
                prop_assert!(v.unsigned_abs() > TAGGED_MAX_MAGNITUDE[buf.len() - 2]);
            }
            prop_assert_eq!(read_tagged(&mut ByteCursor::new(&buf)).unwrap(), v);
        }
    }

    // ── QuantAuto ───────────────────────────────────────────────

    proptest! {
        #[test]
        fn quant_auto_error_bounded(v in -1000.0f32..1000.0, scale in 1i32..=1000) {
            let d = descriptor(DataType::QuantAuto, 1, scale);
            let got = roundtrip(&d, &[vec![v]])[0][0];
            prop_assert!((got - v).abs() <= 0.5 / scale as f32 + 1e-3);
        }
    }

    #[test]
    fn quant_auto_byte_counts_at_unit_scale() {
        let d = descriptor(DataType::QuantAuto, 1, 1);
        for (v, expected) in [(0.0, 1), (31.0, 1), (-31.0, 1), (32.0, 2), (8191.0, 2), (8192.0, 3)] {
            let mut buf = Vec::new();
            SampleCodec::for_descriptor(&d).encode(&[v], &mut buf);
            assert_eq!(buf.len(), expected, "value {v}");
        }
    }

    #[test]
    fn quant_auto_angular_wraps_before_quantising() {
        let d = descriptor(DataType::QuantAuto, 1, 10).with_interpolation(Interpolation::Angular);
        let got = roundtrip(&d, &[vec![350.0], vec![-200.0]]);
        assert!((got[0][0] - -10.0).abs() < 1e-4);
        assert!((got[1][0] - 160.0).abs() < 1e-4);
    }

    // ── QuantDelta ──────────────────────────────────────────────

    proptest! {
        #[test]
        fn quant_delta_sequence_composes(
            start in -1000.0f32..1000.0,
            steps in prop::collection::vec(-2.0f32..2.0, 1..64),
        ) {
            let scale = 100;
            let mut values = vec![vec![start]];
            for step in &steps {
                let last = values.last().unwrap()[0];
                values.push(vec![last + step]);
            }
            let d = descriptor(DataType::QuantDelta, 1, scale);
            let got = roundtrip(&d, &values);
            for (g, v) in got.iter().zip(&values) {
                prop_assert!((g[0] - v[0]).abs() <= 0.5 / scale as f32 + 1e-3);
            }
        }
    }

    #[test]
    fn quant_delta_small_steps_take_one_byte_each() {
        let d = descriptor(DataType::QuantDelta, 2, 10);
        let mut codec = SampleCodec::for_descriptor(&d);
        let mut buf = Vec::new();
        codec.encode(&[1000.0, -1000.0], &mut buf);
        let first = buf.len();
        codec.encode(&[1000.5, -1000.5], &mut buf);
        assert_eq!(buf.len() - first, 2);
    }

    #[test]
    fn quant_delta_components_accumulate_independently() {
        let d = descriptor(DataType::QuantDelta, 3, 4);
        let samples = vec![
            vec![1.0, 2.0, 3.0],
            vec![1.25, 1.75, 3.0],
            vec![-1.0, 0.0, 3.5],
        ];
        assert_eq!(roundtrip(&d, &samples), samples);
    }
}
