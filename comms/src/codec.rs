//! Reduced-precision wire encoding for gradient vectors.

use half::f16;

use crate::error::CommsErr;

/// Number of wire bytes per vector element.
pub const ELEM_SIZE: usize = size_of::<f16>();

/// Converts gradient vectors to and from their half-precision wire form.
///
/// Elements are narrowed to IEEE `f16` on encode and widened back to `f32`
/// on decode. Element bytes are native-endian, the ring runs on homogeneous
/// hosts.
#[derive(Debug, Clone, Default)]
pub struct GradientCodec {
    reject_non_finite: bool,
}

impl GradientCodec {
    /// Creates a codec that lets NaN/Inf elements pass through, which is the
    /// native behavior of the half-precision narrowing (large magnitudes
    /// saturate to Inf).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a codec that rejects non-finite decoded elements.
    pub fn strict() -> Self {
        Self {
            reject_non_finite: true,
        }
    }

    /// Appends the wire form of `vector` to `buf`.
    ///
    /// The caller owns `buf` and is expected to reuse it across rounds.
    ///
    /// # Arguments
    /// * `vector` - The full-precision gradient vector.
    /// * `buf` - The destination byte buffer.
    pub fn encode(&self, vector: &[f32], buf: &mut Vec<u8>) {
        buf.reserve(vector.len() * ELEM_SIZE);
        for &x in vector {
            buf.extend_from_slice(&f16::from_f32(x).to_ne_bytes());
        }
    }

    /// Parses an EOF-framed payload back into a full-precision vector.
    ///
    /// # Arguments
    /// * `bytes` - The accumulated wire bytes, exactly as the peer wrote them.
    ///
    /// # Returns
    /// The decoded vector, or `MalformedPayload` if the byte length is zero
    /// or not a multiple of the element width, or `NonFinite` if a decoded
    /// element is NaN/Inf and this codec is strict.
    pub fn decode(&self, bytes: &[u8]) -> Result<Vec<f32>, CommsErr> {
        if bytes.is_empty() || bytes.len() % ELEM_SIZE != 0 {
            return Err(CommsErr::MalformedPayload { len: bytes.len() });
        }

        let mut vector = Vec::with_capacity(bytes.len() / ELEM_SIZE);
        for (index, chunk) in bytes.chunks_exact(ELEM_SIZE).enumerate() {
            let narrow: f16 = bytemuck::pod_read_unaligned(chunk);
            let x = narrow.to_f32();

            if self.reject_non_finite && !x.is_finite() {
                return Err(CommsErr::NonFinite { index });
            }

            vector.push(x);
        }

        Ok(vector)
    }
}
