//! Fixed-bit quantization of bounded values.

use std::fmt;

/// Maps a bounded value to a fixed number of bits and back.
///
/// A quantizer built with [`with_range`](Self::with_range) maps `[min, max]`
/// linearly onto `[0, 2^bits - 1]`. One built with [`new`](Self::new) only
/// carries a bit count and is used for integer saturation.
///
/// Bit counts are kept in `1..=31`; the float path works in `f64` internally so
/// the reconstruction error stays within [`quantization_error`](Self::quantization_error).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Quantization {
    bit_count: u8,
    min: f32,
    max: f32,
    step: f64,
    inv_step: f64,
    max_encoded_value: u32,
}

impl Quantization {
    /// Largest supported bit count.
    pub const MAX_BITS: u8 = 31;

    /// Creates an integer-only quantizer with `bit_count` bits.
    #[must_use]
    pub const fn new(bit_count: u8) -> Self {
        Self::with_range(bit_count, 0.0, 0.0)
    }

    /// Creates a quantizer mapping `[min, max]` onto `bit_count` bits.
    ///
    /// An empty or inverted range collapses every input onto `min`.
    #[must_use]
    pub const fn with_range(bit_count: u8, min: f32, max: f32) -> Self {
        let bit_count = if bit_count == 0 {
            1
        } else if bit_count > Self::MAX_BITS {
            Self::MAX_BITS
        } else {
            bit_count
        };
        let max_encoded_value = (1u32 << bit_count) - 1;
        let span = max as f64 - min as f64;
        let (step, inv_step) = if span > 0.0 {
            (
                span / max_encoded_value as f64,
                max_encoded_value as f64 / span,
            )
        } else {
            (0.0, 0.0)
        };
        Self {
            bit_count,
            min,
            max,
            step,
            inv_step,
            max_encoded_value,
        }
    }

    /// Number of bits one quantized value occupies.
    #[must_use]
    pub const fn bit_count(&self) -> u8 {
        self.bit_count
    }

    /// Lower bound of the float range.
    #[must_use]
    pub const fn min(&self) -> f32 {
        self.min
    }

    /// Upper bound of the float range.
    #[must_use]
    pub const fn max(&self) -> f32 {
        self.max
    }

    /// Distance between two adjacent reconstructed values.
    #[must_use]
    pub const fn step(&self) -> f64 {
        self.step
    }

    /// Largest encoded value, `2^bits - 1`.
    #[must_use]
    pub const fn max_encoded_value(&self) -> u32 {
        self.max_encoded_value
    }

    /// Quantizes a float, clamping to `[min, max]` first.
    ///
    /// NaN is treated as `min`; infinities clamp to the matching bound.
    #[must_use]
    pub fn quantize_float(&self, value: f32) -> u32 {
        if value.is_nan() {
            return 0;
        }
        let clamped = value.max(self.min).min(self.max);
        let scaled = (f64::from(clamped) - f64::from(self.min)) * self.inv_step;
        (scaled.round() as u32).min(self.max_encoded_value)
    }

    /// Reconstructs the float a quantized value stands for.
    #[must_use]
    pub fn unquantize_float(&self, encoded: u32) -> f32 {
        let encoded = encoded.min(self.max_encoded_value);
        (f64::from(self.min) + f64::from(encoded) * self.step) as f32
    }

    /// Saturates an unsigned integer to `[0, 2^bits - 1]`.
    #[must_use]
    pub const fn quantize_unsigned(&self, value: u64) -> u32 {
        if value > self.max_encoded_value as u64 {
            self.max_encoded_value
        } else {
            value as u32
        }
    }

    /// Saturates a signed integer to `[-2^(bits-1), 2^(bits-1) - 1]`.
    ///
    /// The result is offset-binary: the minimum maps to zero.
    #[must_use]
    pub const fn quantize_signed(&self, value: i64) -> u32 {
        let half = 1i64 << (self.bit_count - 1);
        let clamped = if value < -half {
            -half
        } else if value > half - 1 {
            half - 1
        } else {
            value
        };
        (clamped + half) as u32
    }

    /// Inverse of [`quantize_signed`](Self::quantize_signed).
    #[must_use]
    pub const fn unquantize_signed(&self, encoded: u32) -> i64 {
        let encoded = if encoded > self.max_encoded_value {
            self.max_encoded_value
        } else {
            encoded
        };
        encoded as i64 - (1i64 << (self.bit_count - 1))
    }

    /// Smallest representable signed value.
    #[must_use]
    pub const fn signed_min(&self) -> i64 {
        -(1i64 << (self.bit_count - 1))
    }

    /// Largest representable signed value.
    #[must_use]
    pub const fn signed_max(&self) -> i64 {
        (1i64 << (self.bit_count - 1)) - 1
    }

    /// Maximum absolute reconstruction error of the float path.
    ///
    /// Half a step, widened by the rounding of the `f64` arithmetic and of the
    /// final cast to `f32`, and rounded up so every clamped input decodes
    /// within it.
    #[must_use]
    pub fn quantization_error(&self) -> f32 {
        let magnitude = f64::from(self.min.abs().max(self.max.abs()));
        let scaled_slack = f64::from(self.max_encoded_value) * 4.0 * f64::EPSILON;
        let bound = self.step * (0.5 + scaled_slack)
            + magnitude * (0.5 * f64::from(f32::EPSILON) + 4.0 * f64::EPSILON)
            + f64::from(f32::from_bits(1));
        round_up_to_f32(bound)
    }
}

fn round_up_to_f32(value: f64) -> f32 {
    let narrowed = value as f32;
    if f64::from(narrowed) < value && narrowed.is_finite() {
        f32::from_bits(narrowed.to_bits() + 1)
    } else {
        narrowed
    }
}

impl fmt::Display for Quantization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.step > 0.0 {
            write!(
                f,
                "{} bits over [{}, {}], error {}",
                self.bit_count,
                self.min,
                self.max,
                self.quantization_error()
            )
        } else {
            write!(f, "{} bits", self.bit_count)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_map_to_extremes() {
        let q = Quantization::with_range(10, -1.0, 1.0);
        assert_eq!(q.quantize_float(-1.0), 0);
        assert_eq!(q.quantize_float(1.0), 1023);
        assert_eq!(q.unquantize_float(0), -1.0);
        assert_eq!(q.unquantize_float(1023), 1.0);
    }

    #[test]
    fn non_finite_inputs_clamp() {
        let q = Quantization::with_range(8, 0.0, 360.0);
        assert_eq!(q.quantize_float(f32::NAN), 0);
        assert_eq!(q.quantize_float(f32::NEG_INFINITY), 0);
        assert_eq!(q.quantize_float(f32::INFINITY), 255);
    }

    #[test]
    fn error_is_half_step() {
        let q = Quantization::with_range(4, 0.0, 15.0);
        assert!((q.step() - 1.0).abs() < 1e-12);
        let error = q.quantization_error();
        assert!(error >= 0.5 && error < 0.5 + 1e-5, "{error}");
    }

    #[test]
    fn error_covers_f32_rounding_near_large_bounds() {
        let q = Quantization::with_range(24, 1.0e6, 1.0e6 + 1.0);
        let error = q.quantization_error();
        for value in [1.0e6, 1.0e6 + 0.3, 1.0e6 + 0.5, 1.0e6 + 1.0] {
            let decoded = q.unquantize_float(q.quantize_float(value));
            let diff = (f64::from(decoded) - f64::from(value)).abs();
            assert!(diff <= f64::from(error), "{value}: {diff} > {error}");
        }
        assert!(f64::from(error) > q.step() * 0.5);
    }

    #[test]
    fn unsigned_saturates() {
        let q = Quantization::new(6);
        assert_eq!(q.quantize_unsigned(255), 63);
        assert_eq!(q.quantize_unsigned(12), 12);
    }

    #[test]
    fn signed_saturates_instead_of_wrapping() {
        let q = Quantization::new(8);
        assert_eq!(
            q.quantize_signed(i64::from(i32::MAX)),
            q.quantize_signed(200)
        );
        assert_eq!(q.unquantize_signed(q.quantize_signed(200)), 127);
        assert_eq!(q.unquantize_signed(q.quantize_signed(-4000)), -128);
        assert_eq!(q.unquantize_signed(q.quantize_signed(-5)), -5);
    }

    #[test]
    fn signed_twelve_bit_range() {
        let q = Quantization::new(12);
        assert_eq!(q.signed_min(), -2048);
        assert_eq!(q.signed_max(), 2047);
        assert_eq!(q.unquantize_signed(q.quantize_signed(4000)), 2047);
    }

    #[test]
    fn bit_count_is_clamped() {
        assert_eq!(Quantization::new(0).bit_count(), 1);
        assert_eq!(Quantization::new(40).bit_count(), 31);
    }

    #[test]
    fn degenerate_range_collapses_to_min() {
        let q = Quantization::with_range(8, 5.0, 5.0);
        assert_eq!(q.quantize_float(100.0), 0);
        assert_eq!(q.unquantize_float(200), 5.0);
    }
}
