//! De-quantization.

pub use super::*;

/// The rescale of coefficient 0 in the features.
pub const FEATURE_SCALE_DC: f32 = 4.0;
/// The rescale of the other coefficients in the features.
pub const FEATURE_SCALE_REST: f32 = 0.5;

/// The configuration for converting a code into a value.
///
/// `value = (code - zero_point) * scale`
#[derive(Config, Copy, Debug, PartialEq)]
pub struct Dequantizer {
    pub scale: f32,
    pub zero_point: i32,
}

impl Dequantizer {
    /// De-quantize the code.
    ///
    /// Out-of-range codes produce out-of-range values.
    #[inline]
    pub fn dequantize(
        &self,
        code: i8,
    ) -> f32 {
        (code as i32 - self.zero_point) as f32 * self.scale
    }

    /// Quantize the value into the nearest code, saturating at the bounds.
    #[inline]
    pub fn quantize(
        &self,
        value: f32,
    ) -> i8 {
        let code = (value / self.scale).round() + self.zero_point as f32;
        code.clamp(i8::MIN as f32, i8::MAX as f32) as i8
    }

    /// Fitting the full code range to `[min, max]`.
    ///
    /// `min` is mapped to [`i8::MIN`].
    pub fn fit(
        min: f32,
        max: f32,
    ) -> Self {
        let range = max - min;
        let scale = if range > 0.0 {
            range / 255.0
        } else {
            min.abs().max(1.0) / i8::MAX as f32
        };
        let zero_point = (i8::MIN as f32 - min / scale).round() as i32;
        Self::new(scale, zero_point)
    }

    /// Fitting to the bounds of the values.
    pub fn fit_values(values: impl IntoIterator<Item = f32>) -> Self {
        let (min, max) = values
            .into_iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), value| {
                (min.min(value), max.max(value))
            });
        if min > max {
            return Self::new(1.0, 0);
        }
        Self::fit(min, max)
    }
}

impl QuantizationConfig {
    /// The opacity, which is not clamped.
    #[inline]
    pub fn opacity(
        &self,
        code: i8,
    ) -> f32 {
        self.opacity.dequantize(code)
    }

    /// The unit quaternion in `[x, y, z, w]`.
    ///
    /// A zero vector yields the identity quaternion.
    #[inline]
    pub fn rotation(
        &self,
        codes: [i8; 4],
    ) -> [f32; 4] {
        let rotation = codes.map(|code| self.rotation.dequantize(code));
        let norm = rotation.iter().map(|r| r * r).sum::<f32>().sqrt();
        if norm == 0.0 {
            return [0.0, 0.0, 0.0, 1.0];
        }
        rotation.map(|r| r / norm)
    }

    /// The scaling in linear space.
    ///
    /// ## Arguments
    ///
    /// * `codes` - `[x, y, z]` in log space.
    /// * `factor` - The code of magnitude,
    ///   used only if [`Self::scaling_factor`] has a non-zero scale.
    #[inline]
    pub fn scaling(
        &self,
        codes: [i8; 3],
        factor: i8,
    ) -> [f32; 3] {
        let scaling = codes.map(|code| self.scaling.dequantize(code).exp());
        match self.scaling_factor {
            Some(dequantizer) if dequantizer.scale != 0.0 => {
                let norm = scaling.iter().map(|s| s * s).sum::<f32>().sqrt();
                let magnitude = dequantizer.dequantize(factor).exp();
                scaling.map(|s| s / norm * magnitude)
            },
            _ => scaling,
        }
    }

    /// The SH coefficient component at `index` of a row.
    #[inline]
    pub fn feature(
        &self,
        code: i8,
        index: usize,
    ) -> f32 {
        let scale = if index == 0 {
            FEATURE_SCALE_DC
        } else {
            FEATURE_SCALE_REST
        };
        self.features.dequantize(code) * scale
    }
}
