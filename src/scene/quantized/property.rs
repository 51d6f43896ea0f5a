//! Quantized splat scene property implementation.

pub use super::*;

use crate::{
    packing::unpack2x16float,
    scene::gaussian::covariance_3d,
    spherical_harmonics::ShCoefficients,
};
use humansize::{format_size, BINARY};
use std::fmt;

/// Reader of the quantized features.
#[derive(Clone, Copy, Debug)]
pub struct FeatureReader<'a> {
    pub codes: &'a [i8],
    pub dequantizer: &'a QuantizationConfig,
    pub stride: usize,
}

impl ShCoefficients for FeatureReader<'_> {
    #[inline]
    fn coefficient(
        &self,
        row: u32,
        index: usize,
    ) -> [f32; 3] {
        let offset = row as usize * self.stride + index * 3;
        let c = &self.codes[offset..offset + 3];
        [
            self.dequantizer.feature(c[0], index),
            self.dequantizer.feature(c[1], index),
            self.dequantizer.feature(c[2], index),
        ]
    }
}

impl QuantizedSplatScene {
    /// The reader of [`Self::features`].
    #[inline]
    pub fn feature_reader(&self) -> FeatureReader<'_> {
        FeatureReader {
            codes: &self.features,
            dequantizer: &self.config,
            stride: self.row_stride(),
        }
    }

    /// The position in world space.
    #[inline]
    pub fn position(
        &self,
        index: usize,
    ) -> [f32; 3] {
        let position = self.splats[index].position;
        let [x, y] = unpack2x16float(position[0]);
        let [z, _] = unpack2x16float(position[1]);
        [x, y, z]
    }

    /// The rotation in `[x, y, z, w]` and the scaling.
    #[inline]
    pub fn rotation_scaling(
        &self,
        index: usize,
    ) -> ([f32; 4], [f32; 3]) {
        let splat = &self.splats[index];
        let geometry = &self.geometries[splat.geometry_index as usize];
        let [x, y, z, _] = geometry.scaling;
        (
            self.config.rotation(geometry.rotation),
            self.config.scaling([x, y, z], splat.scaling_factor),
        )
    }

    /// Number of splats.
    #[inline]
    pub fn point_count(&self) -> usize {
        self.splats.len()
    }

    /// Size of the records in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.splats.len() * size_of::<QuantizedSplat>()
            + self.geometries.len() * size_of::<QuantizedGeometry>()
            + self.features.len()
    }

    /// Readable size of the records.
    #[inline]
    pub fn size_readable(&self) -> String {
        format_size(self.size(), BINARY.decimal_places(1))
    }
}

impl SplatSource for QuantizedSplatScene {
    #[inline]
    fn point_count(&self) -> usize {
        self.splats.len()
    }

    #[inline]
    fn position_opacity(
        &self,
        index: usize,
    ) -> ([f32; 3], f32) {
        let opacity = self.config.opacity(self.splats[index].opacity);
        (self.position(index), opacity)
    }

    #[inline]
    fn covariance_3d(
        &self,
        index: usize,
    ) -> [f32; 6] {
        let (rotation, scaling) = self.rotation_scaling(index);
        covariance_3d(rotation, scaling)
    }

    #[inline]
    fn colors_sh_index(
        &self,
        index: usize,
    ) -> u32 {
        self.splats[index].colors_sh_index
    }
}

impl fmt::Debug for QuantizedSplatScene {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("QuantizedSplatScene")
            .field("point_count", &self.point_count())
            .field("geometries.len()", &self.geometries.len())
            .field("degree", &self.degree)
            .field("config", &self.config)
            .field("size", &self.size_readable())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn feature_reader_rescales() {
        use super::*;

        let dequantizer = Dequantizer::new(0.5, 0);
        let scene = QuantizedSplatScene {
            config: QuantizationConfig::new(dequantizer, dequantizer, dequantizer, dequantizer),
            features: (0..24).collect(),
            degree: ShDegree::One,
            geometries: vec![],
            splats: vec![],
        };
        let reader = scene.feature_reader();

        assert_eq!(reader.coefficient(0, 0), [0.0, 2.0, 4.0]);
        assert_eq!(reader.coefficient(0, 1), [0.75, 1.0, 1.25]);
        assert_eq!(reader.coefficient(1, 0), [24.0, 26.0, 28.0]);
        assert_eq!(reader.coefficient(1, 3), [5.25, 5.5, 5.75]);
        assert_eq!(scene.size(), 24);
    }
}
