//! Splat scene with attributes in 8-bit quantized codes.
//!
//! The codes are decoded with a per-table [`Dequantizer`] pair,
//! so the kernels read floating values only.

pub mod dequantize;
pub mod import;
pub mod property;

pub use super::{gaussian::Gaussian, splat::SplatScene, Error, SplatSource};
pub use crate::spherical_harmonics::{ShDegree, ShEncoding, SH_COUNT_MAX};
pub use burn::config::Config;
pub use bytemuck::{Pod, Zeroable};
pub use dequantize::*;
pub use property::*;

/// A splat record with quantized opacity.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct QuantizedSplat {
    /// `[x, y], [z, 0]` in half precision.
    pub position: [u32; 2],
    pub opacity: i8,
    /// The code of the scaling magnitude.
    pub scaling_factor: i8,
    pub _padding: [u8; 2],
    /// The index into [`QuantizedSplatScene::geometries`].
    pub geometry_index: u32,
    /// The row index into [`QuantizedSplatScene::features`].
    pub colors_sh_index: u32,
}

/// A geometry record in quantized codes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct QuantizedGeometry {
    /// `[x, y, z, 0]` in log space.
    pub scaling: [i8; 4],
    /// `[x, y, z, w]`
    pub rotation: [i8; 4],
}

/// The dequantization pairs of a quantized scene.
#[derive(Config, Copy, Debug, PartialEq)]
pub struct QuantizationConfig {
    pub opacity: Dequantizer,
    pub scaling: Dequantizer,
    pub rotation: Dequantizer,
    /// SH coefficients before the rescale of [`FEATURE_SCALE_DC`]
    /// and [`FEATURE_SCALE_REST`].
    pub features: Dequantizer,
    /// Applied to [`QuantizedSplat::scaling_factor`] if present.
    pub scaling_factor: Option<Dequantizer>,
}

/// Splat scene in quantized codes.
#[derive(Clone, PartialEq)]
pub struct QuantizedSplatScene {
    pub config: QuantizationConfig,
    /// Feature codes of all rows, `[R, (D + 1) ^ 2, 3]`.
    pub features: Vec<i8>,
    /// The degree of [`Self::features`].
    pub degree: ShDegree,
    /// `[G]`
    pub geometries: Vec<QuantizedGeometry>,
    /// `[P]`
    pub splats: Vec<QuantizedSplat>,
}

impl QuantizedSplatScene {
    /// The count of feature codes in a row.
    #[inline]
    pub fn row_stride(&self) -> usize {
        self.degree.coefficient_count() * 3
    }

    /// The count of feature rows.
    #[inline]
    pub fn row_count(&self) -> usize {
        self.features.len() / self.row_stride()
    }

    /// Checking that every splat refers to existing records.
    pub fn validate(&self) -> Result<(), Error> {
        let stride = self.row_stride();
        if self.features.len() % stride != 0 {
            return Err(Error::Validation(
                format!("the length of features ({})", self.features.len()),
                format!("a multiple of {stride}"),
            ));
        }

        let geometry_count = self.geometries.len();
        let row_count = self.row_count();
        for splat in &self.splats {
            let index = splat.geometry_index as usize;
            if index >= geometry_count {
                return Err(Error::OutOfRange {
                    name: "geometries",
                    index,
                    length: geometry_count,
                });
            }
            let index = splat.colors_sh_index as usize;
            if index >= row_count {
                return Err(Error::OutOfRange {
                    name: "features",
                    index,
                    length: row_count,
                });
            }
        }

        Ok(())
    }
}
