//! Quantizing Gaussians and decoding a quantized scene.

pub use super::*;

use crate::{
    packing::pack2x16float,
    scene::splat::{Geometry, Splat},
    spherical_harmonics::{ShCoefficients, ShTable},
};
use std::collections::HashMap;

impl QuantizedSplatScene {
    /// Quantizing the Gaussians with pairs fitted to the bounds of each attribute.
    ///
    /// The scaling is split into a shared direction in log space
    /// and a per-splat magnitude.
    pub fn from_gaussians(
        gaussians: &[Gaussian],
        degree: ShDegree,
    ) -> Self {
        #[cfg(debug_assertions)]
        log::debug!(
            target: "gausplat::preprocessor::scene::quantized",
            "from_gaussians > {} points",
            gaussians.len(),
        );

        let count = degree.coefficient_count();
        let feature = |index: usize, value: f32| {
            if index == 0 {
                value / FEATURE_SCALE_DC
            } else {
                value / FEATURE_SCALE_REST
            }
        };
        let magnitude = |scaling: &[f32; 3]| {
            scaling.iter().map(|s| s * s).sum::<f32>().sqrt().ln()
        };

        let config = QuantizationConfig::new(
            Dequantizer::fit_values(gaussians.iter().map(|g| g.opacity)),
            Dequantizer::fit_values(gaussians.iter().flat_map(|g| g.scaling.map(f32::ln))),
            Dequantizer::new(1.0 / i8::MAX as f32, 0),
            Dequantizer::fit_values(gaussians.iter().flat_map(|g| {
                g.colors_sh[..count]
                    .iter()
                    .enumerate()
                    .flat_map(move |(index, c)| c.map(|c| feature(index, c)))
            })),
        )
        .with_scaling_factor(Some(Dequantizer::fit_values(
            gaussians.iter().map(|g| magnitude(&g.scaling)),
        )));

        let mut geometries = Vec::new();
        let mut geometry_indices = HashMap::<[i8; 8], u32>::new();
        let mut features = Vec::with_capacity(gaussians.len() * count * 3);
        let splats = gaussians
            .iter()
            .enumerate()
            .map(|(index, gaussian)| {
                let [x, y, z] = gaussian.scaling.map(|s| config.scaling.quantize(s.ln()));
                let geometry = QuantizedGeometry {
                    scaling: [x, y, z, 0],
                    rotation: gaussian.rotation.map(|r| config.rotation.quantize(r)),
                };
                let key = bytemuck::cast::<_, [i8; 8]>(geometry);
                let geometry_index = *geometry_indices.entry(key).or_insert_with(|| {
                    geometries.push(geometry);
                    geometries.len() as u32 - 1
                });

                features.extend(gaussian.colors_sh[..count].iter().enumerate().flat_map(
                    |(index, c)| c.map(|c| config.features.quantize(feature(index, c))),
                ));

                let [x, y, z] = gaussian.position;
                let scaling_factor = config
                    .scaling_factor
                    .map(|d| d.quantize(magnitude(&gaussian.scaling)))
                    .unwrap_or_default();
                QuantizedSplat {
                    position: [pack2x16float([x, y]), pack2x16float([z, 0.0])],
                    opacity: config.opacity.quantize(gaussian.opacity),
                    scaling_factor,
                    _padding: [0; 2],
                    geometry_index,
                    colors_sh_index: index as u32,
                }
            })
            .collect();

        Self {
            config,
            features,
            degree,
            geometries,
            splats,
        }
    }

    /// Decoding into a splat scene with SH coefficients in `encoding`.
    pub fn to_scene(
        &self,
        encoding: ShEncoding,
    ) -> Result<SplatScene, Error> {
        self.validate()?;

        let reader = self.feature_reader();
        let count = self.degree.coefficient_count();
        let rows = (0..self.row_count() as u32)
            .map(|row| {
                let mut colors_sh = [[0.0; 3]; SH_COUNT_MAX];
                for (index, c) in colors_sh[..count].iter_mut().enumerate() {
                    *c = reader.coefficient(row, index);
                }
                colors_sh
            })
            .collect::<Vec<_>>();

        let mut geometries = Vec::new();
        let mut geometry_indices = HashMap::<[u32; 3], u32>::new();
        let splats = (0..self.splats.len())
            .map(|index| {
                let (position, opacity) = self.position_opacity(index);
                let geometry = Geometry::new(self.covariance_3d(index));
                let geometry_index =
                    *geometry_indices.entry(geometry.covariance).or_insert_with(|| {
                        geometries.push(geometry);
                        geometries.len() as u32 - 1
                    });
                Splat::new(
                    position,
                    opacity,
                    geometry_index,
                    self.splats[index].colors_sh_index,
                )
            })
            .collect();

        Ok(SplatScene {
            colors_sh: ShTable::encode(encoding, self.degree, &rows),
            geometries,
            splats,
        })
    }
}
