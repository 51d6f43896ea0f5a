//! Encoding Gaussians into a splat scene.

pub use super::*;

use std::collections::HashMap;

impl SplatScene {
    /// Encoding the Gaussians into packed records.
    ///
    /// Gaussians with the same packed covariance share one geometry entry.
    /// Each Gaussian owns one row of SH coefficients.
    pub fn from_gaussians(
        gaussians: &[Gaussian],
        encoding: ShEncoding,
        degree: ShDegree,
    ) -> Self {
        #[cfg(debug_assertions)]
        log::debug!(
            target: "gausplat::preprocessor::scene::splat",
            "from_gaussians > {} points in {encoding}",
            gaussians.len(),
        );

        let mut geometries = Vec::new();
        let mut geometry_indices = HashMap::<[u32; 3], u32>::new();
        let splats = gaussians
            .iter()
            .enumerate()
            .map(|(index, gaussian)| {
                let geometry = Geometry::new(gaussian.covariance_3d());
                let geometry_index =
                    *geometry_indices.entry(geometry.covariance).or_insert_with(|| {
                        geometries.push(geometry);
                        geometries.len() as u32 - 1
                    });
                Splat::new(
                    gaussian.position,
                    gaussian.opacity,
                    geometry_index,
                    index as u32,
                )
            })
            .collect();

        let rows = gaussians.iter().map(|g| g.colors_sh).collect::<Vec<_>>();
        let colors_sh = ShTable::encode(encoding, degree, &rows);

        Self {
            colors_sh,
            geometries,
            splats,
        }
    }
}
