//! Splat scene in packed half-precision records.

pub mod config;
pub mod import;
pub mod property;

pub use super::{gaussian::Gaussian, Error, SplatSource};
pub use crate::spherical_harmonics::{ShDegree, ShEncoding, ShTable, SH_COUNT_MAX};
pub use bytemuck::{Pod, Zeroable};
pub use config::*;

use crate::packing::{pack2x16float, unpack2x16float};

/// A splat record.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Splat {
    /// `[x, y], [z, opacity]` in half precision.
    pub position_opacity: [u32; 2],
    /// The index into [`SplatScene::geometries`].
    pub geometry_index: u32,
    /// The row index into [`SplatScene::colors_sh`].
    pub colors_sh_index: u32,
}

/// A geometry record shared by splats.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Geometry {
    /// `[xx, xy], [xz, yy], [yz, zz]` of the 3D covariance in half precision.
    pub covariance: [u32; 3],
    /// Padding.
    pub _padding: u32,
}

/// Splat scene with geometries and SH coefficients shared by reference.
#[derive(Clone, PartialEq)]
pub struct SplatScene {
    /// SH coefficients.
    pub colors_sh: ShTable,
    /// `[G]`
    pub geometries: Vec<Geometry>,
    /// `[P]`
    pub splats: Vec<Splat>,
}

impl Splat {
    pub fn new(
        position: [f32; 3],
        opacity: f32,
        geometry_index: u32,
        colors_sh_index: u32,
    ) -> Self {
        Self {
            position_opacity: [
                pack2x16float([position[0], position[1]]),
                pack2x16float([position[2], opacity]),
            ],
            geometry_index,
            colors_sh_index,
        }
    }

    #[inline]
    pub fn position(&self) -> [f32; 3] {
        let [x, y] = unpack2x16float(self.position_opacity[0]);
        let [z, _] = unpack2x16float(self.position_opacity[1]);
        [x, y, z]
    }

    #[inline]
    pub fn opacity(&self) -> f32 {
        unpack2x16float(self.position_opacity[1])[1]
    }
}

impl Geometry {
    /// ## Arguments
    ///
    /// * `covariance` - `[xx, xy, xz, yy, yz, zz]`
    pub fn new(covariance: [f32; 6]) -> Self {
        let c = covariance;
        Self {
            covariance: [
                pack2x16float([c[0], c[1]]),
                pack2x16float([c[2], c[3]]),
                pack2x16float([c[4], c[5]]),
            ],
            _padding: 0,
        }
    }

    /// `[xx, xy, xz, yy, yz, zz]`
    #[inline]
    pub fn covariance(&self) -> [f32; 6] {
        let [c0, c1] = unpack2x16float(self.covariance[0]);
        let [c2, c3] = unpack2x16float(self.covariance[1]);
        let [c4, c5] = unpack2x16float(self.covariance[2]);
        [c0, c1, c2, c3, c4, c5]
    }
}

impl SplatScene {
    /// Checking that every splat refers to existing records.
    pub fn validate(&self) -> Result<(), Error> {
        self.colors_sh.validate()?;

        let geometry_count = self.geometries.len();
        let row_count = self.colors_sh.row_count();
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
                    name: "colors_sh",
                    index,
                    length: row_count,
                });
            }
        }

        Ok(())
    }
}

impl SplatSource for SplatScene {
    #[inline]
    fn point_count(&self) -> usize {
        self.splats.len()
    }

    #[inline]
    fn position_opacity(
        &self,
        index: usize,
    ) -> ([f32; 3], f32) {
        let splat = &self.splats[index];
        (splat.position(), splat.opacity())
    }

    #[inline]
    fn covariance_3d(
        &self,
        index: usize,
    ) -> [f32; 6] {
        self.geometries[self.splats[index].geometry_index as usize].covariance()
    }

    #[inline]
    fn colors_sh_index(
        &self,
        index: usize,
    ) -> u32 {
        self.splats[index].colors_sh_index
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn record_layouts() {
        use super::*;

        assert_eq!(size_of::<Splat>(), 16);
        assert_eq!(size_of::<Geometry>(), 16);

        let splat = Splat::new([1.0, -2.0, 0.5], 0.25, 3, 4);
        assert_eq!(splat.position(), [1.0, -2.0, 0.5]);
        assert_eq!(splat.opacity(), 0.25);
        assert_eq!(bytemuck::cast::<_, [u32; 4]>(splat)[2..], [3, 4]);

        let geometry = Geometry::new([1.0, 0.5, 0.25, 2.0, -0.125, 4.0]);
        assert_eq!(geometry.covariance(), [1.0, 0.5, 0.25, 2.0, -0.125, 4.0]);
    }

    #[test]
    fn validate_indices() {
        use super::*;

        let colors_sh = ShTable::encode(
            ShEncoding::Half,
            ShDegree::Zero,
            &[[[0.0; 3]; SH_COUNT_MAX]; 2],
        );
        let mut scene = SplatScene {
            colors_sh,
            geometries: vec![Geometry::default()],
            splats: vec![Splat::new([0.0; 3], 1.0, 0, 1); 3],
        };
        scene.validate().unwrap();
        assert_eq!(scene.point_count(), 3);
        assert_eq!(scene.colors_sh_index(2), 1);

        scene.splats[1].geometry_index = 1;
        let error = scene.validate().unwrap_err();
        assert!(
            matches!(error, Error::OutOfRange { name: "geometries", index: 1, length: 1 }),
            "{error:?}",
        );

        scene.splats[1].geometry_index = 0;
        scene.splats[2].colors_sh_index = 2;
        let error = scene.validate().unwrap_err();
        assert!(
            matches!(error, Error::OutOfRange { name: "colors_sh", index: 2, length: 2 }),
            "{error:?}",
        );
    }
}
