pub mod gaussian;
pub mod point;
pub mod quantized;
pub mod splat;

pub use crate::{error::Error, spherical_harmonics};

/// Per-point attributes read by the preprocess kernel.
///
/// The implementors are structure-of-arrays datasets
/// in different storage layouts.
pub trait SplatSource: Sync {
    /// `P`
    fn point_count(&self) -> usize;

    /// The position in world space and the opacity.
    fn position_opacity(
        &self,
        index: usize,
    ) -> ([f32; 3], f32);

    /// The symmetric 3D covariance matrix in world space.
    ///
    /// `[xx, xy, xz, yy, yz, zz]`
    fn covariance_3d(
        &self,
        index: usize,
    ) -> [f32; 6];

    /// The row index into the SH coefficient table.
    fn colors_sh_index(
        &self,
        index: usize,
    ) -> u32;
}
