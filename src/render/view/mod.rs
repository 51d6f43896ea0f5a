pub mod camera;

pub use super::Error;
pub use camera::*;

/// A pinhole view of the scene.
///
/// The camera position is not stored,
/// since it follows from [`Self::view_transform`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct View {
    /// The horizontal field of view in radians.
    pub field_of_view_x: f64,
    /// The vertical field of view in radians.
    pub field_of_view_y: f64,
    pub image_height: u32,
    pub image_width: u32,
    /// The rigid transformation from world space to view space.
    ///
    /// The view space is right-handed with `+z` forward and `+y` downward.
    /// [`CameraUniform::from_view`] flips it for the kernels.
    ///
    /// It is in **column-major order**, i.e., `M[col][row]`.
    pub view_transform: [[f64; 4]; 4],
}

impl View {
    /// Assembling `[R | t]` in column-major order.
    ///
    /// ## Arguments
    ///
    /// * `rotation` - The columns of `R`.
    /// * `translation` - `t`, the world origin in view space.
    #[inline]
    pub const fn transform(
        rotation: &[[f64; 3]; 3],
        translation: &[f64; 3],
    ) -> [[f64; 4]; 4] {
        let [r0, r1, r2] = rotation;
        let t = translation;
        [
            [r0[0], r0[1], r0[2], 0.0],
            [r1[0], r1[1], r1[2], 0.0],
            [r2[0], r2[1], r2[2], 0.0],
            [t[0], t[1], t[2], 1.0],
        ]
    }

    /// `[I_x, I_y]`
    #[inline]
    pub const fn image_size(&self) -> [u32; 2] {
        [self.image_width, self.image_height]
    }
}
