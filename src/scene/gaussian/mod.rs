//! 3D Gaussians in full precision.

pub use crate::spherical_harmonics::SH_COUNT_MAX;

/// A 3D Gaussian with activated attributes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Gaussian {
    /// Colors in SH space, `[M, 3]`.
    ///
    /// `M` is [`SH_COUNT_MAX`].
    pub colors_sh: [[f32; 3]; SH_COUNT_MAX],
    /// It ranges from `0.0` to `1.0`.
    pub opacity: f32,
    /// Position in world space.
    pub position: [f32; 3],
    /// Normalized Hamilton quaternion in scalar-last order, i.e., `[x, y, z, w]`.
    pub rotation: [f32; 4],
    /// Standard deviations along the local axes.
    pub scaling: [f32; 3],
}

impl Gaussian {
    /// The 3D covariance matrix, `[xx, xy, xz, yy, yz, zz]`.
    #[inline]
    pub fn covariance_3d(&self) -> [f32; 6] {
        covariance_3d(self.rotation, self.scaling)
    }
}

impl Default for Gaussian {
    fn default() -> Self {
        Self {
            colors_sh: [[0.0; 3]; SH_COUNT_MAX],
            opacity: 1.0,
            position: [0.0; 3],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scaling: [1.0; 3],
        }
    }
}

/// Converting the normalized quaternion `[x, y, z, w]` to a rotation matrix.
///
/// It is in **row-major order**, i.e., `R[row][col]`.
///
/// $$ R_s = 2 \cdot \begin{bmatrix}
///  \- y^2 - z^2 + \frac{1}{2} & x y - w z & x z + w y
/// \\\ x y + w z & - x^2 - z^2 + \frac{1}{2} & y z - w x
/// \\\ x z - w y & y z + w x & - x^2 - y^2 + \frac{1}{2}
/// \end{bmatrix} $$
pub fn rotation_matrix(rotation: [f32; 4]) -> [[f32; 3]; 3] {
    let [x, y, z, w] = rotation;
    [
        [
            1.0 - 2.0 * (y * y + z * z),
            2.0 * (x * y - w * z),
            2.0 * (x * z + w * y),
        ],
        [
            2.0 * (x * y + w * z),
            1.0 - 2.0 * (x * x + z * z),
            2.0 * (y * z - w * x),
        ],
        [
            2.0 * (x * z - w * y),
            2.0 * (y * z + w * x),
            1.0 - 2.0 * (x * x + y * y),
        ],
    ]
}

/// $$ \Sigma = R_s S_s^2 R_s^T = (R_s S_s) (R_s S_s)^T \in \mathbb{R}^{3 \times 3} $$
pub fn covariance_3d(
    rotation: [f32; 4],
    scaling: [f32; 3],
) -> [f32; 6] {
    let r = rotation_matrix(rotation);
    let s = scaling.map(|s| s * s);
    let entry = |i: usize, j: usize| {
        r[i][0] * s[0] * r[j][0] + r[i][1] * s[1] * r[j][1] + r[i][2] * s[2] * r[j][2]
    };
    [
        entry(0, 0),
        entry(0, 1),
        entry(0, 2),
        entry(1, 1),
        entry(1, 2),
        entry(2, 2),
    ]
}
