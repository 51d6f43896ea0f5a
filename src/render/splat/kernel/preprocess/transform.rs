//! Projecting 3D Gaussians onto the screen.

pub use super::*;

/// The bound of clip space for culling, relative to `w`.
pub const FRUSTUM_BOUND: f32 = 1.2;
/// $ c_f $, the low-pass filter added to the 2D covariance.
pub const FILTER_LOW_PASS: f32 = 0.3;
/// The floor of the minor eigenvalue.
pub const EIGENVALUE_MIN: f32 = 0.1;

/// Checking whether the clip-space position is outside the expanded frustum.
///
/// $$ \text{Culled if } z < -w \lor |x| > 1.2 w \lor |y| > 1.2 w $$
#[inline]
pub fn is_culled(clip: [f32; 4]) -> bool {
    let [x, y, z, w] = clip;
    let bound = FRUSTUM_BOUND * w;
    z < -w || x.abs() > bound || y.abs() > bound
}

/// Projecting the 3D covariance onto screen space in pixels.
///
/// ## Arguments
///
/// * `camspace` - The position in view space, whose `z` is negative.
/// * `covariance_3d` - `[xx, xy, xz, yy, yz, zz]` in world space.
///
/// ## Returns
///
/// `[xx, xy, yy]`
///
/// ## Details
///
/// $$ d = -P_v.z $$
/// $$ J = \begin{bmatrix}
///     \frac{\text{fl}_x}{d} & 0 & \frac{P_v.x}{d^2} \cdot \text{fl}_x
/// \\\ 0 & \frac{\text{fl}_y}{d} & \frac{P_v.y}{d^2} \cdot \text{fl}_y
/// \end{bmatrix} $$
/// $$ T = J R_v $$
/// $$ \Sigma^' = T \Sigma T^T + c_f I $$
pub fn covariance_2d(
    camera: &CameraUniform,
    camspace: [f32; 4],
    covariance_3d: [f32; 6],
) -> [f32; 3] {
    let [x, y, z, _] = camspace;
    let [fx, fy] = camera.focal;
    let d = -z;
    let j = [[fx / d, 0.0, fx * x / (d * d)], [0.0, fy / d, fy * y / (d * d)]];

    // R_v[row][col]
    let r = &camera.view;
    let t: [[f32; 3]; 2] = std::array::from_fn(|row| {
        std::array::from_fn(|col| {
            j[row][0] * r[col][0] + j[row][1] * r[col][1] + j[row][2] * r[col][2]
        })
    });

    let [c_xx, c_xy, c_xz, c_yy, c_yz, c_zz] = covariance_3d;
    let sigma = [[c_xx, c_xy, c_xz], [c_xy, c_yy, c_yz], [c_xz, c_yz, c_zz]];
    // T Sigma
    let ts: [[f32; 3]; 2] = std::array::from_fn(|row| {
        std::array::from_fn(|col| {
            t[row][0] * sigma[0][col] + t[row][1] * sigma[1][col] + t[row][2] * sigma[2][col]
        })
    });
    let entry = |row: usize, col: usize| {
        ts[row][0] * t[col][0] + ts[row][1] * t[col][1] + ts[row][2] * t[col][2]
    };

    [
        entry(0, 0) + FILTER_LOW_PASS,
        entry(0, 1),
        entry(1, 1) + FILTER_LOW_PASS,
    ]
}

/// Decomposing the 2D covariance into two scaled principal axes in NDC units.
///
/// ## Details
///
/// $$ \lambda_{1,2} = m \pm \sqrt{(\frac{a - c}{2})^2 + b^2},\ m = \frac{a + c}{2} $$
/// $$ \lambda_2 \leftarrow \max(\lambda_2, 0.1) $$
/// $$ e_1 = \frac{[b\ \ \lambda_1 - a]}{|[b\ \ \lambda_1 - a]|},\ e_2 = [e_1.y\ \ -e_1.x] $$
/// $$ A_i = \frac{\sqrt{2 \lambda_i} \cdot e_i}{\text{im}} $$
pub fn axes(
    covariance_2d: [f32; 3],
    viewport: [f32; 2],
) -> ([f32; 2], [f32; 2]) {
    let [a, b, c] = covariance_2d;
    let mid = (a + c) / 2.0;
    let radius = (((a - c) / 2.0).powi(2) + b * b).sqrt();
    let lambda_1 = mid + radius;
    let lambda_2 = (mid - radius).max(EIGENVALUE_MIN);

    let e = [b, lambda_1 - a];
    let length = (e[0] * e[0] + e[1] * e[1]).sqrt();
    // Circular
    let e_1 = if length > 0.0 {
        [e[0] / length, e[1] / length]
    } else {
        [1.0, 0.0]
    };
    let e_2 = [e_1[1], -e_1[0]];

    let scale_1 = (2.0 * lambda_1).sqrt();
    let scale_2 = (2.0 * lambda_2).sqrt();
    (
        [e_1[0] * scale_1 / viewport[0], e_1[1] * scale_1 / viewport[1]],
        [e_2[0] * scale_2 / viewport[0], e_2[1] * scale_2 / viewport[1]],
    )
}

/// The sort key increasing with the NDC depth.
///
/// The depth of a survivor is at least `-1`,
/// so the key is the bits of a non-negative float.
#[inline]
pub fn depth_key(depth: f32) -> u32 {
    (depth + 1.0).max(0.0).to_bits()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera(focal: [f32; 2]) -> CameraUniform {
        let identity = [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        CameraUniform {
            view: identity,
            view_inverse: identity,
            focal,
            viewport: [100.0, 100.0],
            ..Default::default()
        }
    }

    #[test]
    fn culling_bounds() {
        assert!(!is_culled([0.0, 0.0, 0.0, 1.0]));
        assert!(!is_culled([1.2, -1.2, -1.0, 1.0]));
        assert!(!is_culled([2.4, 0.0, 3.0, 2.0]));
        assert!(is_culled([1.21, 0.0, 0.0, 1.0]));
        assert!(is_culled([0.0, -1.21, 0.0, 1.0]));
        assert!(is_culled([0.0, 0.0, -1.01, 1.0]));
        // Behind the camera
        assert!(is_culled([0.0, 0.0, -3.0, -2.0]));
    }

    #[test]
    fn circle_when_head_on() {
        let camera = camera([1.0, 1.0]);
        for k in [0.5, 4.0, 100.0] {
            let covariance = covariance_2d(
                &camera,
                [0.0, 0.0, -2.0, 1.0],
                [k, 0.0, 0.0, k, 0.0, k],
            );
            assert_eq!(covariance, [k / 4.0 + 0.3, 0.0, k / 4.0 + 0.3]);

            let (axis_1, axis_2) = axes(covariance, camera.viewport);
            let length_1 = axis_1[0].hypot(axis_1[1]);
            let length_2 = axis_2[0].hypot(axis_2[1]);
            let dot = axis_1[0] * axis_2[0] + axis_1[1] * axis_2[1];
            assert!((length_1 - length_2).abs() <= 1e-6, "{axis_1:?} {axis_2:?}");
            assert!(dot.abs() <= 1e-6);
        }
    }

    #[test]
    fn covariance_2d_follows_the_jacobian() {
        let camera = camera([2.0, 3.0]);
        // Only zz is non-zero, so the off-axis terms of J contribute
        let covariance = covariance_2d(
            &camera,
            [1.0, -1.0, -2.0, 1.0],
            [0.0, 0.0, 0.0, 0.0, 0.0, 1.0],
        );
        // J = [[1, 0, 0.5], [0, 1.5, -0.75]]
        assert_eq!(covariance, [0.25 + 0.3, -0.375, 0.5625 + 0.3]);
    }

    #[test]
    fn axes_are_eigenvectors() {
        let (axis_1, axis_2) = axes([5.0, 2.0, 2.0], [1.0, 1.0]);
        // The eigenvalues are 6 and 1
        let e_1 = [2.0 / 5.0_f32.sqrt(), 1.0 / 5.0_f32.sqrt()];
        for (a, e) in axis_1.iter().zip(e_1) {
            assert!((a - e * 12.0_f32.sqrt()).abs() <= 1e-5, "{axis_1:?}");
        }
        let e_2 = [e_1[1], -e_1[0]];
        for (a, e) in axis_2.iter().zip(e_2) {
            assert!((a - e * 2.0_f32.sqrt()).abs() <= 1e-5, "{axis_2:?}");
        }

        // The minor eigenvalue is floored
        let (_, axis_2) = axes([1.0, 0.0, 0.0], [1.0, 1.0]);
        assert!((axis_2[0].hypot(axis_2[1]) - 0.2_f32.sqrt()).abs() <= 1e-6);

        // The major axis is along y
        let (axis_1, _) = axes([1.0, 0.0, 4.0], [2.0, 4.0]);
        assert_eq!(axis_1, [0.0, 8.0_f32.sqrt() / 4.0]);
    }

    #[test]
    fn depth_keys_are_ordered() {
        let depths = [-1.0, -0.5, 0.0, 0.25, 0.999, 1.5];
        let keys = depths.map(depth_key);
        assert!(keys.windows(2).all(|pair| pair[0] < pair[1]), "{keys:?}");
        assert_eq!(depth_key(-1.0), 0);
    }
}
