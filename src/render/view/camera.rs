//! Camera uniform block.

pub use super::*;
pub use bytemuck::{Pod, Zeroable};

/// The camera state read by the kernels.
///
/// The matrices are in **column-major order**, i.e., `M[col][row]`.
/// The view space is right-handed with `-z` forward and `+y` upward,
/// and the visible clip space is `-w <= z <= w`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct CameraUniform {
    /// World space to view space.
    pub view: [[f32; 4]; 4],
    /// View space to world space.
    pub view_inverse: [[f32; 4]; 4],
    /// View space to clip space.
    pub projection: [[f32; 4]; 4],
    /// Clip space to view space.
    pub projection_inverse: [[f32; 4]; 4],
    /// `[I_x, I_y]`
    pub viewport: [f32; 2],
    /// Focal lengths in pixels.
    pub focal: [f32; 2],
}

impl CameraUniform {
    /// Building the camera from the view and the depth range.
    ///
    /// The view transform is expected to be rigid.
    pub fn from_view(
        view: &View,
        z_near: f32,
        z_far: f32,
    ) -> Result<Self, Error> {
        if !(z_near > 0.0 && z_far > z_near) {
            return Err(Error::Validation(
                format!("the depth range ({z_near}, {z_far})"),
                "positive and increasing".into(),
            ));
        }
        if view.image_width == 0 || view.image_height == 0 {
            return Err(Error::Validation(
                format!("the image size {:?}", view.image_size()),
                "non-zero".into(),
            ));
        }

        let field_of_view_x_half_tan = (view.field_of_view_x / 2.0).tan();
        let field_of_view_y_half_tan = (view.field_of_view_y / 2.0).tan();
        if !(field_of_view_x_half_tan > 0.0 && field_of_view_y_half_tan > 0.0) {
            return Err(Error::Validation(
                format!(
                    "the fields of view ({}, {})",
                    view.field_of_view_x, view.field_of_view_y
                ),
                "in (0, PI)".into(),
            ));
        }

        let focal = [
            (view.image_width as f64 / field_of_view_x_half_tan / 2.0) as f32,
            (view.image_height as f64 / field_of_view_y_half_tan / 2.0) as f32,
        ];
        let viewport = view.image_size().map(|size| size as f32);

        // Flipping y and z of the view space
        let view_transform = view.view_transform.map(|column| {
            [column[0], -column[1], -column[2], column[3]].map(|c| c as f32)
        });
        let view_inverse = rigid_inverse(&view_transform);

        let x = (1.0 / field_of_view_x_half_tan) as f32;
        let y = (1.0 / field_of_view_y_half_tan) as f32;
        let (n, f) = (z_near, z_far);
        let projection = [
            [x, 0.0, 0.0, 0.0],
            [0.0, y, 0.0, 0.0],
            [0.0, 0.0, (f + n) / (n - f), -1.0],
            [0.0, 0.0, 2.0 * f * n / (n - f), 0.0],
        ];
        let projection_inverse = [
            [1.0 / x, 0.0, 0.0, 0.0],
            [0.0, 1.0 / y, 0.0, 0.0],
            [0.0, 0.0, 0.0, (n - f) / (2.0 * f * n)],
            [0.0, 0.0, -1.0, (f + n) / (2.0 * f * n)],
        ];

        Ok(Self {
            view: view_transform,
            view_inverse,
            projection,
            projection_inverse,
            viewport,
            focal,
        })
    }

    /// The camera position in world space.
    #[inline]
    pub fn position(&self) -> [f32; 3] {
        let [x, y, z, _] = self.view_inverse[3];
        [x, y, z]
    }
}

/// `M * v` with `M` in column-major order.
#[inline]
pub fn transform(
    m: &[[f32; 4]; 4],
    v: [f32; 4],
) -> [f32; 4] {
    std::array::from_fn(|row| {
        m[0][row] * v[0] + m[1][row] * v[1] + m[2][row] * v[2] + m[3][row] * v[3]
    })
}

/// Inverting `[R | t]` into `[R^T | -R^T t]`.
fn rigid_inverse(m: &[[f32; 4]; 4]) -> [[f32; 4]; 4] {
    let t = [m[3][0], m[3][1], m[3][2]];
    let mut inverse = [[0.0; 4]; 4];
    for col in 0..3 {
        for row in 0..3 {
            inverse[col][row] = m[row][col];
        }
    }
    for row in 0..3 {
        inverse[3][row] = -(m[row][0] * t[0] + m[row][1] * t[1] + m[row][2] * t[2]);
    }
    inverse[3][3] = 1.0;
    inverse
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> View {
        View {
            field_of_view_x: std::f64::consts::FRAC_PI_2,
            field_of_view_y: std::f64::consts::FRAC_PI_2,
            image_height: 200,
            image_width: 400,
            view_transform: View::transform(
                &[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
                &[0.0, 0.0, 2.0],
            ),
        }
    }

    fn assert_close(
        output: &[f32],
        target: &[f32],
    ) {
        for (o, t) in output.iter().zip(target) {
            assert!((o - t).abs() <= 1e-5, "{output:?} != {target:?}");
        }
    }

    #[test]
    fn from_view() {
        let camera = CameraUniform::from_view(&view(), 0.1, 100.0).unwrap();
        assert_eq!(camera.viewport, [400.0, 200.0]);
        assert_close(&camera.focal, &[200.0, 100.0]);
        assert_close(&camera.position(), &[0.0, 0.0, -2.0]);

        // A point ahead in the view space is at -z
        let camspace = transform(&camera.view, [0.0, 1.0, 3.0, 1.0]);
        assert_close(&camspace, &[0.0, -1.0, -5.0, 1.0]);

        let clip = transform(&camera.projection, camspace);
        assert_close(&clip[..2], &[0.0, -1.0]);
        assert_eq!(clip[3], 5.0);
        assert!(clip[2] > -clip[3] && clip[2] < clip[3]);
    }

    #[test]
    fn inverses() {
        let mut view = view();
        let (s, c) = 0.3_f64.sin_cos();
        view.view_transform = View::transform(
            &[[c, 0.0, -s], [0.0, 1.0, 0.0], [s, 0.0, c]],
            &[0.5, -1.0, 4.0],
        );
        let camera = CameraUniform::from_view(&view, 0.5, 50.0).unwrap();

        let point = [0.25, -0.75, 1.5, 1.0];
        let output = transform(&camera.view_inverse, transform(&camera.view, point));
        assert_close(&output, &point);

        let output =
            transform(&camera.projection_inverse, transform(&camera.projection, point));
        assert_close(&output, &point);
    }

    #[test]
    fn depth_range_is_clip_range() {
        let camera = CameraUniform::from_view(&view(), 1.0, 10.0).unwrap();
        for (z, target) in [(-1.0, -1.0), (-10.0, 1.0)] {
            let clip = transform(&camera.projection, [0.0, 0.0, z, 1.0]);
            assert_close(&[clip[2] / clip[3]], &[target]);
        }
    }

    #[test]
    fn invalid_views() {
        let error = CameraUniform::from_view(&view(), 0.0, 1.0).unwrap_err();
        assert!(matches!(error, Error::Validation(_, _)), "{error:?}");

        let error = CameraUniform::from_view(&view(), 2.0, 1.0).unwrap_err();
        assert!(matches!(error, Error::Validation(_, _)), "{error:?}");

        let mut empty = view();
        empty.image_width = 0;
        let error = CameraUniform::from_view(&empty, 0.1, 1.0).unwrap_err();
        assert!(matches!(error, Error::Validation(_, _)), "{error:?}");

        let mut flat = view();
        flat.field_of_view_x = 0.0;
        let error = CameraUniform::from_view(&flat, 0.1, 1.0).unwrap_err();
        assert!(matches!(error, Error::Validation(_, _)), "{error:?}");
    }
}
