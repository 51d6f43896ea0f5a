pub mod kernel;

pub use super::{CameraUniform, Error, View};
pub use crate::scene::{quantized::QuantizedSplatScene, splat::SplatScene};
pub use burn::config::Config;
pub use kernel::{preprocess, rasterize};

use crate::{
    buffer::{DispatchIndirectArgs, DrawIndirectArgs},
    spherical_harmonics::{ReaderFn, ShCoefficients, ShDegree, SH_DEGREE_MAX},
};
use std::fmt;

#[derive(Config, Debug)]
pub struct SplatRenderOptions {
    #[config(default = "SH_DEGREE_MAX")]
    /// It should be no more than [`SH_DEGREE_MAX`].
    pub colors_sh_degree_max: u32,
    /// The near plane in view space.
    #[config(default = 0.01)]
    pub z_near: f32,
    /// The far plane in view space.
    #[config(default = 1000.0)]
    pub z_far: f32,
}

/// Preprocessing a splat scene for a frame.
pub trait SplatPreprocessor: Sync {
    /// `P`
    fn point_count(&self) -> usize;

    /// The degree of the SH coefficients in the dataset.
    fn colors_sh_degree(&self) -> ShDegree;

    /// Running [`preprocess::main`] over all splats.
    ///
    /// The SH degree is the lower of the dataset and the options.
    fn preprocess(
        &self,
        camera: &CameraUniform,
        options: &SplatRenderOptions,
        outputs: &preprocess::Outputs,
    ) -> Result<(), Error>;

    /// Rendering the scene with the software rasterizer.
    fn render(
        &self,
        view: &View,
        options: &SplatRenderOptions,
    ) -> Result<SplatRenderOutput, Error> {
        render(self, view, options)
    }
}

#[derive(Clone, PartialEq)]
pub struct SplatRenderOutput {
    /// `[I_y * I_x, 4]` with premultiplied alpha.
    pub colors_rgba_2d: Vec<[f32; 4]>,
    /// `[I_x, I_y]`
    pub image_size: [u32; 2],
    pub draw_indirect: DrawIndirectArgs,
    pub sort_dispatch: DispatchIndirectArgs,
}

impl fmt::Debug for SplatRenderOutput {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("SplatRenderOutput")
            .field("colors_rgba_2d.len()", &self.colors_rgba_2d.len())
            .field("image_size", &self.image_size)
            .field("draw_indirect", &self.draw_indirect)
            .field("sort_dispatch", &self.sort_dispatch)
            .finish()
    }
}

/// Resolving the degree of the options against the dataset.
fn colors_sh_degree_max(
    options: &SplatRenderOptions,
    degree: ShDegree,
) -> Result<ShDegree, Error> {
    Ok(ShDegree::try_from(options.colors_sh_degree_max)?.min(degree))
}

/// The preprocessing with a resolved SH reader.
struct Preprocess<'a, S> {
    arguments: preprocess::Arguments,
    camera: &'a CameraUniform,
    colors_sh_degree: ShDegree,
    outputs: &'a preprocess::Outputs,
    splats: &'a S,
}

impl<S: crate::scene::SplatSource> ReaderFn<Result<(), Error>> for Preprocess<'_, S> {
    fn call<C: ShCoefficients>(
        self,
        reader: &C,
    ) -> Result<(), Error> {
        preprocess::main(
            self.arguments,
            preprocess::Inputs {
                camera: self.camera,
                colors_sh: reader,
                colors_sh_degree: self.colors_sh_degree,
                splats: self.splats,
            },
            self.outputs,
        )
    }
}

impl SplatPreprocessor for SplatScene {
    #[inline]
    fn point_count(&self) -> usize {
        self.splats.len()
    }

    #[inline]
    fn colors_sh_degree(&self) -> ShDegree {
        self.colors_sh.degree
    }

    fn preprocess(
        &self,
        camera: &CameraUniform,
        options: &SplatRenderOptions,
        outputs: &preprocess::Outputs,
    ) -> Result<(), Error> {
        self.validate()?;

        let degree = colors_sh_degree_max(options, self.colors_sh.degree)?;
        self.colors_sh.with_reader(Preprocess {
            arguments: preprocess::Arguments {
                colors_sh_degree_max: degree.value(),
                point_count: self.splats.len() as u32,
            },
            camera,
            colors_sh_degree: self.colors_sh.degree,
            outputs,
            splats: self,
        })
    }
}

impl SplatPreprocessor for QuantizedSplatScene {
    #[inline]
    fn point_count(&self) -> usize {
        self.splats.len()
    }

    #[inline]
    fn colors_sh_degree(&self) -> ShDegree {
        self.degree
    }

    fn preprocess(
        &self,
        camera: &CameraUniform,
        options: &SplatRenderOptions,
        outputs: &preprocess::Outputs,
    ) -> Result<(), Error> {
        self.validate()?;

        let degree = colors_sh_degree_max(options, self.degree)?;
        Preprocess {
            arguments: preprocess::Arguments {
                colors_sh_degree_max: degree.value(),
                point_count: self.splats.len() as u32,
            },
            camera,
            colors_sh_degree: self.degree,
            outputs,
            splats: self,
        }
        .call(&self.feature_reader())
    }
}

/// Preprocessing, ordering and rasterizing the scene.
pub fn render<P: SplatPreprocessor + ?Sized>(
    scene: &P,
    view: &View,
    options: &SplatRenderOptions,
) -> Result<SplatRenderOutput, Error> {
    #[cfg(debug_assertions)]
    log::debug!(target: "gausplat::preprocessor::splat", "render");

    let camera = CameraUniform::from_view(view, options.z_near, options.z_far)?;
    let outputs = preprocess::Outputs::new(scene.point_count());
    scene.preprocess(&camera, options, &outputs)?;

    let splats_2d = outputs.read_splats_2d()?;
    let indices = rasterize::order_back_to_front(
        &outputs.read_depth_keys()?,
        &outputs.read_indices()?,
    );

    log::info!(
        target: "gausplat::preprocessor::splat",
        "render > keys_size ({}) / point_count ({})",
        splats_2d.len(),
        scene.point_count(),
    );

    let image_size = view.image_size();
    let colors_rgba_2d = rasterize::main(
        rasterize::Arguments {
            image_size_x: image_size[0],
            image_size_y: image_size[1],
        },
        rasterize::Inputs {
            splats_2d: &splats_2d,
            indices: &indices,
        },
    )?
    .colors_rgba_2d;

    Ok(SplatRenderOutput {
        colors_rgba_2d,
        image_size,
        draw_indirect: outputs.draw_indirect.args(),
        sort_dispatch: outputs.sort_dispatch.args(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        scene::gaussian::Gaussian,
        spherical_harmonics::{ShEncoding, SH_COEF},
    };

    fn view() -> View {
        View {
            field_of_view_x: std::f64::consts::FRAC_PI_2,
            field_of_view_y: std::f64::consts::FRAC_PI_2,
            image_height: 16,
            image_width: 16,
            view_transform: View::transform(
                &[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
                &[0.0; 3],
            ),
        }
    }

    fn gaussians() -> Vec<Gaussian> {
        let mut near = Gaussian {
            position: [0.0, 0.0, 4.0],
            scaling: [1.5; 3],
            ..Default::default()
        };
        near.colors_sh[0] = [0.5 / SH_COEF.0[0], -0.5 / SH_COEF.0[0], -0.5 / SH_COEF.0[0]];
        near.colors_sh[1] = [0.3, 0.3, 0.3];
        let mut far = Gaussian {
            position: [0.0, 0.0, 8.0],
            scaling: [8.0; 3],
            ..Default::default()
        };
        far.colors_sh[0] = [-0.5 / SH_COEF.0[0], 0.5 / SH_COEF.0[0], -0.5 / SH_COEF.0[0]];
        let behind = Gaussian {
            position: [0.0, 0.0, -8.0],
            ..Default::default()
        };
        vec![far, near, behind]
    }

    #[test]
    fn default_options() {
        let options = SplatRenderOptions::new();
        assert_eq!(options.colors_sh_degree_max, SH_DEGREE_MAX);
        assert_eq!(options.z_near, 0.01);

        let options = options.with_colors_sh_degree_max(5);
        let scene = SplatScene::from_gaussians(&gaussians(), ShEncoding::Half, ShDegree::One);
        let error = scene.render(&view(), &options).unwrap_err();
        assert!(matches!(error, Error::UnsupportedShDegree(5)), "{error:?}");
    }

    #[test]
    fn render_the_nearest_on_top() {
        let options = SplatRenderOptions::new().with_colors_sh_degree_max(0);
        for encoding in [ShEncoding::Float, ShEncoding::Half, ShEncoding::Byte] {
            let scene = SplatScene::from_gaussians(&gaussians(), encoding, ShDegree::Three);
            let output = scene.render(&view(), &options).unwrap();

            assert_eq!(output.image_size, [16, 16]);
            assert_eq!(output.draw_indirect.instance_count, 2);
            assert_eq!(output.sort_dispatch.x, 2);

            // The near splat is red and covers the center
            let [r, g, _, a] = output.colors_rgba_2d[8 * 16 + 8];
            assert!(a > 0.9, "{encoding}: {a}");
            assert!(r > 0.9 && g < 0.1, "{encoding}: {r} {g}");

            // The far splat is green and larger
            let [r, g, _, a] = output.colors_rgba_2d[8 * 16 + 15];
            assert!(a > 0.0, "{encoding}: {a}");
            assert!(g > r, "{encoding}: {r} {g}");
        }
    }

    #[test]
    fn render_quantized_like_decoded() {
        let options = SplatRenderOptions::new();
        let quantized = QuantizedSplatScene::from_gaussians(&gaussians(), ShDegree::One);
        let decoded = quantized.to_scene(ShEncoding::Float).unwrap();

        let output = quantized.render(&view(), &options).unwrap();
        let target = decoded.render(&view(), &options).unwrap();
        assert_eq!(output.draw_indirect, target.draw_indirect);
        for (output, target) in output.colors_rgba_2d.iter().zip(&target.colors_rgba_2d) {
            for (o, t) in output.iter().zip(target) {
                assert!((o - t).abs() <= 2e-2, "{output:?} != {target:?}");
            }
        }
    }

    #[test]
    fn preprocess_clamps_degree_to_dataset() {
        let scene = SplatScene::from_gaussians(&gaussians(), ShEncoding::Byte, ShDegree::One);
        let camera = CameraUniform::from_view(&view(), 0.01, 100.0).unwrap();
        let outputs = preprocess::Outputs::new(3);

        scene.preprocess(&camera, &SplatRenderOptions::new(), &outputs).unwrap();
        assert_eq!(outputs.keys_size(), 2);
        assert_eq!(scene.colors_sh_degree(), ShDegree::One);

        let mut broken = scene;
        broken.splats[0].geometry_index = 9;
        let outputs = preprocess::Outputs::new(3);
        let error = broken
            .preprocess(&camera, &SplatRenderOptions::new(), &outputs)
            .unwrap_err();
        assert!(matches!(error, Error::OutOfRange { .. }), "{error:?}");
    }
}
