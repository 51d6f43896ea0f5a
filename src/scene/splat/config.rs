pub use super::*;
pub use crate::scene::point::{Point, Points};

use crate::spherical_harmonics::SH_COEF;
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};

/// Initializing a splat scene from colored points.
#[derive(Clone, Debug, PartialEq)]
pub struct SplatSceneConfig {
    pub degree: ShDegree,
    pub encoding: ShEncoding,
    pub points: Points,
}

impl Default for SplatSceneConfig {
    fn default() -> Self {
        Self {
            degree: Default::default(),
            encoding: ShEncoding::Half,
            points: vec![Default::default()],
        }
    }
}

impl SplatSceneConfig {
    /// The opacity of every initial splat.
    pub const OPACITY: f32 = 0.5;

    /// Sampling the initial Gaussians.
    ///
    /// Scalings are isotropic, drawn from a log-normal distribution
    /// normalized by the largest sample.
    pub fn gaussians(&self) -> Vec<Gaussian> {
        let mut rng = StdRng::seed_from_u64(0x3D65);
        let samples = (0..self.points.len())
            .map(|_| {
                let sample: f32 = StandardNormal.sample(&mut rng);
                (sample * std::f32::consts::E).exp().max(f32::EPSILON)
            })
            .collect::<Vec<_>>();
        let sample_max = samples.iter().copied().fold(f32::EPSILON, f32::max);

        self.points
            .iter()
            .zip(samples)
            .map(|(point, sample)| {
                let mut colors_sh = [[0.0; 3]; SH_COUNT_MAX];
                colors_sh[0] = point.color_rgb.map(|c| (c as f32 - 0.5) / SH_COEF.0[0]);
                let scaling = (sample / sample_max).sqrt().max(f32::EPSILON);
                Gaussian {
                    colors_sh,
                    opacity: Self::OPACITY,
                    position: point.position.map(|c| c as f32),
                    rotation: [0.0, 0.0, 0.0, 1.0],
                    scaling: [scaling; 3],
                }
            })
            .collect()
    }
}

impl From<SplatSceneConfig> for SplatScene {
    fn from(config: SplatSceneConfig) -> Self {
        Self::from_gaussians(&config.gaussians(), config.encoding, config.degree)
    }
}
