//! Rasterizing the 2D splats as quads with Gaussian falloff.

pub use super::{preprocess::Splat2d, *};

/// The half extent of a quad in local units.
pub const QUAD_EXTENT: f32 = 2.0;

/// Arguments.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Arguments {
    /// $ I_x $
    pub image_size_x: u32,
    /// $ I_y $
    pub image_size_y: u32,
}

/// Inputs.
#[derive(Clone, Copy, Debug)]
pub struct Inputs<'a> {
    /// The compacted 2D splats.
    pub splats_2d: &'a [Splat2d],
    /// The indices into [`Self::splats_2d`] in drawing order, i.e., back to front.
    pub indices: &'a [u32],
}

/// Outputs.
#[derive(Clone, Debug, PartialEq)]
pub struct Outputs {
    /// $ C_{rgba} \in \mathbb{R}^4 $ of $ I_y \times I_x $ pixels,
    /// with premultiplied alpha.
    pub colors_rgba_2d: Vec<[f32; 4]>,
}

/// The vertex passed to the fragment stage.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VertexOutput {
    /// The position in clip space.
    pub position: [f32; 4],
    /// The position in the local basis of the quad.
    pub local: [f32; 2],
    /// RGBA
    pub color: [f32; 4],
}

/// The vertex stage of a quad in triangle-strip order.
///
/// $$ x = \begin{cases} 2 & i \bmod 2 = 0 \\\ -2 & \text{otherwise} \end{cases},\
///    y = \begin{cases} 2 & i < 2 \\\ -2 & \text{otherwise} \end{cases} $$
/// $$ P = C_{xy} + 2 x A_1 + 2 y A_2 $$
pub fn vertex(
    splat_2d: &Splat2d,
    vertex_index: u32,
) -> VertexOutput {
    let x = if vertex_index % 2 == 0 {
        QUAD_EXTENT
    } else {
        -QUAD_EXTENT
    };
    let y = if vertex_index < 2 {
        QUAD_EXTENT
    } else {
        -QUAD_EXTENT
    };

    let [a1_x, a1_y] = splat_2d.axis_1();
    let [a2_x, a2_y] = splat_2d.axis_2();
    let [c_x, c_y, c_z, c_w] = splat_2d.center();
    VertexOutput {
        position: [
            c_x + 2.0 * x * a1_x + 2.0 * y * a2_x,
            c_y + 2.0 * x * a1_y + 2.0 * y * a2_y,
            c_z,
            c_w,
        ],
        local: [x, y],
        color: splat_2d.color(),
    }
}

/// The fragment stage.
///
/// It returns `None` if the fragment is discarded.
///
/// $$ a = -|L|^2 $$
/// $$ \alpha = e^a \cdot o,\ \text{discarded if } a < -4 $$
#[inline]
pub fn fragment(
    local: [f32; 2],
    color: [f32; 4],
) -> Option<[f32; 4]> {
    let a = -(local[0] * local[0] + local[1] * local[1]);
    if a < -QUAD_EXTENT * QUAD_EXTENT {
        return None;
    }
    let alpha = a.exp() * color[3];
    Some([color[0] * alpha, color[1] * alpha, color[2] * alpha, alpha])
}

/// A quad prepared for the pixels.
#[derive(Clone, Copy, Debug)]
struct Quad {
    /// `[x_min, x_max, y_min, y_max]` in pixels, inclusive.
    bounds: [u32; 4],
    center: [f32; 2],
    color: [f32; 4],
    /// Mapping an NDC offset to the local basis.
    inverse: [[f32; 2]; 2],
}

impl Quad {
    fn new(
        splat_2d: &Splat2d,
        image_size: [u32; 2],
    ) -> Option<Self> {
        let corners = (0..4).map(|index| vertex(splat_2d, index).position);
        let (mut x_min, mut x_max, mut y_min, mut y_max) =
            (f32::INFINITY, f32::NEG_INFINITY, f32::INFINITY, f32::NEG_INFINITY);
        for [x, y, _, _] in corners {
            x_min = x_min.min(x);
            x_max = x_max.max(x);
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }

        // NDC to pixels, where y is downward
        let [size_x, size_y] = image_size.map(|size| size as f32);
        let to_pixel = |ndc: f32, size: f32| (ndc + 1.0) / 2.0 * size;
        let pixel_x = [to_pixel(x_min, size_x), to_pixel(x_max, size_x)];
        let pixel_y = [to_pixel(-y_max, size_y), to_pixel(-y_min, size_y)];
        if pixel_x[1] < 0.0 || pixel_y[1] < 0.0 || pixel_x[0] >= size_x || pixel_y[0] >= size_y {
            return None;
        }
        let bounds = [
            pixel_x[0].max(0.0) as u32,
            (pixel_x[1] as u32).min(image_size[0] - 1),
            pixel_y[0].max(0.0) as u32,
            (pixel_y[1] as u32).min(image_size[1] - 1),
        ];

        // [2 A_1 | 2 A_2]^-1
        let [a1_x, a1_y] = splat_2d.axis_1().map(|a| a * 2.0);
        let [a2_x, a2_y] = splat_2d.axis_2().map(|a| a * 2.0);
        let determinant = a1_x * a2_y - a2_x * a1_y;
        if determinant == 0.0 || !determinant.is_finite() {
            return None;
        }
        let inverse = [
            [a2_y / determinant, -a2_x / determinant],
            [-a1_y / determinant, a1_x / determinant],
        ];

        let [c_x, c_y, _, _] = splat_2d.center();
        Some(Self {
            bounds,
            center: [c_x, c_y],
            color: splat_2d.color(),
            inverse,
        })
    }

    /// The local position of the NDC position.
    #[inline]
    fn local(
        &self,
        ndc: [f32; 2],
    ) -> [f32; 2] {
        let d = [ndc[0] - self.center[0], ndc[1] - self.center[1]];
        [
            self.inverse[0][0] * d[0] + self.inverse[0][1] * d[1],
            self.inverse[1][0] * d[0] + self.inverse[1][1] * d[1],
        ]
    }
}

/// Rasterizing the 2D splats in the given order.
///
/// Each pixel center runs the [fragment stage](fragment) of every covering quad,
/// blended with the premultiplied "over" operator:
///
/// $$ C \leftarrow C_s + (1 - \alpha_s) C $$
pub fn main(
    arguments: Arguments,
    inputs: Inputs,
) -> Result<Outputs, Error> {
    #[cfg(debug_assertions)]
    log::debug!(target: "gausplat::preprocessor::splat::rasterize", "start");

    let image_size = [arguments.image_size_x, arguments.image_size_y];
    let [size_x, size_y] = image_size.map(|size| size as usize);

    let quads = inputs
        .indices
        .iter()
        .map(|&index| {
            let splat_2d =
                inputs.splats_2d.get(index as usize).ok_or(Error::OutOfRange {
                    name: "splats_2d",
                    index: index as usize,
                    length: inputs.splats_2d.len(),
                })?;
            Ok::<_, Error>(Quad::new(splat_2d, image_size))
        })
        .filter_map(Result::transpose)
        .collect::<Result<Vec<_>, Error>>()?;

    let mut colors_rgba_2d = vec![[0.0; 4]; size_x * size_y];
    if size_x == 0 {
        return Ok(Outputs { colors_rgba_2d });
    }

    colors_rgba_2d
        .par_chunks_mut(size_x)
        .enumerate()
        .for_each(|(y, row)| {
            let y = y as u32;
            let ndc_y = 1.0 - (y as f32 + 0.5) / size_y as f32 * 2.0;
            for quad in quads.iter().filter(|q| q.bounds[2] <= y && y <= q.bounds[3]) {
                for x in quad.bounds[0]..=quad.bounds[1] {
                    let ndc_x = (x as f32 + 0.5) / size_x as f32 * 2.0 - 1.0;
                    let Some(source) = fragment(quad.local([ndc_x, ndc_y]), quad.color)
                    else {
                        continue;
                    };
                    let target = &mut row[x as usize];
                    let transmittance = 1.0 - source[3];
                    for (t, s) in target.iter_mut().zip(source) {
                        *t = s + transmittance * *t;
                    }
                }
            }
        });

    Ok(Outputs { colors_rgba_2d })
}

/// Ordering the slots from the farthest to the nearest.
///
/// It stands in for the sort kernel paired with the preprocessing.
pub fn order_back_to_front(
    depth_keys: &[u32],
    indices: &[u32],
) -> Vec<u32> {
    let mut pairs = depth_keys.iter().copied().zip(indices.iter().copied()).collect::<Vec<_>>();
    pairs.sort_unstable_by(|a, b| b.cmp(a));
    pairs.into_iter().map(|(_, index)| index).collect()
}
