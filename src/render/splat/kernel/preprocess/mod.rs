//! Preprocessing the splats into compacted 2D splats and sort inputs.

pub mod transform;

pub use super::*;
pub use crate::{
    scene::SplatSource,
    spherical_harmonics::{evaluate, evaluate_at, ShCoefficients, ShDegree},
};
pub use transform::*;

use crate::packing::{pack2x16float, pack4x8unorm, unpack2x16float, unpack4x8unorm};
use std::sync::atomic::{AtomicU32, Ordering::SeqCst};

/// Arguments.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Arguments {
    /// $ 0 \sim 3 $
    pub colors_sh_degree_max: u32,
    /// $ p $
    pub point_count: u32,
}

/// Inputs.
#[derive(Debug)]
pub struct Inputs<'a, S, C> {
    pub camera: &'a CameraUniform,
    /// SH coefficients of the splats.
    pub colors_sh: &'a C,
    /// The degree of [`Self::colors_sh`].
    pub colors_sh_degree: ShDegree,
    pub splats: &'a S,
}

impl<S, C> Clone for Inputs<'_, S, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S, C> Copy for Inputs<'_, S, C> {}

/// Outputs, owned by the caller and reused across frames.
#[derive(Debug)]
pub struct Outputs {
    /// $ N $ compacted 2D splats.
    pub splats_2d: SlotBuffer<Splat2d>,
    /// $ N $ sort keys.
    pub depth_keys: SlotBuffer<u32>,
    /// $ N $ sort values, i.e., the slots.
    pub indices: SlotBuffer<u32>,
    pub sort_infos: SortInfos,
    /// The draw call of the quads.
    pub draw_indirect: DrawIndirect,
    /// The dispatch of the sort kernel.
    pub sort_dispatch: DispatchIndirect,
}

/// A splat projected onto the screen.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Splat2d {
    /// The major axis in NDC units, `[x, y]` in half precision.
    pub axis_1: u32,
    /// The minor axis in NDC units, `[x, y]` in half precision.
    pub axis_2: u32,
    /// `[x, y], [z, w]` in NDC and half precision, where `w` is `1`.
    pub center: [u32; 2],
    /// RGBA in unsigned normalized bytes.
    pub color: u32,
}

/// The counters shared with the sort kernel.
#[derive(Debug, Default)]
pub struct SortInfos {
    /// $ N $, the count of survivors and sort keys.
    pub keys_size: AtomicU32,
}

/// Threads in a group of the sort kernel.
pub const SORT_GROUP_SIZE: u32 = 256;
/// Keys sorted by a thread of the sort kernel.
pub const SORT_KEYS_PER_THREAD: u32 = 15;
/// Keys sorted by a group of the sort kernel.
pub const SORT_GROUP_KEYS: u32 = SORT_GROUP_SIZE * SORT_KEYS_PER_THREAD;

impl Splat2d {
    pub fn new(
        axis_1: [f32; 2],
        axis_2: [f32; 2],
        center: [f32; 4],
        color: [f32; 4],
    ) -> Self {
        Self {
            axis_1: pack2x16float(axis_1),
            axis_2: pack2x16float(axis_2),
            center: [
                pack2x16float([center[0], center[1]]),
                pack2x16float([center[2], center[3]]),
            ],
            color: pack4x8unorm(color),
        }
    }

    #[inline]
    pub fn axis_1(&self) -> [f32; 2] {
        unpack2x16float(self.axis_1)
    }

    #[inline]
    pub fn axis_2(&self) -> [f32; 2] {
        unpack2x16float(self.axis_2)
    }

    #[inline]
    pub fn center(&self) -> [f32; 4] {
        let [x, y] = unpack2x16float(self.center[0]);
        let [z, w] = unpack2x16float(self.center[1]);
        [x, y, z, w]
    }

    #[inline]
    pub fn color(&self) -> [f32; 4] {
        unpack4x8unorm(self.color)
    }
}

impl Outputs {
    /// Allocating the buffers for at most `capacity` survivors.
    pub fn new(capacity: usize) -> Self {
        Self {
            splats_2d: SlotBuffer::new(capacity),
            depth_keys: SlotBuffer::new(capacity),
            indices: SlotBuffer::new(capacity),
            sort_infos: Default::default(),
            draw_indirect: Default::default(),
            sort_dispatch: Default::default(),
        }
    }

    /// The count of survivor slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.splats_2d.capacity()
    }

    /// $ N $
    #[inline]
    pub fn keys_size(&self) -> u32 {
        self.sort_infos.keys_size.load(SeqCst)
    }

    /// Emptying the buffers for the next frame.
    pub fn reset(&mut self) {
        self.splats_2d.clear();
        self.depth_keys.clear();
        self.indices.clear();
        self.sort_infos.keys_size.store(0, SeqCst);
        self.draw_indirect.reset();
        self.sort_dispatch.reset();
    }

    /// Reading back the compacted 2D splats.
    pub fn read_splats_2d(&self) -> Result<Vec<Splat2d>, Error> {
        read_slots(&self.splats_2d, self.keys_size(), "splats_2d")
    }

    /// Reading back the sort keys.
    pub fn read_depth_keys(&self) -> Result<Vec<u32>, Error> {
        read_slots(&self.depth_keys, self.keys_size(), "depth_keys")
    }

    /// Reading back the sort values.
    pub fn read_indices(&self) -> Result<Vec<u32>, Error> {
        read_slots(&self.indices, self.keys_size(), "indices")
    }
}

fn read_slots<T: Copy>(
    buffer: &SlotBuffer<T>,
    count: u32,
    name: &str,
) -> Result<Vec<T>, Error> {
    buffer.to_vec(count as usize).ok_or_else(|| {
        Error::Validation(
            format!("the first {count} slots of {name}"),
            "written".into(),
        )
    })
}

/// Preprocessing the splats.
///
/// For each one of the $ p $ splats, do the following steps:
///
/// 1. The invocation 0 adds a group to the sort dispatch.
///
/// 2. Transform the position $ P $ to view space and clip space:
/// $$ P_v = M_v P,\ P_c = M_p P_v $$
///
/// 3. Cull the splat [outside the expanded frustum](is_culled).
///
/// 4. Project the 3D covariance onto [screen space](covariance_2d)
///    and decompose it into [two axes](axes).
///
/// 5. Evaluate the SH coefficients along the viewing direction:
/// $$ D_v = \frac{P - V_p}{| P - V_p |} $$
///
/// 6. Allocate a slot from [`SortInfos::keys_size`] and write
///    the [2D splat](Outputs::splats_2d), the [depth key](depth_key)
///    and the slot itself to it.
///
/// 7. Count the quad instance, and add a sort group
///    whenever the slot is a multiple of [`SORT_GROUP_KEYS`].
///
/// The slots are unique and dense,
/// but unrelated to the order of splats.
///
/// The SH degree is resolved here once,
/// so the kernel is monomorphized for each degree.
///
/// ## Errors
///
/// The arguments and buffers are checked before dispatching.
/// The outputs should be [reset](Outputs::reset) after a previous dispatch.
pub fn main<S, C>(
    arguments: Arguments,
    inputs: Inputs<S, C>,
    outputs: &Outputs,
) -> Result<(), Error>
where
    S: SplatSource,
    C: ShCoefficients,
{
    #[cfg(debug_assertions)]
    log::debug!(target: "gausplat::preprocessor::splat::preprocess", "start");

    // Checking the parameters

    let degree = ShDegree::try_from(arguments.colors_sh_degree_max)?;
    if degree > inputs.colors_sh_degree {
        return Err(Error::Validation(
            format!("colors_sh_degree_max ({})", degree.value()),
            format!("no more than {}", inputs.colors_sh_degree.value()),
        ));
    }

    // P
    let point_count = arguments.point_count as usize;
    let group_count = arguments.point_count.div_ceil(GROUP_SIZE);
    if group_count.checked_mul(GROUP_SIZE).is_none() {
        return Err(Error::OutOfRange {
            name: "invocations",
            index: point_count,
            length: (u32::MAX / GROUP_SIZE * GROUP_SIZE) as usize,
        });
    }
    if point_count > inputs.splats.point_count() {
        return Err(Error::OutOfRange {
            name: "splats",
            index: point_count,
            length: inputs.splats.point_count(),
        });
    }
    if point_count > outputs.capacity() {
        return Err(Error::OutOfCapacity {
            required: point_count,
            capacity: outputs.capacity(),
        });
    }

    // The counters are accumulated, so they should start from zero
    let counters = [
        ("the survivor count", outputs.keys_size()),
        (
            "the instance count",
            outputs.draw_indirect.instance_count.load(SeqCst),
        ),
        ("the sort group count", outputs.sort_dispatch.x.load(SeqCst)),
    ];
    for (name, count) in counters {
        if count != 0 {
            return Err(Error::Validation(
                format!("{name} ({count})"),
                "zero before preprocessing".into(),
            ));
        }
    }

    // Launching the kernel

    match degree {
        ShDegree::Zero => launch::<0, S, C>(group_count, arguments, inputs, outputs),
        ShDegree::One => launch::<1, S, C>(group_count, arguments, inputs, outputs),
        ShDegree::Two => launch::<2, S, C>(group_count, arguments, inputs, outputs),
        ShDegree::Three => launch::<3, S, C>(group_count, arguments, inputs, outputs),
    }

    #[cfg(debug_assertions)]
    log::debug!(
        target: "gausplat::preprocessor::splat::preprocess",
        "keys_size ({}) / point_count ({point_count})",
        outputs.keys_size(),
    );

    Ok(())
}

/// Dispatching the invocations with the SH degree `D`.
fn launch<const D: u32, S, C>(
    group_count: u32,
    arguments: Arguments,
    inputs: Inputs<S, C>,
    outputs: &Outputs,
) where
    S: SplatSource,
    C: ShCoefficients,
{
    let camera = inputs.camera;
    let view_position = camera.position();

    dispatch(group_count, |index| {
        if index >= arguments.point_count {
            return;
        }
        if index == 0 {
            outputs.sort_dispatch.x.fetch_add(1, SeqCst);
        }
        let index = index as usize;

        let (position, opacity) = inputs.splats.position_opacity(index);
        let [x, y, z] = position;
        let camspace = transform(&camera.view, [x, y, z, 1.0]);
        let clip = transform(&camera.projection, camspace);
        if is_culled(clip) {
            return;
        }

        let covariance_2d =
            covariance_2d(camera, camspace, inputs.splats.covariance_3d(index));
        let (axis_1, axis_2) = axes(covariance_2d, camera.viewport);
        let w = clip[3];
        let center = [clip[0] / w, clip[1] / w, clip[2] / w, 1.0];

        let direction = {
            let d = [
                x - view_position[0],
                y - view_position[1],
                z - view_position[2],
            ];
            let norm = (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt();
            d.map(|d| d / norm)
        };
        let row = inputs.splats.colors_sh_index(index);
        let [r, g, b] = evaluate_at::<D, C>(inputs.colors_sh, row, direction);
        let color = [r.max(0.0), g.max(0.0), b.max(0.0), opacity];

        let slot = outputs.sort_infos.keys_size.fetch_add(1, SeqCst);
        let splat_2d = Splat2d::new(axis_1, axis_2, center, color);
        let is_written = outputs.splats_2d.write(slot as usize, splat_2d).is_ok()
            & outputs.depth_keys.write(slot as usize, depth_key(center[2])).is_ok()
            & outputs.indices.write(slot as usize, slot).is_ok();
        debug_assert!(is_written, "The slot {slot} should be vacant");

        outputs.draw_indirect.instance_count.fetch_add(1, SeqCst);
        if slot % SORT_GROUP_KEYS == 0 {
            outputs.sort_dispatch.x.fetch_add(1, SeqCst);
        }
    });
}
