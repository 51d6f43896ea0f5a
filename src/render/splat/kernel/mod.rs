//! Kernels dispatched over invocations in parallel.
//!
//! An invocation is a closure of its global index.
//! Invocations share nothing but atomic counters and write-once slots.

pub mod preprocess;
pub mod rasterize;

pub use crate::{
    buffer::{
        DispatchIndirect, DispatchIndirectArgs, DrawIndirect, DrawIndirectArgs, SlotBuffer,
    },
    error::Error,
    render::view::{transform, CameraUniform},
};
pub use bytemuck::{Pod, Zeroable};

use rayon::prelude::*;

/// Group size.
pub const GROUP_SIZE: u32 = 256;

/// Launching `group_count` groups of [`GROUP_SIZE`] invocations.
///
/// It returns after all invocations finish.
/// `group_count * GROUP_SIZE` should fit in `u32`.
pub fn dispatch<F>(
    group_count: u32,
    invocation: F,
) where
    F: Fn(u32) + Send + Sync,
{
    (0..group_count * GROUP_SIZE).into_par_iter().for_each(invocation);
}
