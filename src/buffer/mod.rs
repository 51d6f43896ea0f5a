//! Buffers shared by concurrent invocations.

pub use bytemuck::{Pod, Zeroable};

use std::{
    fmt,
    sync::{
        atomic::{AtomicU32, Ordering},
        OnceLock,
    },
};

/// A fixed-capacity buffer whose slots are written at most once.
///
/// Invocations of a dispatch write to the slots concurrently.
/// The slot allocation is done elsewhere (usually by an atomic counter),
/// so writing to an occupied slot indicates a broken allocation.
pub struct SlotBuffer<T> {
    slots: Box<[OnceLock<T>]>,
}

impl<T> SlotBuffer<T> {
    /// Allocating `capacity` empty slots.
    pub fn new(capacity: usize) -> Self {
        let slots = (0..capacity).map(|_| OnceLock::new()).collect();
        Self { slots }
    }

    /// The count of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Writing the value to the slot.
    ///
    /// It returns the value back if the slot is occupied or out of range.
    #[inline]
    pub fn write(
        &self,
        slot: usize,
        value: T,
    ) -> Result<(), T> {
        match self.slots.get(slot) {
            Some(cell) => cell.set(value),
            None => Err(value),
        }
    }

    /// Reading the value at the slot.
    #[inline]
    pub fn read(
        &self,
        slot: usize,
    ) -> Option<&T> {
        self.slots.get(slot)?.get()
    }

    /// Emptying all slots for the next frame.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|cell| {
            cell.take();
        });
    }
}

impl<T: Copy> SlotBuffer<T> {
    /// Copying the first `count` slots out.
    ///
    /// It returns `None` if any of them is empty.
    pub fn to_vec(
        &self,
        count: usize,
    ) -> Option<Vec<T>> {
        self.slots
            .get(..count)?
            .iter()
            .map(|cell| cell.get().copied())
            .collect()
    }
}

impl<T> fmt::Debug for SlotBuffer<T> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let occupied = self.slots.iter().filter(|cell| cell.get().is_some()).count();
        f.debug_struct(&format!("SlotBuffer<{}>", std::any::type_name::<T>()))
            .field("capacity", &self.capacity())
            .field("occupied", &occupied)
            .finish()
    }
}

/// Arguments of an indirect draw call.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Pod, Zeroable)]
pub struct DrawIndirectArgs {
    pub vertex_count: u32,
    pub instance_count: u32,
    pub first_vertex: u32,
    pub first_instance: u32,
}

/// Arguments of an indirect compute dispatch.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Pod, Zeroable)]
pub struct DispatchIndirectArgs {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

/// [`DrawIndirectArgs`] being updated by invocations.
#[derive(Debug, Default)]
pub struct DrawIndirect {
    pub instance_count: AtomicU32,
}

/// [`DispatchIndirectArgs`] being updated by invocations.
#[derive(Debug, Default)]
pub struct DispatchIndirect {
    pub x: AtomicU32,
}

impl DrawIndirect {
    /// The arguments for drawing quads, one instance per splat.
    pub fn args(&self) -> DrawIndirectArgs {
        DrawIndirectArgs {
            vertex_count: 4,
            instance_count: self.instance_count.load(Ordering::SeqCst),
            first_vertex: 0,
            first_instance: 0,
        }
    }

    pub fn reset(&self) {
        self.instance_count.store(0, Ordering::SeqCst);
    }
}

impl DispatchIndirect {
    /// The arguments for dispatching `x` groups.
    pub fn args(&self) -> DispatchIndirectArgs {
        DispatchIndirectArgs {
            x: self.x.load(Ordering::SeqCst),
            y: 1,
            z: 1,
        }
    }

    pub fn reset(&self) {
        self.x.store(0, Ordering::SeqCst);
    }
}
