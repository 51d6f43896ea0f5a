//! Splat scene property implementation.

pub use super::*;

use humansize::{format_size, BINARY};
use std::fmt;

impl SplatScene {
    /// Number of splats.
    #[inline]
    pub fn point_count(&self) -> usize {
        self.splats.len()
    }

    /// Number of geometry entries.
    #[inline]
    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    /// Size of the records in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.splats.len() * size_of::<Splat>()
            + self.geometries.len() * size_of::<Geometry>()
            + self.colors_sh.size()
    }

    /// Readable size of the records.
    #[inline]
    pub fn size_readable(&self) -> String {
        format_size(self.size(), BINARY.decimal_places(1))
    }
}

impl fmt::Debug for SplatScene {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("SplatScene")
            .field("point_count", &self.point_count())
            .field("geometry_count", &self.geometry_count())
            .field("colors_sh", &self.colors_sh)
            .field("size", &self.size_readable())
            .finish()
    }
}

impl Default for SplatScene {
    fn default() -> Self {
        Self {
            colors_sh: ShTable::encode(Default::default(), Default::default(), &[]),
            geometries: vec![],
            splats: vec![],
        }
    }
}
