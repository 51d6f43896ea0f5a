#![allow(clippy::excessive_precision)]
#![allow(missing_docs)]

pub mod buffer;
pub mod error;
pub mod packing;
pub mod render;
pub mod scene;
pub mod spherical_harmonics;
