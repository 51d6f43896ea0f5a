pub mod splat;
pub mod view;

pub use crate::{error::Error, scene};
pub use view::*;
