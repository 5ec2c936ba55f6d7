//! File formats at the CLI boundary.

pub mod depth;
pub mod image;
pub mod npy;
