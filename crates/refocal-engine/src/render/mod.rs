//! Headless rasterization backend.
//!
//! A generic capability: compile a WGSL program pair, draw indexed textured
//! geometry into a three-target framebuffer, read the targets back to the CPU.
//! Nothing here knows about meshes or cameras.
//!
//! Convention:
//! - Attachment 0 is RGB color, 1 is a float value, 2 is an 8-bit marker.
//! - Readback buffers are tightly packed, top row first.

mod ctx;
mod framebuffer;
mod geometry;
mod program;
mod rasterizer;
mod readback;

pub use ctx::RenderCtx;
pub use framebuffer::{
    AttachmentData, Framebuffer, COLOR_FORMAT, DEPTH_BUFFER_FORMAT, DEPTH_VALUE_FORMAT, MASK_FORMAT,
};
pub use geometry::{GeometryBuffers, TextureBinding, FLOATS_PER_VERTEX};
pub use program::{Program, ProgramSource, FRAGMENT_ENTRY, VERTEX_ENTRY};
pub use rasterizer::Rasterizer;
pub use readback::{padded_bytes_per_row, unpad_rows, RowOrder, NATIVE_ROW_ORDER};
