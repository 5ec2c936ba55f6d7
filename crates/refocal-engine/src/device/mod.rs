//! Headless GPU device management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue without any surface
//! - walking the adapter and limit-tier fallback chains
//! - rejecting adapters that cannot render the required attachments
//! - describing the selected adapter for diagnostics

mod error;
mod gpu;
mod init;
mod targets;

pub use error::BackendError;
pub use gpu::HeadlessGpu;
pub use init::{AdapterChoice, HeadlessInit};
pub use targets::RenderTargets;
