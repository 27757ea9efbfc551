//! WebGPU rendering module
//!
//! Draws the per-frame scene description as flat-colored quads in the
//! side plane.

pub mod pipeline;
pub mod shapes;
pub mod vertex;

use thiserror::Error;

pub use pipeline::RenderState;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to create device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no texture formats")]
    NoSurfaceFormat,
}
