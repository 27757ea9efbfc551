//! Brick Quest - A three-level 2.5D side-scrolling platformer
//!
//! Core modules:
//! - `sim`: Deterministic simulation (levels, spawning, collisions, controller)
//! - `renderer`: WebGPU rendering of the side-view scene
//! - `audio`: Procedural sound effects driven by simulation events
//! - `settings`: Key bindings and user preferences

pub mod audio;
pub mod renderer;
pub mod settings;
pub mod sim;

pub use settings::{ConfigError, Settings};

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (120 Hz)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Largest frame delta the driver will feed the accumulator
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Physics world substep
    pub const PHYSICS_DT: f32 = 1.0 / 60.0;
    /// Physics substep cap per step call
    pub const PHYSICS_MAX_SUBSTEPS: u32 = 10;

    /// Animation crossfade duration between clips
    pub const CROSSFADE_SECS: f32 = 0.2;
    /// Clip time scales
    pub const IDLE_TIME_SCALE: f32 = 1.2;
    pub const RUN_FORWARD_TIME_SCALE: f32 = 1.5;
    pub const RUN_BACKWARD_TIME_SCALE: f32 = 1.3;
    pub const JUMP_TIME_SCALE: f32 = 1.5;
    /// Length of the punch clip at time scale 1.0
    pub const PUNCH_CLIP_SECS: f32 = 1.0;

    /// Camera offset from the character (side view)
    pub const CAMERA_HEIGHT: f32 = 1.0;
    /// Visible world span along z, used by the renderer
    pub const VIEW_SPAN_Z: f32 = 40.0;
}

/// Linear interpolation
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp_endpoints() {
        assert_eq!(lerp(2.0, 6.0, 0.0), 2.0);
        assert_eq!(lerp(2.0, 6.0, 1.0), 6.0);
        assert_eq!(lerp(2.0, 6.0, 0.5), 4.0);
    }
}
