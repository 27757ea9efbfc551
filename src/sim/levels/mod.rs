//! The three playable levels
//!
//! Each level owns its [`LevelState`](crate::sim::state::LevelState), its
//! category collections and its own tuning table, and plugs into the shared
//! frame order through [`Level`](crate::sim::tick::Level).

pub mod arena;
pub mod overworld;
pub mod skyway;

pub use arena::{Arena, ArenaTuning};
pub use overworld::{Overworld, OverworldTuning};
pub use skyway::{Skyway, SkywayTuning};
