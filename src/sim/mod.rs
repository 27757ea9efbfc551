//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod animation;
pub mod collision;
pub mod controller;
pub mod cooldown;
pub mod events;
pub mod levels;
pub mod physics;
pub mod scene;
pub mod session;
pub mod spawner;
pub mod state;
pub mod tick;
pub mod timeline;

pub use controller::{Action, TickInput};
pub use events::{GameEvent, ItemKind};
pub use scene::{Hud, Sprite, SpriteKind};
pub use session::{LevelTunings, Session};
pub use state::{AssetKind, Assets, GamePhase, LevelId, LossReason, Outcome};
pub use tick::{Level, tick};
