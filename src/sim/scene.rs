//! Per-frame scene description and HUD snapshot
//!
//! The simulation describes what to draw as flat boxes in the z/y side
//! plane. The renderer and the DOM layer consume these without looking at
//! level internals.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::state::{Entity, GamePhase, LevelId, Outcome};

/// Visual class of a sprite; the renderer maps it to a color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpriteKind {
    Character,
    Ground,
    Brick,
    Pipe,
    Plant,
    Chain,
    GiftBox,
    GiftBoxOpened,
    Coin,
    Diamond,
    Heart,
    Sword,
    Mushroom,
    HealthPotion,
    Treasure,
    Potion,
    Goomba,
    Turtle,
    Monster,
    Boss,
    Projectile,
    Bullet,
    Fireball,
    Shield,
    Cloud,
    Castle,
    Platform,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sprite {
    pub kind: SpriteKind,
    pub center: Vec3,
    pub half: Vec3,
    pub opacity: f32,
}

impl Sprite {
    pub fn new(kind: SpriteKind, center: Vec3, half: Vec3) -> Self {
        Self {
            kind,
            center,
            half,
            opacity: 1.0,
        }
    }

    /// Sprite for an entity whose position is its base (feet)
    pub fn standing<T>(kind: SpriteKind, entity: &Entity<T>, half: Vec3) -> Self {
        let half = half * entity.scale;
        Self {
            kind,
            center: entity.pos + Vec3::new(0.0, half.y, 0.0),
            half,
            opacity: entity.opacity,
        }
    }

    /// Sprite for an entity whose position is its center
    pub fn centered<T>(kind: SpriteKind, entity: &Entity<T>, half: Vec3) -> Self {
        Self {
            kind,
            center: entity.pos,
            half: half * entity.scale,
            opacity: entity.opacity,
        }
    }
}

/// Display-only values pushed to the HUD slots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hud {
    pub level: u32,
    pub phase: GamePhase,
    pub lives: Option<u32>,
    pub health_percent: Option<u32>,
    pub currency: u32,
    pub score: u32,
    pub sword_charges: Option<u32>,
    pub boss_health: Option<u32>,
    pub shield_ready: Option<bool>,
    pub fireball_ready: Option<bool>,
    pub treasure: Option<bool>,
    pub potion: Option<bool>,
    pub end_message: Option<String>,
}

impl Hud {
    pub fn new(level: LevelId, phase: GamePhase) -> Self {
        Self {
            level: level.number(),
            phase,
            lives: None,
            health_percent: None,
            currency: 0,
            score: 0,
            sword_charges: None,
            boss_health: None,
            shield_ready: None,
            fireball_ready: None,
            treasure: None,
            potion: None,
            end_message: None,
        }
    }

    pub fn with_outcome(mut self, outcome: Option<Outcome>) -> Self {
        self.end_message = outcome.map(|o| match o {
            Outcome::Advance(_) => "Level complete!".to_string(),
            Outcome::Victory => "You defeated the boss!".to_string(),
            Outcome::GameOver(reason) => format!("Game over: {}", reason.message()),
        });
        self
    }
}
