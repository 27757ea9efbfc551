//! Vertex types for 2D rendering

use bytemuck::{Pod, Zeroable};

use crate::sim::SpriteKind;

/// Clip-space position with a flat color
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex {
    pub const fn new(x: f32, y: f32, color: [f32; 4]) -> Self {
        Self {
            position: [x, y],
            color,
        }
    }

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// Colors for game elements
pub mod colors {
    pub const SKY: [f32; 4] = [0.42, 0.64, 0.95, 1.0];
    pub const CHARACTER: [f32; 4] = [0.85, 0.2, 0.2, 1.0];
    pub const GROUND: [f32; 4] = [0.45, 0.3, 0.15, 1.0];
    pub const BRICK: [f32; 4] = [0.72, 0.36, 0.18, 1.0];
    pub const PIPE: [f32; 4] = [0.1, 0.65, 0.2, 1.0];
    pub const PLANT: [f32; 4] = [0.2, 0.8, 0.3, 1.0];
    pub const CHAIN: [f32; 4] = [0.55, 0.55, 0.6, 1.0];
    pub const GIFT_BOX: [f32; 4] = [0.95, 0.75, 0.1, 1.0];
    pub const GIFT_BOX_OPENED: [f32; 4] = [0.6, 0.45, 0.25, 1.0];
    pub const COIN: [f32; 4] = [1.0, 0.85, 0.0, 1.0];
    pub const DIAMOND: [f32; 4] = [0.5, 0.9, 1.0, 1.0];
    pub const HEART: [f32; 4] = [1.0, 0.3, 0.45, 1.0];
    pub const SWORD: [f32; 4] = [0.85, 0.85, 0.95, 1.0];
    pub const MUSHROOM: [f32; 4] = [0.9, 0.25, 0.6, 1.0];
    pub const HEALTH_POTION: [f32; 4] = [0.95, 0.2, 0.3, 1.0];
    pub const TREASURE: [f32; 4] = [0.9, 0.7, 0.2, 1.0];
    pub const POTION: [f32; 4] = [0.55, 0.25, 0.9, 1.0];
    pub const GOOMBA: [f32; 4] = [0.5, 0.3, 0.15, 1.0];
    pub const TURTLE: [f32; 4] = [0.25, 0.6, 0.25, 1.0];
    pub const MONSTER: [f32; 4] = [0.6, 0.1, 0.6, 1.0];
    pub const BOSS: [f32; 4] = [0.35, 0.05, 0.1, 1.0];
    pub const PROJECTILE: [f32; 4] = [0.9, 0.9, 1.0, 1.0];
    pub const BULLET: [f32; 4] = [0.1, 0.1, 0.1, 1.0];
    pub const FIREBALL: [f32; 4] = [1.0, 0.45, 0.05, 1.0];
    pub const SHIELD: [f32; 4] = [0.4, 0.8, 1.0, 0.5];
    pub const CLOUD: [f32; 4] = [1.0, 1.0, 1.0, 0.85];
    pub const CASTLE: [f32; 4] = [0.5, 0.5, 0.55, 1.0];
    pub const PLATFORM: [f32; 4] = [0.55, 0.4, 0.3, 1.0];
}

pub fn color_of(kind: SpriteKind) -> [f32; 4] {
    use colors::*;
    match kind {
        SpriteKind::Character => CHARACTER,
        SpriteKind::Ground => GROUND,
        SpriteKind::Brick => BRICK,
        SpriteKind::Pipe => PIPE,
        SpriteKind::Plant => PLANT,
        SpriteKind::Chain => CHAIN,
        SpriteKind::GiftBox => GIFT_BOX,
        SpriteKind::GiftBoxOpened => GIFT_BOX_OPENED,
        SpriteKind::Coin => COIN,
        SpriteKind::Diamond => DIAMOND,
        SpriteKind::Heart => HEART,
        SpriteKind::Sword => SWORD,
        SpriteKind::Mushroom => MUSHROOM,
        SpriteKind::HealthPotion => HEALTH_POTION,
        SpriteKind::Treasure => TREASURE,
        SpriteKind::Potion => POTION,
        SpriteKind::Goomba => GOOMBA,
        SpriteKind::Turtle => TURTLE,
        SpriteKind::Monster => MONSTER,
        SpriteKind::Boss => BOSS,
        SpriteKind::Projectile => PROJECTILE,
        SpriteKind::Bullet => BULLET,
        SpriteKind::Fireball => FIREBALL,
        SpriteKind::Shield => SHIELD,
        SpriteKind::Cloud => CLOUD,
        SpriteKind::Castle => CASTLE,
        SpriteKind::Platform => PLATFORM,
    }
}
