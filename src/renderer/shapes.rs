//! Quad generation for the side view
//!
//! World z runs left to right on screen, y runs up. The camera centers the
//! view and [`VIEW_SPAN_Z`] world units fit across the viewport width.

use glam::Vec2;

use super::vertex::{Vertex, color_of};
use crate::consts::VIEW_SPAN_Z;
use crate::sim::state::Camera;
use crate::sim::{Sprite, SpriteKind};

/// Maps side-plane world coordinates to clip space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct View {
    pub center: Vec2,
    /// World units per half viewport, per axis
    pub half_extent: Vec2,
}

impl View {
    pub fn new(camera: &Camera, aspect: f32, shake: bool) -> Self {
        let half_w = VIEW_SPAN_Z / 2.0;
        let half_h = half_w / aspect.max(0.1);
        let offset = if shake { camera.shake_offset } else { 0.0 };
        Self {
            center: Vec2::new(camera.z, camera.y + offset),
            half_extent: Vec2::new(half_w, half_h),
        }
    }

    pub fn to_ndc(&self, z: f32, y: f32) -> Vec2 {
        (Vec2::new(z, y) - self.center) / self.half_extent
    }

    /// Whether a box centered at (z, y) with the given half size is on screen
    pub fn sees(&self, center: Vec2, half: Vec2) -> bool {
        let d = (center - self.center).abs();
        d.x <= self.half_extent.x + half.x && d.y <= self.half_extent.y + half.y
    }
}

/// Back-to-front layer for a sprite kind
fn layer(kind: SpriteKind) -> u8 {
    match kind {
        SpriteKind::Cloud => 0,
        SpriteKind::Castle => 1,
        SpriteKind::Ground | SpriteKind::Platform | SpriteKind::Chain => 2,
        SpriteKind::Plant => 3,
        SpriteKind::Pipe | SpriteKind::Brick | SpriteKind::GiftBox | SpriteKind::GiftBoxOpened => 4,
        SpriteKind::Character => 6,
        SpriteKind::Shield => 7,
        _ => 5,
    }
}

/// Generate vertices for an axis-aligned rectangle
pub fn rect(view: &View, center: Vec2, half: Vec2, color: [f32; 4]) -> [Vertex; 6] {
    let lo = view.to_ndc(center.x - half.x, center.y - half.y);
    let hi = view.to_ndc(center.x + half.x, center.y + half.y);
    [
        Vertex::new(lo.x, lo.y, color),
        Vertex::new(hi.x, lo.y, color),
        Vertex::new(hi.x, hi.y, color),
        Vertex::new(lo.x, lo.y, color),
        Vertex::new(hi.x, hi.y, color),
        Vertex::new(lo.x, hi.y, color),
    ]
}

/// Two triangles per visible sprite, drawn in layer order
pub fn scene_vertices(sprites: &[Sprite], view: &View) -> Vec<Vertex> {
    let mut visible: Vec<&Sprite> = sprites
        .iter()
        .filter(|s| s.opacity > 0.0)
        .filter(|s| view.sees(Vec2::new(s.center.z, s.center.y), Vec2::new(s.half.z, s.half.y)))
        .collect();
    // Stable, so equal layers keep scene order
    visible.sort_by_key(|s| layer(s.kind));

    let mut vertices = Vec::with_capacity(visible.len() * 6);
    for s in visible {
        let mut color = color_of(s.kind);
        color[3] *= s.opacity.min(1.0);
        vertices.extend(rect(
            view,
            Vec2::new(s.center.z, s.center.y),
            Vec2::new(s.half.z, s.half.y),
            color,
        ));
    }
    vertices
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn camera(z: f32, y: f32) -> Camera {
        Camera {
            z,
            y,
            ..Default::default()
        }
    }

    #[test]
    fn test_camera_center_maps_to_origin() {
        let view = View::new(&camera(100.0, 2.0), 16.0 / 9.0, true);
        assert_eq!(view.to_ndc(100.0, 2.0), Vec2::ZERO);
        let right = view.to_ndc(100.0 + VIEW_SPAN_Z / 2.0, 2.0);
        assert!((right.x - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_offscreen_sprites_are_culled() {
        let view = View::new(&camera(0.0, 0.0), 1.0, true);
        let near = Sprite::new(SpriteKind::Coin, Vec3::new(0.0, 0.0, 5.0), Vec3::splat(0.3));
        let far = Sprite::new(SpriteKind::Coin, Vec3::new(0.0, 0.0, 500.0), Vec3::splat(0.3));
        let mut hidden = near;
        hidden.opacity = 0.0;
        assert_eq!(scene_vertices(&[near, far, hidden], &view).len(), 6);
    }

    #[test]
    fn test_character_drawn_over_ground() {
        let view = View::new(&camera(0.0, 0.0), 1.0, true);
        let hero = Sprite::new(SpriteKind::Character, Vec3::ZERO, Vec3::splat(0.5));
        let ground = Sprite::new(SpriteKind::Ground, Vec3::new(0.0, -1.0, 0.0), Vec3::new(2.0, 0.5, 10.0));
        let verts = scene_vertices(&[hero, ground], &view);
        assert_eq!(verts.len(), 12);
        assert_eq!(verts[0].color, color_of(SpriteKind::Ground));
        assert_eq!(verts[6].color, color_of(SpriteKind::Character));
    }

    #[test]
    fn test_opacity_scales_alpha() {
        let view = View::new(&camera(0.0, 0.0), 1.0, true);
        let mut boss = Sprite::new(SpriteKind::Boss, Vec3::ZERO, Vec3::ONE);
        boss.opacity = 0.5;
        let verts = scene_vertices(&[boss], &view);
        assert!((verts[0].color[3] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_reduced_motion_ignores_shake() {
        let mut cam = camera(0.0, 1.0);
        cam.shake_offset = 0.3;
        assert!((View::new(&cam, 1.0, true).center.y - 1.3).abs() < 1e-5);
        assert_eq!(View::new(&cam, 1.0, false).center.y, 1.0);
    }
}
