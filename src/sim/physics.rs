//! Collision-body world
//!
//! Static and kinematic axis-aligned bodies for terrain, obstacles and
//! projectiles. Gameplay collision math runs on entity positions directly;
//! the world keeps the body transforms in step with them:
//! - tween-driven entities copy their position onto the body
//! - velocity-driven bodies (projectiles) are integrated here and copied back

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::collision::Aabb;

/// Opaque handle to a body in a [`PhysicsWorld`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyHandle(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// Never moves on its own
    Static,
    /// Moves by its velocity each step
    Kinematic,
}

#[derive(Debug, Clone)]
struct Body {
    handle: BodyHandle,
    kind: BodyKind,
    center: Vec3,
    half: Vec3,
    velocity: Vec3,
}

#[derive(Debug, Clone, Default)]
pub struct PhysicsWorld {
    /// Sorted by handle
    bodies: Vec<Body>,
    next_handle: u32,
    /// Total substeps taken, for diagnostics
    substeps: u64,
}

impl PhysicsWorld {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, kind: BodyKind, center: Vec3, half: Vec3) -> BodyHandle {
        let handle = BodyHandle(self.next_handle);
        self.next_handle += 1;
        self.bodies.push(Body {
            handle,
            kind,
            center,
            half,
            velocity: Vec3::ZERO,
        });
        handle
    }

    pub fn add_static(&mut self, center: Vec3, half: Vec3) -> BodyHandle {
        self.insert(BodyKind::Static, center, half)
    }

    pub fn add_kinematic(&mut self, center: Vec3, half: Vec3) -> BodyHandle {
        self.insert(BodyKind::Kinematic, center, half)
    }

    fn index(&self, handle: BodyHandle) -> Option<usize> {
        self.bodies.binary_search_by_key(&handle, |b| b.handle).ok()
    }

    /// Release a body. Returns false if it was already gone.
    pub fn remove(&mut self, handle: BodyHandle) -> bool {
        match self.index(handle) {
            Some(i) => {
                self.bodies.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn set_position(&mut self, handle: BodyHandle, center: Vec3) {
        if let Some(i) = self.index(handle) {
            self.bodies[i].center = center;
        }
    }

    pub fn set_velocity(&mut self, handle: BodyHandle, velocity: Vec3) {
        if let Some(i) = self.index(handle) {
            if self.bodies[i].kind == BodyKind::Kinematic {
                self.bodies[i].velocity = velocity;
            }
        }
    }

    pub fn position(&self, handle: BodyHandle) -> Option<Vec3> {
        self.index(handle).map(|i| self.bodies[i].center)
    }

    pub fn aabb(&self, handle: BodyHandle) -> Option<Aabb> {
        self.index(handle)
            .map(|i| Aabb::new(self.bodies[i].center, self.bodies[i].half))
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn substeps(&self) -> u64 {
        self.substeps
    }

    /// Advance kinematic bodies by `frame_dt`, split into substeps no longer
    /// than `fixed_dt`. Nothing carries over between calls.
    pub fn step(&mut self, fixed_dt: f32, frame_dt: f32, max_substeps: u32) -> u32 {
        if frame_dt <= 0.0 || fixed_dt <= 0.0 {
            return 0;
        }
        let steps = ((frame_dt / fixed_dt).ceil() as u32).clamp(1, max_substeps.max(1));
        let dt = frame_dt.min(fixed_dt * steps as f32) / steps as f32;
        for _ in 0..steps {
            for body in self.bodies.iter_mut() {
                if body.kind == BodyKind::Kinematic {
                    body.center += body.velocity * dt;
                }
            }
        }
        self.substeps += steps as u64;
        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinematic_body_moves_static_does_not() {
        let mut world = PhysicsWorld::new();
        let wall = world.add_static(Vec3::ZERO, Vec3::splat(0.5));
        let bolt = world.add_kinematic(Vec3::ZERO, Vec3::splat(0.1));
        world.set_velocity(wall, Vec3::Z);
        world.set_velocity(bolt, Vec3::new(0.0, 0.0, -10.0));
        world.step(1.0 / 60.0, 0.5, 10);
        assert_eq!(world.position(wall), Some(Vec3::ZERO));
        let z = world.position(bolt).map(|p| p.z).unwrap_or_default();
        // Clamped to 10 substeps of 1/60
        assert!((z + 10.0 * 10.0 / 60.0).abs() < 1e-4);
    }

    #[test]
    fn test_remove_releases_handle() {
        let mut world = PhysicsWorld::new();
        let a = world.add_static(Vec3::ZERO, Vec3::ONE);
        let b = world.add_static(Vec3::X, Vec3::ONE);
        assert!(world.remove(a));
        assert!(!world.remove(a));
        assert_eq!(world.len(), 1);
        assert_eq!(world.position(b), Some(Vec3::X));
    }

    #[test]
    fn test_short_frame_takes_one_step() {
        let mut world = PhysicsWorld::new();
        assert_eq!(world.step(1.0 / 60.0, 1.0 / 120.0, 10), 1);
        assert_eq!(world.step(1.0 / 60.0, 0.0, 10), 0);
    }
}
