//! Procedural spawning ahead of the player and cleanup behind
//!
//! Each category keeps a watermark: the z of its last spawn. [`propose`]
//! walks forward from it in `spacing ± jitter` steps until the lookahead
//! horizon or the live cap is reached, asking the caller to accept or reject
//! each candidate. [`despawn`] retires entities behind the cleanup horizon.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::physics::PhysicsWorld;
use super::state::{Entity, Life, RngState};
use super::timeline::{Target, Timeline};

/// Safety valve for callers that reject every candidate
const MAX_ATTEMPTS: u32 = 256;

/// Spawn parameters for one category
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnRule {
    pub spacing: f32,
    pub jitter: f32,
    /// How far ahead of the character content may exist
    pub lookahead: f32,
    /// Minimum distance ahead of the character for a new spawn
    pub lead: f32,
    pub max_live: usize,
}

impl SpawnRule {
    /// Smallest gap between consecutive spawns
    pub fn min_spacing(&self) -> f32 {
        self.spacing - self.jitter
    }

    /// Farthest z a spawn may use this frame
    pub fn horizon(&self, character_z: f32, world_max: f32) -> f32 {
        (character_z + self.lookahead).min(world_max)
    }
}

/// Caller's decision on a candidate position
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    Accept,
    /// Skip the slot; the watermark moves forward by this much
    Reject { skip: f32 },
}

/// Propose spawn positions for one category. Accepted positions come back
/// in ascending order and the watermark ends at the last accepted or
/// skipped slot.
pub fn propose(
    rule: &SpawnRule,
    watermark: &mut f32,
    character_z: f32,
    world_max: f32,
    live: usize,
    rng: &mut RngState,
    mut accept: impl FnMut(f32) -> Verdict,
) -> Vec<f32> {
    let mut out = Vec::new();
    let horizon = rule.horizon(character_z, world_max);
    let mut cursor = watermark.max(character_z + rule.lead);
    let mut attempts = 0;
    while live + out.len() < rule.max_live && attempts < MAX_ATTEMPTS {
        attempts += 1;
        let z = cursor + rule.spacing + rng.jitter(rule.jitter);
        if z > horizon {
            break;
        }
        match accept(z) {
            Verdict::Accept => {
                out.push(z);
                cursor = z;
            }
            Verdict::Reject { skip } => {
                cursor += skip.max(0.1);
            }
        }
        *watermark = cursor;
    }
    out
}

/// A half-open z span occupied by something
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: f32,
    pub end: f32,
}

impl Span {
    pub fn new(start: f32, end: f32) -> Self {
        Self { start, end }
    }

    pub fn around(center: f32, radius: f32) -> Self {
        Self::new(center - radius, center + radius)
    }

    #[inline]
    pub fn contains(&self, z: f32) -> bool {
        z >= self.start && z < self.end
    }
}

/// Whether `z` lies inside any span
pub fn excluded(z: f32, spans: &[Span]) -> bool {
    spans.iter().any(|s| s.contains(z))
}

/// Whether any of `others` lies within `distance` of `z`
pub fn near_any(z: f32, others: impl IntoIterator<Item = f32>, distance: f32) -> bool {
    others.into_iter().any(|o| (o - z).abs() < distance)
}

/// Lowest-z eligible entity within `[min_z, max_z]`, ties broken by id
pub fn nearest_ahead<'a, T>(
    items: &'a [Entity<T>],
    min_z: f32,
    max_z: f32,
    mut eligible: impl FnMut(&Entity<T>) -> bool,
) -> Option<&'a Entity<T>> {
    items
        .iter()
        .filter(|e| e.pos.z >= min_z && e.pos.z <= max_z && eligible(e))
        .min_by(|a, b| a.pos.z.total_cmp(&b.pos.z).then(a.id.cmp(&b.id)))
}

/// Content generated up front and released once the horizon reaches it
#[derive(Debug, Clone, Default)]
pub struct Staged<T> {
    pending: VecDeque<(f32, T)>,
}

impl<T> Staged<T> {
    pub fn new(mut items: Vec<(f32, T)>) -> Self {
        items.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self {
            pending: items.into(),
        }
    }

    /// Pop every staged item with z at or before `horizon`
    pub fn release(&mut self, horizon: f32) -> Vec<(f32, T)> {
        let mut out = Vec::new();
        while self.pending.front().is_some_and(|(z, _)| *z <= horizon) {
            if let Some(item) = self.pending.pop_front() {
                out.push(item);
            }
        }
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = &(f32, T)> {
        self.pending.iter()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Retire consumed entities and anything more than `cleanup` behind
/// `cursor`, cancelling their tweens and releasing their bodies first.
pub fn despawn<T>(
    items: &mut Vec<Entity<T>>,
    cursor: f32,
    cleanup: f32,
    physics: &mut PhysicsWorld,
    timeline: &mut Timeline,
) -> usize {
    let before = items.len();
    let horizon = cursor - cleanup;
    items.retain(|e| {
        let keep = e.life != Life::Consumed && e.pos.z >= horizon;
        if !keep {
            timeline.cancel_target(Target::Entity(e.id));
            if let Some(body) = e.body {
                physics.remove(body);
            }
        }
        keep
    });
    before - items.len()
}

/// Count of entities that still occupy a live slot
pub fn live_count<T>(items: &[Entity<T>]) -> usize {
    items.iter().filter(|e| e.life != Life::Consumed).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::timeline::{Prop, Tween};
    use glam::Vec3;
    use proptest::prelude::*;

    fn rule() -> SpawnRule {
        SpawnRule {
            spacing: 20.0,
            jitter: 1.5,
            lookahead: 200.0,
            lead: 0.0,
            max_live: 300,
        }
    }

    #[test]
    fn test_candidates_within_window() {
        let mut rng = RngState::new(11);
        let mut watermark = 0.0;
        let spans = [Span::new(100.0, 130.0)];
        let zs = propose(&rule(), &mut watermark, 50.0, 800.0, 0, &mut rng, |z| {
            if excluded(z, &spans) {
                Verdict::Reject { skip: 5.0 }
            } else {
                Verdict::Accept
            }
        });
        assert!(!zs.is_empty());
        for z in &zs {
            assert!(*z >= 50.0 + rule().min_spacing());
            assert!(*z <= 250.0);
            assert!(!excluded(*z, &spans));
        }
        assert!(zs.windows(2).all(|w| w[1] - w[0] >= rule().min_spacing()));
    }

    #[test]
    fn test_horizon_clamped_to_world() {
        let mut rng = RngState::new(3);
        let mut watermark = 700.0;
        let zs = propose(&rule(), &mut watermark, 700.0, 760.0, 0, &mut rng, |_| Verdict::Accept);
        assert!(zs.iter().all(|z| *z <= 760.0));
    }

    #[test]
    fn test_live_cap_respected() {
        let mut rng = RngState::new(5);
        let mut watermark = 0.0;
        let mut capped = rule();
        capped.max_live = 4;
        let zs = propose(&capped, &mut watermark, 0.0, 800.0, 3, &mut rng, |_| Verdict::Accept);
        assert_eq!(zs.len(), 1);
    }

    #[test]
    fn test_nearest_ahead_is_sorted() {
        let items = vec![
            Entity::new(1, Vec3::new(0.0, 3.0, 60.0), ()),
            Entity::new(2, Vec3::new(0.0, 3.0, 25.0), ()),
            Entity::new(3, Vec3::new(0.0, 3.0, 10.0), ()),
        ];
        let pick = nearest_ahead(&items, 20.0, 200.0, |_| true).map(|e| e.id);
        assert_eq!(pick, Some(2));
    }

    #[test]
    fn test_despawn_releases_handles() {
        let mut physics = PhysicsWorld::new();
        let mut timeline = Timeline::default();
        let body = physics.add_static(Vec3::ZERO, Vec3::ONE);
        let mut items = vec![
            Entity::new(1, Vec3::new(0.0, 0.0, 10.0), ()).with_body(body),
            Entity::new(2, Vec3::new(0.0, 0.0, 90.0), ()),
        ];
        timeline.add(Tween::new(Target::Entity(1), Prop::Y, 0.0, 1.0, 1.0));
        assert_eq!(despawn(&mut items, 100.0, 50.0, &mut physics, &mut timeline), 1);
        assert!(physics.is_empty());
        assert!(timeline.is_empty());
        assert_eq!(items[0].id, 2);
    }

    #[test]
    fn test_staged_release() {
        let mut staged = Staged::new(vec![(30.0, 'b'), (10.0, 'a'), (300.0, 'c')]);
        let first: Vec<char> = staged.release(220.0).into_iter().map(|(_, c)| c).collect();
        assert_eq!(first, vec!['a', 'b']);
        assert_eq!(staged.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_spawns_stay_bounded(seed in any::<u64>(), char_z in 0.0f32..700.0, live in 0usize..10) {
            let mut rng = RngState::new(seed);
            let mut capped = rule();
            capped.max_live = 10;
            let mut watermark = char_z;
            let zs = propose(&capped, &mut watermark, char_z, 808.0, live, &mut rng, |_| Verdict::Accept);
            prop_assert!(live + zs.len() <= capped.max_live);
            for z in zs {
                prop_assert!(z > char_z);
                prop_assert!(z <= (char_z + capped.lookahead).min(808.0));
            }
        }
    }
}
