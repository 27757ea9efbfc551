//! Collision detection and resolution for the character
//!
//! All tests are axis-aligned boxes with fixed half-extents per category,
//! or Euclidean distance for pickups. Each level describes its categories
//! with a [`CollisionPolicy`] table and feeds them through the generic
//! routines here:
//! - [`resolve_solids`] runs before velocity integration (landing, side
//!   blocking, head bumps)
//! - [`first_hit`] and [`collect_in_reach`] run after the position is final

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::state::{Entity, Facing};

/// Axis-aligned box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub center: Vec3,
    pub half: Vec3,
}

impl Aabb {
    pub fn new(center: Vec3, half: Vec3) -> Self {
        Self { center, half }
    }

    /// Box whose bottom face sits at `base.y`
    pub fn from_base(base: Vec3, half: Vec3) -> Self {
        Self::new(base + Vec3::new(0.0, half.y, 0.0), half)
    }

    #[inline]
    pub fn top(&self) -> f32 {
        self.center.y + self.half.y
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.center.y - self.half.y
    }

    /// Strict per-axis overlap
    pub fn overlaps(&self, other: &Aabb) -> bool {
        let d = (self.center - other.center).abs();
        let reach = self.half + other.half;
        d.x < reach.x && d.y < reach.y && d.z < reach.z
    }
}

/// Vertical velocity response to a head bump
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HeadResponse {
    /// Zero vertical velocity
    Stop,
    /// `vy = -vy * factor`
    Rebound(f32),
    /// `vy = value` regardless of entry speed
    Knock(f32),
}

impl HeadResponse {
    pub fn apply(self, vy: f32) -> f32 {
        match self {
            HeadResponse::Stop => 0.0,
            HeadResponse::Rebound(factor) => -vy * factor,
            HeadResponse::Knock(value) => value,
        }
    }
}

/// How contact with a category resolves
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Resolution {
    Solid {
        /// Top can be landed on
        land: bool,
        /// Blocks horizontal motion
        side: bool,
        /// Blocks the head from below
        head: Option<HeadResponse>,
    },
    Hostile,
    Pickup {
        radius: f32,
    },
}

/// One record per category
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionPolicy {
    pub half: Vec3,
    pub resolution: Resolution,
}

impl CollisionPolicy {
    pub const fn solid(half: Vec3, land: bool, side: bool, head: Option<HeadResponse>) -> Self {
        Self {
            half,
            resolution: Resolution::Solid { land, side, head },
        }
    }

    pub const fn hostile(half: Vec3) -> Self {
        Self {
            half,
            resolution: Resolution::Hostile,
        }
    }

    pub const fn pickup(radius: f32) -> Self {
        Self {
            half: Vec3::splat(radius),
            resolution: Resolution::Pickup { radius },
        }
    }

    /// Collection radius for pickups, zero otherwise
    pub fn radius(&self) -> f32 {
        match self.resolution {
            Resolution::Pickup { radius } => radius,
            _ => 0.0,
        }
    }
}

/// A solid volume handed to [`resolve_solids`], tagged with a caller key
#[derive(Debug, Clone, Copy)]
pub struct Solid<K> {
    pub key: K,
    pub aabb: Aabb,
    pub land: bool,
    pub side: bool,
    pub head: Option<HeadResponse>,
}

impl<K> Solid<K> {
    /// Build from a policy; non-solid policies yield `None`
    pub fn from_policy(key: K, center: Vec3, policy: &CollisionPolicy) -> Option<Self> {
        match policy.resolution {
            Resolution::Solid { land, side, head } => Some(Self {
                key,
                aabb: Aabb::new(center, policy.half),
                land,
                side,
                head,
            }),
            _ => None,
        }
    }
}

/// Landing band around a top surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandingBand {
    /// How far the feet may be below the top and still snap up
    pub below: f32,
    /// How far above the top the surface already counts as support
    pub above: f32,
}

impl Default for LandingBand {
    fn default() -> Self {
        Self {
            below: 0.5,
            above: 0.05,
        }
    }
}

/// The character as seen by the solid pass
#[derive(Debug, Clone, Copy)]
pub struct Probe {
    /// Feet position
    pub pos: Vec3,
    pub vy: f32,
    pub height: f32,
    pub half_width: f32,
    /// Direction of attempted horizontal motion this frame
    pub moving: Option<Facing>,
    /// Horizontal displacement magnitude this frame
    pub step: f32,
    pub band: LandingBand,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Support<K> {
    pub key: K,
    pub top: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blocked<K> {
    pub key: K,
    /// Near face position the character is clamped to
    pub clamp_z: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ceiling<K> {
    pub key: K,
    pub bottom: f32,
    pub response: HeadResponse,
}

/// Outcome of the solid pass
#[derive(Debug, Clone, PartialEq)]
pub struct SolidResolution<K> {
    /// Highest top the character stands on or is about to land on
    pub support: Option<Support<K>>,
    pub blocked: Option<Blocked<K>>,
    /// Lowest ceiling hit while rising
    pub ceiling: Option<Ceiling<K>>,
}

impl<K> SolidResolution<K> {
    #[inline]
    pub fn can_move(&self) -> bool {
        self.blocked.is_none()
    }
}

/// Resolve the character against every solid. Landing takes priority over
/// side blocking for the same solid; a head bump also suppresses the side test.
pub fn resolve_solids<K: Copy>(probe: &Probe, solids: &[Solid<K>]) -> SolidResolution<K> {
    let mut result = SolidResolution {
        support: None,
        blocked: None,
        ceiling: None,
    };
    let feet = probe.pos.y;
    let head = feet + probe.height;
    let next_z = match probe.moving {
        Some(dir) => probe.pos.z + dir.sign() * probe.step,
        None => probe.pos.z,
    };

    for solid in solids {
        let b = &solid.aabb;
        let reach_x = b.half.x + probe.half_width;
        let reach_z = b.half.z + probe.half_width;
        if (probe.pos.x - b.center.x).abs() >= reach_x {
            continue;
        }
        let over_now = (probe.pos.z - b.center.z).abs() < reach_z;

        if over_now && solid.land && probe.vy <= 0.0 {
            let top = b.top();
            if feet >= top - probe.band.below && feet <= top + probe.band.above {
                if result.support.is_none_or(|s| top > s.top) {
                    result.support = Some(Support { key: solid.key, top });
                }
                continue;
            }
        }

        if over_now && probe.vy > 0.0 {
            if let Some(response) = solid.head {
                let bottom = b.bottom();
                if head >= bottom && feet < bottom {
                    if result.ceiling.is_none_or(|c| bottom < c.bottom) {
                        result.ceiling = Some(Ceiling {
                            key: solid.key,
                            bottom,
                            response,
                        });
                    }
                    continue;
                }
            }
        }

        if solid.side && result.blocked.is_none() {
            let vertically_clear = feet >= b.top() - 1e-4 || head <= b.bottom();
            if vertically_clear {
                continue;
            }
            let Some(dir) = probe.moving else { continue };
            if (next_z - b.center.z).abs() >= reach_z {
                continue;
            }
            let clamp_z = match dir {
                Facing::Forward if probe.pos.z <= b.center.z => Some(b.center.z - reach_z),
                Facing::Backward if probe.pos.z >= b.center.z => Some(b.center.z + reach_z),
                _ => None,
            };
            if let Some(clamp_z) = clamp_z {
                result.blocked = Some(Blocked {
                    key: solid.key,
                    clamp_z,
                });
            }
        }
    }
    result
}

/// Stomp or damage classification for a hostile contact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contact {
    /// Descending onto the entity from above
    Stomp,
    Hurt,
    /// Overlapping but neither above nor low enough to hurt
    Graze,
}

/// Classify a contact by the character's feet relative to the entity base.
/// `stomp_margin` is how far below the base the feet may be for a stomp,
/// `hurt_band` how far above the base a contact still hurts.
pub fn classify_contact(feet: f32, vy: f32, base: f32, stomp_margin: f32, hurt_band: f32) -> Contact {
    if vy < 0.0 && feet > base - stomp_margin {
        Contact::Stomp
    } else if feet <= base + hurt_band {
        Contact::Hurt
    } else {
        Contact::Graze
    }
}

/// Index of the first active entity overlapping `probe` in ascending z order
/// (ties broken by spawn id). `offset` shifts the entity position to its box center.
pub fn first_hit<T>(probe: &Aabb, items: &[Entity<T>], half: Vec3, offset: Vec3) -> Option<usize> {
    first_hit_by(probe, items, |e| Some(Aabb::new(e.pos + offset, half)))
}

/// Like [`first_hit`] with a per-entity box; `None` skips the entity
pub fn first_hit_by<T>(
    probe: &Aabb,
    items: &[Entity<T>],
    mut aabb: impl FnMut(&Entity<T>) -> Option<Aabb>,
) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, e) in items.iter().enumerate() {
        if !e.is_active() {
            continue;
        }
        let Some(b) = aabb(e) else { continue };
        if !probe.overlaps(&b) {
            continue;
        }
        let closer = match best {
            None => true,
            Some(j) => {
                let other = &items[j];
                e.pos.z < other.pos.z || (e.pos.z == other.pos.z && e.id < other.id)
            }
        };
        if closer {
            best = Some(i);
        }
    }
    best
}

/// Euclidean pickup test
#[inline]
pub fn in_reach(a: Vec3, b: Vec3, radius: f32) -> bool {
    a.distance(b) < radius
}

/// Mark every active entity within `radius` of `center` consumed and run
/// `effect` once for each. Returns how many were collected.
pub fn collect_in_reach<T>(
    center: Vec3,
    items: &mut [Entity<T>],
    radius: f32,
    mut effect: impl FnMut(&Entity<T>),
) -> usize {
    let mut collected = 0;
    for item in items.iter_mut() {
        if item.is_active() && in_reach(center, item.pos, radius) {
            item.consume();
            effect(item);
            collected += 1;
        }
    }
    collected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe(pos: Vec3, vy: f32) -> Probe {
        Probe {
            pos,
            vy,
            height: 1.0,
            half_width: 0.2,
            moving: None,
            step: 0.0,
            band: LandingBand::default(),
        }
    }

    fn block(z: f32, y: f32) -> Solid<u32> {
        Solid {
            key: 1,
            aabb: Aabb::new(Vec3::new(0.0, y, z), Vec3::splat(0.5)),
            land: true,
            side: true,
            head: Some(HeadResponse::Stop),
        }
    }

    #[test]
    fn test_landing_snaps_to_top() {
        // Top at 3.0, feet slightly below inside the band, falling
        let res = resolve_solids(&probe(Vec3::new(0.0, 2.8, 0.0), -4.0), &[block(0.0, 2.5)]);
        assert_eq!(res.support, Some(Support { key: 1, top: 3.0 }));
        assert!(res.can_move());
    }

    #[test]
    fn test_rising_does_not_land() {
        let res = resolve_solids(&probe(Vec3::new(0.0, 2.8, 0.0), 4.0), &[block(0.0, 2.5)]);
        assert!(res.support.is_none());
    }

    #[test]
    fn test_side_block_clamps_to_near_face() {
        let mut p = probe(Vec3::new(0.0, 0.1, -0.75), 0.0);
        p.moving = Some(Facing::Forward);
        p.step = 0.1;
        let res = resolve_solids(&p, &[block(0.0, 0.5)]);
        let clamp_z = res.blocked.map(|b| b.clamp_z).unwrap_or_default();
        assert!((clamp_z + 0.7).abs() < 1e-5);
        assert!(!res.can_move());
    }

    #[test]
    fn test_moving_away_is_not_blocked() {
        let mut p = probe(Vec3::new(0.0, 0.1, -0.65), 0.0);
        p.moving = Some(Facing::Backward);
        p.step = 0.1;
        let res = resolve_solids(&p, &[block(0.0, 0.5)]);
        assert!(res.can_move());
    }

    #[test]
    fn test_head_bump_from_below() {
        // Bottom at 4.0, head at 4.05 while rising
        let res = resolve_solids(&probe(Vec3::new(0.0, 3.05, 0.0), 8.0), &[block(0.0, 4.5)]);
        let ceiling = res.ceiling.map(|c| c.bottom);
        assert_eq!(ceiling, Some(4.0));
        assert!(res.blocked.is_none());
    }

    #[test]
    fn test_highest_support_wins() {
        let mut high = block(0.0, 1.0);
        high.key = 2;
        let res = resolve_solids(&probe(Vec3::new(0.0, 1.45, 0.0), -1.0), &[block(0.0, 0.5), high]);
        // Only the higher block's band contains the feet
        assert_eq!(res.support.map(|s| s.key), Some(2));
    }

    #[test]
    fn test_stomp_classification() {
        assert_eq!(classify_contact(0.9, -5.0, 0.1, 0.2, 0.75), Contact::Stomp);
        assert_eq!(classify_contact(0.1, 0.0, 0.1, 0.2, 0.75), Contact::Hurt);
        assert_eq!(classify_contact(1.0, 2.0, 0.1, 0.2, 0.75), Contact::Graze);
    }

    #[test]
    fn test_first_hit_prefers_lowest_z() {
        let items = vec![
            Entity::new(1, Vec3::new(0.0, 0.0, 0.4), ()),
            Entity::new(2, Vec3::new(0.0, 0.0, -0.3), ()),
        ];
        let probe = Aabb::new(Vec3::ZERO, Vec3::splat(0.5));
        assert_eq!(first_hit(&probe, &items, Vec3::splat(0.5), Vec3::ZERO), Some(1));
    }

    #[test]
    fn test_collect_applies_once() {
        let mut items = vec![Entity::new(1, Vec3::new(0.0, 0.0, 0.69), ())];
        let mut applied = 0;
        assert_eq!(collect_in_reach(Vec3::ZERO, &mut items, 0.7, |_| applied += 1), 1);
        assert_eq!(collect_in_reach(Vec3::ZERO, &mut items, 0.7, |_| applied += 1), 0);
        assert_eq!(applied, 1);
    }
}
