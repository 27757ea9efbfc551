//! Up-front skyway plan: floating platforms and what sits on them

use glam::Vec3;

use super::tuning::{PlatformType, SkywayTuning};
use crate::sim::events::ItemKind;
use crate::sim::state::RngState;

/// What a gift box releases when its underside is hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxContents {
    Item(ItemKind),
    /// A monster that drops out and joins the others
    Monster,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    /// Position is the box center
    Platform { half: Vec3 },
    /// Position is the hover base
    Monster,
    Diamond,
    GiftBox(BoxContents),
    /// The exit pipe on the final platform; position is its center
    Pipe { half: Vec3 },
}

#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub placements: Vec<(Vec3, Placement)>,
    /// Feet position above the first platform
    pub start: Vec3,
    pub final_z: f32,
}

struct Slot {
    z: f32,
    top: f32,
    depth: f32,
}

pub fn generate(t: &SkywayTuning, rng: &mut RngState) -> Layout {
    let mut placements = Vec::new();
    let mut inner = Vec::new();
    let mut start = Vec3::ZERO;
    let mut final_z = 0.0;
    let last = t.platform_count.saturating_sub(1);
    let fallback = PlatformType {
        width: 4.0,
        depth: 3.0,
        height: 0.4,
    };

    for i in 0..t.platform_count {
        let ty = if t.platform_types.is_empty() {
            fallback
        } else {
            t.platform_types[rng.index(t.platform_types.len())]
        };
        let width = ty.width + rng.jitter(t.size_variation);
        let depth = ty.depth + rng.jitter(t.size_variation);
        let height = ty.height + rng.jitter(t.height_variation);
        let z = i as f32 * t.platform_spacing + rng.jitter(t.platform_jitter);
        let y = rng.range(t.platform_min_y, t.platform_max_y);
        let top = y + height;
        let half = Vec3::new(width / 2.0, height / 2.0, depth / 2.0);
        placements.push((Vec3::new(0.0, y + half.y, z), Placement::Platform { half }));

        let along = |rng: &mut RngState| rng.jitter((depth - 1.0).max(0.0) / 2.0);
        if i == 0 {
            start = Vec3::new(0.0, top, 0.0);
        }
        if i == last {
            final_z = z;
            let half = Vec3::from(t.pipe_size) / 2.0;
            let pz = z + along(rng);
            placements.push((Vec3::new(0.0, top + 0.5, pz), Placement::Pipe { half }));
            continue;
        }
        if i == 0 {
            continue;
        }

        inner.push(Slot { z, top, depth });
        if rng.chance(t.monster_chance) {
            let mz = z + along(rng);
            placements.push((Vec3::new(0.0, top + t.monster_rise, mz), Placement::Monster));
        }
        if rng.chance(t.diamond_chance) {
            let count = rng.int(t.diamond_min, t.diamond_max);
            let size = 0.3;
            let span = ((count.saturating_sub(1)) as f32 * t.diamond_spacing).min(depth - 2.0 * size);
            let limit = depth / 2.0 - size;
            for k in 0..count {
                let dz = (-span / 2.0 + k as f32 * t.diamond_spacing + rng.jitter(0.1)).clamp(-limit, limit);
                placements.push((Vec3::new(0.0, top + t.diamond_y, z + dz), Placement::Diamond));
            }
        }
    }

    // Gift boxes on distinct inner platforms with shuffled contents
    let mut contents: Vec<BoxContents> = std::iter::repeat_n(BoxContents::Item(ItemKind::HealthPotion), t.health_potions)
        .chain([
            BoxContents::Monster,
            BoxContents::Item(ItemKind::Treasure),
            BoxContents::Item(ItemKind::Potion),
        ])
        .collect();
    rng.shuffle(&mut contents);
    let mut order: Vec<usize> = (0..inner.len()).collect();
    rng.shuffle(&mut order);
    for (&slot, content) in order.iter().take(t.box_count).zip(contents) {
        let slot = &inner[slot];
        let dz = rng.jitter((slot.depth - 1.0).max(0.0) / 2.0);
        placements.push((
            Vec3::new(0.0, slot.top + t.box_height, slot.z + dz),
            Placement::GiftBox(content),
        ));
    }

    log::info!(
        "☁️ Skyway plan: {} platforms, {} placements, final platform at {final_z:.0}",
        t.platform_count,
        placements.len()
    );
    Layout {
        placements,
        start,
        final_z,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(layout: &Layout, f: impl Fn(&Placement) -> bool) -> usize {
        layout.placements.iter().filter(|(_, p)| f(p)).count()
    }

    #[test]
    fn test_plan_counts() {
        let t = SkywayTuning::default();
        let layout = generate(&t, &mut RngState::new(3));
        assert_eq!(count(&layout, |p| matches!(p, Placement::Platform { .. })), 50);
        assert_eq!(count(&layout, |p| matches!(p, Placement::Pipe { .. })), 1);
        assert_eq!(count(&layout, |p| matches!(p, Placement::GiftBox(_))), 8);
        assert!(layout.final_z > 400.0);
    }

    #[test]
    fn test_unique_box_contents() {
        let t = SkywayTuning::default();
        let layout = generate(&t, &mut RngState::new(21));
        let potions = count(&layout, |p| *p == Placement::GiftBox(BoxContents::Item(ItemKind::Potion)));
        let treasures = count(&layout, |p| *p == Placement::GiftBox(BoxContents::Item(ItemKind::Treasure)));
        let healing = count(&layout, |p| {
            *p == Placement::GiftBox(BoxContents::Item(ItemKind::HealthPotion))
        });
        assert_eq!((potions, treasures, healing), (1, 1, 5));
    }

    #[test]
    fn test_boxes_sit_on_distinct_platforms() {
        let t = SkywayTuning::default();
        let layout = generate(&t, &mut RngState::new(5));
        let platforms: Vec<(Vec3, Vec3)> = layout
            .placements
            .iter()
            .filter_map(|(pos, p)| match p {
                Placement::Platform { half } => Some((*pos, *half)),
                _ => None,
            })
            .collect();
        let mut hosts: Vec<usize> = layout
            .placements
            .iter()
            .filter(|(_, p)| matches!(p, Placement::GiftBox(_)))
            .filter_map(|(pos, _)| {
                platforms.iter().position(|(center, half)| {
                    let top = center.y + half.y;
                    (pos.y - t.box_height - top).abs() < 1e-3 && (pos.z - center.z).abs() <= half.z
                })
            })
            .collect();
        assert_eq!(hosts.len(), 8);
        hosts.sort_unstable();
        hosts.dedup();
        assert_eq!(hosts.len(), 8);
        assert!(hosts.iter().all(|&i| i > 0 && i < platforms.len() - 1));
    }
}
