//! Up-front overworld layout: brick rows, coins and gift boxes
//!
//! Generated once per level instance from the seeded RNG, then released into
//! the world progressively as the cursor approaches.

use glam::Vec3;

use super::tuning::OverworldTuning;
use crate::sim::events::ItemKind;
use crate::sim::state::RngState;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrickSeed {
    pub pos: Vec3,
    /// Index of the row this brick belongs to
    pub row: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxSeed {
    /// Bottom-center of the box
    pub pos: Vec3,
    pub contents: ItemKind,
}

#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub bricks: Vec<BrickSeed>,
    pub coins: Vec<Vec3>,
    pub boxes: Vec<BoxSeed>,
    /// Last z carrying generated content
    pub world_end: f32,
}

pub fn generate(t: &OverworldTuning, rng: &mut RngState) -> Layout {
    let bricks = brick_rows(t, rng);
    let coins = coins(t, &bricks, rng);
    let boxes = gift_boxes(t, &bricks, rng);

    let ground_end = t.coin_start_z + (t.coin_total.saturating_sub(1)) as f32 * t.coin_spacing;
    let brick_end = bricks.iter().map(|b| b.pos.z).fold(0.0f32, f32::max);
    let coin_end = coins.iter().map(|c| c.z).fold(0.0f32, f32::max);
    let world_end = ground_end.max(brick_end).max(coin_end);
    log::info!(
        "🧱 Layout: {} bricks, {} coins, {} boxes, world end {:.0}",
        bricks.len(),
        coins.len(),
        boxes.len(),
        world_end
    );
    Layout {
        bricks,
        coins,
        boxes,
        world_end,
    }
}

fn brick_rows(t: &OverworldTuning, rng: &mut RngState) -> Vec<BrickSeed> {
    let mut bricks = Vec::new();
    for row in 0..t.brick_rows {
        let z0 = t.brick_start_z + row as f32 * t.brick_row_spacing;
        let count = if rng.chance(0.5) { 3 } else { 5 };
        let y = t.brick_min_y + rng.unit() * t.brick_y_range;
        for i in 0..count {
            bricks.push(BrickSeed {
                pos: Vec3::new(0.0, y, z0 + i as f32 * t.brick_size),
                row,
            });
        }
        // Occasional extension of the same row
        if rng.chance(t.brick_stack_chance) {
            let extra = if rng.chance(0.5) { 3 } else { 5 };
            let start = z0 + count as f32 * t.brick_stack_offset;
            for i in 0..extra {
                bricks.push(BrickSeed {
                    pos: Vec3::new(0.0, y, start + i as f32 * t.brick_size),
                    row,
                });
            }
        }
    }
    bricks
}

fn coins(t: &OverworldTuning, bricks: &[BrickSeed], rng: &mut RngState) -> Vec<Vec3> {
    let total = t.coin_total as usize;
    let on_bricks = ((total as f32) * t.coin_on_brick_share).round() as usize;
    let mut coins = Vec::with_capacity(total);

    let mut free: Vec<usize> = (0..bricks.len()).collect();
    for _ in 0..on_bricks.min(total) {
        if free.is_empty() {
            // Every brick has a coin; stack more above a random one
            if bricks.is_empty() {
                break;
            }
            let b = bricks[rng.index(bricks.len())].pos;
            coins.push(b + Vec3::new(0.0, 1.0 + rng.unit() * 0.5, 0.0));
            continue;
        }
        let pick = free.swap_remove(rng.index(free.len()));
        coins.push(bricks[pick].pos + Vec3::Y);
    }

    let ground = total - coins.len();
    let mut z = t.coin_start_z;
    let mut placed = 0;
    let mut i = 0usize;
    while placed < ground {
        let blocked = bricks.iter().any(|b| (b.pos.z - z).abs() < 1.0);
        if !blocked {
            let y = if i != 0 && i % 5 == 0 { 2.5 } else { 1.0 };
            coins.push(Vec3::new(0.0, y, z));
            placed += 1;
        }
        i += 1;
        z += t.coin_spacing;
    }
    coins.sort_by(|a, b| a.z.total_cmp(&b.z));
    coins
}

fn gift_boxes(t: &OverworldTuning, bricks: &[BrickSeed], rng: &mut RngState) -> Vec<BoxSeed> {
    let rows: Vec<f32> = (0..t.box_gap_rows)
        .map(|i| t.brick_start_z + i as f32 * t.brick_row_spacing)
        .collect();
    let mut boxes: Vec<BoxSeed> = Vec::new();
    if rows.len() < 2 {
        return boxes;
    }
    let mut swords = 0;
    for _ in 0..t.box_attempts {
        if boxes.len() >= t.box_count as usize {
            break;
        }
        let gap = rng.index(rows.len() - 1);
        let z = (rows[gap] + rows[gap + 1]) / 2.0;
        let near_row = rows.iter().any(|r| (r - z).abs() < t.box_min_gap / 2.0);
        let near_brick = bricks.iter().any(|b| (b.pos.z - z).abs() < t.brick_size + 0.3);
        let near_box = boxes.iter().any(|b| (b.pos.z - z).abs() < t.box_min_gap);
        if near_row || near_brick || near_box {
            continue;
        }
        let contents = if swords < t.box_swords {
            swords += 1;
            ItemKind::Sword
        } else if rng.chance(0.5) {
            ItemKind::Mushroom
        } else {
            ItemKind::Heart
        };
        boxes.push(BoxSeed {
            pos: Vec3::new(0.0, t.box_y, z),
            contents,
        });
    }
    boxes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_counts() {
        let t = OverworldTuning::default();
        let layout = generate(&t, &mut RngState::new(12345));
        assert_eq!(layout.coins.len(), t.coin_total as usize);
        assert!(layout.bricks.len() >= 80 * 3);
        assert!(layout.boxes.len() <= t.box_count as usize);
        assert!(layout.world_end >= 808.0);
    }

    #[test]
    fn test_first_boxes_hold_swords() {
        let t = OverworldTuning::default();
        let layout = generate(&t, &mut RngState::new(9));
        let swords = layout
            .boxes
            .iter()
            .filter(|b| b.contents == ItemKind::Sword)
            .count();
        assert_eq!(swords, (t.box_swords as usize).min(layout.boxes.len()));
    }

    #[test]
    fn test_boxes_keep_their_gap() {
        let t = OverworldTuning::default();
        let layout = generate(&t, &mut RngState::new(77));
        for (i, a) in layout.boxes.iter().enumerate() {
            for b in &layout.boxes[i + 1..] {
                assert!((a.pos.z - b.pos.z).abs() >= t.box_min_gap);
            }
        }
    }

    #[test]
    fn test_ground_coins_avoid_bricks() {
        let t = OverworldTuning::default();
        let layout = generate(&t, &mut RngState::new(4));
        // Brick coins sit at least 3.5 up; everything lower is a ground coin
        for coin in layout.coins.iter().filter(|c| c.y <= 2.5) {
            assert!(layout.bricks.iter().all(|b| (b.pos.z - coin.z).abs() >= 1.0));
        }
    }
}
