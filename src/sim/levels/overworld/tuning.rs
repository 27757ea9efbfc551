//! Overworld balance table

use serde::{Deserialize, Serialize};

use crate::sim::spawner::SpawnRule;

/// Every constant the overworld uses. Loaded from JSON or defaulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverworldTuning {
    // === Character ===
    pub start_lives: u32,
    pub gravity: f32,
    pub jump_velocity: f32,
    pub ground_y: f32,
    pub backtrack_limit: f32,
    /// Distance behind the cursor the character reappears at
    pub backtrack_snap: f32,
    pub hit_invulnerability: f32,
    pub character_height: f32,

    // === Speed stages (index 0 is the base stage) ===
    /// Cursor z at which stages 1..=3 begin
    pub stage_thresholds: [f32; 3],
    pub stage_run: [f32; 4],
    pub back_speed: f32,
    pub stage_back_mult: [f32; 4],
    pub walker_stage_mult: [f32; 4],
    pub patrol_stage_mult: [f32; 4],
    pub turtle_stage_mult: [f32; 4],

    // === Slow (turtle contact) ===
    pub slow_secs: f32,
    pub slow_factor: f32,
    pub slow_run: [f32; 4],
    pub slow_back: [f32; 4],

    // === Power-up (mushroom) ===
    pub power_secs: f32,
    pub power_run: f32,
    pub power_back: f32,
    pub power_floor: [f32; 4],
    pub power_height: f32,
    pub power_strip_secs: f32,

    // === Layout ===
    pub brick_rows: u32,
    pub brick_start_z: f32,
    pub brick_row_spacing: f32,
    pub brick_size: f32,
    pub brick_min_y: f32,
    pub brick_y_range: f32,
    pub brick_stack_chance: f32,
    pub brick_stack_offset: f32,
    pub coin_total: u32,
    pub coin_start_z: f32,
    pub coin_spacing: f32,
    pub coin_on_brick_share: f32,
    pub coin_radius: f32,
    pub box_count: u32,
    pub box_y: f32,
    pub box_gap_rows: u32,
    pub box_min_gap: f32,
    pub box_attempts: u32,
    pub box_swords: u32,
    /// Staged content is released this far ahead of the cursor
    pub release_lookahead: f32,

    // === Items ===
    pub item_radius: f32,
    pub item_rise: f32,
    pub item_rise_secs: f32,
    pub item_hover: f32,
    pub sword_charges_per_pickup: u32,
    pub sword_charge_cap: u32,

    // === Sword projectile ===
    pub sword_speed: f32,
    pub sword_range: f32,
    pub sword_hit_radius: f32,
    pub points_goomba: u32,
    pub points_turtle: u32,
    pub points_plant: u32,

    // === Pipes and plants ===
    pub pipes: SpawnRule,
    pub pipe_min_height: f32,
    pub pipe_max_height: f32,
    pub pipe_clearance: f32,
    pub pipe_end_buffer: f32,
    pub pipe_reject_skip: f32,
    pub plant_travel: f32,
    pub plant_secs: f32,

    // === Goombas ===
    pub goombas: SpawnRule,
    pub goomba_speed: f32,
    pub goomba_walk_past: f32,
    pub goomba_hover: f32,
    pub goomba_hover_secs: f32,
    pub patrol_spacing: f32,
    pub patrol_reach: f32,
    pub stomp_margin: f32,
    pub stomp_bounce: f32,
    pub hurt_band: f32,

    // === Turtles ===
    pub turtles: SpawnRule,
    pub turtle_speed: f32,
    pub turtle_goomba_clearance: f32,
    pub turtle_pipe_offset: f32,
    pub turtle_hop_range: f32,
    pub turtle_hop: f32,
    pub turtle_hop_secs: f32,

    // === Special pipes and chains ===
    pub special_gap: f32,
    pub special_count: u32,
    pub special_spacing: f32,
    pub special_upper_y: f32,
    pub special_height: f32,
    pub chain_batch_sizes: [u32; 3],
    pub chain_min_secs: f32,
    pub chain_max_secs: f32,
    pub chain_max_delay: f32,
    pub chain_rest: f32,
    pub chain_upper_end: f32,
    pub chain_lower_end: f32,

    // === Clouds ===
    pub clouds: SpawnRule,

    // === Goal ===
    pub castle_offset: f32,
    pub castle_reach: f32,
    pub win_score: u32,
    pub win_coins: u32,
    pub advance_delay: f32,

    pub cleanup_distance: f32,
}

impl Default for OverworldTuning {
    fn default() -> Self {
        Self {
            start_lives: 3,
            gravity: 25.82,
            jump_velocity: 17.0,
            ground_y: 0.1,
            backtrack_limit: 8.0,
            backtrack_snap: 5.0,
            hit_invulnerability: 2.0,
            character_height: 1.0,

            stage_thresholds: [133.0, 267.0, 600.0],
            stage_run: [7.0, 9.0, 11.0, 12.5],
            back_speed: 5.0,
            stage_back_mult: [1.0, 1.2857, 1.5714, 2.0],
            walker_stage_mult: [1.0, 1.25, 1.5, 1.75],
            patrol_stage_mult: [1.0, 1.125, 1.25, 1.25],
            turtle_stage_mult: [1.0, 1.25, 1.5, 1.75],

            slow_secs: 10.0,
            slow_factor: 0.5,
            slow_run: [6.0, 8.0, 10.0, 12.5],
            slow_back: [5.0, 6.25, 7.5, 8.3335],

            power_secs: 15.0,
            power_run: 10.0,
            power_back: 7.5,
            power_floor: [6.0, 8.0, 10.0, 12.0],
            power_height: 1.5,
            power_strip_secs: 1.2,

            brick_rows: 80,
            brick_start_z: 15.0,
            brick_row_spacing: 10.0,
            brick_size: 0.57,
            brick_min_y: 2.5,
            brick_y_range: 2.0,
            brick_stack_chance: 0.3,
            brick_stack_offset: 0.6,
            coin_total: 267,
            coin_start_z: 10.0,
            coin_spacing: 3.0,
            coin_on_brick_share: 0.7,
            coin_radius: 1.0,
            box_count: 14,
            box_y: 4.5,
            box_gap_rows: 60,
            box_min_gap: 0.57 * 5.0 + 2.0,
            box_attempts: 100,
            box_swords: 2,
            release_lookahead: 220.0,

            item_radius: 0.7,
            item_rise: 1.0,
            item_rise_secs: 0.3,
            item_hover: 0.5,
            sword_charges_per_pickup: 5,
            sword_charge_cap: 10,

            sword_speed: 20.0,
            sword_range: 30.0,
            sword_hit_radius: 0.7,
            points_goomba: 100,
            points_turtle: 50,
            points_plant: 25,

            pipes: SpawnRule {
                spacing: 30.0,
                jitter: 5.0,
                lookahead: 200.0,
                lead: 0.0,
                max_live: 16,
            },
            pipe_min_height: 1.0,
            pipe_max_height: 3.0,
            pipe_clearance: 2.0,
            pipe_end_buffer: 10.0,
            pipe_reject_skip: 5.0,
            plant_travel: 2.5,
            plant_secs: 1.5,

            goombas: SpawnRule {
                spacing: 20.0,
                jitter: 1.5,
                lookahead: 200.0,
                lead: 10.0,
                max_live: 300,
            },
            goomba_speed: 2.0,
            goomba_walk_past: 50.0,
            goomba_hover: 0.15,
            goomba_hover_secs: 0.35,
            patrol_spacing: 20.0,
            patrol_reach: 3.0,
            stomp_margin: 0.2,
            stomp_bounce: 0.3,
            hurt_band: 0.75,

            turtles: SpawnRule {
                spacing: 15.0,
                jitter: 0.0,
                lookahead: 200.0,
                lead: 10.0,
                max_live: 40,
            },
            turtle_speed: 2.0,
            turtle_goomba_clearance: 7.5,
            turtle_pipe_offset: 9.5,
            turtle_hop_range: 5.0,
            turtle_hop: 1.5,
            turtle_hop_secs: 0.5,

            special_gap: 5.0,
            special_count: 20,
            special_spacing: 2.0,
            special_upper_y: 10.0,
            special_height: 2.0,
            chain_batch_sizes: [3, 4, 5],
            chain_min_secs: 0.8,
            chain_max_secs: 1.2,
            chain_max_delay: 0.5,
            chain_rest: 0.07,
            chain_upper_end: -2.0,
            chain_lower_end: 12.0,

            clouds: SpawnRule {
                spacing: 20.0,
                jitter: 2.5,
                lookahead: 200.0,
                lead: -20.0,
                max_live: 120,
            },

            castle_offset: 60.0,
            castle_reach: 1.0,
            win_score: 3000,
            win_coins: 150,
            advance_delay: 3.0,

            cleanup_distance: 50.0,
        }
    }
}

impl OverworldTuning {
    /// Speed stage for a cursor position
    pub fn stage_for(&self, furthest_z: f32) -> usize {
        self.stage_thresholds
            .iter()
            .filter(|t| furthest_z > **t)
            .count()
    }
}
