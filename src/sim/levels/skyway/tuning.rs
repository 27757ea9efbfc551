//! Skyway balance table

use serde::{Deserialize, Serialize};

/// Platform size template: width, depth and height
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlatformType {
    pub width: f32,
    pub depth: f32,
    pub height: f32,
}

const fn platform(depth: f32, height: f32) -> PlatformType {
    PlatformType {
        width: 4.0,
        depth,
        height,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkywayTuning {
    // === Character ===
    pub start_health: u32,
    pub gravity: f32,
    pub jump_velocity: f32,
    pub run_speed: f32,
    pub back_speed: f32,
    /// Support height when over no platform
    pub ground_y: f32,
    pub fall_y: f32,
    pub land_below: f32,
    pub land_above: f32,

    // === Platforms ===
    pub platform_count: usize,
    pub platform_spacing: f32,
    pub platform_jitter: f32,
    pub platform_min_y: f32,
    pub platform_max_y: f32,
    pub platform_types: Vec<PlatformType>,
    /// Random spread on width/depth and height
    pub size_variation: f32,
    pub height_variation: f32,
    pub release_lookahead: f32,

    // === Monsters ===
    pub monster_chance: f32,
    pub monster_rise: f32,
    pub monster_hover: f32,
    pub boxed_monster_hover: f32,
    pub monster_hover_speed: f32,
    pub monster_damage: u32,
    pub monster_cooldown: f32,

    // === Diamonds ===
    pub diamond_chance: f32,
    pub diamond_min: u32,
    pub diamond_max: u32,
    pub diamond_spacing: f32,
    pub diamond_y: f32,
    pub diamond_radius: f32,

    // === Gift boxes and items ===
    pub box_count: usize,
    pub box_height: f32,
    pub box_size: f32,
    pub box_rebound: f32,
    pub health_potions: usize,
    pub item_rise: f32,
    pub item_rise_secs: f32,
    pub monster_drop: f32,
    pub item_hover: f32,
    pub item_radius: f32,
    pub potion_heal: u32,

    // === Bullets ===
    pub bullet_min_interval: f32,
    pub bullet_max_interval: f32,
    pub bullet_interval_shrink: f32,
    pub bullet_distance: f32,
    pub bullet_speed: f32,
    pub bullet_speed_gain: f32,
    pub bullet_min_y: f32,
    pub bullet_max_y: f32,
    pub bullet_damage: u32,
    pub bullet_final_clearance: f32,
    pub shake_secs: f32,
    pub shake_intensity: f32,

    // === Exit pipe ===
    pub pipe_size: [f32; 3],
    pub pipe_stand_secs: f32,
    pub pipe_sink_secs: f32,
    pub advance_delay: f32,

    pub cleanup_distance: f32,
}

impl Default for SkywayTuning {
    fn default() -> Self {
        Self {
            start_health: 100,
            gravity: 25.82,
            jump_velocity: 15.0,
            run_speed: 7.0,
            back_speed: 5.0,
            ground_y: -10.0,
            fall_y: -5.0,
            land_below: 0.5,
            land_above: 1.0,

            platform_count: 50,
            platform_spacing: 9.0,
            platform_jitter: 1.0,
            platform_min_y: -3.0,
            platform_max_y: 2.0,
            platform_types: vec![
                platform(3.0, 0.4),
                platform(3.5, 0.4),
                platform(4.0, 0.35),
                platform(4.5, 0.35),
                platform(5.0, 0.3),
                platform(5.5, 0.3),
                platform(6.0, 0.25),
                platform(6.5, 0.25),
                platform(7.0, 0.2),
                platform(7.5, 0.2),
            ],
            size_variation: 0.25,
            height_variation: 0.05,
            release_lookahead: 120.0,

            monster_chance: 0.4,
            monster_rise: 1.2,
            monster_hover: 1.1,
            boxed_monster_hover: 0.5,
            monster_hover_speed: 2.0,
            monster_damage: 10,
            monster_cooldown: 1.0,

            diamond_chance: 0.5,
            diamond_min: 3,
            diamond_max: 6,
            diamond_spacing: 0.9,
            diamond_y: 1.0,
            diamond_radius: 1.5,

            box_count: 8,
            box_height: 3.0,
            box_size: 1.0,
            box_rebound: 0.5,
            health_potions: 5,
            item_rise: 2.0,
            item_rise_secs: 0.8,
            monster_drop: 1.8,
            item_hover: 1.0,
            item_radius: 1.5,
            potion_heal: 20,

            bullet_min_interval: 5.0,
            bullet_max_interval: 9.0,
            bullet_interval_shrink: 0.7,
            bullet_distance: 50.0,
            bullet_speed: 10.0,
            bullet_speed_gain: 10.0,
            bullet_min_y: -3.0,
            bullet_max_y: 4.5,
            bullet_damage: 10,
            bullet_final_clearance: 10.0,
            shake_secs: 1.0,
            shake_intensity: 2.0,

            pipe_size: [1.0, 4.5, 2.0],
            pipe_stand_secs: 1.0,
            pipe_sink_secs: 1.0,
            advance_delay: 1.0,

            cleanup_distance: 20.0,
        }
    }
}
