//! Arena balance table

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaTuning {
    // === Character ===
    pub start_health: u32,
    pub gravity: f32,
    pub jump_velocity: f32,
    pub run_speed: f32,
    pub back_speed: f32,
    pub ground_y: f32,
    pub fall_y: f32,

    // === Platform ===
    pub platform_top: f32,
    pub platform_z: f32,
    pub platform_depth: f32,
    pub platform_width: f32,
    pub platform_height: f32,

    // === Intro ===
    /// Ring goombas as (height above the platform, z)
    pub intro_ring: Vec<(f32, f32)>,
    pub intro_center: (f32, f32),
    pub intro_step_secs: f32,
    pub intro_steps: u32,
    pub intro_merge_secs: f32,
    pub boss_appears_at: f32,

    // === Boss ===
    pub boss_health: u32,
    pub boss_z: f32,
    pub boss_fade_secs: f32,
    /// Rest height relative to the platform top
    pub boss_rest: f32,
    pub boss_hover: f32,
    pub boss_jump_interval: f32,
    pub boss_jump_secs: f32,
    pub boss_lunge: f32,
    pub boss_lunge_secs: f32,
    pub boss_min_z: f32,
    pub boss_max_z: f32,
    pub contact_damage: u32,
    pub contact_cooldown: f32,
    pub contact_push: f32,
    pub contact_push_secs: f32,

    // === Boss fireballs ===
    pub volley_delay: f32,
    pub volley_interval: f32,
    pub volley_gap: f32,
    pub volley_double_chance: f32,
    pub fireball_speed: f32,
    pub fireball_damage: u32,
    pub fireball_range: f32,

    // === Abilities ===
    pub shield_cooldown: f32,
    pub shield_secs: f32,
    pub shield_ahead: f32,
    pub fire_cooldown: f32,
    pub fire_damage: u32,
    pub punch_damage: u32,
    pub punch_push: f32,
    pub punch_push_secs: f32,
    pub combo_length: u32,
    pub combo_knockback: f32,
}

impl Default for ArenaTuning {
    fn default() -> Self {
        Self {
            start_health: 100,
            gravity: 25.82,
            jump_velocity: 15.0,
            run_speed: 7.0,
            back_speed: 5.0,
            ground_y: -10.0,
            fall_y: -5.0,

            platform_top: -2.8,
            platform_z: 30.0,
            platform_depth: 1000.0,
            platform_width: 4.0,
            platform_height: 0.4,

            intro_ring: vec![(0.1, 18.0), (2.5, 21.0), (4.5, 21.0), (6.5, 18.0), (4.5, 15.0), (2.5, 15.0)],
            intro_center: (3.3, 18.0),
            intro_step_secs: 0.5,
            intro_steps: 3,
            intro_merge_secs: 0.25,
            boss_appears_at: 1.8,

            boss_health: 100,
            boss_z: 18.0,
            boss_fade_secs: 0.5,
            boss_rest: -0.5,
            boss_hover: 0.5,
            boss_jump_interval: 8.0,
            boss_jump_secs: 1.0,
            boss_lunge: 15.0,
            boss_lunge_secs: 0.5,
            boss_min_z: -20.0,
            boss_max_z: 80.0,
            contact_damage: 10,
            contact_cooldown: 0.5,
            contact_push: 2.0,
            contact_push_secs: 0.3,

            volley_delay: 4.0,
            volley_interval: 3.0,
            volley_gap: 0.2,
            volley_double_chance: 0.5,
            fireball_speed: 30.0,
            fireball_damage: 5,
            fireball_range: 50.0,

            shield_cooldown: 6.0,
            shield_secs: 1.0,
            shield_ahead: 3.0,
            fire_cooldown: 6.0,
            fire_damage: 10,
            punch_damage: 5,
            punch_push: 5.0,
            punch_push_secs: 0.5,
            combo_length: 3,
            combo_knockback: 5.0,
        }
    }
}
