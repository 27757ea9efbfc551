//! Level 3: the arena
//!
//! One long platform and a boss fight. A short goomba intro hands over to
//! the boss, which hovers, jumps at the character on a fixed rhythm and
//! throws fireball volleys. The character answers with punches, a fireball
//! of its own and a short-lived shield.

mod tuning;

pub use tuning::ArenaTuning;

use glam::Vec3;

use crate::sim::collision::{self, Aabb, CollisionPolicy, LandingBand, Solid};
use crate::sim::controller::{self, Action, Motion, Speeds};
use crate::sim::cooldown::Cooldown;
use crate::sim::events::{Deferred, GameEvent};
use crate::sim::scene::{Hud, Sprite, SpriteKind};
use crate::sim::spawner;
use crate::sim::state::{
    AssetKind, Assets, Character, Countdown, Entity, HitResult, LevelId, LevelState, Outcome, Vitality, apply_to,
};
use crate::sim::tick::Level;
use crate::sim::timeline::{Ease, Prop, Sample, Target, Tween};

const CHARACTER_HALF: Vec3 = Vec3::new(0.25, 0.5, 0.25);
const BOSS_HALF: Vec3 = Vec3::new(0.75, 2.0, 0.75);
const SHIELD_HALF: Vec3 = Vec3::new(1.0, 1.5, 1.0);
const FIREBALL_HALF: Vec3 = Vec3::splat(0.3);
const GOOMBA_HALF: Vec3 = Vec3::new(0.4, 0.35, 0.4);
/// Punch reach ahead of the character center
const PUNCH_REACH: f32 = 0.9;
const PUNCH_HALF: Vec3 = Vec3::new(0.3, 0.5, 0.6);
const BOSS_HOP: f32 = 2.0;
const KNOCKBACK_SECS: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolidKey {
    Platform,
}

#[derive(Debug, Clone)]
pub struct Boss {
    pub health: u32,
    /// Hover center
    pub base_y: f32,
    /// Clock time the drop-in finished
    pub visible_at: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caster {
    Boss,
    Character,
}

#[derive(Debug, Clone)]
pub struct Fireball {
    pub caster: Caster,
    pub origin: Vec3,
}

pub struct Arena {
    pub state: LevelState,
    pub tuning: ArenaTuning,
    /// Payload is the half extent
    pub platform: Entity<Vec3>,
    pub goombas: Vec<Entity<()>>,
    pub boss: Option<Entity<Boss>>,
    pub fireballs: Vec<Entity<Fireball>>,
    /// Payload counts down the remaining shield time
    pub shield: Option<Entity<Countdown>>,
    pub shield_cooldown: Cooldown,
    pub fire_cooldown: Cooldown,
    /// Consecutive landed punches since the last knock-back
    pub combo: u32,
    jumps: Cooldown,
    contact: Cooldown,
    in_contact: bool,
    punch_landed: bool,
    next_volley: f32,
}

impl Arena {
    pub fn new(seed: u64, assets: Assets, tuning: ArenaTuning) -> Self {
        let top = tuning.platform_top;
        let mut character = Character::new(
            Vec3::new(0.0, top, 0.0),
            Vitality::Health {
                current: tuning.start_health,
                max: tuning.start_health,
            },
        );
        character.half_width = 0.25;
        let mut state = LevelState::new(LevelId::Arena, seed, assets, character);

        let half = Vec3::new(
            tuning.platform_width / 2.0,
            tuning.platform_height / 2.0,
            tuning.platform_depth / 2.0,
        );
        let center = Vec3::new(0.0, top - half.y, tuning.platform_z);
        let body = state.physics.add_static(center, half);
        let platform = Entity::new(state.next_entity_id(), center, half).with_body(body);

        let mut jumps = Cooldown::new(tuning.boss_jump_interval);
        jumps.mark(0.0);

        let mut arena = Self {
            shield_cooldown: Cooldown::new(tuning.shield_cooldown),
            fire_cooldown: Cooldown::new(tuning.fire_cooldown),
            contact: Cooldown::new(tuning.contact_cooldown),
            jumps,
            platform,
            goombas: Vec::new(),
            boss: None,
            fireballs: Vec::new(),
            shield: None,
            combo: 0,
            in_contact: false,
            punch_landed: false,
            next_volley: f32::INFINITY,
            state,
            tuning,
        };
        arena.start_intro();
        log::info!("⚔️ Arena ready (seed {seed})");
        arena
    }

    /// Ring goombas step around three times, merge into the center one and
    /// make way for the boss
    fn start_intro(&mut self) {
        if self.state.assets.has(AssetKind::Goomba) {
            let t = &self.tuning;
            let top = t.platform_top;
            let ring = &t.intro_ring;
            let step = t.intro_step_secs;
            let merge_at = t.intro_steps as f32 * step;
            let center = t.intro_center;
            for (i, &(y, z)) in ring.iter().enumerate() {
                let id = self.state.next_entity_id();
                self.goombas.push(Entity::new(id, Vec3::new(0.0, top + y, z), ()));
                let mut from = (y, z);
                for k in 0..t.intro_steps as usize {
                    let to = ring[(i + k + 1) % ring.len()];
                    let delay = k as f32 * step;
                    self.state.timeline.add(
                        Tween::new(Target::Entity(id), Prop::Y, top + from.0, top + to.0, step)
                            .ease(Ease::Power1InOut)
                            .delay(delay),
                    );
                    self.state.timeline.add(
                        Tween::new(Target::Entity(id), Prop::Z, from.1, to.1, step)
                            .ease(Ease::Power1InOut)
                            .delay(delay),
                    );
                    from = to;
                }
                self.state.timeline.add(
                    Tween::new(Target::Entity(id), Prop::Y, top + from.0, top + center.0, t.intro_merge_secs)
                        .delay(merge_at),
                );
                self.state.timeline.add(
                    Tween::new(Target::Entity(id), Prop::Z, from.1, center.1, t.intro_merge_secs).delay(merge_at),
                );
            }
            let id = self.state.next_entity_id();
            self.goombas
                .push(Entity::new(id, Vec3::new(0.0, top + center.0, center.1), ()));
        } else {
            log::warn!("Goomba asset missing, skipping the arena intro");
        }
        self.state
            .deferred
            .push_after(self.tuning.boss_appears_at, Deferred::BossAppears);
    }

    fn spawn_boss(&mut self) {
        if !self.state.assets.has(AssetKind::Boss) {
            log::warn!("Boss asset missing, the arena stays empty");
            return;
        }
        let t = &self.tuning;
        let start = Vec3::new(0.0, t.platform_top + 0.1, t.boss_z);
        let rest = t.platform_top + t.boss_rest;
        let id = self.state.next_entity_id();
        let mut boss = Entity::new(
            id,
            start,
            Boss {
                health: t.boss_health,
                base_y: rest,
                visible_at: None,
            },
        );
        boss.opacity = 0.0;
        self.state.timeline.add(
            Tween::new(Target::Entity(id), Prop::Opacity, 0.0, 1.0, t.boss_fade_secs).ease(Ease::Power2In),
        );
        self.state.timeline.add(
            Tween::new(Target::Entity(id), Prop::Y, start.y, rest, t.boss_fade_secs)
                .ease(Ease::Power2Out)
                .then(Deferred::BossVisible),
        );
        self.boss = Some(boss);
        log::info!("👹 Boss appears");
    }

    fn boss_is_visible(&self) -> bool {
        self.boss
            .as_ref()
            .is_some_and(|b| b.is_active() && b.data.visible_at.is_some())
    }

    /// Jump at the character, stopping short of a raised shield, then lunge
    /// on along the character's facing
    pub fn boss_jump(&mut self) {
        let Some(boss) = self.boss.as_ref().filter(|b| b.is_active()) else {
            return;
        };
        let t = &self.tuning;
        let (id, from, base_y) = (boss.id, boss.pos.z, boss.data.base_y);
        let ch = &self.state.character;
        let facing = ch.facing.sign();
        let mut target = ch.pos.z;
        if let Some(shield) = &self.shield {
            let dir = if target >= from { 1.0 } else { -1.0 };
            let between = (shield.pos.z - from) * dir > 0.0 && (target - shield.pos.z) * dir > 0.0;
            if between {
                target = shield.pos.z - dir * (SHIELD_HALF.z + BOSS_HALF.z);
            }
        }
        let target = target.clamp(t.boss_min_z, t.boss_max_z);
        let lunge = (target + facing * t.boss_lunge).clamp(t.boss_min_z, t.boss_max_z);
        let (jump_secs, lunge_secs) = (t.boss_jump_secs, t.boss_lunge_secs);

        let timeline = &mut self.state.timeline;
        timeline.cancel_target(Target::Entity(id));
        timeline.add(Tween::new(Target::Entity(id), Prop::Z, from, target, jump_secs));
        timeline.add(
            Tween::new(Target::Entity(id), Prop::Z, target, lunge, lunge_secs)
                .ease(Ease::Power2Out)
                .delay(jump_secs),
        );
        timeline.add(
            Tween::new(Target::Entity(id), Prop::Y, base_y, base_y + BOSS_HOP, jump_secs / 2.0)
                .ease(Ease::Power2Out)
                .yoyo(1),
        );
        if let Some(boss) = &mut self.boss {
            boss.pos.y = base_y;
        }
        log::debug!("Boss jumps {from:.1} -> {target:.1} -> {lunge:.1}");
    }

    fn start_volley(&mut self) {
        self.cast_boss_fireball();
        if self.state.rng.chance(self.tuning.volley_double_chance) {
            self.state
                .deferred
                .push_after(self.tuning.volley_gap, Deferred::BossVolley);
        }
        self.next_volley = self.state.clock + self.tuning.volley_interval;
    }

    fn cast_boss_fireball(&mut self) {
        let Some(boss) = self.boss.as_ref().filter(|b| b.is_active()) else {
            return;
        };
        let ch = &self.state.character;
        let origin = boss.pos + Vec3::new(0.0, 2.0, 0.0);
        let aim = ch.pos + Vec3::new(0.0, ch.height / 2.0, 0.0);
        let velocity = (aim - origin).normalize_or_zero() * self.tuning.fireball_speed;
        self.spawn_fireball(origin, velocity, Caster::Boss);
        self.state.emit(GameEvent::EnemyFired);
    }

    pub fn spawn_fireball(&mut self, origin: Vec3, velocity: Vec3, caster: Caster) {
        let id = self.state.next_entity_id();
        let body = self.state.physics.add_kinematic(origin, FIREBALL_HALF);
        self.state.physics.set_velocity(body, velocity);
        self.fireballs
            .push(Entity::new(id, origin, Fireball { caster, origin }).with_body(body));
    }

    fn cast_fireball(&mut self) {
        let clock = self.state.clock;
        let ch = &self.state.character;
        if ch.status.punching || ch.status.jumping {
            return;
        }
        let Some(boss) = self.boss.as_ref().filter(|b| b.is_active()) else {
            return;
        };
        if !self.fire_cooldown.try_fire(clock) {
            log::debug!("Fireball cooling down, {:.1}s left", self.fire_cooldown.remaining(clock));
            return;
        }
        let origin = ch.pos + Vec3::new(0.0, 2.5, ch.facing.sign());
        let aim = boss.pos + Vec3::new(0.0, 2.5, 0.0);
        let velocity = (aim - origin).normalize_or_zero() * self.tuning.fireball_speed;
        self.spawn_fireball(origin, velocity, Caster::Character);
        self.state.emit(GameEvent::FireballCast);
    }

    fn raise_shield(&mut self) {
        let clock = self.state.clock;
        if !self.shield_cooldown.try_fire(clock) {
            log::debug!("Shield cooling down, {:.1}s left", self.shield_cooldown.remaining(clock));
            return;
        }
        let ch = &self.state.character;
        let pos = Vec3::new(
            0.0,
            ch.pos.y + SHIELD_HALF.y,
            ch.pos.z + ch.facing.sign() * self.tuning.shield_ahead,
        );
        let mut timer = Countdown::default();
        timer.start(self.tuning.shield_secs);
        let id = self.state.next_entity_id();
        self.shield = Some(Entity::new(id, pos, timer));
        self.state.emit(GameEvent::ShieldRaised);
    }

    fn punch(&mut self) {
        if controller::try_attack(&mut self.state) {
            self.punch_landed = false;
            self.state.emit(GameEvent::Punched);
        }
    }

    fn reach_box(&self) -> Aabb {
        let ch = &self.state.character;
        let center = ch.pos + Vec3::new(0.0, ch.height / 2.0, ch.facing.sign() * PUNCH_REACH);
        Aabb::new(center, PUNCH_HALF)
    }

    /// Returns true when the hit defeated the boss
    fn damage_boss(&mut self, amount: u32) -> bool {
        let Some(boss) = self.boss.as_mut().filter(|b| b.is_active()) else {
            return false;
        };
        boss.data.health = boss.data.health.saturating_sub(amount);
        let remaining = boss.data.health;
        if remaining == 0 {
            boss.defeat();
        }
        self.state.emit(GameEvent::BossHit { remaining });
        log::debug!("Boss hit for {amount}, {remaining} left");
        if remaining == 0 {
            log::info!("🏆 Boss defeated");
            self.state.end(Outcome::Victory);
            return true;
        }
        false
    }

    fn land_punch(&mut self, boss_z: f32) {
        self.punch_landed = true;
        self.combo += 1;
        if self.damage_boss(self.tuning.punch_damage) {
            return;
        }
        let t = &self.tuning;
        let facing = self.state.character.facing.sign();
        let to = (boss_z + facing * t.punch_push).clamp(t.boss_min_z, t.boss_max_z);
        let push_secs = t.punch_push_secs;
        let knock = t.combo_knockback;
        let combo_done = self.combo >= t.combo_length;
        if let Some(boss) = &self.boss {
            let target = Target::Entity(boss.id);
            self.state.timeline.cancel_prop(target, Prop::Z);
            self.state
                .timeline
                .add(Tween::new(target, Prop::Z, boss_z, to, push_secs).ease(Ease::Power2Out));
        }
        if combo_done {
            let z = self.state.character.pos.z;
            let timeline = &mut self.state.timeline;
            timeline.cancel_prop(Target::Character, Prop::Z);
            timeline.add(
                Tween::new(Target::Character, Prop::Z, z, z - facing * knock, KNOCKBACK_SECS)
                    .ease(Ease::Power2Out)
                    .then(Deferred::ComboReset),
            );
        }
    }

    /// Shield blocks every boss fireball it touches; at most one fireball
    /// lands on each side per frame
    fn resolve_fireballs(&mut self, probe: &Aabb) {
        if let Some(guard) = self.shield.as_ref().map(|s| Aabb::new(s.pos, SHIELD_HALF)) {
            for f in self.fireballs.iter_mut().filter(|f| f.is_active() && f.data.caster == Caster::Boss) {
                if guard.overlaps(&Aabb::new(f.pos, FIREBALL_HALF)) {
                    f.consume();
                }
            }
        }

        let from = |caster: Caster| {
            move |f: &Entity<Fireball>| (f.data.caster == caster).then(|| Aabb::new(f.pos, FIREBALL_HALF))
        };
        if let Some(i) = collision::first_hit_by(probe, &self.fireballs, from(Caster::Boss)) {
            self.fireballs[i].consume();
            if self.state.hurt(self.tuning.fireball_damage) == HitResult::Fatal {
                return;
            }
        }

        let boss_box = self
            .boss
            .as_ref()
            .filter(|b| b.is_active())
            .map(|b| Aabb::from_base(b.pos, BOSS_HALF));
        let Some(boss_box) = boss_box else {
            return;
        };
        if let Some(i) = collision::first_hit_by(&boss_box, &self.fireballs, from(Caster::Character)) {
            self.fireballs[i].consume();
            self.damage_boss(self.tuning.fire_damage);
        }
    }
}

impl Level for Arena {
    type Key = SolidKey;

    fn state(&self) -> &LevelState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut LevelState {
        &mut self.state
    }

    fn motion(&self) -> Motion {
        Motion {
            gravity: self.tuning.gravity,
            jump_velocity: self.tuning.jump_velocity,
            ground_y: self.tuning.ground_y,
            backtrack: None,
            min_z: None,
            fall_y: Some(self.tuning.fall_y),
            band: LandingBand {
                below: 0.5,
                above: 1.0,
            },
        }
    }

    fn speeds(&self) -> Speeds {
        Speeds {
            run: self.tuning.run_speed,
            back: self.tuning.back_speed,
        }
    }

    fn on_press(&mut self, action: Action) {
        match action {
            Action::Jump => {
                let motion = self.motion();
                controller::try_jump(&mut self.state, &motion);
            }
            Action::Guard => self.raise_shield(),
            Action::Attack => self.punch(),
            Action::Fire => self.cast_fireball(),
            _ => {}
        }
    }

    fn apply_sample(&mut self, sample: &Sample) {
        let Target::Entity(id) = sample.target else {
            return;
        };
        if apply_to(&mut self.goombas, id, sample.prop, sample.value) {
            return;
        }
        if let Some(boss) = self.boss.as_mut().filter(|b| b.id == id) {
            boss.apply(sample.prop, sample.value);
        }
    }

    fn handle_deferred(&mut self, event: Deferred) {
        match event {
            Deferred::BossAppears => {
                for g in &mut self.goombas {
                    g.consume();
                }
                self.spawn_boss();
            }
            Deferred::BossVisible => {
                let clock = self.state.clock;
                if let Some(boss) = &mut self.boss {
                    boss.data.visible_at = Some(clock);
                    boss.data.base_y = boss.pos.y;
                    self.next_volley = clock + self.tuning.volley_delay;
                }
            }
            Deferred::BossVolley => self.cast_boss_fireball(),
            Deferred::ComboReset => self.combo = 0,
            _ => {}
        }
    }

    fn update_entities(&mut self, dt: f32) {
        let clock = self.state.clock;
        if self.shield.as_mut().is_some_and(|s| s.data.tick(dt)) {
            self.shield = None;
        }

        if let Some(boss) = self.boss.as_mut().filter(|b| b.is_active()) {
            let animating = self.state.timeline.is_animating(Target::Entity(boss.id));
            if boss.data.visible_at.is_some() && !animating {
                boss.pos.y = boss.data.base_y + clock.sin() * self.tuning.boss_hover;
            }
        }
        if self.boss_is_visible() {
            if self.jumps.try_fire(clock) {
                self.boss_jump();
            }
            if clock >= self.next_volley {
                self.start_volley();
            }
        }

        let physics = &self.state.physics;
        let range = self.tuning.fireball_range;
        for f in self.fireballs.iter_mut().filter(|f| f.is_active()) {
            if let Some(pos) = f.body.and_then(|h| physics.position(h)) {
                f.pos = pos;
            }
            if f.pos.distance(f.data.origin) > range {
                f.consume();
            }
        }
    }

    fn spawn(&mut self) {}

    fn solids(&self) -> Vec<Solid<SolidKey>> {
        let policy = CollisionPolicy::solid(self.platform.data, true, false, None);
        Solid::from_policy(SolidKey::Platform, self.platform.pos, &policy)
            .into_iter()
            .collect()
    }

    fn resolve_contacts(&mut self) {
        let clock = self.state.clock;
        let probe = self.state.character.hit_box(CHARACTER_HALF);
        self.resolve_fireballs(&probe);
        if self.state.is_terminal() {
            return;
        }
        let Some((id, pos)) = self.boss.as_ref().filter(|b| b.is_active()).map(|b| (b.id, b.pos)) else {
            return;
        };
        let boss_box = Aabb::from_base(pos, BOSS_HALF);

        if let Some(shield) = &self.shield {
            let guard = Aabb::new(shield.pos, SHIELD_HALF);
            if boss_box.overlaps(&guard) {
                let side = if pos.z >= shield.pos.z { 1.0 } else { -1.0 };
                let z = shield.pos.z + side * (SHIELD_HALF.z + BOSS_HALF.z);
                self.state.timeline.cancel_prop(Target::Entity(id), Prop::Z);
                if let Some(boss) = &mut self.boss {
                    boss.pos.z = z;
                }
                self.in_contact = false;
                return;
            }
        }

        let punching = self.state.character.status.punching;
        if punching && !self.punch_landed && self.reach_box().overlaps(&boss_box) {
            self.land_punch(pos.z);
            if self.state.is_terminal() {
                return;
            }
        }

        if !probe.overlaps(&boss_box) {
            self.in_contact = false;
            return;
        }
        if self.in_contact || punching || !self.contact.ready(clock) {
            return;
        }
        self.contact.mark(clock);
        self.in_contact = true;
        if self.state.hurt(self.tuning.contact_damage) == HitResult::Fatal {
            return;
        }
        let z = self.state.character.pos.z;
        let away = if pos.z >= z { -1.0 } else { 1.0 };
        let timeline = &mut self.state.timeline;
        timeline.cancel_prop(Target::Character, Prop::Z);
        timeline.add(
            Tween::new(
                Target::Character,
                Prop::Z,
                z,
                z + away * self.tuning.contact_push,
                self.tuning.contact_push_secs,
            )
            .ease(Ease::Power2Out),
        );
    }

    fn check_goal(&mut self) {}

    fn cleanup(&mut self) {
        let state = &mut self.state;
        let (physics, timeline) = (&mut state.physics, &mut state.timeline);
        spawner::despawn(&mut self.goombas, f32::NEG_INFINITY, 0.0, physics, timeline);
        spawner::despawn(&mut self.fireballs, f32::NEG_INFINITY, 0.0, physics, timeline);
    }

    fn scene(&self, out: &mut Vec<Sprite>) {
        out.push(Sprite::centered(SpriteKind::Platform, &self.platform, self.platform.data));
        for g in self.goombas.iter().filter(|g| g.is_active()) {
            out.push(Sprite::standing(SpriteKind::Goomba, g, GOOMBA_HALF));
        }
        if let Some(boss) = self.boss.as_ref().filter(|b| b.is_active()) {
            out.push(Sprite::standing(SpriteKind::Boss, boss, BOSS_HALF));
        }
        for f in self.fireballs.iter().filter(|f| f.is_active()) {
            out.push(Sprite::centered(SpriteKind::Fireball, f, FIREBALL_HALF));
        }
        if let Some(shield) = &self.shield {
            out.push(Sprite::centered(SpriteKind::Shield, shield, SHIELD_HALF));
        }
        let ch = &self.state.character;
        let mut hero = Sprite::new(
            SpriteKind::Character,
            ch.pos + Vec3::new(0.0, ch.height / 2.0, 0.0),
            Vec3::new(0.25, ch.height / 2.0, 0.25),
        );
        hero.opacity = ch.opacity;
        out.push(hero);
    }

    fn hud(&self) -> Hud {
        let clock = self.state.clock;
        let mut hud = Hud::new(LevelId::Arena, self.state.phase).with_outcome(self.state.outcome);
        hud.health_percent = Some(self.state.character.vitality.percent());
        hud.boss_health = self.boss.as_ref().map(|b| b.data.health);
        hud.shield_ready = Some(self.shield_cooldown.ready(clock));
        hud.fireball_ready = Some(self.fire_cooldown.ready(clock));
        hud
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::sim::controller::TickInput;
    use crate::sim::state::GamePhase;
    use crate::sim::tick::tick;

    fn level(seed: u64) -> Arena {
        Arena::new(seed, Assets::all(), ArenaTuning::default())
    }

    fn idle(lvl: &mut Arena, frames: usize) {
        let input = TickInput::default();
        for _ in 0..frames {
            tick(lvl, &input, SIM_DT);
        }
    }

    fn press(lvl: &mut Arena, action: Action) {
        let mut input = TickInput::default();
        input.press(action);
        tick(lvl, &input, SIM_DT);
    }

    /// Run the intro until the boss has dropped in
    fn with_boss(seed: u64) -> Arena {
        let mut lvl = level(seed);
        idle(&mut lvl, 300);
        assert!(lvl.boss_is_visible());
        lvl
    }

    fn boss(lvl: &Arena) -> &Entity<Boss> {
        lvl.boss.as_ref().expect("boss spawned")
    }

    /// Put the character just within punch reach of the boss
    fn face_boss(lvl: &mut Arena) {
        let z = boss(lvl).pos.z;
        lvl.state.character.pos.z = z - 1.5;
    }

    #[test]
    fn test_intro_hands_over_to_boss() {
        let mut lvl = level(1);
        assert_eq!(lvl.goombas.len(), 7);
        idle(&mut lvl, 60);
        assert!(lvl.boss.is_none());
        idle(&mut lvl, 180);
        assert!(lvl.goombas.is_empty());
        assert!(lvl.boss.is_some());
        idle(&mut lvl, 60);
        assert!(lvl.boss_is_visible());
        assert!((boss(&lvl).opacity - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_missing_boss_asset_never_spawns_boss() {
        let mut lvl = Arena::new(2, Assets::all().without(AssetKind::Boss), ArenaTuning::default());
        idle(&mut lvl, 600);
        assert!(lvl.boss.is_none());
        assert!(lvl.fireballs.is_empty());
        assert_eq!(lvl.state.phase, GamePhase::Playing);
    }

    #[test]
    fn test_punch_hits_once() {
        let mut lvl = with_boss(3);
        face_boss(&mut lvl);
        press(&mut lvl, Action::Attack);
        assert_eq!(boss(&lvl).data.health, 95);
        idle(&mut lvl, 130);
        assert_eq!(boss(&lvl).data.health, 95);
        assert!(!lvl.state.character.status.punching);
        assert!(boss(&lvl).pos.z > 22.0);
    }

    #[test]
    fn test_third_punch_knocks_back() {
        let mut lvl = with_boss(4);
        face_boss(&mut lvl);
        lvl.combo = 2;
        let start = lvl.state.character.pos.z;
        press(&mut lvl, Action::Attack);
        idle(&mut lvl, 130);
        assert!(lvl.state.character.pos.z < start - 4.5);
        assert_eq!(lvl.combo, 0);
    }

    #[test]
    fn test_last_punch_wins() {
        let mut lvl = with_boss(5);
        face_boss(&mut lvl);
        if let Some(boss) = &mut lvl.boss {
            boss.data.health = 5;
        }
        press(&mut lvl, Action::Attack);
        assert_eq!(lvl.state.outcome, Some(Outcome::Victory));
        assert_eq!(lvl.hud().boss_health, Some(0));
    }

    #[test]
    fn test_fireball_cooldown_and_damage() {
        let mut lvl = with_boss(6);
        press(&mut lvl, Action::Fire);
        press(&mut lvl, Action::Fire);
        assert_eq!(lvl.fireballs.len(), 1);
        assert_eq!(lvl.hud().fireball_ready, Some(false));
        idle(&mut lvl, 120);
        assert_eq!(boss(&lvl).data.health, 90);
        assert!(lvl.fireballs.is_empty());
    }

    #[test]
    fn test_boss_contact_is_edge_triggered() {
        let mut lvl = with_boss(7);
        let z = boss(&lvl).pos.z;
        lvl.state.character.pos.z = z - 0.5;
        lvl.resolve_contacts();
        lvl.resolve_contacts();
        assert_eq!(lvl.state.character.vitality.current(), 90);

        lvl.state.character.pos.z = z - 10.0;
        lvl.resolve_contacts();
        lvl.state.character.pos.z = z - 0.5;
        lvl.resolve_contacts();
        // Still inside the contact cooldown
        assert_eq!(lvl.state.character.vitality.current(), 90);

        lvl.state.character.pos.z = z - 10.0;
        lvl.resolve_contacts();
        lvl.state.clock += 0.6;
        lvl.state.character.pos.z = z - 0.5;
        lvl.resolve_contacts();
        assert_eq!(lvl.state.character.vitality.current(), 80);
    }

    #[test]
    fn test_shield_blocks_boss_fireball() {
        let mut lvl = with_boss(8);
        press(&mut lvl, Action::Guard);
        assert!(lvl.shield.is_some());
        let top = lvl.tuning.platform_top;
        lvl.spawn_fireball(Vec3::new(0.0, top + 0.5, 10.0), Vec3::new(0.0, 0.0, -30.0), Caster::Boss);
        idle(&mut lvl, 60);
        assert_eq!(lvl.state.character.vitality.current(), 100);
        assert!(lvl.fireballs.is_empty());
        // Shield lapses after its second
        idle(&mut lvl, 70);
        assert!(lvl.shield.is_none());
    }

    #[test]
    fn test_unblocked_boss_fireball_hurts() {
        let mut lvl = with_boss(9);
        let top = lvl.tuning.platform_top;
        lvl.spawn_fireball(Vec3::new(0.0, top + 0.5, 6.0), Vec3::new(0.0, 0.0, -30.0), Caster::Boss);
        idle(&mut lvl, 60);
        assert_eq!(lvl.state.character.vitality.current(), 95);
    }

    #[test]
    fn test_one_boss_fireball_lands_per_frame() {
        let mut lvl = with_boss(13);
        let center = lvl.state.character.pos + Vec3::new(0.0, 0.5, 0.0);
        lvl.spawn_fireball(center, Vec3::ZERO, Caster::Boss);
        lvl.spawn_fireball(center, Vec3::ZERO, Caster::Boss);
        lvl.resolve_contacts();
        assert_eq!(lvl.state.character.vitality.current(), 95);
        assert_eq!(lvl.fireballs.iter().filter(|f| f.is_active()).count(), 1);
    }

    #[test]
    fn test_one_player_fireball_lands_per_frame() {
        let mut lvl = with_boss(14);
        let center = boss(&lvl).pos + Vec3::new(0.0, 1.0, 0.0);
        let health = boss(&lvl).data.health;
        lvl.spawn_fireball(center, Vec3::ZERO, Caster::Character);
        lvl.spawn_fireball(center, Vec3::ZERO, Caster::Character);
        lvl.resolve_contacts();
        assert_eq!(boss(&lvl).data.health, health - lvl.tuning.fire_damage);
    }

    #[test]
    fn test_boss_jump_stops_at_shield() {
        let mut lvl = with_boss(10);
        press(&mut lvl, Action::Guard);
        lvl.boss_jump();
        let mut closest = f32::MAX;
        for _ in 0..110 {
            idle(&mut lvl, 1);
            closest = closest.min(boss(&lvl).pos.z);
        }
        assert!(closest >= 4.75 - 1e-2);
        assert_eq!(lvl.state.character.vitality.current(), 100);
    }

    #[test]
    fn test_boss_lunge_is_clamped() {
        let mut lvl = with_boss(11);
        lvl.state.character.pos.z = 78.0;
        lvl.boss_jump();
        idle(&mut lvl, 200);
        let z = boss(&lvl).pos.z;
        assert!(z <= 80.0 + 1e-3 && z > 79.0, "boss at {z}");
    }

    #[test]
    fn test_volleys_start_after_delay() {
        let mut lvl = with_boss(12);
        idle(&mut lvl, 360);
        assert!(lvl.fireballs.is_empty());
        idle(&mut lvl, 180);
        let fired = lvl
            .state
            .take_events()
            .into_iter()
            .any(|e| e == GameEvent::EnemyFired);
        assert!(fired);
    }

    #[test]
    fn test_same_seed_same_fight() {
        let script = |lvl: &mut Arena| {
            idle(lvl, 300);
            press(lvl, Action::Fire);
            for i in 0..900 {
                let mut input = TickInput::default();
                if i % 200 == 0 {
                    input.press(Action::Forward);
                }
                if i % 200 == 100 {
                    input.release(Action::Forward);
                    input.press(Action::Attack);
                }
                tick(lvl, &input, SIM_DT);
            }
        };
        let mut a = level(99);
        let mut b = level(99);
        script(&mut a);
        script(&mut b);
        assert_eq!(a.state.character.pos, b.state.character.pos);
        assert_eq!(a.state.character.vitality, b.state.character.vitality);
        assert_eq!(a.hud(), b.hud());
        assert_eq!(a.fireballs.len(), b.fireballs.len());
    }
}
