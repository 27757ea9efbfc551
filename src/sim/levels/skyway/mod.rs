//! Level 2: the skyway
//!
//! Health and diamonds. The character hops between floating platforms while
//! monsters hover above them and bullet waves come in from ahead. Standing on
//! the exit pipe with the potion advances to the arena; without it the run
//! is lost.

mod layout;
mod tuning;

pub use layout::{BoxContents, Layout, Placement, generate};
pub use tuning::{PlatformType, SkywayTuning};

use glam::Vec3;

use crate::sim::collision::{self, Aabb, CollisionPolicy, HeadResponse, LandingBand, Solid, SolidResolution};
use crate::sim::controller::{self, Action, Motion, Speeds};
use crate::sim::cooldown::Cooldown;
use crate::sim::events::{Deferred, GameEvent, ItemKind};
use crate::sim::scene::{Hud, Sprite, SpriteKind};
use crate::sim::spawner::{self, Staged};
use crate::sim::state::{
    AssetKind, Assets, Character, Entity, EntityId, LevelId, LevelState, LossReason, Outcome, Vitality,
    apply_to, find_mut,
};
use crate::sim::tick::Level;
use crate::sim::timeline::{Ease, Prop, Sample, Target, Tween};

const MONSTER_HALF: Vec3 = Vec3::splat(0.5);
const BULLET_HALF: Vec3 = Vec3::new(0.3, 0.15, 0.3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolidKey {
    Platform(EntityId),
    GiftBox(EntityId),
    Pipe(EntityId),
}

#[derive(Debug, Clone)]
pub struct Platform {
    pub half: Vec3,
}

#[derive(Debug, Clone)]
pub struct Monster {
    pub base_y: f32,
    pub phase: f32,
    pub amplitude: f32,
    /// Still dropping out of a gift box
    pub emerging: bool,
    pub hits: Cooldown,
}

#[derive(Debug, Clone)]
pub struct GiftBox {
    pub contents: BoxContents,
    pub opened: bool,
}

#[derive(Debug, Clone)]
pub struct Item {
    pub kind: ItemKind,
}

#[derive(Debug, Clone)]
pub struct ExitPipe {
    pub half: Vec3,
}

pub struct Skyway {
    pub state: LevelState,
    pub tuning: SkywayTuning,
    pub final_z: f32,
    staged: Staged<(Vec3, Placement)>,

    pub platforms: Vec<Entity<Platform>>,
    pub monsters: Vec<Entity<Monster>>,
    pub diamonds: Vec<Entity<()>>,
    pub boxes: Vec<Entity<GiftBox>>,
    pub items: Vec<Entity<Item>>,
    pub bullets: Vec<Entity<()>>,
    pub pipes: Vec<Entity<ExitPipe>>,

    pub has_treasure: bool,
    pub has_potion: bool,
    next_wave: f32,
    /// Pipe currently stood on and for how long
    on_pipe: Option<(EntityId, f32)>,
    entering: bool,
}

impl Skyway {
    pub fn new(seed: u64, assets: Assets, tuning: SkywayTuning) -> Self {
        let mut rng = crate::sim::state::RngState::new(seed);
        let layout = layout::generate(&tuning, &mut rng);

        let mut character = Character::new(
            layout.start,
            Vitality::Health {
                current: tuning.start_health,
                max: tuning.start_health,
            },
        );
        character.half_width = 0.25;
        let mut state = LevelState::new(LevelId::Skyway, seed, assets, character);
        state.rng = rng;

        log::info!("🌤️ Skyway ready (seed {seed})");
        Self {
            final_z: layout.final_z,
            staged: Staged::new(layout.placements.into_iter().map(|(pos, p)| (pos.z, (pos, p))).collect()),
            platforms: Vec::new(),
            monsters: Vec::new(),
            diamonds: Vec::new(),
            boxes: Vec::new(),
            items: Vec::new(),
            bullets: Vec::new(),
            pipes: Vec::new(),
            has_treasure: false,
            has_potion: false,
            next_wave: 0.0,
            on_pipe: None,
            entering: false,
            state,
            tuning,
        }
    }

    /// Share of the course covered, 0..=1
    pub fn progress(&self) -> f32 {
        if self.final_z <= 0.0 {
            return 1.0;
        }
        (self.state.character.pos.z / self.final_z).clamp(0.0, 1.0)
    }

    fn character_box(&self) -> Aabb {
        self.state.character.hit_box(Vec3::new(0.25, 0.5, 0.25))
    }

    fn add_monster(&mut self, pos: Vec3, amplitude: f32, emerging: bool) -> EntityId {
        let id = self.state.next_entity_id();
        let phase = self.state.rng.range(0.0, std::f32::consts::TAU);
        self.monsters.push(Entity::new(
            id,
            pos,
            Monster {
                base_y: pos.y,
                phase,
                amplitude,
                emerging,
                hits: Cooldown::new(self.tuning.monster_cooldown),
            },
        ));
        id
    }

    fn place(&mut self, pos: Vec3, placement: Placement) {
        let assets = &self.state.assets;
        match placement {
            Placement::Platform { half } => {
                let id = self.state.next_entity_id();
                let body = self.state.physics.add_static(pos, half);
                self.platforms
                    .push(Entity::new(id, pos, Platform { half }).with_body(body));
            }
            Placement::Monster => {
                if assets.has(AssetKind::Monster) {
                    let amplitude = self.tuning.monster_hover;
                    self.add_monster(pos, amplitude, false);
                }
            }
            Placement::Diamond => {
                if assets.has(AssetKind::Item) {
                    let id = self.state.next_entity_id();
                    self.diamonds.push(Entity::new(id, pos, ()));
                }
            }
            Placement::GiftBox(contents) => {
                if assets.has(AssetKind::Item) {
                    let id = self.state.next_entity_id();
                    let half = Vec3::splat(self.tuning.box_size / 2.0);
                    let body = self.state.physics.add_static(pos, half);
                    self.boxes.push(
                        Entity::new(
                            id,
                            pos,
                            GiftBox {
                                contents,
                                opened: false,
                            },
                        )
                        .with_body(body),
                    );
                }
            }
            Placement::Pipe { half } => {
                let id = self.state.next_entity_id();
                let body = self.state.physics.add_static(pos, half);
                self.pipes.push(Entity::new(id, pos, ExitPipe { half }).with_body(body));
            }
        }
    }

    fn open_box(&mut self, id: EntityId) {
        let half = self.tuning.box_size / 2.0;
        let Some(gift) = find_mut(&mut self.boxes, id) else {
            return;
        };
        if gift.data.opened {
            return;
        }
        gift.data.opened = true;
        let pos = gift.pos;
        let contents = gift.data.contents;
        log::debug!("Gift box {id} opened: {contents:?}");
        self.state.emit(GameEvent::ContainerOpened);
        self.state.timeline.add(
            Tween::new(Target::Entity(id), Prop::Y, pos.y, pos.y + 0.3, 0.1).yoyo(1),
        );

        let t = &self.tuning;
        match contents {
            BoxContents::Monster => {
                if !self.state.assets.has(AssetKind::Monster) {
                    return;
                }
                let start = Vec3::new(0.0, pos.y - half, pos.z);
                let (fall, secs, amplitude) = (t.monster_drop, t.item_rise_secs, t.boxed_monster_hover);
                let monster = self.add_monster(start, amplitude, true);
                self.state.timeline.add(
                    Tween::new(Target::Entity(monster), Prop::Y, start.y, start.y - fall, secs)
                        .ease(Ease::Power2Out)
                        .then(Deferred::ItemRisen(monster)),
                );
            }
            BoxContents::Item(kind) => {
                let start = Vec3::new(0.0, pos.y + half, pos.z);
                let (rise, secs) = (t.item_rise, t.item_rise_secs);
                let item = self.state.next_entity_id();
                self.items.push(Entity::new(item, start, Item { kind }));
                self.state.timeline.add(
                    Tween::new(Target::Entity(item), Prop::Y, start.y, start.y + rise, secs)
                        .ease(Ease::ElasticOut)
                        .then(Deferred::ItemRisen(item)),
                );
            }
        }
    }

    fn collect_item(&mut self, kind: ItemKind) {
        match kind {
            ItemKind::HealthPotion => {
                if self.state.character.vitality.restore(self.tuning.potion_heal) {
                    log::debug!("Health restored to {}", self.state.character.vitality.current());
                }
            }
            ItemKind::Treasure => self.has_treasure = true,
            ItemKind::Potion => self.has_potion = true,
            _ => {}
        }
        self.state.emit(GameEvent::ItemCollected(kind));
    }

    fn spawn_bullet_wave(&mut self) {
        let progress = self.progress();
        let t = &self.tuning;
        let most = (1.0 + progress * 2.0).floor() as u32;
        let count = self.state.rng.int(1, most.max(1));
        let speed = t.bullet_speed + progress * t.bullet_speed_gain;
        let z = self.state.character.pos.z + t.bullet_distance;
        let (min_y, max_y) = (t.bullet_min_y, t.bullet_max_y);
        for _ in 0..count {
            let y = self.state.rng.range(min_y, max_y);
            let id = self.state.next_entity_id();
            let pos = Vec3::new(0.0, y, z);
            let body = self.state.physics.add_kinematic(pos, BULLET_HALF);
            self.state.physics.set_velocity(body, Vec3::new(0.0, 0.0, -speed));
            self.bullets.push(Entity::new(id, pos, ()).with_body(body));
        }
        log::debug!("Bullet wave of {count} at speed {speed:.1}");

        let shrink = 1.0 - progress * self.tuning.bullet_interval_shrink;
        let lo = self.tuning.bullet_min_interval * shrink;
        let hi = self.tuning.bullet_max_interval * shrink;
        self.next_wave = self.state.clock + self.state.rng.range(lo, hi);
    }

    /// Stand on the exit pipe long enough and either sink in or lose
    fn stand_on_pipe(&mut self, id: EntityId, dt: f32) {
        let elapsed = match self.on_pipe {
            Some((current, secs)) if current == id => secs + dt,
            _ => dt,
        };
        self.on_pipe = Some((id, elapsed));
        if elapsed < self.tuning.pipe_stand_secs {
            return;
        }
        if !self.has_potion {
            log::info!("Reached the exit pipe without the potion");
            self.state.end(Outcome::GameOver(LossReason::MissingPotion));
            return;
        }
        let Some(pipe) = self.pipes.iter().find(|p| p.id == id) else {
            return;
        };
        let target = pipe.pos.y - 0.25 - self.state.character.height / 2.0;
        self.entering = true;
        let ch = &mut self.state.character;
        ch.status.scripted = true;
        ch.vy = 0.0;
        let from = ch.pos.y;
        self.state.controls.release_all();
        self.state.emit(GameEvent::PipeEntered);
        self.state.timeline.add(
            Tween::new(Target::Character, Prop::Y, from, target, self.tuning.pipe_sink_secs)
                .ease(Ease::Power2In)
                .then(Deferred::PipeEntered),
        );
    }
}

impl Level for Skyway {
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
            min_z: Some(0.0),
            fall_y: Some(self.tuning.fall_y),
            band: LandingBand {
                below: self.tuning.land_below,
                above: self.tuning.land_above,
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
        if self.entering {
            return;
        }
        if matches!(action, Action::Jump | Action::Guard) {
            let motion = self.motion();
            controller::try_jump(&mut self.state, &motion);
        }
    }

    fn apply_sample(&mut self, sample: &Sample) {
        let Target::Entity(id) = sample.target else {
            return;
        };
        let (p, v) = (sample.prop, sample.value);
        let _ = apply_to(&mut self.items, id, p, v)
            || apply_to(&mut self.monsters, id, p, v)
            || apply_to(&mut self.boxes, id, p, v);
    }

    fn handle_deferred(&mut self, event: Deferred) {
        match event {
            Deferred::ItemRisen(id) => {
                if let Some(monster) = find_mut(&mut self.monsters, id) {
                    monster.data.emerging = false;
                    monster.data.base_y = monster.pos.y;
                } else if let Some(item) = find_mut(&mut self.items, id) {
                    let y = item.pos.y;
                    self.state.timeline.add(
                        Tween::new(Target::Entity(id), Prop::Y, y, y + self.tuning.item_hover, 0.8)
                            .ease(Ease::SineInOut)
                            .forever(),
                    );
                }
            }
            Deferred::PipeEntered => {
                self.entering = false;
                self.state.end(Outcome::Advance(LevelId::Arena));
            }
            _ => {}
        }
    }

    fn update_entities(&mut self, _dt: f32) {
        let progress = self.progress();
        let clock = self.state.clock;
        let speed = self.tuning.monster_hover_speed + progress;
        for m in self.monsters.iter_mut().filter(|m| m.is_active() && !m.data.emerging) {
            m.pos.y = m.data.base_y + ((clock + m.data.phase) * speed).sin() * m.data.amplitude;
        }

        let physics = &mut self.state.physics;
        for b in self.bullets.iter_mut() {
            if let Some(pos) = b.body.and_then(|h| physics.position(h)) {
                b.pos = pos;
            }
        }
        for b in &self.boxes {
            if let Some(body) = b.body {
                physics.set_position(body, b.pos);
            }
        }

        let char_z = self.state.character.pos.z;
        if clock > self.next_wave && char_z < self.final_z - self.tuning.bullet_final_clearance && !self.entering {
            self.spawn_bullet_wave();
        }
    }

    fn spawn(&mut self) {
        let horizon = self.state.furthest_z + self.tuning.release_lookahead;
        for (_, (pos, placement)) in self.staged.release(horizon) {
            self.place(pos, placement);
        }
    }

    fn solids(&self) -> Vec<Solid<SolidKey>> {
        let z = self.state.character.pos.z;
        let near = |e_z: f32| (e_z - z).abs() < 10.0;
        let mut out = Vec::new();
        for p in self.platforms.iter().filter(|p| near(p.pos.z)) {
            let policy = CollisionPolicy::solid(p.data.half, true, false, None);
            out.extend(Solid::from_policy(SolidKey::Platform(p.id), p.pos, &policy));
        }
        let rebound = Some(HeadResponse::Rebound(self.tuning.box_rebound));
        let gift = CollisionPolicy::solid(Vec3::splat(self.tuning.box_size / 2.0), true, true, rebound);
        for b in self.boxes.iter().filter(|b| near(b.pos.z)) {
            out.extend(Solid::from_policy(SolidKey::GiftBox(b.id), b.pos, &gift));
        }
        for p in self.pipes.iter().filter(|p| near(p.pos.z)) {
            let policy = CollisionPolicy::solid(p.data.half, true, true, Some(HeadResponse::Stop));
            out.extend(Solid::from_policy(SolidKey::Pipe(p.id), p.pos, &policy));
        }
        out
    }

    fn on_solids(&mut self, resolution: &SolidResolution<SolidKey>, dt: f32) {
        if let Some(ceiling) = &resolution.ceiling {
            if let SolidKey::GiftBox(id) = ceiling.key {
                self.open_box(id);
            }
        }
        if self.entering {
            return;
        }
        let standing = self.state.character.vy <= 0.0 && !self.state.character.status.jumping;
        match resolution.support.map(|s| s.key) {
            Some(SolidKey::Pipe(id)) if standing => self.stand_on_pipe(id, dt),
            _ => self.on_pipe = None,
        }
    }

    fn resolve_contacts(&mut self) {
        let ch = &self.state.character;
        let center = ch.pos + Vec3::new(0.0, ch.height * 0.5, 0.0);

        let state = &mut self.state;
        collision::collect_in_reach(center, &mut self.diamonds, self.tuning.diamond_radius, |_| {
            state.currency += 1;
            let total = state.currency;
            state.emit(GameEvent::DiamondCollected { total });
        });
        let mut collected = Vec::new();
        collision::collect_in_reach(center, &mut self.items, self.tuning.item_radius, |item| {
            collected.push(item.data.kind);
        });
        for kind in collected {
            self.collect_item(kind);
        }

        let probe = self.character_box();
        let now = self.state.clock;
        if let Some(i) = collision::first_hit(&probe, &self.monsters, MONSTER_HALF, Vec3::ZERO) {
            if self.monsters[i].data.hits.try_fire(now) {
                self.state.hurt(self.tuning.monster_damage);
            }
        }
        if self.state.is_terminal() {
            return;
        }

        if let Some(i) = collision::first_hit(&probe, &self.bullets, BULLET_HALF, Vec3::ZERO) {
            self.bullets[i].consume();
            let camera = &mut self.state.camera;
            camera.shake.start(self.tuning.shake_secs);
            camera.shake_intensity = self.tuning.shake_intensity;
            self.state.emit(GameEvent::CameraShake);
            self.state.hurt(self.tuning.bullet_damage);
        }
    }

    fn check_goal(&mut self) {}

    fn cleanup(&mut self) {
        let cursor = self.state.furthest_z;
        let d = self.tuning.cleanup_distance;
        let state = &mut self.state;
        let (physics, timeline) = (&mut state.physics, &mut state.timeline);
        spawner::despawn(&mut self.platforms, cursor, d, physics, timeline);
        spawner::despawn(&mut self.monsters, cursor, d, physics, timeline);
        spawner::despawn(&mut self.diamonds, cursor, d, physics, timeline);
        spawner::despawn(&mut self.boxes, cursor, d, physics, timeline);
        spawner::despawn(&mut self.items, cursor, d, physics, timeline);
        spawner::despawn(&mut self.bullets, cursor, d, physics, timeline);
        spawner::despawn(&mut self.pipes, cursor, d, physics, timeline);
    }

    fn scene(&self, out: &mut Vec<Sprite>) {
        for p in &self.platforms {
            out.push(Sprite::centered(SpriteKind::Platform, p, p.data.half));
        }
        for p in &self.pipes {
            out.push(Sprite::centered(SpriteKind::Pipe, p, p.data.half));
        }
        for b in &self.boxes {
            let kind = if b.data.opened {
                SpriteKind::GiftBoxOpened
            } else {
                SpriteKind::GiftBox
            };
            out.push(Sprite::centered(kind, b, Vec3::splat(self.tuning.box_size / 2.0)));
        }
        for d in self.diamonds.iter().filter(|d| d.is_active()) {
            out.push(Sprite::centered(SpriteKind::Diamond, d, Vec3::new(0.1, 0.3, 0.3)));
        }
        for i in self.items.iter().filter(|i| i.is_active()) {
            let kind = match i.data.kind {
                ItemKind::Treasure => SpriteKind::Treasure,
                ItemKind::Potion => SpriteKind::Potion,
                _ => SpriteKind::HealthPotion,
            };
            out.push(Sprite::centered(kind, i, Vec3::splat(0.3)));
        }
        for m in &self.monsters {
            out.push(Sprite::centered(SpriteKind::Monster, m, MONSTER_HALF));
        }
        for b in self.bullets.iter().filter(|b| b.is_active()) {
            out.push(Sprite::centered(SpriteKind::Bullet, b, BULLET_HALF));
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
        let mut hud = Hud::new(LevelId::Skyway, self.state.phase).with_outcome(self.state.outcome);
        hud.health_percent = Some(self.state.character.vitality.percent());
        hud.currency = self.state.currency;
        hud.treasure = Some(self.has_treasure);
        hud.potion = Some(self.has_potion);
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

    fn level(seed: u64) -> Skyway {
        let mut lvl = Skyway::new(seed, Assets::all(), SkywayTuning::default());
        // Keep bullets out of scenario tests
        lvl.next_wave = f32::MAX;
        lvl
    }

    fn idle(lvl: &mut Skyway, frames: usize) {
        let input = TickInput::default();
        for _ in 0..frames {
            tick(lvl, &input, SIM_DT);
        }
    }

    #[test]
    fn test_starts_on_first_platform() {
        let mut lvl = level(1);
        let start = lvl.state.character.pos;
        idle(&mut lvl, 60);
        assert!((lvl.state.character.pos.y - start.y).abs() < 1e-3);
        assert_eq!(lvl.state.phase, GamePhase::Playing);
    }

    #[test]
    fn test_health_hit_to_zero_ends_once() {
        let mut lvl = level(2);
        lvl.state.character.vitality = Vitality::Health { current: 10, max: 100 };
        idle(&mut lvl, 1);
        let pos = lvl.state.character.pos;
        lvl.add_monster(pos, 0.0, false);
        lvl.add_monster(pos + Vec3::new(0.0, 0.0, 0.1), 0.0, false);
        lvl.resolve_contacts();
        lvl.resolve_contacts();
        assert_eq!(lvl.state.character.vitality.current(), 0);
        let ends = lvl
            .state
            .take_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::LevelEnded(_)))
            .count();
        assert_eq!(ends, 1);
        assert_eq!(lvl.state.outcome, Some(Outcome::GameOver(LossReason::OutOfHealth)));
    }

    #[test]
    fn test_monster_cooldown_gates_damage() {
        let mut lvl = level(3);
        idle(&mut lvl, 1);
        let pos = lvl.state.character.pos;
        lvl.add_monster(pos + Vec3::new(0.0, 0.5, 0.0), 0.0, true);
        lvl.resolve_contacts();
        lvl.resolve_contacts();
        assert_eq!(lvl.state.character.vitality.current(), 90);
        lvl.state.clock += 1.5;
        lvl.resolve_contacts();
        assert_eq!(lvl.state.character.vitality.current(), 80);
    }

    #[test]
    fn test_item_pickup_applies_once() {
        let mut lvl = level(4);
        lvl.state.character.vitality = Vitality::Health { current: 50, max: 100 };
        let center = lvl.state.character.pos + Vec3::new(0.0, 0.5, 0.0);
        let id = lvl.state.next_entity_id();
        lvl.items.push(Entity::new(
            id,
            center + Vec3::new(0.0, 0.0, 1.49),
            Item {
                kind: ItemKind::HealthPotion,
            },
        ));
        lvl.resolve_contacts();
        lvl.resolve_contacts();
        assert_eq!(lvl.state.character.vitality.current(), 70);
        lvl.cleanup();
        assert!(lvl.items.is_empty());
    }

    #[test]
    fn test_bullet_hit_shakes_camera() {
        let mut lvl = level(5);
        idle(&mut lvl, 1);
        let pos = lvl.state.character.pos + Vec3::new(0.0, 0.5, 0.0);
        let id = lvl.state.next_entity_id();
        lvl.bullets.push(Entity::new(id, pos, ()));
        lvl.resolve_contacts();
        assert_eq!(lvl.state.character.vitality.current(), 90);
        assert!(lvl.state.camera.shake.active());
        assert_eq!(lvl.bullets[0].life, crate::sim::state::Life::Consumed);
    }

    #[test]
    fn test_bullet_waves_arrive() {
        let mut lvl = Skyway::new(6, Assets::all(), SkywayTuning::default());
        idle(&mut lvl, 2);
        assert!(!lvl.bullets.is_empty());
        assert!(lvl.next_wave >= lvl.tuning.bullet_min_interval);
    }

    fn stand_on_pipe(lvl: &mut Skyway) -> EntityId {
        lvl.state.furthest_z = lvl.final_z;
        lvl.spawn();
        let pipe = lvl.pipes[0].clone();
        lvl.state.character.pos = Vec3::new(0.0, pipe.pos.y + pipe.data.half.y, pipe.pos.z);
        lvl.state.character.vy = 0.0;
        pipe.id
    }

    #[test]
    fn test_pipe_without_potion_loses() {
        let mut lvl = level(7);
        stand_on_pipe(&mut lvl);
        idle(&mut lvl, 150);
        assert_eq!(lvl.state.outcome, Some(Outcome::GameOver(LossReason::MissingPotion)));
    }

    #[test]
    fn test_pipe_with_potion_advances() {
        let mut lvl = level(8);
        stand_on_pipe(&mut lvl);
        lvl.has_potion = true;
        idle(&mut lvl, 150);
        assert!(lvl.entering || lvl.state.is_terminal());
        assert!(lvl.state.character.status.scripted);
        idle(&mut lvl, 150);
        assert_eq!(lvl.state.outcome, Some(Outcome::Advance(LevelId::Arena)));
    }

    #[test]
    fn test_fall_is_fatal() {
        let mut lvl = level(9);
        lvl.state.character.pos = Vec3::new(0.0, -4.0, 4.5);
        lvl.state.character.status.jumping = true;
        idle(&mut lvl, 120);
        assert_eq!(lvl.state.outcome, Some(Outcome::GameOver(LossReason::FellOffWorld)));
        assert_eq!(lvl.state.character.vitality.current(), 0);
    }
}
