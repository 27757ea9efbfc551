//! Level 1: the overworld
//!
//! Lives, coins and score. Brick rows, coins and gift boxes come from an
//! up-front layout released as the cursor approaches; pipes, goombas, turtles
//! and clouds are spawned ahead of the player. Reaching the castle with enough
//! score and coins hands off to the skyway.

mod layout;
mod tuning;

pub use layout::{BoxSeed, BrickSeed, Layout, generate};
pub use tuning::OverworldTuning;

use glam::Vec3;

use crate::sim::collision::{
    self, Aabb, CollisionPolicy, Contact, HeadResponse, LandingBand, Solid, SolidResolution,
};
use crate::sim::controller::{self, Action, Backtrack, Motion, Speeds};
use crate::sim::events::{Deferred, GameEvent, ItemKind};
use crate::sim::scene::{Hud, Sprite, SpriteKind};
use crate::sim::spawner::{self, Staged, Verdict, near_any};
use crate::sim::state::{
    AssetKind, Assets, Character, Entity, EntityId, HitResult, LevelId, LevelState, LossReason,
    Outcome, Vitality, apply_to, find_mut,
};
use crate::sim::tick::Level;
use crate::sim::timeline::{Ease, Prop, Sample, Target, Tween};

/// Collision categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Brick,
    Pipe,
    SpecialPipe,
    GiftBox,
    Coin,
    Item,
    Goomba,
    Turtle,
    Plant,
    Chain,
}

impl Category {
    /// Policy table. Pipe height varies per pipe and is filled in by the caller.
    pub fn policy(self, t: &OverworldTuning) -> CollisionPolicy {
        match self {
            Category::Brick => CollisionPolicy::solid(
                Vec3::new(0.3, 0.5, 0.3),
                true,
                true,
                Some(HeadResponse::Knock(-t.jump_velocity * 0.8)),
            ),
            Category::Pipe => CollisionPolicy::solid(Vec3::new(1.0, 0.0, 1.0), true, true, Some(HeadResponse::Stop)),
            Category::SpecialPipe => CollisionPolicy::solid(
                Vec3::new(1.0, t.special_height / 2.0, 1.0),
                true,
                true,
                Some(HeadResponse::Stop),
            ),
            Category::GiftBox => CollisionPolicy::solid(Vec3::new(0.3, 0.25, 0.3), true, true, Some(HeadResponse::Stop)),
            Category::Coin => CollisionPolicy::pickup(t.coin_radius),
            Category::Item => CollisionPolicy::pickup(t.item_radius),
            Category::Goomba => CollisionPolicy::hostile(Vec3::new(0.75, 0.5, 0.75)),
            Category::Turtle => CollisionPolicy::hostile(Vec3::new(0.5, 0.5, 0.5)),
            Category::Plant => CollisionPolicy::hostile(Vec3::new(0.15, 0.65, 0.15)),
            Category::Chain => CollisionPolicy::hostile(Vec3::new(0.7, 0.5, 0.7)),
        }
    }
}

/// Which solid the character touched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolidKey {
    Brick(EntityId),
    Pipe(EntityId),
    SpecialPipe(EntityId),
    GiftBox(EntityId),
}

#[derive(Debug, Clone)]
pub struct Brick {
    pub row: u32,
    /// Hosts a patrolling enemy
    pub occupied: bool,
}

#[derive(Debug, Clone)]
pub struct GiftBox {
    pub contents: ItemKind,
    pub opened: bool,
}

#[derive(Debug, Clone)]
pub struct Item {
    pub kind: ItemKind,
}

#[derive(Debug, Clone)]
pub struct Pipe {
    pub height: f32,
}

#[derive(Debug, Clone)]
pub struct Plant {
    pub pipe: EntityId,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Patrol {
    /// Walks toward and past the player
    Walker,
    /// Back and forth along a brick row
    Bounded { min_z: f32, max_z: f32 },
}

#[derive(Debug, Clone)]
pub struct Goomba {
    pub patrol: Patrol,
}

#[derive(Debug, Clone)]
pub struct Turtle {
    pub patrol: Patrol,
    /// Ground turtles start hopping once the player is close
    pub hopping: bool,
}

#[derive(Debug, Clone)]
pub struct SpecialPipe {
    pub upper: bool,
}

#[derive(Debug, Clone)]
pub struct Chain {
    pub upper: bool,
}

#[derive(Debug, Clone)]
pub struct Sword {
    pub dir: f32,
    pub origin_z: f32,
}

pub struct Overworld {
    pub state: LevelState,
    pub tuning: OverworldTuning,
    pub world_end: f32,
    pub castle_z: f32,
    /// Speed stage, 0..=3
    pub stage: usize,
    pub sword_charges: u32,

    staged_bricks: Staged<BrickSeed>,
    staged_coins: Staged<Vec3>,
    staged_boxes: Staged<BoxSeed>,
    staged_specials: Staged<bool>,

    pub bricks: Vec<Entity<Brick>>,
    pub coins: Vec<Entity<()>>,
    pub boxes: Vec<Entity<GiftBox>>,
    pub items: Vec<Entity<Item>>,
    pub pipes: Vec<Entity<Pipe>>,
    pub plants: Vec<Entity<Plant>>,
    pub goombas: Vec<Entity<Goomba>>,
    pub turtles: Vec<Entity<Turtle>>,
    pub special_pipes: Vec<Entity<SpecialPipe>>,
    pub chains: Vec<Entity<Chain>>,
    pub clouds: Vec<Entity<()>>,
    pub swords: Vec<Entity<Sword>>,

    pipe_mark: f32,
    goomba_mark: f32,
    patrol_mark: f32,
    turtle_mark: f32,
    cloud_mark: f32,
    chains_running: bool,
}

impl Overworld {
    pub fn new(seed: u64, assets: Assets, tuning: OverworldTuning) -> Self {
        let mut character = Character::new(
            Vec3::new(0.0, tuning.ground_y, 0.0),
            Vitality::Lives {
                current: tuning.start_lives,
                max: tuning.start_lives,
            },
        );
        character.height = tuning.character_height;
        let mut state = LevelState::new(LevelId::Overworld, seed, assets, character);
        state.hit_invulnerability = tuning.hit_invulnerability;

        let layout = layout::generate(&tuning, &mut state.rng);
        let world_end = layout.world_end;
        let specials: Vec<(f32, bool)> = (0..tuning.special_count)
            .flat_map(|i| {
                let z = world_end + tuning.special_gap + i as f32 * tuning.special_spacing;
                [(z, false), (z, true)]
            })
            .collect();

        log::info!("🌍 Overworld ready (seed {seed}), castle at {:.0}", world_end + tuning.castle_offset);
        Self {
            castle_z: world_end + tuning.castle_offset,
            world_end,
            stage: 0,
            sword_charges: 0,
            staged_bricks: Staged::new(layout.bricks.iter().map(|b| (b.pos.z, *b)).collect()),
            staged_coins: Staged::new(layout.coins.iter().map(|c| (c.z, *c)).collect()),
            staged_boxes: Staged::new(layout.boxes.iter().map(|b| (b.pos.z, *b)).collect()),
            staged_specials: Staged::new(specials),
            bricks: Vec::new(),
            coins: Vec::new(),
            boxes: Vec::new(),
            items: Vec::new(),
            pipes: Vec::new(),
            plants: Vec::new(),
            goombas: Vec::new(),
            turtles: Vec::new(),
            special_pipes: Vec::new(),
            chains: Vec::new(),
            clouds: Vec::new(),
            swords: Vec::new(),
            pipe_mark: 0.0,
            goomba_mark: 0.0,
            patrol_mark: f32::NEG_INFINITY,
            turtle_mark: 0.0,
            cloud_mark: f32::NEG_INFINITY,
            chains_running: false,
            state,
            tuning,
        }
    }

    fn character_center(&self) -> Vec3 {
        let ch = &self.state.character;
        ch.pos + Vec3::new(0.0, ch.height * 0.5, 0.0)
    }

    fn character_box(&self) -> Aabb {
        let ch = &self.state.character;
        ch.hit_box(Vec3::new(0.3, ch.height * 0.5, 0.3))
    }

    fn walker_speed(&self) -> f32 {
        self.tuning.goomba_speed * self.tuning.walker_stage_mult[self.stage]
    }

    fn patrol_speed(&self) -> f32 {
        self.tuning.goomba_speed * self.tuning.patrol_stage_mult[self.stage]
    }

    fn turtle_speed(&self) -> f32 {
        self.tuning.turtle_speed * self.tuning.turtle_stage_mult[self.stage]
    }

    // === Spawning ===

    fn release_staged(&mut self) {
        let horizon = self.state.furthest_z + self.tuning.release_lookahead;
        let brick_half = Category::Brick.policy(&self.tuning).half;

        for (_, seed) in self.staged_bricks.release(horizon) {
            let id = self.state.next_entity_id();
            let body = self.state.physics.add_static(seed.pos, brick_half);
            self.bricks.push(
                Entity::new(
                    id,
                    seed.pos,
                    Brick {
                        row: seed.row,
                        occupied: false,
                    },
                )
                .with_body(body),
            );
        }
        for (_, pos) in self.staged_coins.release(horizon) {
            let id = self.state.next_entity_id();
            self.coins.push(Entity::new(id, pos, ()));
        }
        let box_half = Category::GiftBox.policy(&self.tuning).half;
        for (_, seed) in self.staged_boxes.release(horizon) {
            let id = self.state.next_entity_id();
            let center = seed.pos + Vec3::new(0.0, box_half.y, 0.0);
            let body = self.state.physics.add_static(center, box_half);
            self.boxes.push(
                Entity::new(
                    id,
                    center,
                    GiftBox {
                        contents: seed.contents,
                        opened: false,
                    },
                )
                .with_body(body),
            );
        }
        let special_half = Category::SpecialPipe.policy(&self.tuning).half;
        for (z, upper) in self.staged_specials.release(horizon) {
            let id = self.state.next_entity_id();
            let base_y = if upper { self.tuning.special_upper_y } else { 0.0 };
            let pos = Vec3::new(0.0, base_y, z);
            let body = self
                .state
                .physics
                .add_static(pos + Vec3::new(0.0, special_half.y, 0.0), special_half);
            self.special_pipes
                .push(Entity::new(id, pos, SpecialPipe { upper }).with_body(body));
        }
        if !self.chains_running && !self.special_pipes.is_empty() && self.state.assets.has(AssetKind::Chain) {
            self.chains_running = true;
            self.state.deferred.push(Deferred::ChainBatch);
        }
    }

    fn spawn_clouds(&mut self) {
        let char_z = self.state.character.pos.z;
        let live = spawner::live_count(&self.clouds);
        let zs = spawner::propose(
            &self.tuning.clouds,
            &mut self.cloud_mark,
            char_z,
            self.castle_z,
            live,
            &mut self.state.rng,
            |_| Verdict::Accept,
        );
        for z in zs {
            let x = self.state.rng.range(20.0, 40.0);
            let y = self.state.rng.range(2.0, 22.0);
            let id = self.state.next_entity_id();
            self.clouds.push(Entity::new(id, Vec3::new(x, y, z), ()));
        }
    }

    fn spawn_pipes(&mut self) {
        let char_z = self.state.character.pos.z;
        let live = spawner::live_count(&self.pipes);
        let t = &self.tuning;
        let bricks = &self.bricks;
        let staged_bricks = &self.staged_bricks;
        let boxes = &self.boxes;
        let staged_boxes = &self.staged_boxes;
        let end_zone = spawner::Span::new(
            self.world_end - 20.0 - t.pipe_end_buffer,
            self.world_end - 2.0 + t.pipe_end_buffer,
        );
        let zs = spawner::propose(
            &t.pipes,
            &mut self.pipe_mark,
            char_z,
            self.world_end,
            live,
            &mut self.state.rng,
            |z| {
                let brick_zs = bricks
                    .iter()
                    .map(|b| b.pos.z)
                    .chain(staged_bricks.iter().map(|(bz, _)| *bz));
                let box_zs = boxes
                    .iter()
                    .map(|b| b.pos.z)
                    .chain(staged_boxes.iter().map(|(bz, _)| *bz));
                if near_any(z, brick_zs, t.pipe_clearance)
                    || near_any(z, box_zs, t.pipe_clearance)
                    || end_zone.contains(z)
                {
                    Verdict::Reject {
                        skip: t.pipe_reject_skip,
                    }
                } else {
                    Verdict::Accept
                }
            },
        );
        for z in zs {
            let height = self
                .state
                .rng
                .range(self.tuning.pipe_min_height, self.tuning.pipe_max_height);
            let id = self.state.next_entity_id();
            let half = Vec3::new(1.0, height / 2.0, 1.0);
            let pos = Vec3::new(0.0, 0.0, z);
            let body = self.state.physics.add_static(pos + Vec3::new(0.0, half.y, 0.0), half);
            self.pipes.push(Entity::new(id, pos, Pipe { height }).with_body(body));
            if self.state.assets.has(AssetKind::Plant) {
                self.spawn_plant(id, pos, height);
            }
        }
    }

    fn spawn_plant(&mut self, pipe: EntityId, pipe_pos: Vec3, height: f32) {
        let plant_height = Category::Plant.policy(&self.tuning).half.y * 2.0;
        let base = height - plant_height;
        let id = self.state.next_entity_id();
        self.plants.push(Entity::new(id, Vec3::new(0.0, base, pipe_pos.z), Plant { pipe }));
        self.state.timeline.add(
            Tween::new(Target::Entity(id), Prop::Y, base, base + self.tuning.plant_travel, self.tuning.plant_secs)
                .ease(Ease::SineInOut)
                .forever(),
        );
    }

    /// Nearest free brick row segment with z in `[min_z, max_z]`
    fn free_segment(&self, min_z: f32, max_z: f32, clearance: Option<f32>) -> Option<(Vec3, f32, f32, u32)> {
        let patrol_zs: Vec<f32> = self
            .goombas
            .iter()
            .filter(|g| matches!(g.data.patrol, Patrol::Bounded { .. }))
            .map(|g| g.pos.z)
            .collect();
        let brick = spawner::nearest_ahead(&self.bricks, min_z, max_z, |b| {
            !b.data.occupied && clearance.is_none_or(|c| !near_any(b.pos.z, patrol_zs.iter().copied(), c))
        })?;
        let reach = self.tuning.patrol_reach;
        let (lo, hi) = self
            .bricks
            .iter()
            .filter(|b| b.data.row == brick.data.row && (b.pos.y - brick.pos.y).abs() < 1e-3)
            .filter(|b| (b.pos.z - brick.pos.z).abs() <= reach)
            .fold((brick.pos.z, brick.pos.z), |(lo, hi), b| (lo.min(b.pos.z), hi.max(b.pos.z)));
        Some((brick.pos, lo - 0.5, hi + 0.5, brick.data.row))
    }

    fn occupy_row(&mut self, row: u32) {
        for brick in self.bricks.iter_mut().filter(|b| b.data.row == row) {
            brick.data.occupied = true;
        }
    }

    fn start_patrol(&mut self, id: EntityId, from_z: f32, max_z: f32, speed: f32) {
        let secs = ((max_z - from_z).abs() / speed).max(0.05);
        self.state.timeline.cancel_prop(Target::Entity(id), Prop::Z);
        self.state.timeline.add(
            Tween::new(Target::Entity(id), Prop::Z, from_z, max_z, secs).then(Deferred::PatrolTurn(id)),
        );
    }

    fn spawn_goombas(&mut self) {
        let char_z = self.state.character.pos.z;
        let live = spawner::live_count(&self.goombas);
        let zs = spawner::propose(
            &self.tuning.goombas,
            &mut self.goomba_mark,
            char_z,
            self.world_end,
            live,
            &mut self.state.rng,
            |_| Verdict::Accept,
        );
        if !zs.is_empty() {
            log::debug!("Spawning {} goombas ahead of z={char_z:.1}", zs.len());
        }
        let horizon = self.tuning.goombas.horizon(char_z, self.world_end);
        for z in zs {
            let on_bricks = self.state.rng.chance(0.5);
            let min_z = (self.patrol_mark + self.tuning.patrol_spacing).max(char_z + self.tuning.goombas.lead);
            let segment = if on_bricks {
                self.free_segment(min_z, horizon, None)
            } else {
                None
            };
            match segment {
                Some((brick, lo, hi, row)) => {
                    self.patrol_mark = brick.z;
                    self.occupy_row(row);
                    let pos = Vec3::new(0.0, brick.y + 0.5, brick.z);
                    let id = self.add_goomba(pos, Patrol::Bounded { min_z: lo, max_z: hi });
                    let speed = self.patrol_speed();
                    self.start_patrol(id, pos.z, hi, speed);
                }
                None => {
                    let pos = Vec3::new(0.0, self.tuning.ground_y, z);
                    let id = self.add_goomba(pos, Patrol::Walker);
                    let target = char_z - self.tuning.goomba_walk_past;
                    let secs = (z - target).abs() / self.walker_speed();
                    self.state
                        .timeline
                        .add(Tween::new(Target::Entity(id), Prop::Z, z, target, secs));
                    self.state.timeline.add(
                        Tween::new(Target::Entity(id), Prop::Y, pos.y, pos.y + self.tuning.goomba_hover, self.tuning.goomba_hover_secs)
                            .ease(Ease::SineInOut)
                            .forever(),
                    );
                }
            }
        }
    }

    fn add_goomba(&mut self, pos: Vec3, patrol: Patrol) -> EntityId {
        let id = self.state.next_entity_id();
        let half = Category::Goomba.policy(&self.tuning).half;
        let body = self
            .state
            .physics
            .add_kinematic(pos + Vec3::new(0.0, half.y, 0.0), half);
        self.goombas
            .push(Entity::new(id, pos, Goomba { patrol }).with_body(body));
        id
    }

    fn spawn_turtles(&mut self) {
        let char_z = self.state.character.pos.z;
        let live = spawner::live_count(&self.turtles);
        let zs = spawner::propose(
            &self.tuning.turtles,
            &mut self.turtle_mark,
            char_z,
            self.world_end,
            live,
            &mut self.state.rng,
            |_| Verdict::Accept,
        );
        let horizon = self.tuning.turtles.horizon(char_z, self.world_end);
        let window_min = char_z + self.tuning.turtles.lead;
        for z in zs {
            if self.state.rng.chance(0.5) {
                let clearance = Some(self.tuning.turtle_goomba_clearance);
                if let Some((brick, lo, hi, row)) = self.free_segment(z, horizon, clearance) {
                    self.occupy_row(row);
                    let pos = Vec3::new(0.0, brick.y + 0.5, brick.z);
                    let id = self.add_turtle(pos, Patrol::Bounded { min_z: lo, max_z: hi });
                    let speed = self.turtle_speed();
                    self.start_patrol(id, pos.z, hi, speed);
                    continue;
                }
            }
            let nearby: Vec<f32> = self
                .pipes
                .iter()
                .map(|p| p.pos.z)
                .filter(|pz| *pz >= window_min && *pz <= horizon)
                .collect();
            if nearby.is_empty() {
                continue;
            }
            let pipe_z = nearby[self.state.rng.index(nearby.len())];
            let side = if self.state.rng.chance(0.5) { 1.0 } else { -1.0 };
            let tz = pipe_z + side * self.tuning.turtle_pipe_offset;
            let pipe_reach = Category::Pipe.policy(&self.tuning).half.z + 0.5;
            if tz < window_min || tz > horizon || near_any(tz, self.pipes.iter().map(|p| p.pos.z), pipe_reach) {
                continue;
            }
            let pos = Vec3::new(0.0, self.tuning.ground_y, tz);
            let id = self.add_turtle(pos, Patrol::Walker);
            self.state.timeline.add(
                Tween::new(Target::Entity(id), Prop::Y, pos.y, pos.y + 0.1, 0.5)
                    .ease(Ease::SineInOut)
                    .forever(),
            );
        }
    }

    fn add_turtle(&mut self, pos: Vec3, patrol: Patrol) -> EntityId {
        let id = self.state.next_entity_id();
        let half = Category::Turtle.policy(&self.tuning).half;
        let body = self
            .state
            .physics
            .add_kinematic(pos + Vec3::new(0.0, half.y, 0.0), half);
        self.turtles.push(
            Entity::new(
                id,
                pos,
                Turtle {
                    patrol,
                    hopping: false,
                },
            )
            .with_body(body),
        );
        id
    }

    fn spawn_chain_batch(&mut self) {
        let pipes: Vec<(Vec3, bool)> = self
            .special_pipes
            .iter()
            .filter(|p| p.is_active())
            .map(|p| (p.pos, p.data.upper))
            .collect();
        if pipes.is_empty() {
            self.chains_running = false;
            return;
        }
        let roll = self.state.rng.unit();
        let sizes = self.tuning.chain_batch_sizes;
        let pick = if roll < 0.33 {
            0
        } else if roll < 0.66 {
            1
        } else {
            2
        };
        let size = sizes[pick] as usize;
        let mut order: Vec<usize> = (0..pipes.len()).collect();
        self.state.rng.shuffle(&mut order);
        for &i in order.iter().take(size) {
            let (pos, upper) = pipes[i];
            let (from, to) = if upper {
                (pos.y + 1.0, self.tuning.chain_upper_end)
            } else {
                (pos.y - 0.5, self.tuning.chain_lower_end)
            };
            let secs = self
                .state
                .rng
                .range(self.tuning.chain_min_secs, self.tuning.chain_max_secs);
            let delay = self.state.rng.range(0.0, self.tuning.chain_max_delay);
            let id = self.state.next_entity_id();
            self.chains
                .push(Entity::new(id, Vec3::new(0.0, from, pos.z), Chain { upper }));
            self.state.timeline.add(
                Tween::new(Target::Entity(id), Prop::Y, from, to, secs)
                    .delay(delay)
                    .then(Deferred::ChainFinished(id)),
            );
        }
    }

    // === Actions ===

    fn throw_sword(&mut self) {
        if self.sword_charges == 0 {
            log::debug!("No sword charges");
            return;
        }
        self.sword_charges -= 1;
        let ch = &self.state.character;
        let dir = ch.facing.sign();
        let pos = ch.pos + Vec3::new(0.0, 0.5, 0.0);
        let id = self.state.next_entity_id();
        let body = self.state.physics.add_kinematic(pos, Vec3::new(0.1, 0.1, 0.3));
        self.state
            .physics
            .set_velocity(body, Vec3::new(0.0, 0.0, dir * self.tuning.sword_speed));
        self.swords.push(
            Entity::new(
                id,
                pos,
                Sword {
                    dir,
                    origin_z: pos.z,
                },
            )
            .with_body(body),
        );
        self.state.emit(GameEvent::SwordThrown);
    }

    fn open_box(&mut self, id: EntityId) {
        let rise = self.tuning.item_rise;
        let rise_secs = self.tuning.item_rise_secs;
        let with_items = self.state.assets.has(AssetKind::Item);
        let Some(gift) = find_mut(&mut self.boxes, id) else {
            return;
        };
        if gift.data.opened {
            return;
        }
        gift.data.opened = true;
        let pos = gift.pos;
        let contents = gift.data.contents;
        self.state.emit(GameEvent::ContainerOpened);
        self.state.timeline.add(
            Tween::new(Target::Entity(id), Prop::Y, pos.y, pos.y + 0.3, 0.1).yoyo(1),
        );
        if with_items {
            let item_id = self.state.next_entity_id();
            self.items
                .push(Entity::new(item_id, pos, Item { kind: contents }));
            self.state.timeline.add(
                Tween::new(Target::Entity(item_id), Prop::Y, pos.y, pos.y + rise, rise_secs)
                    .ease(Ease::Power2Out)
                    .then(Deferred::ItemRisen(item_id)),
            );
        }
    }

    fn take_hit(&mut self) {
        if self.state.hurt(1) == HitResult::Damaged {
            log::info!("💔 Life lost, {} left", self.state.character.vitality.current());
            let blink_secs = self.tuning.hit_invulnerability / 8.0;
            self.state.timeline.cancel_prop(Target::Character, Prop::Opacity);
            self.state.timeline.add(
                Tween::new(Target::Character, Prop::Opacity, 1.0, 0.3, blink_secs).yoyo(7),
            );
        }
    }

    /// Plants and chains: strip the power-up first, then cost a life
    fn hazard_hit(&mut self) {
        let status = &mut self.state.character.status;
        if status.is_invulnerable() || status.powering_down {
            return;
        }
        if status.powered_up.active() {
            status.powered_up.clear();
            status.powering_down = true;
            status.invulnerable.start(self.tuning.power_strip_secs);
            self.state.emit(GameEvent::PowerLost);
            self.state.timeline.cancel_prop(Target::Character, Prop::Opacity);
            self.state.timeline.add(
                Tween::new(Target::Character, Prop::Opacity, 1.0, 0.3, self.tuning.power_strip_secs / 8.0)
                    .yoyo(7)
                    .then(Deferred::PowerStripped),
            );
        } else {
            self.take_hit();
        }
    }

    fn defeat_goomba(&mut self, index: usize, points: u32, stomped: bool) {
        let goomba = &mut self.goombas[index];
        goomba.defeat();
        let id = goomba.id;
        self.state.timeline.cancel_target(Target::Entity(id));
        self.state.timeline.add(
            Tween::new(Target::Entity(id), Prop::Scale, 1.0, 0.2, 0.2).then(Deferred::Despawn(id)),
        );
        self.state.award(points);
        self.state.emit(if stomped {
            GameEvent::EnemyStomped { points }
        } else {
            GameEvent::EnemyDefeated { points }
        });
        log::debug!("Goomba {id} defeated (+{points})");
    }

    fn defeat_turtle(&mut self, index: usize, dir: f32) {
        let turtle = &mut self.turtles[index];
        turtle.defeat();
        let id = turtle.id;
        let pos = turtle.pos;
        self.state.timeline.cancel_target(Target::Entity(id));
        self.state.timeline.add(
            Tween::new(Target::Entity(id), Prop::Z, pos.z, pos.z + 19.0 * dir, 0.5).ease(Ease::Power2Out),
        );
        self.state.timeline.add(
            Tween::new(Target::Entity(id), Prop::Y, pos.y, pos.y + 4.5, 0.5)
                .ease(Ease::Power2Out)
                .then(Deferred::Launched(id)),
        );
        let points = self.tuning.points_turtle;
        self.state.award(points);
        self.state.emit(GameEvent::EnemyDefeated { points });
    }

    fn defeat_plant(&mut self, index: usize) {
        let plant = &mut self.plants[index];
        plant.defeat();
        let id = plant.id;
        self.state.timeline.cancel_target(Target::Entity(id));
        self.state.timeline.add(
            Tween::new(Target::Entity(id), Prop::Scale, 1.0, 0.0, 0.3).then(Deferred::Despawn(id)),
        );
        let points = self.tuning.points_plant;
        self.state.award(points);
        self.state.emit(GameEvent::EnemyDefeated { points });
    }

    fn collect_item(&mut self, kind: ItemKind) {
        let t = &self.tuning;
        let ch = &mut self.state.character;
        match kind {
            ItemKind::Heart => {
                ch.vitality.restore(1);
            }
            ItemKind::Sword => {
                self.sword_charges = (self.sword_charges + t.sword_charges_per_pickup).min(t.sword_charge_cap);
            }
            ItemKind::Mushroom => {
                ch.status.powered_up.start(t.power_secs);
                ch.height = t.power_height;
                ch.scale = t.power_height / t.character_height;
                self.state.emit(GameEvent::PoweredUp);
            }
            _ => {}
        }
        self.state.emit(GameEvent::ItemCollected(kind));
    }

    fn resolve_projectiles(&mut self) {
        let radius = self.tuning.sword_hit_radius;
        let plant_offset = Vec3::new(0.0, Category::Plant.policy(&self.tuning).half.y, 0.0);
        for s in 0..self.swords.len() {
            if !self.swords[s].is_active() {
                continue;
            }
            let pos = self.swords[s].pos;
            let dir = self.swords[s].data.dir;
            let hit_goomba = self
                .goombas
                .iter()
                .position(|g| g.is_active() && collision::in_reach(pos, g.pos + Vec3::Y * 0.5, radius));
            if let Some(i) = hit_goomba {
                self.defeat_goomba(i, self.tuning.points_goomba, false);
                self.swords[s].consume();
                continue;
            }
            let hit_turtle = self
                .turtles
                .iter()
                .position(|t| t.is_active() && collision::in_reach(pos, t.pos + Vec3::Y * 0.5, radius));
            if let Some(i) = hit_turtle {
                self.defeat_turtle(i, dir);
                self.swords[s].consume();
                continue;
            }
            let hit_plant = self
                .plants
                .iter()
                .position(|p| p.is_active() && collision::in_reach(pos, p.pos + plant_offset, radius));
            if let Some(i) = hit_plant {
                self.defeat_plant(i);
                self.swords[s].consume();
            }
        }
    }

    fn update_status(&mut self, dt: f32) {
        let t = &self.tuning;
        let ch = &mut self.state.character;
        if ch.status.invulnerable.tick(dt) {
            ch.opacity = 1.0;
        }
        if ch.status.powered_up.tick(dt) {
            ch.height = t.character_height;
            ch.scale = 1.0;
            self.state.emit(GameEvent::PowerLost);
        }
        if self.state.character.status.slowed.tick(dt) {
            self.state.emit(GameEvent::SlowEnded);
        }

        if !self.state.character.status.slowed.active() {
            let stage = t.stage_for(self.state.furthest_z);
            if stage > self.stage {
                self.stage = stage;
                log::info!("⚡ Speed stage {stage} at z={:.0}", self.state.furthest_z);
                self.state.emit(GameEvent::SpeedStage(stage as u32));
                self.retime_patrols();
            }
        }
    }

    fn retime_patrols(&mut self) {
        let goomba_speed = self.patrol_speed();
        let turtle_speed = self.turtle_speed();
        let mut restarts = Vec::new();
        for g in self.goombas.iter().filter(|g| g.is_active()) {
            if let Patrol::Bounded { max_z, .. } = g.data.patrol {
                restarts.push((g.id, g.pos.z, max_z, goomba_speed));
            }
        }
        for t in self.turtles.iter().filter(|t| t.is_active()) {
            if let Patrol::Bounded { max_z, .. } = t.data.patrol {
                restarts.push((t.id, t.pos.z, max_z, turtle_speed));
            }
        }
        for (id, z, max_z, speed) in restarts {
            self.start_patrol(id, z, max_z, speed);
        }
    }

    fn patrol_bounds(&self, id: EntityId) -> Option<(f32, f32, f32)> {
        let from_goomba = self
            .goombas
            .binary_search_by_key(&id, |g| g.id)
            .ok()
            .map(|i| (self.goombas[i].data.patrol, self.patrol_speed()));
        let from_turtle = || {
            self.turtles
                .binary_search_by_key(&id, |t| t.id)
                .ok()
                .map(|i| (self.turtles[i].data.patrol, self.turtle_speed()))
        };
        match from_goomba.or_else(from_turtle) {
            Some((Patrol::Bounded { min_z, max_z }, speed)) => Some((min_z, max_z, speed)),
            _ => None,
        }
    }

    fn sync_bodies(&mut self) {
        let physics = &mut self.state.physics;
        for g in &self.goombas {
            if let Some(body) = g.body {
                physics.set_position(body, g.pos + Vec3::new(0.0, 0.5, 0.0));
            }
        }
        for t in &self.turtles {
            if let Some(body) = t.body {
                physics.set_position(body, t.pos + Vec3::new(0.0, 0.5, 0.0));
            }
        }
        for b in &self.boxes {
            if let Some(body) = b.body {
                physics.set_position(body, b.pos);
            }
        }
        // Projectiles move by velocity; copy the body back onto the visual
        for s in self.swords.iter_mut() {
            if let Some(pos) = s.body.and_then(|b| physics.position(b)) {
                s.pos = pos;
            }
        }
    }
}

impl Level for Overworld {
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
            backtrack: Some(Backtrack {
                limit: self.tuning.backtrack_limit,
                snap: self.tuning.backtrack_snap,
            }),
            min_z: None,
            fall_y: None,
            band: LandingBand {
                below: 0.6,
                above: 0.05,
            },
        }
    }

    fn speeds(&self) -> Speeds {
        let t = &self.tuning;
        let s = self.stage;
        let status = &self.state.character.status;
        if status.slowed.active() {
            return Speeds {
                run: t.slow_run[s] * t.slow_factor,
                back: t.slow_back[s] * t.slow_factor,
            };
        }
        let mut speeds = Speeds {
            run: t.stage_run[s],
            back: t.back_speed * t.stage_back_mult[s],
        };
        if status.powered_up.active() {
            speeds.run = speeds.run.max(t.power_run).max(t.power_floor[s]);
            speeds.back = speeds.back.max(t.power_back);
        }
        speeds
    }

    fn on_press(&mut self, action: Action) {
        match action {
            Action::Jump | Action::Guard => {
                let motion = self.motion();
                controller::try_jump(&mut self.state, &motion);
            }
            Action::Attack => self.throw_sword(),
            _ => {}
        }
    }

    fn apply_sample(&mut self, sample: &Sample) {
        let Target::Entity(id) = sample.target else {
            return;
        };
        let (p, v) = (sample.prop, sample.value);
        let _ = apply_to(&mut self.goombas, id, p, v)
            || apply_to(&mut self.turtles, id, p, v)
            || apply_to(&mut self.plants, id, p, v)
            || apply_to(&mut self.chains, id, p, v)
            || apply_to(&mut self.items, id, p, v)
            || apply_to(&mut self.boxes, id, p, v);
    }

    fn handle_deferred(&mut self, event: Deferred) {
        match event {
            Deferred::Despawn(id) => {
                if let Some(g) = find_mut(&mut self.goombas, id) {
                    g.consume();
                } else if let Some(t) = find_mut(&mut self.turtles, id) {
                    t.consume();
                } else if let Some(p) = find_mut(&mut self.plants, id) {
                    p.consume();
                }
            }
            Deferred::PatrolTurn(id) => {
                if let Some((min_z, max_z, speed)) = self.patrol_bounds(id) {
                    let secs = ((max_z - min_z) / speed).max(0.05);
                    self.state.timeline.add(
                        Tween::new(Target::Entity(id), Prop::Z, max_z, min_z, secs).forever(),
                    );
                }
            }
            Deferred::ItemRisen(id) => {
                if let Some(item) = find_mut(&mut self.items, id) {
                    let y = item.pos.y;
                    self.state.timeline.add(
                        Tween::new(Target::Entity(id), Prop::Y, y, y + self.tuning.item_hover, 1.0)
                            .ease(Ease::SineInOut)
                            .forever(),
                    );
                }
            }
            Deferred::ChainFinished(id) => {
                if let Some(chain) = find_mut(&mut self.chains, id) {
                    chain.consume();
                }
                if self.chains.iter().all(|c| !c.is_active()) {
                    self.state
                        .deferred
                        .push_after(self.tuning.chain_rest, Deferred::ChainBatch);
                }
            }
            Deferred::ChainBatch => self.spawn_chain_batch(),
            Deferred::Launched(id) => {
                if let Some(turtle) = find_mut(&mut self.turtles, id) {
                    let y = turtle.pos.y;
                    self.state.timeline.add(
                        Tween::new(Target::Entity(id), Prop::Y, y, -2.0, 0.4)
                            .ease(Ease::Power2In)
                            .then(Deferred::Despawn(id)),
                    );
                }
            }
            Deferred::PowerStripped => {
                let ch = &mut self.state.character;
                ch.status.powering_down = false;
                ch.status.invulnerable.clear();
                ch.height = self.tuning.character_height;
                ch.scale = 1.0;
                self.take_hit();
            }
            _ => {}
        }
    }

    fn update_entities(&mut self, dt: f32) {
        self.update_status(dt);

        // Ground turtles hop once the player is close
        let char_z = self.state.character.pos.z;
        let range = self.tuning.turtle_hop_range;
        let mut hops = Vec::new();
        for t in self.turtles.iter_mut() {
            if t.is_active() && t.data.patrol == Patrol::Walker && !t.data.hopping && (t.pos.z - char_z).abs() < range {
                t.data.hopping = true;
                hops.push((t.id, self.tuning.ground_y));
            }
        }
        for (id, base) in hops {
            self.state.timeline.cancel_prop(Target::Entity(id), Prop::Y);
            self.state.timeline.add(
                Tween::new(Target::Entity(id), Prop::Y, base, base + self.tuning.turtle_hop, self.tuning.turtle_hop_secs)
                    .ease(Ease::Power2InOut)
                    .forever(),
            );
        }

        self.sync_bodies();
        let range = self.tuning.sword_range;
        for s in self.swords.iter_mut() {
            if s.is_active() && (s.pos.z - s.data.origin_z).abs() >= range {
                s.consume();
            }
        }
    }

    fn spawn(&mut self) {
        self.release_staged();
        self.spawn_clouds();
        self.spawn_pipes();
        if self.state.assets.has(AssetKind::Goomba) {
            self.spawn_goombas();
        }
        if self.state.assets.has(AssetKind::Turtle) {
            self.spawn_turtles();
        }
    }

    fn solids(&self) -> Vec<Solid<SolidKey>> {
        let t = &self.tuning;
        let z = self.state.character.pos.z;
        let near = |e_z: f32| (e_z - z).abs() < 4.0;
        let mut out = Vec::new();
        let brick = Category::Brick.policy(t);
        for b in self.bricks.iter().filter(|b| near(b.pos.z)) {
            out.extend(Solid::from_policy(SolidKey::Brick(b.id), b.pos, &brick));
        }
        let pipe = Category::Pipe.policy(t);
        for p in self.pipes.iter().filter(|p| near(p.pos.z)) {
            let policy = CollisionPolicy {
                half: pipe.half.with_y(p.data.height / 2.0),
                ..pipe
            };
            let center = p.pos + Vec3::new(0.0, p.data.height / 2.0, 0.0);
            out.extend(Solid::from_policy(SolidKey::Pipe(p.id), center, &policy));
        }
        let special = Category::SpecialPipe.policy(t);
        for p in self.special_pipes.iter().filter(|p| near(p.pos.z)) {
            let center = p.pos + Vec3::new(0.0, special.half.y, 0.0);
            out.extend(Solid::from_policy(SolidKey::SpecialPipe(p.id), center, &special));
        }
        let gift = Category::GiftBox.policy(t);
        for b in self.boxes.iter().filter(|b| near(b.pos.z)) {
            out.extend(Solid::from_policy(SolidKey::GiftBox(b.id), b.pos, &gift));
        }
        out
    }

    fn on_solids(&mut self, resolution: &SolidResolution<SolidKey>, _dt: f32) {
        if let Some(ceiling) = &resolution.ceiling {
            if let SolidKey::GiftBox(id) = ceiling.key {
                self.open_box(id);
            }
        }
    }

    fn resolve_contacts(&mut self) {
        let center = self.character_center();

        // === Pickups ===
        let coin_radius = Category::Coin.policy(&self.tuning).radius();
        let state = &mut self.state;
        collision::collect_in_reach(center, &mut self.coins, coin_radius, |_| {
            state.currency += 1;
            let total = state.currency;
            state.emit(GameEvent::CoinCollected { total });
        });
        let item_radius = Category::Item.policy(&self.tuning).radius();
        let mut collected = Vec::new();
        collision::collect_in_reach(center, &mut self.items, item_radius, |item| {
            collected.push(item.data.kind);
        });
        for kind in collected {
            self.collect_item(kind);
        }

        // === Hostiles ===
        let probe = self.character_box();
        let goomba = Category::Goomba.policy(&self.tuning);
        if let Some(i) = collision::first_hit(&probe, &self.goombas, goomba.half, Vec3::Y * goomba.half.y) {
            let ch = &self.state.character;
            let t = &self.tuning;
            let contact = collision::classify_contact(ch.pos.y, ch.vy, self.goombas[i].pos.y, t.stomp_margin, t.hurt_band);
            match contact {
                Contact::Stomp => {
                    self.defeat_goomba(i, self.tuning.points_goomba, true);
                    self.state.character.vy = self.tuning.jump_velocity * self.tuning.stomp_bounce;
                    self.state.character.status.jumping = true;
                }
                Contact::Hurt => self.take_hit(),
                Contact::Graze => {}
            }
        }
        if self.state.is_terminal() {
            return;
        }

        let turtle = Category::Turtle.policy(&self.tuning);
        if collision::first_hit(&probe, &self.turtles, turtle.half, Vec3::Y * turtle.half.y).is_some() {
            let status = &mut self.state.character.status;
            if !status.is_invulnerable() && !status.slowed.active() {
                status.slowed.start(self.tuning.slow_secs);
                status.invulnerable.start(self.tuning.slow_secs);
                log::info!("🐢 Slowed for {}s", self.tuning.slow_secs);
                self.state.emit(GameEvent::Slowed);
            }
        }

        let plant = Category::Plant.policy(&self.tuning);
        if collision::first_hit(&probe, &self.plants, plant.half, Vec3::Y * plant.half.y).is_some() {
            self.hazard_hit();
        }
        if self.state.is_terminal() {
            return;
        }

        let chain = Category::Chain.policy(&self.tuning);
        if collision::first_hit(&probe, &self.chains, chain.half, Vec3::ZERO).is_some() {
            self.hazard_hit();
        }
        if self.state.is_terminal() {
            return;
        }

        self.resolve_projectiles();
    }

    fn check_goal(&mut self) {
        let z = self.state.character.pos.z;
        if (z - self.castle_z).abs() >= self.tuning.castle_reach {
            return;
        }
        let t = &self.tuning;
        log::info!("🏰 Castle reached: score {}, coins {}", self.state.score, self.state.currency);
        if self.state.score > t.win_score && self.state.currency >= t.win_coins {
            self.state.end(Outcome::Advance(LevelId::Skyway));
        } else {
            self.state.end(Outcome::GameOver(LossReason::LowScore));
        }
    }

    fn cleanup(&mut self) {
        let cursor = self.state.furthest_z;
        let d = self.tuning.cleanup_distance;
        let state = &mut self.state;
        let (physics, timeline) = (&mut state.physics, &mut state.timeline);
        spawner::despawn(&mut self.bricks, cursor, d, physics, timeline);
        spawner::despawn(&mut self.coins, cursor, d, physics, timeline);
        spawner::despawn(&mut self.boxes, cursor, d, physics, timeline);
        spawner::despawn(&mut self.items, cursor, d, physics, timeline);
        spawner::despawn(&mut self.pipes, cursor, d, physics, timeline);
        spawner::despawn(&mut self.plants, cursor, d, physics, timeline);
        spawner::despawn(&mut self.goombas, cursor, d, physics, timeline);
        spawner::despawn(&mut self.turtles, cursor, d, physics, timeline);
        spawner::despawn(&mut self.special_pipes, cursor, d, physics, timeline);
        spawner::despawn(&mut self.chains, cursor, d, physics, timeline);
        spawner::despawn(&mut self.clouds, cursor, d, physics, timeline);
        spawner::despawn(&mut self.swords, cursor, d, physics, timeline);
    }

    fn scene(&self, out: &mut Vec<Sprite>) {
        let t = &self.tuning;
        let ch = &self.state.character;
        for c in &self.clouds {
            out.push(Sprite::centered(SpriteKind::Cloud, c, Vec3::new(0.5, 0.6, 2.0)));
        }
        out.push(Sprite::new(
            SpriteKind::Ground,
            Vec3::new(0.0, -0.5, self.state.camera.z),
            Vec3::new(2.0, 0.5 + t.ground_y, 60.0),
        ));
        out.push(Sprite::new(
            SpriteKind::Castle,
            Vec3::new(0.0, 3.0, self.castle_z),
            Vec3::new(2.0, 3.0, 3.0),
        ));
        for p in &self.pipes {
            out.push(Sprite::standing(SpriteKind::Pipe, p, Vec3::new(1.0, p.data.height / 2.0, 1.0)));
        }
        for p in &self.special_pipes {
            out.push(Sprite::standing(SpriteKind::Pipe, p, Vec3::new(1.0, t.special_height / 2.0, 1.0)));
        }
        for p in &self.plants {
            out.push(Sprite::standing(SpriteKind::Plant, p, Vec3::new(0.15, 0.65, 0.15)));
        }
        for c in &self.chains {
            out.push(Sprite::centered(SpriteKind::Chain, c, Vec3::new(0.2, 0.5, 0.2)));
        }
        for b in &self.bricks {
            out.push(Sprite::centered(SpriteKind::Brick, b, Vec3::splat(t.brick_size / 2.0)));
        }
        for b in &self.boxes {
            let kind = if b.data.opened {
                SpriteKind::GiftBoxOpened
            } else {
                SpriteKind::GiftBox
            };
            out.push(Sprite::centered(kind, b, Vec3::splat(0.25)));
        }
        for c in self.coins.iter().filter(|c| c.is_active()) {
            out.push(Sprite::centered(SpriteKind::Coin, c, Vec3::new(0.05, 0.25, 0.25)));
        }
        for i in self.items.iter().filter(|i| i.is_active()) {
            let kind = match i.data.kind {
                ItemKind::Heart => SpriteKind::Heart,
                ItemKind::Sword => SpriteKind::Sword,
                _ => SpriteKind::Mushroom,
            };
            out.push(Sprite::centered(kind, i, Vec3::splat(0.25)));
        }
        for g in &self.goombas {
            out.push(Sprite::standing(SpriteKind::Goomba, g, Vec3::new(0.75, 0.5, 0.75)));
        }
        for tu in &self.turtles {
            out.push(Sprite::standing(SpriteKind::Turtle, tu, Vec3::splat(0.5)));
        }
        for s in self.swords.iter().filter(|s| s.is_active()) {
            out.push(Sprite::centered(SpriteKind::Projectile, s, Vec3::new(0.1, 0.1, 0.3)));
        }
        let mut hero = Sprite::new(
            SpriteKind::Character,
            ch.pos + Vec3::new(0.0, ch.height / 2.0, 0.0),
            Vec3::new(0.25, ch.height / 2.0, 0.25),
        );
        hero.opacity = ch.opacity;
        out.push(hero);
    }

    fn hud(&self) -> Hud {
        let mut hud = Hud::new(LevelId::Overworld, self.state.phase).with_outcome(self.state.outcome);
        hud.lives = Some(self.state.character.vitality.current());
        hud.currency = self.state.currency;
        hud.score = self.state.score;
        hud.sword_charges = Some(self.sword_charges);
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

    fn level(seed: u64) -> Overworld {
        Overworld::new(seed, Assets::all(), OverworldTuning::default())
    }

    fn run(level: &mut Overworld, frames: usize, input: &TickInput) {
        tick(level, input, SIM_DT);
        let idle = TickInput::default();
        for _ in 1..frames {
            tick(level, &idle, SIM_DT);
        }
    }

    #[test]
    fn test_stomp_defeats_and_bounces() {
        let mut lvl = level(1);
        lvl.goombas.clear();
        let id = lvl.add_goomba(Vec3::new(0.0, 0.1, 10.0), Patrol::Walker);
        lvl.state.character.pos = Vec3::new(0.0, 0.9, 10.0);
        lvl.state.character.vy = -5.0;
        lvl.state.character.status.jumping = true;

        lvl.resolve_contacts();

        let goomba = lvl.goombas.iter().find(|g| g.id == id);
        assert!(goomba.is_some_and(|g| !g.is_active()));
        assert_eq!(lvl.state.score, lvl.tuning.points_goomba);
        assert!(lvl.state.character.vy > 0.0);
        assert_eq!(lvl.state.character.vitality.current(), 3);

        // The squash finishes and the goomba leaves its collection
        run(&mut lvl, 60, &TickInput::default());
        assert!(lvl.goombas.iter().all(|g| g.id != id));
    }

    #[test]
    fn test_goomba_contact_costs_one_life_then_invulnerable() {
        let mut lvl = level(2);
        lvl.goombas.clear();
        lvl.add_goomba(Vec3::new(0.0, 0.1, 5.0), Patrol::Walker);
        lvl.add_goomba(Vec3::new(0.0, 0.1, 5.2), Patrol::Walker);
        lvl.state.character.pos = Vec3::new(0.0, 0.1, 5.0);
        lvl.resolve_contacts();
        lvl.resolve_contacts();
        assert_eq!(lvl.state.character.vitality.current(), 2);
        assert!(lvl.state.character.status.is_invulnerable());
    }

    #[test]
    fn test_turtle_slows_without_damage() {
        let mut lvl = level(3);
        lvl.turtles.clear();
        lvl.add_turtle(Vec3::new(0.0, 0.1, 4.0), Patrol::Walker);
        lvl.state.character.pos = Vec3::new(0.0, 0.1, 4.0);
        let normal = lvl.speeds();
        lvl.resolve_contacts();
        assert!(lvl.state.character.status.slowed.active());
        assert_eq!(lvl.state.character.vitality.current(), 3);
        assert!(lvl.speeds().run < normal.run);
    }

    #[test]
    fn test_mushroom_then_hazard_strips_power_first() {
        let mut lvl = level(4);
        lvl.collect_item(ItemKind::Mushroom);
        assert!(lvl.state.character.status.powered_up.active());
        assert_eq!(lvl.state.character.height, lvl.tuning.power_height);
        lvl.hazard_hit();
        assert!(!lvl.state.character.status.powered_up.active());
        assert_eq!(lvl.state.character.vitality.current(), 3);
        // The blink ends, then the life goes
        run(&mut lvl, 240, &TickInput::default());
        assert_eq!(lvl.state.character.vitality.current(), 2);
        assert_eq!(lvl.state.character.height, lvl.tuning.character_height);
    }

    #[test]
    fn test_sword_charges_cap() {
        let mut lvl = level(5);
        lvl.collect_item(ItemKind::Sword);
        lvl.collect_item(ItemKind::Sword);
        lvl.collect_item(ItemKind::Sword);
        assert_eq!(lvl.sword_charges, lvl.tuning.sword_charge_cap);
    }

    #[test]
    fn test_sword_throw_needs_charge_and_hits() {
        let mut lvl = level(6);
        lvl.goombas.clear();
        lvl.throw_sword();
        assert!(lvl.swords.is_empty());

        lvl.sword_charges = 1;
        let id = lvl.add_goomba(Vec3::new(0.0, 0.1, 3.0), Patrol::Walker);
        let mut input = TickInput::default();
        input.press(Action::Attack);
        run(&mut lvl, 60, &input);
        assert_eq!(lvl.sword_charges, 0);
        assert!(lvl.goombas.iter().all(|g| g.id != id || !g.is_active()));
        assert_eq!(lvl.state.score, lvl.tuning.points_goomba);
    }

    #[test]
    fn test_castle_with_low_score_loses() {
        let mut lvl = level(7);
        lvl.state.character.pos.z = lvl.castle_z;
        lvl.check_goal();
        assert_eq!(lvl.state.outcome, Some(Outcome::GameOver(LossReason::LowScore)));
    }

    #[test]
    fn test_castle_with_enough_advances() {
        let mut lvl = level(8);
        lvl.state.score = 3100;
        lvl.state.currency = 150;
        lvl.state.character.pos.z = lvl.castle_z + 0.5;
        lvl.check_goal();
        assert_eq!(lvl.state.outcome, Some(Outcome::Advance(LevelId::Skyway)));
    }

    #[test]
    fn test_terminal_freezes_simulation() {
        let mut lvl = level(9);
        let mut forward = TickInput::default();
        forward.press(Action::Forward);
        run(&mut lvl, 120, &forward);
        lvl.state.end(Outcome::GameOver(LossReason::OutOfLives));
        let pos = lvl.state.character.pos;
        let goombas = lvl.goombas.len();
        let clock = lvl.state.clock;
        run(&mut lvl, 120, &forward);
        assert_eq!(lvl.state.character.pos, pos);
        assert_eq!(lvl.goombas.len(), goombas);
        assert_eq!(lvl.state.clock, clock);
        assert_eq!(lvl.state.phase, GamePhase::Ended);
    }

    #[test]
    fn test_missing_goomba_asset_never_spawns() {
        let assets = Assets::all().without(AssetKind::Goomba);
        let mut lvl = Overworld::new(10, assets, OverworldTuning::default());
        let mut forward = TickInput::default();
        forward.press(Action::Forward);
        run(&mut lvl, 600, &forward);
        assert!(lvl.goombas.is_empty());
        assert!(!lvl.bricks.is_empty());
    }

    #[test]
    fn test_working_set_stays_bounded() {
        let mut lvl = level(11);
        let mut forward = TickInput::default();
        forward.press(Action::Forward);
        let mut last_cursor = lvl.state.furthest_z;
        run(&mut lvl, 1, &forward);
        let idle = TickInput::default();
        for frame in 0..6000 {
            // Hop regularly to clear low obstacles
            let input = if frame % 90 == 0 {
                let mut jump = TickInput::default();
                jump.press(Action::Jump);
                jump
            } else {
                idle.clone()
            };
            tick(&mut lvl, &input, SIM_DT);
            if lvl.state.is_terminal() {
                break;
            }
            let cursor = lvl.state.furthest_z;
            assert!(cursor >= last_cursor);
            last_cursor = cursor;
            let t = &lvl.tuning;
            assert!(spawner::live_count(&lvl.pipes) <= t.pipes.max_live);
            assert!(spawner::live_count(&lvl.goombas) <= t.goombas.max_live);
            assert!(spawner::live_count(&lvl.turtles) <= t.turtles.max_live);
            assert!(spawner::live_count(&lvl.clouds) <= t.clouds.max_live);
            let horizon = cursor - t.cleanup_distance;
            assert!(lvl.goombas.iter().all(|g| g.pos.z >= horizon));
            assert!(lvl.bricks.iter().all(|b| b.pos.z >= horizon));
        }
        assert!(last_cursor > 0.0);
    }

    #[test]
    fn test_determinism() {
        let mut a = level(99999);
        let mut b = level(99999);
        let mut forward = TickInput::default();
        forward.press(Action::Forward);
        let mut jump = TickInput::default();
        jump.press(Action::Jump);
        let script = [forward, TickInput::default(), jump, TickInput::default()];
        for i in 0..1200 {
            let input = &script[(i / 300) % script.len()];
            tick(&mut a, input, SIM_DT);
            tick(&mut b, input, SIM_DT);
        }
        assert_eq!(a.state.character.pos, b.state.character.pos);
        assert_eq!(a.state.score, b.state.score);
        assert_eq!(a.goombas.len(), b.goombas.len());
        assert_eq!(a.pipes.len(), b.pipes.len());
    }
}
