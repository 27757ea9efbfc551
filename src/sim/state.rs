//! Level state and core simulation types
//!
//! Everything a level mutates per frame hangs off [`LevelState`]. Subsystems
//! take it explicitly instead of reaching for module-level counters, so each
//! one can be exercised against a synthetic state in tests.

use std::collections::BTreeSet;

use glam::Vec3;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::animation::Animator;
use super::collision::Aabb;
use super::controller::ControlState;
use super::events::{Deferred, EventQueue, GameEvent};
use super::physics::{BodyHandle, PhysicsWorld};
use super::timeline::{Prop, Timeline};

/// Spawn-order identifier. Category collections stay sorted by it.
pub type EntityId = u32;

/// The three levels, in play order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelId {
    Overworld,
    Skyway,
    Arena,
}

impl LevelId {
    /// Level that follows a win, if any
    pub fn next(self) -> Option<LevelId> {
        match self {
            LevelId::Overworld => Some(LevelId::Skyway),
            LevelId::Skyway => Some(LevelId::Arena),
            LevelId::Arena => None,
        }
    }

    pub fn number(self) -> u32 {
        match self {
            LevelId::Overworld => 1,
            LevelId::Skyway => 2,
            LevelId::Arena => 3,
        }
    }
}

/// Current phase of a level instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Character asset not available yet; every system is quiescent
    Loading,
    /// Active gameplay
    Playing,
    /// Paused by the player or by losing page focus
    Paused,
    /// Terminal state reached; see [`LevelState::outcome`]
    Ended,
}

/// Why a level was lost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LossReason {
    OutOfLives,
    OutOfHealth,
    FellOffWorld,
    LowScore,
    MissingPotion,
}

impl LossReason {
    pub fn message(self) -> &'static str {
        match self {
            LossReason::OutOfLives => "Out of lives",
            LossReason::OutOfHealth => "Out of health",
            LossReason::FellOffWorld => "You fell off the world",
            LossReason::LowScore => "Score 3000+ and 150 coins needed to pass",
            LossReason::MissingPotion => "The pipe needs the potion",
        }
    }
}

/// How a level ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Won, hand off to the given level
    Advance(LevelId),
    /// Won the final level
    Victory,
    /// Lost
    GameOver(LossReason),
}

/// Which way the character faces along z
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Facing {
    #[default]
    Forward,
    Backward,
}

impl Facing {
    /// +1 forward, -1 backward
    #[inline]
    pub fn sign(self) -> f32 {
        match self {
            Facing::Forward => 1.0,
            Facing::Backward => -1.0,
        }
    }
}

/// Lives (level 1) or a health pool (levels 2 and 3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Vitality {
    Lives { current: u32, max: u32 },
    Health { current: u32, max: u32 },
}

impl Vitality {
    pub fn is_depleted(&self) -> bool {
        match *self {
            Vitality::Lives { current, .. } | Vitality::Health { current, .. } => current == 0,
        }
    }

    /// Remove one life, or `amount` health clamped at zero
    fn take(&mut self, amount: u32) {
        match self {
            Vitality::Lives { current, .. } => *current = current.saturating_sub(1),
            Vitality::Health { current, .. } => *current = current.saturating_sub(amount),
        }
    }

    /// Add one life or `amount` health. Returns false when already full.
    pub fn restore(&mut self, amount: u32) -> bool {
        match self {
            Vitality::Lives { current, max } => {
                if *current >= *max {
                    return false;
                }
                *current += 1;
            }
            Vitality::Health { current, max } => {
                if *current >= *max {
                    return false;
                }
                *current = (*current + amount).min(*max);
            }
        }
        true
    }

    fn drain(&mut self) {
        match self {
            Vitality::Lives { current, .. } | Vitality::Health { current, .. } => *current = 0,
        }
    }

    /// Fraction of the pool remaining, 0..=100
    pub fn percent(&self) -> u32 {
        match *self {
            Vitality::Lives { current, max } | Vitality::Health { current, max } => {
                if max == 0 { 0 } else { current * 100 / max }
            }
        }
    }

    pub fn current(&self) -> u32 {
        match *self {
            Vitality::Lives { current, .. } | Vitality::Health { current, .. } => current,
        }
    }
}

/// A count-down timer; inactive at zero
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Countdown {
    remaining: f32,
}

impl Countdown {
    pub fn start(&mut self, secs: f32) {
        self.remaining = secs.max(0.0);
    }

    pub fn clear(&mut self) {
        self.remaining = 0.0;
    }

    #[inline]
    pub fn active(&self) -> bool {
        self.remaining > 0.0
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    /// Advance; returns true on the tick it runs out
    pub fn tick(&mut self, dt: f32) -> bool {
        if self.remaining <= 0.0 {
            return false;
        }
        self.remaining -= dt;
        if self.remaining <= 0.0 {
            self.remaining = 0.0;
            return true;
        }
        false
    }
}

/// Transient character status
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Status {
    pub invulnerable: Countdown,
    pub powered_up: Countdown,
    pub slowed: Countdown,
    /// Power-up is being stripped by a hazard hit
    pub powering_down: bool,
    pub jumping: bool,
    pub punching: bool,
    /// Input is ignored while a scripted move plays (pipe entry)
    pub scripted: bool,
}

impl Status {
    pub fn is_invulnerable(&self) -> bool {
        self.invulnerable.active()
    }
}

/// The player character
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    /// Feet position
    pub pos: Vec3,
    pub facing: Facing,
    pub vy: f32,
    pub vitality: Vitality,
    pub status: Status,
    pub height: f32,
    pub half_width: f32,
    pub opacity: f32,
    pub scale: f32,
}

impl Character {
    pub fn new(pos: Vec3, vitality: Vitality) -> Self {
        Self {
            pos,
            facing: Facing::Forward,
            vy: 0.0,
            vitality,
            status: Status::default(),
            height: 1.0,
            half_width: 0.2,
            opacity: 1.0,
            scale: 1.0,
        }
    }

    /// Box around the character with feet at `pos.y`
    pub fn hit_box(&self, half: Vec3) -> Aabb {
        Aabb::new(self.pos + Vec3::new(0.0, half.y, 0.0), half)
    }

    pub fn apply(&mut self, prop: Prop, value: f32) {
        match prop {
            Prop::Y => self.pos.y = value,
            Prop::Z => self.pos.z = value,
            Prop::Scale => self.scale = value,
            Prop::Opacity => self.opacity = value,
        }
    }
}

/// Lifecycle of a spawned entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Life {
    #[default]
    Active,
    /// Defeated and playing its exit animation; no longer interacts
    Dying,
    /// Collected or finished dying; swept at the end of the frame
    Consumed,
}

/// A spawned entity: shared pose and handles plus category payload `T`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity<T> {
    pub id: EntityId,
    /// Cached world position of the visual
    pub pos: Vec3,
    pub scale: f32,
    pub opacity: f32,
    /// Collision body, if the entity has one
    #[serde(skip)]
    pub body: Option<BodyHandle>,
    pub life: Life,
    pub data: T,
}

impl<T> Entity<T> {
    pub fn new(id: EntityId, pos: Vec3, data: T) -> Self {
        Self {
            id,
            pos,
            scale: 1.0,
            opacity: 1.0,
            body: None,
            life: Life::Active,
            data,
        }
    }

    pub fn with_body(mut self, body: BodyHandle) -> Self {
        self.body = Some(body);
        self
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.life == Life::Active
    }

    pub fn consume(&mut self) {
        self.life = Life::Consumed;
    }

    pub fn defeat(&mut self) {
        self.life = Life::Dying;
    }

    pub fn apply(&mut self, prop: Prop, value: f32) {
        match prop {
            Prop::Y => self.pos.y = value,
            Prop::Z => self.pos.z = value,
            Prop::Scale => self.scale = value,
            Prop::Opacity => self.opacity = value,
        }
    }
}

/// Find an entity by id in a collection sorted by id
pub fn find_mut<T>(items: &mut [Entity<T>], id: EntityId) -> Option<&mut Entity<T>> {
    items
        .binary_search_by_key(&id, |e| e.id)
        .ok()
        .map(move |i| &mut items[i])
}

/// Apply a sampled property to the entity with `id`, if present
pub fn apply_to<T>(items: &mut [Entity<T>], id: EntityId, prop: Prop, value: f32) -> bool {
    match find_mut(items, id) {
        Some(entity) => {
            entity.apply(prop, value);
            true
        }
        None => false,
    }
}

/// Asset kinds a level may depend on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AssetKind {
    Character,
    Goomba,
    Turtle,
    Plant,
    Chain,
    Monster,
    Boss,
    Item,
}

/// Assets that finished loading. Categories whose asset is missing never spawn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Assets {
    loaded: BTreeSet<AssetKind>,
}

impl Assets {
    pub fn all() -> Self {
        use AssetKind::*;
        Self {
            loaded: [Character, Goomba, Turtle, Plant, Chain, Monster, Boss, Item]
                .into_iter()
                .collect(),
        }
    }

    pub fn without(mut self, kind: AssetKind) -> Self {
        self.loaded.remove(&kind);
        self
    }

    pub fn mark_loaded(&mut self, kind: AssetKind) {
        self.loaded.insert(kind);
    }

    #[inline]
    pub fn has(&self, kind: AssetKind) -> bool {
        self.loaded.contains(&kind)
    }
}

/// Seeded RNG wrapper
#[derive(Debug, Clone)]
pub struct RngState {
    pub seed: u64,
    inner: Pcg32,
}

impl RngState {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            inner: Pcg32::seed_from_u64(seed),
        }
    }

    /// Uniform in [0, 1)
    pub fn unit(&mut self) -> f32 {
        self.inner.random::<f32>()
    }

    /// Uniform in [lo, hi); returns `lo` for an empty range
    pub fn range(&mut self, lo: f32, hi: f32) -> f32 {
        if hi <= lo {
            return lo;
        }
        self.inner.random_range(lo..hi)
    }

    /// Uniform in [-spread, spread)
    pub fn jitter(&mut self, spread: f32) -> f32 {
        self.range(-spread, spread)
    }

    pub fn chance(&mut self, p: f32) -> bool {
        self.unit() < p
    }

    /// Uniform index in [0, len); `len` must be non-zero
    pub fn index(&mut self, len: usize) -> usize {
        self.inner.random_range(0..len.max(1))
    }

    /// Uniform integer in [lo, hi]
    pub fn int(&mut self, lo: u32, hi: u32) -> u32 {
        if hi <= lo {
            return lo;
        }
        self.inner.random_range(lo..=hi)
    }

    /// Shuffle in place
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.inner);
    }
}

/// Side-view camera trailing the character
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Camera {
    pub z: f32,
    pub y: f32,
    pub shake: Countdown,
    pub shake_intensity: f32,
    /// Offset applied this frame by the shake
    pub shake_offset: f32,
}

/// Result of routing a hostile hit through [`LevelState::hurt`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitResult {
    /// Blocked by invulnerability or a terminal state
    Ignored,
    Damaged,
    /// The hit emptied the pool and ended the level
    Fatal,
}

/// Shared per-level state, owned by the level and passed to every subsystem
#[derive(Debug, Clone)]
pub struct LevelState {
    pub level: LevelId,
    pub phase: GamePhase,
    /// Set exactly once, together with [`GamePhase::Ended`]
    pub outcome: Option<Outcome>,
    /// Seconds since the level started playing
    pub clock: f32,
    /// Furthest z the character has reached; never decreases
    pub furthest_z: f32,
    pub character: Character,
    /// Invulnerability granted by a lost life
    pub hit_invulnerability: f32,
    pub controls: ControlState,
    pub animator: Animator,
    pub physics: PhysicsWorld,
    pub timeline: Timeline,
    pub deferred: EventQueue<Deferred>,
    pub camera: Camera,
    pub rng: RngState,
    pub assets: Assets,
    pub score: u32,
    /// Coins or diamonds
    pub currency: u32,
    events: Vec<GameEvent>,
    next_id: EntityId,
}

impl LevelState {
    pub fn new(level: LevelId, seed: u64, assets: Assets, character: Character) -> Self {
        let phase = if assets.has(AssetKind::Character) {
            GamePhase::Playing
        } else {
            log::warn!("Character asset missing, level {} stays idle", level.number());
            GamePhase::Loading
        };
        let furthest_z = character.pos.z;
        Self {
            level,
            phase,
            outcome: None,
            clock: 0.0,
            furthest_z,
            camera: Camera {
                z: character.pos.z,
                y: character.pos.y,
                ..Default::default()
            },
            character,
            hit_invulnerability: 0.0,
            controls: ControlState::default(),
            animator: Animator::default(),
            physics: PhysicsWorld::new(),
            timeline: Timeline::default(),
            deferred: EventQueue::default(),
            rng: RngState::new(seed),
            assets,
            score: 0,
            currency: 0,
            events: Vec::new(),
            next_id: 1,
        }
    }

    /// Get next entity ID
    pub fn next_entity_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.phase == GamePhase::Ended
    }

    /// Character asset loaded late; start playing
    pub fn character_loaded(&mut self) {
        self.assets.mark_loaded(AssetKind::Character);
        if self.phase == GamePhase::Loading {
            self.phase = GamePhase::Playing;
        }
    }

    /// Raise the progress cursor to `z` if it is further
    pub fn advance_cursor(&mut self, z: f32) {
        if z > self.furthest_z {
            self.furthest_z = z;
        }
    }

    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Drain feedback events for the driver
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn pending_events(&self) -> &[GameEvent] {
        &self.events
    }

    /// Enter the terminal state. Only the first call has any effect.
    pub fn end(&mut self, outcome: Outcome) -> bool {
        if self.outcome.is_some() {
            return false;
        }
        self.outcome = Some(outcome);
        self.phase = GamePhase::Ended;
        self.timeline.cancel_all();
        self.deferred.clear();
        self.controls.release_all();
        log::info!("🏁 Level {} ended: {:?}", self.level.number(), outcome);
        self.emit(GameEvent::LevelEnded(outcome));
        true
    }

    /// Route a hostile hit through invulnerability and the vitality pool
    pub fn hurt(&mut self, amount: u32) -> HitResult {
        if self.is_terminal()
            || self.character.status.is_invulnerable()
            || self.character.vitality.is_depleted()
        {
            return HitResult::Ignored;
        }
        self.character.vitality.take(amount);
        let remaining = self.character.vitality.current();
        self.emit(GameEvent::Damaged { amount, remaining });
        if self.character.vitality.is_depleted() {
            let reason = match self.character.vitality {
                Vitality::Lives { .. } => LossReason::OutOfLives,
                Vitality::Health { .. } => LossReason::OutOfHealth,
            };
            self.end(Outcome::GameOver(reason));
            return HitResult::Fatal;
        }
        if self.hit_invulnerability > 0.0 {
            let secs = self.hit_invulnerability;
            self.character.status.invulnerable.start(secs);
        }
        HitResult::Damaged
    }

    /// Fatal condition that bypasses invulnerability and cooldowns
    pub fn kill(&mut self, reason: LossReason) {
        if self.is_terminal() {
            return;
        }
        self.character.vitality.drain();
        self.end(Outcome::GameOver(reason));
    }

    pub fn award(&mut self, points: u32) {
        self.score += points;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn health_state(current: u32) -> LevelState {
        let character = Character::new(Vec3::ZERO, Vitality::Health { current, max: 100 });
        LevelState::new(LevelId::Skyway, 7, Assets::all(), character)
    }

    #[test]
    fn test_fatal_hit_ends_once() {
        let mut state = health_state(10);
        assert_eq!(state.hurt(10), HitResult::Fatal);
        assert_eq!(state.character.vitality.current(), 0);
        assert!(state.is_terminal());
        // A second overlapping hit in the same frame changes nothing
        assert_eq!(state.hurt(10), HitResult::Ignored);
        assert_eq!(state.character.vitality.current(), 0);
        let ends = state
            .take_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::LevelEnded(_)))
            .count();
        assert_eq!(ends, 1);
        assert_eq!(state.outcome, Some(Outcome::GameOver(LossReason::OutOfHealth)));
    }

    #[test]
    fn test_invulnerability_blocks_damage() {
        let character = Character::new(Vec3::ZERO, Vitality::Lives { current: 3, max: 3 });
        let mut state = LevelState::new(LevelId::Overworld, 1, Assets::all(), character);
        state.hit_invulnerability = 2.0;
        assert_eq!(state.hurt(1), HitResult::Damaged);
        for _ in 0..5 {
            assert_eq!(state.hurt(1), HitResult::Ignored);
        }
        assert_eq!(state.character.vitality.current(), 2);
    }

    #[test]
    fn test_end_is_set_once() {
        let mut state = health_state(50);
        assert!(state.end(Outcome::Victory));
        assert!(!state.end(Outcome::GameOver(LossReason::OutOfHealth)));
        assert_eq!(state.outcome, Some(Outcome::Victory));
    }

    #[test]
    fn test_cursor_never_decreases() {
        let mut state = health_state(50);
        state.advance_cursor(12.0);
        state.advance_cursor(4.0);
        assert_eq!(state.furthest_z, 12.0);
    }

    #[test]
    fn test_restore_caps() {
        let mut lives = Vitality::Lives { current: 3, max: 3 };
        assert!(!lives.restore(1));
        let mut health = Vitality::Health { current: 90, max: 100 };
        assert!(health.restore(20));
        assert_eq!(health.current(), 100);
        assert!(!health.restore(20));
    }

    #[test]
    fn test_missing_character_asset_is_quiescent() {
        let character = Character::new(Vec3::ZERO, Vitality::Health { current: 100, max: 100 });
        let assets = Assets::all().without(AssetKind::Character);
        let mut state = LevelState::new(LevelId::Arena, 3, assets, character);
        assert_eq!(state.phase, GamePhase::Loading);
        state.character_loaded();
        assert_eq!(state.phase, GamePhase::Playing);
    }

    #[test]
    fn test_rng_is_seeded() {
        let mut a = RngState::new(42);
        let mut b = RngState::new(42);
        for _ in 0..10 {
            assert_eq!(a.range(0.0, 5.0), b.range(0.0, 5.0));
        }
    }

    #[test]
    fn test_shuffle_is_seeded_permutation() {
        let mut a = RngState::new(3);
        let mut b = RngState::new(3);
        let mut xs: Vec<u32> = (0..20).collect();
        let mut ys = xs.clone();
        a.shuffle(&mut xs);
        b.shuffle(&mut ys);
        assert_eq!(xs, ys);
        let mut sorted = xs.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..20).collect::<Vec<u32>>());
    }
}
