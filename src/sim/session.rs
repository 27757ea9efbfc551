//! Level sequencing
//!
//! A [`Session`] owns the active level, forwards fixed steps to it and
//! performs the handoff to the next level after a win. Feedback events are
//! buffered here so the driver never loses the ones emitted on the frame a
//! level is swapped out.

use serde::{Deserialize, Serialize};

use super::controller::TickInput;
use super::events::GameEvent;
use super::levels::{Arena, ArenaTuning, Overworld, OverworldTuning, Skyway, SkywayTuning};
use super::scene::{Hud, Sprite};
use super::state::{AssetKind, Assets, Camera, GamePhase, LevelId, LevelState, Outcome};
use super::tick::{self, Level};

/// Tuning tables for every level
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelTunings {
    pub overworld: OverworldTuning,
    pub skyway: SkywayTuning,
    pub arena: ArenaTuning,
}

pub enum ActiveLevel {
    Overworld(Box<Overworld>),
    Skyway(Box<Skyway>),
    Arena(Box<Arena>),
}

/// Run `$body` with `$l` bound to the concrete level
macro_rules! each_level {
    ($level:expr, $l:ident => $body:expr) => {
        match $level {
            ActiveLevel::Overworld($l) => $body,
            ActiveLevel::Skyway($l) => $body,
            ActiveLevel::Arena($l) => $body,
        }
    };
}

/// A won level waiting out its delay before the next one starts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handoff {
    pub next: LevelId,
    pub remaining: f32,
}

pub struct Session {
    seed: u64,
    assets: Assets,
    tunings: LevelTunings,
    level: ActiveLevel,
    pending: Option<Handoff>,
    events: Vec<GameEvent>,
}

impl Session {
    pub fn new(seed: u64, assets: Assets) -> Self {
        Self::with_tunings(seed, assets, LevelTunings::default())
    }

    pub fn with_tunings(seed: u64, assets: Assets, tunings: LevelTunings) -> Self {
        let level = build(LevelId::Overworld, seed, &assets, &tunings);
        Self {
            seed,
            assets,
            tunings,
            level,
            pending: None,
            events: Vec::new(),
        }
    }

    pub fn level_id(&self) -> LevelId {
        self.state().level
    }

    pub fn level(&self) -> &ActiveLevel {
        &self.level
    }

    pub fn state(&self) -> &LevelState {
        each_level!(&self.level, l => l.state())
    }

    pub fn state_mut(&mut self) -> &mut LevelState {
        each_level!(&mut self.level, l => l.state_mut())
    }

    pub fn camera(&self) -> &Camera {
        &self.state().camera
    }

    pub fn pending_handoff(&self) -> Option<Handoff> {
        self.pending
    }

    /// Advance by one fixed step, then count down any pending handoff
    pub fn tick(&mut self, input: &TickInput, dt: f32) {
        if let Some(handoff) = &mut self.pending {
            handoff.remaining -= dt;
            if handoff.remaining <= 0.0 {
                let next = handoff.next;
                self.pending = None;
                self.enter(next);
            }
            return;
        }

        each_level!(&mut self.level, l => tick::tick(&mut **l, input, dt));

        let events = self.state_mut().take_events();
        for event in &events {
            if let GameEvent::LevelEnded(Outcome::Advance(next)) = *event {
                let delay = self.advance_delay();
                log::info!("Level {} won, level {} starts in {delay:.1}s", self.level_id().number(), next.number());
                self.pending = Some(Handoff {
                    next,
                    remaining: delay,
                });
            }
        }
        self.events.extend(events);
    }

    fn advance_delay(&self) -> f32 {
        match self.level {
            ActiveLevel::Overworld(_) => self.tunings.overworld.advance_delay,
            ActiveLevel::Skyway(_) => self.tunings.skyway.advance_delay,
            ActiveLevel::Arena(_) => 0.0,
        }
    }

    fn enter(&mut self, id: LevelId) {
        log::info!("➡️ Entering level {}", id.number());
        self.level = build(id, self.seed, &self.assets, &self.tunings);
    }

    /// Drop the current run and start over at level 1
    pub fn restart(&mut self) {
        self.pending = None;
        self.events.clear();
        self.enter(LevelId::Overworld);
    }

    /// Pause or resume from outside the input stream (page hidden)
    pub fn set_paused(&mut self, paused: bool) {
        let state = self.state_mut();
        match (state.phase, paused) {
            (GamePhase::Playing, true) => {
                state.phase = GamePhase::Paused;
                state.controls.release_all();
                log::info!("⏸️ Auto-paused");
            }
            (GamePhase::Paused, false) => state.phase = GamePhase::Playing,
            _ => {}
        }
    }

    /// An asset finished loading after the level was built
    pub fn asset_loaded(&mut self, kind: AssetKind) {
        self.assets.mark_loaded(kind);
        let state = self.state_mut();
        if kind == AssetKind::Character {
            state.character_loaded();
        } else {
            state.assets.mark_loaded(kind);
        }
    }

    /// Drain buffered feedback events
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn hud(&self) -> Hud {
        each_level!(&self.level, l => l.hud())
    }

    pub fn scene(&self) -> Vec<Sprite> {
        each_level!(&self.level, l => tick::scene_of(&**l))
    }
}

fn build(id: LevelId, seed: u64, assets: &Assets, tunings: &LevelTunings) -> ActiveLevel {
    let seed = seed.wrapping_add(id.number() as u64);
    let assets = assets.clone();
    match id {
        LevelId::Overworld => ActiveLevel::Overworld(Box::new(Overworld::new(seed, assets, tunings.overworld.clone()))),
        LevelId::Skyway => ActiveLevel::Skyway(Box::new(Skyway::new(seed, assets, tunings.skyway.clone()))),
        LevelId::Arena => ActiveLevel::Arena(Box::new(Arena::new(seed, assets, tunings.arena.clone()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::sim::controller::Action;
    use crate::sim::state::LossReason;
    use proptest::prelude::*;

    fn idle(session: &mut Session, secs: f32) {
        let input = TickInput::default();
        let frames = (secs / SIM_DT).round() as usize;
        for _ in 0..frames {
            session.tick(&input, SIM_DT);
        }
    }

    #[test]
    fn test_handoff_waits_for_delay() {
        let mut session = Session::new(1, Assets::all());
        session.state_mut().end(Outcome::Advance(LevelId::Skyway));
        idle(&mut session, 0.1);
        assert!(session.pending_handoff().is_some());
        idle(&mut session, 2.8);
        assert_eq!(session.level_id(), LevelId::Overworld);
        idle(&mut session, 0.2);
        assert_eq!(session.level_id(), LevelId::Skyway);
        assert_eq!(session.state().phase, GamePhase::Playing);
        assert!(session.hud().health_percent.is_some());

        let events = session.take_events();
        assert!(events.contains(&GameEvent::LevelEnded(Outcome::Advance(LevelId::Skyway))));
    }

    #[test]
    fn test_skyway_hands_over_faster() {
        let mut session = Session::new(2, Assets::all());
        session.enter(LevelId::Skyway);
        session.state_mut().end(Outcome::Advance(LevelId::Arena));
        idle(&mut session, 1.1);
        assert_eq!(session.level_id(), LevelId::Arena);
    }

    #[test]
    fn test_loss_stays_on_level() {
        let mut session = Session::new(3, Assets::all());
        session.state_mut().kill(LossReason::FellOffWorld);
        idle(&mut session, 5.0);
        assert_eq!(session.level_id(), LevelId::Overworld);
        assert!(session.pending_handoff().is_none());
        assert!(session.hud().end_message.is_some());
    }

    #[test]
    fn test_restart_rebuilds_first_level() {
        let mut session = Session::new(4, Assets::all());
        session.enter(LevelId::Arena);
        session.restart();
        assert_eq!(session.level_id(), LevelId::Overworld);
        assert_eq!(session.state().clock, 0.0);
    }

    #[test]
    fn test_late_character_asset_starts_level() {
        let mut session = Session::new(5, Assets::all().without(AssetKind::Character));
        idle(&mut session, 1.0);
        assert_eq!(session.state().phase, GamePhase::Loading);
        assert_eq!(session.state().clock, 0.0);
        session.asset_loaded(AssetKind::Character);
        idle(&mut session, 1.0);
        assert_eq!(session.state().phase, GamePhase::Playing);
        assert!(session.state().clock > 0.9);
    }

    #[test]
    fn test_auto_pause_freezes_clock() {
        let mut session = Session::new(6, Assets::all());
        idle(&mut session, 0.5);
        session.set_paused(true);
        let clock = session.state().clock;
        idle(&mut session, 1.0);
        assert_eq!(session.state().clock, clock);
        session.set_paused(false);
        idle(&mut session, 0.5);
        assert!(session.state().clock > clock);
    }

    fn scripted(seed: u64) -> Session {
        let mut session = Session::new(seed, Assets::all());
        for i in 0..1200 {
            let mut input = TickInput::default();
            match i % 240 {
                0 => input.press(Action::Forward),
                60 | 150 => input.press(Action::Jump),
                200 => input.press(Action::Attack),
                _ => {}
            }
            session.tick(&input, SIM_DT);
        }
        session
    }

    #[test]
    fn test_same_seed_same_run() {
        let a = scripted(2024);
        let b = scripted(2024);
        assert_eq!(a.state().character.pos, b.state().character.pos);
        assert_eq!(a.state().furthest_z, b.state().furthest_z);
        assert_eq!(a.hud(), b.hud());
        assert_eq!(a.scene(), b.scene());
    }

    fn action_strategy() -> impl Strategy<Value = (u8, bool)> {
        (0u8..6, any::<bool>())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]
        #[test]
        fn prop_cursor_never_decreases(seed in any::<u64>(), script in prop::collection::vec(action_strategy(), 1..60)) {
            let actions = [Action::Forward, Action::Backward, Action::Jump, Action::Guard, Action::Attack, Action::Fire];
            let mut session = Session::new(seed, Assets::all());
            let mut last = session.state().furthest_z;
            for (code, pressed) in script {
                let mut input = TickInput::default();
                let action = actions[code as usize % actions.len()];
                if pressed {
                    input.press(action);
                } else {
                    input.release(action);
                }
                for _ in 0..10 {
                    session.tick(&input, SIM_DT);
                    input.clear();
                    let z = session.state().furthest_z;
                    prop_assert!(z >= last);
                    last = z;
                }
            }
        }
    }
}
