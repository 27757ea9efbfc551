//! Per-frame level update
//!
//! Every level runs the same fixed order; levels supply the category-specific
//! pieces through the [`Level`] trait.

use super::animation::Clip;
use super::collision::{Solid, SolidResolution, resolve_solids};
use super::controller::{self, Action, Motion, Speeds, TickInput};
use super::events::Deferred;
use super::scene::{Hud, Sprite};
use super::state::{GamePhase, LevelState};
use super::timeline::{Sample, Target};
use crate::consts::*;

/// Category-specific behavior of one level
pub trait Level {
    /// Key identifying which solid the character touched
    type Key: Copy;

    fn state(&self) -> &LevelState;
    fn state_mut(&mut self) -> &mut LevelState;

    fn motion(&self) -> Motion;
    fn speeds(&self) -> Speeds;

    /// Handle a pressed action other than movement and pause
    fn on_press(&mut self, action: Action);

    /// Write a tween sample onto an entity
    fn apply_sample(&mut self, sample: &Sample);

    fn handle_deferred(&mut self, event: Deferred);

    /// A one-shot clip finished playing
    fn on_clip_finished(&mut self, _clip: Clip) {}

    /// Script-driven entity behavior and status timers
    fn update_entities(&mut self, dt: f32);

    fn spawn(&mut self);

    fn solids(&self) -> Vec<Solid<Self::Key>>;

    /// React to the solid pass after motion was integrated
    fn on_solids(&mut self, _resolution: &SolidResolution<Self::Key>, _dt: f32) {}

    /// Hostile and pickup resolution against the final position
    fn resolve_contacts(&mut self);

    /// Win conditions
    fn check_goal(&mut self);

    fn cleanup(&mut self);

    fn scene(&self, out: &mut Vec<Sprite>);

    fn hud(&self) -> Hud;
}

/// Advance a level by one fixed step
pub fn tick<L: Level>(level: &mut L, input: &TickInput, dt: f32) {
    let state = level.state_mut();

    // Handle pause toggle
    if input.was_pressed(Action::Pause) {
        match state.phase {
            GamePhase::Playing => {
                state.phase = GamePhase::Paused;
                state.controls.release_all();
                log::info!("⏸️ Paused");
                return;
            }
            GamePhase::Paused => {
                state.phase = GamePhase::Playing;
                log::info!("▶️ Resumed");
            }
            _ => {}
        }
    }

    if state.phase != GamePhase::Playing {
        return;
    }

    state.clock += dt;
    state.deferred.advance(dt);
    state.controls.apply(input);
    state.physics.step(PHYSICS_DT, dt, PHYSICS_MAX_SUBSTEPS);

    if let Some(clip) = state.animator.update(dt) {
        if clip == Clip::Punching {
            state.character.status.punching = false;
        }
        level.on_clip_finished(clip);
    }

    advance_timeline(level, dt);

    for action in &input.pressed {
        if level.state().is_terminal() {
            return;
        }
        match action {
            Action::Forward | Action::Backward | Action::Pause => {}
            other => level.on_press(*other),
        }
    }

    let due = level.state_mut().deferred.drain_due();
    for event in due {
        if level.state().is_terminal() {
            return;
        }
        level.handle_deferred(event);
    }
    if level.state().is_terminal() {
        return;
    }

    level.update_entities(dt);
    level.spawn();

    let motion = level.motion();
    let speeds = level.speeds();
    let probe = controller::probe(level.state(), &motion, &speeds, dt);
    let solids = level.solids();
    let resolution = resolve_solids(&probe, &solids);
    {
        let state = level.state_mut();
        controller::move_horizontal(state, &motion, &speeds, &resolution, dt);
        controller::integrate_vertical(state, &motion, &resolution, dt);
        let z = state.character.pos.z;
        state.advance_cursor(z);
        controller::check_fall(state, &motion);
    }
    level.on_solids(&resolution, dt);
    if level.state().is_terminal() {
        return;
    }

    level.resolve_contacts();
    if level.state().is_terminal() {
        return;
    }
    level.check_goal();

    let state = level.state_mut();
    update_camera(state, dt);
    controller::update_clip(state);
    level.cleanup();
}

fn advance_timeline<L: Level>(level: &mut L, dt: f32) {
    let state = level.state_mut();
    let samples = state.timeline.advance(dt, &mut state.deferred);
    for sample in &samples {
        match sample.target {
            Target::Character => level.state_mut().character.apply(sample.prop, sample.value),
            Target::Camera => level.state_mut().camera.shake_offset = sample.value,
            Target::Entity(_) => level.apply_sample(sample),
        }
    }
}

/// Trail the character; apply shake while it lasts
fn update_camera(state: &mut LevelState, dt: f32) {
    let ch = &state.character;
    state.camera.z = ch.pos.z;
    state.camera.y = ch.pos.y + CAMERA_HEIGHT;
    if state.camera.shake.active() {
        let t = state.clock;
        let fade = state.camera.shake.remaining();
        state.camera.shake_offset = (t * 40.0).sin() * state.camera.shake_intensity * 0.1 * fade.min(1.0);
    }
    if state.camera.shake.tick(dt) {
        state.camera.shake_offset = 0.0;
    }
}

/// Collect the scene for rendering
pub fn scene_of<L: Level>(level: &L) -> Vec<Sprite> {
    let mut out = Vec::with_capacity(256);
    level.scene(&mut out);
    out
}
