//! Character controller
//!
//! Turns press/release edges into held directions, integrates horizontal and
//! vertical motion against the solid pass, and picks the animation clip.

use serde::{Deserialize, Serialize};

use super::animation::Clip;
use super::collision::{LandingBand, Probe, SolidResolution};
use super::events::GameEvent;
use super::state::{Facing, LevelState, LossReason};
use crate::consts::*;

/// Logical input actions, produced from key edges by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Action {
    Forward,
    Backward,
    Jump,
    Guard,
    Attack,
    Fire,
    Pause,
}

/// Edges collected since the previous tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    pub pressed: Vec<Action>,
    pub released: Vec<Action>,
}

impl TickInput {
    pub fn press(&mut self, action: Action) {
        self.pressed.push(action);
    }

    pub fn release(&mut self, action: Action) {
        self.released.push(action);
    }

    pub fn was_pressed(&self, action: Action) -> bool {
        self.pressed.contains(&action)
    }

    pub fn clear(&mut self) {
        self.pressed.clear();
        self.released.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.pressed.is_empty() && self.released.is_empty()
    }
}

/// Held directions, updated only from edges
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ControlState {
    pub forward: bool,
    pub backward: bool,
}

impl ControlState {
    pub fn apply(&mut self, input: &TickInput) {
        for action in &input.pressed {
            match action {
                Action::Forward => self.forward = true,
                Action::Backward => self.backward = true,
                _ => {}
            }
        }
        for action in &input.released {
            match action {
                Action::Forward => self.forward = false,
                Action::Backward => self.backward = false,
                _ => {}
            }
        }
    }

    pub fn release_all(&mut self) {
        self.forward = false;
        self.backward = false;
    }

    /// Forward wins when both are held
    pub fn direction(&self) -> Option<Facing> {
        if self.forward {
            Some(Facing::Forward)
        } else if self.backward {
            Some(Facing::Backward)
        } else {
            None
        }
    }
}

/// Controller state machine, derived from the character each frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveState {
    Idle,
    RunForward,
    RunBackward,
    Jumping,
    Attacking,
}

/// Retreat bound behind the cursor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Backtrack {
    /// Max distance the character may retreat behind the cursor
    pub limit: f32,
    /// Where the character lands, behind the cursor, on crossing the limit
    pub snap: f32,
}

/// Per-level motion constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Motion {
    pub gravity: f32,
    pub jump_velocity: f32,
    /// Fallback support height when over no obstacle
    pub ground_y: f32,
    pub backtrack: Option<Backtrack>,
    /// Hard lower bound on z
    pub min_z: Option<f32>,
    /// Falling below this is fatal
    pub fall_y: Option<f32>,
    pub band: LandingBand,
}

/// Current horizontal speeds after stages and modifiers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Speeds {
    pub run: f32,
    pub back: f32,
}

impl Speeds {
    pub fn for_direction(&self, dir: Facing) -> f32 {
        match dir {
            Facing::Forward => self.run,
            Facing::Backward => self.back,
        }
    }
}

pub fn move_state(state: &LevelState) -> MoveState {
    let ch = &state.character;
    if ch.status.punching {
        MoveState::Attacking
    } else if ch.status.jumping {
        MoveState::Jumping
    } else {
        match state.controls.direction() {
            Some(Facing::Forward) => MoveState::RunForward,
            Some(Facing::Backward) => MoveState::RunBackward,
            None => MoveState::Idle,
        }
    }
}

/// Probe for the solid pass using this frame's intended motion
pub fn probe(state: &LevelState, motion: &Motion, speeds: &Speeds, dt: f32) -> Probe {
    let ch = &state.character;
    let moving = if ch.status.scripted {
        None
    } else {
        state.controls.direction()
    };
    Probe {
        pos: ch.pos,
        vy: ch.vy,
        height: ch.height,
        half_width: ch.half_width,
        moving,
        step: moving.map(|d| speeds.for_direction(d) * dt).unwrap_or(0.0),
        band: motion.band,
    }
}

/// Start a jump if grounded. Exclusive actions defer it.
pub fn try_jump(state: &mut LevelState, motion: &Motion) -> bool {
    let ch = &mut state.character;
    if ch.status.jumping || ch.status.punching || ch.status.scripted {
        return false;
    }
    ch.vy = motion.jump_velocity;
    ch.status.jumping = true;
    state.animator.set_action(Clip::Jumping, JUMP_TIME_SCALE);
    state.emit(GameEvent::Jumped);
    true
}

/// Start the exclusive attack clip. Ignored while another one plays.
pub fn try_attack(state: &mut LevelState) -> bool {
    if state.animator.is_exclusive() || state.character.status.scripted {
        return false;
    }
    state.character.status.punching = true;
    state.animator.set_action(Clip::Punching, 1.0);
    true
}

/// Apply horizontal motion; the solid pass already clamped blocked moves
pub fn move_horizontal<K>(
    state: &mut LevelState,
    motion: &Motion,
    speeds: &Speeds,
    solids: &SolidResolution<K>,
    dt: f32,
) {
    if state.character.status.scripted {
        return;
    }
    let Some(dir) = state.controls.direction() else {
        return;
    };
    let furthest = state.furthest_z;
    let ch = &mut state.character;
    ch.facing = dir;
    if let Some(blocked) = &solids.blocked {
        ch.pos.z = blocked.clamp_z;
        return;
    }
    let mut z = ch.pos.z + dir.sign() * speeds.for_direction(dir) * dt;
    if dir == Facing::Backward {
        if let Some(min_z) = motion.min_z {
            z = z.max(min_z);
        }
        z = z.min(ch.pos.z);
        if let Some(back) = motion.backtrack {
            if z < furthest - back.limit {
                z = furthest - back.snap;
            }
        }
    }
    ch.pos.z = z;
}

/// Integrate gravity against this frame's support and ceiling.
/// Returns true on the frame the character lands.
pub fn integrate_vertical<K>(state: &mut LevelState, motion: &Motion, solids: &SolidResolution<K>, dt: f32) -> bool {
    if state.character.status.scripted {
        return false;
    }
    let ch = &mut state.character;
    let base = solids.support.as_ref().map(|s| s.top).unwrap_or(motion.ground_y);

    if let Some(ceiling) = &solids.ceiling {
        ch.pos.y = ceiling.bottom - ch.height;
        ch.vy = ceiling.response.apply(ch.vy);
    }

    let mut landed = false;
    if ch.status.jumping || ch.pos.y > base || ch.vy > 0.0 {
        ch.vy -= motion.gravity * dt;
        ch.pos.y += ch.vy * dt;
        if ch.pos.y <= base && ch.vy <= 0.0 {
            ch.pos.y = base;
            ch.vy = 0.0;
            landed = ch.status.jumping;
            ch.status.jumping = false;
        }
    } else {
        ch.pos.y = base;
        ch.vy = 0.0;
    }
    landed
}

/// Fatal fall check; bypasses invulnerability
pub fn check_fall(state: &mut LevelState, motion: &Motion) {
    if let Some(fall_y) = motion.fall_y {
        if state.character.pos.y < fall_y {
            state.kill(LossReason::FellOffWorld);
        }
    }
}

/// Pick the looping clip for the current move state. Exclusive clips keep
/// playing until their finish event.
pub fn update_clip(state: &mut LevelState) {
    if state.animator.is_exclusive() {
        return;
    }
    let (clip, scale) = match move_state(state) {
        MoveState::Jumping => (Clip::Jumping, JUMP_TIME_SCALE),
        MoveState::RunForward => (Clip::Running, RUN_FORWARD_TIME_SCALE),
        MoveState::RunBackward => (Clip::Running, RUN_BACKWARD_TIME_SCALE),
        MoveState::Idle | MoveState::Attacking => (Clip::Idle, IDLE_TIME_SCALE),
    };
    state.animator.set_action(clip, scale);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::collision::{Aabb, HeadResponse, Solid, resolve_solids};
    use crate::sim::state::{Assets, Character, LevelId, Vitality};
    use glam::Vec3;

    fn motion() -> Motion {
        Motion {
            gravity: 25.82,
            jump_velocity: 17.0,
            ground_y: 0.1,
            backtrack: Some(Backtrack { limit: 8.0, snap: 5.0 }),
            min_z: None,
            fall_y: None,
            band: LandingBand::default(),
        }
    }

    fn state_at(pos: Vec3) -> LevelState {
        let character = Character::new(pos, Vitality::Lives { current: 3, max: 3 });
        LevelState::new(LevelId::Overworld, 1, Assets::all(), character)
    }

    fn brick(z: f32, y: f32) -> Solid<u32> {
        Solid {
            key: 0,
            aabb: Aabb::new(Vec3::new(0.0, y, z), Vec3::new(0.5, 0.5, 0.3)),
            land: true,
            side: true,
            head: Some(HeadResponse::Knock(-17.0 * 0.8)),
        }
    }

    fn frame(state: &mut LevelState, solids: &[Solid<u32>], dt: f32) -> bool {
        let speeds = Speeds { run: 7.0, back: 5.0 };
        let m = motion();
        let res = resolve_solids(&probe(state, &m, &speeds, dt), solids);
        move_horizontal(state, &m, &speeds, &res, dt);
        integrate_vertical(state, &m, &res, dt)
    }

    #[test]
    fn test_landing_on_top_surface() {
        let mut state = state_at(Vec3::new(0.0, 3.6, 0.0));
        state.character.status.jumping = true;
        state.character.vy = -5.0;
        let solids = [brick(0.0, 2.5)];
        let mut landed = false;
        for _ in 0..120 {
            landed |= frame(&mut state, &solids, 1.0 / 120.0);
        }
        assert!(landed);
        assert_eq!(state.character.pos.y, 3.0);
        assert_eq!(state.character.vy, 0.0);
        assert!(!state.character.status.jumping);
    }

    #[test]
    fn test_jump_arc_returns_to_ground() {
        let mut state = state_at(Vec3::new(0.0, 0.1, 0.0));
        assert!(try_jump(&mut state, &motion()));
        assert!(!try_jump(&mut state, &motion()));
        let mut peak: f32 = 0.0;
        for _ in 0..240 {
            frame(&mut state, &[], 1.0 / 120.0);
            peak = peak.max(state.character.pos.y);
        }
        // v^2 / 2g above ground
        assert!((peak - (0.1 + 17.0 * 17.0 / (2.0 * 25.82))).abs() < 0.15);
        assert_eq!(state.character.pos.y, 0.1);
    }

    #[test]
    fn test_backtrack_snaps_behind_cursor() {
        let mut state = state_at(Vec3::new(0.0, 0.1, 40.0));
        state.advance_cursor(40.0);
        state.controls.backward = true;
        let mut snaps = 0;
        let mut last = state.character.pos.z;
        for _ in 0..600 {
            frame(&mut state, &[], 1.0 / 120.0);
            let z = state.character.pos.z;
            assert!(z >= 32.0 - 1e-4);
            if z > last {
                assert_eq!(z, 35.0);
                snaps += 1;
            }
            last = z;
        }
        assert!(snaps > 0);
        assert_eq!(state.character.facing, Facing::Backward);
    }

    #[test]
    fn test_support_with_owned_key() {
        let mut state = state_at(Vec3::new(0.0, 2.0, 0.0));
        let res = SolidResolution {
            support: Some(crate::sim::collision::Support {
                key: String::from("ledge"),
                top: 2.0,
            }),
            blocked: None,
            ceiling: None,
        };
        integrate_vertical(&mut state, &motion(), &res, 1.0 / 120.0);
        assert_eq!(state.character.pos.y, 2.0);
        assert_eq!(state.character.vy, 0.0);
        assert!(res.support.is_some());
    }

    #[test]
    fn test_head_bump_knocks_down() {
        let mut state = state_at(Vec3::new(0.0, 0.9, 0.0));
        state.character.status.jumping = true;
        state.character.vy = 10.0;
        // Brick bottom at 2.0, head at 1.9 and rising
        let solids = [brick(0.0, 2.5)];
        for _ in 0..6 {
            frame(&mut state, &solids, 1.0 / 120.0);
        }
        assert!(state.character.vy < 0.0);
        assert!(state.character.pos.y + state.character.height <= 2.0 + 1e-3);
    }

    #[test]
    fn test_blocked_move_stays_at_face() {
        let mut state = state_at(Vec3::new(0.0, 0.1, -0.85));
        state.controls.forward = true;
        let wall = Solid {
            key: 0,
            aabb: Aabb::new(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.5, 1.0, 0.6)),
            land: true,
            side: true,
            head: None,
        };
        for _ in 0..60 {
            frame(&mut state, &[wall], 1.0 / 120.0);
        }
        assert!((state.character.pos.z + 0.8).abs() < 1e-4);
    }

    #[test]
    fn test_fall_is_fatal() {
        let mut state = state_at(Vec3::new(0.0, -6.0, 0.0));
        let mut m = motion();
        m.fall_y = Some(-5.0);
        check_fall(&mut state, &m);
        assert!(state.is_terminal());
        assert!(state.character.vitality.is_depleted());
    }

    #[test]
    fn test_attack_is_exclusive() {
        let mut state = state_at(Vec3::new(0.0, 0.1, 0.0));
        assert!(try_attack(&mut state));
        assert!(!try_attack(&mut state));
        assert!(!try_jump(&mut state, &motion()));
        assert_eq!(move_state(&state), MoveState::Attacking);
    }

    #[test]
    fn test_edges_drive_held_state() {
        let mut controls = ControlState::default();
        let mut input = TickInput::default();
        input.press(Action::Backward);
        controls.apply(&input);
        assert_eq!(controls.direction(), Some(Facing::Backward));
        input.clear();
        input.press(Action::Forward);
        controls.apply(&input);
        assert_eq!(controls.direction(), Some(Facing::Forward));
        input.clear();
        input.release(Action::Forward);
        input.release(Action::Backward);
        controls.apply(&input);
        assert_eq!(controls.direction(), None);
    }
}
