//! Character animation state
//!
//! Tracks the active clip, the clip fading out, and one-shot exclusive clips
//! (punch) whose finish unlocks the controller again.

use serde::{Deserialize, Serialize};

use crate::consts::{CROSSFADE_SECS, IDLE_TIME_SCALE, PUNCH_CLIP_SECS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Clip {
    Idle,
    Running,
    Jumping,
    Punching,
}

impl Clip {
    /// Clip length at time scale 1.0; looping clips report `None`
    pub fn one_shot_length(self) -> Option<f32> {
        match self {
            Clip::Punching => Some(PUNCH_CLIP_SECS),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Animator {
    pub current: Clip,
    pub time_scale: f32,
    /// Clip fading out and seconds left in the fade
    fading: Option<(Clip, f32)>,
    /// Playback time of the current clip
    clip_time: f32,
}

impl Default for Animator {
    fn default() -> Self {
        Self {
            current: Clip::Idle,
            time_scale: IDLE_TIME_SCALE,
            fading: None,
            clip_time: 0.0,
        }
    }
}

impl Animator {
    /// Switch to `clip` with a crossfade. Re-selecting the current clip only
    /// updates the time scale.
    pub fn set_action(&mut self, clip: Clip, time_scale: f32) {
        self.time_scale = time_scale;
        if clip == self.current {
            return;
        }
        self.fading = Some((self.current, CROSSFADE_SECS));
        self.current = clip;
        self.clip_time = 0.0;
    }

    /// Whether a one-shot clip is still playing
    pub fn is_exclusive(&self) -> bool {
        self.current.one_shot_length().is_some()
    }

    /// Advance the mixer. Returns the one-shot clip that finished this call.
    pub fn update(&mut self, dt: f32) -> Option<Clip> {
        if let Some((clip, left)) = self.fading {
            let left = left - dt;
            self.fading = (left > 0.0).then_some((clip, left));
        }
        self.clip_time += dt * self.time_scale;
        match self.current.one_shot_length() {
            Some(length) if self.clip_time >= length => {
                let finished = self.current;
                self.set_action(Clip::Idle, IDLE_TIME_SCALE);
                Some(finished)
            }
            _ => None,
        }
    }

    /// Blend weight of the current clip (1.0 once the fade completes)
    pub fn weight(&self) -> f32 {
        match self.fading {
            Some((_, left)) => 1.0 - left / CROSSFADE_SECS,
            None => 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crossfade_weight() {
        let mut animator = Animator::default();
        animator.set_action(Clip::Running, 1.5);
        assert_eq!(animator.weight(), 0.0);
        animator.update(0.1);
        assert!((animator.weight() - 0.5).abs() < 1e-4);
        animator.update(0.2);
        assert_eq!(animator.weight(), 1.0);
    }

    #[test]
    fn test_same_clip_keeps_time() {
        let mut animator = Animator::default();
        animator.set_action(Clip::Running, 1.5);
        animator.update(0.5);
        animator.set_action(Clip::Running, 1.3);
        assert_eq!(animator.time_scale, 1.3);
        assert!(animator.weight() > 0.99);
    }

    #[test]
    fn test_punch_finishes_once() {
        let mut animator = Animator::default();
        animator.set_action(Clip::Punching, 1.0);
        assert!(animator.is_exclusive());
        let mut finished = Vec::new();
        for _ in 0..240 {
            if let Some(clip) = animator.update(1.0 / 120.0) {
                finished.push(clip);
            }
        }
        assert_eq!(finished, vec![Clip::Punching]);
        assert_eq!(animator.current, Clip::Idle);
    }
}
