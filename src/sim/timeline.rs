//! Tween timeline
//!
//! Eased scalar interpolations bound to a target and a property. The level
//! advances the timeline once per frame, applies the returned samples to its
//! entities, and receives completion events through the deferred queue.

use serde::{Deserialize, Serialize};

use super::events::{Deferred, EventQueue};
use super::state::EntityId;
use crate::lerp;

/// What a tween drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    Character,
    Entity(EntityId),
    Camera,
}

/// Which scalar of the target a tween writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Prop {
    Y,
    Z,
    Scale,
    Opacity,
}

/// Easing curves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Ease {
    #[default]
    Linear,
    Power1InOut,
    Power2In,
    Power2Out,
    Power2InOut,
    SineInOut,
    ElasticOut,
}

impl Ease {
    /// Map progress `t` in [0, 1] to eased progress
    pub fn apply(self, t: f32) -> f32 {
        use std::f32::consts::PI;
        let t = t.clamp(0.0, 1.0);
        match self {
            Ease::Linear => t,
            Ease::Power1InOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Ease::Power2In => t * t * t,
            Ease::Power2Out => 1.0 - (1.0 - t).powi(3),
            Ease::Power2InOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Ease::SineInOut => -((PI * t).cos() - 1.0) / 2.0,
            Ease::ElasticOut => {
                if t == 0.0 || t == 1.0 {
                    t
                } else {
                    let c4 = (2.0 * PI) / 3.0;
                    2f32.powf(-10.0 * t) * ((t * 10.0 - 0.75) * c4).sin() + 1.0
                }
            }
        }
    }
}

/// Repeat behavior after the first pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Repeat {
    #[default]
    Once,
    /// Play back and forth this many extra passes
    Yoyo(u32),
    /// Back and forth until cancelled
    YoyoForever,
}

/// One eased interpolation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tween {
    pub target: Target,
    pub prop: Prop,
    pub from: f32,
    pub to: f32,
    pub duration: f32,
    pub delay: f32,
    pub ease: Ease,
    pub repeat: Repeat,
    pub on_complete: Option<Deferred>,
    elapsed: f32,
    pass: u32,
}

impl Tween {
    pub fn new(target: Target, prop: Prop, from: f32, to: f32, duration: f32) -> Self {
        Self {
            target,
            prop,
            from,
            to,
            duration: duration.max(1e-4),
            delay: 0.0,
            ease: Ease::Linear,
            repeat: Repeat::Once,
            on_complete: None,
            elapsed: 0.0,
            pass: 0,
        }
    }

    pub fn ease(mut self, ease: Ease) -> Self {
        self.ease = ease;
        self
    }

    pub fn delay(mut self, delay: f32) -> Self {
        self.delay = delay.max(0.0);
        self
    }

    pub fn yoyo(mut self, extra_passes: u32) -> Self {
        self.repeat = Repeat::Yoyo(extra_passes);
        self
    }

    pub fn forever(mut self) -> Self {
        self.repeat = Repeat::YoyoForever;
        self
    }

    pub fn then(mut self, event: Deferred) -> Self {
        self.on_complete = Some(event);
        self
    }

    fn value_at(&self, t: f32) -> f32 {
        let eased = self.ease.apply(t);
        if self.pass % 2 == 0 {
            lerp(self.from, self.to, eased)
        } else {
            lerp(self.to, self.from, eased)
        }
    }

    /// Advance; returns the sample to write and whether the tween finished
    fn advance(&mut self, dt: f32) -> (Option<f32>, bool) {
        let mut dt = dt;
        if self.delay > 0.0 {
            if dt <= self.delay {
                self.delay -= dt;
                return (None, false);
            }
            dt -= self.delay;
            self.delay = 0.0;
        }
        self.elapsed += dt;
        loop {
            if self.elapsed < self.duration {
                return (Some(self.value_at(self.elapsed / self.duration)), false);
            }
            let more = match self.repeat {
                Repeat::Once => false,
                Repeat::Yoyo(extra) => self.pass < extra,
                Repeat::YoyoForever => true,
            };
            if !more {
                return (Some(self.value_at(1.0)), true);
            }
            self.elapsed -= self.duration;
            self.pass += 1;
        }
    }
}

/// Handle for cancelling a single tween
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TweenId(u64);

/// A property write produced by [`Timeline::advance`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub target: Target,
    pub prop: Prop,
    pub value: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Timeline {
    tweens: Vec<(TweenId, Tween)>,
    next_id: u64,
}

impl Timeline {
    pub fn add(&mut self, tween: Tween) -> TweenId {
        let id = TweenId(self.next_id);
        self.next_id += 1;
        self.tweens.push((id, tween));
        id
    }

    /// Advance every tween, queueing completion events
    pub fn advance(&mut self, dt: f32, done: &mut EventQueue<Deferred>) -> Vec<Sample> {
        let mut samples = Vec::with_capacity(self.tweens.len());
        self.tweens.retain_mut(|(_, tween)| {
            let (value, finished) = tween.advance(dt);
            if let Some(value) = value {
                samples.push(Sample {
                    target: tween.target,
                    prop: tween.prop,
                    value,
                });
            }
            if finished {
                if let Some(event) = tween.on_complete {
                    done.push(event);
                }
            }
            !finished
        });
        samples
    }

    pub fn cancel(&mut self, id: TweenId) {
        self.tweens.retain(|(tid, _)| *tid != id);
    }

    /// Cancel every tween bound to `target`. Completion events are dropped.
    pub fn cancel_target(&mut self, target: Target) -> usize {
        let before = self.tweens.len();
        self.tweens.retain(|(_, t)| t.target != target);
        before - self.tweens.len()
    }

    /// Cancel tweens on one property of `target`
    pub fn cancel_prop(&mut self, target: Target, prop: Prop) {
        self.tweens
            .retain(|(_, t)| !(t.target == target && t.prop == prop));
    }

    pub fn cancel_all(&mut self) {
        self.tweens.clear();
    }

    pub fn is_animating(&self, target: Target) -> bool {
        self.tweens.iter().any(|(_, t)| t.target == target)
    }

    pub fn len(&self) -> usize {
        self.tweens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tweens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(timeline: &mut Timeline, secs: f32, queue: &mut EventQueue<Deferred>) -> Vec<Sample> {
        let mut last = Vec::new();
        let steps = (secs * 120.0).round() as usize;
        for _ in 0..steps {
            last = timeline.advance(1.0 / 120.0, queue);
        }
        last
    }

    #[test]
    fn test_once_completes_with_event() {
        let mut timeline = Timeline::default();
        let mut queue = EventQueue::default();
        timeline.add(
            Tween::new(Target::Entity(5), Prop::Y, 4.5, 5.5, 0.3)
                .ease(Ease::Power2Out)
                .then(Deferred::ItemRisen(5)),
        );
        let samples = run(&mut timeline, 0.5, &mut queue);
        assert!(timeline.is_empty());
        assert_eq!(queue.drain_due(), vec![Deferred::ItemRisen(5)]);
        // The finishing frame writes the end value
        assert!(samples.is_empty() || samples[0].value == 5.5);
    }

    #[test]
    fn test_delay_holds_value() {
        let mut timeline = Timeline::default();
        let mut queue = EventQueue::default();
        timeline.add(Tween::new(Target::Character, Prop::Z, 0.0, 1.0, 1.0).delay(0.5));
        assert!(timeline.advance(0.25, &mut queue).is_empty());
        let samples = timeline.advance(0.5, &mut queue);
        assert_eq!(samples.len(), 1);
        assert!((samples[0].value - 0.25).abs() < 1e-5);
    }

    #[test]
    fn test_yoyo_returns_to_start() {
        let mut timeline = Timeline::default();
        let mut queue = EventQueue::default();
        timeline.add(Tween::new(Target::Entity(1), Prop::Y, 4.5, 4.8, 0.1).yoyo(1));
        let mid = timeline.advance(0.1, &mut queue);
        assert!((mid[0].value - 4.8).abs() < 1e-4);
        let end = timeline.advance(0.1, &mut queue);
        assert!((end[0].value - 4.5).abs() < 1e-4);
        assert!(timeline.is_empty());
    }

    #[test]
    fn test_cancel_target_drops_completion() {
        let mut timeline = Timeline::default();
        let mut queue = EventQueue::default();
        timeline.add(Tween::new(Target::Entity(9), Prop::Scale, 1.0, 0.0, 0.2).then(Deferred::Despawn(9)));
        timeline.add(Tween::new(Target::Entity(10), Prop::Y, 0.0, 1.0, 0.2).forever());
        assert_eq!(timeline.cancel_target(Target::Entity(9)), 1);
        run(&mut timeline, 1.0, &mut queue);
        assert!(queue.is_empty());
        assert_eq!(timeline.len(), 1);
    }

    #[test]
    fn test_ease_endpoints() {
        for ease in [
            Ease::Linear,
            Ease::Power1InOut,
            Ease::Power2In,
            Ease::Power2Out,
            Ease::Power2InOut,
            Ease::SineInOut,
            Ease::ElasticOut,
        ] {
            assert!(ease.apply(0.0).abs() < 1e-5, "{ease:?}");
            assert!((ease.apply(1.0) - 1.0).abs() < 1e-5, "{ease:?}");
        }
    }
}
