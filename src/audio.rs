//! Audio system using Web Audio API
//!
//! Procedurally generated sound effects - no external files needed!
//!
//! Each effect is a short list of oscillator voices. The event-to-effect
//! mapping and the voice tables are platform-free; only [`AudioManager`]
//! touches Web Audio.

use crate::sim::events::{GameEvent, ItemKind};
use crate::sim::state::Outcome;

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundEffect {
    Jump,
    Coin,
    Diamond,
    /// Enemy squashed from above
    Stomp,
    /// Enemy destroyed by a thrown or cast weapon
    EnemyDown,
    Hurt,
    Pickup,
    BoxOpen,
    PowerUp,
    PowerDown,
    Slowed,
    SpeedUp,
    Throw,
    Punch,
    BossHit,
    Shield,
    Fireball,
    EnemyShot,
    /// Sliding into the exit pipe
    Pipe,
    LevelClear,
    Victory,
    GameOver,
}

/// Oscillator shape, mirrored onto `OscillatorType` on the web
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wave {
    Sine,
    Square,
    Triangle,
    Sawtooth,
}

/// One oscillator with an exponential decay envelope
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Voice {
    pub wave: Wave,
    pub freq: f32,
    /// Exponential glide target, reached at the end of the voice
    pub glide_to: Option<f32>,
    /// Peak gain before the master/sfx volume is applied
    pub gain: f32,
    pub delay: f64,
    pub secs: f64,
}

const fn voice(wave: Wave, freq: f32, gain: f32, delay: f64, secs: f64) -> Voice {
    Voice {
        wave,
        freq,
        glide_to: None,
        gain,
        delay,
        secs,
    }
}

const fn glide(wave: Wave, freq: f32, to: f32, gain: f32, secs: f64) -> Voice {
    Voice {
        wave,
        freq,
        glide_to: Some(to),
        gain,
        delay: 0.0,
        secs,
    }
}

/// A rising or falling arpeggio of equal notes
macro_rules! arpeggio {
    ($wave:expr, $gain:expr, $step:expr, $secs:expr; $($freq:expr),+) => {{
        let mut i = -1.0;
        [$({
            i += 1.0;
            voice($wave, $freq, $gain, i * $step, $secs)
        }),+]
    }};
}

const JUMP: &[Voice] = &[glide(Wave::Triangle, 200.0, 600.0, 0.3, 0.2)];
const COIN: &[Voice] = &[voice(Wave::Square, 990.0, 0.15, 0.0, 0.08), voice(Wave::Square, 1320.0, 0.15, 0.06, 0.2)];
const DIAMOND: &[Voice] = &arpeggio!(Wave::Sine, 0.2, 0.02, 0.3; 1200.0, 1800.0, 2400.0);
const STOMP: &[Voice] = &[glide(Wave::Sine, 150.0, 60.0, 0.6, 0.12)];
const ENEMY_DOWN: &[Voice] = &[
    glide(Wave::Sawtooth, 100.0, 30.0, 0.45, 0.35),
    voice(Wave::Square, 1500.0, 0.2, 0.0, 0.1),
];
const HURT: &[Voice] = &[
    glide(Wave::Square, 400.0, 200.0, 0.25, 0.2),
    voice(Wave::Sine, 80.0, 0.4, 0.0, 0.2),
];
const PICKUP: &[Voice] = &arpeggio!(Wave::Sine, 0.25, 0.08, 0.15; 600.0, 800.0, 1000.0);
const BOX_OPEN: &[Voice] = &[voice(Wave::Triangle, 300.0, 0.3, 0.0, 0.06), voice(Wave::Sine, 700.0, 0.2, 0.05, 0.15)];
const POWER_UP: &[Voice] = &arpeggio!(Wave::Triangle, 0.25, 0.06, 0.2; 400.0, 500.0, 600.0, 800.0, 1000.0);
const POWER_DOWN: &[Voice] = &arpeggio!(Wave::Triangle, 0.25, 0.08, 0.2; 800.0, 600.0, 400.0);
const SLOWED: &[Voice] = &[glide(Wave::Sine, 400.0, 100.0, 0.35, 0.6)];
const SPEED_UP: &[Voice] = &arpeggio!(Wave::Square, 0.12, 0.05, 0.1; 500.0, 700.0);
const THROW: &[Voice] = &[glide(Wave::Triangle, 900.0, 300.0, 0.25, 0.15)];
const PUNCH: &[Voice] = &[glide(Wave::Sine, 120.0, 50.0, 0.5, 0.1), voice(Wave::Square, 200.0, 0.1, 0.0, 0.04)];
const BOSS_HIT: &[Voice] = &[
    glide(Wave::Sine, 80.0, 40.0, 0.5, 0.3),
    voice(Wave::Square, 400.0, 0.25, 0.0, 0.25),
    voice(Wave::Triangle, 250.0, 0.2, 0.0, 0.2),
];
const SHIELD: &[Voice] = &[voice(Wave::Sine, 600.0, 0.25, 0.0, 0.4), voice(Wave::Sine, 900.0, 0.15, 0.0, 0.4)];
const FIREBALL: &[Voice] = &[glide(Wave::Sawtooth, 300.0, 900.0, 0.25, 0.25)];
const ENEMY_SHOT: &[Voice] = &[glide(Wave::Sawtooth, 700.0, 200.0, 0.2, 0.2)];
const PIPE: &[Voice] = &[glide(Wave::Sine, 600.0, 200.0, 0.3, 0.5)];
const LEVEL_CLEAR: &[Voice] = &arpeggio!(Wave::Triangle, 0.3, 0.1, 0.4; 400.0, 500.0, 600.0, 800.0);
const VICTORY: &[Voice] = &arpeggio!(Wave::Triangle, 0.25, 0.08, 0.3; 500.0, 600.0, 700.0, 800.0, 1000.0);
const GAME_OVER: &[Voice] = &arpeggio!(Wave::Sine, 0.3, 0.2, 0.3; 400.0, 350.0, 300.0, 200.0);

impl SoundEffect {
    pub fn voices(self) -> &'static [Voice] {
        match self {
            SoundEffect::Jump => JUMP,
            SoundEffect::Coin => COIN,
            SoundEffect::Diamond => DIAMOND,
            SoundEffect::Stomp => STOMP,
            SoundEffect::EnemyDown => ENEMY_DOWN,
            SoundEffect::Hurt => HURT,
            SoundEffect::Pickup => PICKUP,
            SoundEffect::BoxOpen => BOX_OPEN,
            SoundEffect::PowerUp => POWER_UP,
            SoundEffect::PowerDown => POWER_DOWN,
            SoundEffect::Slowed => SLOWED,
            SoundEffect::SpeedUp => SPEED_UP,
            SoundEffect::Throw => THROW,
            SoundEffect::Punch => PUNCH,
            SoundEffect::BossHit => BOSS_HIT,
            SoundEffect::Shield => SHIELD,
            SoundEffect::Fireball => FIREBALL,
            SoundEffect::EnemyShot => ENEMY_SHOT,
            SoundEffect::Pipe => PIPE,
            SoundEffect::LevelClear => LEVEL_CLEAR,
            SoundEffect::Victory => VICTORY,
            SoundEffect::GameOver => GAME_OVER,
        }
    }
}

/// Which effect, if any, a simulation event makes
pub fn sound_for(event: &GameEvent) -> Option<SoundEffect> {
    let effect = match event {
        GameEvent::Jumped => SoundEffect::Jump,
        GameEvent::CoinCollected { .. } => SoundEffect::Coin,
        GameEvent::DiamondCollected { .. } => SoundEffect::Diamond,
        GameEvent::EnemyStomped { .. } => SoundEffect::Stomp,
        GameEvent::EnemyDefeated { .. } => SoundEffect::EnemyDown,
        GameEvent::Damaged { .. } => SoundEffect::Hurt,
        GameEvent::ItemCollected(ItemKind::Mushroom) => SoundEffect::PowerUp,
        GameEvent::ItemCollected(_) => SoundEffect::Pickup,
        GameEvent::ContainerOpened => SoundEffect::BoxOpen,
        GameEvent::PowerLost => SoundEffect::PowerDown,
        GameEvent::Slowed => SoundEffect::Slowed,
        GameEvent::SpeedStage(_) => SoundEffect::SpeedUp,
        GameEvent::SwordThrown => SoundEffect::Throw,
        GameEvent::Punched => SoundEffect::Punch,
        GameEvent::BossHit { .. } => SoundEffect::BossHit,
        GameEvent::ShieldRaised => SoundEffect::Shield,
        GameEvent::FireballCast => SoundEffect::Fireball,
        GameEvent::EnemyFired => SoundEffect::EnemyShot,
        GameEvent::PipeEntered => SoundEffect::Pipe,
        GameEvent::LevelEnded(Outcome::Advance(_)) => SoundEffect::LevelClear,
        GameEvent::LevelEnded(Outcome::Victory) => SoundEffect::Victory,
        GameEvent::LevelEnded(Outcome::GameOver(_)) => SoundEffect::GameOver,
        // The mushroom pickup already plays the power-up jingle
        GameEvent::PoweredUp | GameEvent::SlowEnded | GameEvent::CameraShake => return None,
    };
    Some(effect)
}

#[cfg(target_arch = "wasm32")]
pub use web::AudioManager;

#[cfg(target_arch = "wasm32")]
mod web {
    use web_sys::{AudioContext, GainNode, OscillatorNode, OscillatorType};

    use super::{SoundEffect, Voice, Wave};
    use crate::settings::Settings;

    /// Audio manager for the game
    pub struct AudioManager {
        ctx: Option<AudioContext>,
        gain: f32,
    }

    impl AudioManager {
        pub fn new(settings: &Settings) -> Self {
            // May fail outside a secure context
            let ctx = AudioContext::new().ok();
            if ctx.is_none() {
                log::warn!("Failed to create AudioContext - audio disabled");
            }
            Self {
                ctx,
                gain: settings.effect_gain(),
            }
        }

        /// Resume audio context (required after user gesture)
        pub fn resume(&self) {
            if let Some(ctx) = &self.ctx {
                let _ = ctx.resume();
            }
        }

        pub fn play(&self, effect: SoundEffect) {
            if self.gain <= 0.0 {
                return;
            }
            let Some(ctx) = &self.ctx else { return };

            // Browsers keep the context suspended until a user gesture
            if ctx.state() == web_sys::AudioContextState::Suspended {
                let _ = ctx.resume();
            }

            let now = ctx.current_time();
            for voice in effect.voices() {
                self.play_voice(ctx, voice, now);
            }
        }

        fn play_voice(&self, ctx: &AudioContext, voice: &Voice, now: f64) {
            let Some((osc, gain)) = create_osc(ctx, voice.freq, oscillator_type(voice.wave)) else {
                return;
            };
            let t = now + voice.delay;
            let end = t + voice.secs;

            gain.gain().set_value_at_time(self.gain * voice.gain, t).ok();
            gain.gain().exponential_ramp_to_value_at_time(0.01, end).ok();
            if let Some(to) = voice.glide_to {
                osc.frequency().set_value_at_time(voice.freq, t).ok();
                osc.frequency().exponential_ramp_to_value_at_time(to, end).ok();
            }

            osc.start_with_when(t).ok();
            osc.stop_with_when(end + 0.05).ok();
        }
    }

    fn oscillator_type(wave: Wave) -> OscillatorType {
        match wave {
            Wave::Sine => OscillatorType::Sine,
            Wave::Square => OscillatorType::Square,
            Wave::Triangle => OscillatorType::Triangle,
            Wave::Sawtooth => OscillatorType::Sawtooth,
        }
    }

    /// Create an oscillator routed through its own gain node
    fn create_osc(ctx: &AudioContext, freq: f32, osc_type: OscillatorType) -> Option<(OscillatorNode, GainNode)> {
        let osc = ctx.create_oscillator().ok()?;
        let gain = ctx.create_gain().ok()?;

        osc.set_type(osc_type);
        osc.frequency().set_value(freq);
        osc.connect_with_audio_node(&gain).ok()?;
        gain.connect_with_audio_node(&ctx.destination()).ok()?;

        Some((osc, gain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{LevelId, LossReason};

    #[test]
    fn test_every_effect_has_audible_voices() {
        let all = [
            SoundEffect::Jump,
            SoundEffect::Coin,
            SoundEffect::Diamond,
            SoundEffect::Stomp,
            SoundEffect::EnemyDown,
            SoundEffect::Hurt,
            SoundEffect::Pickup,
            SoundEffect::BoxOpen,
            SoundEffect::PowerUp,
            SoundEffect::PowerDown,
            SoundEffect::Slowed,
            SoundEffect::SpeedUp,
            SoundEffect::Throw,
            SoundEffect::Punch,
            SoundEffect::BossHit,
            SoundEffect::Shield,
            SoundEffect::Fireball,
            SoundEffect::EnemyShot,
            SoundEffect::Pipe,
            SoundEffect::LevelClear,
            SoundEffect::Victory,
            SoundEffect::GameOver,
        ];
        for effect in all {
            let voices = effect.voices();
            assert!(!voices.is_empty(), "{effect:?}");
            for v in voices {
                assert!(v.freq > 0.0 && v.gain > 0.0 && v.gain <= 1.0, "{effect:?}");
                assert!(v.secs > 0.0 && v.delay >= 0.0, "{effect:?}");
                // Exponential ramps cannot reach zero
                assert!(v.glide_to.is_none_or(|f| f > 0.0), "{effect:?}");
            }
        }
    }

    #[test]
    fn test_arpeggio_staggers_notes() {
        let delays: Vec<f64> = SoundEffect::GameOver.voices().iter().map(|v| v.delay).collect();
        assert_eq!(delays.len(), 4);
        assert!(delays.windows(2).all(|w| w[1] > w[0]));
        assert_eq!(delays[0], 0.0);
    }

    #[test]
    fn test_outcome_sounds() {
        assert_eq!(
            sound_for(&GameEvent::LevelEnded(Outcome::Advance(LevelId::Skyway))),
            Some(SoundEffect::LevelClear)
        );
        assert_eq!(sound_for(&GameEvent::LevelEnded(Outcome::Victory)), Some(SoundEffect::Victory));
        assert_eq!(
            sound_for(&GameEvent::LevelEnded(Outcome::GameOver(LossReason::FellOffWorld))),
            Some(SoundEffect::GameOver)
        );
    }

    #[test]
    fn test_mushroom_plays_once() {
        assert_eq!(sound_for(&GameEvent::ItemCollected(ItemKind::Mushroom)), Some(SoundEffect::PowerUp));
        assert_eq!(sound_for(&GameEvent::PoweredUp), None);
        assert_eq!(sound_for(&GameEvent::ItemCollected(ItemKind::Heart)), Some(SoundEffect::Pickup));
    }

    #[test]
    fn test_silent_events() {
        assert_eq!(sound_for(&GameEvent::CameraShake), None);
        assert_eq!(sound_for(&GameEvent::SlowEnded), None);
    }
}
