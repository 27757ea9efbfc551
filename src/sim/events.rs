//! Simulation events
//!
//! Two streams leave the per-frame update:
//! - [`GameEvent`]: outward feedback for audio and HUD, drained by the driver
//! - [`Deferred`]: internal follow-ups (tween completions, delayed spawns),
//!   queued with a due time and drained once per frame by the level loop

use serde::{Deserialize, Serialize};

use super::state::{EntityId, Outcome};

/// Kinds of collectible items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    Heart,
    Sword,
    Mushroom,
    HealthPotion,
    Treasure,
    Potion,
}

/// Feedback for the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    Jumped,
    CoinCollected { total: u32 },
    DiamondCollected { total: u32 },
    EnemyStomped { points: u32 },
    EnemyDefeated { points: u32 },
    Damaged { amount: u32, remaining: u32 },
    ItemCollected(ItemKind),
    ContainerOpened,
    PoweredUp,
    PowerLost,
    Slowed,
    SlowEnded,
    SpeedStage(u32),
    SwordThrown,
    Punched,
    BossHit { remaining: u32 },
    ShieldRaised,
    FireballCast,
    EnemyFired,
    CameraShake,
    PipeEntered,
    LevelEnded(Outcome),
}

/// Internal follow-up work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Deferred {
    /// Defeat or collection animation finished; remove the entity
    Despawn(EntityId),
    /// A patrol reached its first bound; start the back-and-forth leg
    PatrolTurn(EntityId),
    /// A released item finished rising; start hovering
    ItemRisen(EntityId),
    /// A falling or rising chain finished its run
    ChainFinished(EntityId),
    /// Start the next chain batch
    ChainBatch,
    /// A defeated turtle finished its launch arc; let it fall
    Launched(EntityId),
    /// Power-up blink finished after a hazard hit
    PowerStripped,
    /// Boss intro: goombas vanish and the boss appears
    BossAppears,
    /// Boss finished dropping in
    BossVisible,
    /// Second fireball of a boss volley
    BossVolley,
    /// Punch knock-back finished; reset the combo
    ComboReset,
    /// Character finished sinking into the exit pipe
    PipeEntered,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Scheduled<E> {
    due: f32,
    seq: u64,
    event: E,
}

/// Time-ordered queue. Events due at the same time drain in push order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventQueue<E> {
    now: f32,
    seq: u64,
    pending: Vec<Scheduled<E>>,
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self {
            now: 0.0,
            seq: 0,
            pending: Vec::new(),
        }
    }
}

impl<E> EventQueue<E> {
    /// Due at the current time
    pub fn push(&mut self, event: E) {
        self.push_after(0.0, event);
    }

    pub fn push_after(&mut self, delay: f32, event: E) {
        let item = Scheduled {
            due: self.now + delay.max(0.0),
            seq: self.seq,
            event,
        };
        self.seq += 1;
        let at = self
            .pending
            .partition_point(|s| (s.due, s.seq) <= (item.due, item.seq));
        self.pending.insert(at, item);
    }

    /// Move the queue clock forward
    pub fn advance(&mut self, dt: f32) {
        self.now += dt;
    }

    /// Remove and return every event due by now
    pub fn drain_due(&mut self) -> Vec<E> {
        let split = self.pending.partition_point(|s| s.due <= self.now);
        self.pending.drain(..split).map(|s| s.event).collect()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_due_events_drain_in_order() {
        let mut queue = EventQueue::default();
        queue.push_after(0.07, Deferred::ChainBatch);
        queue.push(Deferred::Despawn(3));
        queue.push(Deferred::Despawn(4));
        assert_eq!(queue.drain_due(), vec![Deferred::Despawn(3), Deferred::Despawn(4)]);
        assert!(queue.drain_due().is_empty());
        queue.advance(0.05);
        assert!(queue.drain_due().is_empty());
        queue.advance(0.05);
        assert_eq!(queue.drain_due(), vec![Deferred::ChainBatch]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_clear_drops_pending() {
        let mut queue = EventQueue::default();
        queue.push_after(1.0, Deferred::BossVolley);
        queue.clear();
        queue.advance(2.0);
        assert!(queue.drain_due().is_empty());
    }
}
