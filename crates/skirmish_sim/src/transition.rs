//! # Level Transition
//!
//! A timed sequence expressed as explicit wait states, polled once per tick:
//!
//! ```text
//!   LeadIn ──lead_in──> TeleportingOut ──all out──> Settling ──settle──> Done
//!                         │ one avatar every spacing
//! ```
//!
//! The settle time is what is left of the settle budget after the spacing
//! already spent: `max(0, settle - count * spacing)`.

use skirmish_core::{Tick, TickRate};
use skirmish_shared::config::TransitionConfig;

/// Current wait state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionStage {
    /// Pause before anyone leaves.
    LeadIn,
    /// Teleporting avatars out one by one.
    TeleportingOut,
    /// Letting the last teleport finish.
    Settling,
    /// Finished.
    Done,
}

/// What the caller must do this tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionStep {
    /// Nothing.
    Wait,
    /// Teleport out the avatar at this position in the list.
    TeleportOut(usize),
    /// Sequence complete; rebuild the level.
    Finished,
}

/// The transition sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    stage: TransitionStage,
    resume_at: Tick,
    spacing_ticks: u32,
    settle_ticks: u32,
    count: usize,
    next: usize,
}

impl Transition {
    /// Starts a transition for `count` avatars.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn start(now: Tick, count: usize, config: &TransitionConfig, rate: TickRate) -> Self {
        let settle = (config.settle_secs - count as f32 * config.spacing_secs).max(0.0);
        Self {
            stage: TransitionStage::LeadIn,
            resume_at: now + rate.ticks_for_secs(config.lead_in_secs),
            spacing_ticks: rate.ticks_for_secs(config.spacing_secs),
            settle_ticks: rate.ticks_for_secs(settle),
            count,
            next: 0,
        }
    }

    /// Current stage.
    #[must_use]
    pub const fn stage(&self) -> TransitionStage {
        self.stage
    }

    /// Advances to whatever is due at `now`.
    pub fn poll(&mut self, now: Tick) -> TransitionStep {
        if self.stage == TransitionStage::Done {
            return TransitionStep::Finished;
        }
        if now < self.resume_at {
            return TransitionStep::Wait;
        }
        match self.stage {
            TransitionStage::LeadIn => {
                self.stage = TransitionStage::TeleportingOut;
                self.poll(now)
            }
            TransitionStage::TeleportingOut => {
                if self.next < self.count {
                    let index = self.next;
                    self.next += 1;
                    self.resume_at = now + self.spacing_ticks;
                    return TransitionStep::TeleportOut(index);
                }
                self.stage = TransitionStage::Settling;
                self.resume_at = now + self.settle_ticks;
                self.poll(now)
            }
            TransitionStage::Settling => {
                self.stage = TransitionStage::Done;
                TransitionStep::Finished
            }
            TransitionStage::Done => TransitionStep::Finished,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(count: usize) -> Vec<(u32, TransitionStep)> {
        let rate = TickRate::new(60);
        let mut t = Transition::start(Tick(0), count, &TransitionConfig::default(), rate);
        let mut log = Vec::new();
        for tick in 0..400 {
            match t.poll(Tick(tick)) {
                TransitionStep::Wait => {}
                step => {
                    log.push((tick, step));
                    if step == TransitionStep::Finished {
                        break;
                    }
                }
            }
        }
        log
    }

    #[test]
    fn test_spacing_and_settle() {
        let log = run(3);
        assert_eq!(
            log,
            vec![
                (60, TransitionStep::TeleportOut(0)),
                (66, TransitionStep::TeleportOut(1)),
                (72, TransitionStep::TeleportOut(2)),
                // Out of avatars at 78, then 1.5 - 0.3 = 1.2s settle
                (150, TransitionStep::Finished),
            ]
        );
    }

    #[test]
    fn test_settle_never_negative() {
        let log = run(20);
        let last_out = log[log.len() - 2].0;
        let finished = log[log.len() - 1].0;
        assert_eq!(finished, last_out + 6);
    }

    #[test]
    fn test_empty_transition() {
        assert_eq!(run(0), vec![(150, TransitionStep::Finished)]);
    }
}
