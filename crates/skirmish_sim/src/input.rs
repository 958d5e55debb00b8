//! # Input and Remote Invocations
//!
//! Two ways into the decision phase:
//!
//! - [`InputBuffer`]: per-participant ring of [`TickInput`]s keyed by tick.
//!   A tick with no buffered input skips that avatar's decision step.
//! - [`Invoker`]: a channel of trusted requests ([`Invocation`]) any peer may
//!   send to the authority. They are drained at the start of each tick, so
//!   nothing that arrives mid-tick can change the tick being simulated.

use crossbeam_channel::{unbounded, Receiver, Sender};
use skirmish_shared::constants::INPUT_HISTORY_SIZE;
use skirmish_shared::{Character, TickInput};

use crate::ids::ParticipantId;
use crate::progression::Profile;

/// Fixed-size ring of recent inputs.
#[derive(Clone, Debug)]
pub struct InputBuffer {
    history: [TickInput; INPUT_HISTORY_SIZE],
    write_index: usize,
    count: usize,
}

impl Default for InputBuffer {
    fn default() -> Self {
        Self {
            history: [TickInput::default(); INPUT_HISTORY_SIZE],
            write_index: 0,
            count: 0,
        }
    }
}

impl InputBuffer {
    /// An empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an input, overwriting the oldest once full.
    pub fn push(&mut self, input: TickInput) {
        self.history[self.write_index] = input;
        self.write_index = (self.write_index + 1) % INPUT_HISTORY_SIZE;
        self.count = (self.count + 1).min(INPUT_HISTORY_SIZE);
    }

    /// Most recent input.
    #[must_use]
    pub fn latest(&self) -> Option<&TickInput> {
        if self.count == 0 {
            return None;
        }
        let index = (self.write_index + INPUT_HISTORY_SIZE - 1) % INPUT_HISTORY_SIZE;
        Some(&self.history[index])
    }

    /// The input sampled for `tick`, newest first if duplicated.
    #[must_use]
    pub fn for_tick(&self, tick: u32) -> Option<&TickInput> {
        (0..self.count)
            .map(|i| (self.write_index + INPUT_HISTORY_SIZE - 1 - i) % INPUT_HISTORY_SIZE)
            .map(|index| &self.history[index])
            .find(|input| input.tick == tick)
    }

    /// Buffered inputs.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// True if nothing is buffered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Forgets everything.
    pub fn clear(&mut self) {
        self.write_index = 0;
        self.count = 0;
    }
}

/// A trusted mutation requested of the authority.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Invocation {
    /// Account service answered: replace the participant's progression.
    ApplyProfile {
        /// Whose profile.
        participant: ParticipantId,
        /// Values to install.
        profile: Profile,
    },
    /// Character pick from the lobby UI.
    SwitchCharacter {
        /// Who is switching.
        participant: ParticipantId,
        /// New character.
        character: Character,
    },
    /// Readiness toggle from the lobby UI.
    ToggleReady {
        /// Who is toggling.
        participant: ParticipantId,
    },
}

/// Sending half, cloned out to every peer.
#[derive(Clone, Debug)]
pub struct Invoker {
    sender: Sender<Invocation>,
}

impl Invoker {
    /// Queues `invocation` for the next tick. False once the authority is
    /// gone.
    pub fn invoke(&self, invocation: Invocation) -> bool {
        self.sender.send(invocation).is_ok()
    }
}

/// Receiving half, owned by the authority.
#[derive(Debug)]
pub struct InvocationQueue {
    sender: Sender<Invocation>,
    receiver: Receiver<Invocation>,
}

impl Default for InvocationQueue {
    fn default() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }
}

impl InvocationQueue {
    /// An empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A new sending handle.
    #[must_use]
    pub fn invoker(&self) -> Invoker {
        Invoker {
            sender: self.sender.clone(),
        }
    }

    /// Everything queued so far, in arrival order.
    #[must_use]
    pub fn drain(&self) -> Vec<Invocation> {
        self.receiver.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_tick() {
        let mut buffer = InputBuffer::new();
        for tick in 0..10 {
            buffer.push(TickInput::idle(tick));
        }
        assert_eq!(buffer.len(), 10);
        assert_eq!(buffer.for_tick(4).map(|i| i.tick), Some(4));
        assert_eq!(buffer.latest().map(|i| i.tick), Some(9));
        assert!(buffer.for_tick(10).is_none());
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let mut buffer = InputBuffer::new();
        for tick in 0..100 {
            buffer.push(TickInput::idle(tick));
        }
        assert_eq!(buffer.len(), INPUT_HISTORY_SIZE);
        assert!(buffer.for_tick(35).is_none());
        assert!(buffer.for_tick(36).is_some());
        assert!(buffer.for_tick(99).is_some());
    }

    #[test]
    fn test_invocations_in_order() {
        let queue = InvocationQueue::new();
        let invoker = queue.invoker();
        assert!(invoker.invoke(Invocation::ToggleReady {
            participant: ParticipantId(1)
        }));
        assert!(invoker.invoke(Invocation::SwitchCharacter {
            participant: ParticipantId(1),
            character: Character::Nadja,
        }));
        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert!(matches!(drained[0], Invocation::ToggleReady { .. }));
        assert!(queue.drain().is_empty());
    }
}
