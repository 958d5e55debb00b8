//! # SKIRMISH Sim
//!
//! The authoritative match simulation. One [`Simulation`] per match process
//! decides, tick by tick, who exists, where they are, who is alive and who
//! hit whom; any number of [`Presenter`]s read the result at display rate.
//!
//! ## Architecture Rules
//!
//! 1. **Decision phase writes, presentation reads** - Only the driver holds a
//!    write capability
//! 2. **Faults stay local** - One avatar's failed step never stops the tick
//! 3. **History, not now** - Attacks resolve against what the attacker saw
//!
//! ## Example
//!
//! ```rust
//! use skirmish_core::Peer;
//! use skirmish_shared::{Button, SimConfig, TickInput};
//! use skirmish_sim::{ParticipantId, Presenter, Prop, Simulation};
//!
//! let mut sim = Simulation::new(SimConfig::default(), Peer::authority(0)).unwrap();
//! let mut presenter = Presenter::new(sim.reader());
//!
//! sim.join(ParticipantId(7), "token-7").unwrap();
//! sim.submit_input(ParticipantId(7), TickInput::idle(0).with_buttons(&[Button::Jump]))
//!     .unwrap();
//! sim.step();
//!
//! let avatar = sim.session().avatar_of(ParticipantId(7)).unwrap();
//! presenter.frame();
//! assert_eq!(presenter.counter(avatar, Prop::JumpCount), Some(1));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod action;
pub mod avatar;
pub mod driver;
pub mod error;
pub mod health;
pub mod history;
pub mod hitreg;
pub mod ids;
pub mod input;
pub mod lifecycle;
pub mod notify;
pub mod presenter;
pub mod progression;
pub mod projectile;
pub mod props;
pub mod relay;
pub mod resource;
pub mod session;
pub mod spawn;
pub mod tick_loop;
pub mod transition;
pub mod world;

pub use action::{Action, ActionKind, Delivery, Execution, Impact, Loadout};
pub use avatar::{Avatar, Binding, Intent, Npc};
pub use driver::{Frame, Simulation, StepReport};
pub use error::{SimError, SimResult};
pub use health::{DamageHit, DamageOutcome, Destroyable, Health};
pub use history::{Collider, HistoryIndex, Hitbox};
pub use hitreg::{
    Attacker, HitClass, HitMask, HitRecord, LagCompensator, QueryFilter, Ray, SpatialIndex, TargetKind,
};
pub use ids::{ParticipantId, Slot};
pub use input::{InputBuffer, Invocation, InvocationQueue, Invoker};
pub use lifecycle::{Lifecycle, Stage};
pub use notify::{Notification, NotificationReceiver, Notifier};
pub use presenter::{Cue, PresentFrame, Presenter};
pub use progression::Profile;
pub use props::{EntityKind, Prop};
pub use relay::{DrainReport, EventRelay, HitMarker, Reach, RelayEvent, RelayReceiver, RelayRing};
pub use resource::ResourceRecord;
pub use session::{LeaveOutcome, Phase, Score, Session};
pub use spawn::{SpawnPoint, SpawnPoints};
pub use tick_loop::{TickLoop, TickStats};
pub use transition::{Transition, TransitionStep};
pub use world::{Outcome, Victim, World};
