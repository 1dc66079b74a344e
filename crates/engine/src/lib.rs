//! Decision engine for tag-driven lifecycle scheduling.
//!
//! Given a resource's schedule tags and live state, the engine computes the
//! next lifecycle action, hands it to a durable timer, and when the timer
//! fires decides whether the action should still run.

pub mod arn;
pub mod engine;
pub mod events;
pub mod gate;
pub mod input;
pub mod memory;
pub mod rearm;
pub mod resolver;
pub mod schedule;
pub mod state;
pub mod tags;
pub mod traits;

pub use engine::{Engine, TriggerReport};
pub use events::{EventKind, TriggerEvent};
pub use gate::ExecutionGate;
pub use input::{Input, Invocation};
pub use resolver::{EventResolver, Resolution, ResourceFailure};
pub use schedule::{next_action, Selection};
pub use state::{canonical_state, ProviderStatus};
pub use tags::TagNormalizer;
pub use traits::{ActionScheduler, ResourceDescriber, ScheduleOutcome, ScheduleRequest};
