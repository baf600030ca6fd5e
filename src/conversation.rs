//! Conversation state machine
//!
//! Elm Architecture: a pure transition over state and event yields a new
//! state plus effects. The runtime executes the effects and feeds their
//! results back in as events.

mod effect;
pub mod event;
pub mod reply;
pub mod state;
pub(crate) mod transition;


pub use effect::Effect;
pub use event::{Action, Event};
#[allow(unused_imports)] // Public API re-exports
pub use reply::{Nav, Reply, ReplyOption};
#[allow(unused_imports)] // Step is matched on in tests
pub use state::{ConvContext, ConvState, Step};
#[allow(unused_imports)] // Public API re-exports
pub use transition::{transition, TransitionError, TransitionResult};
