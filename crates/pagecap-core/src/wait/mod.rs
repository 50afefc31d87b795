//! Bounded waiting.
//!
//! Every wait in a page visit (load states, image loading, video clock) is a
//! condition polled at a fixed interval until it holds or a deadline passes,
//! so one slow page can never stall the batch.

mod idle;
mod poll;

pub use idle::QuietWindow;
pub use poll::{poll_until, poll_until_deadline, PollOutcome};
