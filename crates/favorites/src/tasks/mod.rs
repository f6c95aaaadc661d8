//! Background task tracking
//!
//! Favorites are summarized and embedded by the server after submission.
//! [`TaskPoller`] keeps a fresh copy of the server's task list.

mod poller;

pub use poller::{PollStats, TaskPoller};
