//! View-level coordination of the stores and the poller

mod controller;

pub use controller::SyncController;
