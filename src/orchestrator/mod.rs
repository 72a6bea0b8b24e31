//! Session orchestration.
//!
//! Owns the poller and dispatches user commands to actions. Presentation
//! layers only send `UiCommand`s and consume `DashEvent`s.

mod controller;

pub(crate) use controller::{dispatch, run_controller, UiCommand};
