//! Work shift tracker split into a cli and a background daemon. The daemon turns the day's
//! check-in into checkout reminders and runs the recurring health break notifications; the
//! cli records check-ins and drives the daemon over its control socket.
//!

pub mod cli;
pub mod daemon;
pub mod notify;
pub mod utils;
