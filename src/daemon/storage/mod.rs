//!  Storage is organized as a small key-value directory shared by the daemon and the cli.
//!  The basic idea is:
//!   - There is a directory holding one JSON document per key.
//!   - Keys follow two per-day families, `in_<date>` and `notified_<date>`, plus the
//!     persisted health reminder selection.
//!  Files are fs4-locked because the cli writes check-ins while the daemon ticks.

pub mod entities;
pub mod kv;
