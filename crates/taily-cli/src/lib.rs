//! taily: run a log tail or console on an application host
//!
//! Argument handling, diagnostics and signal handling for the `taily`
//! binary. The session itself lives in `taily_core`.

pub mod commands;
pub mod output;
