//! CLI command implementations

mod launch;

pub use launch::{launch_command, LaunchRequest};
