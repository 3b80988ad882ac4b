//! taily-core: remote command sessions for taily
//!
//! Resolves an operation keyword into a shell command and runs it on the
//! application host over SSH, authenticated through the local ssh-agent,
//! with the caller's terminal attached through a remote PTY.

pub mod agent;
pub mod command;
pub mod config;
pub mod error;
pub mod session;
pub mod terminal;

pub use command::{resolve, Operation};
pub use config::{PtyRequest, SessionConfig, TargetIdentity};
pub use error::{Error, RemoteFailure, Result};
pub use session::{authenticate_and_connect, launch, launch_with_io, Connection, SessionIo};
pub use terminal::{CrosstermTerminal, RawModeGuard, TerminalControl};
