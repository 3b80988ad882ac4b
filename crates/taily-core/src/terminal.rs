//! Local terminal control
//!
//! Raw mode is held through a [`RawModeGuard`]: the previous mode is restored
//! when the guard goes out of scope, on every exit path including errors and
//! unwinding panics.

use std::io;

use crate::error::{Error, Result};

/// Operations on the caller's terminal
pub trait TerminalControl: Send {
    /// Switch to raw mode, remembering the current mode
    fn enable_raw_mode(&mut self) -> io::Result<()>;

    /// Restore the mode that was active before [`enable_raw_mode`](Self::enable_raw_mode)
    fn disable_raw_mode(&mut self) -> io::Result<()>;

    /// Current size as `(cols, rows)`
    fn size(&self) -> io::Result<(u16, u16)>;
}

/// The real terminal, driven through crossterm
#[derive(Debug, Default, Clone, Copy)]
pub struct CrosstermTerminal;

impl TerminalControl for CrosstermTerminal {
    fn enable_raw_mode(&mut self) -> io::Result<()> {
        crossterm::terminal::enable_raw_mode()
    }

    fn disable_raw_mode(&mut self) -> io::Result<()> {
        crossterm::terminal::disable_raw_mode()
    }

    fn size(&self) -> io::Result<(u16, u16)> {
        crossterm::terminal::size()
    }
}

/// Keeps the terminal in raw mode for as long as it lives
pub struct RawModeGuard<T: TerminalControl> {
    terminal: T,
    active: bool,
}

impl<T: TerminalControl> RawModeGuard<T> {
    /// Enter raw mode. Nothing needs restoring if this fails.
    pub fn enter(mut terminal: T) -> Result<Self> {
        terminal.enable_raw_mode().map_err(Error::TerminalMode)?;
        tracing::debug!("Terminal switched to raw mode");
        Ok(Self {
            terminal,
            active: true,
        })
    }

    /// Terminal size as `(cols, rows)`
    pub fn size(&self) -> Result<(u16, u16)> {
        self.terminal.size().map_err(Error::TerminalMode)
    }

    pub fn terminal(&self) -> &T {
        &self.terminal
    }

    /// Whether the prior mode still has to be restored
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Restore the prior mode now. Later calls and the drop are no-ops.
    pub fn restore(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        self.terminal.disable_raw_mode()?;
        tracing::debug!("Terminal mode restored");
        Ok(())
    }
}

impl<T: TerminalControl> Drop for RawModeGuard<T> {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            tracing::warn!("Failed to restore terminal mode: {}", e);
        }
    }
}
