//! Diagnostic output for the CLI
//!
//! Everything here goes to stderr: stdout carries only the remote command's
//! output.

use std::io::Write;

use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

/// Print an error message in red with an X prefix
pub fn print_error(msg: &str) {
    print_prefixed(&mut std::io::stderr(), Color::Red, "✗ ", msg);
}

/// Print a warning message in yellow with a warning symbol prefix
pub fn print_warning(msg: &str) {
    print_prefixed(&mut std::io::stderr(), Color::Yellow, "⚠ ", msg);
}

fn print_prefixed<W: Write>(out: &mut W, color: Color, prefix: &str, msg: &str) {
    let _ = crossterm::execute!(
        out,
        SetForegroundColor(color),
        Print(prefix),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_follows_prefix() {
        let mut buf = Vec::new();
        print_prefixed(&mut buf, Color::Red, "✗ ", "ssh-agent unavailable");

        let out = String::from_utf8(buf).unwrap();
        assert!(out.contains("✗ "));
        assert!(out.ends_with("ssh-agent unavailable\n"));
    }
}
