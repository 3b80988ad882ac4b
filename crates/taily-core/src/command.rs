//! Remote command resolution
//!
//! Maps an operation keyword to the shell command run on the application
//! host. Pure string formatting, no I/O.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Operations taily knows how to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Follow the environment's log file
    Tail,
    /// Open a Rails console for the environment
    Console,
    /// Print a fixed line and exit
    Test,
}

impl Operation {
    /// Shell command for this operation
    pub fn command(&self, application: &str, environment: &str) -> String {
        match self {
            Operation::Tail => format!(
                "cd {}/current && tail -f log/{}.log",
                application, environment
            ),
            Operation::Console => format!(
                "cd {}/current && bundle exec rails console {}",
                application, environment
            ),
            Operation::Test => "echo test".to_string(),
        }
    }

    /// Whether the command keeps running until the user stops it
    pub fn is_interactive(&self) -> bool {
        !matches!(self, Operation::Test)
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "t" | "tail" => Ok(Operation::Tail),
            "c" | "console" => Ok(Operation::Console),
            "test" => Ok(Operation::Test),
            other => Err(Error::UnsupportedOperation {
                operation: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Tail => "tail",
            Operation::Console => "console",
            Operation::Test => "test",
        };
        f.write_str(name)
    }
}

/// Resolve `(application, keyword, environment)` to a remote command
pub fn resolve(application: &str, operation: &str, environment: &str) -> Result<String> {
    let operation: Operation = operation.parse()?;
    Ok(operation.command(application, environment))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_command() {
        assert_eq!(
            resolve("billing", "tail", "production").unwrap(),
            "cd billing/current && tail -f log/production.log"
        );
        assert_eq!(
            resolve("billing", "t", "production").unwrap(),
            "cd billing/current && tail -f log/production.log"
        );
    }

    #[test]
    fn test_console_command() {
        assert_eq!(
            resolve("billing", "console", "staging").unwrap(),
            "cd billing/current && bundle exec rails console staging"
        );
        assert_eq!(
            resolve("shop", "c", "production").unwrap(),
            "cd shop/current && bundle exec rails console production"
        );
    }

    #[test]
    fn test_test_command_is_fixed() {
        assert_eq!(resolve("billing", "test", "staging").unwrap(), "echo test");
        assert_eq!(resolve("other", "test", "production").unwrap(), "echo test");
        assert!(!Operation::Test.is_interactive());
        assert!(Operation::Tail.is_interactive());
    }

    #[test]
    fn test_unknown_operation_rejected() {
        for keyword in ["deploy", "", "TAIL", "tail ", "cons"] {
            match resolve("billing", keyword, "staging") {
                Err(Error::UnsupportedOperation { operation }) => assert_eq!(operation, keyword),
                other => panic!("expected UnsupportedOperation for {:?}, got {:?}", keyword, other),
            }
        }
    }

    #[test]
    fn test_display_uses_long_name() {
        assert_eq!("t".parse::<Operation>().unwrap().to_string(), "tail");
        assert_eq!("c".parse::<Operation>().unwrap().to_string(), "console");
    }
}
