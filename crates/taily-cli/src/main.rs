//! taily CLI
//!
//! `taily <application> <operation> <environment>` runs the operation's
//! command on `<application>.nine.ch` with the local terminal attached.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taily::commands::{launch_command, LaunchRequest};
use taily::output::{print_error, print_warning};
use taily_core::config::AGENT_SOCKET_ENV;
use taily_core::Error;

#[derive(Parser, Debug)]
#[command(name = "taily")]
#[command(author, version, about = "Tail logs or open a console on an application host")]
struct Cli {
    /// Application name; also the SSH user and host prefix
    application: String,

    /// Operation to run: t|tail, c|console or test
    operation: String,

    /// Environment whose log to tail or console to open
    environment: String,

    /// ssh-agent socket used for authentication
    #[arg(long, env = AGENT_SOCKET_ENV, hide_env_values = true, value_name = "PATH")]
    agent_socket: Option<PathBuf>,

    /// Enable verbose logging on stderr
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn into_request(self) -> LaunchRequest {
        LaunchRequest {
            application: self.application,
            operation: self.operation,
            environment: self.environment,
            agent_socket: self.agent_socket,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let request = cli.into_request();
    let code = match launch_command(&request).await {
        Ok(_) => 0,
        Err(e) => {
            let code = e.downcast_ref::<Error>().map(Error::exit_code).unwrap_or(1);
            if matches!(e.downcast_ref::<Error>(), Some(Error::Interrupted)) {
                print_warning(&format!("{:#}", e));
            } else {
                print_error(&format!("{:#}", e));
            }
            code
        }
    };

    // Exit here rather than returning: a pending stdin read would otherwise
    // keep the runtime from shutting down. The terminal guard has already
    // been dropped at this point.
    std::process::exit(i32::from(code));
}
