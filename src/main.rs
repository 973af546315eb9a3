use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use trigger_watch::{DEFAULT_ADDRESS, DEFAULT_MAX_EVENTS, Supervisor};

/// Watch one TCP connection with edge- and level-triggered epoll at once
#[derive(Parser, Debug)]
#[command(name = "trigger-watch")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Address to listen on
    #[arg(short, long, default_value = DEFAULT_ADDRESS)]
    address: String,

    /// Events collected per wait, per watcher
    #[arg(long, default_value_t = DEFAULT_MAX_EVENTS)]
    max_events: usize,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let supervisor = Supervisor::builder()
        .address(cli.address)
        .max_events(cli.max_events)
        .build();

    let session = match supervisor.run() {
        Ok(session) => session,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let report = session.serve(|received| println!("{received}"));

    for (mode, outcome) in [("edge", report.edge), ("level", report.level)] {
        match outcome {
            Ok(exit) => info!(mode, ?exit, "watcher finished"),
            Err(err) => debug!(mode, error = %err, "watcher failed"),
        }
    }

    // Nothing left to serve; stay up until the process is killed.
    loop {
        std::thread::park();
    }
}
