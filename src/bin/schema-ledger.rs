//! schema-ledger command-line entry point

use schema_ledger::cli;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install log subscriber: {}", e);
    }

    if let Err(e) = cli::run() {
        if cli::write_error(&e).is_err() {
            eprintln!("{}", e);
        }
        std::process::exit(1);
    }
}
