mod console;

use clap::Parser;
use inspector_runtime::LaunchConfig;
use std::process;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

const EDIT_QUEUE_CAP: usize = 64;

fn main() {
    let config = LaunchConfig::parse();
    init_tracing(&config.log_filter);

    if let Err(err) = run(config) {
        tracing::error!(%err, "inspector_host fatal error");
        process::exit(1);
    }
}

fn run(config: LaunchConfig) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let (edit_tx, edit_rx) = mpsc::channel(EDIT_QUEUE_CAP);
    // Not joined: a blocked stdin read must not hold up process exit.
    let _edit_reader = console::spawn_edit_reader(edit_tx);

    runtime.block_on(inspector_runtime::run(
        config,
        console::ConsoleSurface,
        edit_rx,
    ))?;

    Ok(())
}

fn init_tracing(fallback_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}
