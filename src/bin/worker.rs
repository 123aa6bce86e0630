//! Worker-process entry point.
//!
//! Spawned by the scheduler, one process per pool slot. Speaks JSON Lines
//! over stdin/stdout and owns one browser at a time.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    sentinel::runner::worker::run().await
}
