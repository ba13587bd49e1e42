/// Entry point of the overseer service.
///
/// Configuration is read from `OVERSEER_*` environment variables and log
/// verbosity from `RUST_LOG`. The service runs until SIGINT or SIGTERM.
///
/// # Examples
///
/// ```bash
/// RUST_LOG=info OVERSEER_STATS_INTERVAL_SECS=10 cargo run
/// ```
#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    overseer::run().await
}
