use tokio::signal::unix::{SignalKind, signal};

/// Entry point for the node telemetry agent.
///
/// Samples node and container resource usage, probes player counts of the game
/// servers running on this host and posts telemetry to the orchestrator until
/// interrupted with SIGINT or SIGTERM.
///
/// # Errors
///
/// Returns an error if startup fails (e.g. missing environment variables or
/// signal handlers that cannot be installed).
///
/// # Examples
///
/// ```bash
/// NODE_ID=node-1 NODE_TOKEN=secret NODE_IP=10.0.0.5 \
///     ORCHESTRATOR_BASE_URL=https://orchestrator.example RUST_LOG=info cargo run
/// ```
#[tokio::main(flavor = "current_thread")]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let shutdown = async move {
        tokio::select! {
            _ = sigint.recv() => log::info!("received SIGINT, shutting down"),
            _ = sigterm.recv() => log::info!("received SIGTERM, shutting down"),
        }
    };

    node_telemetry_agent::run(shutdown).await
}
