//! rolechat gateway entry point
//!
//! ```bash
//! cargo run -p rolechat-gateway
//! ```
//!
//! Configuration is read from the environment (and `.env`).

use rolechat_common::{try_init_tracing_with_config, AppConfig, TracingConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;

    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    info!(
        env = ?config.app.env,
        address = %config.gateway.address(),
        "Starting rolechat gateway"
    );

    if let Err(e) = rolechat_gateway::run(config).await {
        error!(error = %e, "Gateway failed");
        return Err(e.into());
    }

    Ok(())
}
