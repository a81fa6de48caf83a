use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voxrelay::audio::RodioSink;
use voxrelay::integration::{Cli, Relay};
use voxrelay::speech::VoicevoxClient;

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voxrelay=info,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Cli::parse().into_config()?;

    info!("Starting voxrelay");

    // Built before the listener runtime exists; the client owns its own runtime
    let synthesizer = VoicevoxClient::new(&config.engine_url)?;
    match synthesizer.engine_version() {
        Ok(version) => info!("VOICEVOX engine {} at {}", version, synthesizer.base_url()),
        Err(e) => warn!("VOICEVOX engine not reachable yet: {}", e),
    }

    let relay = Relay::start(config, synthesizer, RodioSink::new())?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let listener = relay.bind_listener().await?;
        info!(
            "OSC server on {} (send text to {})",
            listener.local_addr()?,
            relay.config().endpoint
        );

        tokio::select! {
            _ = listener.run() => warn!("Control listener stopped"),
            _ = shutdown_signal() => info!("Shutting down..."),
        }

        Ok::<(), anyhow::Error>(())
    })?;

    info!("Final stats: {}", serde_json::to_string(&relay.stats())?);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
}
