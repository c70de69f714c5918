use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::task::JoinSet;
use voxstream_server::config::ServerConfig;
use voxstream_server::dashboard::{self, DashboardState, Metrics};
use voxstream_server::session;
use voxstream_server::universe::Universe;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config_path: Option<PathBuf> = args
        .iter()
        .skip_while(|a| *a != "--config")
        .nth(1)
        .map(PathBuf::from);
    let mut config = ServerConfig::load(config_path.as_deref())?;
    config.apply_args(&args)?;
    let config = Arc::new(config);

    tracing::info!("voxstream -- interest-managed chunk streaming");

    let metrics = Arc::new(Metrics::new());
    let universe = Arc::new(Universe::new(&config, metrics).context("building worlds")?);

    // Dashboard runs on its own tasks.
    let dashboard = Arc::new(DashboardState::new(Arc::clone(&universe)));
    let port = config.dashboard_port;
    tokio::spawn(async move {
        dashboard::server::start(dashboard, port).await;
    });

    tracing::info!(
        "Starting {} bots in {:?} (render distance {})",
        config.bots.count,
        config.dimension,
        config.render_distance
    );
    let mut bots = JoinSet::new();
    for index in 0..config.bots.count {
        bots.spawn(session::run_bot(
            Arc::clone(&universe),
            Arc::clone(&config),
            index,
        ));
    }

    let drained = async {
        while let Some(joined) = bots.join_next().await {
            match joined {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => tracing::error!("Bot failed: {:#}", e),
                Err(e) => tracing::error!("Bot task panicked: {}", e),
            }
        }
    };

    tokio::select! {
        _ = drained => {
            let snap = universe.metrics().snapshot(universe.column_count().await as u64);
            tracing::info!(
                "All bots finished: {} columns generated, {} loads, {} unloads, {} MiB encoded",
                snap.columns,
                snap.chunk_loads,
                snap.chunk_unloads,
                snap.chunk_bytes / (1024 * 1024)
            );
            tracing::info!("Dashboard stays up; Ctrl+C to exit");
            tokio::signal::ctrl_c().await.context("waiting for Ctrl+C")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Ctrl+C received, shutting down...");
        }
    }

    Ok(())
}
