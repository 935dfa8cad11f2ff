use std::sync::Arc;

use anyhow::{anyhow, Context};
use switchyard::{init_logging, spawn_liveness_task, LivenessMonitor, Router, Settings};
use tokio::sync::Notify;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load settings")?;
    let logging = init_logging(settings.logging.clone())
        .map_err(|e| anyhow!("failed to initialize logging: {e}"))?;

    let router = Arc::new(Router::new(settings.router.clone()));
    let shutdown = Arc::new(Notify::new());

    let liveness = settings.liveness.enabled.then(|| {
        let monitor = Arc::new(LivenessMonitor::new(settings.liveness.timeout()));
        spawn_liveness_task(
            router.clone(),
            monitor,
            settings.liveness.sweep_interval(),
            shutdown.clone(),
        )
    });

    info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = option_env!("SWITCHYARD_GIT_COMMIT").unwrap_or("unknown"),
        built_at = option_env!("SWITCHYARD_BUILD_TIME").unwrap_or("unknown"),
        "switchyard is running, press Ctrl-C to stop"
    );
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;

    shutdown.notify_one();
    if let Some(task) = liveness {
        let evicted = task.await.context("liveness task failed")?;
        info!("Liveness task evicted {} subscriber(s)", evicted);
    }

    let removed = router.shutdown();
    info!("Stopped, {} subscriber(s) disconnected", removed);
    logging.shutdown();
    Ok(())
}
