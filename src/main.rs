// Runs the servo loop on a directory of images, logging every velocity command.
//
// Usage: sphere_seeker [config.toml]
// Without an argument the path in $SEEKER_CONFIG is used, and without that the
// built-in defaults.

use anyhow::Context;
use sphere_seeker::config::{CONFIG_ENV_VAR, SeekerConfig};
use sphere_seeker::transport::{DirectorySource, FrameSource, LogSink};
use sphere_seeker::ServoNode;
use std::env;
use tracing::info;
use tracing_subscriber::EnvFilter;

const MAX_WORKER_THREADS: usize = 4;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match env::args().nth(1).or_else(|| env::var(CONFIG_ENV_VAR).ok()) {
        Some(path) => SeekerConfig::load(&path).with_context(|| format!("loading config from {path}"))?,
        None => SeekerConfig::default(),
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get().clamp(1, MAX_WORKER_THREADS))
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    runtime.block_on(run(config))
}

async fn run(config: SeekerConfig) -> anyhow::Result<()> {
    let source = DirectorySource::new(&config.image_topic, config.frame_interval())
        .with_context(|| format!("opening frame source {}", config.image_topic))?;
    info!(frames = source.len(), dir = %config.image_topic, "frame source ready");

    let sink = LogSink::new(config.velocity_topic.clone());
    let node = ServoNode::new(config, sink);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
        }
        let _ = shutdown_tx.send(true);
    });

    let summary = node.run(source.frames(), shutdown_rx).await?;
    info!(
        ticks = summary.control_ticks,
        processed = summary.frames_processed,
        detections = summary.detections,
        failed = summary.frames_failed,
        dropped = summary.frames_dropped,
        "done"
    );
    Ok(())
}
