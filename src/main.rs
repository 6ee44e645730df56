//! Notice service entry point.
//!
//! Loads configuration from the environment, wires the dispatcher to the
//! PostgreSQL notice store and runs until SIGINT/SIGTERM/SIGQUIT.

use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use notice::adapters::{new_message_queue, PostgresNoticeRepository};
use notice::application::{
    install_global, AwardHandler, EventDispatcher, ManuscriptAuditHandler, NotificationManager,
};
use notice::config::{AppConfig, LogFormat, LoggingConfig};
use notice::ports::NoticeRepository;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.logging)?;
    config.validate().context("invalid configuration")?;

    tracing::info!(
        backend = %config.queue.backend,
        buffer_size = config.queue.buffer_size,
        worker_count = config.dispatcher.worker_count,
        "Notice service starting"
    );

    let pool = config
        .database
        .connect()
        .await
        .context("failed to connect to database")?;
    if config.database.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run migrations")?;
        tracing::info!("Database migrations applied");
    }
    let repository: Arc<dyn NoticeRepository> = Arc::new(PostgresNoticeRepository::new(pool));

    let queue = new_message_queue(&config.queue).context("failed to build event queue")?;
    let dispatcher = Arc::new(EventDispatcher::new(
        queue,
        config.dispatcher.dispatcher_config(),
    ));
    dispatcher
        .register_handler(Arc::new(ManuscriptAuditHandler::new(repository.clone())))
        .await;
    dispatcher
        .register_handler(Arc::new(AwardHandler::new(repository)))
        .await;
    dispatcher.start().await?;

    let manager = install_global(NotificationManager::new(dispatcher));

    wait_for_shutdown_signal()
        .await
        .context("failed to listen for shutdown signals")?;
    tracing::info!(metrics = ?manager.metrics(), "Shutdown signal received");

    manager.stop().await;
    tracing::info!("Notice service stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .context("invalid log filter")?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigint.recv() => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
