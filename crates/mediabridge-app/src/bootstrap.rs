use std::future::Future;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::reconcile::{ReconcileDeps, ReconcileEngine, ReconcileOptions};
use mediabridge_arr::{ArrHttp, QbittorrentClient, RadarrClient, SonarrClient};
use mediabridge_config::{CachedConfig, ConfigProvider, ConfigService, ReconcileSettings};
use mediabridge_core::StuckPolicy;
use mediabridge_data::{DownloadRequestStore, InventorySnapshotStore};
use mediabridge_telemetry::{
    GlobalContextGuard, LOG_FORMAT_ENV, LogFormat, LoggingConfig, ReconcileMetrics,
};
use tokio::sync::watch;
use tracing::{info, warn};

/// Dependencies required to bootstrap the MediaBridge engine.
pub(crate) struct BootstrapDependencies {
    logging: LoggingConfig<'static>,
    settings: ReconcileSettings,
    deps: ReconcileDeps,
}

impl BootstrapDependencies {
    /// Construct production dependencies from the environment for the binary entrypoint.
    pub(crate) async fn from_env() -> AppResult<Self> {
        let logging = LoggingConfig {
            format: LogFormat::from_override(std::env::var(LOG_FORMAT_ENV).ok().as_deref()),
            ..LoggingConfig::default()
        };
        let settings = ReconcileSettings::from_env()
            .map_err(|err| AppError::config("settings.from_env", err))?;

        let database_url = std::env::var("DATABASE_URL").map_err(|_| AppError::MissingEnv {
            name: "DATABASE_URL",
        })?;

        let service = ConfigService::new(&database_url)
            .await
            .map_err(|err| AppError::config("config_service.new", err))?;
        let pool = service.pool().clone();
        let config: Arc<dyn ConfigProvider> =
            Arc::new(CachedConfig::new(service, settings.config_cache_ttl));

        let requests = DownloadRequestStore::new(pool.clone())
            .await
            .map_err(|err| AppError::data("request_store.new", err))?;
        let inventory = InventorySnapshotStore::new(pool)
            .await
            .map_err(|err| AppError::data("inventory_store.new", err))?;

        let http = ArrHttp::new(settings.http_timeout)
            .map_err(|err| AppError::http("arr_http.new", err))?;
        let metrics = ReconcileMetrics::new()
            .map_err(|err| AppError::telemetry("telemetry.metrics", err))?;

        let deps = ReconcileDeps {
            movies: Arc::new(RadarrClient::new(http.clone(), Arc::clone(&config))),
            series: Arc::new(SonarrClient::new(http.clone(), Arc::clone(&config))),
            torrents: Arc::new(QbittorrentClient::new(http, config)),
            requests: Arc::new(requests),
            inventory: Arc::new(inventory),
            discovery: None,
            metrics,
        };

        Ok(Self {
            logging,
            settings,
            deps,
        })
    }
}

/// Entry point for the MediaBridge boot sequence.
///
/// Runs until ctrl-c, then lets in-flight cycles finish.
///
/// # Errors
///
/// Returns an error if dependency construction fails or a loop task dies.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env().await?;
    Box::pin(run_app_with(dependencies, async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "ctrl-c handler unavailable; stopping");
        }
    }))
    .await
}

/// Boot sequence over injected dependencies; `shutdown` resolving stops both loops.
pub(crate) async fn run_app_with(
    dependencies: BootstrapDependencies,
    shutdown: impl Future<Output = ()>,
) -> AppResult<()> {
    mediabridge_telemetry::init_logging(&dependencies.logging)
        .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new("mediabridge");

    let BootstrapDependencies {
        logging: _,
        settings,
        deps,
    } = dependencies;

    let options = ReconcileOptions {
        stuck: StuckPolicy::default(),
        stale_after: chrono::Duration::from_std(settings.stale_after).map_err(|_| {
            AppError::InvalidConfig {
                field: "stale_after".to_string(),
                reason: "out_of_range",
                value: Some(settings.stale_after.as_secs().to_string()),
            }
        })?,
    };
    info!(
        poll_secs = settings.poll_interval.as_secs(),
        maintenance_secs = settings.maintenance_interval.as_secs(),
        stale_after_secs = settings.stale_after.as_secs(),
        "MediaBridge reconciliation starting"
    );

    let engine = Arc::new(ReconcileEngine::new(deps, options));
    let (stop, stop_rx) = watch::channel(false);
    let handles = engine.spawn(
        settings.poll_interval,
        settings.maintenance_interval,
        &stop_rx,
    );

    shutdown.await;
    info!("shutdown requested; waiting for in-flight cycles");
    let _ = stop.send(true);

    handles
        .join()
        .await
        .map_err(|(task, source)| AppError::Task { task, source })?;
    info!("MediaBridge reconciliation stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediabridge_test_support::fakes::{
        FakeMovieTool, FakeSeriesTool, FakeTorrentClient, MemoryInventory, MemoryRequestStore,
    };
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn boot_sequence_runs_until_shutdown() {
        let movies = Arc::new(FakeMovieTool::default());
        let inventory = Arc::new(MemoryInventory::default());
        let dependencies = BootstrapDependencies {
            logging: LoggingConfig::default(),
            settings: ReconcileSettings::default(),
            deps: ReconcileDeps {
                movies: movies.clone(),
                series: Arc::new(FakeSeriesTool::default()),
                torrents: Arc::new(FakeTorrentClient::default()),
                requests: Arc::new(MemoryRequestStore::default()),
                inventory: inventory.clone(),
                discovery: None,
                metrics: ReconcileMetrics::new().expect("metrics"),
            },
        };

        run_app_with(dependencies, tokio::time::sleep(Duration::from_secs(20)))
            .await
            .expect("clean run");

        assert!(movies.calls().await.pokes >= 1);
        assert_eq!(inventory.replacements().await, (1, 1));
    }
}
