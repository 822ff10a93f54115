use std::sync::Arc;
use std::time::Duration;

use mediabridge_config::keys::RADARR_API_KEY;
use mediabridge_config::{CachedConfig, ConfigError, ConfigProvider, ConfigService};
use mediabridge_test_support::postgres::start_postgres;

#[tokio::test]
async fn config_service_reads_stored_values() -> anyhow::Result<()> {
    let postgres = match start_postgres() {
        Ok(db) => db,
        Err(err) => {
            eprintln!("skipping config_service_reads_stored_values: {err}");
            return Ok(());
        }
    };
    let service = Arc::new(ConfigService::new(postgres.connection_string()).await?);

    assert!(matches!(
        service.require(RADARR_API_KEY).await,
        Err(ConfigError::MissingKey { .. })
    ));

    service.set(RADARR_API_KEY, "secret").await?;
    assert_eq!(service.require(RADARR_API_KEY).await?, "secret");

    let cached = CachedConfig::new(Arc::clone(&service), Duration::from_secs(300));
    assert_eq!(cached.require(RADARR_API_KEY).await?, "secret");
    service.set(RADARR_API_KEY, "rotated").await?;
    assert_eq!(cached.require(RADARR_API_KEY).await?, "secret");
    cached.invalidate().await;
    assert_eq!(cached.require(RADARR_API_KEY).await?, "rotated");
    Ok(())
}
