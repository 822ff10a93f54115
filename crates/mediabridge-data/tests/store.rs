use chrono::{Duration, TimeZone, Utc};
use mediabridge_core::{
    DownloadedMovie, DownloadedShow, InventoryStore, MediaDetails, MediaIdentity, MediaKind,
    NewDownloadRequest, RequestBatch, RequestProgress, RequestStatus, RequestStore,
    SeasonSnapshot, SeriesSnapshot,
};
use mediabridge_data::config::{fetch_config_value, upsert_config_value};
use mediabridge_data::{DownloadRequestStore, InventorySnapshotStore};
use mediabridge_test_support::postgres::{TestDatabase, start_postgres};
use sqlx::postgres::PgPoolOptions;

async fn connect(test: &str) -> anyhow::Result<Option<(TestDatabase, sqlx::PgPool)>> {
    let postgres = match start_postgres() {
        Ok(db) => db,
        Err(err) => {
            eprintln!("skipping {test}: {err}");
            return Ok(None);
        }
    };
    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect(postgres.connection_string())
        .await?;
    Ok(Some((postgres, pool)))
}

fn details(title: &str) -> MediaDetails {
    MediaDetails {
        title: title.to_string(),
        ..MediaDetails::default()
    }
}

#[tokio::test]
async fn batch_updates_and_inserts_are_persisted_together() -> anyhow::Result<()> {
    let Some((_db, pool)) = connect("batch_updates_and_inserts_are_persisted_together").await?
    else {
        return Ok(());
    };
    let store = DownloadRequestStore::new(pool).await?;
    let requested = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single().expect("timestamp");

    let movie_id = store
        .submit(
            &MediaIdentity::Movie {
                movie_id: 603,
                tool_movie_id: None,
            },
            &details("The Matrix"),
            9,
            requested,
        )
        .await?;
    store
        .submit(
            &MediaIdentity::Series { series_id: 81189 },
            &details("Breaking Bad"),
            9,
            requested,
        )
        .await?;

    assert!(
        store
            .has_active(&[MediaKind::Movie], &[RequestStatus::Queued])
            .await?
    );
    assert!(
        !store
            .has_active(&[MediaKind::Episode], &[RequestStatus::Queued])
            .await?
    );

    let mut movie = store.find_movie(603).await?.expect("movie request");
    assert_eq!(movie.id, movie_id);
    let now = requested + Duration::minutes(5);
    movie.record_tool_movie_id(12);
    assert!(movie.observe(RequestProgress::completed(), now));

    let episode = NewDownloadRequest {
        identity: MediaIdentity::Episode {
            series_id: 81189,
            episode_id: 501,
            tool_series_id: 3,
            season_number: 1,
            episode_number: 1,
            air_date: None,
        },
        details: details("Pilot"),
        progress: RequestProgress {
            status: RequestStatus::Downloading,
            percent: 40,
            minutes_left: Some(12),
        },
        user_id: 9,
        requested_at: now,
    };

    store
        .save_batch(&RequestBatch {
            updated: vec![movie.clone()],
            inserted: vec![episode],
        })
        .await?;

    let stored = store.get(movie_id).await?.expect("stored movie");
    assert_eq!(stored.progress, RequestProgress::completed());
    assert_eq!(stored.completed_at, Some(now));
    assert_eq!(
        stored.identity,
        MediaIdentity::Movie {
            movie_id: 603,
            tool_movie_id: Some(12)
        }
    );

    let episodes = store.find_episodes(&[501, 777]).await?;
    assert_eq!(episodes.len(), 1);
    assert_eq!(episodes[0].identity.series_id(), Some(81189));
    assert_eq!(episodes[0].progress.percent, 40);
    assert_eq!(store.episodes_for_series(81189).await?.len(), 1);
    assert!(store.find_series(81189).await?.is_some());

    let downloading = store
        .list_by_status(MediaKind::Episode, RequestStatus::Downloading)
        .await?;
    assert_eq!(downloading.len(), 1);
    Ok(())
}

#[tokio::test]
async fn completed_at_survives_a_regressing_update() -> anyhow::Result<()> {
    let Some((_db, pool)) = connect("completed_at_survives_a_regressing_update").await? else {
        return Ok(());
    };
    let store = DownloadRequestStore::new(pool).await?;
    let requested = Utc
        .with_ymd_and_hms(2024, 6, 2, 8, 30, 0)
        .single()
        .expect("timestamp");
    store
        .submit(
            &MediaIdentity::Movie {
                movie_id: 11,
                tool_movie_id: None,
            },
            &details("Star Wars"),
            1,
            requested,
        )
        .await?;

    let mut movie = store.find_movie(11).await?.expect("movie");
    let completed = requested + Duration::minutes(10);
    movie.observe(RequestProgress::completed(), completed);
    store
        .save_batch(&RequestBatch {
            updated: vec![movie.clone()],
            inserted: Vec::new(),
        })
        .await?;

    movie.observe(RequestProgress::queued(), completed + Duration::minutes(1));
    movie.completed_at = None;
    store
        .save_batch(&RequestBatch {
            updated: vec![movie],
            inserted: Vec::new(),
        })
        .await?;

    let stored = store.find_movie(11).await?.expect("movie");
    assert_eq!(stored.progress.status, RequestStatus::Queued);
    assert_eq!(stored.completed_at, Some(completed));
    Ok(())
}

#[tokio::test]
async fn inventory_replace_is_idempotent() -> anyhow::Result<()> {
    let Some((_db, pool)) = connect("inventory_replace_is_idempotent").await? else {
        return Ok(());
    };
    let store = InventorySnapshotStore::new(pool).await?;

    let series = SeriesSnapshot {
        tool_series_id: 2,
        title: "Dark".into(),
        tvdb_id: Some(334_824),
        size_on_disk: 10,
        seasons: vec![
            SeasonSnapshot {
                season_number: 0,
                ..SeasonSnapshot::default()
            },
            SeasonSnapshot {
                season_number: 1,
                monitored: true,
                episode_file_count: 10,
                episode_count: 10,
                total_episode_count: 10,
                size_on_disk: 10,
            },
        ],
        ..SeriesSnapshot::default()
    };
    let shows = DownloadedShow::rows_for(&series);
    let movies = vec![DownloadedMovie {
        tool_movie_id: 4,
        title: "Heat".into(),
        overview: None,
        has_file: true,
        added: None,
        year: Some(1995),
        imdb_id: Some("tt0113277".into()),
        tmdb_id: Some(949),
        poster_url: None,
        size_gib: 1.5,
        path: None,
        monitored: true,
        runtime: Some(170),
    }];

    store.replace_movies(&movies).await?;
    store.replace_shows(&shows).await?;
    let first_movies = store.movies().await?;
    let first_shows = store.shows().await?;

    store.replace_movies(&movies).await?;
    store.replace_shows(&shows).await?;
    assert_eq!(store.movies().await?, first_movies);
    assert_eq!(store.shows().await?, first_shows);
    assert_eq!(first_movies, movies);
    assert_eq!(first_shows, shows);

    store.replace_movies(&[]).await?;
    assert!(store.movies().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn config_values_round_trip() -> anyhow::Result<()> {
    let Some((_db, pool)) = connect("config_values_round_trip").await? else {
        return Ok(());
    };
    mediabridge_data::config::run_migrations(&pool).await?;
    assert_eq!(fetch_config_value(&pool, "radarr_api_key").await?, None);
    upsert_config_value(&pool, "radarr_api_key", "abc").await?;
    upsert_config_value(&pool, "radarr_api_key", "def").await?;
    assert_eq!(
        fetch_config_value(&pool, "radarr_api_key").await?,
        Some("def".to_string())
    );
    Ok(())
}
