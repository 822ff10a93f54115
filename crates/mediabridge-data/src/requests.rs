//! Download request persistence.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mediabridge_core::{
    DownloadRequest, MediaDetails, MediaIdentity, MediaKind, NewDownloadRequest, RequestBatch,
    RequestProgress, RequestStatus, RequestStore,
};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::debug;

use crate::config::run_migrations;
use crate::error::{DataError, Result, map_query_err};

const TABLE: &str = "download_requests";

macro_rules! select_requests {
    ($predicate:literal) => {
        concat!(
            "SELECT id, media_kind, movie_id, tool_movie_id, series_id, episode_id, ",
            "tool_series_id, season_number, episode_number, air_date, title, description, ",
            "poster_url, release_year, status, percent, minutes_left, user_id, requested_at, ",
            "updated_at, completed_at FROM download_requests WHERE ",
            $predicate,
            " ORDER BY id"
        )
    };
}

const GET_REQUEST: &str = select_requests!("id = $1");
const FIND_MOVIE: &str = select_requests!("media_kind = 'movie' AND movie_id = $1");
const FIND_SERIES: &str = select_requests!("media_kind = 'series' AND series_id = $1");
const FIND_EPISODES: &str = select_requests!("media_kind = 'episode' AND episode_id = ANY($1)");
const SERIES_EPISODES: &str = select_requests!("media_kind = 'episode' AND series_id = $1");
const BY_STATUS: &str = select_requests!("media_kind = $1 AND status = $2");

const HAS_ACTIVE: &str = r"
    SELECT EXISTS (
        SELECT 1 FROM download_requests
        WHERE media_kind = ANY($1) AND status = ANY($2)
    )
";

const UPDATE_REQUEST: &str = r"
    UPDATE download_requests
    SET tool_movie_id = COALESCE($2, tool_movie_id),
        status = $3,
        percent = $4,
        minutes_left = $5,
        updated_at = $6,
        completed_at = COALESCE(completed_at, $7)
    WHERE id = $1
";

const INSERT_EPISODE: &str = r"
    INSERT INTO download_requests (
        media_kind, series_id, episode_id, tool_series_id, season_number, episode_number,
        air_date, title, description, poster_url, release_year, status, percent,
        minutes_left, user_id, requested_at, updated_at, completed_at
    )
    VALUES ('episode', $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $15,
            CASE WHEN $11 = 'completed' THEN $15 END)
";

const INSERT_REQUEST: &str = r"
    INSERT INTO download_requests (
        media_kind, movie_id, tool_movie_id, series_id, title, description, poster_url,
        release_year, status, percent, minutes_left, user_id, requested_at, updated_at
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13)
    RETURNING id
";

/// Raw projection of the `download_requests` table.
#[derive(Debug, Clone, FromRow)]
struct RequestRow {
    id: i64,
    media_kind: String,
    movie_id: Option<i32>,
    tool_movie_id: Option<i32>,
    series_id: Option<i32>,
    episode_id: Option<i32>,
    tool_series_id: Option<i32>,
    season_number: Option<i32>,
    episode_number: Option<i32>,
    air_date: Option<DateTime<Utc>>,
    title: String,
    description: Option<String>,
    poster_url: Option<String>,
    release_year: Option<i32>,
    status: String,
    percent: i16,
    minutes_left: Option<i32>,
    user_id: i64,
    requested_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<RequestRow> for DownloadRequest {
    type Error = DataError;

    fn try_from(row: RequestRow) -> Result<Self> {
        let id = row.id;
        let invalid = |reason: &'static str| DataError::InvalidRow {
            table: TABLE,
            id,
            reason,
            source: None,
        };
        let kind = row
            .media_kind
            .parse::<MediaKind>()
            .map_err(|source| DataError::InvalidRow {
                table: TABLE,
                id,
                reason: "unknown media kind",
                source: Some(source),
            })?;
        let status = row
            .status
            .parse::<RequestStatus>()
            .map_err(|source| DataError::InvalidRow {
                table: TABLE,
                id,
                reason: "unknown status",
                source: Some(source),
            })?;
        let percent = u8::try_from(row.percent)
            .ok()
            .filter(|value| *value <= 100)
            .ok_or_else(|| invalid("percent out of range"))?;
        let minutes_left = row
            .minutes_left
            .map(u32::try_from)
            .transpose()
            .map_err(|_| invalid("negative minutes_left"))?;

        let identity = match kind {
            MediaKind::Movie => MediaIdentity::Movie {
                movie_id: row.movie_id.ok_or_else(|| invalid("missing movie_id"))?,
                tool_movie_id: row.tool_movie_id,
            },
            MediaKind::Series => MediaIdentity::Series {
                series_id: row.series_id.ok_or_else(|| invalid("missing series_id"))?,
            },
            MediaKind::Episode => MediaIdentity::Episode {
                series_id: row.series_id.ok_or_else(|| invalid("missing series_id"))?,
                episode_id: row.episode_id.ok_or_else(|| invalid("missing episode_id"))?,
                tool_series_id: row
                    .tool_series_id
                    .ok_or_else(|| invalid("missing tool_series_id"))?,
                season_number: row
                    .season_number
                    .ok_or_else(|| invalid("missing season_number"))?,
                episode_number: row
                    .episode_number
                    .ok_or_else(|| invalid("missing episode_number"))?,
                air_date: row.air_date,
            },
        };

        Ok(Self {
            id,
            identity,
            details: MediaDetails {
                title: row.title,
                description: row.description,
                poster_url: row.poster_url,
                release_year: row.release_year,
            },
            progress: RequestProgress {
                status,
                percent,
                minutes_left,
            },
            user_id: row.user_id,
            requested_at: row.requested_at,
            updated_at: row.updated_at,
            completed_at: row.completed_at,
        })
    }
}

fn minutes_column(minutes: Option<u32>) -> Option<i32> {
    minutes.map(|value| i32::try_from(value).unwrap_or(i32::MAX))
}

fn map_rows(rows: Vec<RequestRow>) -> Result<Vec<DownloadRequest>> {
    rows.into_iter().map(DownloadRequest::try_from).collect()
}

/// Database-backed repository for download requests.
#[derive(Clone)]
pub struct DownloadRequestStore {
    pool: PgPool,
}

impl DownloadRequestStore {
    /// Initialise the store, applying pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if migrations fail or the database is unreachable.
    pub async fn new(pool: PgPool) -> Result<Self> {
        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Access the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert a movie or series request as the submission flow would.
    ///
    /// Episode identities are rejected; episodes are created by queue reconciliation.
    ///
    /// # Errors
    ///
    /// Returns an error if the identity is an episode or the insert fails.
    pub async fn submit(
        &self,
        identity: &MediaIdentity,
        details: &MediaDetails,
        user_id: i64,
        requested_at: DateTime<Utc>,
    ) -> Result<i64> {
        let (movie_id, tool_movie_id, series_id) = match identity {
            MediaIdentity::Movie {
                movie_id,
                tool_movie_id,
            } => (Some(*movie_id), *tool_movie_id, None),
            MediaIdentity::Series { series_id } => (None, None, Some(*series_id)),
            MediaIdentity::Episode { .. } => {
                return Err(DataError::InvalidRow {
                    table: TABLE,
                    id: 0,
                    reason: "episodes are not submitted directly",
                    source: None,
                });
            }
        };
        let progress = RequestProgress::queued();
        sqlx::query_scalar::<_, i64>(INSERT_REQUEST)
            .bind(identity.kind().as_str())
            .bind(movie_id)
            .bind(tool_movie_id)
            .bind(series_id)
            .bind(&details.title)
            .bind(&details.description)
            .bind(&details.poster_url)
            .bind(details.release_year)
            .bind(progress.status.as_str())
            .bind(i16::from(progress.percent))
            .bind(minutes_column(progress.minutes_left))
            .bind(user_id)
            .bind(requested_at)
            .fetch_one(&self.pool)
            .await
            .map_err(map_query_err("submit download request"))
    }

    /// Load a request by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row is malformed.
    pub async fn get(&self, id: i64) -> Result<Option<DownloadRequest>> {
        let row = sqlx::query_as::<_, RequestRow>(GET_REQUEST)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_query_err("get download request"))?;
        row.map(DownloadRequest::try_from).transpose()
    }

    async fn write_batch(&self, batch: &RequestBatch) -> Result<()> {
        let mut tx: Transaction<'_, Postgres> = self
            .pool
            .begin()
            .await
            .map_err(map_query_err("begin request batch"))?;

        for request in &batch.updated {
            let tool_movie_id = match &request.identity {
                MediaIdentity::Movie { tool_movie_id, .. } => *tool_movie_id,
                _ => None,
            };
            sqlx::query(UPDATE_REQUEST)
                .bind(request.id)
                .bind(tool_movie_id)
                .bind(request.progress.status.as_str())
                .bind(i16::from(request.progress.percent))
                .bind(minutes_column(request.progress.minutes_left))
                .bind(request.updated_at)
                .bind(request.completed_at)
                .execute(tx.as_mut())
                .await
                .map_err(map_query_err("update download request"))?;
        }

        for request in &batch.inserted {
            insert_episode(&mut tx, request).await?;
        }

        tx.commit()
            .await
            .map_err(map_query_err("commit request batch"))?;
        debug!(
            updated = batch.updated.len(),
            inserted = batch.inserted.len(),
            "request batch persisted"
        );
        Ok(())
    }
}

async fn insert_episode(
    tx: &mut Transaction<'_, Postgres>,
    request: &NewDownloadRequest,
) -> Result<()> {
    let MediaIdentity::Episode {
        series_id,
        episode_id,
        tool_series_id,
        season_number,
        episode_number,
        air_date,
    } = request.identity
    else {
        return Err(DataError::InvalidRow {
            table: TABLE,
            id: 0,
            reason: "only episodes are inserted by reconciliation",
            source: None,
        });
    };
    sqlx::query(INSERT_EPISODE)
        .bind(series_id)
        .bind(episode_id)
        .bind(tool_series_id)
        .bind(season_number)
        .bind(episode_number)
        .bind(air_date)
        .bind(&request.details.title)
        .bind(&request.details.description)
        .bind(&request.details.poster_url)
        .bind(request.details.release_year)
        .bind(request.progress.status.as_str())
        .bind(i16::from(request.progress.percent))
        .bind(minutes_column(request.progress.minutes_left))
        .bind(request.user_id)
        .bind(request.requested_at)
        .execute(tx.as_mut())
        .await
        .map_err(map_query_err("insert episode request"))?;
    Ok(())
}

fn labels<T: Copy>(values: &[T], label: impl Fn(T) -> &'static str) -> Vec<String> {
    values.iter().map(|value| label(*value).to_string()).collect()
}

#[async_trait]
impl RequestStore for DownloadRequestStore {
    async fn has_active(
        &self,
        kinds: &[MediaKind],
        statuses: &[RequestStatus],
    ) -> anyhow::Result<bool> {
        let active = sqlx::query_scalar::<_, bool>(HAS_ACTIVE)
            .bind(labels(kinds, MediaKind::as_str))
            .bind(labels(statuses, RequestStatus::as_str))
            .fetch_one(&self.pool)
            .await
            .map_err(map_query_err("check active requests"))?;
        Ok(active)
    }

    async fn find_movie(&self, movie_id: i32) -> anyhow::Result<Option<DownloadRequest>> {
        let row = sqlx::query_as::<_, RequestRow>(FIND_MOVIE)
            .bind(movie_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_query_err("find movie request"))?;
        Ok(row.map(DownloadRequest::try_from).transpose()?)
    }

    async fn find_series(&self, series_id: i32) -> anyhow::Result<Option<DownloadRequest>> {
        let row = sqlx::query_as::<_, RequestRow>(FIND_SERIES)
            .bind(series_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_query_err("find series request"))?;
        Ok(row.map(DownloadRequest::try_from).transpose()?)
    }

    async fn find_episodes(&self, episode_ids: &[i32]) -> anyhow::Result<Vec<DownloadRequest>> {
        let rows = sqlx::query_as::<_, RequestRow>(FIND_EPISODES)
            .bind(episode_ids.to_vec())
            .fetch_all(&self.pool)
            .await
            .map_err(map_query_err("find episode requests"))?;
        Ok(map_rows(rows)?)
    }

    async fn episodes_for_series(
        &self,
        series_id: i32,
    ) -> anyhow::Result<Vec<DownloadRequest>> {
        let rows = sqlx::query_as::<_, RequestRow>(SERIES_EPISODES)
            .bind(series_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_query_err("list series episodes"))?;
        Ok(map_rows(rows)?)
    }

    async fn list_by_status(
        &self,
        kind: MediaKind,
        status: RequestStatus,
    ) -> anyhow::Result<Vec<DownloadRequest>> {
        let rows = sqlx::query_as::<_, RequestRow>(BY_STATUS)
            .bind(kind.as_str())
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(map_query_err("list requests by status"))?;
        Ok(map_rows(rows)?)
    }

    async fn save_batch(&self, batch: &RequestBatch) -> anyhow::Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.write_batch(batch)
            .await
            .context("failed to persist request batch")?;
        Ok(())
    }
}
