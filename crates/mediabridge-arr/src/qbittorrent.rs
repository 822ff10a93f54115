//! Torrent client health lookups.

use std::sync::Arc;

use async_trait::async_trait;
use mediabridge_config::{ConfigError, ConfigProvider, keys};
use mediabridge_core::{HealthRecord, TorrentHealthSource};
use reqwest::header::{COOKIE, SET_COOKIE};
use tracing::debug;

use crate::error::{ArrError, ArrResult, redact};
use crate::http::{ArrHttp, decode, send};
use crate::wire::TorrentInfo;

const SESSION_COOKIE: &str = "SID";

/// Torrent client reached through its web API.
///
/// Each lookup logs in first and uses the returned session for a single info request.
#[derive(Clone)]
pub struct QbittorrentClient {
    http: ArrHttp,
    config: Arc<dyn ConfigProvider>,
}

impl QbittorrentClient {
    /// Build a client resolving credentials through `config`.
    #[must_use]
    pub fn new(http: ArrHttp, config: Arc<dyn ConfigProvider>) -> Self {
        Self { http, config }
    }

    async fn setting(&self, operation: &'static str, key: &str) -> ArrResult<String> {
        self.config
            .require(key)
            .await
            .map_err(|source| ArrError::Config { operation, source })
    }

    async fn login(&self) -> ArrResult<String> {
        const OP: &str = "qbittorrent.login";
        let url = self.setting(OP, keys::QBITTORRENT_LOGIN_ENDPOINT).await?;
        let username = self
            .config
            .get_or(keys::QBITTORRENT_USERNAME, keys::DEFAULT_QBITTORRENT_USERNAME)
            .await
            .map_err(|source: ConfigError| ArrError::Config { operation: OP, source })?;
        let password = self.setting(OP, keys::QBITTORRENT_PASSWORD).await?;

        let request = self
            .http
            .client()
            .post(&url)
            .form(&[("username", username.as_str()), ("password", password.as_str())]);
        let response = send(OP, &url, request).await?;
        response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(session_id)
            .ok_or_else(|| ArrError::MissingSession { url: redact(&url) })
    }
}

/// Extract the session id from one `Set-Cookie` header value.
fn session_id(header: &str) -> Option<String> {
    let pair = header.split(';').next()?.trim();
    let (name, value) = pair.split_once('=')?;
    (name == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
}

#[async_trait]
impl TorrentHealthSource for QbittorrentClient {
    async fn fetch_health(&self, torrent_ids: &[String]) -> anyhow::Result<Vec<HealthRecord>> {
        const OP: &str = "qbittorrent.fetch_health";
        if torrent_ids.is_empty() {
            return Ok(Vec::new());
        }

        let session = self.login().await?;
        let url = self.setting(OP, keys::QBITTORRENT_INFO_ENDPOINT).await?;
        let hashes = torrent_ids
            .iter()
            .map(|id| id.to_ascii_lowercase())
            .collect::<Vec<_>>()
            .join("|");
        let request = self
            .http
            .client()
            .get(&url)
            .query(&[("hashes", hashes.as_str())])
            .header(COOKIE, format!("{SESSION_COOKIE}={session}"));
        let response = send(OP, &url, request).await?;
        let infos: Vec<TorrentInfo> = decode(OP, &url, response).await?;

        let records: Vec<HealthRecord> = infos
            .into_iter()
            .filter(|info| {
                torrent_ids
                    .iter()
                    .any(|id| id.eq_ignore_ascii_case(info.hash()))
            })
            .map(HealthRecord::from)
            .collect();
        debug!(
            requested = torrent_ids.len(),
            found = records.len(),
            "fetched torrent health"
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use mediabridge_config::StaticConfig;
    use reqwest::Client;

    fn client_for(server: &MockServer, with_username: bool) -> QbittorrentClient {
        let mut values = vec![
            (
                keys::QBITTORRENT_LOGIN_ENDPOINT,
                server.url("/api/v2/auth/login"),
            ),
            (keys::QBITTORRENT_PASSWORD, "hunter2".to_string()),
            (
                keys::QBITTORRENT_INFO_ENDPOINT,
                server.url("/api/v2/torrents/info"),
            ),
        ];
        if with_username {
            values.push((keys::QBITTORRENT_USERNAME, "operator".to_string()));
        }
        QbittorrentClient::new(
            ArrHttp::with_client(Client::new()),
            Arc::new(StaticConfig::new(values)),
        )
    }

    #[test]
    fn session_cookie_is_parsed() {
        assert_eq!(
            session_id("SID=abc123; HttpOnly; path=/"),
            Some("abc123".to_string())
        );
        assert_eq!(session_id("other=1; path=/"), None);
        assert_eq!(session_id("SID=; path=/"), None);
    }

    #[tokio::test]
    async fn health_lookup_logs_in_and_filters_by_hash() {
        let server = MockServer::start_async().await;
        let login = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v2/auth/login")
                .form_urlencoded_tuple("username", "admin")
                .form_urlencoded_tuple("password", "hunter2");
            then.status(200)
                .header("set-cookie", "SID=session42; HttpOnly; path=/")
                .body("Ok.");
        });
        let info = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v2/torrents/info")
                .query_param("hashes", "aaa|bbb")
                .header("cookie", "SID=session42");
            then.status(200).json_body(serde_json::json!([
                {"hash": "aaa", "name": "Movie", "state": "stalledDL", "availability": 0.1,
                 "num_seeds": 0, "dlspeed": 0, "upspeed": 0, "added_on": 1_700_000_000,
                 "last_activity": 1_700_000_100, "progress": 0.42},
                {"hash": "zzz", "name": "Other", "state": "uploading"}
            ]));
        });

        let records = client_for(&server, false)
            .fetch_health(&["AAA".to_string(), "bbb".to_string()])
            .await
            .expect("health");

        login.assert();
        info.assert();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].torrent_id, "aaa");
        assert_eq!(records[0].state, "stalledDL");
        assert!((records[0].progress - 0.42).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn configured_username_is_used() {
        let server = MockServer::start_async().await;
        let login = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v2/auth/login")
                .form_urlencoded_tuple("username", "operator");
            then.status(200).header("set-cookie", "SID=s; path=/");
        });
        server.mock(|when, then| {
            when.method(GET).path("/api/v2/torrents/info");
            then.status(200).json_body(serde_json::json!([]));
        });

        let records = client_for(&server, true)
            .fetch_health(&["abc".to_string()])
            .await
            .expect("health");
        login.assert();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn rejected_login_is_an_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/api/v2/auth/login");
            then.status(200).body("Fails.");
        });

        let err = client_for(&server, false)
            .fetch_health(&["abc".to_string()])
            .await
            .expect_err("no session");
        assert!(matches!(
            err.downcast_ref::<ArrError>(),
            Some(ArrError::MissingSession { .. })
        ));
    }

    #[tokio::test]
    async fn empty_request_skips_the_network() {
        let server = MockServer::start_async().await;
        let login = server.mock(|when, then| {
            when.method(POST).path("/api/v2/auth/login");
            then.status(200);
        });

        let records = client_for(&server, false)
            .fetch_health(&[])
            .await
            .expect("health");
        assert!(records.is_empty());
        login.assert_hits(0);
    }
}
