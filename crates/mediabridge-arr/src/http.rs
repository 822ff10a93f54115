//! Shared HTTP plumbing for the wire clients.

use std::time::Duration;

use mediabridge_config::{ConfigProvider, render_endpoint};
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{ArrError, ArrResult, redact};

/// Thin wrapper over a pooled [`reqwest::Client`] that maps failures to [`ArrError`].
#[derive(Debug, Clone)]
pub struct ArrHttp {
    client: Client,
}

impl ArrHttp {
    /// Build a client with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new(timeout: Duration) -> ArrResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ArrError::ClientBuild { source })?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        url: &str,
    ) -> ArrResult<T> {
        let response = send(operation, url, self.client.get(url)).await?;
        decode(operation, url, response).await
    }

    pub(crate) async fn post_json<B: Serialize + ?Sized + Sync>(
        &self,
        operation: &'static str,
        url: &str,
        body: &B,
    ) -> ArrResult<()> {
        send(operation, url, self.client.post(url).json(body)).await?;
        Ok(())
    }

    /// Issue a DELETE; a non-success status is reported as `false`, not an error.
    pub(crate) async fn delete(&self, operation: &'static str, url: &str) -> ArrResult<bool> {
        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(|source| ArrError::Request {
                operation,
                url: redact(url),
                source,
            })?;
        Ok(response.status().is_success())
    }
}

/// Render the endpoint stored under `key`, authenticated with the key stored under
/// `api_key_key`.
pub(crate) async fn resolve_endpoint(
    config: &dyn ConfigProvider,
    operation: &'static str,
    key: &str,
    api_key_key: &str,
    ids: &[(&str, i64)],
) -> ArrResult<String> {
    let wrap = |source| ArrError::Config { operation, source };
    let template = config.require(key).await.map_err(wrap)?;
    let api_key = config.require(api_key_key).await.map_err(wrap)?;
    Ok(render_endpoint(&template, &api_key, ids))
}

/// Send a request and reject non-success statuses.
pub(crate) async fn send(
    operation: &'static str,
    url: &str,
    request: RequestBuilder,
) -> ArrResult<Response> {
    let response = request.send().await.map_err(|source| ArrError::Request {
        operation,
        url: redact(url),
        source,
    })?;
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ArrError::Status {
            operation,
            url: redact(url),
            status,
        })
    }
}

pub(crate) async fn decode<T: DeserializeOwned>(
    operation: &'static str,
    url: &str,
    response: Response,
) -> ArrResult<T> {
    response.json().await.map_err(|source| ArrError::Decode {
        operation,
        url: redact(url),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use reqwest::StatusCode;

    #[tokio::test]
    async fn non_success_status_is_an_error_with_redacted_url() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v3/queue");
            then.status(503);
        });

        let http = ArrHttp::new(Duration::from_secs(5)).expect("client");
        let url = format!("{}/api/v3/queue?apikey=secret", server.base_url());
        let err = http
            .get_json::<serde_json::Value>("radarr.fetch_queue", &url)
            .await
            .expect_err("status error");

        match err {
            ArrError::Status { status, url, .. } => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert!(!url.contains("secret"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_json_is_a_decode_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v3/queue");
            then.status(200).body("not json");
        });

        let http = ArrHttp::with_client(Client::new());
        let err = http
            .get_json::<serde_json::Value>("radarr.fetch_queue", &server.url("/api/v3/queue"))
            .await
            .expect_err("decode error");
        assert!(matches!(err, ArrError::Decode { .. }));
    }

    #[tokio::test]
    async fn delete_reports_refusal_as_false() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(DELETE).path("/api/v3/queue/7");
            then.status(404);
        });
        server.mock(|when, then| {
            when.method(DELETE).path("/api/v3/queue/8");
            then.status(200);
        });

        let http = ArrHttp::with_client(Client::new());
        assert!(
            !http
                .delete("radarr.remove_queue_item", &server.url("/api/v3/queue/7"))
                .await
                .expect("delete")
        );
        assert!(
            http.delete("radarr.remove_queue_item", &server.url("/api/v3/queue/8"))
                .await
                .expect("delete")
        );
    }
}
