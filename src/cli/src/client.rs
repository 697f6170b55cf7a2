//! HTTP client for the Cadence dashboard API.

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error body returned by the server for every failed request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    #[serde(default)]
    pub message: String,
    pub detailed_message: Option<String>,
    pub trace_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not logged in or token expired; run `cadence login` ({message})")]
    Unauthorized { message: String },

    #[error("API error ({status}): {message}{}", suffix(.detail))]
    Status {
        status: StatusCode,
        message: String,
        detail: Option<String>,
        trace_id: Option<String>,
    },
}

fn suffix(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(" - {d}")).unwrap_or_default()
}

/// HTTP client for the dashboard API.
pub struct ApiClient {
    client: Client,
    base_url: Url,
    route_prefix: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a client for the server at `base_url` whose API lives under
    /// `/{route_prefix}/api`.
    pub fn new(base_url: &str, route_prefix: &str, token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .with_context(|| format!("Invalid API URL: {base_url}"))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Invalid API URL: {base_url}");
        }

        Ok(Self {
            client,
            base_url,
            route_prefix: route_prefix.trim_matches('/').to_string(),
            token,
        })
    }

    /// Return the configured base URL.
    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// URL of a root-level path such as `/health`.
    fn root_url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// URL under the API base. Segments are percent-encoded, so keys may
    /// contain any character.
    pub fn api_url(&self, segments: &[&str]) -> Url {
        let mut full: Vec<&str> = Vec::with_capacity(segments.len() + 2);
        if !self.route_prefix.is_empty() {
            full.push(&self.route_prefix);
        }
        full.push("api");
        full.extend_from_slice(segments);
        self.root_url(&full)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T> {
        let resp = self
            .authorized(request)
            .send()
            .await
            .with_context(|| format!("{what} failed"))?;

        let status = resp.status();
        if !status.is_success() {
            let body: ErrorBody = resp.json().await.unwrap_or_default();
            if status == StatusCode::UNAUTHORIZED {
                return Err(ApiError::Unauthorized {
                    message: body.detailed_message.unwrap_or(body.message),
                }
                .into());
            }
            return Err(ApiError::Status {
                status,
                message: body.message,
                detail: body.detailed_message,
                trace_id: body.trace_id,
            }
            .into());
        }

        resp.json()
            .await
            .with_context(|| format!("Failed to parse response from {what}"))
    }

    /// GET an API resource.
    pub async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let url = self.api_url(segments);
        let what = format!("GET {url}");
        self.send(self.client.get(url), &what).await
    }

    /// GET an API resource with query parameters.
    pub async fn get_with_query<T, Q>(&self, segments: &[&str], query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = self.api_url(segments);
        let what = format!("GET {url}");
        self.send(self.client.get(url).query(query), &what).await
    }

    /// POST a JSON body.
    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T> {
        let url = self.api_url(segments);
        let what = format!("POST {url}");
        self.send(self.client.post(url).json(body), &what).await
    }

    /// POST without a body, optionally with query parameters.
    pub async fn post_empty<T, Q>(&self, segments: &[&str], query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = self.api_url(segments);
        let what = format!("POST {url}");
        self.send(self.client.post(url).query(query), &what).await
    }

    /// DELETE an API resource.
    pub async fn delete<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let url = self.api_url(segments);
        let what = format!("DELETE {url}");
        self.send(self.client.delete(url), &what).await
    }

    /// GET a root-level endpoint, returning the body whatever the status.
    ///
    /// `/health` answers 503 with a JSON body when the scheduler is down.
    pub async fn get_raw(&self, path: &str) -> Result<(StatusCode, serde_json::Value)> {
        let url = self.root_url(&[path.trim_start_matches('/')]);
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?;

        let status = resp.status();
        let body = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {url}"))?;
        Ok((status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_api_url_encodes_keys() {
        let client = ApiClient::new("http://localhost:8080/", "cadence", None).unwrap();
        assert_eq!(
            client.api_url(&["jobs", "reports.Nightly Roll/up", "pause"]).as_str(),
            "http://localhost:8080/cadence/api/jobs/reports.Nightly%20Roll%2Fup/pause"
        );

        let bare = ApiClient::new("http://localhost:8080", "", None).unwrap();
        assert_eq!(bare.api_url(&["jobs"]).as_str(), "http://localhost:8080/api/jobs");
    }

    #[tokio::test]
    async fn test_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cadence/api/jobs"))
            .and(header("authorization", "Bearer tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri(), "cadence", Some("tok-1".into())).unwrap();
        let jobs: Vec<serde_json::Value> = client.get(&["jobs"]).await.unwrap();
        assert!(jobs.is_empty());
    }

    #[tokio::test]
    async fn test_error_body_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cadence/api/jobs/DEFAULT.Missing/pause"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "statusCode": 500,
                "message": "An unexpected error occurred.",
                "detailedMessage": "Job DEFAULT.Missing does not exist",
                "traceId": "t-9"
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri(), "cadence", Some("tok".into())).unwrap();
        let err = client
            .post_empty::<serde_json::Value, _>(&["jobs", "DEFAULT.Missing", "pause"], &[] as &[(&str, &str)])
            .await
            .unwrap_err();

        match err.downcast_ref::<ApiError>() {
            Some(ApiError::Status {
                status,
                detail,
                trace_id,
                ..
            }) => {
                assert_eq!(*status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(detail.as_deref(), Some("Job DEFAULT.Missing does not exist"));
                assert_eq!(trace_id.as_deref(), Some("t-9"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unauthorized_suggests_login() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cadence/api/scheduler/status"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "statusCode": 401,
                "message": "Authentication required.",
                "detailedMessage": "Token has expired"
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri(), "cadence", None).unwrap();
        let err = client
            .get::<serde_json::Value>(&["scheduler", "status"])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("cadence login"));
        assert!(err.to_string().contains("Token has expired"));
    }

    #[tokio::test]
    async fn test_query_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cadence/api/scheduler/shutdown"))
            .and(query_param("waitForJobsToComplete", "false"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "success": true, "message": "Scheduler shutdown" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri(), "cadence", None).unwrap();
        let resp: serde_json::Value = client
            .post_empty(&["scheduler", "shutdown"], &[("waitForJobsToComplete", "false")])
            .await
            .unwrap();
        assert_eq!(resp["success"], true);
    }

    #[tokio::test]
    async fn test_raw_health_keeps_unavailable_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(
                ResponseTemplate::new(503)
                    .set_body_json(json!({ "status": "unhealthy", "state": "Shutdown" })),
            )
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri(), "cadence", None).unwrap();
        let (status, body) = client.get_raw("/health").await.unwrap();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["state"], "Shutdown");
    }
}
