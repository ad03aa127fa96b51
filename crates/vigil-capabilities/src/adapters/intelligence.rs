//! AI/intelligence service adapter.
//!
//! | Call | Route | Default timeout |
//! |---|---|---|
//! | `analyze_log` | `POST /v1/analyze-log` | 30 s |
//! | `classify_url` | `POST /v1/classify-url` | 10 s |
//! | `submit_app_list` | `POST /v1/apps` | 5 s |

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use vigil_core::UrlCategory;

use super::post_json;
use crate::connection::{HttpHandle, LazyConnection};
use crate::errors::Result;
use crate::traits::{AppListVerdict, Intelligence};

/// Per-call timeouts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntelligenceTimeouts {
    /// Log analysis.
    pub analysis: Duration,
    /// URL classification.
    pub classify: Duration,
    /// App-list submission.
    pub app_list: Duration,
}

impl Default for IntelligenceTimeouts {
    fn default() -> Self {
        Self {
            analysis: Duration::from_secs(30),
            classify: Duration::from_secs(10),
            app_list: Duration::from_secs(5),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LogAnalysisRequest<'a> {
    client_id: &'a str,
    error_log: &'a str,
    scream_text: &'a str,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LogAnalysisResponse {
    success: bool,
    markdown: String,
    confidence: f64,
    error_type: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ClassifyRequest<'a> {
    client_id: &'a str,
    url: &'a str,
    title: &'a str,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ClassifyResponse {
    classification: String,
    confidence: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AppListRequest<'a> {
    apps_json: &'a str,
    timestamp: i64,
}

/// HTTP client for the intelligence service.
pub struct HttpIntelligence {
    conn: LazyConnection<HttpHandle>,
    timeouts: IntelligenceTimeouts,
}

impl HttpIntelligence {
    /// Create a disconnected adapter.
    pub fn new(endpoint: Option<String>, timeouts: IntelligenceTimeouts) -> Self {
        Self {
            conn: LazyConnection::new("intelligence", endpoint),
            timeouts,
        }
    }
}

#[async_trait]
impl Intelligence for HttpIntelligence {
    async fn analyze_log(
        &self,
        client_id: &str,
        error_log: &str,
        scream_text: &str,
    ) -> Result<Option<String>> {
        info!(client_id, error_log_len = error_log.len(), "requesting log analysis");
        let request = LogAnalysisRequest {
            client_id,
            error_log,
            scream_text,
        };
        let response: LogAnalysisResponse =
            post_json(&self.conn, "v1/analyze-log", &request, self.timeouts.analysis).await?;

        if !response.success {
            warn!(client_id, "log analysis reported failure");
            return Ok(None);
        }
        info!(
            client_id,
            confidence = response.confidence,
            error_type = %response.error_type,
            "log analysis received"
        );
        Ok(Some(response.markdown))
    }

    async fn classify_url(&self, client_id: &str, url: &str, title: &str) -> Result<UrlCategory> {
        let request = ClassifyRequest {
            client_id,
            url,
            title,
        };
        let response: ClassifyResponse =
            post_json(&self.conn, "v1/classify-url", &request, self.timeouts.classify).await?;

        let category = UrlCategory::parse(&response.classification);
        debug!(client_id, url, %category, confidence = response.confidence, "url classified");
        Ok(category)
    }

    async fn submit_app_list(&self, apps_json: &str) -> Result<AppListVerdict> {
        let request = AppListRequest {
            apps_json,
            timestamp: chrono::Utc::now().timestamp_millis(),
        };
        post_json(&self.conn, "v1/apps", &request, self.timeouts.app_list).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CapabilityError;
    use assert_matches::assert_matches;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter(server: &MockServer) -> HttpIntelligence {
        HttpIntelligence::new(Some(server.uri()), IntelligenceTimeouts::default())
    }

    #[test]
    fn default_timeouts() {
        let t = IntelligenceTimeouts::default();
        assert_eq!(t.analysis, Duration::from_secs(30));
        assert_eq!(t.classify, Duration::from_secs(10));
        assert_eq!(t.app_list, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn analyze_log_returns_markdown() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/analyze-log"))
            .and(body_partial_json(serde_json::json!({
                "clientId": "c1",
                "errorLog": "panic at line 3",
                "screamText": "why"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "markdown": "# Fix\nAdd a bounds check.",
                "confidence": 0.8,
                "errorType": "IndexError"
            })))
            .mount(&server)
            .await;

        let markdown = adapter(&server)
            .analyze_log("c1", "panic at line 3", "why")
            .await
            .unwrap();
        assert_eq!(markdown.as_deref(), Some("# Fix\nAdd a bounds check."));
    }

    #[tokio::test]
    async fn analyze_log_unsuccessful_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"success": false})))
            .mount(&server)
            .await;

        let markdown = adapter(&server).analyze_log("c1", "x", "y").await.unwrap();
        assert!(markdown.is_none());
    }

    #[tokio::test]
    async fn classify_maps_categories() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/classify-url"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"classification": "PLAY", "confidence": 0.97})),
            )
            .mount(&server)
            .await;

        let category = adapter(&server)
            .classify_url("c1", "https://store.steampowered.com", "Steam")
            .await
            .unwrap();
        assert_eq!(category, UrlCategory::Play);
    }

    #[tokio::test]
    async fn classify_unrecognised_is_unknown() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"classification": "SPORTS"})))
            .mount(&server)
            .await;

        let category = adapter(&server).classify_url("c1", "u", "t").await.unwrap();
        assert_eq!(category, UrlCategory::Unknown);
    }

    #[tokio::test]
    async fn app_list_verdict() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/apps"))
            .and(body_partial_json(serde_json::json!({"appsJson": "[\"steam\"]"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": "game running",
                "command": "CLOSE_APP",
                "targetApp": "steam"
            })))
            .mount(&server)
            .await;

        let verdict = adapter(&server).submit_app_list("[\"steam\"]").await.unwrap();
        assert!(verdict.has_command());
        assert_eq!(verdict.target_app, "steam");
    }

    #[tokio::test]
    async fn app_list_timeout_is_shorter_than_analysis() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(300)))
            .mount(&server)
            .await;

        let intelligence = HttpIntelligence::new(
            Some(server.uri()),
            IntelligenceTimeouts {
                analysis: Duration::from_secs(5),
                classify: Duration::from_secs(5),
                app_list: Duration::from_millis(20),
            },
        );
        let err = intelligence.submit_app_list("[]").await.unwrap_err();
        assert_matches!(err, CapabilityError::Timeout { timeout_ms: 20 });
    }

    #[tokio::test]
    async fn malformed_body_is_json_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = adapter(&server).classify_url("c1", "u", "t").await.unwrap_err();
        assert_matches!(err, CapabilityError::Json(_));
    }
}
