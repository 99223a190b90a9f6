use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::contract::{self, ParseError};
use crate::models::{RecommendationResult, SimulationInput, SimulationResult, StudentInput};

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000";

const USER_NOTICE: &str =
    "Could not reach the recommendation service. Make sure the backend is running.";

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("service responded with status {0}")]
    Status(u16),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl ServiceError {
    /// Every failure collapses to the same notice for the user.
    pub fn user_message(&self) -> &'static str {
        USER_NOTICE
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        ServiceError::Transport(err.to_string())
    }
}

/// The remote engine that does the actual scoring.
#[async_trait]
pub trait AdvisorService: Send + Sync {
    async fn recommend(&self, input: &StudentInput) -> Result<RecommendationResult, ServiceError>;
    async fn simulate(&self, input: &SimulationInput) -> Result<SimulationResult, ServiceError>;
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.to_string(),
            timeout,
        }
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

pub struct HttpAdvisor {
    config: ClientConfig,
    http: reqwest::Client,
}

impl HttpAdvisor {
    pub fn new(config: ClientConfig) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("stream-advisor/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()?;
        Ok(Self { config, http })
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<String, ServiceError> {
        let url = self.config.endpoint(path);
        let started = Instant::now();
        debug!(%url, "sending request");

        let response = self.http.post(&url).json(body).send().await.map_err(|err| {
            warn!(%url, error = %err, "request failed");
            ServiceError::from(err)
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "service returned an error status");
            return Err(ServiceError::Status(status.as_u16()));
        }

        let text = response.text().await?;
        info!(
            %url,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "response received"
        );
        Ok(text)
    }
}

#[async_trait]
impl AdvisorService for HttpAdvisor {
    async fn recommend(&self, input: &StudentInput) -> Result<RecommendationResult, ServiceError> {
        let raw = self.post_json("/recommend", input).await?;
        Ok(contract::parse_recommendation_result(&raw)?)
    }

    async fn simulate(&self, input: &SimulationInput) -> Result<SimulationResult, ServiceError> {
        let raw = self.post_json("/simulate", input).await?;
        Ok(contract::parse_simulation_result(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EducationLevel;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    struct Captured {
        head: String,
        body: String,
    }

    /// Serves exactly one canned HTTP/1.1 response and hands back the request.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<Captured>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            let (head, request) = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf).to_string();
                if let Some(split) = text.find("\r\n\r\n") {
                    let head = text[..split].to_string();
                    let length = head
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    let request = &text[split + 4..];
                    if request.len() >= length || n == 0 {
                        break (head, request.to_string());
                    }
                } else if n == 0 {
                    break (text, String::new());
                }
            };

            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            Captured {
                head,
                body: request,
            }
        });

        (base, handle)
    }

    fn advisor(base: &str) -> HttpAdvisor {
        HttpAdvisor::new(ClientConfig::new(base, Duration::from_secs(5))).unwrap()
    }

    fn sample_input() -> StudentInput {
        StudentInput {
            math: 80,
            science: 75,
            location: "Mumbai".to_string(),
            education_level: EducationLevel::Class12,
            ..StudentInput::default()
        }
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let config = ClientConfig::new("http://localhost:9000/", Duration::from_secs(1));
        assert_eq!(config.endpoint("/recommend"), "http://localhost:9000/recommend");
        assert_eq!(
            ClientConfig::default().endpoint("simulate"),
            "http://127.0.0.1:8000/simulate"
        );
    }

    #[tokio::test]
    async fn recommend_posts_json_and_parses_reply() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"recommended_stream": "Science (PCM)", "confidence_score": 87}"#,
        )
        .await;

        let result = advisor(&base).recommend(&sample_input()).await.unwrap();
        assert_eq!(result.recommended_stream, "Science (PCM)");
        assert_eq!(result.confidence_score, 87);
        assert!(result.decision_intelligence.risk_flags.is_empty());

        let captured = server.await.unwrap();
        let head = captured.head.to_lowercase();
        assert!(head.starts_with("post /recommend http/1.1"));
        assert!(head.contains("content-type: application/json"));
        let sent: serde_json::Value = serde_json::from_str(&captured.body).unwrap();
        assert_eq!(sent["location"], "Mumbai");
        assert_eq!(sent["education_level"], "class_12");
        assert_eq!(sent["math"], 80);
    }

    #[tokio::test]
    async fn simulate_parses_scores() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"baseline_score": 70, "scenario_score": 85, "score_improvement": 15}"#,
        )
        .await;

        let input = SimulationInput {
            budget: 600_000,
            stress_level: 3,
            risk_level: 7,
        };
        let result = advisor(&base).simulate(&input).await.unwrap();
        assert_eq!(result.baseline_score, 70);
        assert_eq!(result.scenario_score, 85);
        assert_eq!(result.score_improvement, 15);

        let captured = server.await.unwrap();
        assert!(captured.head.starts_with("POST /simulate"));
        let sent: serde_json::Value = serde_json::from_str(&captured.body).unwrap();
        assert_eq!(sent["budget"], 600_000);
        assert_eq!(sent["risk_level"], 7);
    }

    #[tokio::test]
    async fn non_success_status_is_a_failure() {
        let (base, _server) =
            serve_once("500 Internal Server Error", r#"{"detail": "boom"}"#).await;
        let err = advisor(&base).recommend(&sample_input()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Status(500)));
        assert_eq!(err.user_message(), USER_NOTICE);
    }

    #[tokio::test]
    async fn incomplete_simulation_reply_is_a_parse_failure() {
        let (base, _server) =
            serve_once("200 OK", r#"{"scenario_score": 85, "score_improvement": 15}"#).await;
        let err = advisor(&base)
            .simulate(&SimulationInput::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Parse(ParseError::MissingField(ref f)) if f == "baseline_score"
        ));
    }

    #[tokio::test]
    async fn unreachable_service_is_a_transport_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let err = advisor(&base).recommend(&sample_input()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Transport(_)));
        assert_eq!(err.user_message(), USER_NOTICE);
    }
}
