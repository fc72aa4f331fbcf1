// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Wire types and transport for the Fake News Detection API
//!
//! Endpoints consumed:
//! - `POST /predict`: classify a text with the chosen model
//! - `GET /stats`: running counts over every prediction the service has made
//! - `GET /health` and `GET /`: service status and endpoint listing
//!
//! The workflow only depends on the `ClassificationService` trait; the
//! HTTP implementation lives here alongside it.

use crate::config::ClientConfig;
use crate::error::{ConfigError, ProjectionError, StatsFetchError, TransportError};
use crate::request::AnalysisRequest;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The two classes every model predicts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "Fake News")]
    FakeNews,
    #[serde(rename = "Real News")]
    RealNews,
}

impl Verdict {
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::FakeNews => "Fake News",
            Verdict::RealNews => "Real News",
        }
    }

    /// Strict parse of the service's class label; anything else is a third
    /// class the client has no representation for.
    pub fn from_label(label: &str) -> Result<Self, ProjectionError> {
        match label {
            "Fake News" => Ok(Verdict::FakeNews),
            "Real News" => Ok(Verdict::RealNews),
            other => Err(ProjectionError::UnknownClass(other.to_string())),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Text statistics the service extracts before classifying
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFeatures {
    pub word_count: u64,
    pub char_count: u64,
    pub avg_word_length: f64,
    pub exclamation_count: u64,
    /// Any further features the service reports (question_count,
    /// uppercase_ratio, sentence_count, ...)
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl TextFeatures {
    /// Extra features that carry a numeric value, in key order
    pub fn numeric_extras(&self) -> Vec<(&str, f64)> {
        self.extra
            .iter()
            .filter_map(|(k, v)| v.as_f64().map(|n| (k.as_str(), n)))
            .collect()
    }
}

/// Successful `/predict` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub prediction: Verdict,
    pub confidence: f64,
    pub model_used: String,
    pub features: TextFeatures,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// One entry of the service's recent-prediction window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentPrediction {
    /// Kept as sent; classified when projected
    pub prediction: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl RecentPrediction {
    pub fn verdict(&self) -> Result<Verdict, ProjectionError> {
        Verdict::from_label(&self.prediction)
    }
}

/// `/stats` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub fake_count: u64,
    pub real_count: u64,
    pub total_predictions: u64,
    pub average_confidence: f64,
    /// Oldest first. The service omits the field while its history is empty.
    #[serde(default)]
    pub recent_predictions: Vec<RecentPrediction>,
}

impl AggregateStats {
    /// Whether `total_predictions == fake_count + real_count`
    pub fn consistent(&self) -> bool {
        self.fake_count.checked_add(self.real_count) == Some(self.total_predictions)
    }
}

/// `/health` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub models_loaded: u32,
    pub timestamp: String,
}

/// `/` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub message: String,
    pub version: String,
    #[serde(default)]
    pub endpoints: BTreeMap<String, String>,
}

/// The classification collaborator as seen by the workflow
pub trait ClassificationService: Send + Sync {
    /// Classify a validated request
    fn predict(&self, request: &AnalysisRequest) -> Result<PredictionResult, TransportError>;

    /// Fetch the current aggregate statistics
    fn stats(&self) -> Result<AggregateStats, StatsFetchError>;
}

#[derive(Serialize)]
struct PredictPayload<'a> {
    text: &'a str,
    model_choice: &'static str,
}

/// `ClassificationService` over HTTP/JSON
pub struct HttpClassificationService {
    client: reqwest::blocking::Client,
    config: ClientConfig,
}

impl HttpClassificationService {
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        tracing::debug!("HTTP client ready for {} (timeout {}s)", config.base_url, config.timeout_secs);

        Ok(Self { client, config })
    }

    pub fn health(&self) -> Result<HealthStatus, TransportError> {
        self.execute(self.client.get(self.config.endpoint("/health")))
    }

    pub fn info(&self) -> Result<ServiceInfo, TransportError> {
        self.execute(self.client.get(self.config.endpoint("/")))
    }

    fn execute<T: DeserializeOwned>(&self, builder: reqwest::blocking::RequestBuilder) -> Result<T, TransportError> {
        let response = builder
            .send()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        if !status.is_success() {
            tracing::debug!("Service returned {}: {}", status, body);
            return Err(TransportError::Status {
                status: status.as_u16(),
                detail: extract_detail(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

impl ClassificationService for HttpClassificationService {
    fn predict(&self, request: &AnalysisRequest) -> Result<PredictionResult, TransportError> {
        let payload = PredictPayload {
            text: &request.text,
            model_choice: request.model_choice.code(),
        };
        tracing::info!("POST /predict (model={}, {} chars)", payload.model_choice, request.text.chars().count());
        self.execute(self.client.post(self.config.endpoint("/predict")).json(&payload))
    }

    fn stats(&self) -> Result<AggregateStats, StatsFetchError> {
        tracing::debug!("GET /stats");
        Ok(self.execute(self.client.get(self.config.endpoint("/stats")))?)
    }
}

/// Pull a string `detail` out of an error body. Structured details (such as
/// request-validation lists) are not shown verbatim.
fn extract_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("detail")
        .and_then(|d| d.as_str())
        .filter(|d| !d.trim().is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{build_request, ModelChoice};
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::JoinHandle;

    /// Serve a single canned HTTP response; the handle yields the raw request
    fn serve_once(status_line: &'static str, body: &'static str) -> (ClientConfig, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];

            // Read headers, then as much body as Content-Length announces
            loop {
                let n = stream.read(&mut buf).unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
            String::from_utf8_lossy(&request).to_string()
        });

        let config = ClientConfig::default().with_overrides(Some(format!("http://{}", addr)), Some(5));
        (config, handle)
    }

    #[test]
    fn test_predict_success() {
        let (config, server) = serve_once(
            "200 OK",
            r#"{"prediction":"Real News","confidence":0.87,"model_used":"Random Forest",
               "timestamp":"2024-05-01T12:00:00",
               "features":{"word_count":7,"char_count":42,"avg_word_length":5.3,"exclamation_count":0,
                           "question_count":0,"unique_word_ratio":1.0}}"#,
        );
        let service = HttpClassificationService::new(config).unwrap();
        let request = build_request("This is a sufficiently long news snippet.", ModelChoice::RandomForest).unwrap();

        let result = service.predict(&request).expect("prediction should decode");
        assert_eq!(result.prediction, Verdict::RealNews);
        assert_eq!(result.model_used, "Random Forest");
        assert_eq!(result.features.word_count, 7);
        assert_eq!(result.timestamp.as_deref(), Some("2024-05-01T12:00:00"));
        assert_eq!(
            result.features.numeric_extras(),
            vec![("question_count", 0.0), ("unique_word_ratio", 1.0)]
        );

        let raw_request = server.join().unwrap();
        assert!(raw_request.starts_with("POST /predict "));
        assert!(raw_request.contains(r#""model_choice":"rf""#));
        assert!(raw_request.contains(r#""text":"This is a sufficiently long news snippet.""#));
    }

    #[test]
    fn test_predict_error_detail() {
        let (config, server) = serve_once("503 Service Unavailable", r#"{"detail":"model unavailable"}"#);
        let service = HttpClassificationService::new(config).unwrap();
        let request = build_request("This is a sufficiently long news snippet.", ModelChoice::LogisticRegression).unwrap();

        let err = service.predict(&request).unwrap_err();
        assert_eq!(
            err,
            TransportError::Status {
                status: 503,
                detail: Some("model unavailable".to_string())
            }
        );
        assert_eq!(err.user_message(), "model unavailable");
        server.join().unwrap();
    }

    #[test]
    fn test_predict_error_without_detail() {
        let (config, server) = serve_once("500 Internal Server Error", "Internal Server Error");
        let service = HttpClassificationService::new(config).unwrap();
        let request = build_request("This is a sufficiently long news snippet.", ModelChoice::RandomForest).unwrap();

        let err = service.predict(&request).unwrap_err();
        assert!(matches!(err, TransportError::Status { status: 500, detail: None }));
        server.join().unwrap();
    }

    #[test]
    fn test_unknown_class_is_decode_error() {
        let (config, server) = serve_once(
            "200 OK",
            r#"{"prediction":"Satire","confidence":0.5,"model_used":"LR",
               "features":{"word_count":1,"char_count":1,"avg_word_length":1.0,"exclamation_count":0}}"#,
        );
        let service = HttpClassificationService::new(config).unwrap();
        let request = build_request("This is a sufficiently long news snippet.", ModelChoice::LogisticRegression).unwrap();

        assert!(matches!(service.predict(&request), Err(TransportError::Decode(_))));
        server.join().unwrap();
    }

    #[test]
    fn test_stats_without_recent_predictions() {
        let (config, server) = serve_once(
            "200 OK",
            r#"{"total_predictions":0,"fake_count":0,"real_count":0,"average_confidence":0}"#,
        );
        let service = HttpClassificationService::new(config).unwrap();

        let stats = service.stats().unwrap();
        assert_eq!(stats.total_predictions, 0);
        assert!(stats.recent_predictions.is_empty());
        assert!(stats.consistent());

        let raw_request = server.join().unwrap();
        assert!(raw_request.starts_with("GET /stats "));
    }

    #[test]
    fn test_network_failure() {
        // Bind then drop to get a port nothing listens on
        let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
        let config = ClientConfig::default().with_overrides(Some(format!("http://{}", addr)), Some(2));
        let service = HttpClassificationService::new(config).unwrap();

        let err = service.stats().unwrap_err();
        assert!(matches!(err.0, TransportError::Network(_)));
    }

    #[test]
    fn test_health() {
        let (config, server) = serve_once(
            "200 OK",
            r#"{"status":"healthy","models_loaded":3,"timestamp":"2024-05-01T12:00:00"}"#,
        );
        let service = HttpClassificationService::new(config).unwrap();

        let health = service.health().unwrap();
        assert_eq!(health.status, "healthy");
        assert_eq!(health.models_loaded, 3);
        assert!(server.join().unwrap().starts_with("GET /health "));
    }

    #[test]
    fn test_extract_detail() {
        assert_eq!(extract_detail(r#"{"detail":"boom"}"#), Some("boom".to_string()));
        assert_eq!(extract_detail(r#"{"detail":[{"loc":["body","text"]}]}"#), None);
        assert_eq!(extract_detail("not json"), None);
        assert_eq!(extract_detail(r#"{"detail":""}"#), None);
    }

    #[test]
    fn test_verdict_labels() {
        assert_eq!(Verdict::from_label("Fake News"), Ok(Verdict::FakeNews));
        assert_eq!(Verdict::from_label("Real News"), Ok(Verdict::RealNews));
        assert_eq!(
            Verdict::from_label("fake news"),
            Err(ProjectionError::UnknownClass("fake news".to_string()))
        );
        assert_eq!(Verdict::RealNews.to_string(), "Real News");
    }

    #[test]
    fn test_inconsistent_stats() {
        let stats = AggregateStats {
            fake_count: 2,
            real_count: 2,
            total_predictions: 5,
            average_confidence: 0.5,
            recent_predictions: vec![],
        };
        assert!(!stats.consistent());
    }
}
