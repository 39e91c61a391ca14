use std::time::Duration;

use async_trait::async_trait;
use oilwatch_core::error::ReasoningError;
use oilwatch_core::reasoning::{ReasoningRequest, ReasoningService};
use serde_json::Value;

/// Reasoning service reached over HTTP: the request is POSTed as JSON and the
/// response body is handed back unvalidated.
#[derive(Clone)]
pub struct HttpReasoningService {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpReasoningService {
    pub fn new(url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            api_key,
            timeout,
        }
    }
}

#[async_trait]
impl ReasoningService for HttpReasoningService {
    async fn assess(&self, request: &ReasoningRequest) -> Result<Value, ReasoningError> {
        let mut builder = self
            .client
            .post(self.url.as_str())
            .timeout(self.timeout)
            .json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| self.transport(e))?;

        if !response.status().is_success() {
            tracing::warn!(
                status = %response.status(),
                "Reasoning service returned non-success status"
            );
            return Err(ReasoningError::Transport(format!(
                "status {}",
                response.status()
            )));
        }

        let body = response.text().await.map_err(|e| self.transport(e))?;
        parse_body(&body)
    }
}

impl HttpReasoningService {
    fn transport(&self, err: reqwest::Error) -> ReasoningError {
        if err.is_timeout() {
            ReasoningError::Timeout(self.timeout)
        } else {
            ReasoningError::Transport(err.to_string())
        }
    }
}

fn parse_body(body: &str) -> Result<Value, ReasoningError> {
    serde_json::from_str(body).map_err(|e| ReasoningError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use oilwatch_core::error::ReasoningError;
    use oilwatch_core::reasoning::{ReasoningRequest, ReasoningService};
    use oilwatch_core::sample::Sample;
    use serde_json::json;

    use super::{HttpReasoningService, parse_body};

    #[test]
    fn non_json_body_is_malformed() {
        let err = parse_body("Sure! Here is my assessment:").unwrap_err();
        assert_eq!(err.class(), "malformed");
        assert_eq!(parse_body(r#"{"final_score": 0.4}"#).unwrap(), json!({"final_score": 0.4}));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_failure() {
        // Port 9 (discard) on localhost is closed in test environments.
        let service =
            HttpReasoningService::new("http://127.0.0.1:9/assess", None, Duration::from_secs(2));
        let sample = Sample::from_json(&json!({
            "oil_hrs": 100,
            "total_hrs": 5000,
            "viscosity_40": 140,
            "service_performed": false,
            "topup_performed": false
        }))
        .unwrap();
        let request = ReasoningRequest {
            raw_score: 0.3,
            sample,
            trend_summary: "Insufficient data".to_string(),
            maintenance_fact: "No maintenance recorded in recent history".to_string(),
            recent_scores: Vec::new(),
        };

        let err = service.assess(&request).await.unwrap_err();
        assert!(matches!(
            err,
            ReasoningError::Transport(_) | ReasoningError::Timeout(_)
        ));
    }
}
