//! Base estimator backed by an external prediction program.
//!
//! The program receives the feature object as one JSON document on stdin and
//! answers with one JSON document on stdout:
//! `{"success": true, "raw_health_score": 0.42, "model_version": "..."}` or
//! `{"success": false, "error": "..."}`.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use oilwatch_core::error::EstimatorError;
use oilwatch_core::estimator::{BaseEstimator, FeatureVector};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[derive(Debug, Deserialize)]
struct EstimatorOutput {
    success: bool,
    #[serde(default)]
    raw_health_score: Option<f64>,
    #[serde(default)]
    model_version: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CommandEstimator {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandEstimator {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// Build from a program-and-arguments list as read from configuration.
    pub fn from_command_line(command: &[String], timeout: Duration) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self::new(program.clone(), args.to_vec(), timeout))
    }
}

#[async_trait]
impl BaseEstimator for CommandEstimator {
    async fn estimate(&self, features: &FeatureVector) -> Result<f64, EstimatorError> {
        let payload = serde_json::to_vec(features)
            .map_err(|e| EstimatorError::Rejected(format!("features not serializable: {e}")))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EstimatorError::Unavailable(format!("{}: {e}", self.program)))?;

        if let Some(mut stdin) = child.stdin.take() {
            // The program may exit without draining stdin; its stdout decides.
            let _ = stdin.write_all(&payload).await;
            drop(stdin);
        }

        // On timeout the child is dropped and killed.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| EstimatorError::Timeout(self.timeout))?
            .map_err(|e| EstimatorError::Unavailable(e.to_string()))?;

        if !output.status.success() && output.stdout.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EstimatorError::Unavailable(format!(
                "exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        parse_output(&output.stdout)
    }
}

fn parse_output(stdout: &[u8]) -> Result<f64, EstimatorError> {
    let text = String::from_utf8_lossy(stdout);
    let parsed: EstimatorOutput = serde_json::from_str(text.trim())
        .map_err(|e| EstimatorError::InvalidOutput(format!("{e}: {}", text.trim())))?;

    if !parsed.success {
        return Err(EstimatorError::Rejected(
            parsed.error.unwrap_or_else(|| "no error message".to_string()),
        ));
    }

    let score = parsed
        .raw_health_score
        .ok_or_else(|| EstimatorError::InvalidOutput("missing raw_health_score".to_string()))?;
    tracing::debug!(
        raw_score = score,
        model_version = parsed.model_version.as_deref().unwrap_or("unknown"),
        "Base estimator scored sample"
    );
    Ok(score)
}
