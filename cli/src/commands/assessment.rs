use oilwatch_core::error::ValidationError;
use oilwatch_core::sample::Sample;
use serde_json::json;

use crate::util::{api_request, exit_error, read_json_from_file};

/// Score one sample. The sample is validated locally first so malformed
/// input never reaches the service.
pub async fn assess(api_url: &str, sample_file: &str, entity: Option<&str>, compact: bool) -> i32 {
    let body = read_json_from_file(sample_file).unwrap_or_else(|message| {
        exit_error(
            &message,
            Some("Pass a path to a JSON sample, or '-' to read it from stdin."),
        )
    });

    let body = match prepare_sample(body, entity) {
        Ok(body) => body,
        Err(err) => {
            eprintln!(
                "{}",
                serde_json::to_string_pretty(&validation_error(err)).unwrap_or_default()
            );
            return 1;
        }
    };

    api_request(
        api_url,
        reqwest::Method::POST,
        "/v1/assessments",
        Some(body),
        &[],
        compact,
    )
    .await
}

pub async fn history(api_url: &str, entity: Option<&str>, limit: Option<u32>, compact: bool) -> i32 {
    let mut query = entity_query(entity);
    if let Some(limit) = limit {
        query.push(("limit", limit.to_string()));
    }
    api_request(
        api_url,
        reqwest::Method::GET,
        "/v1/assessments",
        None,
        &query,
        compact,
    )
    .await
}

pub async fn latest(api_url: &str, entity: Option<&str>, compact: bool) -> i32 {
    api_request(
        api_url,
        reqwest::Method::GET,
        "/v1/assessments/latest",
        None,
        &entity_query(entity),
        compact,
    )
    .await
}

pub async fn entities(api_url: &str, compact: bool) -> i32 {
    api_request(
        api_url,
        reqwest::Method::GET,
        "/v1/entities",
        None,
        &[],
        compact,
    )
    .await
}

/// Applies the `--entity` override and checks the sample the way the
/// service will.
fn prepare_sample(
    mut body: serde_json::Value,
    entity: Option<&str>,
) -> Result<serde_json::Value, ValidationError> {
    if let (Some(entity), Some(obj)) = (entity, body.as_object_mut()) {
        obj.insert("entity_id".to_string(), json!(entity));
    }
    Sample::from_json(&body)?;
    Ok(body)
}

fn validation_error(err: ValidationError) -> serde_json::Value {
    let mut out = json!({
        "error": "validation_failed",
        "message": err.message,
        "field": err.field,
    });
    if let Some(received) = err.received {
        out["received"] = received;
    }
    out
}

fn entity_query(entity: Option<&str>) -> Vec<(&'static str, String)> {
    entity
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(|e| vec![("entity", e.to_string())])
        .unwrap_or_default()
}
