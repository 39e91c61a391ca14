use serde_json::json;

pub fn client() -> reqwest::Client {
    reqwest::Client::new()
}

/// Structured body for a usage error raised before any request is sent.
pub fn cli_error(message: &str, docs_hint: Option<&str>) -> serde_json::Value {
    let mut err = json!({
        "error": "cli_error",
        "message": message
    });
    if let Some(hint) = docs_hint {
        err["docs_hint"] = json!(hint);
    }
    err
}

pub fn exit_error(message: &str, docs_hint: Option<&str>) -> ! {
    let err = cli_error(message, docs_hint);
    eprintln!("{}", serde_json::to_string_pretty(&err).unwrap_or_default());
    std::process::exit(4);
}

/// Exit code for an HTTP status: 0=success (2xx), 1=client error (4xx),
/// 2=server error (5xx and anything else).
pub fn exit_code_for(status: u16) -> i32 {
    match status {
        200..=299 => 0,
        400..=499 => 1,
        _ => 2,
    }
}

/// Execute an API request, print response, exit with structured code.
///
/// Exit codes: 0=success (2xx), 1=client error (4xx), 2=server error (5xx),
///             3=connection error, 4=usage error
pub async fn api_request(
    api_url: &str,
    method: reqwest::Method,
    path: &str,
    body: Option<serde_json::Value>,
    query: &[(&str, String)],
    compact: bool,
) -> i32 {
    let url = match reqwest::Url::parse(&format!("{}{path}", api_url.trim_end_matches('/'))) {
        Ok(mut u) => {
            if !query.is_empty() {
                let mut q = u.query_pairs_mut();
                for (k, v) in query {
                    q.append_pair(k, v);
                }
            }
            u
        }
        Err(e) => {
            let err = cli_error(&format!("Invalid URL: {api_url}{path}: {e}"), None);
            eprintln!("{}", serde_json::to_string_pretty(&err).unwrap_or_default());
            return 4;
        }
    };

    let mut req = client().request(method, url);
    if let Some(b) = body {
        req = req.json(&b);
    }

    let resp = match req.send().await {
        Ok(r) => r,
        Err(e) => {
            let err = json!({
                "error": "connection_error",
                "message": format!("{e}"),
                "docs_hint": "Is the API server running? Check OILWATCH_API_URL."
            });
            eprintln!("{}", serde_json::to_string_pretty(&err).unwrap_or_default());
            return 3;
        }
    };

    let exit_code = exit_code_for(resp.status().as_u16());

    let resp_body: serde_json::Value = match resp.json().await {
        Ok(v) => v,
        Err(e) => json!({"raw_error": format!("Failed to parse response as JSON: {e}")}),
    };

    let formatted = if compact {
        serde_json::to_string(&resp_body)
    } else {
        serde_json::to_string_pretty(&resp_body)
    }
    .unwrap_or_default();

    if exit_code == 0 {
        println!("{formatted}");
    } else {
        eprintln!("{formatted}");
    }

    exit_code
}

/// Read JSON from a file path or stdin (when path is "-").
pub fn read_json_from_file(path: &str) -> Result<serde_json::Value, String> {
    let raw = if path == "-" {
        std::io::read_to_string(std::io::stdin())
            .map_err(|e| format!("Failed to read stdin: {e}"))?
    } else {
        std::fs::read_to_string(path).map_err(|e| format!("Failed to read file '{path}': {e}"))?
    };
    serde_json::from_str(&raw).map_err(|e| format!("Invalid JSON in '{path}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::{cli_error, exit_code_for, read_json_from_file};

    #[test]
    fn cli_error_carries_optional_hint() {
        let err = cli_error("Failed to read file 'x.json'", None);
        assert_eq!(err["error"], "cli_error");
        assert_eq!(err["message"], "Failed to read file 'x.json'");
        assert!(err.get("docs_hint").is_none());

        let err = cli_error("bad", Some("Pass a JSON file or '-' for stdin."));
        assert_eq!(err["docs_hint"], "Pass a JSON file or '-' for stdin.");
    }

    #[test]
    fn exit_codes_follow_status_class() {
        assert_eq!(exit_code_for(201), 0);
        assert_eq!(exit_code_for(404), 1);
        assert_eq!(exit_code_for(502), 2);
    }

    #[test]
    fn reads_json_file_and_reports_bad_content() {
        let dir = std::env::temp_dir();
        let good = dir.join(format!("oilwatch-cli-good-{}.json", std::process::id()));
        let bad = dir.join(format!("oilwatch-cli-bad-{}.json", std::process::id()));
        std::fs::write(&good, r#"{"oil_hrs": 10}"#).unwrap();
        std::fs::write(&bad, "oil_hrs=10").unwrap();

        let value = read_json_from_file(good.to_str().unwrap()).unwrap();
        assert_eq!(value["oil_hrs"], 10);
        let err = read_json_from_file(bad.to_str().unwrap()).unwrap_err();
        assert!(err.starts_with("Invalid JSON"));
        let err = read_json_from_file("/nonexistent/oilwatch/sample.json").unwrap_err();
        assert!(err.starts_with("Failed to read file"));

        let _ = std::fs::remove_file(good);
        let _ = std::fs::remove_file(bad);
    }
}
