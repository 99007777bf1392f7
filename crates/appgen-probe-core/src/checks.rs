//! Read-only diagnostic comparisons against values the server returned.

use serde_json::Value;

use crate::client::RawResponse;
use crate::types::{AppRecord, EntityId};

/// Result of comparing an app's generation type with the expected one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeGenCheck {
    /// The raw value equals the expected literal.
    Matches,
    /// Anything else, including a missing value.
    Mismatch {
        /// What the server sent.
        actual: Option<String>,
    },
}

/// Compare the record's raw `codeGenType` string with `expected`.
#[must_use]
pub fn check_code_gen_type(record: &AppRecord, expected: &str) -> CodeGenCheck {
    match record.code_gen_type.as_deref() {
        Some(actual) if actual == expected => CodeGenCheck::Matches,
        actual => CodeGenCheck::Mismatch {
            actual: actual.map(str::to_string),
        },
    }
}

/// Records whose `codeGenType` equals `expected`, in listing order.
#[must_use]
pub fn filter_by_code_gen_type<'a>(records: &'a [AppRecord], expected: &str) -> Vec<&'a AppRecord> {
    records
        .iter()
        .filter(|r| r.code_gen_type.as_deref() == Some(expected))
        .collect()
}

/// What a fetched deployed page looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// Contains `<!DOCTYPE html>` or `<html`.
    Html,
    /// Anything else.
    NotHtml,
}

/// Classify a deployed page body.
#[must_use]
pub fn classify_page(body: &str) -> PageKind {
    if body.contains("<!DOCTYPE html>") || body.contains("<html") {
        PageKind::Html
    } else {
        PageKind::NotHtml
    }
}

/// Directory the generator writes a Vue project to.
#[must_use]
pub fn project_dir_name(id: EntityId) -> String {
    format!("vue_project_{id}")
}

/// Interpretation of a deploy response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    /// The request did not return HTTP 200.
    RequestFailed {
        /// HTTP status.
        status: u16,
    },
    /// The body was not a response envelope.
    Undecodable {
        /// Decoder message.
        message: String,
    },
    /// The envelope carried a non-zero code.
    Rejected {
        /// Envelope code.
        code: i64,
        /// Envelope message.
        message: String,
    },
    /// `code == 0`; `url` is the deploy URL when `data` was non-empty.
    Deployed {
        /// Deploy URL.
        url: Option<String>,
    },
}

/// Interpret a raw deploy response.
#[must_use]
pub fn deploy_outcome(response: &RawResponse) -> DeployOutcome {
    if !response.is_ok() {
        return DeployOutcome::RequestFailed {
            status: response.status,
        };
    }

    let envelope = match response.envelope::<Value>() {
        Ok(envelope) => envelope,
        Err(e) => {
            return DeployOutcome::Undecodable {
                message: e.to_string(),
            }
        }
    };

    if !envelope.is_success() {
        return DeployOutcome::Rejected {
            code: envelope.code,
            message: envelope.message_or_empty().to_string(),
        };
    }

    let url = match envelope.data {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    };
    DeployOutcome::Deployed { url }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(code_gen_type: Option<&str>) -> AppRecord {
        serde_json::from_value(json!({
            "id": 1,
            "appName": "demo",
            "codeGenType": code_gen_type,
        }))
        .unwrap()
    }

    fn deploy_response(status: u16, body: &str) -> RawResponse {
        RawResponse {
            url: "http://localhost:8100/api/app/deploy".into(),
            status,
            body: body.into(),
        }
    }

    #[test]
    fn test_code_gen_type_match_is_exact() {
        assert_eq!(
            check_code_gen_type(&record(Some("vue_project")), "vue_project"),
            CodeGenCheck::Matches
        );
        assert_eq!(
            check_code_gen_type(&record(Some("multi_file")), "vue_project"),
            CodeGenCheck::Mismatch {
                actual: Some("multi_file".into())
            }
        );
        // Case and whitespace differences count as mismatches.
        assert!(matches!(
            check_code_gen_type(&record(Some("VUE_PROJECT")), "vue_project"),
            CodeGenCheck::Mismatch { .. }
        ));
        assert!(matches!(
            check_code_gen_type(&record(Some("vue_project ")), "vue_project"),
            CodeGenCheck::Mismatch { .. }
        ));
    }

    #[test]
    fn test_missing_code_gen_type_is_a_mismatch() {
        assert_eq!(
            check_code_gen_type(&record(None), "vue_project"),
            CodeGenCheck::Mismatch { actual: None }
        );
    }

    #[test]
    fn test_filter_keeps_order() {
        let mut a = record(Some("vue_project"));
        a.id = EntityId(10);
        let b = record(Some("html"));
        let mut c = record(Some("vue_project"));
        c.id = EntityId(30);
        let records = vec![a, b, c];

        let ids: Vec<EntityId> = filter_by_code_gen_type(&records, "vue_project")
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![EntityId(10), EntityId(30)]);
    }

    #[test]
    fn test_classify_page() {
        assert_eq!(classify_page("<!DOCTYPE html><head>"), PageKind::Html);
        assert_eq!(classify_page("<html lang=\"en\">"), PageKind::Html);
        assert_eq!(classify_page("{\"code\":0}"), PageKind::NotHtml);
        // The doctype check is case-sensitive.
        assert_eq!(classify_page("<!doctype html>"), PageKind::NotHtml);
    }

    #[test]
    fn test_project_dir_name() {
        assert_eq!(
            project_dir_name(EntityId(326_404_132_828_565_504)),
            "vue_project_326404132828565504"
        );
    }

    #[test]
    fn test_deploy_outcomes() {
        assert_eq!(
            deploy_outcome(&deploy_response(502, "bad gateway")),
            DeployOutcome::RequestFailed { status: 502 }
        );
        assert!(matches!(
            deploy_outcome(&deploy_response(200, "not json")),
            DeployOutcome::Undecodable { .. }
        ));
        assert_eq!(
            deploy_outcome(&deploy_response(
                200,
                r#"{"code":50001,"message":"build failed","data":null}"#
            )),
            DeployOutcome::Rejected {
                code: 50001,
                message: "build failed".into()
            }
        );
        assert_eq!(
            deploy_outcome(&deploy_response(200, r#"{"code":0,"data":"http://x/y"}"#)),
            DeployOutcome::Deployed {
                url: Some("http://x/y".into())
            }
        );
        assert_eq!(
            deploy_outcome(&deploy_response(200, r#"{"code":0,"data":""}"#)),
            DeployOutcome::Deployed { url: None }
        );
    }
}
