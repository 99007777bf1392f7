//! Wire types of the app generator API.
//!
//! Every endpoint answers with the `{code, message, data}` [`Envelope`].
//! Application records and pages are owned by the remote system; these types
//! only read them, so every field the probes do not strictly need is optional.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{ProbeError, Result};

/// Known envelope codes returned by the remote system.
pub mod api_code {
    /// Logical success.
    pub const SUCCESS: i64 = 0;
    /// Request parameter error.
    pub const PARAMS_ERROR: i64 = 40000;
    /// The session is not logged in.
    pub const NOT_LOGIN: i64 = 40100;
    /// The logged-in user lacks permission.
    pub const NO_AUTH: i64 = 40101;
    /// Access forbidden.
    pub const FORBIDDEN: i64 = 40300;
    /// Requested data does not exist.
    pub const NOT_FOUND: i64 = 40400;
    /// Internal server error.
    pub const SYSTEM_ERROR: i64 = 50000;
    /// The operation failed.
    pub const OPERATION_ERROR: i64 = 50001;

    /// Short description of a known code.
    #[must_use]
    pub const fn describe(code: i64) -> Option<&'static str> {
        match code {
            SUCCESS => Some("ok"),
            PARAMS_ERROR => Some("request parameter error"),
            NOT_LOGIN => Some("not logged in"),
            NO_AUTH => Some("no permission"),
            FORBIDDEN => Some("access forbidden"),
            NOT_FOUND => Some("requested data not found"),
            SYSTEM_ERROR => Some("internal system error"),
            OPERATION_ERROR => Some("operation failed"),
            _ => None,
        }
    }
}

/// The `{code, message, data}` wrapper returned by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// `0` on success.
    pub code: i64,
    /// Human-readable message.
    pub message: Option<String>,
    /// Payload.
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Whether the server reported logical success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code == api_code::SUCCESS
    }

    /// The message, or an empty string when absent.
    #[must_use]
    pub fn message_or_empty(&self) -> &str {
        self.message.as_deref().unwrap_or_default()
    }

    /// Convert a non-zero code into [`ProbeError::Api`].
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Api`] when `code != 0`.
    pub fn into_result(self) -> Result<Option<T>> {
        if self.is_success() {
            Ok(self.data)
        } else {
            Err(ProbeError::Api {
                code: self.code,
                message: self.message.unwrap_or_default(),
            })
        }
    }
}

/// A 64-bit identifier as sent by the server.
///
/// Some serializers emit large ids as JSON strings to keep JavaScript clients
/// exact; both forms are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Self(n)),
            Raw::Text(s) => s.trim().parse().map(Self).map_err(serde::de::Error::custom),
        }
    }
}

impl FromStr for EntityId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EntityId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// How an application's source was generated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CodeGenType {
    /// Single-page HTML.
    Html,
    /// Multi-file static project.
    MultiFile,
    /// Vue project with on-disk build.
    VueProject,
    /// Anything the server sends that we do not know about.
    Other(String),
}

impl CodeGenType {
    /// Wire value for Vue projects.
    pub const VUE_PROJECT: &'static str = "vue_project";

    /// The wire value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Html => "html",
            Self::MultiFile => "multi_file",
            Self::VueProject => Self::VUE_PROJECT,
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for CodeGenType {
    fn from(s: &str) -> Self {
        match s {
            "html" => Self::Html,
            "multi_file" => Self::MultiFile,
            Self::VUE_PROJECT => Self::VueProject,
            other => Self::Other(other.to_string()),
        }
    }
}

impl FromStr for CodeGenType {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for CodeGenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An application record as returned by the detail and list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRecord {
    /// Application id.
    pub id: EntityId,
    /// Display name.
    pub app_name: Option<String>,
    /// Raw generation type string, e.g. `vue_project`.
    pub code_gen_type: Option<String>,
    /// Owner.
    pub user_id: Option<EntityId>,
    /// Creation time, in whatever shape the server serializes it.
    pub create_time: Option<Value>,
    /// Deployment key, present once the app has been deployed.
    pub deploy_key: Option<String>,
    /// Last deployment time.
    pub deployed_time: Option<Value>,
    /// Cover image URL.
    pub cover: Option<String>,
    /// Priority (featured apps have a high priority).
    pub priority: Option<i64>,
    /// Prompt the app was created with.
    pub init_prompt: Option<String>,
}

impl AppRecord {
    /// Parsed generation type, if the server sent one.
    #[must_use]
    pub fn code_gen_type(&self) -> Option<CodeGenType> {
        self.code_gen_type.as_deref().map(CodeGenType::from)
    }
}

/// One page of a paged listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Records on this page.
    #[serde(default = "Vec::new")]
    pub records: Vec<T>,
    /// 1-based page number.
    pub page_number: Option<u64>,
    /// Page size.
    pub page_size: Option<u64>,
    /// Total matching rows across all pages.
    pub total_row: Option<u64>,
}

/// Login body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest<'a> {
    /// Account name.
    pub user_account: &'a str,
    /// Password.
    pub user_password: &'a str,
}

/// Paging body for the list endpoints.
///
/// `current` is what the web client sends; `pageNum` is the server's own field
/// name. Both carry the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    /// 1-based page number.
    pub current: u64,
    /// Same as `current`.
    pub page_num: u64,
    /// Page size.
    pub page_size: u64,
}

impl PageQuery {
    /// The first page with the given size.
    #[must_use]
    pub const fn first(page_size: u64) -> Self {
        Self {
            current: 1,
            page_num: 1,
            page_size,
        }
    }
}

/// Deploy body.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployRequest {
    /// Application to deploy.
    pub app_id: EntityId,
}

/// Query parameters of the streamed code generation endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// Application to generate code for.
    pub app_id: EntityId,
    /// Chat message driving the generation.
    pub message: String,
    /// Generation type to switch the app to before generating.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adapt: Option<String>,
}

/// Render an optional JSON value the way a console report wants it.
#[must_use]
pub fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "None".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_success_and_failure() {
        let ok: Envelope<String> =
            serde_json::from_value(json!({"code": 0, "message": "ok", "data": "http://x/y"}))
                .unwrap();
        assert!(ok.is_success());
        assert_eq!(ok.into_result().unwrap().as_deref(), Some("http://x/y"));

        let failed: Envelope<String> =
            serde_json::from_value(json!({"code": 40100, "message": "not logged in"})).unwrap();
        let err = failed.into_result().unwrap_err();
        assert!(matches!(err, ProbeError::Api { code: 40100, .. }));
    }

    #[test]
    fn test_envelope_tolerates_missing_message_and_data() {
        let env: Envelope<Value> = serde_json::from_value(json!({"code": 0})).unwrap();
        assert_eq!(env.message_or_empty(), "");
        assert!(env.data.is_none());
    }

    #[test]
    fn test_entity_id_accepts_number_and_string() {
        let n: EntityId = serde_json::from_value(json!(326404132828565504_u64)).unwrap();
        let s: EntityId = serde_json::from_value(json!("326404132828565504")).unwrap();
        assert_eq!(n, s);
        assert_eq!(n.to_string(), "326404132828565504");
        assert!(serde_json::from_value::<EntityId>(json!("abc")).is_err());
    }

    #[test]
    fn test_app_record_from_detail_response() {
        let record: AppRecord = serde_json::from_value(json!({
            "id": 1,
            "appName": "demo",
            "codeGenType": "vue_project",
            "userId": "42",
            "createTime": "2025-08-01 12:00:00"
        }))
        .unwrap();
        assert_eq!(record.id, EntityId(1));
        assert_eq!(record.user_id, Some(EntityId(42)));
        assert_eq!(record.code_gen_type(), Some(CodeGenType::VueProject));
        assert!(record.deploy_key.is_none());
        assert_eq!(display_value(record.create_time.as_ref()), "2025-08-01 12:00:00");
        assert_eq!(display_value(record.deployed_time.as_ref()), "None");
    }

    #[test]
    fn test_code_gen_type_parsing() {
        assert_eq!("html".parse::<CodeGenType>().unwrap(), CodeGenType::Html);
        assert_eq!(
            "multi_file".parse::<CodeGenType>().unwrap(),
            CodeGenType::MultiFile
        );
        let other = "VUE_PROJECT".parse::<CodeGenType>().unwrap();
        assert_eq!(other, CodeGenType::Other("VUE_PROJECT".into()));
        assert_eq!(other.as_str(), "VUE_PROJECT");
    }

    #[test]
    fn test_page_query_serializes_both_page_fields() {
        let body = serde_json::to_value(PageQuery::first(20)).unwrap();
        assert_eq!(body, json!({"current": 1, "pageNum": 1, "pageSize": 20}));
    }

    #[test]
    fn test_page_without_records_is_empty() {
        let page: Page<AppRecord> = serde_json::from_value(json!({"totalRow": 0})).unwrap();
        assert!(page.records.is_empty());
        assert_eq!(page.total_row, Some(0));
    }

    #[test]
    fn test_generation_request_skips_missing_adapt() {
        let q = GenerationRequest {
            app_id: EntityId(7),
            message: "hi".into(),
            adapt: None,
        };
        assert_eq!(
            serde_json::to_value(&q).unwrap(),
            json!({"appId": 7, "message": "hi"})
        );
    }

    #[test]
    fn test_describe_known_codes() {
        assert_eq!(api_code::describe(40100), Some("not logged in"));
        assert_eq!(api_code::describe(12345), None);
    }
}
