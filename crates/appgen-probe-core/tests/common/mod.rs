//! In-process fake of the app generator API.
//!
//! Binds to `127.0.0.1:0`, issues a `SESSION` cookie on login and refuses the
//! authenticated endpoints without it. Every endpoint counts its hits so tests
//! can assert which requests were (not) made.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::StreamExt;
use serde_json::{json, Value};

/// How the fake answers the login request.
#[derive(Debug, Clone, Copy)]
pub enum LoginBehavior {
    Accept,
    RejectWithCode(i64),
    HttpError(u16),
}

/// What the fake serves.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub login: LoginBehavior,
    /// Records returned by the list and detail endpoints.
    pub apps: Vec<Value>,
    /// Apps whose deployment is rejected with code 50001.
    pub failing_deploys: Vec<u64>,
    /// Body served for deployed pages.
    pub deployed_page: String,
    /// Pieces of the generation stream.
    pub generation_chunks: Vec<String>,
    /// Keep the generation stream open after the last piece.
    pub generation_stalls: bool,
    /// Repeat the pieces forever, one per interval.
    pub generation_trickle: Option<Duration>,
    /// Delay before the generation response head is sent.
    pub generation_delay: Option<Duration>,
    /// A generation request switches the app to its `adapt` type.
    pub adapt_updates_type: bool,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            login: LoginBehavior::Accept,
            apps: Vec::new(),
            failing_deploys: Vec::new(),
            deployed_page: "<!DOCTYPE html><html><body>deployed</body></html>".to_string(),
            generation_chunks: Vec::new(),
            generation_stalls: false,
            generation_trickle: None,
            generation_delay: None,
            adapt_updates_type: false,
        }
    }
}

/// Request counters.
#[derive(Debug, Default)]
pub struct Hits {
    pub login: AtomicUsize,
    pub detail: AtomicUsize,
    pub my_list: AtomicUsize,
    pub admin_list: AtomicUsize,
    pub deploy: AtomicUsize,
    pub generate: AtomicUsize,
    pub page: AtomicUsize,
}

impl Hits {
    /// Requests made after login.
    pub fn follow_ups(&self) -> usize {
        [
            &self.detail,
            &self.my_list,
            &self.admin_list,
            &self.deploy,
            &self.generate,
            &self.page,
        ]
        .iter()
        .map(|c| c.load(Ordering::SeqCst))
        .sum()
    }
}

pub struct Shared {
    scenario: Scenario,
    apps: Mutex<Vec<Value>>,
    base_url: OnceLock<String>,
    pub hits: Hits,
    pub last_list_body: Mutex<Option<Value>>,
    pub last_generation_query: Mutex<Option<HashMap<String, String>>>,
}

/// A running fake server.
pub struct FakeApi {
    pub base_url: String,
    pub shared: Arc<Shared>,
}

impl FakeApi {
    pub async fn start(scenario: Scenario) -> Self {
        let shared = Arc::new(Shared {
            apps: Mutex::new(scenario.apps.clone()),
            scenario,
            base_url: OnceLock::new(),
            hits: Hits::default(),
            last_list_body: Mutex::new(None),
            last_generation_query: Mutex::new(None),
        });

        let app = Router::new()
            .route("/api/user/login", post(login))
            .route("/api/app/get/vo", get(detail))
            .route("/api/app/my/list/page/vo", post(my_list))
            .route("/api/app/admin/list/page/vo", post(admin_list))
            .route("/api/app/deploy", post(deploy))
            .route("/api/app/chat/gen/code", get(generate))
            .route("/deployed/{key}/", get(deployed_page))
            .with_state(shared.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        shared.base_url.set(base_url.clone()).unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, shared }
    }

    pub fn hits(&self) -> &Hits {
        &self.shared.hits
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn last_list_body(&self) -> Option<Value> {
        self.shared.last_list_body.lock().unwrap().clone()
    }

    pub fn last_generation_query(&self) -> Option<HashMap<String, String>> {
        self.shared.last_generation_query.lock().unwrap().clone()
    }
}

/// A record in the shape the detail and list endpoints return.
pub fn app(id: u64, name: &str, code_gen_type: &str) -> Value {
    json!({
        "id": id,
        "appName": name,
        "codeGenType": code_gen_type,
        "userId": 42,
        "createTime": "2025-08-01 12:00:00",
        "deployKey": null,
    })
}

fn authed(headers: &HeaderMap) -> bool {
    headers
        .get(COOKIE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|c| c.contains("SESSION=ok"))
}

fn envelope(code: i64, message: &str, data: Value) -> Json<Value> {
    Json(json!({"code": code, "message": message, "data": data}))
}

fn not_logged_in() -> Json<Value> {
    envelope(40100, "not logged in", Value::Null)
}

fn id_of(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

async fn login(State(s): State<Arc<Shared>>, Json(body): Json<Value>) -> Response {
    s.hits.login.fetch_add(1, Ordering::SeqCst);
    match s.scenario.login {
        LoginBehavior::Accept => (
            [(SET_COOKIE, "SESSION=ok; Path=/; HttpOnly")],
            envelope(0, "ok", json!({"userAccount": body["userAccount"]})),
        )
            .into_response(),
        LoginBehavior::RejectWithCode(code) => {
            envelope(code, "wrong account or password", Value::Null).into_response()
        }
        LoginBehavior::HttpError(status) => (
            StatusCode::from_u16(status).unwrap(),
            "login unavailable",
        )
            .into_response(),
    }
}

async fn detail(
    State(s): State<Arc<Shared>>,
    headers: HeaderMap,
    Query(q): Query<HashMap<String, String>>,
) -> Json<Value> {
    s.hits.detail.fetch_add(1, Ordering::SeqCst);
    if !authed(&headers) {
        return not_logged_in();
    }
    let wanted: Option<u64> = q.get("id").and_then(|id| id.parse().ok());
    let apps = s.apps.lock().unwrap();
    match apps.iter().find(|a| id_of(&a["id"]) == wanted) {
        Some(found) => envelope(0, "ok", found.clone()),
        None => envelope(40400, "requested data not found", Value::Null),
    }
}

fn page_of(s: &Shared, body: Value) -> Json<Value> {
    let size = body["pageSize"].as_u64().unwrap_or(10) as usize;
    *s.last_list_body.lock().unwrap() = Some(body);
    let apps = s.apps.lock().unwrap();
    let records: Vec<Value> = apps.iter().take(size).cloned().collect();
    envelope(
        0,
        "ok",
        json!({
            "records": records,
            "pageNumber": 1,
            "pageSize": size,
            "totalRow": apps.len(),
        }),
    )
}

async fn my_list(
    State(s): State<Arc<Shared>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    s.hits.my_list.fetch_add(1, Ordering::SeqCst);
    if !authed(&headers) {
        return not_logged_in();
    }
    if body["pageSize"].as_u64().unwrap_or(0) > 20 {
        return envelope(40000, "query at most 20 apps per page", Value::Null);
    }
    page_of(&s, body)
}

async fn admin_list(
    State(s): State<Arc<Shared>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    s.hits.admin_list.fetch_add(1, Ordering::SeqCst);
    if !authed(&headers) {
        return not_logged_in();
    }
    page_of(&s, body)
}

async fn deploy(
    State(s): State<Arc<Shared>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    s.hits.deploy.fetch_add(1, Ordering::SeqCst);
    if !authed(&headers) {
        return not_logged_in();
    }
    let Some(id) = id_of(&body["appId"]) else {
        return envelope(40000, "appId is required", Value::Null);
    };
    if s.scenario.failing_deploys.contains(&id) {
        return envelope(50001, "deploy failed: no build output", Value::Null);
    }
    let base = s.base_url.get().cloned().unwrap_or_default();
    envelope(0, "ok", json!(format!("{base}/deployed/{id}/")))
}

async fn generate(
    State(s): State<Arc<Shared>>,
    headers: HeaderMap,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    s.hits.generate.fetch_add(1, Ordering::SeqCst);
    *s.last_generation_query.lock().unwrap() = Some(q.clone());
    if !authed(&headers) {
        return (StatusCode::UNAUTHORIZED, "not logged in").into_response();
    }
    if let Some(delay) = s.scenario.generation_delay {
        tokio::time::sleep(delay).await;
    }

    if s.scenario.adapt_updates_type {
        if let (Some(id), Some(adapt)) = (
            q.get("appId").and_then(|id| id.parse::<u64>().ok()),
            q.get("adapt"),
        ) {
            let mut apps = s.apps.lock().unwrap();
            if let Some(found) = apps.iter_mut().find(|a| id_of(&a["id"]) == Some(id)) {
                found["codeGenType"] = json!(adapt);
            }
        }
    }

    let pieces: Vec<Result<String, io::Error>> = s
        .scenario
        .generation_chunks
        .iter()
        .cloned()
        .map(Ok)
        .collect();
    let body = if let Some(every) = s.scenario.generation_trickle {
        let pieces = s.scenario.generation_chunks.clone();
        Body::from_stream(
            futures::stream::iter(pieces.into_iter().cycle()).then(move |piece| async move {
                tokio::time::sleep(every).await;
                Ok::<_, io::Error>(piece)
            }),
        )
    } else if s.scenario.generation_stalls {
        Body::from_stream(futures::stream::iter(pieces).chain(futures::stream::pending()))
    } else {
        Body::from_stream(futures::stream::iter(pieces))
    };

    ([(CONTENT_TYPE, "text/event-stream")], body).into_response()
}

async fn deployed_page(State(s): State<Arc<Shared>>, Path(_key): Path<String>) -> Response {
    s.hits.page.fetch_add(1, Ordering::SeqCst);
    ([(CONTENT_TYPE, "text/html")], s.scenario.deployed_page.clone()).into_response()
}
