//! In-process stand-in for the hosted backend.
//!
//! Implements just enough of the auth endpoints, the three procedures and
//! the two tables for the client to run its real HTTP code against it.
//! Every handler counts its calls so tests can assert on traffic.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use journal_client::{ClientConfig, DevUserConfig, JournalClient, MemoryStorage, RetryPolicy};
use journal_core::journal::JournalEntry;

pub const ANON_KEY: &str = "test-anon-key";

// ---------------------------------------------------------------------------
// Backend state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StubUser {
    pub id: Uuid,
    pub password: String,
}

#[derive(Default)]
pub struct Counters {
    pub sign_up: AtomicU32,
    pub sign_in: AtomicU32,
    pub refresh: AtomicU32,
    pub logout: AtomicU32,
    pub update_user: AtomicU32,
    pub recover: AtomicU32,
    pub initialize: AtomicU32,
    pub export: AtomicU32,
    pub delete_account: AtomicU32,
}

pub fn count(counter: &AtomicU32) -> u32 {
    counter.load(Ordering::SeqCst)
}

#[derive(Default)]
pub struct Backend {
    pub users: Mutex<HashMap<String, StubUser>>,
    pub access_tokens: Mutex<HashMap<String, Uuid>>,
    pub refresh_tokens: Mutex<HashMap<String, Uuid>>,
    pub initialized: Mutex<HashSet<Uuid>>,
    pub entries: Mutex<Vec<JournalEntry>>,
    pub calls: Counters,
    /// The next N password sign-ins answer 429.
    pub throttle_sign_ins: AtomicU32,
    /// Sign-up answers with a bare user instead of a session.
    pub require_confirmation: AtomicBool,
    /// Issued access tokens are already expired.
    pub issue_expired: AtomicBool,
    /// Delay before `initialize_new_user` answers.
    pub init_delay_ms: AtomicU64,
    /// Body `initialize_new_user` answers with instead of the real result.
    pub init_override: Mutex<Option<String>>,
}

impl Backend {
    /// Register a user directly, bypassing the API.
    pub fn add_user(&self, email: &str, password: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.users.lock().insert(
            email.to_string(),
            StubUser {
                id,
                password: password.to_string(),
            },
        );
        id
    }

    pub fn is_initialized(&self, user_id: Uuid) -> bool {
        self.initialized.lock().contains(&user_id)
    }

    fn issue_session(&self, user_id: Uuid, email: &str) -> serde_json::Value {
        let access = format!("access-{}", Uuid::new_v4());
        let refresh = format!("refresh-{}", Uuid::new_v4());
        self.access_tokens.lock().insert(access.clone(), user_id);
        self.refresh_tokens.lock().insert(refresh.clone(), user_id);

        let expires_at = if self.issue_expired.load(Ordering::SeqCst) {
            Utc::now().timestamp() - 10
        } else {
            Utc::now().timestamp() + 3600
        };

        json!({
            "access_token": access,
            "token_type": "bearer",
            "expires_in": 3600,
            "expires_at": expires_at,
            "refresh_token": refresh,
            "user": { "id": user_id, "email": email },
        })
    }

    fn email_of(&self, user_id: Uuid) -> Option<String> {
        self.users
            .lock()
            .iter()
            .find(|(_, user)| user.id == user_id)
            .map(|(email, _)| email.clone())
    }
}

type Shared = Arc<Backend>;

// ---------------------------------------------------------------------------
// Request plumbing
// ---------------------------------------------------------------------------

fn auth_error(status: StatusCode, code: &str, msg: &str) -> Response {
    (
        status,
        Json(json!({ "code": status.as_u16(), "error_code": code, "msg": msg })),
    )
        .into_response()
}

fn rest_error(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({ "code": code, "message": message, "details": null, "hint": null })),
    )
        .into_response()
}

/// Check the project key and resolve the bearer token to a user.
///
/// `Err` carries the response to send back.
fn caller(backend: &Backend, headers: &HeaderMap) -> Result<Option<Uuid>, Response> {
    let apikey = headers.get("apikey").and_then(|v| v.to_str().ok());
    if apikey != Some(ANON_KEY) {
        return Err(rest_error(StatusCode::UNAUTHORIZED, "401", "Invalid API key"));
    }

    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default();
    if bearer == ANON_KEY {
        return Ok(None);
    }
    match backend.access_tokens.lock().get(bearer) {
        Some(id) => Ok(Some(*id)),
        None => Err(rest_error(StatusCode::UNAUTHORIZED, "PGRST301", "JWT expired")),
    }
}

fn require_user(backend: &Backend, headers: &HeaderMap) -> Result<Uuid, Response> {
    caller(backend, headers)?
        .ok_or_else(|| rest_error(StatusCode::UNAUTHORIZED, "42501", "permission denied"))
}

#[derive(Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

// ---------------------------------------------------------------------------
// Auth endpoints
// ---------------------------------------------------------------------------

async fn signup(State(backend): State<Shared>, headers: HeaderMap, Json(body): Json<Credentials>) -> Response {
    backend.calls.sign_up.fetch_add(1, Ordering::SeqCst);
    if let Err(response) = caller(&backend, &headers) {
        return response;
    }

    if backend.users.lock().contains_key(&body.email) {
        return auth_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "user_already_exists",
            "User already registered",
        );
    }
    if body.password.len() < 6 {
        return auth_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "weak_password",
            "Password should be at least 6 characters. Password is too weak",
        );
    }

    let id = backend.add_user(&body.email, &body.password);
    if backend.require_confirmation.load(Ordering::SeqCst) {
        return Json(json!({ "id": id, "email": body.email, "role": "authenticated" })).into_response();
    }
    Json(backend.issue_session(id, &body.email)).into_response()
}

#[derive(Deserialize)]
struct Grant {
    grant_type: String,
}

async fn token(
    State(backend): State<Shared>,
    Query(grant): Query<Grant>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Response {
    if let Err(response) = caller(&backend, &headers) {
        return response;
    }

    match grant.grant_type.as_str() {
        "password" => {
            backend.calls.sign_in.fetch_add(1, Ordering::SeqCst);
            let throttled = backend
                .throttle_sign_ins
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if throttled {
                return auth_error(
                    StatusCode::TOO_MANY_REQUESTS,
                    "over_request_rate_limit",
                    "Request rate limit reached",
                );
            }

            let email = body["email"].as_str().unwrap_or_default().to_string();
            let password = body["password"].as_str().unwrap_or_default();
            let user = backend.users.lock().get(&email).cloned();
            match user {
                Some(user) if user.password == password => {
                    Json(backend.issue_session(user.id, &email)).into_response()
                }
                _ => (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "error": "invalid_grant",
                        "error_description": "Invalid login credentials",
                        "error_code": "invalid_credentials",
                    })),
                )
                    .into_response(),
            }
        }
        "refresh_token" => {
            backend.calls.refresh.fetch_add(1, Ordering::SeqCst);
            let refresh = body["refresh_token"].as_str().unwrap_or_default();
            // Refresh tokens are single use.
            let user_id = backend.refresh_tokens.lock().remove(refresh);
            match user_id.and_then(|id| backend.email_of(id).map(|email| (id, email))) {
                Some((id, email)) => Json(backend.issue_session(id, &email)).into_response(),
                None => auth_error(
                    StatusCode::BAD_REQUEST,
                    "refresh_token_not_found",
                    "Invalid Refresh Token: Refresh Token Not Found",
                ),
            }
        }
        other => auth_error(
            StatusCode::BAD_REQUEST,
            "validation_failed",
            &format!("unsupported grant_type {other}"),
        ),
    }
}

async fn logout(State(backend): State<Shared>, headers: HeaderMap) -> Response {
    backend.calls.logout.fetch_add(1, Ordering::SeqCst);
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default()
        .to_string();
    let user_id = backend.access_tokens.lock().remove(&bearer);
    if let Some(user_id) = user_id {
        backend.refresh_tokens.lock().retain(|_, id| *id != user_id);
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn update_user(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Response {
    backend.calls.update_user.fetch_add(1, Ordering::SeqCst);
    let user_id = match require_user(&backend, &headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let Some(password) = body["password"].as_str() else {
        return auth_error(StatusCode::BAD_REQUEST, "validation_failed", "password required");
    };

    let mut users = backend.users.lock();
    let Some((email, user)) = users.iter_mut().find(|(_, u)| u.id == user_id) else {
        return auth_error(StatusCode::NOT_FOUND, "user_not_found", "User not found");
    };
    user.password = password.to_string();
    Json(json!({ "id": user_id, "email": email })).into_response()
}

async fn recover(State(backend): State<Shared>, headers: HeaderMap) -> Response {
    backend.calls.recover.fetch_add(1, Ordering::SeqCst);
    if let Err(response) = caller(&backend, &headers) {
        return response;
    }
    Json(json!({})).into_response()
}

// ---------------------------------------------------------------------------
// Procedures
// ---------------------------------------------------------------------------

async fn rpc(
    State(backend): State<Shared>,
    Path(function): Path<String>,
    headers: HeaderMap,
    Json(params): Json<serde_json::Value>,
) -> Response {
    match function.as_str() {
        "initialize_new_user" => {
            backend.calls.initialize.fetch_add(1, Ordering::SeqCst);
            // Anonymous callers may initialize; a stale token is refused.
            if let Err(response) = caller(&backend, &headers) {
                return response;
            }
            let delay = backend.init_delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            if let Some(body) = backend.init_override.lock().clone() {
                return body.into_response();
            }

            let Some(user_id) = params["p_user_id"].as_str().and_then(|s| s.parse::<Uuid>().ok())
            else {
                return rest_error(StatusCode::BAD_REQUEST, "22P02", "invalid input syntax for type uuid");
            };
            let fresh = backend.initialized.lock().insert(user_id);
            let message = if fresh {
                "User initialized successfully"
            } else {
                "User already initialized"
            };
            Json(json!({ "success": true, "user_id": user_id, "message": message })).into_response()
        }
        "export_journal_entries" => {
            backend.calls.export.fetch_add(1, Ordering::SeqCst);
            let user_id = match require_user(&backend, &headers) {
                Ok(id) => id,
                Err(response) => return response,
            };
            let entries: Vec<serde_json::Value> = backend
                .entries
                .lock()
                .iter()
                .filter(|e| e.user_id == user_id)
                .map(|e| json!({ "id": e.id, "created_at": e.created_at, "content": e.content }))
                .collect();
            Json(json!({
                "total_entries": entries.len(),
                "exported_at": Utc::now(),
                "entries": entries,
            }))
            .into_response()
        }
        "delete_my_account" => {
            backend.calls.delete_account.fetch_add(1, Ordering::SeqCst);
            let user_id = match require_user(&backend, &headers) {
                Ok(id) => id,
                Err(response) => return response,
            };
            backend.entries.lock().retain(|e| e.user_id != user_id);
            backend.users.lock().retain(|_, u| u.id != user_id);
            backend.initialized.lock().remove(&user_id);
            Json(json!({ "success": true, "message": "Account deleted" })).into_response()
        }
        other => rest_error(
            StatusCode::NOT_FOUND,
            "PGRST202",
            &format!("Could not find the function public.{other}"),
        ),
    }
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

fn id_filter(query: &HashMap<String, String>) -> Option<Uuid> {
    query
        .get("id")
        .and_then(|v| v.strip_prefix("eq."))
        .and_then(|v| v.parse().ok())
}

async fn list_entries(
    State(backend): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let user_id = match require_user(&backend, &headers) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let mut rows: Vec<JournalEntry> = backend
        .entries
        .lock()
        .iter()
        .filter(|e| e.user_id == user_id)
        .cloned()
        .collect();
    if query.get("order").map(String::as_str) == Some("created_at.desc") {
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    }
    if let Some(limit) = query.get("limit").and_then(|l| l.parse().ok()) {
        rows.truncate(limit);
    }

    if query.get("select").map(String::as_str) == Some("id") {
        let ids: Vec<_> = rows.iter().map(|e| json!({ "id": e.id })).collect();
        return Json(ids).into_response();
    }
    Json(rows).into_response()
}

async fn insert_entry(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let user_id = match require_user(&backend, &headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    if body["user_id"].as_str() != Some(user_id.to_string().as_str()) {
        return rest_error(
            StatusCode::FORBIDDEN,
            "42501",
            "new row violates row-level security policy",
        );
    }

    let now = Utc::now();
    let entry = JournalEntry {
        id: Uuid::new_v4(),
        user_id,
        content: body["content"].as_str().unwrap_or_default().to_string(),
        created_at: now,
        updated_at: now,
    };
    backend.entries.lock().push(entry.clone());
    (StatusCode::CREATED, Json(vec![entry])).into_response()
}

async fn update_entry(
    State(backend): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let user_id = match require_user(&backend, &headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let id = id_filter(&query);

    let mut entries = backend.entries.lock();
    let updated: Vec<JournalEntry> = entries
        .iter_mut()
        .filter(|e| e.user_id == user_id && Some(e.id) == id)
        .map(|e| {
            if let Some(content) = body["content"].as_str() {
                e.content = content.to_string();
            }
            e.updated_at = Utc::now();
            e.clone()
        })
        .collect();
    Json(updated).into_response()
}

async fn delete_entry(
    State(backend): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let user_id = match require_user(&backend, &headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let id = id_filter(&query);

    let mut entries = backend.entries.lock();
    let (deleted, kept): (Vec<JournalEntry>, Vec<JournalEntry>) = entries
        .drain(..)
        .partition(|e| e.user_id == user_id && Some(e.id) == id);
    *entries = kept;
    Json(deleted).into_response()
}

async fn streaks(State(backend): State<Shared>, headers: HeaderMap) -> Response {
    let user_id = match require_user(&backend, &headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    if !backend.is_initialized(user_id) {
        return Json(Vec::<serde_json::Value>::new()).into_response();
    }

    let entries = backend.entries.lock();
    let last = entries
        .iter()
        .filter(|e| e.user_id == user_id)
        .map(|e| e.created_at.date_naive())
        .max();
    let streak = if last.is_some() { 1 } else { 0 };
    Json(vec![json!({
        "user_id": user_id,
        "current_streak": streak,
        "longest_streak": streak,
        "last_entry_date": last,
    })])
    .into_response()
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub fn router(backend: Shared) -> Router {
    Router::new()
        .route("/auth/v1/signup", post(signup))
        .route("/auth/v1/token", post(token))
        .route("/auth/v1/logout", post(logout))
        .route("/auth/v1/user", axum::routing::put(update_user))
        .route("/auth/v1/recover", post(recover))
        .route("/rest/v1/rpc/{function}", post(rpc))
        .route(
            "/rest/v1/journal_entries",
            get(list_entries)
                .post(insert_entry)
                .patch(update_entry)
                .delete(delete_entry),
        )
        .route("/rest/v1/user_streaks", get(streaks))
        .with_state(backend)
}

/// Serve a fresh backend on an ephemeral port; returns its state and base URL.
pub async fn spawn_backend() -> (Shared, String) {
    let backend = Arc::new(Backend::default());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub backend");
    let addr = listener.local_addr().expect("local addr");

    let app = router(backend.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub backend crashed");
    });

    (backend, format!("http://{addr}"))
}

/// Client settings pointing at `base_url` with fast retries.
pub fn test_config(base_url: &str) -> ClientConfig {
    ClientConfig {
        supabase_url: base_url.to_string(),
        anon_key: ANON_KEY.to_string(),
        data_dir: std::env::temp_dir().join("journal-client-tests"),
        request_timeout: Duration::from_secs(5),
        init_timeout: Duration::from_secs(5),
        retry: RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            backoff_unit: Duration::from_millis(1),
        },
        refresh_margin: Duration::from_secs(60),
        dev_user: DevUserConfig::default(),
    }
}

/// Backend plus a client with in-memory session storage.
pub async fn setup() -> (Shared, JournalClient) {
    let (backend, url) = spawn_backend().await;
    let client = JournalClient::with_storage(&test_config(&url), Arc::new(MemoryStorage::new()))
        .expect("build client");
    (backend, client)
}
