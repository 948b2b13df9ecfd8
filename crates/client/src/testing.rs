//! Scripted stand-ins for the remote seams, shared by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use journal_core::session::Session;
use journal_core::types::UserId;
use parking_lot::Mutex;

use crate::auth::{AuthApi, AuthResponse, RemoteUser};
use crate::error::{AuthError, ClientError, ClientResult};
use crate::rpc::RpcApi;
use crate::session_store::SessionStore;
use crate::storage::MemoryStorage;

pub const STUB_EMAIL: &str = "stub@example.com";

pub fn memory_store() -> Arc<SessionStore> {
    Arc::new(SessionStore::new(Arc::new(MemoryStorage::new())))
}

/// One scripted answer from the auth backend.
#[derive(Debug, Clone, Copy)]
pub enum Reply {
    /// Full session for the user.
    Session(UserId),
    /// User object without tokens (confirmation pending).
    BareUser(UserId),
    /// Tokens but an empty user id.
    NoUser,
    RateLimited,
    Auth(u16, &'static str),
}

impl Reply {
    fn into_result(self, serial: u32) -> ClientResult<AuthResponse> {
        let user = |id: &str| {
            Some(RemoteUser {
                id: Some(id.to_string()),
                email: Some(STUB_EMAIL.into()),
            })
        };
        match self {
            Reply::Session(id) => Ok(AuthResponse {
                access_token: Some(format!("access-{serial}")),
                refresh_token: Some(format!("refresh-{serial}")),
                expires_in: Some(3600),
                user: user(&id.to_string()),
                ..Default::default()
            }),
            Reply::BareUser(id) => Ok(AuthResponse {
                id: Some(id.to_string()),
                email: Some(STUB_EMAIL.into()),
                ..Default::default()
            }),
            Reply::NoUser => Ok(AuthResponse {
                access_token: Some(format!("access-{serial}")),
                refresh_token: Some(format!("refresh-{serial}")),
                user: user(""),
                ..Default::default()
            }),
            Reply::RateLimited => Err(AuthError::new(
                Some(429),
                Some("over_request_rate_limit".into()),
                "Rate limit exceeded",
            )
            .into()),
            Reply::Auth(status, message) => Err(AuthError::new(Some(status), None, message).into()),
        }
    }
}

#[derive(Default)]
pub struct Calls {
    pub sign_in: AtomicU32,
    pub sign_up: AtomicU32,
    pub sign_out: AtomicU32,
    pub refresh: AtomicU32,
    pub update_password: AtomicU32,
    pub set_session: AtomicU32,
    pub reset: AtomicU32,
}

impl Calls {
    pub fn get(counter: &AtomicU32) -> u32 {
        counter.load(Ordering::SeqCst)
    }
}

/// [`AuthApi`] answering from per-operation queues, falling back to
/// `default_user` sessions once a queue is empty. Session side effects go
/// to a real [`SessionStore`].
pub struct StubAuth {
    pub store: Arc<SessionStore>,
    pub calls: Calls,
    pub default_user: UserId,
    pub fail_sign_out: AtomicBool,
    sign_in: Mutex<VecDeque<Reply>>,
    sign_up: Mutex<VecDeque<Reply>>,
    refresh: Mutex<VecDeque<Reply>>,
}

impl StubAuth {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self {
            store,
            calls: Calls::default(),
            default_user: uuid::Uuid::new_v4(),
            fail_sign_out: AtomicBool::new(false),
            sign_in: Mutex::default(),
            sign_up: Mutex::default(),
            refresh: Mutex::default(),
        }
    }

    pub fn with_sign_in(self, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.sign_in.lock().extend(replies);
        self
    }

    pub fn with_sign_up(self, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.sign_up.lock().extend(replies);
        self
    }

    pub fn with_refresh(self, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.refresh.lock().extend(replies);
        self
    }

    fn next(&self, queue: &Mutex<VecDeque<Reply>>) -> Reply {
        queue
            .lock()
            .pop_front()
            .unwrap_or(Reply::Session(self.default_user))
    }
}

#[async_trait]
impl AuthApi for StubAuth {
    async fn sign_up(&self, _email: &str, _password: &str) -> ClientResult<AuthResponse> {
        let n = self.calls.sign_up.fetch_add(1, Ordering::SeqCst);
        self.next(&self.sign_up).into_result(n)
    }

    async fn sign_in(&self, _email: &str, _password: &str) -> ClientResult<AuthResponse> {
        let n = self.calls.sign_in.fetch_add(1, Ordering::SeqCst);
        let response = self.next(&self.sign_in).into_result(n)?;
        if let Ok(session) = response.to_session() {
            self.store.save(&session);
        }
        Ok(response)
    }

    async fn sign_out(&self) -> ClientResult<()> {
        self.calls.sign_out.fetch_add(1, Ordering::SeqCst);
        self.store.destroy();
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(ClientError::Api {
                status: 503,
                code: None,
                message: "logout unavailable".into(),
            });
        }
        Ok(())
    }

    async fn refresh_session(&self, _refresh_token: &str) -> ClientResult<Session> {
        let n = self.calls.refresh.fetch_add(1, Ordering::SeqCst);
        // Suspend like a real round trip so concurrent callers interleave.
        tokio::task::yield_now().await;
        let session = self.next(&self.refresh).into_result(100 + n)?.to_session()?;
        self.store.save(&session);
        Ok(session)
    }

    async fn update_password(&self, _new_password: &str) -> ClientResult<()> {
        self.calls.update_password.fetch_add(1, Ordering::SeqCst);
        self.store.load_sync().ok_or(ClientError::NotAuthenticated)?;
        Ok(())
    }

    async fn set_session(&self, response: &AuthResponse) -> ClientResult<Session> {
        self.calls.set_session.fetch_add(1, Ordering::SeqCst);
        let session = response.to_session()?;
        self.store.save(&session);
        Ok(session)
    }

    async fn request_password_reset(&self, _email: &str) -> ClientResult<()> {
        self.calls.reset.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// [`RpcApi`] answering each procedure with a fixed body.
///
/// Unknown procedures answer `{"success":true}`.
#[derive(Default)]
pub struct StubRpc {
    bodies: Mutex<HashMap<String, String>>,
    pub calls: Mutex<Vec<(String, serde_json::Value)>>,
}

impl StubRpc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(self, function: &str, body: &str) -> Self {
        self.bodies.lock().insert(function.into(), body.into());
        self
    }

    pub fn count(&self, function: &str) -> usize {
        self.calls.lock().iter().filter(|(f, _)| f == function).count()
    }
}

#[async_trait]
impl RpcApi for StubRpc {
    async fn call(&self, function: &str, params: serde_json::Value) -> ClientResult<String> {
        self.calls.lock().push((function.to_string(), params));
        Ok(self
            .bodies
            .lock()
            .get(function)
            .cloned()
            .unwrap_or_else(|| r#"{"success":true}"#.to_string()))
    }
}
