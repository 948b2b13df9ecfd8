use std::sync::Arc;

use crate::account::AccountService;
use crate::auth::{AuthApi, RemoteAuthClient};
use crate::config::ClientConfig;
use crate::current_user::CurrentUserAccessor;
use crate::error::ClientResult;
use crate::initializer::UserInitializer;
use crate::journal::JournalService;
use crate::login::LoginOrchestrator;
use crate::logout::LogoutHandler;
use crate::register::RegisterOrchestrator;
use crate::rest::RestClient;
use crate::rpc::{PostgrestRpc, RpcApi};
use crate::session_manager::SessionManager;
use crate::session_store::SessionStore;
use crate::storage::{FileStorage, Storage};

/// Every service of the client, wired once at startup.
///
/// All services share one [`SessionStore`], so a sign-in through
/// [`login`](Self::login) is immediately visible to the journal and account
/// services.
pub struct JournalClient {
    pub store: Arc<SessionStore>,
    pub sessions: Arc<SessionManager>,
    pub current_user: CurrentUserAccessor,
    pub login: LoginOrchestrator,
    pub register: RegisterOrchestrator,
    pub logout: LogoutHandler,
    pub account: AccountService,
    pub journal: JournalService,
}

impl JournalClient {
    /// Build a client that keeps its session under `config.data_dir`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        let storage = Arc::new(FileStorage::new(&config.data_dir));
        Self::with_storage(config, storage)
    }

    /// Build a client over an arbitrary storage backend.
    pub fn with_storage(config: &ClientConfig, storage: Arc<dyn Storage>) -> ClientResult<Self> {
        let rest = RestClient::new(&config.supabase_url, &config.anon_key, config.request_timeout)?;
        let store = Arc::new(SessionStore::new(storage));

        let auth: Arc<dyn AuthApi> = Arc::new(RemoteAuthClient::new(rest.clone(), store.clone()));
        let rpc: Arc<dyn RpcApi> = Arc::new(PostgrestRpc::new(rest.clone(), store.clone()));
        let initializer = Arc::new(UserInitializer::with_timeout(rpc.clone(), config.init_timeout));
        let sessions = Arc::new(SessionManager::new(
            auth.clone(),
            store.clone(),
            config.refresh_margin,
        ));

        Ok(Self {
            current_user: CurrentUserAccessor::new(store.clone(), config.dev_user.clone()),
            login: LoginOrchestrator::new(auth.clone(), initializer.clone(), config.retry.clone()),
            register: RegisterOrchestrator::new(
                auth.clone(),
                initializer,
                store.clone(),
                config.retry.clone(),
            ),
            logout: LogoutHandler::new(auth.clone(), store.clone()),
            account: AccountService::new(auth, rpc, sessions.clone(), config.retry.clone()),
            journal: JournalService::new(rest, sessions.clone()),
            sessions,
            store,
        })
    }
}
