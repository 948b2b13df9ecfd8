//! Session lifecycle and remote access for the journaling app.
//!
//! The crate talks to a hosted auth + database backend over HTTP:
//!
//! - [`SessionStore`] keeps the signed-in session in memory for synchronous
//!   readers and mirrors it to durable [`Storage`] in the background.
//! - [`LoginOrchestrator`] and [`RegisterOrchestrator`] drive the sign-in and
//!   sign-up flows, retrying rate-limited calls with [`RetryPolicy`] and
//!   making sure the account is initialized via [`UserInitializer`].
//! - [`SessionManager`] restores and refreshes the session;
//!   [`JournalService`] and [`AccountService`] cover the rest of the app.
//!
//! [`JournalClient`] wires all of it from a [`ClientConfig`].

pub mod account;
pub mod auth;
pub mod client;
pub mod config;
pub mod current_user;
pub mod error;
pub mod initializer;
pub mod journal;
pub mod login;
pub mod logout;
pub mod register;
pub mod rest;
pub mod retry;
pub mod rpc;
pub mod session_manager;
pub mod session_store;
pub mod storage;

#[cfg(test)]
mod testing;

pub use account::AccountService;
pub use auth::{AuthApi, AuthResponse, RemoteAuthClient};
pub use client::JournalClient;
pub use config::{ClientConfig, ConfigError, DevUserConfig};
pub use current_user::CurrentUserAccessor;
pub use error::{AuthError, ClientError, ClientResult, InitFailure};
pub use initializer::UserInitializer;
pub use journal::JournalService;
pub use login::{LoginOrchestrator, LoginState};
pub use logout::LogoutHandler;
pub use register::{RegisterOrchestrator, RegistrationOutcome};
pub use rest::RestClient;
pub use retry::{RateLimited, RetryPolicy};
pub use rpc::{PostgrestRpc, RpcApi};
pub use session_manager::SessionManager;
pub use session_store::SessionStore;
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
