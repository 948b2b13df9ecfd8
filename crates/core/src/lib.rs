//! Pure domain layer for the journaling client.
//!
//! Holds the session and initialization models, the journal/streak/export
//! records exchanged with the backend, command validation, and the mapping
//! from raw auth errors to user-facing messages. Nothing in this crate
//! performs I/O.

pub mod account;
pub mod error;
pub mod error_mapper;
pub mod initialization;
pub mod journal;
pub mod session;
pub mod types;
