//! Journal entries and streaks through the data API.
//!
//! Row-level security scopes every query to the signed-in user, so no
//! request here filters by user id.

use std::sync::Arc;

use journal_core::journal::{
    CreateJournalEntryRequest, JournalEntry, UpdateJournalEntryRequest, UserStreak,
    ENTRIES_TABLE, STREAKS_TABLE, WELCOME_CONTENT,
};
use journal_core::types::EntryId;
use reqwest::Method;

use crate::error::{ClientError, ClientResult};
use crate::rest::RestClient;
use crate::session_manager::SessionManager;

const RETURN_REPRESENTATION: &str = "return=representation";

pub struct JournalService {
    rest: RestClient,
    sessions: Arc<SessionManager>,
}

impl JournalService {
    pub fn new(rest: RestClient, sessions: Arc<SessionManager>) -> Self {
        Self { rest, sessions }
    }

    /// All entries, newest first.
    pub async fn list_entries(&self) -> ClientResult<Vec<JournalEntry>> {
        self.send(
            Method::GET,
            &format!("{ENTRIES_TABLE}?select=*&order=created_at.desc"),
            None,
        )
        .await
    }

    pub async fn create_entry(&self, content: &str) -> ClientResult<JournalEntry> {
        let session = self.sessions.valid_session().await?;
        let request = CreateJournalEntryRequest::new(session.user_id, content)?;

        let rows: Vec<JournalEntry> = self
            .send(
                Method::POST,
                ENTRIES_TABLE,
                Some(serde_json::to_value(&request)?),
            )
            .await?;
        let entry = rows
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::Protocol("insert returned no rows".into()))?;

        tracing::info!(entry_id = %entry.id, "Journal entry created");
        Ok(entry)
    }

    pub async fn update_entry(&self, id: EntryId, content: &str) -> ClientResult<JournalEntry> {
        let request = UpdateJournalEntryRequest::new(content)?;

        let rows: Vec<JournalEntry> = self
            .send(
                Method::PATCH,
                &format!("{ENTRIES_TABLE}?id=eq.{id}"),
                Some(serde_json::to_value(&request)?),
            )
            .await?;
        let entry = rows.into_iter().next().ok_or(ClientError::NotFound {
            entity: "journal entry",
            id,
        })?;

        tracing::info!(entry_id = %id, "Journal entry updated");
        Ok(entry)
    }

    pub async fn delete_entry(&self, id: EntryId) -> ClientResult<()> {
        let rows: Vec<serde_json::Value> = self
            .send(Method::DELETE, &format!("{ENTRIES_TABLE}?id=eq.{id}"), None)
            .await?;
        if rows.is_empty() {
            return Err(ClientError::NotFound {
                entity: "journal entry",
                id,
            });
        }

        tracing::info!(entry_id = %id, "Journal entry deleted");
        Ok(())
    }

    /// The user's streak row, if the server has created one.
    pub async fn get_streak(&self) -> ClientResult<Option<UserStreak>> {
        let rows: Vec<UserStreak> = self
            .send(Method::GET, &format!("{STREAKS_TABLE}?select=*&limit=1"), None)
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Give a user with an empty journal a first entry to look at.
    ///
    /// Returns whether an entry was created. Errors are logged, never
    /// returned: a missing welcome entry must not block the journal.
    pub async fn create_welcome_entry_if_needed(&self) -> bool {
        match self.try_create_welcome_entry().await {
            Ok(created) => created,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create welcome entry");
                false
            }
        }
    }

    async fn try_create_welcome_entry(&self) -> ClientResult<bool> {
        let existing: Vec<serde_json::Value> = self
            .send(Method::GET, &format!("{ENTRIES_TABLE}?select=id&limit=1"), None)
            .await?;
        if !existing.is_empty() {
            tracing::debug!("User already has entries, skipping welcome entry");
            return Ok(false);
        }

        self.create_entry(WELCOME_CONTENT).await?;
        Ok(true)
    }

    /// Issue an authenticated request against a table and decode the rows.
    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> ClientResult<T> {
        let session = self.sessions.valid_session().await?;

        let mut request = self
            .rest
            .request(method, &self.rest.rest_url(path), Some(&session.access_token))
            .header("Prefer", RETURN_REPRESENTATION);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        RestClient::parse_response(response).await
    }
}
