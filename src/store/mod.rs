//! The persistence contract for polls and votes.
//!
//! The aggregate only ever talks to the `PollStore` trait; which backend is
//! behind it (JSON file, Postgres, in-memory arena) is decided once at
//! startup. Vote upsert and delete are atomic per composite key, which is
//! what makes the toggle read-decide-write safe without cross-backend
//! locking.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, offset::Utc};
use serde::{Deserialize, Serialize};

use crate::model::{DateChunk, PollSummary, Vote};

pub mod file;
#[cfg(test)]
pub mod memory;
pub mod postgres;

/// The persisted poll fields. Votes live separately under their composite
/// key so that edits never touch them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollRecord {
    pub id: String,
    pub title: String,
    pub participants: Vec<String>,
    pub date_chunks: Vec<DateChunk>,
    pub blocked_dates: Vec<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub enum StoreError {
    DuplicateId(String),
    Sql(sqlx::Error),
    Io(std::io::Error),
    Corrupt(serde_json::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> StoreError {
        StoreError::Sql(e)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> StoreError {
        StoreError::Io(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> StoreError {
        StoreError::Corrupt(e)
    }
}

#[async_trait]
pub trait PollStore: Send + Sync {
    /// Fails with `StoreError::DuplicateId` when the id is already taken.
    async fn insert_poll(&self, record: &PollRecord) -> Result<(), StoreError>;

    /// One consistent snapshot of the poll's stored fields.
    async fn get_poll_record(&self, poll_id: &str) -> Result<Option<PollRecord>, StoreError>;

    /// Wholesale replacement of everything except id and creation time.
    /// Returns the updated record, or `None` when the poll does not exist.
    async fn replace_poll_fields(
        &self,
        poll_id: &str,
        title: &str,
        participants: &[String],
        date_chunks: &[DateChunk],
        blocked_dates: &[NaiveDate],
    ) -> Result<Option<PollRecord>, StoreError>;

    /// Atomic per composite key; an existing vote keeps its key and takes
    /// the new timestamp.
    async fn upsert_vote(&self, poll_id: &str, vote: &Vote) -> Result<(), StoreError>;

    /// Atomic per composite key; deleting an absent vote is a no-op.
    async fn delete_vote(
        &self,
        poll_id: &str,
        participant_name: &str,
        date_chunk_id: &str,
    ) -> Result<(), StoreError>;

    /// Every stored vote for the poll, inert ones included.
    async fn list_votes(&self, poll_id: &str) -> Result<Vec<Vote>, StoreError>;

    async fn list_polls(&self) -> Result<Vec<PollSummary>, StoreError>;
}
