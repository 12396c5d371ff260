//! Whole-document JSON store: the entire database is one file, read,
//! modified, and rewritten under a mutex.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::{PollRecord, PollStore, StoreError};
use crate::model::{DateChunk, PollSummary, Vote};

#[derive(Default, Serialize, Deserialize)]
struct Document {
    polls: HashMap<String, PollRecord>,
    votes: HashMap<String, Vec<Vote>>,
}

pub struct FilePollStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FilePollStore {
    /// Creates the parent directory and an empty document on first open.
    pub fn open(path: impl Into<PathBuf>) -> Result<FilePollStore, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        if !path.exists() {
            let empty = serde_json::to_string_pretty(&Document::default())?;
            fs::write(&path, empty)?;
        }
        Ok(FilePollStore {
            path,
            guard: Mutex::new(()),
        })
    }

    fn read_document(&self) -> Result<Document, StoreError> {
        let raw = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn write_document(&self, document: &Document) -> Result<(), StoreError> {
        let raw = serde_json::to_string_pretty(document)?;
        fs::write(&self.path, raw)?;
        Ok(())
    }
}

#[async_trait]
impl PollStore for FilePollStore {
    async fn insert_poll(&self, record: &PollRecord) -> Result<(), StoreError> {
        let _guard = self.guard.lock().await;
        let mut document = self.read_document()?;
        if document.polls.contains_key(&record.id) {
            return Err(StoreError::DuplicateId(record.id.clone()));
        }
        document.polls.insert(record.id.clone(), record.clone());
        self.write_document(&document)
    }

    async fn get_poll_record(&self, poll_id: &str) -> Result<Option<PollRecord>, StoreError> {
        let _guard = self.guard.lock().await;
        let document = self.read_document()?;
        Ok(document.polls.get(poll_id).cloned())
    }

    async fn replace_poll_fields(
        &self,
        poll_id: &str,
        title: &str,
        participants: &[String],
        date_chunks: &[DateChunk],
        blocked_dates: &[NaiveDate],
    ) -> Result<Option<PollRecord>, StoreError> {
        let _guard = self.guard.lock().await;
        let mut document = self.read_document()?;
        let updated = match document.polls.get_mut(poll_id) {
            None => return Ok(None),
            Some(record) => {
                record.title = title.to_owned();
                record.participants = participants.to_vec();
                record.date_chunks = date_chunks.to_vec();
                record.blocked_dates = blocked_dates.to_vec();
                record.clone()
            }
        };
        self.write_document(&document)?;
        Ok(Some(updated))
    }

    async fn upsert_vote(&self, poll_id: &str, vote: &Vote) -> Result<(), StoreError> {
        let _guard = self.guard.lock().await;
        let mut document = self.read_document()?;
        let votes = document.votes.entry(poll_id.to_owned()).or_insert_with(Vec::new);
        votes.retain(|v| {
            !(v.participant_name == vote.participant_name
                && v.date_chunk_id == vote.date_chunk_id)
        });
        votes.push(vote.clone());
        self.write_document(&document)
    }

    async fn delete_vote(
        &self,
        poll_id: &str,
        participant_name: &str,
        date_chunk_id: &str,
    ) -> Result<(), StoreError> {
        let _guard = self.guard.lock().await;
        let mut document = self.read_document()?;
        if let Some(votes) = document.votes.get_mut(poll_id) {
            votes.retain(|v| {
                !(v.participant_name == participant_name && v.date_chunk_id == date_chunk_id)
            });
        }
        self.write_document(&document)
    }

    async fn list_votes(&self, poll_id: &str) -> Result<Vec<Vote>, StoreError> {
        let _guard = self.guard.lock().await;
        let document = self.read_document()?;
        Ok(document.votes.get(poll_id).cloned().unwrap_or_default())
    }

    async fn list_polls(&self) -> Result<Vec<PollSummary>, StoreError> {
        let _guard = self.guard.lock().await;
        let document = self.read_document()?;
        let mut summaries: Vec<PollSummary> = document
            .polls
            .values()
            .map(|record| PollSummary {
                id: record.id.clone(),
                title: record.title.clone(),
                created_at: record.created_at,
            })
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }
}
