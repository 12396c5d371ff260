//! Arena-backed store, keyed by poll id and by vote composite key.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;

use super::{PollRecord, PollStore, StoreError};
use crate::model::{DateChunk, PollSummary, Vote};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct VoteKey {
    poll_id: String,
    participant_name: String,
    date_chunk_id: String,
}

#[derive(Default)]
struct Arena {
    polls: HashMap<String, PollRecord>,
    votes: HashMap<VoteKey, Vote>,
}

pub struct MemoryPollStore {
    arena: Mutex<Arena>,
}

impl MemoryPollStore {
    pub fn new() -> MemoryPollStore {
        MemoryPollStore {
            arena: Mutex::new(Arena::default()),
        }
    }
}

#[async_trait]
impl PollStore for MemoryPollStore {
    async fn insert_poll(&self, record: &PollRecord) -> Result<(), StoreError> {
        let mut arena = self.arena.lock().await;
        if arena.polls.contains_key(&record.id) {
            return Err(StoreError::DuplicateId(record.id.clone()));
        }
        arena.polls.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get_poll_record(&self, poll_id: &str) -> Result<Option<PollRecord>, StoreError> {
        Ok(self.arena.lock().await.polls.get(poll_id).cloned())
    }

    async fn replace_poll_fields(
        &self,
        poll_id: &str,
        title: &str,
        participants: &[String],
        date_chunks: &[DateChunk],
        blocked_dates: &[NaiveDate],
    ) -> Result<Option<PollRecord>, StoreError> {
        let mut arena = self.arena.lock().await;
        match arena.polls.get_mut(poll_id) {
            None => Ok(None),
            Some(record) => {
                record.title = title.to_owned();
                record.participants = participants.to_vec();
                record.date_chunks = date_chunks.to_vec();
                record.blocked_dates = blocked_dates.to_vec();
                Ok(Some(record.clone()))
            }
        }
    }

    async fn upsert_vote(&self, poll_id: &str, vote: &Vote) -> Result<(), StoreError> {
        let key = VoteKey {
            poll_id: poll_id.to_owned(),
            participant_name: vote.participant_name.clone(),
            date_chunk_id: vote.date_chunk_id.clone(),
        };
        self.arena.lock().await.votes.insert(key, vote.clone());
        Ok(())
    }

    async fn delete_vote(
        &self,
        poll_id: &str,
        participant_name: &str,
        date_chunk_id: &str,
    ) -> Result<(), StoreError> {
        let key = VoteKey {
            poll_id: poll_id.to_owned(),
            participant_name: participant_name.to_owned(),
            date_chunk_id: date_chunk_id.to_owned(),
        };
        self.arena.lock().await.votes.remove(&key);
        Ok(())
    }

    async fn list_votes(&self, poll_id: &str) -> Result<Vec<Vote>, StoreError> {
        let arena = self.arena.lock().await;
        Ok(arena
            .votes
            .iter()
            .filter(|(key, _)| key.poll_id == poll_id)
            .map(|(_, vote)| vote.clone())
            .collect())
    }

    async fn list_polls(&self) -> Result<Vec<PollSummary>, StoreError> {
        let arena = self.arena.lock().await;
        let mut summaries: Vec<PollSummary> = arena
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

#[cfg(test)]
mod tests {
    use chrono::offset::Utc;

    use super::*;
    use crate::dates;

    fn mock_record(id: &str) -> PollRecord {
        PollRecord {
            id: id.to_owned(),
            title: "Summer trip".to_owned(),
            participants: vec!["Alex".to_owned(), "Bea".to_owned()],
            date_chunks: vec![dates::create_chunk(chrono::NaiveDate::from_ymd(2026, 8, 10))],
            blocked_dates: vec![],
            created_at: Utc::now(),
        }
    }

    fn mock_vote(participant_name: &str, date_chunk_id: &str) -> Vote {
        Vote {
            participant_name: participant_name.to_owned(),
            date_chunk_id: date_chunk_id.to_owned(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let store = MemoryPollStore::new();
        let record = mock_record("p1");

        store.insert_poll(&record).await.unwrap();
        let got = store.get_poll_record("p1").await.unwrap();

        assert_eq!(Some(record), got);
    }

    #[tokio::test]
    async fn insert_rejects_a_duplicate_id() {
        let store = MemoryPollStore::new();
        let record = mock_record("p1");

        store.insert_poll(&record).await.unwrap();
        let error = store
            .insert_poll(&record)
            .await
            .expect_err("Should reject duplicate poll id");

        match error {
            StoreError::DuplicateId(id) => assert_eq!("p1", id),
            other => panic!("Expected DuplicateId, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn replace_updates_fields_and_keeps_creation_time() {
        let store = MemoryPollStore::new();
        let record = mock_record("p1");
        store.insert_poll(&record).await.unwrap();

        let chunks = vec![dates::create_chunk(chrono::NaiveDate::from_ymd(2026, 9, 1))];
        let updated = store
            .replace_poll_fields("p1", "Autumn trip", &["Cleo".to_owned()], &chunks, &[])
            .await
            .unwrap()
            .expect("Poll should exist");

        assert_eq!("Autumn trip", updated.title);
        assert_eq!(vec!["Cleo".to_owned()], updated.participants);
        assert_eq!(chunks, updated.date_chunks);
        assert_eq!(record.created_at, updated.created_at);
    }

    #[tokio::test]
    async fn replace_of_a_missing_poll_returns_none() {
        let store = MemoryPollStore::new();
        let result = store
            .replace_poll_fields("nope", "Title", &["Alex".to_owned()], &[], &[])
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn upsert_replaces_and_delete_is_idempotent() {
        let store = MemoryPollStore::new();
        let first = mock_vote("Alex", "chunk-2026-08-10");
        let mut second = first.clone();
        second.timestamp = first.timestamp + chrono::Duration::seconds(5);

        store.upsert_vote("p1", &first).await.unwrap();
        store.upsert_vote("p1", &second).await.unwrap();

        let votes = store.list_votes("p1").await.unwrap();
        assert_eq!(1, votes.len());
        assert_eq!(second.timestamp, votes[0].timestamp);

        store
            .delete_vote("p1", "Alex", "chunk-2026-08-10")
            .await
            .unwrap();
        store
            .delete_vote("p1", "Alex", "chunk-2026-08-10")
            .await
            .unwrap();
        assert!(store.list_votes("p1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn votes_are_scoped_to_their_poll() {
        let store = MemoryPollStore::new();
        store
            .upsert_vote("p1", &mock_vote("Alex", "chunk-2026-08-10"))
            .await
            .unwrap();
        store
            .upsert_vote("p2", &mock_vote("Alex", "chunk-2026-08-10"))
            .await
            .unwrap();

        assert_eq!(1, store.list_votes("p1").await.unwrap().len());
        assert_eq!(1, store.list_votes("p2").await.unwrap().len());
    }
}
