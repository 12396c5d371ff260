//! The vote ledger for a single poll.
//!
//! A pure snapshot keyed by (participant, chunk): callers load it from
//! stored votes, make toggle decisions against it, and apply the outcome
//! through the store's atomic upsert/delete primitives. There is no
//! cross-chunk exclusivity; a participant may hold votes for any number
//! of chunks at once.

use std::collections::HashMap;

use chrono::{DateTime, offset::Utc};

use crate::model::Vote;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct VoteKey {
    participant_name: String,
    date_chunk_id: String,
}

impl VoteKey {
    fn new(participant_name: &str, date_chunk_id: &str) -> VoteKey {
        VoteKey {
            participant_name: participant_name.to_owned(),
            date_chunk_id: date_chunk_id.to_owned(),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    Removed,
}

#[derive(Debug, Default)]
pub struct VoteLedger {
    votes: HashMap<VoteKey, Vote>,
}

impl VoteLedger {
    pub fn new() -> VoteLedger {
        VoteLedger::default()
    }

    /// Later entries for the same (participant, chunk) pair replace
    /// earlier ones.
    pub fn from_votes(votes: Vec<Vote>) -> VoteLedger {
        let mut ledger = VoteLedger::new();
        for vote in votes {
            ledger.add(vote);
        }
        ledger
    }

    /// Upsert: never two votes for the same pair.
    pub fn add(&mut self, vote: Vote) {
        let key = VoteKey::new(&vote.participant_name, &vote.date_chunk_id);
        self.votes.insert(key, vote);
    }

    /// No-op when the pair holds no vote.
    pub fn remove(&mut self, participant_name: &str, date_chunk_id: &str) {
        self.votes
            .remove(&VoteKey::new(participant_name, date_chunk_id));
    }

    pub fn has_vote(&self, participant_name: &str, date_chunk_id: &str) -> bool {
        self.votes
            .contains_key(&VoteKey::new(participant_name, date_chunk_id))
    }

    pub fn toggle(
        &mut self,
        participant_name: &str,
        date_chunk_id: &str,
        now: DateTime<Utc>,
    ) -> ToggleOutcome {
        if self.has_vote(participant_name, date_chunk_id) {
            self.remove(participant_name, date_chunk_id);
            ToggleOutcome::Removed
        } else {
            self.add(Vote {
                participant_name: participant_name.to_owned(),
                date_chunk_id: date_chunk_id.to_owned(),
                timestamp: now,
            });
            ToggleOutcome::Added
        }
    }

    pub fn votes_for_chunk(&self, date_chunk_id: &str) -> Vec<&Vote> {
        self.votes
            .values()
            .filter(|vote| vote.date_chunk_id == date_chunk_id)
            .collect()
    }

    pub fn chunks_voted_by(&self, participant_name: &str) -> Vec<String> {
        self.votes
            .values()
            .filter(|vote| vote.participant_name == participant_name)
            .map(|vote| vote.date_chunk_id.clone())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vote> {
        self.votes.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vote(participant_name: &str, date_chunk_id: &str) -> Vote {
        Vote {
            participant_name: participant_name.to_owned(),
            date_chunk_id: date_chunk_id.to_owned(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn add_replaces_the_existing_vote_for_a_pair() {
        let mut ledger = VoteLedger::new();
        let first = vote("Alex", "chunk-2026-08-10");
        let mut second = vote("Alex", "chunk-2026-08-10");
        second.timestamp = first.timestamp + chrono::Duration::seconds(5);

        ledger.add(first);
        ledger.add(second.clone());

        let votes = ledger.votes_for_chunk("chunk-2026-08-10");
        assert_eq!(1, votes.len());
        assert_eq!(second.timestamp, votes[0].timestamp);
    }

    #[test]
    fn remove_of_an_absent_vote_is_a_noop() {
        let mut ledger = VoteLedger::new();
        ledger.remove("Alex", "chunk-2026-08-10");
        assert!(!ledger.has_vote("Alex", "chunk-2026-08-10"));
    }

    #[test]
    fn toggle_twice_returns_to_the_original_state() {
        let mut ledger = VoteLedger::new();

        let first = ledger.toggle("Alex", "chunk-2026-08-10", Utc::now());
        assert_eq!(ToggleOutcome::Added, first);
        assert!(ledger.has_vote("Alex", "chunk-2026-08-10"));

        let second = ledger.toggle("Alex", "chunk-2026-08-10", Utc::now());
        assert_eq!(ToggleOutcome::Removed, second);
        assert!(!ledger.has_vote("Alex", "chunk-2026-08-10"));
    }

    #[test]
    fn a_participant_may_vote_for_many_chunks() {
        let mut ledger = VoteLedger::new();
        ledger.add(vote("Alex", "chunk-2026-08-10"));
        ledger.add(vote("Alex", "chunk-2026-08-12"));
        ledger.add(vote("Bea", "chunk-2026-08-10"));

        let mut chunks = ledger.chunks_voted_by("Alex");
        chunks.sort();
        assert_eq!(vec!["chunk-2026-08-10", "chunk-2026-08-12"], chunks);
        assert_eq!(2, ledger.votes_for_chunk("chunk-2026-08-10").len());
    }

    #[test]
    fn from_votes_keeps_the_last_entry_per_pair() {
        let first = vote("Alex", "chunk-2026-08-10");
        let mut second = vote("Alex", "chunk-2026-08-10");
        second.timestamp = first.timestamp + chrono::Duration::seconds(5);

        let ledger = VoteLedger::from_votes(vec![first, second.clone()]);

        assert_eq!(1, ledger.iter().count());
        assert_eq!(
            second.timestamp,
            ledger.votes_for_chunk("chunk-2026-08-10")[0].timestamp
        );
    }
}
