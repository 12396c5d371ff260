//! The consistency boundary around one poll: validation, edit
//! reconciliation, and vote toggling on top of the poll store.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, offset::Utc};
use itertools::Itertools;
use log::{debug, error, info};
use rand::{distributions::Alphanumeric, thread_rng, Rng};

use crate::dates::{self, SeasonWindow};
use crate::ledger::{ToggleOutcome, VoteLedger};
use crate::model::*;
use crate::store::{PollRecord, PollStore, StoreError};
use crate::util;

#[cfg(test)]
use mockall::automock;

#[derive(Debug, PartialEq, Eq)]
pub enum ValidationError {
    EmptyTitle,
    NoParticipants,
    DuplicateParticipant(String),
    NoDateChunks,
    DuplicateDateChunk(String),
    ChunkOutsideSeason(String),
    ChunkOnBlockedDate(String),
    UnknownParticipant(String),
    UnknownDateChunk(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ValidationError::EmptyTitle => write!(f, "title must not be blank"),
            ValidationError::NoParticipants => {
                write!(f, "at least one participant is required")
            }
            ValidationError::DuplicateParticipant(name) => {
                write!(f, "duplicate participant: {}", name)
            }
            ValidationError::NoDateChunks => write!(f, "at least one date chunk is required"),
            ValidationError::DuplicateDateChunk(id) => {
                write!(f, "duplicate date chunk: {}", id)
            }
            ValidationError::ChunkOutsideSeason(id) => {
                write!(f, "date chunk {} falls outside the allowed season", id)
            }
            ValidationError::ChunkOnBlockedDate(id) => {
                write!(f, "date chunk {} includes a blocked date", id)
            }
            ValidationError::UnknownParticipant(name) => {
                write!(f, "unknown participant: {}", name)
            }
            ValidationError::UnknownDateChunk(id) => write!(f, "unknown date chunk: {}", id),
        }
    }
}

#[derive(Debug)]
pub enum CreatePollError {
    Invalid(ValidationError),
    Conflict,
    Store(StoreError),
}

#[derive(Debug)]
pub enum EditPollError {
    Invalid(ValidationError),
    NotFound,
    Store(StoreError),
}

#[derive(Debug)]
pub enum GetPollError {
    NotFound,
    Store(StoreError),
}

#[derive(Debug)]
pub enum ToggleVoteError {
    Invalid(ValidationError),
    NotFound,
    Store(StoreError),
}

#[derive(Debug)]
pub enum ListPollsError {
    Store(StoreError),
}

fn log_store_error(e: &StoreError) {
    error!("unexpected poll store error: {:?}", e);
}

impl From<StoreError> for CreatePollError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateId(id) => {
                error!("poll id collision on {}", id);
                CreatePollError::Conflict
            }
            other => {
                log_store_error(&other);
                CreatePollError::Store(other)
            }
        }
    }
}

impl From<StoreError> for EditPollError {
    fn from(e: StoreError) -> Self {
        log_store_error(&e);
        EditPollError::Store(e)
    }
}

impl From<StoreError> for GetPollError {
    fn from(e: StoreError) -> Self {
        log_store_error(&e);
        GetPollError::Store(e)
    }
}

impl From<StoreError> for ToggleVoteError {
    fn from(e: StoreError) -> Self {
        log_store_error(&e);
        ToggleVoteError::Store(e)
    }
}

impl From<StoreError> for ListPollsError {
    fn from(e: StoreError) -> Self {
        log_store_error(&e);
        ListPollsError::Store(e)
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait PollOperations {
    async fn create_poll(
        &self,
        request: &PostPollRequest,
    ) -> Result<GetPollResponse, CreatePollError>;
    async fn get_poll(&self, poll_id: &str) -> Result<GetPollResponse, GetPollError>;
    async fn edit_poll(
        &self,
        poll_id: &str,
        request: &PutPollRequest,
    ) -> Result<GetPollResponse, EditPollError>;
    async fn toggle_vote(
        &self,
        poll_id: &str,
        request: &ToggleVoteRequest,
    ) -> Result<GetPollResponse, ToggleVoteError>;
    async fn list_polls(&self) -> Result<Vec<PollSummary>, ListPollsError>;
}

#[derive(Clone)]
pub struct PollOperationsImpl {
    store: Arc<dyn PollStore>,
    season: SeasonWindow,
}

impl PollOperationsImpl {
    pub fn new(store: Arc<dyn PollStore>, season: SeasonWindow) -> PollOperationsImpl {
        PollOperationsImpl { store, season }
    }

    fn validated_chunks(
        &self,
        title: &str,
        participants: &[String],
        chunk_start_dates: &[NaiveDate],
        blocked_dates: &[NaiveDate],
    ) -> Result<Vec<DateChunk>, ValidationError> {
        if util::is_blank(title) {
            return Err(ValidationError::EmptyTitle);
        }
        if participants.is_empty() {
            return Err(ValidationError::NoParticipants);
        }
        if let Some(duplicate) = util::first_duplicate(participants.iter()) {
            return Err(ValidationError::DuplicateParticipant(duplicate.clone()));
        }
        if chunk_start_dates.is_empty() {
            return Err(ValidationError::NoDateChunks);
        }
        if let Some(duplicate) = util::first_duplicate(chunk_start_dates.iter()) {
            return Err(ValidationError::DuplicateDateChunk(dates::chunk_id(
                *duplicate,
            )));
        }

        let chunks: Vec<DateChunk> = chunk_start_dates
            .iter()
            .map(|start| dates::create_chunk(*start))
            .collect();
        for chunk in &chunks {
            if !self.season.is_eligible_start(chunk.start_date) {
                return Err(ValidationError::ChunkOutsideSeason(chunk.id.clone()));
            }
            // Overlap with other selected chunks is allowed on purpose, so
            // voters can compare adjacent ranges; only blocked days reject.
            if dates::conflicts_with_blocked(chunk, blocked_dates) {
                return Err(ValidationError::ChunkOnBlockedDate(chunk.id.clone()));
            }
        }
        Ok(chunks)
    }
}

fn normalized_blocked_dates(blocked_dates: &[NaiveDate]) -> Vec<NaiveDate> {
    let mut days = blocked_dates.to_vec();
    days.sort();
    days.dedup();
    days
}

/// Builds the client view: only votes for currently active chunks count,
/// and the per-chunk tallies are recomputed from them.
fn assemble_response(record: PollRecord, ledger: &VoteLedger) -> GetPollResponse {
    let active_ids: HashSet<&str> = record
        .date_chunks
        .iter()
        .map(|chunk| chunk.id.as_str())
        .collect();
    let active_votes: Vec<Vote> = ledger
        .iter()
        .filter(|vote| active_ids.contains(vote.date_chunk_id.as_str()))
        .cloned()
        .collect();

    let mut votes_by_chunk = active_votes
        .iter()
        .cloned()
        .into_group_map_by(|vote| vote.date_chunk_id.clone());

    let tallies = record
        .date_chunks
        .iter()
        .map(|chunk| {
            let chunk_votes = votes_by_chunk.remove(chunk.id.as_str()).unwrap_or_default();
            let mut voters: Vec<String> = chunk_votes
                .into_iter()
                .map(|vote| vote.participant_name)
                .collect();
            voters.sort();
            ChunkTally {
                date_chunk_id: chunk.id.clone(),
                vote_count: voters.len(),
                voters,
            }
        })
        .collect();

    GetPollResponse {
        id: record.id,
        title: record.title,
        participants: record.participants,
        date_chunks: record.date_chunks,
        blocked_dates: record.blocked_dates,
        votes: active_votes,
        tallies,
        created_at: record.created_at,
    }
}

#[async_trait]
impl PollOperations for PollOperationsImpl {
    async fn create_poll(
        &self,
        request: &PostPollRequest,
    ) -> Result<GetPollResponse, CreatePollError> {
        let chunks = self
            .validated_chunks(
                &request.title,
                &request.participants,
                &request.chunk_start_dates,
                &request.blocked_dates,
            )
            .map_err(CreatePollError::Invalid)?;

        let poll_id: String = thread_rng().sample_iter(&Alphanumeric).take(10).collect();
        let record = PollRecord {
            id: poll_id,
            title: request.title.clone(),
            participants: request.participants.clone(),
            date_chunks: chunks,
            blocked_dates: normalized_blocked_dates(&request.blocked_dates),
            created_at: Utc::now(),
        };

        self.store.insert_poll(&record).await?;
        info!(
            "created poll {} with {} date chunks",
            record.id,
            record.date_chunks.len()
        );

        Ok(assemble_response(record, &VoteLedger::new()))
    }

    async fn get_poll(&self, poll_id: &str) -> Result<GetPollResponse, GetPollError> {
        let record = self
            .store
            .get_poll_record(poll_id)
            .await?
            .ok_or(GetPollError::NotFound)?;
        let ledger = VoteLedger::from_votes(self.store.list_votes(poll_id).await?);
        Ok(assemble_response(record, &ledger))
    }

    async fn edit_poll(
        &self,
        poll_id: &str,
        request: &PutPollRequest,
    ) -> Result<GetPollResponse, EditPollError> {
        let chunks = self
            .validated_chunks(
                &request.title,
                &request.participants,
                &request.chunk_start_dates,
                &request.blocked_dates,
            )
            .map_err(EditPollError::Invalid)?;
        let blocked_dates = normalized_blocked_dates(&request.blocked_dates);

        // Votes are left untouched: any that reference a chunk dropped here
        // turn inert, and come back if the same start date is re-added.
        let record = self
            .store
            .replace_poll_fields(
                poll_id,
                &request.title,
                &request.participants,
                &chunks,
                &blocked_dates,
            )
            .await?
            .ok_or(EditPollError::NotFound)?;
        info!("edited poll {}", poll_id);

        let ledger = VoteLedger::from_votes(self.store.list_votes(poll_id).await?);
        Ok(assemble_response(record, &ledger))
    }

    async fn toggle_vote(
        &self,
        poll_id: &str,
        request: &ToggleVoteRequest,
    ) -> Result<GetPollResponse, ToggleVoteError> {
        // One snapshot of the record backs both existence checks, so a
        // concurrent edit cannot be half-observed.
        let record = self
            .store
            .get_poll_record(poll_id)
            .await?
            .ok_or(ToggleVoteError::NotFound)?;

        if !record
            .participants
            .iter()
            .any(|name| name == &request.participant_name)
        {
            return Err(ToggleVoteError::Invalid(ValidationError::UnknownParticipant(
                request.participant_name.clone(),
            )));
        }
        if !record
            .date_chunks
            .iter()
            .any(|chunk| chunk.id == request.date_chunk_id)
        {
            return Err(ToggleVoteError::Invalid(ValidationError::UnknownDateChunk(
                request.date_chunk_id.clone(),
            )));
        }

        let mut ledger = VoteLedger::from_votes(self.store.list_votes(poll_id).await?);
        let now = Utc::now();
        match ledger.toggle(&request.participant_name, &request.date_chunk_id, now) {
            ToggleOutcome::Added => {
                let vote = Vote {
                    participant_name: request.participant_name.clone(),
                    date_chunk_id: request.date_chunk_id.clone(),
                    timestamp: now,
                };
                self.store.upsert_vote(poll_id, &vote).await?;
                info!(
                    "added vote by {} on {} in poll {}",
                    request.participant_name, request.date_chunk_id, poll_id
                );
            }
            ToggleOutcome::Removed => {
                self.store
                    .delete_vote(poll_id, &request.participant_name, &request.date_chunk_id)
                    .await?;
                info!(
                    "removed vote by {} on {} in poll {}",
                    request.participant_name, request.date_chunk_id, poll_id
                );
            }
        }
        debug!(
            "{} now holds {} votes in poll {}",
            request.participant_name,
            ledger.chunks_voted_by(&request.participant_name).len(),
            poll_id
        );

        Ok(assemble_response(record, &ledger))
    }

    async fn list_polls(&self) -> Result<Vec<PollSummary>, ListPollsError> {
        Ok(self.store.list_polls().await?)
    }
}
