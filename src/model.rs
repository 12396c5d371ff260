use chrono::{DateTime, NaiveDate, offset::Utc};
use serde::{Deserialize, Serialize};

/// A candidate 4-day date range. The id is derived from the start date's
/// calendar day, so re-adding the same range always reuses the same id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateChunk {
    pub id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// One participant's vote for one chunk. The timestamp records when the
/// vote was last toggled on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub participant_name: String,
    pub date_chunk_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(test, derive(Clone))]
pub struct PostPollRequest {
    pub title: String,
    pub participants: Vec<String>,
    pub chunk_start_dates: Vec<NaiveDate>,
    #[serde(default)]
    pub blocked_dates: Vec<NaiveDate>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(test, derive(Clone))]
pub struct PutPollRequest {
    pub title: String,
    pub participants: Vec<String>,
    pub chunk_start_dates: Vec<NaiveDate>,
    #[serde(default)]
    pub blocked_dates: Vec<NaiveDate>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(test, derive(Clone))]
pub struct ToggleVoteRequest {
    pub participant_name: String,
    pub date_chunk_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkTally {
    pub date_chunk_id: String,
    pub vote_count: usize,
    pub voters: Vec<String>,
}

/// A poll as served to clients: the stored fields plus the votes that
/// reference a currently active chunk, tallied per chunk.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPollResponse {
    pub id: String,
    pub title: String,
    pub participants: Vec<String>,
    pub date_chunks: Vec<DateChunk>,
    pub blocked_dates: Vec<NaiveDate>,
    pub votes: Vec<Vote>,
    pub tallies: Vec<ChunkTally>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSummary {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}
