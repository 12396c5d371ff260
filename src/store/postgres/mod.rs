use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, offset::Utc};
use sqlx::PgPool;

use super::{PollRecord, PollStore, StoreError};
use crate::model::{DateChunk, PollSummary, Vote};

mod transaction;

use transaction::PgStoreTransaction;

#[derive(sqlx::FromRow, Debug)]
pub(crate) struct PollRow {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct PgPollStore {
    pool: PgPool,
}

const SCHEMA: &[&str] = &[
    "create table if not exists poll( \
        id text primary key, \
        title text not null, \
        created_at timestamptz not null)",
    "create table if not exists participant( \
        poll_id text not null references poll(id) on delete cascade, \
        name text not null, \
        primary key (poll_id, name))",
    "create table if not exists date_chunk( \
        poll_id text not null references poll(id) on delete cascade, \
        id text not null, \
        start_date date not null, \
        end_date date not null, \
        primary key (poll_id, id))",
    "create table if not exists blocked_date( \
        poll_id text not null references poll(id) on delete cascade, \
        day date not null, \
        primary key (poll_id, day))",
    "create table if not exists vote( \
        poll_id text not null references poll(id) on delete cascade, \
        participant_name text not null, \
        date_chunk_id text not null, \
        timestamp timestamptz not null, \
        primary key (poll_id, participant_name, date_chunk_id))",
];

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .and_then(|de| de.code())
        .map(|code| code == "23505")
        .unwrap_or(false)
}

impl PgPollStore {
    pub fn new(pool: PgPool) -> PgPollStore {
        PgPollStore { pool }
    }

    /// Idempotent schema bootstrap, run once at startup.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl PollStore for PgPollStore {
    async fn insert_poll(&self, record: &PollRecord) -> Result<(), StoreError> {
        let mut tx = PgStoreTransaction::new(&self.pool).await?;
        tx.insert_poll_row(&record.id, &record.title, record.created_at)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::DuplicateId(record.id.clone())
                } else {
                    StoreError::Sql(e)
                }
            })?;
        tx.insert_poll_children(
            &record.id,
            &record.participants,
            &record.date_chunks,
            &record.blocked_dates,
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_poll_record(&self, poll_id: &str) -> Result<Option<PollRecord>, StoreError> {
        let mut tx = PgStoreTransaction::new(&self.pool).await?;
        let poll = match tx.select_poll_row(poll_id).await? {
            None => return Ok(None),
            Some(poll) => poll,
        };
        let participants = tx.select_participants(poll_id).await?;
        let date_chunks = tx.select_chunks(poll_id).await?;
        let blocked_dates = tx.select_blocked_dates(poll_id).await?;
        Ok(Some(PollRecord {
            id: poll.id,
            title: poll.title,
            participants,
            date_chunks,
            blocked_dates,
            created_at: poll.created_at,
        }))
    }

    async fn replace_poll_fields(
        &self,
        poll_id: &str,
        title: &str,
        participants: &[String],
        date_chunks: &[DateChunk],
        blocked_dates: &[NaiveDate],
    ) -> Result<Option<PollRecord>, StoreError> {
        let mut tx = PgStoreTransaction::new(&self.pool).await?;
        if tx.update_poll_title(poll_id, title).await? == 0 {
            return Ok(None);
        }
        tx.delete_poll_children(poll_id).await?;
        tx.insert_poll_children(poll_id, participants, date_chunks, blocked_dates)
            .await?;
        let poll = tx.select_poll_row(poll_id).await?;
        tx.commit().await?;
        Ok(poll.map(|poll| PollRecord {
            id: poll.id,
            title: poll.title,
            participants: participants.to_vec(),
            date_chunks: date_chunks.to_vec(),
            blocked_dates: blocked_dates.to_vec(),
            created_at: poll.created_at,
        }))
    }

    async fn upsert_vote(&self, poll_id: &str, vote: &Vote) -> Result<(), StoreError> {
        sqlx::query(
            "insert into vote(poll_id, participant_name, date_chunk_id, timestamp) \
                values ($1, $2, $3, $4) \
                on conflict (poll_id, participant_name, date_chunk_id) \
                do update set timestamp = excluded.timestamp",
        )
        .bind(poll_id)
        .bind(&vote.participant_name)
        .bind(&vote.date_chunk_id)
        .bind(vote.timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_vote(
        &self,
        poll_id: &str,
        participant_name: &str,
        date_chunk_id: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "delete from vote \
                where poll_id = $1 and participant_name = $2 and date_chunk_id = $3",
        )
        .bind(poll_id)
        .bind(participant_name)
        .bind(date_chunk_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_votes(&self, poll_id: &str) -> Result<Vec<Vote>, StoreError> {
        let rows: Vec<(String, String, DateTime<Utc>)> = sqlx::query_as(
            "select participant_name, date_chunk_id, timestamp from vote where poll_id = $1",
        )
        .bind(poll_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(participant_name, date_chunk_id, timestamp)| Vote {
                participant_name,
                date_chunk_id,
                timestamp,
            })
            .collect())
    }

    async fn list_polls(&self) -> Result<Vec<PollSummary>, StoreError> {
        let rows: Vec<(String, String, DateTime<Utc>)> =
            sqlx::query_as("select id, title, created_at from poll order by created_at desc")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows
            .into_iter()
            .map(|(id, title, created_at)| PollSummary {
                id,
                title,
                created_at,
            })
            .collect())
    }
}
