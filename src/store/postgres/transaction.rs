use chrono::{DateTime, NaiveDate, offset::Utc};
use sqlx::{postgres::PgDone, Done, PgPool, Postgres, Transaction};

use super::PollRow;
use crate::model::DateChunk;

pub struct PgStoreTransaction<'a> {
    tx: Transaction<'a, Postgres>,
}

impl<'a> PgStoreTransaction<'a> {
    pub async fn new(pool: &'a PgPool) -> Result<PgStoreTransaction<'a>, sqlx::Error> {
        Ok(PgStoreTransaction {
            tx: pool.begin().await?,
        })
    }

    pub async fn select_poll_row(&mut self, poll_id: &str) -> Result<Option<PollRow>, sqlx::Error> {
        sqlx::query_as::<_, PollRow>("select id, title, created_at from poll where id = $1")
            .bind(poll_id)
            .fetch_optional(&mut self.tx)
            .await
    }

    pub async fn insert_poll_row(
        &mut self,
        poll_id: &str,
        title: &str,
        created_at: DateTime<Utc>,
    ) -> Result<PgDone, sqlx::Error> {
        sqlx::query("insert into poll(id, title, created_at) values ($1, $2, $3)")
            .bind(poll_id)
            .bind(title)
            .bind(created_at)
            .execute(&mut self.tx)
            .await
    }

    pub async fn update_poll_title(
        &mut self,
        poll_id: &str,
        title: &str,
    ) -> Result<u64, sqlx::Error> {
        let done = sqlx::query("update poll set title = $1 where id = $2")
            .bind(title)
            .bind(poll_id)
            .execute(&mut self.tx)
            .await?;
        Ok(done.rows_affected())
    }

    pub async fn select_participants(
        &mut self,
        poll_id: &str,
    ) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> =
            sqlx::query_as("select name from participant where poll_id = $1")
                .bind(poll_id)
                .fetch_all(&mut self.tx)
                .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    pub async fn select_chunks(&mut self, poll_id: &str) -> Result<Vec<DateChunk>, sqlx::Error> {
        let rows: Vec<(String, NaiveDate, NaiveDate)> = sqlx::query_as(
            "select id, start_date, end_date from date_chunk \
                where poll_id = $1 order by start_date",
        )
        .bind(poll_id)
        .fetch_all(&mut self.tx)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(id, start_date, end_date)| DateChunk {
                id,
                start_date,
                end_date,
            })
            .collect())
    }

    pub async fn select_blocked_dates(
        &mut self,
        poll_id: &str,
    ) -> Result<Vec<NaiveDate>, sqlx::Error> {
        let rows: Vec<(NaiveDate,)> =
            sqlx::query_as("select day from blocked_date where poll_id = $1 order by day")
                .bind(poll_id)
                .fetch_all(&mut self.tx)
                .await?;
        Ok(rows.into_iter().map(|(day,)| day).collect())
    }

    pub async fn insert_poll_children(
        &mut self,
        poll_id: &str,
        participants: &[String],
        date_chunks: &[DateChunk],
        blocked_dates: &[NaiveDate],
    ) -> Result<(), sqlx::Error> {
        for name in participants {
            sqlx::query("insert into participant(poll_id, name) values ($1, $2)")
                .bind(poll_id)
                .bind(name)
                .execute(&mut self.tx)
                .await?;
        }
        for chunk in date_chunks {
            sqlx::query(
                "insert into date_chunk(poll_id, id, start_date, end_date) \
                    values ($1, $2, $3, $4)",
            )
            .bind(poll_id)
            .bind(&chunk.id)
            .bind(chunk.start_date)
            .bind(chunk.end_date)
            .execute(&mut self.tx)
            .await?;
        }
        for day in blocked_dates {
            sqlx::query("insert into blocked_date(poll_id, day) values ($1, $2)")
                .bind(poll_id)
                .bind(*day)
                .execute(&mut self.tx)
                .await?;
        }
        Ok(())
    }

    pub async fn delete_poll_children(&mut self, poll_id: &str) -> Result<(), sqlx::Error> {
        for statement in &[
            "delete from participant where poll_id = $1",
            "delete from date_chunk where poll_id = $1",
            "delete from blocked_date where poll_id = $1",
        ] {
            sqlx::query(statement)
                .bind(poll_id)
                .execute(&mut self.tx)
                .await?;
        }
        Ok(())
    }

    pub async fn commit(self) -> Result<(), sqlx::Error> {
        self.tx.commit().await
    }
}
