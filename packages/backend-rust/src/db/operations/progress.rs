use chrono::{DateTime, Utc};
use kaiwa_algo::ProgressCounters;
use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::db::DatabaseProxy;

pub async fn select_progress(
    proxy: &DatabaseProxy,
    user_id: &str,
) -> Result<Option<ProgressCounters>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT "total_messages", "correct_sentences", "vocabulary_learned",
               "last_practiced", "streak", "experience"
        FROM "user_progress"
        WHERE "user_id" = $1
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(proxy.pool())
    .await?;

    row.map(|r| map_progress_row(&r)).transpose()
}

/// Create a zeroed progress row. Returns false when the row already existed.
pub async fn insert_progress_if_absent(
    proxy: &DatabaseProxy,
    user_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO "user_progress" ("user_id", "streak", "level", "experience")
        VALUES ($1, 0, 1, 0)
        ON CONFLICT ("user_id") DO NOTHING
        "#,
    )
    .bind(user_id)
    .execute(proxy.pool())
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn upsert_progress(
    proxy: &DatabaseProxy,
    user_id: &str,
    counters: &ProgressCounters,
    level: u32,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO "user_progress" (
            "user_id", "total_messages", "correct_sentences", "vocabulary_learned",
            "last_practiced", "streak", "level", "experience", "updated_at"
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
        ON CONFLICT ("user_id") DO UPDATE SET
            "total_messages" = EXCLUDED."total_messages",
            "correct_sentences" = EXCLUDED."correct_sentences",
            "vocabulary_learned" = EXCLUDED."vocabulary_learned",
            "last_practiced" = EXCLUDED."last_practiced",
            "streak" = EXCLUDED."streak",
            "level" = EXCLUDED."level",
            "experience" = EXCLUDED."experience",
            "updated_at" = NOW()
        "#,
    )
    .bind(user_id)
    .bind(to_db_count(counters.total_turns))
    .bind(to_db_count(counters.corrected_turns))
    .bind(to_db_count(counters.vocabulary_learned))
    .bind(counters.last_practiced)
    .bind(counters.streak as i32)
    .bind(level as i32)
    .bind(to_db_count(counters.experience))
    .execute(proxy.pool())
    .await?;

    Ok(())
}

fn map_progress_row(row: &PgRow) -> Result<ProgressCounters, sqlx::Error> {
    let total: i64 = row.try_get("total_messages")?;
    let corrected: i64 = row.try_get("correct_sentences")?;
    let learned: i64 = row.try_get("vocabulary_learned")?;
    let last_practiced: Option<DateTime<Utc>> = row.try_get("last_practiced")?;
    let streak: i32 = row.try_get("streak")?;
    let experience: i64 = row.try_get("experience")?;

    Ok(ProgressCounters {
        total_turns: from_db_count(total),
        corrected_turns: from_db_count(corrected),
        vocabulary_learned: from_db_count(learned),
        last_practiced,
        streak: streak.max(0) as u32,
        experience: from_db_count(experience),
    })
}

fn to_db_count(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn from_db_count(value: i64) -> u64 {
    value.max(0) as u64
}
