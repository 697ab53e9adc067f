use chrono::{DateTime, Utc};
use kaiwa_algo::VocabularyWord;
use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::db::DatabaseProxy;

pub async fn select_vocabulary(
    proxy: &DatabaseProxy,
    user_id: &str,
) -> Result<Vec<VocabularyWord>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT "id", "word", "translation", "example", "mastered", "last_reviewed"
        FROM "vocabulary"
        WHERE "user_id" = $1
        ORDER BY "created_at" ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(proxy.pool())
    .await?;

    rows.iter().map(map_vocabulary_row).collect()
}

/// Returns false when a word with the same id already exists for the user.
pub async fn insert_vocabulary(
    proxy: &DatabaseProxy,
    user_id: &str,
    word: &VocabularyWord,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO "vocabulary" (
            "user_id", "id", "word", "translation", "example", "mastered", "last_reviewed"
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT ("user_id", "id") DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(&word.id)
    .bind(&word.word)
    .bind(&word.translation)
    .bind(word.example.as_deref().unwrap_or(""))
    .bind(word.mastered)
    .bind(word.last_studied)
    .execute(proxy.pool())
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn upsert_vocabulary(
    proxy: &DatabaseProxy,
    user_id: &str,
    word: &VocabularyWord,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO "vocabulary" (
            "user_id", "id", "word", "translation", "example", "mastered", "last_reviewed"
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT ("user_id", "id") DO UPDATE SET
            "mastered" = EXCLUDED."mastered",
            "last_reviewed" = EXCLUDED."last_reviewed"
        "#,
    )
    .bind(user_id)
    .bind(&word.id)
    .bind(&word.word)
    .bind(&word.translation)
    .bind(word.example.as_deref().unwrap_or(""))
    .bind(word.mastered)
    .bind(word.last_studied)
    .execute(proxy.pool())
    .await?;

    Ok(())
}

pub async fn delete_vocabulary(
    proxy: &DatabaseProxy,
    user_id: &str,
    word_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(r#"DELETE FROM "vocabulary" WHERE "user_id" = $1 AND "id" = $2"#)
        .bind(user_id)
        .bind(word_id)
        .execute(proxy.pool())
        .await?;

    Ok(result.rows_affected() > 0)
}

fn map_vocabulary_row(row: &PgRow) -> Result<VocabularyWord, sqlx::Error> {
    let example: String = row.try_get("example")?;
    let last_reviewed: Option<DateTime<Utc>> = row.try_get("last_reviewed")?;

    Ok(VocabularyWord {
        id: row.try_get("id")?,
        word: row.try_get("word")?,
        translation: row.try_get("translation")?,
        example: (!example.is_empty()).then_some(example),
        mastered: row.try_get("mastered")?,
        last_studied: last_reviewed,
    })
}
