use chrono::{DateTime, Utc};
use kaiwa_algo::{CorrectionRecord, Role};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::Row;

use crate::db::DatabaseProxy;

/// One persisted chat message as shown in the transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
    #[serde(default)]
    pub corrections: Vec<CorrectionRecord>,
    #[serde(default)]
    pub fallback: bool,
    pub created_at: DateTime<Utc>,
}

impl MessageRecord {
    pub fn new(role: Role, content: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            translation: None,
            corrections: Vec::new(),
            fallback: false,
            created_at,
        }
    }
}

/// Corrections go into a nullable JSONB column; an empty list is stored as NULL.
fn corrections_column(message: &MessageRecord) -> Option<Json<&[CorrectionRecord]>> {
    (!message.corrections.is_empty()).then(|| Json(message.corrections.as_slice()))
}

pub async fn insert_messages(
    proxy: &DatabaseProxy,
    user_id: &str,
    messages: &[MessageRecord],
) -> Result<(), sqlx::Error> {
    if messages.is_empty() {
        return Ok(());
    }

    let mut tx = proxy.pool().begin().await?;
    for message in messages {
        sqlx::query(
            r#"
            INSERT INTO "user_messages" (
                "id", "user_id", "content", "type", "translation", "correction",
                "fallback", "created_at"
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT ("id") DO NOTHING
            "#,
        )
        .bind(&message.id)
        .bind(user_id)
        .bind(&message.content)
        .bind(message.role.as_str())
        .bind(message.translation.as_deref())
        .bind(corrections_column(message))
        .bind(message.fallback)
        .bind(message.created_at)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    Ok(())
}

/// The most recent `limit` messages, oldest first.
pub async fn select_recent_messages(
    proxy: &DatabaseProxy,
    user_id: &str,
    limit: i64,
) -> Result<Vec<MessageRecord>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT * FROM (
            SELECT "id", "content", "type", "translation", "correction", "fallback", "created_at"
            FROM "user_messages"
            WHERE "user_id" = $1
            ORDER BY "created_at" DESC
            LIMIT $2
        ) recent
        ORDER BY "created_at" ASC
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(proxy.pool())
    .await?;

    rows.iter().map(map_message_row).collect()
}

fn map_message_row(row: &PgRow) -> Result<MessageRecord, sqlx::Error> {
    let role_raw: String = row.try_get("type")?;
    let role = Role::parse(&role_raw).ok_or_else(|| sqlx::Error::ColumnDecode {
        index: "type".to_string(),
        source: format!("unknown message role: {role_raw}").into(),
    })?;
    let corrections: Option<serde_json::Value> = row.try_get("correction")?;
    let corrections = corrections
        .and_then(|value| serde_json::from_value::<Vec<CorrectionRecord>>(value).ok())
        .unwrap_or_default();

    Ok(MessageRecord {
        id: row.try_get("id")?,
        role,
        content: row.try_get("content")?,
        translation: row.try_get("translation")?,
        corrections,
        fallback: row.try_get("fallback")?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrections_column_is_null_when_empty() {
        let message = MessageRecord::new(Role::User, "hello", Utc::now());
        assert!(corrections_column(&message).is_none());
    }

    #[test]
    fn test_corrections_column_encodes_list() {
        let mut message = MessageRecord::new(Role::Assistant, "Hi!", Utc::now());
        message.corrections.push(CorrectionRecord {
            original: "I goed".to_string(),
            corrected: "I went".to_string(),
            explanation: "past tense".to_string(),
        });

        let Json(corrections) = corrections_column(&message).unwrap();
        let value = serde_json::to_value(corrections).unwrap();
        assert_eq!(value[0]["corrected"], "I went");
        assert_eq!(value.as_array().map(Vec::len), Some(1));
    }
}
