//! Persistence seam for per-account practice data.
//!
//! `PgStore` is used when `DATABASE_URL` is configured; `MemoryStore` keeps
//! everything in process and backs tests and local runs without Postgres.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use kaiwa_algo::{ProgressCounters, VocabularyWord};
use parking_lot::RwLock;
use thiserror::Error;

use crate::db::operations::{self, MessageRecord};
use crate::db::{DatabaseProxy, HealthCheckSnapshot};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait PracticeStore: Send + Sync {
    /// Short name reported by health and capability endpoints
    fn kind(&self) -> &'static str;

    async fn health(&self) -> Option<HealthCheckSnapshot> {
        None
    }

    async fn get_progress(&self, user_id: &str) -> Result<Option<ProgressCounters>, StoreError>;

    /// Create a zeroed record. Returns false if one already existed.
    async fn init_progress(&self, user_id: &str) -> Result<bool, StoreError>;

    async fn upsert_progress(
        &self,
        user_id: &str,
        counters: &ProgressCounters,
        level: u32,
    ) -> Result<(), StoreError>;

    async fn list_vocabulary(&self, user_id: &str) -> Result<Vec<VocabularyWord>, StoreError>;

    /// Returns false when the id is already taken for this user.
    async fn insert_vocabulary(
        &self,
        user_id: &str,
        word: &VocabularyWord,
    ) -> Result<bool, StoreError>;

    async fn upsert_vocabulary(&self, user_id: &str, word: &VocabularyWord)
        -> Result<(), StoreError>;

    async fn delete_vocabulary(&self, user_id: &str, word_id: &str) -> Result<bool, StoreError>;

    async fn append_messages(
        &self,
        user_id: &str,
        messages: &[MessageRecord],
    ) -> Result<(), StoreError>;

    /// The most recent `limit` messages, oldest first.
    async fn list_messages(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<MessageRecord>, StoreError>;
}

pub struct PgStore {
    proxy: Arc<DatabaseProxy>,
}

impl PgStore {
    pub fn new(proxy: Arc<DatabaseProxy>) -> Self {
        Self { proxy }
    }
}

#[async_trait]
impl PracticeStore for PgStore {
    fn kind(&self) -> &'static str {
        "postgres"
    }

    async fn health(&self) -> Option<HealthCheckSnapshot> {
        Some(self.proxy.health_status().await)
    }

    async fn get_progress(&self, user_id: &str) -> Result<Option<ProgressCounters>, StoreError> {
        Ok(operations::select_progress(&self.proxy, user_id).await?)
    }

    async fn init_progress(&self, user_id: &str) -> Result<bool, StoreError> {
        Ok(operations::insert_progress_if_absent(&self.proxy, user_id).await?)
    }

    async fn upsert_progress(
        &self,
        user_id: &str,
        counters: &ProgressCounters,
        level: u32,
    ) -> Result<(), StoreError> {
        Ok(operations::upsert_progress(&self.proxy, user_id, counters, level).await?)
    }

    async fn list_vocabulary(&self, user_id: &str) -> Result<Vec<VocabularyWord>, StoreError> {
        Ok(operations::select_vocabulary(&self.proxy, user_id).await?)
    }

    async fn insert_vocabulary(
        &self,
        user_id: &str,
        word: &VocabularyWord,
    ) -> Result<bool, StoreError> {
        Ok(operations::insert_vocabulary(&self.proxy, user_id, word).await?)
    }

    async fn upsert_vocabulary(
        &self,
        user_id: &str,
        word: &VocabularyWord,
    ) -> Result<(), StoreError> {
        Ok(operations::upsert_vocabulary(&self.proxy, user_id, word).await?)
    }

    async fn delete_vocabulary(&self, user_id: &str, word_id: &str) -> Result<bool, StoreError> {
        Ok(operations::delete_vocabulary(&self.proxy, user_id, word_id).await?)
    }

    async fn append_messages(
        &self,
        user_id: &str,
        messages: &[MessageRecord],
    ) -> Result<(), StoreError> {
        Ok(operations::insert_messages(&self.proxy, user_id, messages).await?)
    }

    async fn list_messages(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<MessageRecord>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        Ok(operations::select_recent_messages(&self.proxy, user_id, limit).await?)
    }
}

#[derive(Debug, Default, Clone)]
struct AccountData {
    progress: Option<(ProgressCounters, u32)>,
    vocabulary: Vec<VocabularyWord>,
    messages: Vec<MessageRecord>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    accounts: RwLock<HashMap<String, AccountData>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Level last written alongside the counters
    pub fn stored_level(&self, user_id: &str) -> Option<u32> {
        self.accounts
            .read()
            .get(user_id)
            .and_then(|data| data.progress.as_ref().map(|(_, level)| *level))
    }
}

#[async_trait]
impl PracticeStore for MemoryStore {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn get_progress(&self, user_id: &str) -> Result<Option<ProgressCounters>, StoreError> {
        Ok(self
            .accounts
            .read()
            .get(user_id)
            .and_then(|data| data.progress.as_ref().map(|(counters, _)| counters.clone())))
    }

    async fn init_progress(&self, user_id: &str) -> Result<bool, StoreError> {
        let mut accounts = self.accounts.write();
        let data = accounts.entry(user_id.to_string()).or_default();
        if data.progress.is_some() {
            return Ok(false);
        }
        data.progress = Some((ProgressCounters::default(), 1));
        Ok(true)
    }

    async fn upsert_progress(
        &self,
        user_id: &str,
        counters: &ProgressCounters,
        level: u32,
    ) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write();
        accounts.entry(user_id.to_string()).or_default().progress =
            Some((counters.clone(), level));
        Ok(())
    }

    async fn list_vocabulary(&self, user_id: &str) -> Result<Vec<VocabularyWord>, StoreError> {
        Ok(self
            .accounts
            .read()
            .get(user_id)
            .map(|data| data.vocabulary.clone())
            .unwrap_or_default())
    }

    async fn insert_vocabulary(
        &self,
        user_id: &str,
        word: &VocabularyWord,
    ) -> Result<bool, StoreError> {
        let mut accounts = self.accounts.write();
        let data = accounts.entry(user_id.to_string()).or_default();
        if data.vocabulary.iter().any(|w| w.id == word.id) {
            return Ok(false);
        }
        data.vocabulary.push(word.clone());
        Ok(true)
    }

    async fn upsert_vocabulary(
        &self,
        user_id: &str,
        word: &VocabularyWord,
    ) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write();
        let data = accounts.entry(user_id.to_string()).or_default();
        match data.vocabulary.iter_mut().find(|w| w.id == word.id) {
            Some(existing) => {
                existing.mastered = word.mastered;
                existing.last_studied = word.last_studied;
            }
            None => data.vocabulary.push(word.clone()),
        }
        Ok(())
    }

    async fn delete_vocabulary(&self, user_id: &str, word_id: &str) -> Result<bool, StoreError> {
        let mut accounts = self.accounts.write();
        let Some(data) = accounts.get_mut(user_id) else {
            return Ok(false);
        };
        let before = data.vocabulary.len();
        data.vocabulary.retain(|w| w.id != word_id);
        Ok(data.vocabulary.len() != before)
    }

    async fn append_messages(
        &self,
        user_id: &str,
        messages: &[MessageRecord],
    ) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write();
        let data = accounts.entry(user_id.to_string()).or_default();
        for message in messages {
            if !data.messages.iter().any(|m| m.id == message.id) {
                data.messages.push(message.clone());
            }
        }
        Ok(())
    }

    async fn list_messages(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<MessageRecord>, StoreError> {
        let accounts = self.accounts.read();
        let Some(data) = accounts.get(user_id) else {
            return Ok(Vec::new());
        };
        let start = data.messages.len().saturating_sub(limit);
        Ok(data.messages[start..].to_vec())
    }
}
