//! Per-account in-memory state.
//!
//! Each account gets one `AccountWorkspace` holding its conversation
//! session, progress, settings and any running study deck. Access goes
//! through an async mutex per account; a request that finds the workspace
//! already locked is rejected instead of queued.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use kaiwa_algo::{Difficulty, ProgressCounters, ProgressState, StudyDeck};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::config::SessionConfig;
use crate::db::store::{PracticeStore, StoreError};
use crate::services::conversation::ConversationSession;
use crate::services::generator::TextGenerator;

/// Conversation preferences chosen in the settings dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub difficulty: Difficulty,
    pub auto_speak: bool,
    pub show_translation: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Beginner,
            auto_speak: true,
            show_translation: true,
        }
    }
}

pub struct AccountWorkspace {
    pub account_id: String,
    pub session: ConversationSession,
    pub progress: ProgressState,
    pub settings: Settings,
    pub deck: Option<StudyDeck>,
}

impl AccountWorkspace {
    /// Apply new settings, forwarding a difficulty change to the session.
    pub fn apply_settings(&mut self, settings: Settings) {
        self.session.update_difficulty(settings.difficulty);
        self.settings = settings;
    }
}

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("another request for this account is in progress")]
    Busy,
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type WorkspaceGuard = OwnedMutexGuard<AccountWorkspace>;

struct Slot {
    workspace: Arc<AsyncMutex<AccountWorkspace>>,
    last_used: Instant,
}

pub struct WorkspaceRegistry {
    workspaces: Mutex<HashMap<String, Slot>>,
    store: Arc<dyn PracticeStore>,
    generator: Arc<dyn TextGenerator>,
    config: SessionConfig,
}

impl WorkspaceRegistry {
    pub fn new(
        store: Arc<dyn PracticeStore>,
        generator: Arc<dyn TextGenerator>,
        config: SessionConfig,
    ) -> Self {
        Self {
            workspaces: Mutex::new(HashMap::new()),
            store,
            generator,
            config,
        }
    }

    pub fn len(&self) -> usize {
        self.workspaces.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.workspaces.lock().is_empty()
    }

    /// Lock the account's workspace, creating it from the store on first use.
    pub async fn acquire(&self, account_id: &str) -> Result<WorkspaceGuard, WorkspaceError> {
        let existing = self.touch(account_id);
        let workspace = match existing {
            Some(workspace) => workspace,
            None => {
                let loaded = self.load(account_id).await?;
                let mut workspaces = self.workspaces.lock();
                let slot = workspaces
                    .entry(account_id.to_string())
                    .or_insert_with(|| Slot {
                        workspace: Arc::new(AsyncMutex::new(loaded)),
                        last_used: Instant::now(),
                    });
                slot.last_used = Instant::now();
                Arc::clone(&slot.workspace)
            }
        };

        workspace.try_lock_owned().map_err(|_| WorkspaceError::Busy)
    }

    /// Drop workspaces unused for at least `idle` that nobody holds. The next
    /// `acquire` for an evicted account reloads it from the store; session
    /// history, settings and any running deck are lost. Returns how many
    /// were dropped.
    pub fn evict_idle(&self, idle: Duration) -> usize {
        let mut workspaces = self.workspaces.lock();
        let before = workspaces.len();
        // the map owns one reference; a held guard or an in-flight acquire owns another
        workspaces.retain(|_, slot| {
            slot.last_used.elapsed() < idle || Arc::strong_count(&slot.workspace) > 1
        });
        before - workspaces.len()
    }

    /// Sweep idle workspaces every `idle / 2` for the life of the process.
    pub fn start_eviction(self: &Arc<Self>) {
        let idle = self.config.workspace_idle_ttl;
        let period = (idle / 2).max(Duration::from_secs(1));
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let evicted = registry.evict_idle(idle);
                if evicted > 0 {
                    tracing::debug!(
                        evicted,
                        remaining = registry.len(),
                        "idle workspaces evicted"
                    );
                }
            }
        });
    }

    fn touch(&self, account_id: &str) -> Option<Arc<AsyncMutex<AccountWorkspace>>> {
        let mut workspaces = self.workspaces.lock();
        let slot = workspaces.get_mut(account_id)?;
        slot.last_used = Instant::now();
        Some(Arc::clone(&slot.workspace))
    }

    async fn load(&self, account_id: &str) -> Result<AccountWorkspace, WorkspaceError> {
        let counters = match self.store.get_progress(account_id).await? {
            Some(counters) => counters,
            None => {
                let counters = ProgressCounters::default();
                if let Err(err) = self.store.upsert_progress(account_id, &counters, 1).await {
                    tracing::warn!(error = %err, account_id, "failed to seed progress record");
                }
                counters
            }
        };
        let words = self.store.list_vocabulary(account_id).await?;
        let progress = ProgressState::restore(counters, words);

        tracing::debug!(
            account_id,
            level = progress.level(),
            known = progress.known_vocabulary().len(),
            study = progress.study_vocabulary().len(),
            "account workspace created"
        );

        let settings = Settings::default();
        Ok(AccountWorkspace {
            account_id: account_id.to_string(),
            session: ConversationSession::new(
                settings.difficulty,
                Arc::clone(&self.generator),
                &self.config,
            ),
            progress,
            settings,
            deck: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::MemoryStore;
    use crate::services::generator::GenerationRequest;
    use crate::services::llm_provider::LLMError;
    use async_trait::async_trait;
    use kaiwa_algo::VocabularyWord;

    struct Offline;

    #[async_trait]
    impl TextGenerator for Offline {
        async fn generate(&self, _request: &GenerationRequest) -> Result<String, LLMError> {
            Err(LLMError::NotConfigured("LLM_API_KEY"))
        }
    }

    fn registry(store: Arc<MemoryStore>) -> WorkspaceRegistry {
        WorkspaceRegistry::new(store, Arc::new(Offline), SessionConfig::default())
    }

    #[tokio::test]
    async fn test_first_acquire_seeds_progress() {
        let store = Arc::new(MemoryStore::new());
        let registry = registry(store.clone());

        let workspace = registry.acquire("acct").await.unwrap();
        assert_eq!(workspace.progress.level(), 1);
        assert_eq!(workspace.settings, Settings::default());
        assert_eq!(store.stored_level("acct"), Some(1));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_restores_vocabulary_partition() {
        let store = Arc::new(MemoryStore::new());
        let mut known = VocabularyWord::new("k", "known", "既知", None);
        known.mastered = true;
        store.upsert_vocabulary("acct", &known).await.unwrap();
        store
            .upsert_vocabulary("acct", &VocabularyWord::new("s", "study", "学習", None))
            .await
            .unwrap();

        let registry = registry(store);
        let workspace = registry.acquire("acct").await.unwrap();
        assert_eq!(workspace.progress.known_vocabulary()[0].id, "k");
        assert_eq!(workspace.progress.study_vocabulary()[0].id, "s");
    }

    #[tokio::test]
    async fn test_concurrent_acquire_is_rejected() {
        let registry = registry(Arc::new(MemoryStore::new()));

        let held = registry.acquire("acct").await.unwrap();
        assert!(matches!(
            registry.acquire("acct").await,
            Err(WorkspaceError::Busy)
        ));
        // other accounts are independent
        assert!(registry.acquire("other").await.is_ok());

        drop(held);
        assert!(registry.acquire("acct").await.is_ok());
    }

    #[tokio::test]
    async fn test_evict_idle_skips_held_workspaces() {
        let store = Arc::new(MemoryStore::new());
        let registry = registry(store.clone());

        let held = registry.acquire("busy").await.unwrap();
        drop(registry.acquire("idle").await.unwrap());
        assert_eq!(registry.len(), 2);

        assert_eq!(registry.evict_idle(Duration::from_secs(3600)), 0);
        assert_eq!(registry.evict_idle(Duration::ZERO), 1);
        assert_eq!(registry.len(), 1);

        drop(held);
        assert_eq!(registry.evict_idle(Duration::ZERO), 1);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_evicted_workspace_reloads_from_store() {
        let store = Arc::new(MemoryStore::new());
        let registry = registry(store.clone());

        {
            let mut workspace = registry.acquire("acct").await.unwrap();
            workspace.progress.record_turn(0, chrono::Utc::now());
            store
                .upsert_progress(
                    "acct",
                    workspace.progress.counters(),
                    workspace.progress.level(),
                )
                .await
                .unwrap();
        }
        assert_eq!(registry.evict_idle(Duration::ZERO), 1);

        let workspace = registry.acquire("acct").await.unwrap();
        assert_eq!(workspace.progress.experience(), 10);
        assert!(workspace.session.history().is_empty());
    }

    #[tokio::test]
    async fn test_apply_settings_updates_session() {
        let registry = registry(Arc::new(MemoryStore::new()));
        let mut workspace = registry.acquire("acct").await.unwrap();

        workspace.apply_settings(Settings {
            difficulty: Difficulty::Advanced,
            auto_speak: false,
            show_translation: true,
        });
        assert_eq!(workspace.session.difficulty(), Difficulty::Advanced);
        assert!(!workspace.settings.auto_speak);
    }
}
