use std::sync::Arc;
use std::time::{Instant, SystemTime};

use serde::Serialize;

use crate::config::SessionConfig;
use crate::db::store::{MemoryStore, PgStore, PracticeStore};
use crate::db::DatabaseProxy;
use crate::services::generator::TextGenerator;
use crate::services::llm_provider::LLMProvider;
use crate::services::workspace::WorkspaceRegistry;

/// Optional collaborators detected once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    /// Model credentials are configured
    pub generation: bool,
    /// Practice data is written to Postgres rather than kept in memory
    pub persistence: bool,
}

impl Capabilities {
    pub fn detect(store: &dyn PracticeStore, generator: &dyn TextGenerator) -> Self {
        Self {
            generation: generator.is_available(),
            persistence: store.kind() != "memory",
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    store: Arc<dyn PracticeStore>,
    generator: Arc<dyn TextGenerator>,
    workspaces: Arc<WorkspaceRegistry>,
    session: Arc<SessionConfig>,
    capabilities: Capabilities,
}

impl AppState {
    pub fn new(
        store: Arc<dyn PracticeStore>,
        generator: Arc<dyn TextGenerator>,
        session: SessionConfig,
    ) -> Self {
        let capabilities = Capabilities::detect(store.as_ref(), generator.as_ref());
        let workspaces = Arc::new(WorkspaceRegistry::new(
            Arc::clone(&store),
            Arc::clone(&generator),
            session.clone(),
        ));

        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            store,
            generator,
            workspaces,
            session: Arc::new(session),
            capabilities,
        }
    }

    /// Connect to Postgres when `DATABASE_URL` is set, otherwise keep
    /// practice data in memory.
    pub async fn from_env(session: SessionConfig) -> Self {
        let store: Arc<dyn PracticeStore> = match DatabaseProxy::from_env().await {
            Ok(proxy) => Arc::new(PgStore::new(proxy)),
            Err(err) => {
                tracing::warn!(error = %err, "database not available, using in-memory store");
                Arc::new(MemoryStore::new())
            }
        };

        let provider = LLMProvider::from_env();
        if !provider.is_available() {
            tracing::warn!("LLM_API_KEY not set, replies will use the fallback message");
        } else {
            tracing::info!(model = provider.model(), "text generation configured");
        }

        let state = Self::new(store, Arc::new(provider), session);
        state.workspaces.start_eviction();
        state
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }

    pub fn store(&self) -> Arc<dyn PracticeStore> {
        Arc::clone(&self.store)
    }

    pub fn generator(&self) -> Arc<dyn TextGenerator> {
        Arc::clone(&self.generator)
    }

    pub fn workspaces(&self) -> &WorkspaceRegistry {
        &self.workspaces
    }

    pub fn session_config(&self) -> &SessionConfig {
        &self.session
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}
