use axum::extract::State;
use axum::response::Response;
use kaiwa_algo::ProgressState;

use crate::auth::AuthAccount;
use crate::db::store::PracticeStore;
use crate::response::{ok, AppError};
use crate::state::AppState;

pub async fn get_progress(
    State(state): State<AppState>,
    account: AuthAccount,
) -> Result<Response, AppError> {
    let workspace = state.workspaces().acquire(&account.id).await?;
    Ok(ok(workspace.progress.snapshot()))
}

pub async fn reset(
    State(state): State<AppState>,
    account: AuthAccount,
) -> Result<Response, AppError> {
    let mut workspace = state.workspaces().acquire(&account.id).await?;
    workspace.progress.reset();
    save_progress(state.store().as_ref(), &account.id, &workspace.progress).await;
    tracing::info!(account_id = %account.id, "progress reset");
    Ok(ok(workspace.progress.snapshot()))
}

/// Write the progress counters. Failures are logged and reported as `false`.
pub(crate) async fn save_progress(
    store: &dyn PracticeStore,
    account_id: &str,
    progress: &ProgressState,
) -> bool {
    match store
        .upsert_progress(account_id, progress.counters(), progress.level())
        .await
    {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(error = %err, account_id, "failed to persist progress");
            false
        }
    }
}
