use axum::extract::State;
use axum::response::Response;
use axum::Json;
use chrono::{Duration, Utc};
use kaiwa_algo::{Difficulty, ProgressSnapshot, Role, Turn};
use serde::{Deserialize, Serialize};

use crate::auth::AuthAccount;
use crate::db::operations::MessageRecord;
use crate::response::{ok, AppError};
use crate::routes::progress::save_progress;
use crate::services::conversation::ReplyOutcome;
use crate::services::translation::translate_to_english;
use crate::services::workspace::Settings;
use crate::state::AppState;

pub const GREETING: &str =
    "Hello! I'm your English conversation partner. What would you like to talk about today?";

/// Messages returned when loading the transcript
const MESSAGE_LOG_LIMIT: usize = 200;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatTurnResponse {
    user_message: MessageRecord,
    bot_message: MessageRecord,
    fallback: bool,
    experience_gained: u64,
    leveled_up: bool,
    progress: ProgressSnapshot,
    persisted: bool,
}

pub async fn send_message(
    State(state): State<AppState>,
    account: AuthAccount,
    Json(payload): Json<SendMessageRequest>,
) -> Result<Response, AppError> {
    let text = payload.message.trim().to_string();
    if text.is_empty() {
        return Err(AppError::validation("Message must not be empty"));
    }

    let mut workspace = state.workspaces().acquire(&account.id).await?;
    let received_at = Utc::now();
    workspace
        .session
        .append_user_turn(&text)
        .map_err(|err| AppError::validation(err.to_string()))?;

    let generator = state.generator();
    let (translation, outcome) = tokio::join!(
        translate_to_english(generator.as_ref(), &text),
        workspace.session.generate_reply(),
    );

    // the reply always sorts after the message it answers
    let replied_at = Utc::now().max(received_at + Duration::milliseconds(1));

    let mut user_message = MessageRecord::new(Role::User, text.clone(), received_at);
    if translation != text {
        user_message.translation = Some(translation);
    }

    let reply = outcome.reply();
    let mut bot_message = MessageRecord::new(Role::Assistant, reply.response.clone(), replied_at);
    bot_message.translation = Some(reply.translation.clone()).filter(|t| !t.is_empty());
    bot_message.corrections = reply.corrections.clone();
    bot_message.fallback = outcome.is_fallback();

    let delta = match &outcome {
        ReplyOutcome::Generated(reply) => Some(
            workspace
                .progress
                .record_turn(reply.corrections.len(), replied_at),
        ),
        ReplyOutcome::Fallback { .. } => None,
    };

    let store = state.store();
    let mut persisted = match store
        .append_messages(&account.id, &[user_message.clone(), bot_message.clone()])
        .await
    {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(
                error = %err,
                account_id = %account.id,
                "failed to persist chat messages"
            );
            false
        }
    };
    if delta.is_some() {
        persisted &= save_progress(store.as_ref(), &account.id, &workspace.progress).await;
    }

    if let Some(delta) = delta.filter(|d| d.leveled_up) {
        tracing::info!(account_id = %account.id, level = delta.level, "account leveled up");
    }

    Ok(ok(ChatTurnResponse {
        user_message,
        bot_message,
        fallback: outcome.is_fallback(),
        experience_gained: delta.map(|d| d.experience_gained).unwrap_or(0),
        leveled_up: delta.is_some_and(|d| d.leveled_up),
        progress: workspace.progress.snapshot(),
        persisted,
    }))
}

/// The persisted transcript. A new account gets the greeting, stored so it
/// shows up on the next load too.
pub async fn messages(
    State(state): State<AppState>,
    account: AuthAccount,
) -> Result<Response, AppError> {
    let store = state.store();
    let messages = store.list_messages(&account.id, MESSAGE_LOG_LIMIT).await?;
    if !messages.is_empty() {
        return Ok(ok(messages));
    }

    let greeting = MessageRecord::new(Role::Assistant, GREETING, Utc::now());
    if let Err(err) = store
        .append_messages(&account.id, std::slice::from_ref(&greeting))
        .await
    {
        tracing::warn!(error = %err, account_id = %account.id, "failed to store greeting");
    }
    Ok(ok(vec![greeting]))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryResponse<'a> {
    difficulty: Difficulty,
    history_cap: usize,
    turns: &'a [Turn],
}

pub async fn history(
    State(state): State<AppState>,
    account: AuthAccount,
) -> Result<Response, AppError> {
    let workspace = state.workspaces().acquire(&account.id).await?;
    Ok(ok(HistoryResponse {
        difficulty: workspace.session.difficulty(),
        history_cap: state.session_config().history_cap,
        turns: workspace.session.history(),
    }))
}

pub async fn clear_history(
    State(state): State<AppState>,
    account: AuthAccount,
) -> Result<Response, AppError> {
    let mut workspace = state.workspaces().acquire(&account.id).await?;
    workspace.session.clear_history();
    tracing::debug!(account_id = %account.id, "conversation history cleared");
    Ok(ok(serde_json::json!({ "cleared": true })))
}

pub async fn get_settings(
    State(state): State<AppState>,
    account: AuthAccount,
) -> Result<Response, AppError> {
    let workspace = state.workspaces().acquire(&account.id).await?;
    Ok(ok(workspace.settings))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    pub difficulty: Option<Difficulty>,
    pub auto_speak: Option<bool>,
    pub show_translation: Option<bool>,
}

pub async fn update_settings(
    State(state): State<AppState>,
    account: AuthAccount,
    Json(payload): Json<UpdateSettingsRequest>,
) -> Result<Response, AppError> {
    let mut workspace = state.workspaces().acquire(&account.id).await?;
    let current = workspace.settings;
    let next = Settings {
        difficulty: payload.difficulty.unwrap_or(current.difficulty),
        auto_speak: payload.auto_speak.unwrap_or(current.auto_speak),
        show_translation: payload.show_translation.unwrap_or(current.show_translation),
    };
    workspace.apply_settings(next);
    Ok(ok(workspace.settings))
}
