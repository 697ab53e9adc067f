use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use chrono::Utc;
use kaiwa_algo::{
    default_pool, select_study_set, Difficulty, Judgment, ProgressSnapshot, StudyDeck,
    VocabularyError, VocabularyWord,
};
use serde::{Deserialize, Serialize};

use crate::auth::AuthAccount;
use crate::response::{ok, AppError};
use crate::routes::progress::save_progress;
use crate::services::dictionary::generate_word_definition;
use crate::services::workspace::AccountWorkspace;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VocabularyListResponse<'a> {
    known: &'a [VocabularyWord],
    study: &'a [VocabularyWord],
}

pub async fn list(
    State(state): State<AppState>,
    account: AuthAccount,
) -> Result<Response, AppError> {
    let workspace = state.workspaces().acquire(&account.id).await?;
    Ok(ok(VocabularyListResponse {
        known: workspace.progress.known_vocabulary(),
        study: workspace.progress.study_vocabulary(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct AddWordRequest {
    pub word: String,
    #[serde(default)]
    pub translation: Option<String>,
    #[serde(default)]
    pub example: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddWordResponse {
    word: VocabularyWord,
    generated: bool,
    persisted: bool,
}

/// Add a word to the study list. A missing translation is filled in by the
/// definition service.
pub async fn add(
    State(state): State<AppState>,
    account: AuthAccount,
    Json(payload): Json<AddWordRequest>,
) -> Result<Response, AppError> {
    let text = payload.word.trim().to_string();
    if text.is_empty() {
        return Err(AppError::validation("Word must not be empty"));
    }

    let mut workspace = state.workspaces().acquire(&account.id).await?;

    let translation = payload.translation.filter(|t| !t.trim().is_empty());
    let example = payload.example.filter(|e| !e.trim().is_empty());
    let (translation, example, generated) = match translation {
        Some(translation) => (translation, example, false),
        None => {
            let generator = state.generator();
            let definition =
                generate_word_definition(generator.as_ref(), &text, workspace.settings.difficulty)
                    .await;
            if !definition.is_generated() {
                return Err(AppError::validation(
                    "A translation could not be generated, please enter one",
                ));
            }
            let example = example.or_else(|| definition.generated_example().map(str::to_string));
            (definition.definition, example, true)
        }
    };

    let word = VocabularyWord::new(uuid::Uuid::new_v4().to_string(), text, translation, example);
    workspace
        .progress
        .add_study_word(word.clone())
        .map_err(|err| match err {
            VocabularyError::Duplicate(_) => AppError::conflict(err.to_string()),
            VocabularyError::EmptyWord => AppError::validation(err.to_string()),
        })?;

    let persisted = match state.store().insert_vocabulary(&account.id, &word).await {
        Ok(inserted) => inserted,
        Err(err) => {
            tracing::warn!(
                error = %err,
                account_id = %account.id,
                "failed to persist vocabulary word"
            );
            false
        }
    };

    Ok(ok(AddWordResponse {
        word,
        generated,
        persisted,
    }))
}

pub async fn remove(
    State(state): State<AppState>,
    account: AuthAccount,
    Path(word_id): Path<String>,
) -> Result<Response, AppError> {
    let mut workspace = state.workspaces().acquire(&account.id).await?;
    if !workspace.progress.remove_word(&word_id) {
        return Err(AppError::not_found("Word not found"));
    }

    // a removed word must not come back through the running study session
    let deck_finished = match workspace.deck.as_mut() {
        Some(deck) => deck.remove(&word_id) && deck.is_finished(),
        None => false,
    };

    let store = state.store();
    let mut persisted = match store.delete_vocabulary(&account.id, &word_id).await {
        Ok(_) => true,
        Err(err) => {
            tracing::warn!(
                error = %err,
                account_id = %account.id,
                "failed to delete vocabulary word"
            );
            false
        }
    };
    persisted &= save_progress(store.as_ref(), &account.id, &workspace.progress).await;

    let completion = if deck_finished {
        complete_deck(&state, &account.id, &mut workspace).await
    } else {
        None
    };

    Ok(ok(RemoveWordResponse {
        removed: word_id,
        deck: workspace.deck.as_ref().map(DeckView::of),
        completion,
        persisted,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RemoveWordResponse<'a> {
    removed: String,
    deck: Option<DeckView<'a>>,
    completion: Option<StudyCompletion>,
    persisted: bool,
}

#[derive(Debug, Deserialize)]
pub struct DefinitionRequest {
    pub word: String,
    #[serde(default)]
    pub level: Option<Difficulty>,
}

pub async fn definition(
    State(state): State<AppState>,
    account: AuthAccount,
    Json(payload): Json<DefinitionRequest>,
) -> Result<Response, AppError> {
    let word = payload.word.trim();
    if word.is_empty() {
        return Err(AppError::validation("Word must not be empty"));
    }

    let level = match payload.level {
        Some(level) => level,
        None => state.workspaces().acquire(&account.id).await?.settings.difficulty,
    };
    let generator = state.generator();
    Ok(ok(generate_word_definition(generator.as_ref(), word, level).await))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeckView<'a> {
    cards: &'a [VocabularyWord],
    position: usize,
    total: usize,
    current: Option<&'a VocabularyWord>,
    progress: f64,
    known_count: usize,
    unknown_count: usize,
    finished: bool,
}

impl<'a> DeckView<'a> {
    fn of(deck: &'a StudyDeck) -> Self {
        Self {
            cards: deck.cards(),
            position: deck.position(),
            total: deck.len(),
            current: deck.current(),
            progress: deck.progress(),
            known_count: deck.known().len(),
            unknown_count: deck.unknown().len(),
            finished: deck.is_finished(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StudyCompletion {
    known: usize,
    unknown: usize,
    experience_gained: u64,
    leveled_up: bool,
    progress: ProgressSnapshot,
    persisted: bool,
}

/// Start a study session, replacing any deck in progress.
pub async fn start_study(
    State(state): State<AppState>,
    account: AuthAccount,
) -> Result<Response, AppError> {
    let mut workspace = state.workspaces().acquire(&account.id).await?;

    let limits = state.session_config().study_limits;
    let cards = {
        let progress = &workspace.progress;
        let mut rng = rand::thread_rng();
        select_study_set(
            progress.study_vocabulary(),
            progress.known_vocabulary(),
            &default_pool(),
            progress.level(),
            limits,
            &mut rng,
        )
    };

    tracing::debug!(account_id = %account.id, cards = cards.len(), "study session started");
    let deck = workspace.deck.insert(StudyDeck::new(cards));
    Ok(ok(DeckView::of(deck)))
}

#[derive(Debug, Deserialize)]
pub struct MarkRequest {
    pub judgment: Judgment,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MarkResponse<'a> {
    word: VocabularyWord,
    deck: Option<DeckView<'a>>,
    completion: Option<StudyCompletion>,
}

/// Judge the current card. Judging the last card completes the session.
pub async fn mark(
    State(state): State<AppState>,
    account: AuthAccount,
    Json(payload): Json<MarkRequest>,
) -> Result<Response, AppError> {
    let mut workspace = state.workspaces().acquire(&account.id).await?;
    let deck = workspace
        .deck
        .as_mut()
        .ok_or_else(|| AppError::bad_request("No study session in progress"))?;

    let word = deck
        .mark(payload.judgment, Utc::now())
        .ok_or_else(|| AppError::bad_request("Study session is already finished"))?;

    if !deck.is_finished() {
        return Ok(ok(MarkResponse {
            word,
            deck: workspace.deck.as_ref().map(DeckView::of),
            completion: None,
        }));
    }

    let completion = complete_deck(&state, &account.id, &mut workspace).await;
    Ok(ok(MarkResponse {
        word,
        deck: None,
        completion,
    }))
}

pub async fn previous(
    State(state): State<AppState>,
    account: AuthAccount,
) -> Result<Response, AppError> {
    let mut workspace = state.workspaces().acquire(&account.id).await?;
    let deck = workspace
        .deck
        .as_mut()
        .ok_or_else(|| AppError::bad_request("No study session in progress"))?;

    let moved = deck.previous();
    Ok(ok(serde_json::json!({
        "moved": moved,
        "deck": DeckView::of(deck),
    })))
}

pub async fn complete(
    State(state): State<AppState>,
    account: AuthAccount,
) -> Result<Response, AppError> {
    let mut workspace = state.workspaces().acquire(&account.id).await?;
    match complete_deck(&state, &account.id, &mut workspace).await {
        Some(completion) => Ok(ok(completion)),
        None => Err(AppError::bad_request("No study session in progress")),
    }
}

/// Fold the running deck into progress and persist newly mastered words.
async fn complete_deck(
    state: &AppState,
    account_id: &str,
    workspace: &mut AccountWorkspace,
) -> Option<StudyCompletion> {
    let outcome = workspace.deck.take()?.finish();
    let delta = workspace
        .progress
        .complete_study(outcome.known.clone(), Utc::now());

    let store = state.store();
    let mut persisted = true;
    let mastered = workspace
        .progress
        .known_vocabulary()
        .iter()
        .filter(|word| outcome.known.iter().any(|k| k.id == word.id));
    for word in mastered {
        if let Err(err) = store.upsert_vocabulary(account_id, word).await {
            tracing::warn!(
                error = %err,
                account_id,
                word_id = %word.id,
                "failed to persist mastered word"
            );
            persisted = false;
        }
    }
    persisted &= save_progress(store.as_ref(), account_id, &workspace.progress).await;

    tracing::info!(
        account_id,
        known = outcome.known.len(),
        unknown = outcome.unknown.len(),
        experience_gained = delta.experience_gained,
        "study session completed"
    );

    Some(StudyCompletion {
        known: outcome.known.len(),
        unknown: outcome.unknown.len(),
        experience_gained: delta.experience_gained,
        leveled_up: delta.leveled_up,
        progress: workspace.progress.snapshot(),
        persisted,
    })
}
