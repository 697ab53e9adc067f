use axum::extract::State;
use axum::response::Response;
use serde::Serialize;

use crate::response::ok;
use crate::state::{AppState, Capabilities};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CapabilitiesResponse {
    #[serde(flatten)]
    capabilities: Capabilities,
    store: &'static str,
    history_cap: usize,
    context_turns: usize,
    study_cap: usize,
}

pub async fn get(State(state): State<AppState>) -> Response {
    let session = state.session_config();
    ok(CapabilitiesResponse {
        capabilities: state.capabilities(),
        store: state.store().kind(),
        history_cap: session.history_cap,
        context_turns: session.context_turns,
        study_cap: session.study_limits.study_cap,
    })
}
