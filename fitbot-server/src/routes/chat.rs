use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;

use fitbot_core::model::{TurnOutcome, TurnRequest};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn chat(
    State(state): State<AppState>,
    body: Result<Json<TurnRequest>, JsonRejection>,
) -> Result<Json<TurnOutcome>, ApiError> {
    let Json(request) = body?;
    let outcome = state.engine.process_turn(&request).await?;
    Ok(Json(outcome))
}
