use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::{db, error::AppError, AppState};

pub async fn health(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    db::ping(&state.db).await?;
    Ok(Json(json!({ "status": "ok" })))
}
