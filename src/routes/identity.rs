use axum::{extract::State, http::HeaderMap, Json};
use serde_json::{json, Value};

use crate::{auth::require_admin, error::AppResult, state::AppState};

pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Json<Value>> {
    let admin = require_admin(&state, &headers).await?;
    Ok(Json(json!({
        "id": admin.id,
        "email": admin.email,
        "restricted": admin.restricted,
        "counters": state.counters.current(),
    })))
}
