use axum::{extract::State, http::HeaderMap, Json};
use serde_json::{json, Value};

use crate::{
    auth::require_unrestricted,
    error::AppResult,
    services::dashboard::{self, Feed, LotSummary, PropertyMetrics},
    state::AppState,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/dashboard/lots", axum::routing::get(lot_summary))
        .route(
            "/dashboard/active-accounts",
            axum::routing::get(active_accounts),
        )
        .route("/dashboard/metrics", axum::routing::get(property_metrics))
        .route("/dashboard/feed", axum::routing::get(feed))
}

async fn lot_summary(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<LotSummary>> {
    require_unrestricted(&state, &headers).await?;
    Ok(Json(dashboard::lot_summary(state.pool()?).await))
}

async fn active_accounts(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    require_unrestricted(&state, &headers).await?;
    let rows = dashboard::active_accounts(state.pool()?).await?;
    let count = rows.len();
    Ok(Json(json!({ "data": rows, "count": count })))
}

async fn property_metrics(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<PropertyMetrics>> {
    require_unrestricted(&state, &headers).await?;
    Ok(Json(dashboard::property_metrics(state.pool()?).await?))
}

async fn feed(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Json<Feed>> {
    require_unrestricted(&state, &headers).await?;
    Ok(Json(dashboard::feed(state.pool()?).await))
}
