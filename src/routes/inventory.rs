use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde_json::{Map, Value};

use crate::{
    auth::require_unrestricted,
    error::AppResult,
    schemas::{ProjectPath, PropertiesQuery, PropertyPath},
    services::{inventory, subdivision::Project},
    state::AppState,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/inventory/{project}", axum::routing::get(list_properties))
        .route(
            "/inventory/{project}/{property_id}",
            axum::routing::get(get_property).patch(update_property),
        )
        .route(
            "/inventory/{project}/{property_id}/sell",
            axum::routing::post(sell_property),
        )
        .route(
            "/inventory/{project}/{property_id}/reopen",
            axum::routing::post(reopen_property),
        )
}

async fn list_properties(
    State(state): State<AppState>,
    Path(path): Path<ProjectPath>,
    Query(query): Query<PropertiesQuery>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    require_unrestricted(&state, &headers).await?;
    let project = Project::from_segment(&path.project)?;
    let listing = inventory::list_properties(
        state.pool()?,
        project,
        query.search.as_deref(),
        query.status.as_deref(),
    )
    .await?;
    Ok(Json(listing))
}

async fn get_property(
    State(state): State<AppState>,
    Path(path): Path<PropertyPath>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    require_unrestricted(&state, &headers).await?;
    let project = Project::from_segment(&path.project)?;
    let row = inventory::get_property(state.pool()?, project, &path.property_id).await?;
    Ok(Json(row))
}

async fn update_property(
    State(state): State<AppState>,
    Path(path): Path<PropertyPath>,
    headers: HeaderMap,
    Json(fields): Json<Map<String, Value>>,
) -> AppResult<Json<Value>> {
    let admin = require_unrestricted(&state, &headers).await?;
    let project = Project::from_segment(&path.project)?;
    let updated = inventory::update_property(&state, project, &path.property_id, &fields).await?;
    tracing::info!(
        admin = %admin.email,
        project = project.table(),
        property_id = %path.property_id,
        "Property updated"
    );
    Ok(Json(updated))
}

async fn sell_property(
    State(state): State<AppState>,
    Path(path): Path<PropertyPath>,
    headers: HeaderMap,
    payload: Option<Json<Map<String, Value>>>,
) -> AppResult<Json<inventory::SaleOutcome>> {
    let admin = require_unrestricted(&state, &headers).await?;
    let project = Project::from_segment(&path.project)?;
    let overrides = payload.map(|Json(map)| map).unwrap_or_default();

    let outcome =
        inventory::sell_property(&state, project, &path.property_id, &overrides).await?;
    tracing::info!(
        admin = %admin.email,
        project = project.table(),
        property_id = %path.property_id,
        warnings = outcome.warnings.len(),
        "Property sold"
    );
    Ok(Json(outcome))
}

async fn reopen_property(
    State(state): State<AppState>,
    Path(path): Path<PropertyPath>,
    headers: HeaderMap,
) -> AppResult<Json<inventory::ReopenOutcome>> {
    let admin = require_unrestricted(&state, &headers).await?;
    let project = Project::from_segment(&path.project)?;

    let outcome = inventory::reopen_property(&state, project, &path.property_id).await?;
    tracing::info!(
        admin = %admin.email,
        project = project.table(),
        property_id = %path.property_id,
        warnings = outcome.warnings.len(),
        "Property reopened"
    );
    Ok(Json(outcome))
}
