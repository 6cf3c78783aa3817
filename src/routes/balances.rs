use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde_json::{json, Map, Value};

use crate::{
    auth::require_unrestricted,
    error::AppResult,
    schemas::{validate_input, BalancePath, BalancesQuery, RecordPaymentInput},
    services::{
        balances::{self, normalize_payment_type, BalanceSort, PaymentEntry, Statement},
        values::non_empty_opt,
    },
    state::AppState,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/balances", axum::routing::get(list_balances))
        .route(
            "/balances/{balance_id}",
            axum::routing::get(get_balance)
                .patch(update_balance)
                .delete(delete_balance),
        )
        .route(
            "/balances/{balance_id}/payments",
            axum::routing::post(record_payment),
        )
        .route(
            "/balances/{balance_id}/statement",
            axum::routing::get(get_statement),
        )
}

async fn list_balances(
    State(state): State<AppState>,
    Query(query): Query<BalancesQuery>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    require_unrestricted(&state, &headers).await?;
    let sort = BalanceSort::parse(query.sort.as_deref())?;
    let rows = balances::list_balances(
        state.pool()?,
        query.search.as_deref(),
        query.project.as_deref(),
        sort,
    )
    .await?;
    Ok(Json(json!({ "data": rows })))
}

async fn get_balance(
    State(state): State<AppState>,
    Path(path): Path<BalancePath>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    require_unrestricted(&state, &headers).await?;
    let row = balances::get_balance(state.pool()?, &path.balance_id).await?;
    Ok(Json(row))
}

async fn update_balance(
    State(state): State<AppState>,
    Path(path): Path<BalancePath>,
    headers: HeaderMap,
    Json(fields): Json<Map<String, Value>>,
) -> AppResult<Json<Value>> {
    let admin = require_unrestricted(&state, &headers).await?;
    let updated = balances::update_balance_details(&state, &path.balance_id, &fields).await?;
    tracing::info!(admin = %admin.email, balance_id = %path.balance_id, "Balance details updated");
    Ok(Json(updated))
}

async fn delete_balance(
    State(state): State<AppState>,
    Path(path): Path<BalancePath>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let admin = require_unrestricted(&state, &headers).await?;
    let deleted = balances::delete_balance(&state, &path.balance_id).await?;
    tracing::info!(admin = %admin.email, balance_id = %path.balance_id, "Balance deleted");
    Ok(Json(deleted))
}

async fn record_payment(
    State(state): State<AppState>,
    Path(path): Path<BalancePath>,
    headers: HeaderMap,
    Json(payload): Json<RecordPaymentInput>,
) -> AppResult<Json<Value>> {
    require_unrestricted(&state, &headers).await?;
    validate_input(&payload)?;

    let entry = PaymentEntry {
        amount: payload.amount,
        penalty: payload.penalty,
        payment_type: normalize_payment_type(payload.payment_type.as_deref())?,
        payment_month: non_empty_opt(payload.payment_month.as_deref()),
        due_date: payload.resolved_due_date(),
        months_paid: non_empty_opt(payload.months_paid.as_deref()),
    };

    let result = balances::record_payment(&state, &path.balance_id, &entry).await?;
    Ok(Json(result))
}

async fn get_statement(
    State(state): State<AppState>,
    Path(path): Path<BalancePath>,
    headers: HeaderMap,
) -> AppResult<Json<Statement>> {
    require_unrestricted(&state, &headers).await?;
    let statement = balances::statement(state.pool()?, &path.balance_id).await?;
    Ok(Json(statement))
}
