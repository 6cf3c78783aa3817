use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde_json::{json, Map, Value};

use crate::{
    auth::require_unrestricted,
    error::{AppError, AppResult},
    schemas::{PaymentPath, PaymentsQuery, ReceiptPath},
    services::{
        payments::{
            self, parse_submission, PaymentFilters, PaymentStatus, SubmissionForm, UploadedFile,
        },
        storage::ReceiptKind,
    },
    state::AppState,
};

/// Multipart part names accepted as the uploaded file.
const FILE_FIELDS: &[&str] = &["receipt", "file"];

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route(
            "/payments",
            axum::routing::get(list_payments).post(upload_payment),
        )
        .route(
            "/payments/client-options",
            axum::routing::get(list_client_options),
        )
        .route(
            "/payments/{payment_id}",
            axum::routing::patch(update_payment).delete(delete_payment),
        )
        .route(
            "/payments/{payment_id}/approve",
            axum::routing::post(approve_payment),
        )
        .route(
            "/payments/{payment_id}/reject",
            axum::routing::post(reject_payment),
        )
        .route(
            "/payments/{payment_id}/receipts/{kind}",
            axum::routing::get(download_receipt).post(attach_receipt),
        )
}

async fn list_payments(
    State(state): State<AppState>,
    Query(query): Query<PaymentsQuery>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    require_unrestricted(&state, &headers).await?;

    let date = match query.date.as_deref().map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => Some(NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
            AppError::BadRequest(format!("Invalid date '{raw}'. Use YYYY-MM-DD."))
        })?),
        None => None,
    };
    let filters = PaymentFilters {
        search: query.search,
        project: query.project,
        status: query.status,
        date,
        missing_ar_receipt: query.missing_ar_receipt,
    };

    let rows = payments::list_payments(state.pool()?, &filters).await?;
    Ok(Json(json!({ "data": rows })))
}

async fn list_client_options(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    require_unrestricted(&state, &headers).await?;
    let options = payments::client_options(state.pool()?).await?;
    Ok(Json(json!({ "data": options })))
}

async fn upload_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let admin = require_unrestricted(&state, &headers).await?;
    let form = read_form(multipart).await?;
    let submission = parse_submission(form)?;

    let created = payments::upload_payment(&state, submission).await?;
    tracing::info!(admin = %admin.email, payment_id = ?created.get("id"), "Payment uploaded");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_payment(
    State(state): State<AppState>,
    Path(path): Path<PaymentPath>,
    headers: HeaderMap,
    Json(fields): Json<Map<String, Value>>,
) -> AppResult<Json<Value>> {
    let admin = require_unrestricted(&state, &headers).await?;
    let updated = payments::update_payment(&state, &path.payment_id, &fields).await?;
    tracing::info!(admin = %admin.email, payment_id = %path.payment_id, "Payment updated");
    Ok(Json(updated))
}

async fn approve_payment(
    State(state): State<AppState>,
    Path(path): Path<PaymentPath>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    require_unrestricted(&state, &headers).await?;
    let updated = payments::set_status(&state, &path.payment_id, PaymentStatus::Approved).await?;
    Ok(Json(updated))
}

async fn reject_payment(
    State(state): State<AppState>,
    Path(path): Path<PaymentPath>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    require_unrestricted(&state, &headers).await?;
    let updated = payments::set_status(&state, &path.payment_id, PaymentStatus::Rejected).await?;
    Ok(Json(updated))
}

async fn delete_payment(
    State(state): State<AppState>,
    Path(path): Path<PaymentPath>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let admin = require_unrestricted(&state, &headers).await?;
    let deleted = payments::delete_payment(&state, &path.payment_id).await?;
    tracing::info!(admin = %admin.email, payment_id = %path.payment_id, "Payment deleted");
    Ok(Json(deleted))
}

async fn attach_receipt(
    State(state): State<AppState>,
    Path(path): Path<ReceiptPath>,
    headers: HeaderMap,
    multipart: Multipart,
) -> AppResult<Json<Value>> {
    require_unrestricted(&state, &headers).await?;
    let kind = ReceiptKind::parse(&path.kind)?;
    let file = read_form(multipart)
        .await?
        .receipt
        .filter(|file| !file.bytes.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing file.".to_string()))?;

    let updated = payments::attach_receipt(&state, &path.payment_id, kind, file).await?;
    Ok(Json(updated))
}

async fn download_receipt(
    State(state): State<AppState>,
    Path(path): Path<ReceiptPath>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    require_unrestricted(&state, &headers).await?;
    let kind = ReceiptKind::parse(&path.kind)?;
    let object = payments::download_receipt(&state, &path.payment_id, kind).await?;
    Ok(([(header::CONTENT_TYPE, object.content_type)], object.bytes))
}

async fn read_form(mut multipart: Multipart) -> AppResult<SubmissionForm> {
    let mut form = SubmissionForm::default();
    while let Some(part) = multipart.next_field().await.map_err(invalid_multipart)? {
        let Some(name) = part.name().map(str::to_string) else {
            continue;
        };

        if FILE_FIELDS.contains(&name.as_str()) {
            let file_name = part.file_name().unwrap_or_default().to_string();
            let content_type = part
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = part.bytes().await.map_err(invalid_multipart)?;
            form.receipt = Some(UploadedFile {
                file_name,
                content_type,
                bytes: bytes.to_vec(),
            });
        } else {
            let text = part.text().await.map_err(invalid_multipart)?;
            form.fields.insert(name, text);
        }
    }
    Ok(form)
}

fn invalid_multipart(error: axum::extract::multipart::MultipartError) -> AppError {
    AppError::BadRequest(format!("Invalid multipart body: {error}"))
}
