use std::collections::{BTreeMap, HashSet};

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::{
    error::{AppError, AppResult},
    repository::table_service::{create_row, delete_row, get_row, list_rows, update_row},
    services::{
        balances::normalize_payment_type,
        realtime::ChangeOp,
        storage::{attachment_key, extension_of, submission_key, ReceiptKind, StoredObject},
        values::{
            field, json_number, month_label, parse_optional_amount, text_of, value_raw_opt,
            value_str_opt,
        },
    },
    state::AppState,
};

const MAX_PAYMENT_ROWS: i64 = 10_000;

const EDITABLE_COLUMNS: &[&str] = &[
    "Name",
    "Block & Lot",
    "Payment Amount",
    "Penalty Amount",
    "Vat",
    "Date of Payment",
    "Month of Payment",
    "Reference Number",
    "Project",
    "Payment Type",
    "MONTHS PAID",
    "Due Date",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Approved,
    Rejected,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PaymentFilters {
    pub search: Option<String>,
    pub project: Option<String>,
    pub status: Option<String>,
    pub date: Option<NaiveDate>,
    pub missing_ar_receipt: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ClientOption {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Project")]
    pub project: String,
    #[serde(rename = "Block & Lot")]
    pub block_lot: String,
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Raw multipart form: text fields by name plus the receipt file.
#[derive(Debug, Default)]
pub struct SubmissionForm {
    pub fields: BTreeMap<String, String>,
    pub receipt: Option<UploadedFile>,
}

#[derive(Debug, Clone)]
pub struct PaymentSubmission {
    pub name: String,
    pub project: String,
    pub block_lot: String,
    pub amount: f64,
    pub penalty: Option<f64>,
    pub payment_date: String,
    pub payment_month: String,
    pub reference_number: String,
    pub due_date: String,
    pub vat: String,
    pub payment_type: Option<String>,
    pub receipt: UploadedFile,
}

pub async fn list_payments(
    pool: &sqlx::PgPool,
    filters: &PaymentFilters,
) -> AppResult<Vec<Value>> {
    let rows = list_rows(
        pool,
        "Payment",
        None,
        MAX_PAYMENT_ROWS,
        0,
        &[("created_at", false)],
    )
    .await?;

    Ok(rows
        .into_iter()
        .filter(|row| matches_filters(row, filters))
        .map(with_month_label)
        .collect())
}

pub fn matches_filters(row: &Value, filters: &PaymentFilters) -> bool {
    if let Some(needle) = filters
        .search
        .as_deref()
        .map(|value| value.trim().to_lowercase())
        .filter(|value| !value.is_empty())
    {
        if !text_of(field(row, "Name")).to_lowercase().contains(&needle) {
            return false;
        }
    }
    if !matches_choice(row, "Project", filters.project.as_deref()) {
        return false;
    }
    if !matches_choice(row, "Status", filters.status.as_deref()) {
        return false;
    }
    if let Some(date) = filters.date {
        if calendar_day(&text_of(field(row, "Date of Payment"))) != Some(date) {
            return false;
        }
    }
    if filters.missing_ar_receipt && value_str_opt(row, "ar_receipt_path").is_some() {
        return false;
    }
    true
}

fn matches_choice(row: &Value, column: &str, wanted: Option<&str>) -> bool {
    match wanted.map(str::trim).filter(|value| !value.is_empty()) {
        None => true,
        Some(value) if value.eq_ignore_ascii_case("all") => true,
        Some(value) => text_of(field(row, column)) == value,
    }
}

/// Calendar day of a stored date or timestamp.
fn calendar_day(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let day = trimmed.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

pub fn with_month_label(row: Value) -> Value {
    let Value::Object(mut object) = row else {
        return row;
    };
    let label = month_label(&text_of(object.get("Month of Payment").unwrap_or(&Value::Null)));
    object.insert("month_label".to_string(), Value::String(label));
    Value::Object(object)
}

pub async fn client_options(pool: &sqlx::PgPool) -> AppResult<Vec<ClientOption>> {
    let rows = list_rows(pool, "Balance", None, MAX_PAYMENT_ROWS, 0, &[("Name", true)]).await?;
    Ok(dedupe_client_options(&rows))
}

pub fn dedupe_client_options(rows: &[Value]) -> Vec<ClientOption> {
    let mut seen = HashSet::new();
    let mut options = rows
        .iter()
        .filter_map(|row| {
            let name = text_of(field(row, "Name")).trim().to_string();
            if name.is_empty() {
                return None;
            }
            Some(ClientOption {
                name,
                project: text_of(field(row, "Project")),
                block_lot: format!(
                    "Block {} Lot {}",
                    text_of(field(row, "Block")),
                    text_of(field(row, "Lot"))
                ),
            })
        })
        .filter(|option| seen.insert(option.clone()))
        .collect::<Vec<_>>();
    options.sort_by(|a, b| a.name.cmp(&b.name));
    options
}

pub fn parse_submission(form: SubmissionForm) -> AppResult<PaymentSubmission> {
    let SubmissionForm { fields, receipt } = form;
    let text = |key: &str| {
        fields
            .get(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };

    let mut missing = Vec::new();
    if receipt.as_ref().map_or(true, |file| file.bytes.is_empty()) {
        missing.push("receipt");
    }
    for key in [
        "name",
        "project",
        "block_lot",
        "amount",
        "payment_date",
        "payment_month",
        "reference_number",
    ] {
        if text(key).is_none() {
            missing.push(key);
        }
    }
    if !missing.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Missing required fields: {}.",
            missing.join(", ")
        )));
    }

    let amount = text("amount")
        .and_then(|raw| parse_optional_amount(&Value::String(raw)))
        .filter(|amount| *amount >= 0.0)
        .ok_or_else(|| {
            AppError::UnprocessableEntity("amount must be a non-negative number.".to_string())
        })?;
    let penalty = match text("penalty") {
        None => None,
        Some(raw) => Some(
            parse_optional_amount(&Value::String(raw))
                .filter(|penalty| *penalty >= 0.0)
                .ok_or_else(|| {
                    AppError::UnprocessableEntity(
                        "penalty must be a non-negative number.".to_string(),
                    )
                })?,
        ),
    };

    let payment_month = text("payment_month").unwrap_or_default();
    if month_label(&payment_month) == "N/A" || payment_month.len() != 7 {
        return Err(AppError::UnprocessableEntity(
            "payment_month must look like YYYY-MM.".to_string(),
        ));
    }
    let payment_type = match text("payment_type") {
        Some(raw) => Some(normalize_payment_type(Some(&raw))?),
        None => None,
    };

    Ok(PaymentSubmission {
        name: text("name").unwrap_or_default(),
        project: text("project").unwrap_or_default(),
        block_lot: text("block_lot").unwrap_or_default(),
        amount,
        penalty,
        payment_date: text("payment_date").unwrap_or_default(),
        payment_month,
        reference_number: text("reference_number").unwrap_or_default(),
        due_date: text("due_date").unwrap_or_else(|| "15th".to_string()),
        vat: text("vat").unwrap_or_else(|| "Non Vat".to_string()),
        payment_type,
        receipt: receipt.ok_or_else(|| AppError::BadRequest("Missing receipt.".to_string()))?,
    })
}

pub fn submission_row(submission: &PaymentSubmission, receipt_path: &str) -> Map<String, Value> {
    let mut row = Map::new();
    row.insert(
        "receipt_path".to_string(),
        Value::String(receipt_path.to_string()),
    );
    row.insert(
        "Block & Lot".to_string(),
        Value::String(submission.block_lot.clone()),
    );
    row.insert(
        "Payment Amount".to_string(),
        json_number(submission.amount),
    );
    row.insert(
        "Penalty Amount".to_string(),
        submission.penalty.map(json_number).unwrap_or(Value::Null),
    );
    row.insert(
        "Date of Payment".to_string(),
        Value::String(submission.payment_date.clone()),
    );
    row.insert(
        "Month of Payment".to_string(),
        Value::String(format!("{}-01", submission.payment_month)),
    );
    row.insert(
        "Due Date".to_string(),
        Value::String(submission.due_date.clone()),
    );
    row.insert("Name".to_string(), Value::String(submission.name.clone()));
    row.insert(
        "Project".to_string(),
        Value::String(submission.project.clone()),
    );
    row.insert(
        "Status".to_string(),
        Value::String(PaymentStatus::Pending.as_str().to_string()),
    );
    row.insert(
        "Reference Number".to_string(),
        Value::String(submission.reference_number.clone()),
    );
    row.insert("Vat".to_string(), Value::String(submission.vat.clone()));
    if let Some(payment_type) = submission.payment_type.as_ref() {
        row.insert(
            "Payment Type".to_string(),
            Value::String(payment_type.clone()),
        );
    }
    row.insert(
        "created_at".to_string(),
        Value::String(Utc::now().to_rfc3339()),
    );
    row
}

/// Stores the receipt first; the payment row is only written once the
/// upload succeeded.
pub async fn upload_payment(state: &AppState, submission: PaymentSubmission) -> AppResult<Value> {
    let pool = state.pool()?;
    let storage = state.receipt_storage()?;

    let extension = extension_of(&submission.receipt.file_name);
    let key = submission_key(
        &submission.project,
        &submission.name,
        extension.as_deref(),
        Utc::now().timestamp_millis(),
    );
    storage
        .put(
            ReceiptKind::Receipt,
            &key,
            submission.receipt.bytes.clone(),
            &submission.receipt.content_type,
        )
        .await?;

    let created = create_row(pool, "Payment", &submission_row(&submission, &key)).await?;
    state
        .changes
        .notify("Payment", ChangeOp::Insert, created.get("id"));
    tracing::info!(
        name = %submission.name,
        project = %submission.project,
        receipt = %key,
        "Payment submitted"
    );
    Ok(with_month_label(created))
}

pub fn build_update_patch(fields: &Map<String, Value>) -> AppResult<Map<String, Value>> {
    let unknown = fields
        .keys()
        .filter(|key| !EDITABLE_COLUMNS.contains(&key.as_str()))
        .cloned()
        .collect::<Vec<_>>();
    if !unknown.is_empty() {
        return Err(AppError::BadRequest(format!(
            "These payment fields cannot be edited: {}.",
            unknown.join(", ")
        )));
    }

    let name = fields
        .get("Name")
        .map(text_of)
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| AppError::UnprocessableEntity("Name is required.".to_string()))?;
    let amount = fields
        .get("Payment Amount")
        .and_then(parse_optional_amount)
        .ok_or_else(|| AppError::UnprocessableEntity("Payment Amount is required.".to_string()))?;

    let mut patch = Map::new();
    for (key, value) in fields {
        let coerced = match key.as_str() {
            "Name" => Value::String(name.trim().to_string()),
            "Payment Amount" => json_number(amount),
            "Penalty Amount" => parse_optional_amount(value)
                .map(json_number)
                .unwrap_or(Value::Null),
            _ => value.clone(),
        };
        patch.insert(key.clone(), coerced);
    }
    Ok(patch)
}

pub async fn update_payment(
    state: &AppState,
    id: &str,
    fields: &Map<String, Value>,
) -> AppResult<Value> {
    let pool = state.pool()?;
    let patch = build_update_patch(fields)?;
    let updated = update_row(pool, "Payment", id, &patch, "id").await?;
    state
        .changes
        .notify("Payment", ChangeOp::Update, updated.get("id"));
    Ok(with_month_label(updated))
}

pub async fn set_status(state: &AppState, id: &str, status: PaymentStatus) -> AppResult<Value> {
    let pool = state.pool()?;
    let mut patch = Map::new();
    patch.insert(
        "Status".to_string(),
        Value::String(status.as_str().to_string()),
    );
    let updated = update_row(pool, "Payment", id, &patch, "id").await?;
    state
        .changes
        .notify("Payment", ChangeOp::Update, updated.get("id"));
    tracing::info!(payment_id = id, status = status.as_str(), "Payment status changed");
    Ok(with_month_label(updated))
}

pub async fn delete_payment(state: &AppState, id: &str) -> AppResult<Value> {
    let pool = state.pool()?;
    let deleted = delete_row(pool, "Payment", id, "id").await?;
    state
        .changes
        .notify("Payment", ChangeOp::Delete, deleted.get("id"));
    Ok(deleted)
}

pub async fn attach_receipt(
    state: &AppState,
    id: &str,
    kind: ReceiptKind,
    file: UploadedFile,
) -> AppResult<Value> {
    let pool = state.pool()?;
    let storage = state.receipt_storage()?;
    let payment = get_row(pool, "Payment", id, "id").await?;
    let key = receipt_key_for(
        &payment,
        kind,
        &file.file_name,
        Utc::now().timestamp_millis(),
    )?;

    storage
        .put(kind, &key, file.bytes, &file.content_type)
        .await?;

    let mut patch = Map::new();
    patch.insert(kind.path_column().to_string(), Value::String(key));
    let updated = update_row(pool, "Payment", id, &patch, "id").await?;
    state
        .changes
        .notify("Payment", ChangeOp::Update, updated.get("id"));
    Ok(with_month_label(updated))
}

/// Storage key for a receipt attached to `payment`, built from the stored
/// project and name without trimming.
pub fn receipt_key_for(
    payment: &Value,
    kind: ReceiptKind,
    file_name: &str,
    unix_ms: i64,
) -> AppResult<String> {
    let name = value_raw_opt(payment, "Name")
        .ok_or_else(|| AppError::UnprocessableEntity("Payment has no name.".to_string()))?;
    let project = text_of(field(payment, "Project"));
    let extension = extension_of(file_name);
    Ok(attachment_key(
        &project,
        &name,
        kind,
        extension.as_deref(),
        unix_ms,
    ))
}

pub async fn download_receipt(
    state: &AppState,
    id: &str,
    kind: ReceiptKind,
) -> AppResult<StoredObject> {
    let pool = state.pool()?;
    let payment = get_row(pool, "Payment", id, "id").await?;
    let key = value_raw_opt(&payment, kind.path_column())
        .ok_or_else(|| AppError::NotFound("This payment has no such receipt.".to_string()))?;
    state.receipt_storage()?.get(kind, &key).await
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::{json, Map};

    use super::*;

    fn form(pairs: &[(&str, &str)], with_file: bool) -> SubmissionForm {
        SubmissionForm {
            fields: pairs
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
            receipt: with_file.then(|| UploadedFile {
                file_name: "gcash.png".to_string(),
                content_type: "image/png".to_string(),
                bytes: vec![1, 2, 3],
            }),
        }
    }

    fn complete_fields() -> Vec<(&'static str, &'static str)> {
        vec![
            ("name", " Ana Cruz "),
            ("project", "Havahills Estate"),
            ("block_lot", "Block 2 Lot 3"),
            ("amount", "15,000"),
            ("payment_date", "2025-04-10"),
            ("payment_month", "2025-04"),
            ("reference_number", "REF-1"),
        ]
    }

    #[test]
    fn reports_every_missing_field() {
        let error = parse_submission(form(&[("name", "Ana")], false)).unwrap_err();
        let message = error.to_string();
        assert!(message.contains("receipt"));
        assert!(message.contains("amount"));
        assert!(message.contains("reference_number"));
        assert!(!message.contains("name,"));
    }

    #[test]
    fn submission_applies_defaults() {
        let submission = parse_submission(form(&complete_fields(), true)).unwrap();
        assert_eq!(submission.name, "Ana Cruz");
        assert_eq!(submission.amount, 15_000.0);
        assert_eq!(submission.due_date, "15th");
        assert_eq!(submission.vat, "Non Vat");
        assert_eq!(submission.penalty, None);

        let row = submission_row(&submission, "Havahills Estate/Ana Cruz/Ana Cruz_1.png");
        assert_eq!(row["Status"], json!("Pending"));
        assert_eq!(row["Month of Payment"], json!("2025-04-01"));
        assert_eq!(row["Penalty Amount"], json!(null));
        assert!(row.get("Payment Type").is_none());
    }

    #[test]
    fn submission_rejects_bad_month_and_amount() {
        let mut fields = complete_fields();
        fields[5] = ("payment_month", "April");
        assert!(matches!(
            parse_submission(form(&fields, true)),
            Err(AppError::UnprocessableEntity(_))
        ));

        let mut fields = complete_fields();
        fields[3] = ("amount", "-5");
        assert!(matches!(
            parse_submission(form(&fields, true)),
            Err(AppError::UnprocessableEntity(_))
        ));
    }

    #[test]
    fn filters_payment_rows() {
        let row = json!({
            "Name": "Ana Cruz", "Project": "Havahills Estate", "Status": "Pending",
            "Date of Payment": "2025-04-10T08:00:00+08:00", "ar_receipt_path": null
        });
        let mut filters = PaymentFilters {
            search: Some("cruz".to_string()),
            project: Some("all".to_string()),
            status: Some("Pending".to_string()),
            date: NaiveDate::from_ymd_opt(2025, 4, 10),
            missing_ar_receipt: true,
        };
        assert!(matches_filters(&row, &filters));

        filters.status = Some("Approved".to_string());
        assert!(!matches_filters(&row, &filters));

        filters.status = None;
        filters.date = NaiveDate::from_ymd_opt(2025, 4, 11);
        assert!(!matches_filters(&row, &filters));

        filters.date = None;
        let with_ar = json!({"Name": "Ana Cruz", "ar_receipt_path": "x/y.png"});
        assert!(!matches_filters(&with_ar, &filters));
    }

    #[test]
    fn labels_payment_month() {
        let row = with_month_label(json!({"Month of Payment": "2025-04-01"}));
        assert_eq!(row["month_label"], json!("April 2025"));
        let row = with_month_label(json!({"Month of Payment": null}));
        assert_eq!(row["month_label"], json!("N/A"));
    }

    #[test]
    fn client_options_are_distinct_and_sorted() {
        let rows = vec![
            json!({"Name": "Carla", "Project": "Havahills Estate", "Block": "1", "Lot": 2}),
            json!({"Name": "Ana", "Project": "Living Water Subdivision", "Block": "4", "Lot": "9"}),
            json!({"Name": "Carla", "Project": "Havahills Estate", "Block": "1", "Lot": "2"}),
            json!({"Name": "", "Project": "Havahills Estate", "Block": "5", "Lot": "5"}),
        ];
        let options = dedupe_client_options(&rows);
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].name, "Ana");
        assert_eq!(options[1].block_lot, "Block 1 Lot 2");
    }

    #[test]
    fn update_requires_name_and_amount() {
        let mut fields = Map::new();
        fields.insert("Name".to_string(), json!("  "));
        fields.insert("Payment Amount".to_string(), json!(0));
        assert!(build_update_patch(&fields).is_err());

        fields.insert("Name".to_string(), json!("Ana"));
        fields.insert("Penalty Amount".to_string(), json!(""));
        let patch = build_update_patch(&fields).unwrap();
        assert_eq!(patch["Payment Amount"], json!(0.0));
        assert_eq!(patch["Penalty Amount"], json!(null));

        fields.remove("Payment Amount");
        assert!(build_update_patch(&fields).is_err());

        fields.insert("Payment Amount".to_string(), json!(1));
        fields.insert("Status".to_string(), json!("Approved"));
        assert!(matches!(
            build_update_patch(&fields),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn attachment_keys_use_the_stored_name() {
        let payment = json!({"Name": "Juan  Dela Cruz ", "Project": "Havahills Estate"});
        let key = receipt_key_for(&payment, ReceiptKind::Ar, "scan.PDF", 1_700_000_000_000).unwrap();
        assert_eq!(
            key,
            "Havahills Estate/Juan  Dela Cruz /Juan_Dela_Cruz__AR_1700000000000.pdf"
        );

        let nameless = json!({"Name": "  ", "Project": "Havahills Estate"});
        assert!(matches!(
            receipt_key_for(&nameless, ReceiptKind::Receipt, "scan.png", 1),
            Err(AppError::UnprocessableEntity(_))
        ));
    }
}
