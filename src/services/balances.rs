use std::cmp::Ordering;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::{
    error::{AppError, AppResult},
    repository::table_service::{create_row, delete_row, get_row, list_rows, update_row},
    services::{
        realtime::ChangeOp,
        values::{
            digits_of, field, format_php, json_number, parse_count, parse_optional_amount,
            text_of,
        },
    },
    state::AppState,
};

const MAX_BALANCE_ROWS: i64 = 10_000;

const AMOUNT_COLUMNS: &[&str] = &["Remaining Balance", "Amount", "TCP"];
const TEXT_COLUMNS: &[&str] = &[
    "Project",
    "Block",
    "Lot",
    "Name",
    "Months Paid",
    "MONTHS PAID",
    "Terms",
    "Due Date",
];
const DETAIL_COLUMNS: &[&str] = &[
    "Name",
    "Block",
    "Lot",
    "Project",
    "Terms",
    "TCP",
    "Amount",
    "Remaining Balance",
    "Months Paid",
    "MONTHS PAID",
    "Due Date",
];

pub const PAYMENT_TYPES: &[&str] = &[
    "GCASH", "SB-HRM", "SB-LWS", "SB-HHE", "CBS-LWS", "CBS-HHE", "cash",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BalanceSort {
    #[default]
    NameAsc,
    NameDesc,
    BlockLotAsc,
    BlockLotDesc,
}

impl BalanceSort {
    pub fn parse(raw: Option<&str>) -> AppResult<Self> {
        match raw.map(str::trim).filter(|value| !value.is_empty()) {
            None | Some("name-asc") => Ok(Self::NameAsc),
            Some("name-desc") => Ok(Self::NameDesc),
            Some("block-lot-asc") => Ok(Self::BlockLotAsc),
            Some("block-lot-desc") => Ok(Self::BlockLotDesc),
            Some(other) => Err(AppError::BadRequest(format!(
                "Unknown sort '{other}'. Use name-asc, name-desc, block-lot-asc or block-lot-desc."
            ))),
        }
    }
}

/// One payment posted against a balance.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentEntry {
    pub amount: f64,
    pub penalty: Option<f64>,
    pub payment_type: String,
    pub payment_month: Option<String>,
    pub due_date: String,
    /// Free-text `Months Paid` label, e.g. "April 2025".
    pub months_paid: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Statement {
    pub id: Value,
    pub name: String,
    pub project: String,
    pub block: String,
    pub lot: String,
    pub terms: String,
    pub tcp: Option<f64>,
    pub tcp_display: String,
    pub amount_paid: Option<f64>,
    pub amount_paid_display: String,
    pub remaining_balance: Option<f64>,
    pub remaining_balance_display: String,
    pub paid_percent: f64,
    pub months_paid: i64,
    pub months_total: i64,
    pub months_percent: f64,
    pub latest_payment: String,
    pub due_date: String,
    pub completed: bool,
}

pub async fn list_balances(
    pool: &sqlx::PgPool,
    search: Option<&str>,
    project: Option<&str>,
    sort: BalanceSort,
) -> AppResult<Vec<Value>> {
    let rows = list_rows(pool, "Balance", None, MAX_BALANCE_ROWS, 0, &[("Name", true)]).await?;

    let needle = search
        .map(|value| value.trim().to_lowercase())
        .filter(|value| !value.is_empty());
    let project = project
        .map(str::trim)
        .filter(|value| !value.is_empty() && !value.eq_ignore_ascii_case("all"));

    let mut balances = rows
        .into_iter()
        .map(normalize_balance)
        .filter(|row| {
            needle
                .as_deref()
                .map_or(true, |needle| matches_search(row, needle))
        })
        .filter(|row| project.map_or(true, |wanted| text_of(field(row, "Project")) == wanted))
        .collect::<Vec<_>>();

    sort_balances(&mut balances, sort);
    Ok(balances)
}

pub async fn get_balance(pool: &sqlx::PgPool, id: &str) -> AppResult<Value> {
    let row = get_row(pool, "Balance", id, "id").await?;
    Ok(normalize_balance(row))
}

pub async fn update_balance_details(
    state: &AppState,
    id: &str,
    fields: &Map<String, Value>,
) -> AppResult<Value> {
    let pool = state.pool()?;
    let patch = build_details_patch(fields)?;
    let updated = update_row(pool, "Balance", id, &patch, "id").await?;
    state
        .changes
        .notify("Balance", ChangeOp::Update, updated.get("id"));
    Ok(normalize_balance(updated))
}

pub async fn delete_balance(state: &AppState, id: &str) -> AppResult<Value> {
    let pool = state.pool()?;
    let deleted = delete_row(pool, "Balance", id, "id").await?;
    state
        .changes
        .notify("Balance", ChangeOp::Delete, deleted.get("id"));
    Ok(deleted)
}

/// Adds a payment to the running totals, then writes the ledger row. The two
/// writes are independent: a ledger failure leaves the balance updated.
pub async fn record_payment(state: &AppState, id: &str, entry: &PaymentEntry) -> AppResult<Value> {
    let pool = state.pool()?;
    let raw = get_row(pool, "Balance", id, "id").await?;
    let current = normalize_balance(raw.clone());
    if is_completed(&current) {
        return Err(AppError::Conflict(
            "This balance is already fully paid.".to_string(),
        ));
    }

    let (balance_patch, ledger_row) = apply_payment(&raw, entry);

    let updated = update_row(pool, "Balance", id, &balance_patch, "id").await?;
    state
        .changes
        .notify("Balance", ChangeOp::Update, updated.get("id"));

    let record = create_row(pool, "Payment Record", &ledger_row)
        .await
        .map_err(|error| ledger_write_error(id, error))?;
    state
        .changes
        .notify("Payment Record", ChangeOp::Insert, record.get("id"));

    tracing::info!(
        balance_id = id,
        amount = entry.amount,
        payment_type = %entry.payment_type,
        "Payment recorded against balance"
    );

    Ok(json!({
        "balance": normalize_balance(updated),
        "payment_record": record,
    }))
}

/// Any ledger failure after the balance write is a dependency error that says
/// the balance itself was saved.
fn ledger_write_error(balance_id: &str, error: AppError) -> AppError {
    tracing::error!(
        balance_id,
        error = %error,
        "Balance updated but payment record insert failed"
    );
    AppError::Dependency(
        "The balance was updated but the payment record could not be saved.".to_string(),
    )
}

pub async fn statement(pool: &sqlx::PgPool, id: &str) -> AppResult<Statement> {
    let balance = get_balance(pool, id).await?;
    Ok(build_statement(&balance))
}

/// Amounts parsed to numbers or null, the rest rendered as text, plus the
/// derived `completed` flag.
pub fn normalize_balance(row: Value) -> Value {
    let mut normalized = Map::new();
    normalized.insert("id".to_string(), field(&row, "id").clone());
    for column in AMOUNT_COLUMNS {
        let amount = parse_optional_amount(field(&row, column));
        normalized.insert(
            (*column).to_string(),
            amount.map(json_number).unwrap_or(Value::Null),
        );
    }
    for column in TEXT_COLUMNS {
        normalized.insert(
            (*column).to_string(),
            Value::String(text_of(field(&row, column))),
        );
    }
    let completed = is_completed(&Value::Object(normalized.clone()));
    normalized.insert("completed".to_string(), Value::Bool(completed));
    Value::Object(normalized)
}

/// Fully paid: the paid amount reached the contract price and every term
/// month is paid.
pub fn is_completed(row: &Value) -> bool {
    let amount = parse_optional_amount(field(row, "Amount"));
    let tcp = parse_optional_amount(field(row, "TCP"));
    let months_paid = text_of(field(row, "MONTHS PAID"));
    let terms = text_of(field(row, "Terms"));

    match (amount, tcp) {
        (Some(amount), Some(tcp)) => {
            amount == tcp && !terms.trim().is_empty() && months_paid.trim() == terms.trim()
        }
        _ => false,
    }
}

fn matches_search(row: &Value, needle_lower: &str) -> bool {
    ["Name", "Block", "Lot", "Project"].iter().any(|column| {
        text_of(field(row, column))
            .to_lowercase()
            .contains(needle_lower)
    })
}

pub fn sort_balances(rows: &mut [Value], sort: BalanceSort) {
    let by_name = |a: &Value, b: &Value| {
        text_of(field(a, "Name"))
            .to_lowercase()
            .cmp(&text_of(field(b, "Name")).to_lowercase())
    };
    let by_block_lot = |a: &Value, b: &Value| -> Ordering {
        let key = |row: &Value| {
            (
                digits_of(&text_of(field(row, "Block"))),
                digits_of(&text_of(field(row, "Lot"))),
            )
        };
        key(a).cmp(&key(b))
    };

    match sort {
        BalanceSort::NameAsc => rows.sort_by(by_name),
        BalanceSort::NameDesc => rows.sort_by(|a, b| by_name(b, a)),
        BalanceSort::BlockLotAsc => rows.sort_by(by_block_lot),
        BalanceSort::BlockLotDesc => rows.sort_by(|a, b| by_block_lot(b, a)),
    }
}

pub fn build_details_patch(fields: &Map<String, Value>) -> AppResult<Map<String, Value>> {
    let unknown = fields
        .keys()
        .filter(|key| !DETAIL_COLUMNS.contains(&key.as_str()))
        .cloned()
        .collect::<Vec<_>>();
    if !unknown.is_empty() {
        return Err(AppError::BadRequest(format!(
            "These balance fields cannot be edited: {}.",
            unknown.join(", ")
        )));
    }

    let mut patch = Map::new();
    for (key, value) in fields {
        let coerced = if AMOUNT_COLUMNS.contains(&key.as_str()) {
            parse_optional_amount(value)
                .map(json_number)
                .unwrap_or(Value::Null)
        } else {
            value.clone()
        };
        patch.insert(key.clone(), coerced);
    }
    Ok(patch)
}

/// Canonical spelling of a payment type; blank means cash.
pub fn normalize_payment_type(raw: Option<&str>) -> AppResult<String> {
    let Some(wanted) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok("cash".to_string());
    };
    PAYMENT_TYPES
        .iter()
        .find(|known| known.eq_ignore_ascii_case(wanted))
        .map(|known| (*known).to_string())
        .ok_or_else(|| {
            AppError::UnprocessableEntity(format!(
                "Unknown payment type '{wanted}'. Expected one of: {}.",
                PAYMENT_TYPES.join(", ")
            ))
        })
}

/// Balance patch and `Payment Record` row for one payment against the
/// stored (unnormalized) balance row.
pub fn apply_payment(
    balance: &Value,
    entry: &PaymentEntry,
) -> (Map<String, Value>, Map<String, Value>) {
    let current_amount = parse_optional_amount(field(balance, "Amount")).unwrap_or(0.0);
    let current_remaining =
        parse_optional_amount(field(balance, "Remaining Balance")).unwrap_or(0.0);
    let months_paid = parse_count(field(balance, "MONTHS PAID")) + 1;

    let mut patch = Map::new();
    patch.insert(
        "Amount".to_string(),
        json_number(current_amount + entry.amount),
    );
    patch.insert(
        "Remaining Balance".to_string(),
        json_number(current_remaining - entry.amount),
    );
    patch.insert(
        "MONTHS PAID".to_string(),
        Value::String(months_paid.to_string()),
    );
    patch.insert(
        "Due Date".to_string(),
        Value::String(entry.due_date.clone()),
    );
    if let Some(label) = &entry.months_paid {
        patch.insert("Months Paid".to_string(), Value::String(label.clone()));
    }

    let mut record = Map::new();
    for column in ["Name", "Project", "Block", "Lot"] {
        record.insert(column.to_string(), field(balance, column).clone());
    }
    record.insert("Amount".to_string(), json_number(entry.amount));
    record.insert(
        "Payment Type".to_string(),
        Value::String(entry.payment_type.clone()),
    );
    record.insert(
        "Payment for the Month of".to_string(),
        entry
            .payment_month
            .clone()
            .map(Value::String)
            .unwrap_or(Value::Null),
    );
    record.insert(
        "Due Date".to_string(),
        Value::String(entry.due_date.clone()),
    );
    if let Some(penalty) = entry.penalty.filter(|penalty| *penalty > 0.0) {
        record.insert("Penalty".to_string(), json_number(penalty));
    }

    (patch, record)
}

pub fn build_statement(balance: &Value) -> Statement {
    let tcp = parse_optional_amount(field(balance, "TCP"));
    let paid = parse_optional_amount(field(balance, "Amount"));
    let remaining = parse_optional_amount(field(balance, "Remaining Balance"));
    let months_paid = parse_count(field(balance, "MONTHS PAID"));
    let months_total = parse_count(field(balance, "Terms"));

    Statement {
        id: field(balance, "id").clone(),
        name: text_of(field(balance, "Name")),
        project: text_of(field(balance, "Project")),
        block: text_of(field(balance, "Block")),
        lot: text_of(field(balance, "Lot")),
        terms: text_of(field(balance, "Terms")),
        tcp,
        tcp_display: format_php(tcp.unwrap_or(0.0)),
        amount_paid: paid,
        amount_paid_display: format_php(paid.unwrap_or(0.0)),
        remaining_balance: remaining,
        remaining_balance_display: format_php(remaining.unwrap_or(0.0)),
        paid_percent: percent(paid.unwrap_or(0.0), tcp.unwrap_or(0.0)),
        months_paid,
        months_total,
        months_percent: percent(months_paid as f64, months_total as f64),
        latest_payment: text_of(field(balance, "Months Paid")),
        due_date: text_of(field(balance, "Due Date")),
        completed: is_completed(balance),
    }
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole == 0.0 || !whole.is_finite() {
        return 0.0;
    }
    (part / whole) * 100.0
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map, Value};

    use super::*;

    fn entry(amount: f64) -> PaymentEntry {
        PaymentEntry {
            amount,
            penalty: None,
            payment_type: "cash".to_string(),
            payment_month: Some("2025-04".to_string()),
            due_date: "15th".to_string(),
            months_paid: None,
        }
    }

    #[test]
    fn normalizes_amounts_and_text() {
        let row = normalize_balance(json!({
            "id": 3,
            "Name": "Ana",
            "Remaining Balance": "1,000,000",
            "Amount": 0,
            "TCP": "",
            "MONTHS PAID": 4,
            "Terms": null,
            "Extra": "dropped"
        }));
        assert_eq!(row["Remaining Balance"], json!(1_000_000.0));
        assert_eq!(row["Amount"], json!(0.0));
        assert_eq!(row["TCP"], Value::Null);
        assert_eq!(row["MONTHS PAID"], json!("4"));
        assert_eq!(row["Terms"], json!(""));
        assert_eq!(row["completed"], json!(false));
        assert!(row.get("Extra").is_none());
    }

    #[test]
    fn completion_needs_full_amount_and_terms() {
        let done = json!({"Amount": "1,200", "TCP": 1200, "MONTHS PAID": "12", "Terms": 12});
        assert!(is_completed(&done));

        let short = json!({"Amount": 1100, "TCP": 1200, "MONTHS PAID": "12", "Terms": "12"});
        assert!(!is_completed(&short));

        let empty = json!({"Amount": null, "TCP": null, "MONTHS PAID": "", "Terms": ""});
        assert!(!is_completed(&empty));
    }

    #[test]
    fn sorts_by_name_and_block_lot() {
        let mut rows = vec![
            json!({"Name": "carlos", "Block": "10", "Lot": "2"}),
            json!({"Name": "Ana", "Block": "2", "Lot": "11"}),
            json!({"Name": "Berto", "Block": "2", "Lot": "3"}),
        ];
        sort_balances(&mut rows, BalanceSort::NameAsc);
        assert_eq!(rows[0]["Name"], json!("Ana"));
        assert_eq!(rows[2]["Name"], json!("carlos"));

        sort_balances(&mut rows, BalanceSort::BlockLotAsc);
        assert_eq!(rows[0]["Name"], json!("Berto"));
        assert_eq!(rows[1]["Name"], json!("Ana"));

        sort_balances(&mut rows, BalanceSort::BlockLotDesc);
        assert_eq!(rows[0]["Name"], json!("carlos"));

        assert_eq!(BalanceSort::parse(None).unwrap(), BalanceSort::NameAsc);
        assert!(BalanceSort::parse(Some("price")).is_err());
    }

    #[test]
    fn payment_updates_totals_and_builds_ledger_row() {
        let balance = json!({
            "Name": "Ana", "Project": "Havahills Estate", "Block": "2", "Lot": "3",
            "Amount": "15,000", "Remaining Balance": 885000, "MONTHS PAID": "1"
        });
        let (patch, record) = apply_payment(&balance, &entry(15_000.0));
        assert_eq!(patch["Amount"], json!(30_000.0));
        assert_eq!(patch["Remaining Balance"], json!(870_000.0));
        assert_eq!(patch["MONTHS PAID"], json!("2"));
        assert_eq!(patch["Due Date"], json!("15th"));

        assert_eq!(record["Name"], json!("Ana"));
        assert_eq!(record["Amount"], json!(15_000.0));
        assert_eq!(record["Payment for the Month of"], json!("2025-04"));
        assert!(record.get("Penalty").is_none());
    }

    #[test]
    fn payment_on_empty_balance_starts_from_zero() {
        let mut with_penalty = entry(500.0);
        with_penalty.penalty = Some(50.0);
        let (patch, record) = apply_payment(&json!({"MONTHS PAID": "abc"}), &with_penalty);
        assert_eq!(patch["Amount"], json!(500.0));
        assert_eq!(patch["Remaining Balance"], json!(-500.0));
        assert_eq!(patch["MONTHS PAID"], json!("1"));
        assert_eq!(record["Penalty"], json!(50.0));
    }

    #[test]
    fn payment_types_are_canonical() {
        assert_eq!(normalize_payment_type(None).unwrap(), "cash");
        assert_eq!(normalize_payment_type(Some("gcash")).unwrap(), "GCASH");
        assert_eq!(normalize_payment_type(Some("CASH")).unwrap(), "cash");
        assert!(matches!(
            normalize_payment_type(Some("cheque")),
            Err(AppError::UnprocessableEntity(_))
        ));
    }

    #[test]
    fn statement_percentages_guard_zero() {
        let statement = build_statement(&json!({
            "id": 1, "Name": "Ana", "TCP": 1000, "Amount": 250,
            "Remaining Balance": 750, "MONTHS PAID": "3", "Terms": "12",
            "Months Paid": "March 2025"
        }));
        assert_eq!(statement.paid_percent, 25.0);
        assert_eq!(statement.months_percent, 25.0);
        assert_eq!(statement.tcp_display, "₱1,000.00");
        assert_eq!(statement.latest_payment, "March 2025");

        let empty = build_statement(&json!({"id": 2}));
        assert_eq!(empty.paid_percent, 0.0);
        assert_eq!(empty.months_percent, 0.0);
        assert_eq!(empty.remaining_balance, None);
    }

    #[test]
    fn details_patch_limits_columns() {
        let mut fields = Map::new();
        fields.insert("TCP".to_string(), json!("2,000"));
        fields.insert("Remaining Balance".to_string(), json!(""));
        let patch = build_details_patch(&fields).unwrap();
        assert_eq!(patch["TCP"], json!(2000.0));
        assert_eq!(patch["Remaining Balance"], Value::Null);

        fields.insert("Email".to_string(), json!("x@example.com"));
        assert!(build_details_patch(&fields).is_err());
    }

    #[test]
    fn payment_writes_months_paid_label_when_given() {
        let balance = json!({"Amount": 1000, "Remaining Balance": 5000, "MONTHS PAID": "1",
            "Months Paid": "March 2025"});
        let mut labelled = entry(1000.0);
        labelled.months_paid = Some("April 2025".to_string());
        let (patch, _) = apply_payment(&balance, &labelled);
        assert_eq!(patch["Months Paid"], json!("April 2025"));

        let (patch, _) = apply_payment(&balance, &entry(1000.0));
        assert!(patch.get("Months Paid").is_none());

        let mut updated = balance.clone();
        for (key, value) in apply_payment(&balance, &labelled).0 {
            updated[key] = value;
        }
        assert_eq!(build_statement(&updated).latest_payment, "April 2025");
    }

    #[test]
    fn ledger_failure_reports_saved_balance() {
        let error = ledger_write_error("9", AppError::Conflict("duplicate".to_string()));
        assert_eq!(error.status_code(), axum::http::StatusCode::BAD_GATEWAY);
        assert!(error.to_string().contains("balance was updated"));
    }
}
