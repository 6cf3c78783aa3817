use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::{
    error::{AppError, AppResult},
    repository::table_service::{
        count_rows, create_row, delete_rows_where, get_row, list_rows, update_row,
        update_rows_where,
    },
    services::{
        realtime::ChangeOp,
        subdivision::Project,
        values::{field, json_number, parse_numeric, text_of, value_raw_opt, value_str},
    },
    state::AppState,
};

const MAX_PROPERTY_ROWS: i64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientOutcome {
    Created,
    Existing,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceOutcome {
    Inserted,
    Updated,
    Skipped,
    Failed,
}

#[derive(Debug, Serialize)]
pub struct SaleOutcome {
    pub property: Value,
    pub client: ClientOutcome,
    pub balance: BalanceOutcome,
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ReopenOutcome {
    pub property: Value,
    pub clients_deleted: u64,
    pub documents_deleted: u64,
    pub balances_cleared: usize,
    pub warnings: Vec<String>,
}

pub async fn list_properties(
    pool: &sqlx::PgPool,
    project: Project,
    search: Option<&str>,
    status: Option<&str>,
) -> AppResult<Value> {
    let rows = list_rows(
        pool,
        project.table(),
        None,
        MAX_PROPERTY_ROWS,
        0,
        &[("Block", true), ("Lot", true)],
    )
    .await?;

    let normalized = rows
        .into_iter()
        .map(|row| normalize_property(project, row))
        .collect::<Vec<_>>();
    let counts = status_counts(&normalized);

    let needle = search
        .map(|value| value.trim().to_lowercase())
        .filter(|value| !value.is_empty());
    let data = normalized
        .into_iter()
        .filter(|row| {
            needle
                .as_deref()
                .map_or(true, |needle| matches_search(project, row, needle))
        })
        .filter(|row| matches_status(row, status))
        .collect::<Vec<_>>();

    Ok(json!({
        "project": project.table(),
        "data": data,
        "counts": counts,
    }))
}

pub async fn get_property(pool: &sqlx::PgPool, project: Project, id: &str) -> AppResult<Value> {
    let row = get_row(pool, project.table(), id, "id").await?;
    Ok(normalize_property(project, row))
}

pub async fn update_property(
    state: &AppState,
    project: Project,
    id: &str,
    fields: &Map<String, Value>,
) -> AppResult<Value> {
    let pool = state.pool()?;
    let patch = build_edit_patch(project, fields)?;
    let updated = update_row(pool, project.table(), id, &patch, "id").await?;
    state
        .changes
        .notify(project.table(), ChangeOp::Update, updated.get("id"));
    Ok(normalize_property(project, updated))
}

/// Marks an available lot as sold, then brings the buyer's client record and
/// balance row in line. Only the property write is required to succeed.
pub async fn sell_property(
    state: &AppState,
    project: Project,
    id: &str,
    overrides: &Map<String, Value>,
) -> AppResult<SaleOutcome> {
    let pool = state.pool()?;
    let existing = get_row(pool, project.table(), id, "id").await?;
    ensure_sellable(&existing)?;

    let today = chrono::Utc::now()
        .with_timezone(&state.config.business_timezone)
        .date_naive();
    let snapshot = build_sale_snapshot(project, &existing, overrides, today)?;

    let property = update_row(pool, project.table(), id, &snapshot, "id").await?;
    state
        .changes
        .notify(project.table(), ChangeOp::Update, property.get("id"));
    tracing::info!(project = project.table(), property_id = id, "Property sold");

    let mut warnings = Vec::new();
    let Some(buyer) = sale_buyer(project, &snapshot) else {
        return Ok(SaleOutcome {
            property: normalize_property(project, property),
            client: ClientOutcome::Skipped,
            balance: BalanceOutcome::Skipped,
            warnings,
        });
    };

    let client = ensure_client(state, pool, &buyer, &mut warnings).await;
    let balance = seed_balance(state, pool, project, &snapshot, &buyer, &mut warnings).await;

    Ok(SaleOutcome {
        property: normalize_property(project, property),
        client,
        balance,
        warnings,
    })
}

async fn ensure_client(
    state: &AppState,
    pool: &sqlx::PgPool,
    buyer: &str,
    warnings: &mut Vec<String>,
) -> ClientOutcome {
    let filters = name_filter(buyer);
    match count_rows(pool, "Clients", Some(&filters)).await {
        Ok(total) if total > 0 => return ClientOutcome::Existing,
        Ok(_) => {}
        Err(error) => {
            // An unknown lookup result still falls through to the insert.
            tracing::warn!(client = buyer, error = %error, "Client lookup failed");
            warnings.push(format!("Client lookup failed: {error}"));
        }
    }

    let mut record = Map::new();
    record.insert("Name".to_string(), Value::String(buyer.to_string()));
    match create_row(pool, "Clients", &record).await {
        Ok(created) => {
            state
                .changes
                .notify("Clients", ChangeOp::Insert, created.get("id"));
            ClientOutcome::Created
        }
        Err(error) => {
            tracing::warn!(client = buyer, error = %error, "Client insert failed");
            warnings.push(format!("Client record was not saved: {error}"));
            ClientOutcome::Failed
        }
    }
}

async fn seed_balance(
    state: &AppState,
    pool: &sqlx::PgPool,
    project: Project,
    snapshot: &Map<String, Value>,
    buyer: &str,
    warnings: &mut Vec<String>,
) -> BalanceOutcome {
    let mut filters = Map::new();
    filters.insert(
        "Project".to_string(),
        Value::String(project.table().to_string()),
    );
    filters.insert(
        "Block".to_string(),
        Value::String(text_of(snapshot.get("Block").unwrap_or(&Value::Null))),
    );
    filters.insert(
        "Lot".to_string(),
        Value::String(text_of(snapshot.get("Lot").unwrap_or(&Value::Null))),
    );

    let seed = balance_seed_fields(project, snapshot, buyer);
    let existing = match count_rows(pool, "Balance", Some(&filters)).await {
        Ok(total) => total,
        Err(error) => {
            tracing::warn!(client = buyer, error = %error, "Balance lookup failed");
            warnings.push(format!("Balance lookup failed: {error}"));
            return BalanceOutcome::Failed;
        }
    };

    if existing > 0 {
        return match update_rows_where(pool, "Balance", &filters, &seed).await {
            Ok(rows) => {
                for row in &rows {
                    state
                        .changes
                        .notify("Balance", ChangeOp::Update, row.get("id"));
                }
                BalanceOutcome::Updated
            }
            Err(error) => {
                tracing::warn!(client = buyer, error = %error, "Balance update failed");
                warnings.push(format!("Balance was not updated: {error}"));
                BalanceOutcome::Failed
            }
        };
    }

    let mut record = seed;
    for (key, value) in filters {
        record.insert(key, value);
    }
    match create_row(pool, "Balance", &record).await {
        Ok(created) => {
            state
                .changes
                .notify("Balance", ChangeOp::Insert, created.get("id"));
            BalanceOutcome::Inserted
        }
        Err(error) => {
            tracing::warn!(client = buyer, error = %error, "Balance insert failed");
            warnings.push(format!("Balance was not created: {error}"));
            BalanceOutcome::Failed
        }
    }
}

/// Returns a sold lot to the available pool and detaches its buyer's
/// client, documents and balance.
pub async fn reopen_property(
    state: &AppState,
    project: Project,
    id: &str,
) -> AppResult<ReopenOutcome> {
    let pool = state.pool()?;
    let existing = get_row(pool, project.table(), id, "id").await?;
    let buyer = ensure_reopenable(project, &existing)?;

    let mut warnings = Vec::new();
    let filters = name_filter(&buyer);

    let clients_deleted = match delete_rows_where(pool, "Clients", &filters).await {
        Ok(count) => {
            if count > 0 {
                state.changes.notify("Clients", ChangeOp::Delete, None);
            }
            count
        }
        Err(error) => {
            tracing::warn!(client = %buyer, error = %error, "Client delete failed");
            warnings.push(format!("Client record was not removed: {error}"));
            0
        }
    };

    let documents_deleted = match delete_rows_where(pool, "Documents", &filters).await {
        Ok(count) => {
            if count > 0 {
                state.changes.notify("Documents", ChangeOp::Delete, None);
            }
            count
        }
        Err(error) => {
            tracing::warn!(client = %buyer, error = %error, "Document delete failed");
            warnings.push(format!("Documents were not removed: {error}"));
            0
        }
    };

    let balances_cleared =
        match update_rows_where(pool, "Balance", &filters, &balance_release_fields()).await {
            Ok(rows) => {
                for row in &rows {
                    state
                        .changes
                        .notify("Balance", ChangeOp::Update, row.get("id"));
                }
                rows.len()
            }
            Err(error) => {
                tracing::warn!(client = %buyer, error = %error, "Balance release failed");
                warnings.push(format!("Balance was not cleared: {error}"));
                0
            }
        };

    let property = update_row(
        pool,
        project.table(),
        id,
        &build_reopen_patch(project),
        "id",
    )
    .await?;
    state
        .changes
        .notify(project.table(), ChangeOp::Update, property.get("id"));
    tracing::info!(project = project.table(), property_id = id, "Property reopened");

    Ok(ReopenOutcome {
        property: normalize_property(project, property),
        clients_deleted,
        documents_deleted,
        balances_cleared,
        warnings,
    })
}

/// Numeric columns become numbers, missing text becomes `""`.
pub fn normalize_property(project: Project, row: Value) -> Value {
    let Value::Object(mut object) = row else {
        return row;
    };
    for column in project.numeric_columns() {
        let parsed = parse_numeric(object.get(*column).unwrap_or(&Value::Null));
        object.insert((*column).to_string(), json_number(parsed));
    }
    for column in project.text_columns() {
        let entry = object
            .entry((*column).to_string())
            .or_insert(Value::Null);
        if entry.is_null() {
            *entry = Value::String(String::new());
        }
    }
    Value::Object(object)
}

pub fn matches_search(project: Project, row: &Value, needle_lower: &str) -> bool {
    project.search_columns().iter().any(|column| {
        text_of(field(row, column))
            .to_lowercase()
            .contains(needle_lower)
    })
}

pub fn matches_status(row: &Value, status: Option<&str>) -> bool {
    match status.map(str::trim).filter(|value| !value.is_empty()) {
        None => true,
        Some(wanted) if wanted.eq_ignore_ascii_case("all") => true,
        Some(wanted) => status_is(row, wanted),
    }
}

pub fn ensure_sellable(row: &Value) -> AppResult<()> {
    if status_is(row, "available") {
        return Ok(());
    }
    Err(AppError::Conflict(format!(
        "Only available lots can be sold (current status: '{}').",
        value_str(row, "Status")
    )))
}

/// Checks a lot can be reopened and returns its buyer name as stored, so the
/// name matches the client, document and balance rows written at sale time.
pub fn ensure_reopenable(project: Project, row: &Value) -> AppResult<String> {
    if !status_is(row, "sold") {
        return Err(AppError::Conflict(format!(
            "Only sold lots can be reopened (current status: '{}').",
            value_str(row, "Status")
        )));
    }
    value_raw_opt(row, project.buyer_column()).ok_or_else(|| {
        AppError::BadRequest("This lot has no buyer name to release.".to_string())
    })
}

/// The buyer named in a sale snapshot, as stored; `None` when blank.
pub fn sale_buyer(project: Project, snapshot: &Map<String, Value>) -> Option<String> {
    snapshot
        .get(project.buyer_column())
        .map(text_of)
        .filter(|name| !name.trim().is_empty())
}

fn status_is(row: &Value, wanted: &str) -> bool {
    value_str(row, "Status").eq_ignore_ascii_case(wanted.trim())
}

/// Row counts per lower-cased status, plus `all`.
pub fn status_counts(rows: &[Value]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    counts.insert("all".to_string(), rows.len());
    for row in rows {
        let status = value_str(row, "Status").to_lowercase();
        if status.is_empty() {
            continue;
        }
        *counts.entry(status).or_insert(0) += 1;
    }
    counts
}

pub fn build_edit_patch(
    project: Project,
    fields: &Map<String, Value>,
) -> AppResult<Map<String, Value>> {
    let editable = project.editable_columns();
    let unknown = fields
        .keys()
        .filter(|key| !editable.contains(&key.as_str()))
        .cloned()
        .collect::<Vec<_>>();
    if !unknown.is_empty() {
        return Err(AppError::BadRequest(format!(
            "These fields cannot be edited: {}.",
            unknown.join(", ")
        )));
    }

    let mut patch = Map::new();
    for (key, value) in fields {
        let coerced = if project.is_numeric_column(key) {
            json_number(parse_numeric(value))
        } else if value.is_null() {
            Value::String(String::new())
        } else {
            value.clone()
        };
        patch.insert(key.clone(), coerced);
    }
    Ok(patch)
}

/// The full column set written when a lot is sold: the stored row with the
/// operator's overrides applied, blanks defaulted and `Status = Sold`.
pub fn build_sale_snapshot(
    project: Project,
    existing: &Value,
    overrides: &Map<String, Value>,
    today: NaiveDate,
) -> AppResult<Map<String, Value>> {
    let columns = project.snapshot_columns();
    let unknown = overrides
        .keys()
        .filter(|key| !columns.contains(&key.as_str()))
        .cloned()
        .collect::<Vec<_>>();
    if !unknown.is_empty() {
        return Err(AppError::BadRequest(format!(
            "These fields are not part of a sale: {}.",
            unknown.join(", ")
        )));
    }

    let mut snapshot = Map::new();
    for column in columns {
        let value = overrides
            .get(*column)
            .unwrap_or_else(|| field(existing, column));
        let resolved = match *column {
            "Status" => Value::String("Sold".to_string()),
            "Block" | "Lot" => value.clone(),
            "Date of Reservation" if is_blank(value) => {
                Value::String(today.format("%Y-%m-%d").to_string())
            }
            column if project.is_numeric_column(column) => json_number(parse_numeric(value)),
            _ if is_blank(value) => Value::String(String::new()),
            _ => value.clone(),
        };
        snapshot.insert((*column).to_string(), resolved);
    }
    Ok(snapshot)
}

pub fn balance_seed_fields(
    project: Project,
    snapshot: &Map<String, Value>,
    buyer: &str,
) -> Map<String, Value> {
    let seed = project.balance_seed();
    let mut fields = Map::new();
    fields.insert("Name".to_string(), Value::String(buyer.to_string()));
    fields.insert(
        "Remaining Balance".to_string(),
        snapshot
            .get(seed.remaining_balance)
            .cloned()
            .unwrap_or(Value::Null),
    );
    fields.insert(
        "Amount".to_string(),
        snapshot.get(seed.amount).cloned().unwrap_or(Value::Null),
    );
    fields.insert("Months Paid".to_string(), Value::String("0".to_string()));
    fields.insert("MONTHS PAID".to_string(), json!(0));
    fields
}

fn balance_release_fields() -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("Name".to_string(), Value::String(String::new()));
    fields.insert("Remaining Balance".to_string(), Value::Null);
    fields.insert("Amount".to_string(), Value::Null);
    fields.insert("Months Paid".to_string(), Value::String(String::new()));
    fields.insert("MONTHS PAID".to_string(), Value::Null);
    fields
}

pub fn build_reopen_patch(project: Project) -> Map<String, Value> {
    let mut patch = Map::new();
    patch.insert("Status".to_string(), Value::String("Available".to_string()));
    for column in project.reopen_clear_columns() {
        patch.insert((*column).to_string(), Value::String(String::new()));
    }
    patch
}

fn name_filter(name: &str) -> Map<String, Value> {
    let mut filters = Map::new();
    filters.insert("Name".to_string(), Value::String(name.to_string()));
    filters
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::{json, Map, Value};

    use super::*;

    fn lw_row() -> Value {
        json!({
            "id": 7,
            "Block": "3",
            "Lot": 12,
            "Owner": null,
            "Status": "Available",
            "Net Contract Price": "1,250,000.00",
            "First MA": "₱ 20,833.33",
            "Lot Area": "150 sqm",
            "Sales Director": "Someone",
            "Term": null
        })
    }

    #[test]
    fn normalizes_numeric_and_text_columns() {
        let row = normalize_property(Project::LivingWater, lw_row());
        assert_eq!(row["Net Contract Price"], json!(1_250_000.0));
        assert_eq!(row["Lot Area"], json!(150.0));
        assert_eq!(row["TCP"], json!(0.0));
        assert_eq!(row["Owner"], json!(""));
        assert_eq!(row["Realty"], json!(""));
        assert_eq!(row["Block"], json!("3"));
    }

    #[test]
    fn searches_project_columns_case_insensitively() {
        let row = json!({"Block": "3", "Lot": "12", "Buyers Name": "Maria Santos", "Broker": ""});
        assert!(matches_search(Project::Havahills, &row, "santos"));
        assert!(matches_search(Project::Havahills, &row, "12"));
        assert!(!matches_search(Project::Havahills, &row, "owner"));
    }

    #[test]
    fn filters_and_counts_statuses() {
        let rows = vec![
            json!({"Status": "Available"}),
            json!({"Status": "sold"}),
            json!({"Status": "Sold"}),
            json!({"Status": null}),
        ];
        let counts = status_counts(&rows);
        assert_eq!(counts.get("all"), Some(&4));
        assert_eq!(counts.get("sold"), Some(&2));
        assert_eq!(counts.get("available"), Some(&1));

        assert!(matches_status(&rows[1], Some("SOLD")));
        assert!(matches_status(&rows[0], Some("all")));
        assert!(matches_status(&rows[0], None));
        assert!(!matches_status(&rows[0], Some("sold")));
    }

    #[test]
    fn sale_snapshot_defaults_blanks_and_marks_sold() {
        let mut overrides = Map::new();
        overrides.insert("Owner".to_string(), json!("Juan Dela Cruz"));
        let today = NaiveDate::from_ymd_opt(2025, 4, 15).unwrap();

        let snapshot =
            build_sale_snapshot(Project::LivingWater, &lw_row(), &overrides, today).unwrap();
        assert_eq!(snapshot["Status"], json!("Sold"));
        assert_eq!(snapshot["Owner"], json!("Juan Dela Cruz"));
        assert_eq!(snapshot["Term"], json!(""));
        assert_eq!(snapshot["Date of Reservation"], json!("2025-04-15"));
        assert_eq!(snapshot["Net Contract Price"], json!(1_250_000.0));
        assert_eq!(snapshot["Reservation"], json!(0.0));
        assert_eq!(snapshot["Lot"], json!(12));
        assert!(!snapshot.contains_key("Sales Director"));
        assert!(!snapshot.contains_key("id"));
    }

    #[test]
    fn sale_snapshot_keeps_existing_reservation_date() {
        let row = json!({"Block": "1", "Lot": "2", "Date of Reservation": "2024-12-01"});
        let today = NaiveDate::from_ymd_opt(2025, 4, 15).unwrap();
        let snapshot = build_sale_snapshot(Project::Havahills, &row, &Map::new(), today).unwrap();
        assert_eq!(snapshot["Date of Reservation"], json!("2024-12-01"));
        assert_eq!(snapshot["Sales Director"], json!(""));
    }

    #[test]
    fn sale_rejects_unknown_overrides() {
        let mut overrides = Map::new();
        overrides.insert("Year".to_string(), json!(2025));
        let today = NaiveDate::from_ymd_opt(2025, 4, 15).unwrap();
        assert!(build_sale_snapshot(Project::LivingWater, &lw_row(), &overrides, today).is_err());
    }

    #[test]
    fn balance_seed_uses_project_columns() {
        let today = NaiveDate::from_ymd_opt(2025, 4, 15).unwrap();
        let snapshot =
            build_sale_snapshot(Project::LivingWater, &lw_row(), &Map::new(), today).unwrap();
        let seed = balance_seed_fields(Project::LivingWater, &snapshot, "Juan");
        assert_eq!(seed["Name"], json!("Juan"));
        assert_eq!(seed["Remaining Balance"], json!(1_250_000.0));
        assert_eq!(seed["Amount"], json!(20_833.33));
        assert_eq!(seed["Months Paid"], json!("0"));
        assert_eq!(seed["MONTHS PAID"], json!(0));

        let hh = json!({"TCP": 900000, "1ST MA": "15000"});
        let snapshot = build_sale_snapshot(Project::Havahills, &hh, &Map::new(), today).unwrap();
        let seed = balance_seed_fields(Project::Havahills, &snapshot, "Maria");
        assert_eq!(seed["Remaining Balance"], json!(900_000.0));
        assert_eq!(seed["Amount"], json!(15_000.0));
    }

    #[test]
    fn reopen_clears_buyer_columns() {
        let patch = build_reopen_patch(Project::Havahills);
        assert_eq!(patch["Status"], json!("Available"));
        assert_eq!(patch["Buyers Name"], json!(""));
        assert_eq!(patch["Mode of Payment"], json!(""));
        assert!(!patch.contains_key("Owner"));

        let patch = build_reopen_patch(Project::LivingWater);
        assert_eq!(patch["Broker / Realty"], json!(""));
        assert!(!patch.contains_key("Sales Director"));
    }

    #[test]
    fn edit_patch_accepts_only_editable_columns() {
        let mut fields = Map::new();
        fields.insert("TCP".to_string(), json!("1,000"));
        fields.insert("Owner".to_string(), Value::Null);
        let patch = build_edit_patch(Project::LivingWater, &fields).unwrap();
        assert_eq!(patch["TCP"], json!(1000.0));
        assert_eq!(patch["Owner"], json!(""));

        fields.insert("Status".to_string(), json!("Sold"));
        assert!(matches!(
            build_edit_patch(Project::LivingWater, &fields),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn only_available_lots_can_be_sold() {
        assert!(ensure_sellable(&json!({"Status": "available"})).is_ok());
        assert!(ensure_sellable(&json!({"Status": " Available "})).is_ok());
        for status in [json!("Sold"), json!("Reserved"), Value::Null] {
            assert!(matches!(
                ensure_sellable(&json!({ "Status": status })),
                Err(AppError::Conflict(_))
            ));
        }
    }

    #[test]
    fn reopen_needs_a_sold_lot_with_a_buyer() {
        let sold = json!({"Status": "SOLD", "Buyers Name": "Juan "});
        assert_eq!(ensure_reopenable(Project::Havahills, &sold).unwrap(), "Juan ");

        let available = json!({"Status": "Available", "Buyers Name": "Juan"});
        assert!(matches!(
            ensure_reopenable(Project::Havahills, &available),
            Err(AppError::Conflict(_))
        ));

        let nameless = json!({"Status": "Sold", "Owner": "  "});
        assert!(matches!(
            ensure_reopenable(Project::LivingWater, &nameless),
            Err(AppError::BadRequest(_))
        ));

        // The buyer column differs per subdivision.
        let wrong_column = json!({"Status": "Sold", "Owner": "Ana"});
        assert!(matches!(
            ensure_reopenable(Project::Havahills, &wrong_column),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn sale_buyer_is_taken_as_stored() {
        let mut snapshot = Map::new();
        snapshot.insert("Owner".to_string(), json!("Juan "));
        assert_eq!(
            sale_buyer(Project::LivingWater, &snapshot).as_deref(),
            Some("Juan ")
        );
        assert_eq!(sale_buyer(Project::Havahills, &snapshot), None);

        snapshot.insert("Owner".to_string(), json!(""));
        assert_eq!(sale_buyer(Project::LivingWater, &snapshot), None);
    }

    #[test]
    fn outcomes_report_each_step() {
        let sale = SaleOutcome {
            property: json!({"id": 7}),
            client: ClientOutcome::Existing,
            balance: BalanceOutcome::Failed,
            warnings: vec!["Balance was not created: db down".to_string()],
        };
        let body = serde_json::to_value(&sale).unwrap();
        assert_eq!(body["client"], json!("existing"));
        assert_eq!(body["balance"], json!("failed"));
        assert_eq!(body["warnings"][0], json!("Balance was not created: db down"));

        let reopen = ReopenOutcome {
            property: json!({"id": 7}),
            clients_deleted: 1,
            documents_deleted: 0,
            balances_cleared: 2,
            warnings: Vec::new(),
        };
        let body = serde_json::to_value(&reopen).unwrap();
        assert_eq!(body["balances_cleared"], json!(2));
        assert_eq!(body["warnings"], json!([]));
    }
}
