use chrono::{DateTime, FixedOffset, NaiveDate};
use serde_json::{Map, Value};
use sqlx::{postgres::PgRow, Postgres, QueryBuilder, Row};

use crate::error::AppError;

const ALLOWED_TABLES: &[&str] = &[
    "Balance",
    "Clients",
    "Documents",
    "Havahills Estate",
    "Living Water Subdivision",
    "Notifications",
    "Payment",
    "Payment Record",
    "Payments",
    "Tasks",
    "Tickets",
    "Transactions",
];

/// Column and direction pair for `ORDER BY`.
pub type OrderBy<'a> = (&'a str, bool);

pub async fn list_rows(
    pool: &sqlx::PgPool,
    table: &str,
    filters: Option<&Map<String, Value>>,
    limit: i64,
    offset: i64,
    order: &[OrderBy<'_>],
) -> Result<Vec<Value>, AppError> {
    let table_name = validate_table(table)?;

    let mut query = QueryBuilder::<Postgres>::new("SELECT row_to_json(t) AS row FROM ");
    query.push(quote(table_name)).push(" t WHERE 1=1");

    if let Some(filter_map) = filters {
        for (key, value) in filter_map {
            push_filter_clause(&mut query, key, value)?;
        }
    }

    push_order_clause(&mut query, order)?;
    query
        .push(" LIMIT ")
        .push_bind(limit.clamp(1, 10_000))
        .push(" OFFSET ")
        .push_bind(offset.max(0));

    let rows = query.build().fetch_all(pool).await.map_err(map_db_error)?;
    Ok(read_rows(rows))
}

pub async fn get_row(
    pool: &sqlx::PgPool,
    table: &str,
    row_id: &str,
    id_field: &str,
) -> Result<Value, AppError> {
    let table_name = validate_table(table)?;
    let id_name = validate_identifier(id_field)?;

    let mut query = QueryBuilder::<Postgres>::new("SELECT row_to_json(t) AS row FROM ");
    query.push(quote(table_name)).push(" t WHERE ");
    push_scalar_filter(
        &mut query,
        id_name,
        FilterOperator::Eq,
        &infer_scalar_filter(id_name, &Value::String(row_id.to_string())),
    );
    query.push(" LIMIT 1");

    let row = query
        .build()
        .fetch_optional(pool)
        .await
        .map_err(map_db_error)?;

    row.and_then(|value| value.try_get::<Option<Value>, _>("row").ok().flatten())
        .ok_or_else(|| AppError::NotFound(format!("{table_name} record not found.")))
}

pub async fn create_row(
    pool: &sqlx::PgPool,
    table: &str,
    payload: &Map<String, Value>,
) -> Result<Value, AppError> {
    let table_name = validate_table(table)?;
    if payload.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Could not create {table_name} record."
        )));
    }

    let keys = sorted_keys(payload)?;

    // jsonb_populate_record lets PostgreSQL resolve each column's type from
    // the table definition, whatever the stored type of a free-text column.
    let mut query = QueryBuilder::<Postgres>::new("INSERT INTO ");
    query.push(quote(table_name)).push(" AS t (");
    {
        let mut separated = query.separated(", ");
        for key in &keys {
            separated.push(quote(key));
        }
    }
    query.push(") SELECT ");
    {
        let mut separated = query.separated(", ");
        for key in &keys {
            separated.push("r.");
            separated.push_unseparated(quote(key));
        }
    }
    query
        .push(" FROM jsonb_populate_record(NULL::")
        .push(quote(table_name))
        .push(", ");
    query.push_bind(Value::Object(payload.clone()));
    query.push(") r RETURNING row_to_json(t.*) AS row");

    let row = query
        .build()
        .fetch_optional(pool)
        .await
        .map_err(map_db_error)?;

    row.and_then(|value| value.try_get::<Option<Value>, _>("row").ok().flatten())
        .ok_or_else(|| AppError::Internal(format!("Could not create {table_name} record.")))
}

pub async fn update_row(
    pool: &sqlx::PgPool,
    table: &str,
    row_id: &str,
    payload: &Map<String, Value>,
    id_field: &str,
) -> Result<Value, AppError> {
    let id_name = validate_identifier(id_field)?;
    let mut filters = Map::new();
    filters.insert(id_name.to_string(), Value::String(row_id.to_string()));

    let table_name = validate_table(table)?;
    update_rows_where(pool, table_name, &filters, payload)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::NotFound(format!("{table_name} record not found.")))
}

/// Updates every row matching `filters` and returns the updated rows.
pub async fn update_rows_where(
    pool: &sqlx::PgPool,
    table: &str,
    filters: &Map<String, Value>,
    payload: &Map<String, Value>,
) -> Result<Vec<Value>, AppError> {
    let mut query = build_update_query(table, filters, payload)?;
    let rows = query.build().fetch_all(pool).await.map_err(map_db_error)?;
    Ok(read_rows(rows))
}

pub async fn delete_row(
    pool: &sqlx::PgPool,
    table: &str,
    row_id: &str,
    id_field: &str,
) -> Result<Value, AppError> {
    let existing = get_row(pool, table, row_id, id_field).await?;
    let id_name = validate_identifier(id_field)?;
    let mut filters = Map::new();
    filters.insert(id_name.to_string(), Value::String(row_id.to_string()));

    delete_rows_where(pool, table, &filters).await?;
    Ok(existing)
}

/// Deletes every row matching `filters`; returns the number of deleted rows.
pub async fn delete_rows_where(
    pool: &sqlx::PgPool,
    table: &str,
    filters: &Map<String, Value>,
) -> Result<u64, AppError> {
    let table_name = validate_table(table)?;
    if filters.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Refusing to delete every {table_name} record."
        )));
    }

    let mut query = QueryBuilder::<Postgres>::new("DELETE FROM ");
    query.push(quote(table_name)).push(" t WHERE 1=1");
    for (key, value) in filters {
        push_filter_clause(&mut query, key, value)?;
    }

    let result = query.build().execute(pool).await.map_err(map_db_error)?;
    Ok(result.rows_affected())
}

pub async fn count_rows(
    pool: &sqlx::PgPool,
    table: &str,
    filters: Option<&Map<String, Value>>,
) -> Result<i64, AppError> {
    let table_name = validate_table(table)?;

    let mut query = QueryBuilder::<Postgres>::new("SELECT COUNT(*)::bigint AS total FROM ");
    query.push(quote(table_name)).push(" t WHERE 1=1");

    if let Some(filter_map) = filters {
        for (key, value) in filter_map {
            push_filter_clause(&mut query, key, value)?;
        }
    }

    let row = query.build().fetch_one(pool).await.map_err(map_db_error)?;

    Ok(row.try_get::<i64, _>("total").unwrap_or(0))
}

fn build_update_query<'a>(
    table: &str,
    filters: &Map<String, Value>,
    payload: &Map<String, Value>,
) -> Result<QueryBuilder<'a, Postgres>, AppError> {
    let table_name = validate_table(table)?;
    if payload.is_empty() {
        return Err(AppError::BadRequest("No fields to update.".to_string()));
    }
    if filters.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Refusing to update every {table_name} record."
        )));
    }

    let keys = sorted_keys(payload)?;

    let mut query = QueryBuilder::<Postgres>::new("UPDATE ");
    query.push(quote(table_name)).push(" t SET ");
    {
        let mut separated = query.separated(", ");
        for key in &keys {
            let col = quote(key);
            separated.push(col.clone());
            separated.push_unseparated(" = r.");
            separated.push_unseparated(col);
        }
    }
    query
        .push(" FROM jsonb_populate_record(NULL::")
        .push(quote(table_name))
        .push(", ");
    query.push_bind(Value::Object(payload.clone()));
    query.push(") r WHERE 1=1");
    for (key, value) in filters {
        push_filter_clause(&mut query, key, value)?;
    }
    query.push(" RETURNING row_to_json(t) AS row");

    Ok(query)
}

fn sorted_keys(payload: &Map<String, Value>) -> Result<Vec<String>, AppError> {
    let mut keys = payload.keys().cloned().collect::<Vec<_>>();
    keys.sort_unstable();
    for key in &keys {
        validate_identifier(key)?;
    }
    Ok(keys)
}

fn push_order_clause(
    query: &mut QueryBuilder<Postgres>,
    order: &[OrderBy<'_>],
) -> Result<(), AppError> {
    if order.is_empty() {
        query.push(" ORDER BY t.\"id\" ASC");
        return Ok(());
    }
    query.push(" ORDER BY ");
    for (index, (column, ascending)) in order.iter().enumerate() {
        if index > 0 {
            query.push(", ");
        }
        query.push("t.").push(quote(validate_identifier(column)?));
        query.push(if *ascending { " ASC" } else { " DESC" });
    }
    Ok(())
}

fn read_rows(rows: Vec<PgRow>) -> Vec<Value> {
    rows.into_iter()
        .filter_map(|row| row.try_get::<Option<Value>, _>("row").ok().flatten())
        .collect()
}

fn validate_table(table: &str) -> Result<&str, AppError> {
    let normalized = validate_identifier(table)?;
    if ALLOWED_TABLES.contains(&normalized) {
        return Ok(normalized);
    }
    Err(AppError::Forbidden(format!(
        "Table '{normalized}' is not allowed."
    )))
}

/// Column names here are free text ("Broker / Realty", "Due Date 15/30"),
/// so identifiers are always double-quoted and only `"` and control
/// characters are kept out.
fn validate_identifier(identifier: &str) -> Result<&str, AppError> {
    let trimmed = identifier.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest(
            "Identifier cannot be empty.".to_string(),
        ));
    }
    if trimmed.len() > 63
        || !trimmed.chars().all(|character| {
            character.is_ascii_alphanumeric()
                || matches!(character, ' ' | '_' | '/' | '&' | ':' | '.' | '-')
        })
    {
        return Err(AppError::BadRequest(format!(
            "Invalid identifier '{trimmed}'."
        )));
    }
    Ok(trimmed)
}

fn quote(identifier: &str) -> String {
    format!("\"{identifier}\"")
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

#[derive(Debug, Clone)]
enum ScalarFilter {
    Text(String),
    Bool(bool),
    I64(i64),
    F64(f64),
    Date(NaiveDate),
    Timestamp(DateTime<FixedOffset>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterOperator {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    ILike,
    IsNull,
}

/// Escapes `\`, `%` and `_` so a value passed to a `__like` / `__ilike`
/// filter matches literally.
pub fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for character in raw.chars() {
        if matches!(character, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(character);
    }
    escaped
}

fn parse_filter_key(filter_key: &str) -> Result<(&str, FilterOperator), AppError> {
    let mut column = filter_key;
    let mut operator = FilterOperator::Eq;

    if let Some((candidate_column, suffix)) = filter_key.rsplit_once("__") {
        operator = match suffix {
            "gt" => FilterOperator::Gt,
            "gte" => FilterOperator::Gte,
            "lt" => FilterOperator::Lt,
            "lte" => FilterOperator::Lte,
            "like" => FilterOperator::Like,
            "ilike" => FilterOperator::ILike,
            "is_null" => FilterOperator::IsNull,
            _ => FilterOperator::Eq,
        };
        if !matches!(operator, FilterOperator::Eq) || suffix == "in" {
            column = candidate_column;
        }
    }

    Ok((validate_identifier(column)?, operator))
}

fn scalar_to_text(value: &ScalarFilter) -> String {
    match value {
        ScalarFilter::Text(text) => text.clone(),
        ScalarFilter::Bool(flag) => flag.to_string(),
        ScalarFilter::I64(number) => number.to_string(),
        ScalarFilter::F64(number) => number.to_string(),
        ScalarFilter::Date(value) => value.to_string(),
        ScalarFilter::Timestamp(value) => value.to_rfc3339(),
    }
}

fn parse_bool_filter_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => *flag,
        Value::Number(number) => {
            number.as_i64().is_some_and(|parsed| parsed != 0)
                || number.as_f64().is_some_and(|parsed| parsed != 0.0)
        }
        Value::String(text) => matches!(
            text.trim().to_ascii_lowercase().as_str(),
            "true" | "t" | "1" | "yes" | "y"
        ),
        _ => false,
    }
}

fn push_filter_clause(
    query: &mut QueryBuilder<Postgres>,
    filter_key: &str,
    value: &Value,
) -> Result<(), AppError> {
    let (column, operator) = parse_filter_key(filter_key)?;

    if matches!(operator, FilterOperator::IsNull) {
        let should_be_null = parse_bool_filter_value(value);
        query.push(" AND t.").push(quote(column));
        if should_be_null {
            query.push(" IS NULL");
        } else {
            query.push(" IS NOT NULL");
        }
        return Ok(());
    }

    match value {
        Value::Null => Ok(()),
        Value::Array(items) => {
            if !matches!(operator, FilterOperator::Eq) {
                return Err(AppError::BadRequest(format!(
                    "Filter '{filter_key}' does not support array values."
                )));
            }
            if items.is_empty() {
                return Ok(());
            }
            // Free-text columns mix stored types, so set membership is by text.
            let values = items.iter().map(render_scalar).collect::<Vec<_>>();
            query
                .push(" AND t.")
                .push(quote(column))
                .push("::text = ANY(")
                .push_bind(values)
                .push(")");
            Ok(())
        }
        _ => {
            query.push(" AND ");
            let filter = infer_scalar_filter(column, value);
            push_scalar_filter(query, column, operator, &filter);
            Ok(())
        }
    }
}

fn push_scalar_filter(
    query: &mut QueryBuilder<Postgres>,
    column: &str,
    operator: FilterOperator,
    value: &ScalarFilter,
) {
    query.push("t.").push(quote(column));
    match operator {
        FilterOperator::Eq
        | FilterOperator::Gt
        | FilterOperator::Gte
        | FilterOperator::Lt
        | FilterOperator::Lte => {
            let sql_operator = match operator {
                FilterOperator::Gt => " > ",
                FilterOperator::Gte => " >= ",
                FilterOperator::Lt => " < ",
                FilterOperator::Lte => " <= ",
                _ => " = ",
            };
            match value {
                ScalarFilter::Text(text) => {
                    query
                        .push("::text")
                        .push(sql_operator)
                        .push_bind(text.clone());
                }
                ScalarFilter::Bool(flag) => {
                    query.push(sql_operator).push_bind(*flag);
                }
                ScalarFilter::I64(number) => {
                    query.push(sql_operator).push_bind(*number);
                }
                ScalarFilter::F64(number) => {
                    query.push(sql_operator).push_bind(*number);
                }
                ScalarFilter::Date(value) => {
                    query.push(sql_operator).push_bind(*value);
                }
                ScalarFilter::Timestamp(value) => {
                    query.push(sql_operator).push_bind(value.to_owned());
                }
            }
        }
        FilterOperator::Like | FilterOperator::ILike => {
            let sql_operator = if matches!(operator, FilterOperator::ILike) {
                " ILIKE "
            } else {
                " LIKE "
            };
            query
                .push("::text")
                .push(sql_operator)
                .push_bind(scalar_to_text(value));
        }
        FilterOperator::IsNull => {
            // handled by push_filter_clause before scalar inference
        }
    }
}

fn infer_scalar_filter(filter_key: &str, value: &Value) -> ScalarFilter {
    match value {
        Value::Bool(flag) => ScalarFilter::Bool(*flag),
        Value::Number(number) => {
            if let Some(as_i64) = number.as_i64() {
                return ScalarFilter::I64(as_i64);
            }
            if let Some(as_f64) = number.as_f64() {
                return ScalarFilter::F64(as_f64);
            }
            ScalarFilter::Text(number.to_string())
        }
        Value::String(text) => {
            let trimmed = text.trim();
            if is_numeric_key_identifier(filter_key) {
                if let Ok(parsed) = trimmed.parse::<i64>() {
                    return ScalarFilter::I64(parsed);
                }
            }
            if is_timestamp_identifier(filter_key) {
                if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
                    return ScalarFilter::Timestamp(parsed);
                }
            }
            if is_date_identifier(filter_key) {
                if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
                    return ScalarFilter::Timestamp(parsed);
                }
                if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
                    return ScalarFilter::Date(parsed);
                }
            }
            ScalarFilter::Text(text.clone())
        }
        _ => ScalarFilter::Text(render_scalar(value)),
    }
}

fn is_numeric_key_identifier(identifier: &str) -> bool {
    let normalized = identifier.trim();
    normalized == "id" || normalized.ends_with("_id")
}

fn is_date_identifier(identifier: &str) -> bool {
    identifier.trim().ends_with("_date")
}

fn is_timestamp_identifier(identifier: &str) -> bool {
    identifier.trim().ends_with("_at")
}

fn map_db_error(error: sqlx::Error) -> AppError {
    let message = error.to_string();
    tracing::error!(db_error = %message, "Database query failed");

    if message.contains("23505")
        || message
            .to_ascii_lowercase()
            .contains("duplicate key value violates unique constraint")
    {
        return AppError::Conflict("Duplicate value violates a unique constraint.".to_string());
    }
    AppError::Dependency("Database operation failed.".to_string())
}
