use serde::Serialize;
use serde_json::{Map, Value};

use crate::{
    error::AppResult,
    repository::table_service::list_rows,
    services::{
        subdivision::Project,
        values::{field, parse_numeric, value_str},
    },
};

const MAX_ROWS: i64 = 10_000;
const FEED_SIZE: i64 = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LotStats {
    pub available: usize,
    pub sold: usize,
    pub total: usize,
}

impl LotStats {
    fn add(self, other: LotStats) -> LotStats {
        LotStats {
            available: self.available + other.available,
            sold: self.sold + other.sold,
            total: self.total + other.total,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LotSummary {
    pub living_water: LotStats,
    pub havahills: LotStats,
    pub totals: LotStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PropertyMetrics {
    pub total_area: f64,
    pub average_price: f64,
    pub occupancy_rate: f64,
    pub reservation_rate: f64,
}

#[derive(Debug, Serialize)]
pub struct Feed {
    pub transactions: Vec<Value>,
    pub notifications: Vec<Value>,
    pub upcoming_payments: Vec<Value>,
    pub tasks: Vec<Value>,
}

async fn project_rows(pool: &sqlx::PgPool, project: Project) -> AppResult<Vec<Value>> {
    list_rows(pool, project.table(), None, MAX_ROWS, 0, &[]).await
}

/// Available / sold / total per subdivision. A subdivision that cannot be
/// read counts as empty.
pub async fn lot_summary(pool: &sqlx::PgPool) -> LotSummary {
    let mut stats = [LotStats::default(); 2];
    for (slot, project) in stats.iter_mut().zip(Project::ALL) {
        match project_rows(pool, project).await {
            Ok(rows) => *slot = lot_stats(&rows),
            Err(error) => {
                tracing::error!(project = project.table(), error = %error, "Lot summary query failed");
            }
        }
    }

    let [living_water, havahills] = stats;
    LotSummary {
        living_water,
        havahills,
        totals: living_water.add(havahills),
    }
}

pub fn lot_stats(rows: &[Value]) -> LotStats {
    let status_count = |wanted: &str| {
        rows.iter()
            .filter(|row| value_str(row, "Status").eq_ignore_ascii_case(wanted))
            .count()
    };
    LotStats {
        available: status_count("available"),
        sold: status_count("sold"),
        total: rows.len(),
    }
}

pub async fn active_accounts(pool: &sqlx::PgPool) -> AppResult<Vec<Value>> {
    let rows = list_rows(pool, "Clients", None, MAX_ROWS, 0, &[]).await?;
    Ok(rows
        .into_iter()
        .filter(|row| !value_str(row, "Email").is_empty())
        .collect())
}

pub async fn property_metrics(pool: &sqlx::PgPool) -> AppResult<PropertyMetrics> {
    let mut inventory = Vec::with_capacity(Project::ALL.len());
    for project in Project::ALL {
        inventory.push((project, project_rows(pool, project).await?));
    }
    Ok(compute_metrics(&inventory))
}

/// Area and price come from each subdivision's own columns; rates are
/// percentages of all lots.
pub fn compute_metrics(inventory: &[(Project, Vec<Value>)]) -> PropertyMetrics {
    let mut lots = 0usize;
    let mut total_area = 0.0;
    let mut total_price = 0.0;
    let mut sold = 0usize;
    let mut reserved = 0usize;

    for (project, rows) in inventory {
        for row in rows {
            lots += 1;
            total_area += parse_numeric(field(row, project.lot_size_column()));
            total_price += parse_numeric(field(row, "TCP"));
            let status = value_str(row, "Status");
            if status.eq_ignore_ascii_case("sold") {
                sold += 1;
            } else if status.eq_ignore_ascii_case("reserved") {
                reserved += 1;
            }
        }
    }

    if lots == 0 {
        return PropertyMetrics::default();
    }
    let lots = lots as f64;
    PropertyMetrics {
        total_area,
        average_price: total_price / lots,
        occupancy_rate: sold as f64 / lots * 100.0,
        reservation_rate: reserved as f64 / lots * 100.0,
    }
}

pub async fn feed(pool: &sqlx::PgPool) -> Feed {
    let mut upcoming = Map::new();
    upcoming.insert(
        "due_date__gte".to_string(),
        Value::String(chrono::Utc::now().to_rfc3339()),
    );

    Feed {
        transactions: feed_list(pool, "Transactions", None, ("created_at", false)).await,
        notifications: feed_list(pool, "Notifications", None, ("created_at", false)).await,
        upcoming_payments: feed_list(pool, "Payments", Some(&upcoming), ("due_date", true)).await,
        tasks: feed_list(pool, "Tasks", None, ("priority", false)).await,
    }
}

async fn feed_list(
    pool: &sqlx::PgPool,
    table: &str,
    filters: Option<&Map<String, Value>>,
    order: (&str, bool),
) -> Vec<Value> {
    match list_rows(pool, table, filters, FEED_SIZE, 0, &[order]).await {
        Ok(rows) => rows,
        Err(error) => {
            tracing::warn!(table, error = %error, "Dashboard feed query failed");
            Vec::new()
        }
    }
}
