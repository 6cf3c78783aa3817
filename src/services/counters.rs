use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Map, Value};
use tokio::sync::{broadcast::error::RecvError, watch};

use crate::{repository::table_service::count_rows, state::AppState};

/// Badge counts shown in the admin navigation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub pending_payments: i64,
    pub new_tickets: i64,
    pub in_progress_tickets: i64,
}

#[derive(Clone)]
pub struct CounterHub {
    sender: Arc<watch::Sender<Counters>>,
}

impl Default for CounterHub {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterHub {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(Counters::default());
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn current(&self) -> Counters {
        *self.sender.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Counters> {
        self.sender.subscribe()
    }

    /// Stores `next` and wakes subscribers only when a value changed.
    pub fn set(&self, next: Counters) -> bool {
        self.sender.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        })
    }

    /// Recounts from the database. A failed count keeps its previous value.
    pub async fn refresh(&self, pool: &sqlx::PgPool) -> Counters {
        let previous = self.current();

        let pending_payments = count_or(
            pool,
            "Payment",
            status_filter(json!("Pending")),
            previous.pending_payments,
        )
        .await;
        let new_tickets = count_or(
            pool,
            "Tickets",
            status_filter(json!("new")),
            previous.new_tickets,
        )
        .await;
        let in_progress_tickets = count_or(
            pool,
            "Tickets",
            status_filter(json!(["in_progress", "in progress"])),
            previous.in_progress_tickets,
        )
        .await;

        let next = Counters {
            pending_payments,
            new_tickets,
            in_progress_tickets,
        };
        self.set(next);
        next
    }
}

fn status_filter(value: Value) -> Map<String, Value> {
    let mut filters = Map::new();
    filters.insert("Status".to_string(), value);
    filters
}

async fn count_or(
    pool: &sqlx::PgPool,
    table: &str,
    filters: Map<String, Value>,
    fallback: i64,
) -> i64 {
    match count_rows(pool, table, Some(&filters)).await {
        Ok(total) => total,
        Err(error) => {
            tracing::warn!(table, error = %error, "Counter refresh failed, keeping previous value");
            fallback
        }
    }
}

pub fn affects_counters(table: &str) -> bool {
    matches!(table, "Payment" | "Tickets")
}

/// Keeps the counters current: once at startup, on every Payment or Tickets
/// change, and on a fixed poll for changes nobody announced.
pub async fn run_counter_refresher(state: AppState) {
    let Some(pool) = state.db_pool.clone() else {
        tracing::warn!("Counter refresher: no database pool configured, exiting");
        return;
    };

    let mut changes = state.changes.subscribe();
    let mut poll = tokio::time::interval(Duration::from_secs(
        state.config.counters_poll_seconds.max(5),
    ));
    tracing::info!("Counter refresher started");

    loop {
        let should_refresh = tokio::select! {
            _ = poll.tick() => true,
            received = changes.recv() => match received {
                Ok(change) => affects_counters(&change.table),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Counter refresher lagged behind change feed");
                    true
                }
                Err(RecvError::Closed) => break,
            },
        };

        if should_refresh {
            let counters = state.counters.refresh(&pool).await;
            tracing::debug!(
                pending_payments = counters.pending_payments,
                new_tickets = counters.new_tickets,
                in_progress_tickets = counters.in_progress_tickets,
                "Counters refreshed"
            );
        }
    }
}
