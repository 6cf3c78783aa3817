use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::postgres::PgListener;
use tokio::sync::broadcast;

use crate::state::AppState;

/// Postgres NOTIFY channel carrying `{table, op, id}` payloads.
pub const CHANGE_CHANNEL: &str = "table_changes";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeOp {
    #[serde(alias = "insert")]
    Insert,
    #[serde(alias = "update")]
    Update,
    #[serde(alias = "delete")]
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableChange {
    pub table: String,
    pub op: ChangeOp,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default = "Utc::now")]
    pub at: DateTime<Utc>,
}

impl TableChange {
    pub fn new(table: &str, op: ChangeOp, id: Option<Value>) -> Self {
        Self {
            table: table.to_string(),
            op,
            id,
            at: Utc::now(),
        }
    }
}

/// In-process fan-out of table changes to SSE subscribers and the counter
/// refresher.
#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<TableChange>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, change: TableChange) {
        // No subscribers is not an error.
        let _ = self.sender.send(change);
    }

    pub fn notify(&self, table: &str, op: ChangeOp, id: Option<&Value>) {
        self.publish(TableChange::new(table, op, id.cloned()));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TableChange> {
        self.sender.subscribe()
    }
}

pub fn parse_notification(payload: &str) -> Option<TableChange> {
    match serde_json::from_str::<TableChange>(payload) {
        Ok(change) if !change.table.trim().is_empty() => Some(change),
        Ok(_) => None,
        Err(error) => {
            tracing::warn!(error = %error, payload, "Ignoring malformed change notification");
            None
        }
    }
}

/// Republishes changes made by other database sessions. Reconnects after a
/// short pause whenever the listener connection drops.
pub async fn run_change_listener(state: AppState) {
    let Some(pool) = state.db_pool.clone() else {
        tracing::warn!("Change listener: no database pool configured, exiting");
        return;
    };

    loop {
        let mut listener = match PgListener::connect_with(&pool).await {
            Ok(listener) => listener,
            Err(error) => {
                tracing::error!(error = %error, "Change listener: connect failed");
                tokio::time::sleep(Duration::from_secs(5)).await;
                continue;
            }
        };
        if let Err(error) = listener.listen(CHANGE_CHANNEL).await {
            tracing::error!(error = %error, channel = CHANGE_CHANNEL, "Change listener: LISTEN failed");
            tokio::time::sleep(Duration::from_secs(5)).await;
            continue;
        }
        tracing::info!(channel = CHANGE_CHANNEL, "Change listener started");

        loop {
            match listener.recv().await {
                Ok(notification) => {
                    if let Some(change) = parse_notification(notification.payload()) {
                        state.changes.publish(change);
                    }
                }
                Err(error) => {
                    tracing::error!(error = %error, "Change listener: connection lost");
                    break;
                }
            }
        }

        tokio::time::sleep(Duration::from_secs(5)).await;
    }
}
