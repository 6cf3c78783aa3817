use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;

use crate::{
    auth::AdminAccess,
    config::AppConfig,
    db::build_pool,
    error::AppError,
    services::{counters::CounterHub, realtime::ChangeFeed, storage::ReceiptStorage},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db_pool: Option<PgPool>,
    pub http_client: reqwest::Client,
    pub storage: Option<ReceiptStorage>,
    pub changes: ChangeFeed,
    pub counters: CounterHub,
    pub access_cache: Cache<String, AdminAccess>,
}

impl AppState {
    pub async fn build(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let db_pool = build_pool(&config)?;
        let storage = if config.storage_configured() {
            Some(ReceiptStorage::from_config(&config).await)
        } else {
            None
        };
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self::assemble(config, db_pool, storage, http_client))
    }

    fn assemble(
        config: AppConfig,
        db_pool: Option<PgPool>,
        storage: Option<ReceiptStorage>,
        http_client: reqwest::Client,
    ) -> Self {
        let access_cache = Cache::builder()
            .max_capacity(config.auth_cache_max_entries)
            .time_to_live(Duration::from_secs(config.auth_cache_ttl_seconds.max(1)))
            .build();

        Self {
            config: Arc::new(config),
            db_pool,
            http_client,
            storage,
            changes: ChangeFeed::new(256),
            counters: CounterHub::new(),
            access_cache,
        }
    }

    pub fn pool(&self) -> Result<&PgPool, AppError> {
        self.db_pool.as_ref().ok_or_else(|| {
            AppError::Dependency(
                "Supabase database is not configured. Set SUPABASE_DB_URL or DATABASE_URL."
                    .to_string(),
            )
        })
    }

    pub fn receipt_storage(&self) -> Result<&ReceiptStorage, AppError> {
        self.storage.as_ref().ok_or_else(|| {
            AppError::Dependency(
                "Receipt storage is not configured. Set STORAGE_S3_ACCESS_KEY_ID and STORAGE_S3_SECRET_ACCESS_KEY."
                    .to_string(),
            )
        })
    }
}

#[cfg(test)]
impl AppState {
    pub fn for_tests() -> Self {
        Self::assemble(AppConfig::for_tests(), None, None, reqwest::Client::new())
    }
}
