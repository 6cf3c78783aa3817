use std::env;

use chrono_tz::Tz;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub environment: String,
    pub api_prefix: String,
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub trusted_hosts: Vec<String>,
    pub dev_auth_overrides_enabled: bool,
    pub rate_limit_enabled: bool,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst_size: u32,
    pub supabase_url: Option<String>,
    pub supabase_service_role_key: Option<String>,
    pub supabase_jwt_secret: Option<String>,
    pub supabase_db_url: Option<String>,
    pub db_pool_max_connections: u32,
    pub db_pool_min_connections: u32,
    pub db_pool_acquire_timeout_seconds: u64,
    pub db_pool_idle_timeout_seconds: u64,
    pub storage_s3_endpoint: Option<String>,
    pub storage_s3_region: String,
    pub storage_s3_access_key_id: Option<String>,
    pub storage_s3_secret_access_key: Option<String>,
    pub receipt_bucket: String,
    pub ar_receipt_bucket: String,
    pub max_upload_bytes: usize,
    pub admin_emails: Vec<String>,
    pub restricted_emails: Vec<String>,
    pub auth_cache_ttl_seconds: u64,
    pub auth_cache_max_entries: u64,
    pub counters_poll_seconds: u64,
    pub realtime_listen_enabled: bool,
    pub business_timezone: Tz,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let supabase_url = env_opt("SUPABASE_URL").map(|url| url.trim_end_matches('/').to_string());
        let storage_s3_endpoint = env_opt("STORAGE_S3_ENDPOINT")
            .or_else(|| supabase_url.as_deref().and_then(default_storage_endpoint));

        Self {
            app_name: env_or("APP_NAME", "HDC Back Office API"),
            environment: env_or("ENVIRONMENT", "development"),
            api_prefix: normalize_prefix(&env_or("API_PREFIX", "/v1")),
            host: env_or("HOST", "0.0.0.0"),
            port: env_parse_or("PORT", 8000),
            cors_origins: parse_csv(&env_or("CORS_ORIGINS", "http://localhost:5173")),
            trusted_hosts: parse_csv(&env_or("TRUSTED_HOSTS", "localhost,127.0.0.1")),
            dev_auth_overrides_enabled: env_parse_bool_or("DEV_AUTH_OVERRIDES_ENABLED", false),
            rate_limit_enabled: env_parse_bool_or("RATE_LIMIT_ENABLED", true),
            rate_limit_per_second: env_parse_or("RATE_LIMIT_PER_SECOND", 10),
            rate_limit_burst_size: env_parse_or("RATE_LIMIT_BURST_SIZE", 100),
            supabase_url,
            supabase_service_role_key: env_opt("SUPABASE_SERVICE_ROLE_KEY"),
            supabase_jwt_secret: env_opt("SUPABASE_JWT_SECRET"),
            supabase_db_url: env_opt("SUPABASE_DB_URL").or_else(|| env_opt("DATABASE_URL")),
            db_pool_max_connections: env_parse_or("DB_POOL_MAX_CONNECTIONS", 5),
            db_pool_min_connections: env_parse_or("DB_POOL_MIN_CONNECTIONS", 1),
            db_pool_acquire_timeout_seconds: env_parse_or("DB_POOL_ACQUIRE_TIMEOUT_SECONDS", 5),
            db_pool_idle_timeout_seconds: env_parse_or("DB_POOL_IDLE_TIMEOUT_SECONDS", 600),
            storage_s3_endpoint,
            storage_s3_region: env_or("STORAGE_S3_REGION", "ap-southeast-1"),
            storage_s3_access_key_id: env_opt("STORAGE_S3_ACCESS_KEY_ID"),
            storage_s3_secret_access_key: env_opt("STORAGE_S3_SECRET_ACCESS_KEY"),
            receipt_bucket: env_or("RECEIPT_BUCKET", "Payment Receipt"),
            ar_receipt_bucket: env_or("AR_RECEIPT_BUCKET", "ar-receipt"),
            max_upload_bytes: env_parse_or("MAX_UPLOAD_BYTES", 10 * 1024 * 1024),
            admin_emails: parse_email_csv(&env_or("ADMIN_EMAILS", "")),
            restricted_emails: parse_email_csv(&env_or("RESTRICTED_EMAILS", "")),
            auth_cache_ttl_seconds: env_parse_or("AUTH_CACHE_TTL_SECONDS", 30),
            auth_cache_max_entries: env_parse_or("AUTH_CACHE_MAX_ENTRIES", 1000),
            counters_poll_seconds: env_parse_or("COUNTERS_POLL_SECONDS", 60),
            realtime_listen_enabled: env_parse_bool_or("REALTIME_LISTEN_ENABLED", false),
            business_timezone: parse_timezone(&env_or("BUSINESS_TIMEZONE", "Asia/Manila")),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.trim().eq_ignore_ascii_case("production")
    }

    pub fn auth_dev_overrides_enabled(&self) -> bool {
        if self.is_production() {
            return false;
        }
        self.dev_auth_overrides_enabled
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        let needle = email.trim().to_ascii_lowercase();
        self.admin_emails.iter().any(|allowed| *allowed == needle)
    }

    pub fn is_restricted_email(&self, email: &str) -> bool {
        let needle = email.trim().to_ascii_lowercase();
        self.restricted_emails.iter().any(|restricted| *restricted == needle)
    }

    pub fn storage_configured(&self) -> bool {
        self.storage_s3_endpoint.is_some()
            && self.storage_s3_access_key_id.is_some()
            && self.storage_s3_secret_access_key.is_some()
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

fn env_parse_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    env_opt(key)
        .and_then(|raw| raw.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_parse_bool_or(key: &str, default: bool) -> bool {
    match env_opt(key).as_deref().map(str::to_ascii_lowercase) {
        Some(value) if value == "1" || value == "true" || value == "yes" || value == "on" => true,
        Some(value) if value == "0" || value == "false" || value == "no" || value == "off" => false,
        Some(_) => default,
        None => default,
    }
}

fn parse_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn parse_email_csv(raw: &str) -> Vec<String> {
    parse_csv(raw)
        .into_iter()
        .map(|email| email.to_ascii_lowercase())
        .collect()
}

fn parse_timezone(raw: &str) -> Tz {
    raw.parse::<Tz>().unwrap_or_else(|_| {
        tracing::warn!(timezone = raw, "Unknown BUSINESS_TIMEZONE, using Asia/Manila");
        chrono_tz::Asia::Manila
    })
}

fn default_storage_endpoint(supabase_url: &str) -> Option<String> {
    let base = url::Url::parse(&format!("{supabase_url}/")).ok()?;
    base.join("storage/v1/s3").ok().map(|joined| joined.to_string())
}

fn normalize_prefix(raw: &str) -> String {
    let mut prefix = raw.trim().to_string();
    if prefix.is_empty() {
        return "/v1".to_string();
    }
    if !prefix.starts_with('/') {
        prefix.insert(0, '/');
    }
    while prefix.ends_with('/') && prefix.len() > 1 {
        prefix.pop();
    }
    prefix
}

#[cfg(test)]
impl AppConfig {
    /// Configuration with no external dependencies, for router tests.
    pub fn for_tests() -> Self {
        Self {
            app_name: "HDC Back Office API".to_string(),
            environment: "test".to_string(),
            api_prefix: "/v1".to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            trusted_hosts: Vec::new(),
            dev_auth_overrides_enabled: true,
            rate_limit_enabled: false,
            rate_limit_per_second: 10,
            rate_limit_burst_size: 100,
            supabase_url: None,
            supabase_service_role_key: None,
            supabase_jwt_secret: Some("test-secret".to_string()),
            supabase_db_url: None,
            db_pool_max_connections: 1,
            db_pool_min_connections: 0,
            db_pool_acquire_timeout_seconds: 1,
            db_pool_idle_timeout_seconds: 10,
            storage_s3_endpoint: None,
            storage_s3_region: "ap-southeast-1".to_string(),
            storage_s3_access_key_id: None,
            storage_s3_secret_access_key: None,
            receipt_bucket: "Payment Receipt".to_string(),
            ar_receipt_bucket: "ar-receipt".to_string(),
            max_upload_bytes: 1024 * 1024,
            admin_emails: vec!["admin@example.com".to_string(), "limited@example.com".to_string()],
            restricted_emails: vec!["limited@example.com".to_string()],
            auth_cache_ttl_seconds: 30,
            auth_cache_max_entries: 100,
            counters_poll_seconds: 60,
            realtime_listen_enabled: false,
            business_timezone: chrono_tz::Asia::Manila,
        }
    }
}
