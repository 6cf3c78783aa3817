use axum::http::{header::AUTHORIZATION, HeaderMap};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    error::{AppError, AppResult},
    repository::table_service::{count_rows, escape_like},
    state::AppState,
};

const DEV_ADMIN_EMAIL_HEADER: &str = "x-admin-email";

/// An authenticated back-office user.
#[derive(Debug, Clone, Serialize)]
pub struct AdminAccess {
    pub id: String,
    pub email: String,
    /// Restricted admins only see the shell, profile and counters.
    pub restricted: bool,
}

#[derive(Debug, Deserialize)]
struct SupabaseClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SupabaseUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

struct Identity {
    id: String,
    email: String,
}

pub async fn require_admin(state: &AppState, headers: &HeaderMap) -> AppResult<AdminAccess> {
    let identity = resolve_identity(state, headers).await?;
    let cache_key = identity.email.to_ascii_lowercase();

    if let Some(cached) = state.access_cache.get(&cache_key).await {
        return Ok(cached);
    }

    if !state.config.is_admin_email(&identity.email) {
        tracing::warn!(email = %identity.email, "Rejected non-admin account");
        return Err(AppError::Forbidden(
            "This account does not have back-office access.".to_string(),
        ));
    }
    if is_client_email(state, &identity.email).await? {
        return Err(AppError::Forbidden(
            "Client accounts must use the client portal.".to_string(),
        ));
    }

    let access = AdminAccess {
        id: identity.id,
        restricted: state.config.is_restricted_email(&identity.email),
        email: identity.email,
    };
    state.access_cache.insert(cache_key, access.clone()).await;
    Ok(access)
}

/// Admin access for the dashboard, inventory, payments and balances areas.
pub async fn require_unrestricted(state: &AppState, headers: &HeaderMap) -> AppResult<AdminAccess> {
    let access = require_admin(state, headers).await?;
    if access.restricted {
        return Err(AppError::Forbidden(
            "This account cannot access this section.".to_string(),
        ));
    }
    Ok(access)
}

async fn resolve_identity(state: &AppState, headers: &HeaderMap) -> AppResult<Identity> {
    if state.config.auth_dev_overrides_enabled() {
        if let Some(email) = header_str(headers, DEV_ADMIN_EMAIL_HEADER) {
            return Ok(Identity {
                id: format!("dev:{email}"),
                email,
            });
        }
    }

    let token = bearer_token(headers)
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token.".to_string()))?;

    let (id, email) = if let Some(secret) = state.config.supabase_jwt_secret.as_deref() {
        let claims = verify_jwt(&token, secret)?;
        (claims.sub, claims.email)
    } else {
        let user = fetch_supabase_user(state, &token).await?;
        (user.id, user.email)
    };

    let email = email
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::Forbidden("Account has no email address.".to_string()))?;

    Ok(Identity { id, email })
}

fn verify_jwt(token: &str, secret: &str) -> AppResult<SupabaseClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&["authenticated"]);

    decode::<SupabaseClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|error| {
            tracing::debug!(error = %error, "Rejected access token");
            AppError::Unauthorized("Invalid or expired access token.".to_string())
        })
}

async fn fetch_supabase_user(state: &AppState, token: &str) -> AppResult<SupabaseUser> {
    let base_url = state.config.supabase_url.as_deref().ok_or_else(|| {
        AppError::Dependency(
            "Authentication is not configured. Set SUPABASE_JWT_SECRET or SUPABASE_URL."
                .to_string(),
        )
    })?;

    let mut request = state
        .http_client
        .get(format!("{base_url}/auth/v1/user"))
        .bearer_auth(token);
    if let Some(key) = state.config.supabase_service_role_key.as_deref() {
        request = request.header("apikey", key);
    }

    let response = request.send().await.map_err(|error| {
        tracing::error!(error = %error, "Supabase auth request failed");
        AppError::Dependency("Authentication service is unavailable.".to_string())
    })?;

    if !response.status().is_success() {
        return Err(AppError::Unauthorized(
            "Invalid or expired access token.".to_string(),
        ));
    }

    response.json::<SupabaseUser>().await.map_err(|error| {
        tracing::error!(error = %error, "Supabase auth response was not understood");
        AppError::Dependency("Authentication service returned an invalid response.".to_string())
    })
}

/// Client-portal accounts are recognised by their email in `Clients`.
async fn is_client_email(state: &AppState, email: &str) -> AppResult<bool> {
    let Some(pool) = state.db_pool.as_ref() else {
        return Ok(false);
    };
    Ok(count_rows(pool, "Clients", Some(&client_email_filters(email))).await? > 0)
}

/// Case-insensitive but otherwise exact match on `Clients.Email`.
fn client_email_filters(email: &str) -> Map<String, Value> {
    let mut filters = Map::new();
    filters.insert(
        "Email__ilike".to_string(),
        Value::String(escape_like(email.trim())),
    );
    filters
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = raw.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

#[cfg(test)]
mod tests {
    use axum::http::{header::AUTHORIZATION, HeaderMap, HeaderValue};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    use super::{bearer_token, client_email_filters, require_admin, require_unrestricted};
    use crate::{error::AppError, state::AppState};

    fn token_for(email: &str, secret: &str) -> String {
        let claims = json!({
            "sub": "0b5c3c1e-1111-4222-8333-444455556666",
            "email": email,
            "aud": "authenticated",
            "exp": chrono::Utc::now().timestamp() + 3600,
        });
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[test]
    fn extracts_bearer_tokens() {
        let headers = bearer("abc");
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc"));
        let mut basic = HeaderMap::new();
        basic.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&basic), None);
    }

    #[tokio::test]
    async fn accepts_signed_admin_tokens() {
        let state = AppState::for_tests();
        let access = require_admin(&state, &bearer(&token_for("Admin@Example.com", "test-secret")))
            .await
            .unwrap();
        assert_eq!(access.email, "Admin@Example.com");
        assert!(!access.restricted);
    }

    #[tokio::test]
    async fn rejects_missing_and_forged_tokens() {
        let state = AppState::for_tests();
        assert!(matches!(
            require_admin(&state, &HeaderMap::new()).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            require_admin(&state, &bearer(&token_for("admin@example.com", "wrong"))).await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn rejects_accounts_outside_allow_list() {
        let state = AppState::for_tests();
        assert!(matches!(
            require_admin(&state, &bearer(&token_for("buyer@example.com", "test-secret"))).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn restricted_admins_are_kept_out_of_sections() {
        let state = AppState::for_tests();
        let mut headers = HeaderMap::new();
        headers.insert("x-admin-email", HeaderValue::from_static("limited@example.com"));

        let access = require_admin(&state, &headers).await.unwrap();
        assert!(access.restricted);
        assert!(matches!(
            require_unrestricted(&state, &headers).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn client_email_lookup_escapes_wildcards() {
        let filters = client_email_filters(" john_doe%@example.com ");
        assert_eq!(filters.len(), 1);
        assert_eq!(filters["Email__ilike"], json!("john\\_doe\\%@example.com"));
    }
}
