use axum::{
    extract::{Request, State},
    http::header::HOST,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{error::AppError, state::AppState};

/// Rejects requests whose `Host` is not in `TRUSTED_HOSTS`. An empty list or
/// `*` accepts every host.
pub async fn enforce_trusted_hosts(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let trusted = &state.config.trusted_hosts;
    if trusted.is_empty() || trusted.iter().any(|host| host == "*") {
        return next.run(request).await;
    }

    let host = request
        .headers()
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .map(strip_port)
        .unwrap_or_default();

    if is_trusted(trusted, &host) {
        return next.run(request).await;
    }

    tracing::warn!(host = %host, "Rejected request for untrusted host");
    AppError::BadRequest("Invalid host header.".to_string()).into_response()
}

fn strip_port(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix('[') {
        // [::1]:8000
        return rest.split(']').next().unwrap_or_default().to_ascii_lowercase();
    }
    trimmed
        .rsplit_once(':')
        .map_or(trimmed, |(host, _)| host)
        .to_ascii_lowercase()
}

fn is_trusted(trusted: &[String], host: &str) -> bool {
    trusted.iter().any(|allowed| {
        let allowed = allowed.trim().to_ascii_lowercase();
        match allowed.strip_prefix("*.") {
            Some(suffix) => host == suffix || host.ends_with(&format!(".{suffix}")),
            None => allowed == host,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::{is_trusted, strip_port};

    #[test]
    fn strips_ports() {
        assert_eq!(strip_port("localhost:8000"), "localhost");
        assert_eq!(strip_port("API.Example.com"), "api.example.com");
        assert_eq!(strip_port("[::1]:8000"), "::1");
    }

    #[test]
    fn matches_wildcard_subdomains() {
        let trusted = vec!["localhost".to_string(), "*.example.com".to_string()];
        assert!(is_trusted(&trusted, "localhost"));
        assert!(is_trusted(&trusted, "api.example.com"));
        assert!(is_trusted(&trusted, "example.com"));
        assert!(!is_trusted(&trusted, "evil-example.com"));
    }
}
