use axum::{routing::get, Router};

use crate::state::AppState;

pub mod balances;
pub mod dashboard;
pub mod health;
pub mod identity;
pub mod inventory;
pub mod payments;
pub mod realtime;

pub fn v1_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/me", get(identity::me))
        .merge(dashboard::router())
        .merge(inventory::router())
        .merge(balances::router())
        .merge(payments::router())
        .merge(realtime::router())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::v1_router;
    use crate::state::AppState;

    fn app() -> Router {
        v1_router().with_state(AppState::for_tests())
    }

    fn get(uri: &str, admin_email: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(email) = admin_email {
            builder = builder.header("x-admin-email", email);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn send(request: Request<Body>) -> (StatusCode, Value) {
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn health_reports_missing_database() {
        let (status, body) = send(get("/health", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["db"], false);
        assert_eq!(body["storage"], false);
    }

    #[tokio::test]
    async fn requires_a_token() {
        let (status, body) = send(get("/balances", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn rejects_accounts_outside_the_allow_list() {
        let (status, _) = send(get("/me", Some("stranger@example.com"))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn restricted_admin_keeps_profile_and_counters() {
        let (status, body) = send(get("/me", Some("limited@example.com"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["restricted"], true);
        assert_eq!(body["counters"]["pending_payments"], 0);

        let (status, _) = send(get("/counters", Some("limited@example.com"))).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn restricted_admin_is_kept_out_of_sections() {
        for uri in [
            "/dashboard/lots",
            "/inventory/living-water",
            "/balances",
            "/payments",
        ] {
            let (status, _) = send(get(uri, Some("limited@example.com"))).await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
        }
    }

    #[tokio::test]
    async fn missing_database_is_a_dependency_error() {
        let (status, body) = send(get("/dashboard/lots", Some("admin@example.com"))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"]
            .as_str()
            .unwrap_or_default()
            .contains("database"));
    }

    #[tokio::test]
    async fn validates_path_and_query_before_touching_the_database() {
        let (status, _) = send(get("/inventory/riverside", Some("admin@example.com"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(get("/balances?sort=newest", Some("admin@example.com"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(get("/payments?date=April", Some("admin@example.com"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(get(
            "/payments/7/receipts/invoice",
            Some("admin@example.com"),
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn rejects_negative_balance_payments() {
        let request = Request::builder()
            .method("POST")
            .uri("/balances/3/payments")
            .header("x-admin-email", "admin@example.com")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"amount": -10}"#))
            .unwrap();
        let (status, _) = send(request).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
