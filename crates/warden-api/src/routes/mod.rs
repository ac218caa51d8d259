//! API routes

mod books;
mod health;
mod me;
pub mod metrics;
mod token;
pub mod types;
mod users;

use axum::Router;
use std::sync::Arc;

use crate::state::{AppState, MetricsHandle};

/// Create the main router
pub fn create_router(state: AppState, metrics_handle: Option<Arc<MetricsHandle>>) -> Router {
    let mut router = Router::new()
        // Health check
        .merge(health::routes())
        // Public: credentials for a token
        .merge(token::routes())
        // Any valid token
        .merge(me::routes(&state))
        // Public reads, authenticated writes
        .merge(books::routes(&state))
        // Admin only
        .merge(users::routes(&state))
        .with_state(state);

    if let Some(handle) = metrics_handle {
        router = router.merge(metrics::routes(handle));
    }

    router
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
        response::Response,
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use warden_auth::{
        AccessGate, AuthService, AuthSettings, TokenIssuer, TokenValidator, hash_password,
    };
    use warden_db::{Database, NewUser};

    struct TestApp {
        router: Router,
        issuer: TokenIssuer,
        validator: TokenValidator,
    }

    async fn seed(db: &Database, username: &str, password: &str, active: bool, admin: bool) -> i64 {
        db.insert_user(NewUser {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            first_name: username.to_string(),
            last_name: "Test".to_string(),
            password_hash: hash_password(password).unwrap(),
            is_active: active,
            is_admin: admin,
        })
        .await
        .unwrap()
        .id
    }

    async fn setup() -> TestApp {
        let db = Database::in_memory().await.unwrap();
        seed(&db, "root", "root-password", true, true).await;
        seed(&db, "alice", "correct", true, false).await;
        seed(&db, "dormant", "correct", false, false).await;

        let settings = AuthSettings::new("api-test-secret", 15).unwrap();
        let auth = Arc::new(AuthService::new(
            Arc::new(db.clone()),
            TokenIssuer::new(&settings),
        ));
        let gate = Arc::new(AccessGate::new(TokenValidator::new(&settings)));

        TestApp {
            router: create_router(AppState::new(db, auth, gate), None),
            issuer: TokenIssuer::new(&settings),
            validator: TokenValidator::new(&settings),
        }
    }

    async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
        let response: Response = app.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn login(app: &TestApp, username: &str, password: &str) -> String {
        let (status, body) = send(
            app,
            json_request(
                "POST",
                "/api/v1/token/new",
                None,
                json!({"username": username, "password": password}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["access_token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let app = setup().await;
        let (status, body) = send(&app, get("/health", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_token_issued_for_valid_credentials() {
        let app = setup().await;
        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/api/v1/token/new",
                None,
                json!({"username": "alice", "password": "correct"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["expires_in_minutes"], 15);
        assert_eq!(body["msg"], "Token will be expired within 15 minutes");

        let claims = app
            .validator
            .validate(body["access_token"].as_str().unwrap())
            .unwrap();
        assert!(!claims.is_admin);
        assert_eq!(claims.subject_id, 2);
    }

    #[tokio::test]
    async fn test_unknown_user_and_wrong_password_look_the_same() {
        let app = setup().await;

        let (unknown_status, unknown_body) = send(
            &app,
            json_request(
                "POST",
                "/api/v1/token/new",
                None,
                json!({"username": "mallory", "password": "correct"}),
            ),
        )
        .await;
        let (wrong_status, wrong_body) = send(
            &app,
            json_request(
                "POST",
                "/api/v1/token/new",
                None,
                json!({"username": "alice", "password": "nope"}),
            ),
        )
        .await;

        assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
        assert_eq!(unknown_status, wrong_status);
        assert_eq!(unknown_body, wrong_body);
        assert_eq!(unknown_body["message"], "invalid credentials");
    }

    #[tokio::test]
    async fn test_disabled_account_gets_no_token() {
        let app = setup().await;
        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/api/v1/token/new",
                None,
                json!({"username": "dormant", "password": "correct"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body.get("access_token").is_none());
    }

    #[tokio::test]
    async fn test_malformed_token_request() {
        let app = setup().await;

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/token/new")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            json_request(
                "POST",
                "/api/v1/token/new",
                None,
                json!({"username": "", "password": "x"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_users_require_admin() {
        let app = setup().await;

        let (status, body) = send(&app, get("/api/v1/users", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "missing token");

        let (status, _) = send(&app, get("/api/v1/users", Some("not.a.token"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let alice = login(&app, "alice", "correct").await;
        let (status, body) = send(&app, get("/api/v1/users", Some(&alice))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "admin privilege required");

        let root = login(&app, "root", "root-password").await;
        let (status, body) = send(&app, get("/api/v1/users?page=1&page_size=2", Some(&root))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);
        assert_eq!(body["total"], 3);
        assert!(body["users"][0].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn test_user_crud() {
        let app = setup().await;
        let root = login(&app, "root", "root-password").await;

        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/api/v1/users",
                Some(&root),
                json!({
                    "username": "bob",
                    "email": "bob@example.com",
                    "password": "bob-password",
                    "first_name": "Bob"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["user"]["id"].as_i64().unwrap();
        assert_eq!(body["user"]["is_active"], true);
        assert_eq!(body["user"]["is_admin"], false);

        let (status, _) = send(
            &app,
            json_request(
                "POST",
                "/api/v1/users",
                Some(&root),
                json!({
                    "username": "bob",
                    "email": "other@example.com",
                    "password": "bob-password"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        // The new account can log in.
        login(&app, "bob", "bob-password").await;

        let (status, body) = send(
            &app,
            json_request(
                "PUT",
                &format!("/api/v1/users/{}", id),
                Some(&root),
                json!({"is_active": false, "last_name": "Builder"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["last_name"], "Builder");
        assert_eq!(body["user"]["is_active"], false);

        let (status, _) = send(
            &app,
            json_request(
                "POST",
                "/api/v1/token/new",
                None,
                json!({"username": "bob", "password": "bob-password"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(&app, get(&format!("/api/v1/users/{}", id), Some(&root))).await;
        assert_eq!(status, StatusCode::OK);

        let delete = Request::builder()
            .method("DELETE")
            .uri(format!("/api/v1/users/{}", id))
            .header(header::AUTHORIZATION, format!("Bearer {}", root))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, delete).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, get(&format!("/api/v1/users/{}", id), Some(&root))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_user_validation() {
        let app = setup().await;
        let root = login(&app, "root", "root-password").await;

        let (status, _) = send(
            &app,
            json_request(
                "POST",
                "/api/v1/users",
                Some(&root),
                json!({"username": "eve", "email": "eve@example.com", "password": "short"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_me_binds_acting_user() {
        let app = setup().await;

        let (status, _) = send(&app, get("/api/v1/me", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let alice = login(&app, "alice", "correct").await;
        let (status, body) = send(&app, get("/api/v1/me", Some(&alice))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["username"], "alice");
    }

    #[tokio::test]
    async fn test_bad_query_and_path_use_error_body() {
        let app = setup().await;
        let root = login(&app, "root", "root-password").await;

        let (status, body) = send(&app, get("/api/v1/users?page=abc", Some(&root))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 400);
        assert!(body["message"].is_string());

        let (status, body) = send(&app, get("/api/v1/users/abc", Some(&root))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 400);

        let (status, body) = send(&app, get("/api/v1/books/abc", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 400);
    }

    #[tokio::test]
    async fn test_books_reads_are_public_and_writes_need_a_token() {
        let app = setup().await;

        let (status, body) = send(&app, get("/api/v1/books", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 0);

        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/api/v1/books",
                None,
                json!({"title": "Dune", "author": "Frank Herbert"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "missing token");

        let (status, _) = send(
            &app,
            json_request(
                "POST",
                "/api/v1/books",
                Some("not.a.token"),
                json!({"title": "Dune", "author": "Frank Herbert"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_book_owner_is_the_acting_user() {
        let app = setup().await;
        let alice = login(&app, "alice", "correct").await;
        let root = login(&app, "root", "root-password").await;
        let stranger = app.issuer.issue(99, false).unwrap();

        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/api/v1/books",
                Some(&alice),
                json!({"title": "Dune", "author": "Frank Herbert"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["book"]["user_id"], 2);
        let id = body["book"]["id"].as_i64().unwrap();
        let uri = format!("/api/v1/books/{}", id);

        let (status, body) = send(&app, get(&uri, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["book"]["title"], "Dune");

        let (status, body) = send(
            &app,
            json_request("PUT", &uri, Some(stranger.as_str()), json!({"title": "Mine now"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], 403);

        let (status, body) = send(
            &app,
            json_request("PUT", &uri, Some(&alice), json!({"title": "Dune Messiah"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["book"]["title"], "Dune Messiah");
        assert_eq!(body["book"]["author"], "Frank Herbert");

        let delete = |token: &str| {
            Request::builder()
                .method("DELETE")
                .uri(&uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap()
        };

        let (status, _) = send(&app, delete(stranger.as_str())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        // Admins may remove any book.
        let (status, _) = send(&app, delete(&root)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, get(&uri, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_book_validation() {
        let app = setup().await;
        let alice = login(&app, "alice", "correct").await;

        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/api/v1/books",
                Some(&alice),
                json!({"title": "  ", "author": "Nobody"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 400);
    }
}
