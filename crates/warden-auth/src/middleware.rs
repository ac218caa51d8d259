//! Authentication middleware for Axum

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::error::AuthError;
use crate::gate::{AccessGate, GateDecision, RouteRequirement};
use crate::jwt::AccessClaims;

/// Claims of the caller, placed in request extensions by the middleware
#[derive(Debug, Clone)]
pub struct ActingUser(pub AccessClaims);

impl ActingUser {
    pub fn id(&self) -> i64 {
        self.0.subject_id
    }

    pub fn is_admin(&self) -> bool {
        self.0.is_admin
    }
}

impl<S> FromRequestParts<S> for ActingUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AccessClaims>()
            .cloned()
            .map(ActingUser)
            .ok_or(AuthError::MissingToken)
    }
}

/// Middleware requiring any valid token
pub async fn require_auth(
    State(gate): State<Arc<AccessGate>>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    enforce(&gate, RouteRequirement::Authenticated, request, next).await
}

/// Middleware requiring a valid token with the admin flag
pub async fn require_admin(
    State(gate): State<Arc<AccessGate>>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    enforce(&gate, RouteRequirement::Admin, request, next).await
}

async fn enforce(
    gate: &AccessGate,
    requirement: RouteRequirement,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let header = match request.headers().get(AUTHORIZATION) {
        Some(value) => Some(value.to_str().map_err(|_| AuthError::MalformedAuthHeader)?),
        None => None,
    };

    match gate.evaluate(header, requirement) {
        GateDecision::Forwarded(claims) => {
            request.extensions_mut().insert(claims);
            Ok(next.run(request).await)
        }
        GateDecision::Rejected(rejection) => Err(rejection.error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::{TokenIssuer, TokenValidator};
    use crate::settings::AuthSettings;
    use axum::{Router, body::Body, http::StatusCode, middleware, routing::get};
    use tower::ServiceExt;

    async fn whoami(user: ActingUser) -> String {
        format!("{}:{}", user.id(), user.is_admin())
    }

    fn setup() -> (Router, TokenIssuer) {
        let settings = AuthSettings::new("middleware-secret", 15).unwrap();
        let gate = Arc::new(AccessGate::new(TokenValidator::new(&settings)));

        let router = Router::new()
            .route(
                "/admin",
                get(whoami).layer(middleware::from_fn_with_state(gate.clone(), require_admin)),
            )
            .route(
                "/me",
                get(whoami).layer(middleware::from_fn_with_state(gate, require_auth)),
            )
            .route("/open", get(whoami));

        (router, TokenIssuer::new(&settings))
    }

    fn request(path: &str, auth: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri(path);
        if let Some(value) = auth {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_missing_header_is_unauthorized() {
        let (router, _) = setup();

        let response = router.oneshot(request("/me", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(body_string(response).await.contains("missing token"));
    }

    #[tokio::test]
    async fn test_malformed_token_is_unauthorized() {
        let (router, _) = setup();

        let response = router
            .oneshot(request("/me", Some("Bearer garbage")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_claims_reach_handler() {
        let (router, issuer) = setup();
        let token = issuer.issue(12, false).unwrap();
        let header = format!("Bearer {}", token.as_str());

        let response = router.oneshot(request("/me", Some(&header))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "12:false");
    }

    #[tokio::test]
    async fn test_admin_route_requires_admin() {
        let (router, issuer) = setup();

        let user = issuer.issue(12, false).unwrap();
        let response = router
            .clone()
            .oneshot(request("/admin", Some(&format!("Bearer {}", user.as_str()))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let admin = issuer.issue(1, true).unwrap();
        let response = router
            .oneshot(request("/admin", Some(&format!("Bearer {}", admin.as_str()))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "1:true");
    }

    #[tokio::test]
    async fn test_extractor_without_middleware() {
        let (router, _) = setup();

        let response = router.oneshot(request("/open", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
