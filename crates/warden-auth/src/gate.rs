//! Per-request access gate
//!
//! The gate is framework-independent: it takes the raw `Authorization`
//! header value and the route's requirement and returns a decision. The axum
//! adapter in [`crate::middleware`] turns that decision into a response or
//! forwards the request.

use http::StatusCode;
use tracing::debug;

use crate::error::AuthError;
use crate::jwt::{AccessClaims, TokenValidator};

/// What a route demands of the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteRequirement {
    /// Any valid token
    Authenticated,
    /// A valid token whose claims carry the admin flag
    Admin,
}

/// Why a request was turned away
#[derive(Debug)]
pub struct Rejection {
    pub status: StatusCode,
    pub error: AuthError,
}

impl Rejection {
    fn new(error: AuthError) -> Self {
        Self {
            status: error.status(),
            error,
        }
    }

    pub fn message(&self) -> String {
        self.error.public_message()
    }
}

/// Outcome of evaluating one request
#[derive(Debug)]
pub enum GateDecision {
    Forwarded(AccessClaims),
    Rejected(Rejection),
}

impl GateDecision {
    pub fn is_forwarded(&self) -> bool {
        matches!(self, GateDecision::Forwarded(_))
    }
}

/// Authenticates and authorizes requests
#[derive(Clone)]
pub struct AccessGate {
    validator: TokenValidator,
}

impl AccessGate {
    pub fn new(validator: TokenValidator) -> Self {
        Self { validator }
    }

    /// Evaluate a request given its `Authorization` header, if any
    pub fn evaluate(&self, authorization: Option<&str>, requirement: RouteRequirement) -> GateDecision {
        match self.check(authorization, requirement) {
            Ok(claims) => GateDecision::Forwarded(claims),
            Err(err) => {
                debug!("Request rejected: {}", err);
                GateDecision::Rejected(Rejection::new(err))
            }
        }
    }

    fn check(
        &self,
        authorization: Option<&str>,
        requirement: RouteRequirement,
    ) -> Result<AccessClaims, AuthError> {
        let token = extract_bearer_token(authorization)?;
        let claims = self.validator.validate(token)?;

        if requirement == RouteRequirement::Admin && !claims.is_admin {
            return Err(AuthError::InsufficientPrivilege);
        }

        Ok(claims)
    }
}

/// Extract bearer token from authorization header
fn extract_bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.map(str::trim).unwrap_or_default();
    if header.is_empty() {
        return Err(AuthError::MissingToken);
    }

    let (scheme, token) = header.split_once(' ').unwrap_or((header, ""));
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MalformedAuthHeader);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::jwt::TokenIssuer;
    use crate::settings::AuthSettings;
    use std::sync::Arc;

    fn setup() -> (TokenIssuer, AccessGate, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        let settings = AuthSettings::new("gate-secret", 1).unwrap();
        let issuer = TokenIssuer::with_clock(&settings, clock.clone());
        let gate = AccessGate::new(TokenValidator::with_clock(&settings, clock.clone()));
        (issuer, gate, clock)
    }

    fn rejection(decision: GateDecision) -> Rejection {
        match decision {
            GateDecision::Rejected(r) => r,
            GateDecision::Forwarded(claims) => panic!("unexpectedly forwarded: {:?}", claims),
        }
    }

    #[test]
    fn test_missing_header() {
        let (_, gate, _) = setup();

        let r = rejection(gate.evaluate(None, RouteRequirement::Authenticated));
        assert_eq!(r.status, StatusCode::UNAUTHORIZED);
        assert_eq!(r.message(), "missing token");

        let r = rejection(gate.evaluate(Some("   "), RouteRequirement::Authenticated));
        assert_eq!(r.status, StatusCode::UNAUTHORIZED);
        assert_eq!(r.message(), "missing token");

        let r = rejection(gate.evaluate(Some("Bearer "), RouteRequirement::Authenticated));
        assert_eq!(r.message(), "missing token");
    }

    #[test]
    fn test_wrong_scheme() {
        let (_, gate, _) = setup();

        let r = rejection(gate.evaluate(Some("Basic YWxpY2U6cHc="), RouteRequirement::Authenticated));
        assert_eq!(r.status, StatusCode::UNAUTHORIZED);
        assert!(matches!(r.error, AuthError::MalformedAuthHeader));
    }

    #[test]
    fn test_malformed_token() {
        let (_, gate, _) = setup();

        let r = rejection(gate.evaluate(Some("Bearer not-a-token"), RouteRequirement::Authenticated));
        assert_eq!(r.status, StatusCode::UNAUTHORIZED);
        assert!(matches!(r.error, AuthError::MalformedToken));
    }

    #[test]
    fn test_expired_token() {
        let (issuer, gate, clock) = setup();
        let signed = issuer.issue(3, true).unwrap();
        let header = format!("Bearer {}", signed.as_str());

        clock.advance_secs(61);
        let r = rejection(gate.evaluate(Some(&header), RouteRequirement::Authenticated));
        assert_eq!(r.status, StatusCode::UNAUTHORIZED);
        assert!(matches!(r.error, AuthError::TokenExpired));
    }

    #[test]
    fn test_non_admin_on_admin_route() {
        let (issuer, gate, _) = setup();
        let signed = issuer.issue(3, false).unwrap();
        let header = format!("Bearer {}", signed.as_str());

        let r = rejection(gate.evaluate(Some(&header), RouteRequirement::Admin));
        assert_eq!(r.status, StatusCode::FORBIDDEN);
        assert_eq!(r.message(), "admin privilege required");

        assert!(gate.evaluate(Some(&header), RouteRequirement::Authenticated).is_forwarded());
    }

    #[test]
    fn test_admin_is_forwarded() {
        let (issuer, gate, _) = setup();
        let signed = issuer.issue(9, true).unwrap();
        let header = format!("bearer {}", signed.as_str());

        match gate.evaluate(Some(&header), RouteRequirement::Admin) {
            GateDecision::Forwarded(claims) => {
                assert_eq!(claims.subject_id, 9);
                assert!(claims.is_admin);
            }
            GateDecision::Rejected(r) => panic!("unexpected rejection: {:?}", r),
        }
    }
}
