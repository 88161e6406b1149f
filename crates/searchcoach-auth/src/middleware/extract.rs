//! Axum extractors for the signed-in user and the team-member policy.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::AuthError;
use crate::membership::Credential;
use crate::policy::{AccessDecision, AuthorizationPolicy, DenyReason, PolicyEvaluator, RequestContext};
use crate::token::{Principal, TokenVerifier};

// =============================================================================
// Auth State
// =============================================================================

/// State required by the authentication extractors.
///
/// Include it in the application state and expose it through `FromRef`.
///
/// # Example
///
/// ```ignore
/// #[derive(Clone)]
/// struct AppState {
///     auth: AuthState,
/// }
///
/// impl FromRef<AppState> for AuthState {
///     fn from_ref(state: &AppState) -> Self {
///         state.auth.clone()
///     }
/// }
/// ```
#[derive(Clone)]
pub struct AuthState {
    /// Bearer token verifier.
    pub verifier: Arc<TokenVerifier>,

    /// Policy evaluator sharing the process-wide membership cache.
    pub evaluator: PolicyEvaluator,
}

impl AuthState {
    /// Creates a new auth state.
    #[must_use]
    pub fn new(verifier: Arc<TokenVerifier>, evaluator: PolicyEvaluator) -> Self {
        Self {
            verifier,
            evaluator,
        }
    }
}

// =============================================================================
// Authenticated User Extractor
// =============================================================================

/// Axum extractor that verifies the bearer token and yields the caller.
///
/// # Errors
///
/// Rejects with `Unauthorized` when the header is missing or malformed and
/// with `InvalidToken`/`TokenExpired` when verification fails.
pub struct AuthenticatedUser(pub Principal);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);

        let credential = authorization_header(parts)
            .map(Credential::new)
            .ok_or_else(|| AuthError::unauthorized("Missing Authorization header"))?;
        let token = credential
            .bearer()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::unauthorized("Invalid Authorization header format"))?;

        let principal = auth_state.verifier.verify(token).map_err(|e| {
            tracing::debug!(error = %e, "Token verification failed");
            e
        })?;

        Ok(AuthenticatedUser(principal))
    }
}

// =============================================================================
// Team Member Extractor
// =============================================================================

/// A caller who passed the team-member policy.
#[derive(Debug, Clone)]
pub struct TeamMemberContext {
    /// The signed-in user.
    pub principal: Principal,
    /// The team the user was checked against.
    pub group_id: String,
}

/// Axum extractor enforcing the team-member policy.
///
/// Reads the team from the `groupId` query parameter and forwards the raw
/// `Authorization` header to the membership validator.
///
/// # Errors
///
/// - 401 when the caller is not authenticated
/// - 403 when the team is missing or the caller is not a member
/// - 503 when the membership validator fails
pub struct TeamMember(pub TeamMemberContext);

impl<S> FromRequestParts<S> for TeamMember
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);
        let AuthenticatedUser(principal) =
            AuthenticatedUser::from_request_parts(parts, state).await?;

        let ctx = RequestContext {
            principal: Some(principal),
            group_id: RequestContext::group_id_from_query(parts.uri.query()),
            credential: authorization_header(parts).map(Credential::new),
        };

        let decision = auth_state
            .evaluator
            .evaluate(&AuthorizationPolicy::team_member(), &ctx)
            .await
            .inspect_err(|e| {
                tracing::warn!(error = %e, category = %e.category(), "Team membership check failed");
            })?;

        match (decision, ctx) {
            (
                AccessDecision::Allow,
                RequestContext {
                    principal: Some(principal),
                    group_id: Some(group_id),
                    ..
                },
            ) => Ok(TeamMember(TeamMemberContext {
                principal,
                group_id,
            })),
            (AccessDecision::Deny(DenyReason::Unauthenticated), _) => {
                Err(AuthError::unauthorized(DenyReason::Unauthenticated.to_string()))
            }
            (AccessDecision::Deny(reason), _) => Err(AuthError::forbidden(reason.to_string())),
            (AccessDecision::Allow, _) => Err(AuthError::internal(
                "team-member policy allowed a request without a team",
            )),
        }
    }
}

fn authorization_header(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
}
