//! # searchcoach-auth
//!
//! Team membership authorization for the SearchCoach Teams app.
//!
//! This crate provides:
//! - A membership authorization cache with per-key single-flight lookups
//! - The Microsoft Graph membership validator
//! - Bearer token verification for the signed-in user
//! - Requirement-based authorization policies
//! - Axum extractors enforcing the team-member policy
//!
//! ## Modules
//!
//! - [`config`] - Token, Graph and membership cache configuration
//! - [`membership`] - The membership cache and the validator contract
//! - [`graph`] - Microsoft Graph backed membership validator
//! - [`token`] - Bearer token verification
//! - [`policy`] - Authorization requirements and their evaluation
//! - [`middleware`] - Axum extractors and error responses

pub mod config;
pub mod error;
pub mod graph;
pub mod membership;
pub mod middleware;
pub mod policy;
pub mod token;

pub use config::{AuthConfig, GraphConfig, TokenConfig};
pub use error::{AuthError, ErrorCategory};
pub use graph::GraphMemberValidator;
pub use membership::{
    Credential, MembershipCache, MembershipCacheConfig, MembershipCacheStats, MembershipError,
    MembershipKey, MembershipValidator, ValidatorError,
};
pub use middleware::{AuthState, AuthenticatedUser, TeamMember, TeamMemberContext};
pub use policy::{
    AccessDecision, AuthorizationPolicy, DenyReason, PolicyEvaluator, RequestContext, Requirement,
};
pub use token::{Principal, TokenVerifier};

/// Type alias for authentication/authorization results.
pub type AuthResult<T> = Result<T, AuthError>;
