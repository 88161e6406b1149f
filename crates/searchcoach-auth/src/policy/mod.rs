//! Authorization policies.
//!
//! A policy is a list of [`Requirement`]s that must all hold for a request.
//! Requirements form a closed set; each kind is checked by its own strategy
//! in [`PolicyEvaluator`].
//!
//! # Example
//!
//! ```ignore
//! use searchcoach_auth::policy::{AuthorizationPolicy, PolicyEvaluator, RequestContext};
//!
//! let evaluator = PolicyEvaluator::new(membership_cache);
//! let decision = evaluator
//!     .evaluate(&AuthorizationPolicy::team_member(), &context)
//!     .await?;
//! ```

pub mod evaluator;

pub use evaluator::PolicyEvaluator;

use std::fmt;

use crate::membership::Credential;
use crate::token::Principal;

/// Name of the query parameter carrying the team's group id.
pub const GROUP_ID_QUERY_PARAM: &str = "groupId";

/// A single condition a request must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Requirement {
    /// The caller presented a valid token.
    Authenticated,
    /// The caller is a member of the team named by the `groupId` parameter.
    TeamMember,
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authenticated => write!(f, "authenticated"),
            Self::TeamMember => write!(f, "team-member"),
        }
    }
}

/// A named set of requirements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationPolicy {
    /// Policy name, used in logs.
    pub name: &'static str,
    /// Requirements, checked in order.
    pub requirements: Vec<Requirement>,
}

impl AuthorizationPolicy {
    /// Any signed-in user.
    #[must_use]
    pub fn authenticated() -> Self {
        Self {
            name: "authenticated-user",
            requirements: vec![Requirement::Authenticated],
        }
    }

    /// A signed-in user who belongs to the requested team.
    #[must_use]
    pub fn team_member() -> Self {
        Self {
            name: "must-be-team-member",
            requirements: vec![Requirement::Authenticated, Requirement::TeamMember],
        }
    }
}

/// What the policy evaluator knows about a request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// The authenticated caller, if any.
    pub principal: Option<Principal>,
    /// Value of the `groupId` query parameter.
    pub group_id: Option<String>,
    /// Raw `Authorization` header value, forwarded to the validator.
    pub credential: Option<Credential>,
}

impl RequestContext {
    /// Reads the `groupId` parameter from a raw query string.
    ///
    /// The first occurrence wins.
    #[must_use]
    pub fn group_id_from_query(query: Option<&str>) -> Option<String> {
        url::form_urlencoded::parse(query?.as_bytes())
            .find(|(name, _)| name == GROUP_ID_QUERY_PARAM)
            .map(|(_, value)| value.into_owned())
    }
}

/// Outcome of evaluating a policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// Every requirement holds.
    Allow,
    /// The named requirement does not hold.
    Deny(DenyReason),
}

impl AccessDecision {
    /// Returns `true` for [`AccessDecision::Allow`].
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Why a request was denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    /// No authenticated principal.
    Unauthenticated,
    /// The request did not name a team.
    MissingGroup,
    /// No credential to forward to the validator.
    MissingCredential,
    /// The validator says the caller is not in the team.
    NotTeamMember {
        /// The team that was checked.
        group_id: String,
    },
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "authentication required"),
            Self::MissingGroup => {
                write!(f, "the '{GROUP_ID_QUERY_PARAM}' query parameter is required")
            }
            Self::MissingCredential => write!(f, "an Authorization header is required"),
            Self::NotTeamMember { group_id } => {
                write!(f, "user is not a member of team '{group_id}'")
            }
        }
    }
}
