//! Policy evaluation.

use crate::AuthResult;
use crate::membership::MembershipCache;

use super::{AccessDecision, AuthorizationPolicy, DenyReason, RequestContext, Requirement};

/// Evaluates [`AuthorizationPolicy`] values against a request.
#[derive(Clone)]
pub struct PolicyEvaluator {
    membership: MembershipCache,
}

impl PolicyEvaluator {
    /// Creates an evaluator backed by the shared membership cache.
    #[must_use]
    pub fn new(membership: MembershipCache) -> Self {
        Self { membership }
    }

    /// Returns the membership cache used by the team-member requirement.
    #[must_use]
    pub fn membership(&self) -> &MembershipCache {
        &self.membership
    }

    /// Evaluates every requirement of `policy`, stopping at the first denial.
    ///
    /// # Errors
    ///
    /// Returns `MembershipUnavailable` when the membership validator fails;
    /// such a request is neither allowed nor denied.
    pub async fn evaluate(
        &self,
        policy: &AuthorizationPolicy,
        ctx: &RequestContext,
    ) -> AuthResult<AccessDecision> {
        for requirement in &policy.requirements {
            let decision = match requirement {
                Requirement::Authenticated => check_authenticated(ctx),
                Requirement::TeamMember => self.check_team_member(ctx).await?,
            };

            if let AccessDecision::Deny(reason) = &decision {
                tracing::debug!(
                    policy = policy.name,
                    requirement = %requirement,
                    reason = %reason,
                    "Authorization requirement not met"
                );
                return Ok(decision);
            }
        }

        Ok(AccessDecision::Allow)
    }

    async fn check_team_member(&self, ctx: &RequestContext) -> AuthResult<AccessDecision> {
        let Some(principal) = &ctx.principal else {
            return Ok(AccessDecision::Deny(DenyReason::Unauthenticated));
        };
        let Some(group_id) = ctx.group_id.as_deref().filter(|g| !g.trim().is_empty()) else {
            return Ok(AccessDecision::Deny(DenyReason::MissingGroup));
        };
        let Some(credential) = ctx.credential.as_ref().filter(|c| !c.is_empty()) else {
            return Ok(AccessDecision::Deny(DenyReason::MissingCredential));
        };

        let is_member = self
            .membership
            .is_member(group_id, &principal.object_id, credential)
            .await?;

        if is_member {
            Ok(AccessDecision::Allow)
        } else {
            Ok(AccessDecision::Deny(DenyReason::NotTeamMember {
                group_id: group_id.to_string(),
            }))
        }
    }
}

fn check_authenticated(ctx: &RequestContext) -> AccessDecision {
    if ctx.principal.is_some() {
        AccessDecision::Allow
    } else {
        AccessDecision::Deny(DenyReason::Unauthenticated)
    }
}
