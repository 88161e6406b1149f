//! Tenant filtering for incoming activities.

use crate::activity::{Activity, ActivityType};

/// Outcome of checking an activity's tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantDecision {
    /// Hand the activity to the bot.
    Continue,
    /// Drop the activity, optionally replying with `reply`.
    Reject { reply: Option<String> },
}

/// Accepts only activities from the tenant the app was configured for.
///
/// `event` activities are always accepted.
#[derive(Debug, Clone)]
pub struct TenantFilter {
    expected_tenant_id: String,
    rejection_text: String,
}

impl TenantFilter {
    /// Creates a filter for `expected_tenant_id`, replying to rejected
    /// messages with `rejection_text`.
    #[must_use]
    pub fn new(expected_tenant_id: impl Into<String>, rejection_text: impl Into<String>) -> Self {
        Self {
            expected_tenant_id: expected_tenant_id.into(),
            rejection_text: rejection_text.into(),
        }
    }

    /// Decides whether `activity` reaches the bot.
    ///
    /// Only rejected `message` activities get a reply; other activity types
    /// are dropped silently.
    pub fn check(&self, activity: &Activity) -> TenantDecision {
        if activity.is(ActivityType::EVENT)
            || activity.tenant_id() == Some(self.expected_tenant_id.as_str())
        {
            return TenantDecision::Continue;
        }

        tracing::warn!(
            activity_type = %activity.activity_type,
            tenant_id = activity.tenant_id().unwrap_or("<none>"),
            "Activity from unexpected tenant"
        );

        let reply = activity
            .is(ActivityType::MESSAGE)
            .then(|| self.rejection_text.clone());
        TenantDecision::Reject { reply }
    }
}
