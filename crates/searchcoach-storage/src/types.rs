//! Stored entity types.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Configuration recorded for a team that installed the app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamEntity {
    /// Bot Framework team id (`19:...@thread.tacv2`).
    pub team_id: String,
    /// Directory group id of the team, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    /// Display name of the team.
    #[serde(default)]
    pub team_name: String,
    /// Bot Framework service URL used for proactive messages.
    pub service_url: String,
    /// Object id of the user who installed the app.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_by: Option<String>,
    /// When the app was installed.
    #[serde(with = "time::serde::rfc3339")]
    pub installed_at: OffsetDateTime,
}

impl TeamEntity {
    /// Creates an entity installed now.
    #[must_use]
    pub fn new(team_id: impl Into<String>, service_url: impl Into<String>) -> Self {
        Self {
            team_id: team_id.into(),
            group_id: None,
            team_name: String::new(),
            service_url: service_url.into(),
            installed_by: None,
            installed_at: OffsetDateTime::now_utc(),
        }
    }

    /// Sets the team display name.
    #[must_use]
    pub fn with_team_name(mut self, team_name: impl Into<String>) -> Self {
        self.team_name = team_name.into();
        self
    }

    /// Sets the directory group id.
    #[must_use]
    pub fn with_group_id(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    /// Sets the installing user.
    #[must_use]
    pub fn with_installed_by(mut self, installed_by: impl Into<String>) -> Self {
        self.installed_by = Some(installed_by.into());
        self
    }
}
