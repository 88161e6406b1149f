//! Team installation events.

use crate::activity::{Activity, ActivityType};

/// An app installation change in a team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallationEvent {
    Installed {
        team_id: String,
        group_id: Option<String>,
        team_name: Option<String>,
        service_url: String,
        installed_by: Option<String>,
    },
    Uninstalled {
        team_id: String,
    },
}

impl InstallationEvent {
    /// Interprets an `installationUpdate` activity sent in a team scope.
    ///
    /// Returns `None` for other activities, personal-scope installs and
    /// unknown actions.
    #[must_use]
    pub fn from_activity(activity: &Activity) -> Option<Self> {
        if !activity.is(ActivityType::INSTALLATION_UPDATE) {
            return None;
        }
        let team = activity.team()?;

        match activity.action.as_deref()? {
            "add" => Some(Self::Installed {
                team_id: team.id.clone(),
                group_id: team.aad_group_id.clone(),
                team_name: team.name.clone(),
                service_url: activity.service_url.clone()?,
                installed_by: activity.from.as_ref().and_then(|f| f.aad_object_id.clone()),
            }),
            "remove" => Some(Self::Uninstalled {
                team_id: team.id.clone(),
            }),
            other => {
                tracing::debug!(action = other, team_id = %team.id, "Ignoring installation action");
                None
            }
        }
    }

    pub fn team_id(&self) -> &str {
        match self {
            Self::Installed { team_id, .. } | Self::Uninstalled { team_id } => team_id,
        }
    }
}
