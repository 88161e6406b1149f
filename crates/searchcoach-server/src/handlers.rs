use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

use searchcoach_auth::{AuthError, TeamMember};
use searchcoach_bot::{Activity, InstallationEvent, TenantDecision};
use searchcoach_storage::{TeamEntity, TeamStorage};

use crate::error::ApiError;
use crate::server::AppState;

pub async fn healthz(State(state): State<AppState>) -> Json<Value> {
    let stats = state.auth.evaluator.membership().stats();
    Json(json!({
        "status": "ok",
        "membershipCache": {
            "entries": stats.entries,
            "hits": stats.hits,
            "misses": stats.misses,
            "validatorCalls": stats.validator_calls,
            "failures": stats.failures,
        }
    }))
}

/// Bot Framework messaging endpoint.
///
/// Activities from other tenants are dropped; a rejected message is answered
/// with the configured text in the response body.
pub async fn messages(
    State(state): State<AppState>,
    Json(activity): Json<Activity>,
) -> Result<Response, ApiError> {
    match state.tenant_filter.check(&activity) {
        TenantDecision::Continue => {}
        TenantDecision::Reject { reply: Some(text) } => {
            return Ok(Json(activity.reply_text(text)).into_response());
        }
        TenantDecision::Reject { reply: None } => return Ok(StatusCode::OK.into_response()),
    }

    match InstallationEvent::from_activity(&activity) {
        Some(InstallationEvent::Installed {
            team_id,
            group_id,
            team_name,
            service_url,
            installed_by,
        }) => {
            let mut team = TeamEntity::new(team_id, service_url)
                .with_team_name(team_name.unwrap_or_default());
            team.group_id = group_id;
            team.installed_by = installed_by;
            state.storage.upsert_team(&team).await?;
            tracing::info!(team_id = %team.team_id, "App installed in team");
        }
        Some(InstallationEvent::Uninstalled { team_id }) => {
            let removed = state.storage.delete_team(&team_id).await?;
            tracing::info!(team_id = %team_id, removed, "App removed from team");
        }
        None => {
            tracing::debug!(activity_type = %activity.activity_type, "Activity accepted");
        }
    }

    Ok(StatusCode::OK.into_response())
}

/// Returns the stored configuration of a team to one of its members.
pub async fn get_team(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
    TeamMember(member): TeamMember,
) -> Result<Json<TeamEntity>, ApiError> {
    let team = state
        .storage
        .get_team(&team_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("team '{team_id}' is not installed")))?;

    // Membership was checked against `groupId`; it has to be this team's group.
    // Teams installed without a group cannot be matched to any member.
    if team.group_id.as_deref() != Some(member.group_id.as_str()) {
        return Err(AuthError::forbidden(format!(
            "team '{team_id}' does not belong to group '{}'",
            member.group_id
        ))
        .into());
    }

    Ok(Json(team))
}

pub async fn me_membership(TeamMember(member): TeamMember) -> Json<Value> {
    Json(json!({
        "groupId": member.group_id,
        "userId": member.principal.object_id,
        "isMember": true,
    }))
}
