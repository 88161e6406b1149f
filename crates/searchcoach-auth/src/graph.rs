//! Microsoft Graph membership validator.
//!
//! Checks membership with the `checkMemberGroups` action on the user,
//! called with the signed-in user's token:
//!
//! ```text
//! POST {base_url}/v1.0/users/{userId}/checkMemberGroups
//! { "groupIds": ["{groupId}"] }
//! ```
//!
//! The response lists the subset of the requested groups the user belongs
//! to, so the user is a member iff the group id comes back.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::GraphConfig;
use crate::error::AuthError;
use crate::membership::{Credential, MembershipValidator, ValidatorError};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckMemberGroupsRequest<'a> {
    group_ids: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct CheckMemberGroupsResponse {
    value: Vec<String>,
}

/// Membership validator backed by Microsoft Graph.
#[derive(Debug, Clone)]
pub struct GraphMemberValidator {
    http_client: reqwest::Client,
    base_url: String,
}

impl GraphMemberValidator {
    /// Creates a validator from configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn new(config: &GraphConfig) -> Result<Self, AuthError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AuthError::configuration(format!("Graph HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn check_member_groups_url(&self, user_id: &str) -> Result<url::Url, ValidatorError> {
        let mut url = url::Url::parse(&self.base_url)
            .map_err(|e| ValidatorError::transport(format!("invalid Graph base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| ValidatorError::transport("Graph base URL cannot be a base"))?
            .pop_if_empty()
            .extend(["v1.0", "users", user_id, "checkMemberGroups"]);
        Ok(url)
    }
}

#[async_trait]
impl MembershipValidator for GraphMemberValidator {
    async fn validate(
        &self,
        user_id: &str,
        group_id: &str,
        credential: &Credential,
    ) -> Result<bool, ValidatorError> {
        if credential.is_empty() {
            return Err(ValidatorError::Rejected { status: 401 });
        }

        let url = self.check_member_groups_url(user_id)?;
        let response = self
            .http_client
            .post(url)
            .bearer_auth(credential.bearer_token())
            .json(&CheckMemberGroupsRequest {
                group_ids: [group_id],
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ValidatorError::Timeout
                } else {
                    ValidatorError::transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let err = ValidatorError::Rejected {
                status: status.as_u16(),
            };
            if err.is_auth_rejection() {
                tracing::debug!(status = status.as_u16(), "Graph rejected the user token");
            } else {
                tracing::warn!(status = status.as_u16(), "Graph membership check failed");
            }
            return Err(err);
        }

        let body: CheckMemberGroupsResponse = response
            .json()
            .await
            .map_err(|e| ValidatorError::invalid_response(e.to_string()))?;

        Ok(body.value.iter().any(|id| id == group_id))
    }
}
