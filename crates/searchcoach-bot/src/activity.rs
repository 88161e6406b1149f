//! Bot Framework activity model.
//!
//! Only the fields the bot acts on are modelled; everything else in the
//! payload is ignored.

use serde::{Deserialize, Serialize};

/// Activity type names the bot distinguishes.
pub struct ActivityType;

impl ActivityType {
    pub const MESSAGE: &'static str = "message";
    pub const EVENT: &'static str = "event";
    pub const INSTALLATION_UPDATE: &'static str = "installationUpdate";
    pub const CONVERSATION_UPDATE: &'static str = "conversationUpdate";
}

/// An incoming activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "type")]
    pub activity_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// `add` or `remove` for installation updates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<ConversationAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<ChannelAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<ChannelAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_data: Option<ChannelData>,
}

impl Activity {
    /// Returns `true` if the activity has the given type.
    #[must_use]
    pub fn is(&self, activity_type: &str) -> bool {
        self.activity_type == activity_type
    }

    /// Tenant of the conversation the activity belongs to.
    #[must_use]
    pub fn tenant_id(&self) -> Option<&str> {
        self.conversation.as_ref()?.tenant_id.as_deref()
    }

    /// Team the activity was sent in, if it came from a team scope.
    #[must_use]
    pub fn team(&self) -> Option<&TeamInfo> {
        self.channel_data.as_ref()?.team.as_ref()
    }

    /// Builds a text reply addressed back to the sender's conversation.
    #[must_use]
    pub fn reply_text(&self, text: impl Into<String>) -> Activity {
        Activity {
            activity_type: ActivityType::MESSAGE.to_string(),
            text: Some(text.into()),
            service_url: self.service_url.clone(),
            conversation: self.conversation.clone(),
            from: self.recipient.clone(),
            recipient: self.from.clone(),
            ..Activity::default()
        }
    }
}

/// The conversation an activity belongs to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationAccount {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_type: Option<String>,
}

/// A user or bot account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelAccount {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Directory object id of a user account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aad_object_id: Option<String>,
}

/// Teams-specific channel data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<TenantInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<TeamInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TenantInfo {
    pub id: String,
}

/// The team an activity was sent in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamInfo {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aad_group_id: Option<String>,
}
