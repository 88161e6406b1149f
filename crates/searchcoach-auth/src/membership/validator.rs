//! Membership validator contract.

use async_trait::async_trait;

use super::Credential;

/// Errors reported by a [`MembershipValidator`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidatorError {
    /// The validator could not be reached.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The validator did not answer in time.
    #[error("Validator timed out")]
    Timeout,

    /// The validator refused the request, usually because of the credential.
    #[error("Validator rejected the request with status {status}")]
    Rejected {
        /// HTTP status returned by the validator.
        status: u16,
    },

    /// The validator answered with something that is not a decision.
    #[error("Invalid validator response: {0}")]
    InvalidResponse(String),
}

impl ValidatorError {
    /// Creates a new `Transport` error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Creates a new `InvalidResponse` error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }

    /// Returns `true` if the credential itself was refused.
    #[must_use]
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, Self::Rejected { status: 401 | 403 })
    }
}

/// Decides whether a user belongs to a group.
///
/// Implementations own their latency and correctness; the cache only calls
/// them and never retries on its own.
#[async_trait]
pub trait MembershipValidator: Send + Sync {
    /// Returns `true` if `user_id` is a member of `group_id`.
    async fn validate(
        &self,
        user_id: &str,
        group_id: &str,
        credential: &Credential,
    ) -> Result<bool, ValidatorError>;
}
