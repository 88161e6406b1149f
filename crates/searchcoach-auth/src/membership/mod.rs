//! Team membership authorization cache.
//!
//! Answers "is user U currently a member of group G?" and remembers the
//! answer for a configurable window. Concurrent lookups of the same
//! (group, user) pair share one validator call.
//!
//! # Example
//!
//! ```ignore
//! use searchcoach_auth::membership::{Credential, MembershipCache, MembershipCacheConfig};
//! use std::sync::Arc;
//!
//! let validator: Arc<dyn MembershipValidator> = /* ... */;
//! let cache = MembershipCache::new(validator, MembershipCacheConfig::default());
//!
//! let credential = Credential::new("Bearer eyJ0eXAi...");
//! let allowed = cache.is_member("team-42", "user-7", &credential).await?;
//! ```

pub mod cache;
pub mod key;
pub mod validator;

pub use crate::config::MembershipCacheConfig;
pub use cache::{MembershipCache, MembershipCacheStats};
pub use key::{Credential, MembershipKey};
pub use validator::{MembershipValidator, ValidatorError};

/// Errors returned by [`MembershipCache::is_member`].
///
/// Clonable so that one validator outcome can be handed to every caller
/// waiting on the same lookup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MembershipError {
    /// The group or user identifier is empty.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Which argument was rejected.
        message: String,
    },

    /// The membership validator failed.
    #[error("Membership validation failed: {0}")]
    ValidatorFailure(#[from] ValidatorError),

    /// The validator call ended without producing a decision.
    #[error("Membership validation was interrupted")]
    Interrupted,
}

impl MembershipError {
    /// Creates a new `InvalidArgument` error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}
