//! Cache keys and caller credentials.

use std::fmt;

use super::MembershipError;

/// Identifies one cached membership decision.
///
/// Both parts are compared exactly; `"Team-42"` and `"team-42"` are
/// different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MembershipKey {
    group_id: String,
    user_id: String,
}

impl MembershipKey {
    /// Creates a key for the given group and user.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if either identifier is empty or blank.
    pub fn new(
        group_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Result<Self, MembershipError> {
        let group_id = group_id.into();
        let user_id = user_id.into();

        if group_id.trim().is_empty() {
            return Err(MembershipError::invalid_argument("groupId must not be empty"));
        }
        if user_id.trim().is_empty() {
            return Err(MembershipError::invalid_argument("userId must not be empty"));
        }

        Ok(Self { group_id, user_id })
    }

    /// The external group identifier.
    #[must_use]
    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// The external user identifier.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

impl fmt::Display for MembershipKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group_id, self.user_id)
    }
}

/// Caller-supplied bearer credential, opaque to the cache.
///
/// Usually the raw `Authorization` header value of the inbound request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wraps a credential value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The credential exactly as supplied.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// The token, if the credential uses the `Bearer` scheme (any case).
    #[must_use]
    pub fn bearer(&self) -> Option<&str> {
        let value = self.0.trim();
        if value.eq_ignore_ascii_case("bearer") {
            return Some("");
        }
        match value.split_once(' ') {
            Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => Some(token.trim()),
            _ => None,
        }
    }

    /// The token without a leading `Bearer ` scheme.
    #[must_use]
    pub fn bearer_token(&self) -> &str {
        self.bearer().unwrap_or_else(|| self.0.trim())
    }

    /// Returns `true` if no credential was supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bearer_token().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}
