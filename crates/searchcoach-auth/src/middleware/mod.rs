//! HTTP integration for authentication and authorization.
//!
//! This module provides Axum extractors for:
//!
//! - Bearer token verification ([`AuthenticatedUser`])
//! - The team-member policy ([`TeamMember`])
//! - JSON error responses for [`AuthError`](crate::AuthError)
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::get};
//! use searchcoach_auth::middleware::{AuthState, TeamMember};
//!
//! async fn leaderboard(TeamMember(member): TeamMember) -> String {
//!     format!("{} may view team {}", member.principal.object_id, member.group_id)
//! }
//!
//! let app = Router::new()
//!     .route("/api/leaderboard", get(leaderboard))
//!     .with_state(auth_state);
//! ```

pub mod error;
pub mod extract;

pub use extract::{AuthState, AuthenticatedUser, TeamMember, TeamMemberContext};
