//! Storage traits.

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::types::TeamEntity;

/// Persistence for per-team configuration.
///
/// Implementations must be thread-safe (`Send + Sync`).
#[async_trait]
pub trait TeamStorage: Send + Sync {
    /// Inserts or replaces the configuration of a team.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidEntity` if the team id is empty.
    async fn upsert_team(&self, team: &TeamEntity) -> StorageResult<()>;

    /// Reads a team's configuration.
    ///
    /// Returns `None` if the team is not installed.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues, not for missing teams.
    async fn get_team(&self, team_id: &str) -> StorageResult<Option<TeamEntity>>;

    /// Removes a team's configuration. Returns `true` if it existed.
    async fn delete_team(&self, team_id: &str) -> StorageResult<bool>;
}
