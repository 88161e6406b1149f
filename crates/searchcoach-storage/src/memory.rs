//! In-memory storage backend.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::{StorageError, StorageResult};
use crate::traits::TeamStorage;
use crate::types::TeamEntity;

/// Process-local team storage backed by a concurrent map.
#[derive(Debug, Default)]
pub struct InMemoryTeamStorage {
    teams: DashMap<String, TeamEntity>,
}

impl InMemoryTeamStorage {
    /// Creates an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of installed teams.
    #[must_use]
    pub fn len(&self) -> usize {
        self.teams.len()
    }

    /// Returns `true` if no team is installed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }
}

#[async_trait]
impl TeamStorage for InMemoryTeamStorage {
    async fn upsert_team(&self, team: &TeamEntity) -> StorageResult<()> {
        if team.team_id.trim().is_empty() {
            return Err(StorageError::invalid_entity("team id must not be empty"));
        }

        let replaced = self
            .teams
            .insert(team.team_id.clone(), team.clone())
            .is_some();
        tracing::debug!(team_id = %team.team_id, replaced, "Stored team configuration");
        Ok(())
    }

    async fn get_team(&self, team_id: &str) -> StorageResult<Option<TeamEntity>> {
        Ok(self.teams.get(team_id).map(|entry| entry.value().clone()))
    }

    async fn delete_team(&self, team_id: &str) -> StorageResult<bool> {
        let removed = self.teams.remove(team_id).is_some();
        tracing::debug!(team_id, removed, "Deleted team configuration");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(id: &str) -> TeamEntity {
        TeamEntity::new(id, "https://smba.example.net/emea/").with_team_name("Search Guild")
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let storage = InMemoryTeamStorage::new();
        storage.upsert_team(&team("team-1")).await.unwrap();

        let stored = storage.get_team("team-1").await.unwrap().unwrap();
        assert_eq!(stored.team_name, "Search Guild");
        assert_eq!(storage.len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_replaces() {
        let storage = InMemoryTeamStorage::new();
        storage.upsert_team(&team("team-1")).await.unwrap();
        storage
            .upsert_team(&team("team-1").with_team_name("Renamed"))
            .await
            .unwrap();

        let stored = storage.get_team("team-1").await.unwrap().unwrap();
        assert_eq!(stored.team_name, "Renamed");
        assert_eq!(storage.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_team() {
        let storage = InMemoryTeamStorage::new();
        assert!(storage.get_team("nope").await.unwrap().is_none());
        assert!(!storage.delete_team("nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete() {
        let storage = InMemoryTeamStorage::new();
        storage.upsert_team(&team("team-1")).await.unwrap();
        assert!(storage.delete_team("team-1").await.unwrap());
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_empty_id_is_rejected() {
        let storage = InMemoryTeamStorage::new();
        let err = storage.upsert_team(&team(" ")).await.unwrap_err();
        assert!(err.is_invalid_entity());
        assert!(storage.is_empty());
    }
}
