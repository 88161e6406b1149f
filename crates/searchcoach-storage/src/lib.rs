//! # searchcoach-storage
//!
//! Storage for per-team SearchCoach configuration.
//!
//! A team's configuration is written when the app is installed into the team
//! and removed when it is uninstalled. The [`TeamStorage`] trait is the
//! contract every backend implements; [`InMemoryTeamStorage`] is the
//! process-local backend.
//!
//! ## Example
//!
//! ```ignore
//! use searchcoach_storage::{InMemoryTeamStorage, TeamStorage};
//!
//! let storage = InMemoryTeamStorage::new();
//! storage.upsert_team(&team).await?;
//! let stored = storage.get_team(&team.team_id).await?;
//! ```

mod error;
mod memory;
mod traits;
mod types;

pub use error::{StorageError, StorageResult};
pub use memory::InMemoryTeamStorage;
pub use traits::TeamStorage;
pub use types::TeamEntity;

/// Type alias for a shareable storage backend.
pub type DynTeamStorage = std::sync::Arc<dyn TeamStorage>;
