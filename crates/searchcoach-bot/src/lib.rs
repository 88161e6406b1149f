//! # searchcoach-bot
//!
//! Handling of Bot Framework activities posted to the SearchCoach bot.
//!
//! - [`activity`] - The subset of the activity schema the bot reads
//! - [`tenant`] - Rejects activities from tenants other than the configured one
//! - [`installation`] - Team installation and removal events

pub mod activity;
pub mod installation;
pub mod tenant;

pub use activity::{Activity, ActivityType, ChannelAccount, ChannelData, ConversationAccount, TeamInfo};
pub use installation::InstallationEvent;
pub use tenant::{TenantDecision, TenantFilter};
