//! Giveaway Picker - Draw random winners from Bluesky post engagement
//!
//! Given a post share link, the picker gathers everyone who reposted,
//! liked or replied to it, applies the giveaway rules and draws winners.
//!
//! # How it works
//!
//! 1. The post URL is parsed and its owner resolved to an AT URI
//! 2. Reposts, likes and direct replies are paged and merged by handle
//! 3. The owner, previous winners and (optionally) non-followers of a
//!    given account are removed
//! 4. Winners are drawn uniformly without replacement
//! 5. Fresh draws are written to the local ledger; re-rolls are not
//!
//! # Fairness rules
//!
//! - The post author can never win their own giveaway
//! - Each account has exactly one entry regardless of how it engaged
//! - Asking for more winners than entrants draws everyone remaining

pub mod aggregator;
pub mod config;
pub mod directory;
pub mod eligibility;
pub mod error;
pub mod ledger;
pub mod models;
pub mod picker;
pub mod post;
pub mod selector;
pub mod server;

pub use config::{Config, Credentials};
pub use directory::{BlueskyClient, DirectoryClient, DirectoryError};
pub use error::PickError;
pub use ledger::DrawLedger;
pub use models::{DrawRecord, Participant, SignalFilter, WinnerRecord};
pub use picker::{GiveawayPicker, PickRequest, PickResponse};
