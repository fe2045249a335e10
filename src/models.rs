//! Shared data types

use serde::{Deserialize, Serialize};

/// An account that engaged with the giveaway post. Identity is the handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub handle: String,
    #[serde(default)]
    pub avatar: String,
}

impl Participant {
    pub fn new(handle: impl Into<String>, avatar: Option<String>) -> Self {
        Self {
            handle: handle.into(),
            avatar: avatar.unwrap_or_default(),
        }
    }
}

/// Which engagement signals count as an entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignalFilter {
    pub reposts: bool,
    pub comments: bool,
    pub likes: bool,
}

impl SignalFilter {
    pub fn any(&self) -> bool {
        self.reposts || self.comments || self.likes
    }
}

/// A completed fresh draw as stored in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawRecord {
    pub id: i64,
    pub post_url: String,
    pub draw_time: String,
    pub winner_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerRecord {
    pub id: i64,
    pub draw_id: i64,
    pub handle: String,
    pub avatar: String,
}

/// A draw together with its winners, as served by the history endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawWithWinners {
    #[serde(flatten)]
    pub draw: DrawRecord,
    pub winners: Vec<WinnerRecord>,
}
