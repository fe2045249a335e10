//! Participant collection
//!
//! Walks the enabled engagement listings for a post and folds them into a
//! single deduplicated participant list.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::directory::{DirectoryClient, DirectoryError, ProfileView};
use crate::error::{PickError, Result};
use crate::models::{Participant, SignalFilter};
use crate::post::PostReference;

/// Participants of one post plus its owner.
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub participants: Vec<Participant>,
    pub owner_handle: String,
}

/// Insertion-ordered set of participants keyed by handle. The first
/// avatar seen for a handle wins.
#[derive(Default)]
struct ParticipantSet {
    seen: HashSet<String>,
    entries: Vec<Participant>,
}

impl ParticipantSet {
    fn insert(&mut self, profile: &ProfileView) {
        if self.seen.insert(profile.handle.clone()) {
            self.entries
                .push(Participant::new(&profile.handle, profile.avatar.clone()));
        }
    }

    fn insert_participant(&mut self, participant: Participant) {
        if self.seen.insert(participant.handle.clone()) {
            self.entries.push(participant);
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Collapse a caller-supplied list to one entry per handle, keeping the
/// first occurrence.
pub fn dedup_participants(participants: Vec<Participant>) -> Vec<Participant> {
    let mut set = ParticipantSet::default();
    for participant in participants {
        set.insert_participant(participant);
    }
    set.entries
}

/// Collect everyone who engaged with `post` through the enabled signals.
pub async fn aggregate(
    directory: &dyn DirectoryClient,
    post: &PostReference,
    signals: SignalFilter,
) -> Result<Aggregation> {
    if !signals.any() {
        return Err(PickError::Validation(
            "Select at least one participation criterion.",
        ));
    }

    let mut set = ParticipantSet::default();

    if signals.reposts {
        collect_reposts(directory, &post.canonical_ref, &mut set).await?;
        debug!("{} participants after reposts", set.len());
    }

    if signals.likes {
        collect_likes(directory, &post.canonical_ref, &mut set).await?;
        debug!("{} participants after likes", set.len());
    }

    if signals.comments {
        match directory.list_replies(&post.canonical_ref).await {
            Ok(thread) => {
                for author in thread.reply_authors() {
                    set.insert(author);
                }
                debug!("{} participants after replies", set.len());
            }
            Err(e) => {
                warn!("Failed to fetch replies for {}: {}", post.canonical_ref, e);
            }
        }
    }

    info!(
        "Collected {} unique participants for {}",
        set.len(),
        post.canonical_ref
    );

    Ok(Aggregation {
        participants: set.entries,
        owner_handle: post.owner_handle.clone(),
    })
}

async fn collect_reposts(
    directory: &dyn DirectoryClient,
    post_ref: &str,
    set: &mut ParticipantSet,
) -> std::result::Result<(), DirectoryError> {
    let mut cursor: Option<String> = None;
    loop {
        let page = directory.list_reposts(post_ref, cursor.as_deref()).await?;
        if page.reposted_by.is_empty() {
            break;
        }
        for profile in &page.reposted_by {
            set.insert(profile);
        }
        match page.cursor {
            Some(next) if !next.is_empty() => cursor = Some(next),
            _ => break,
        }
    }
    Ok(())
}

async fn collect_likes(
    directory: &dyn DirectoryClient,
    post_ref: &str,
    set: &mut ParticipantSet,
) -> std::result::Result<(), DirectoryError> {
    let mut cursor: Option<String> = None;
    loop {
        let page = directory.list_likes(post_ref, cursor.as_deref()).await?;
        if page.likes.is_empty() {
            break;
        }
        for like in &page.likes {
            set.insert(&like.actor);
        }
        match page.cursor {
            Some(next) if !next.is_empty() => cursor = Some(next),
            _ => break,
        }
    }
    Ok(())
}
