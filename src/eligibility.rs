//! Eligibility rules applied before the draw

use std::collections::HashSet;

use tracing::{debug, info};

use crate::directory::DirectoryClient;
use crate::error::{PickError, Result};
use crate::models::Participant;

/// Page the follower listing of `handle` to exhaustion.
///
/// An unknown handle is reported as [`PickError::AccountNotFound`]. Any
/// other failure aborts the request; a partial follower set is never
/// returned as if it were complete.
pub async fn collect_followers(
    directory: &dyn DirectoryClient,
    handle: &str,
) -> Result<HashSet<String>> {
    let mut followers = HashSet::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = directory
            .list_followers(handle, cursor.as_deref())
            .await
            .map_err(|e| {
                if e.is_actor_not_found() {
                    PickError::AccountNotFound(handle.to_string())
                } else {
                    PickError::Remote(e)
                }
            })?;

        if page.followers.is_empty() {
            break;
        }
        followers.extend(page.followers.into_iter().map(|f| f.handle));

        match page.cursor {
            Some(next) if !next.is_empty() => cursor = Some(next),
            _ => break,
        }
        debug!("{} followers of {} so far", followers.len(), handle);
    }

    info!("{} has {} followers", handle, followers.len());
    Ok(followers)
}

/// Keep the participants that may win: never the post owner, never a
/// handle in `exclude`, and only followers when a follower set is given.
pub fn filter(
    participants: &[Participant],
    owner_handle: &str,
    exclude: &HashSet<String>,
    followers: Option<&HashSet<String>>,
) -> Vec<Participant> {
    participants
        .iter()
        .filter(|p| {
            let is_owner = p.handle == owner_handle;
            let is_excluded = exclude.contains(&p.handle);
            let follows = followers.map_or(true, |set| set.contains(&p.handle));
            !is_owner && !is_excluded && follows
        })
        .cloned()
        .collect()
}
