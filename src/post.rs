//! Post URL parsing and resolution
//!
//! Accepts share links of the form
//! `https://bsky.app/profile/<handle-or-did>/post/<rkey>` and turns them
//! into a [`PostReference`] whose `canonical_ref` is the AT URI the
//! listing endpoints expect.

use reqwest::Url;
use tracing::debug;

use crate::directory::{DirectoryClient, DirectoryError};

const POST_COLLECTION: &str = "app.bsky.feed.post";

#[derive(thiserror::Error, Debug)]
pub enum PostUrlError {
    #[error("not a valid URL: {0}")]
    Malformed(String),

    #[error("unsupported URL scheme '{0}'")]
    UnsupportedScheme(String),

    #[error("expected /profile/<account>/post/<id>, got '{0}'")]
    UnexpectedPath(String),

    #[error("invalid post id '{0}'")]
    InvalidRecordKey(String),

    #[error("could not resolve post owner '{actor}': {source}")]
    OwnerUnresolved {
        actor: String,
        source: DirectoryError,
    },
}

/// The parts of a post share link, before any remote lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostUrl {
    /// Handle or DID as written in the link.
    pub actor: String,
    pub rkey: String,
}

/// A post resolved against the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostReference {
    pub owner_handle: String,
    pub post_id: String,
    /// `at://<did>/app.bsky.feed.post/<rkey>`
    pub canonical_ref: String,
}

fn is_valid_rkey(rkey: &str) -> bool {
    !rkey.is_empty()
        && rkey.len() <= 512
        && rkey != "."
        && rkey != ".."
        && rkey
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ':' | '~'))
}

impl PostUrl {
    pub fn parse(input: &str) -> Result<Self, PostUrlError> {
        let url = Url::parse(input.trim()).map_err(|e| PostUrlError::Malformed(e.to_string()))?;

        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(PostUrlError::UnsupportedScheme(url.scheme().to_string()));
        }
        if url.host_str().is_none() {
            return Err(PostUrlError::Malformed(input.to_string()));
        }

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();

        match segments.as_slice() {
            ["profile", actor, "post", rkey] => {
                if !is_valid_rkey(rkey) {
                    return Err(PostUrlError::InvalidRecordKey(rkey.to_string()));
                }
                Ok(Self {
                    actor: actor.to_string(),
                    rkey: rkey.to_string(),
                })
            }
            _ => Err(PostUrlError::UnexpectedPath(url.path().to_string())),
        }
    }

    /// Look up the owner and build the canonical post reference.
    pub async fn resolve(
        &self,
        directory: &dyn DirectoryClient,
    ) -> Result<PostReference, PostUrlError> {
        let owner = directory
            .resolve_actor(&self.actor)
            .await
            .map_err(|source| PostUrlError::OwnerUnresolved {
                actor: self.actor.clone(),
                source,
            })?;

        let reference = PostReference {
            owner_handle: owner.handle,
            post_id: self.rkey.clone(),
            canonical_ref: format!("at://{}/{}/{}", owner.did, POST_COLLECTION, self.rkey),
        };
        debug!("Resolved post {}", reference.canonical_ref);
        Ok(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::fake::FakeDirectory;

    #[test]
    fn test_parse_share_link() {
        let post = PostUrl::parse("https://bsky.app/profile/alice.bsky.social/post/3kxyzabc2").unwrap();
        assert_eq!(post.actor, "alice.bsky.social");
        assert_eq!(post.rkey, "3kxyzabc2");
    }

    #[test]
    fn test_parse_accepts_did_and_trailing_slash() {
        let post = PostUrl::parse(" https://bsky.app/profile/did:plc:abc123/post/3kq/ ").unwrap();
        assert_eq!(post.actor, "did:plc:abc123");
        assert_eq!(post.rkey, "3kq");
    }

    #[test]
    fn test_parse_rejects_wrong_shapes() {
        assert!(matches!(
            PostUrl::parse("not a url"),
            Err(PostUrlError::Malformed(_))
        ));
        assert!(matches!(
            PostUrl::parse("ftp://bsky.app/profile/a/post/b"),
            Err(PostUrlError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            PostUrl::parse("https://bsky.app/profile/alice.bsky.social"),
            Err(PostUrlError::UnexpectedPath(_))
        ));
        assert!(matches!(
            PostUrl::parse("https://bsky.app/profile/alice.bsky.social/feed/3k"),
            Err(PostUrlError::UnexpectedPath(_))
        ));
        assert!(matches!(
            PostUrl::parse("https://bsky.app/profile/alice.bsky.social/post/3k/extra"),
            Err(PostUrlError::UnexpectedPath(_))
        ));
        assert!(matches!(
            PostUrl::parse("https://bsky.app/profile/alice.bsky.social/post/bad%20key"),
            Err(PostUrlError::InvalidRecordKey(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_builds_canonical_ref() {
        let directory = FakeDirectory::with_owner("alice.bsky.social");
        let post = PostUrl::parse("https://bsky.app/profile/alice.bsky.social/post/3k").unwrap();

        let reference = post.resolve(&directory).await.unwrap();
        assert_eq!(reference.owner_handle, "alice.bsky.social");
        assert_eq!(reference.post_id, "3k");
        assert_eq!(
            reference.canonical_ref,
            "at://did:plc:alicebskysocial/app.bsky.feed.post/3k"
        );
    }

    #[tokio::test]
    async fn test_resolve_fails_for_unknown_owner() {
        let directory = FakeDirectory::default();
        let post = PostUrl::parse("https://bsky.app/profile/ghost.bsky.social/post/3k").unwrap();

        let err = post.resolve(&directory).await.unwrap_err();
        assert!(matches!(err, PostUrlError::OwnerUnresolved { ref actor, .. } if actor == "ghost.bsky.social"));
    }
}
