//! Remote account directory
//!
//! The picker only needs a handful of read-only listings from the social
//! network: profile lookup, reposts, likes, direct replies and followers.
//! They are expressed as the [`DirectoryClient`] trait so the draw logic
//! can run against the live Bluesky API ([`BlueskyClient`]) or a scripted
//! fake in tests.

pub mod bluesky;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use bluesky::BlueskyClient;

/// Errors returned by directory lookups.
#[derive(thiserror::Error, Debug)]
pub enum DirectoryError {
    /// Transport failure (network, DNS, TLS, timeout).
    #[error("request to {method} failed: {source}")]
    Http {
        method: &'static str,
        source: reqwest::Error,
    },

    /// The service answered with a structured XRPC error.
    #[error("{method} returned {error}: {message}")]
    Xrpc {
        method: &'static str,
        status: u16,
        error: String,
        message: String,
    },

    /// Non-success status without a parseable XRPC error body.
    #[error("unexpected status {status} from {method}")]
    UnexpectedStatus {
        method: &'static str,
        status: reqwest::StatusCode,
    },

    /// The response body did not match the expected shape.
    #[error("failed to decode {method} response: {source}")]
    Decode {
        method: &'static str,
        source: reqwest::Error,
    },

    #[error("actor '{0}' not found")]
    ActorNotFound(String),

    #[error("login failed: {0}")]
    Login(String),
}

impl DirectoryError {
    /// Whether this error means the requested account does not exist.
    /// Message text only counts for methods that take an `actor`.
    pub fn is_actor_not_found(&self) -> bool {
        match self {
            DirectoryError::ActorNotFound(_) => true,
            DirectoryError::Xrpc {
                method,
                error,
                message,
                ..
            } => {
                if error == "ActorNotFound" {
                    return true;
                }
                let takes_actor =
                    *method == bluesky::GET_PROFILE || *method == bluesky::GET_FOLLOWERS;
                let message = message.to_lowercase();
                takes_actor
                    && (message.starts_with("profile not found")
                        || message.starts_with("actor not found")
                        || message.starts_with("unable to resolve"))
            }
            _ => false,
        }
    }

    /// Replace an XRPC "no such account" answer with [`DirectoryError::ActorNotFound`].
    pub(crate) fn for_actor(self, handle: &str) -> Self {
        if self.is_actor_not_found() {
            DirectoryError::ActorNotFound(handle.to_string())
        } else {
            self
        }
    }
}

/// Basic profile view returned by every listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileView {
    pub did: String,
    pub handle: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// One page of `app.bsky.feed.getRepostedBy`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepostPage {
    #[serde(default)]
    pub reposted_by: Vec<ProfileView>,
    #[serde(default)]
    pub cursor: Option<String>,
}

/// One page of `app.bsky.feed.getLikes`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LikePage {
    #[serde(default)]
    pub likes: Vec<Like>,
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Like {
    pub actor: ProfileView,
}

/// One page of `app.bsky.graph.getFollowers`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FollowerPage {
    #[serde(default)]
    pub followers: Vec<ProfileView>,
    #[serde(default)]
    pub cursor: Option<String>,
}

/// Result of `app.bsky.feed.getPostThread`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplyThread {
    pub thread: ThreadNode,
}

/// A node in a post thread. Only fully visible posts carry an author.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "$type")]
pub enum ThreadNode {
    #[serde(rename = "app.bsky.feed.defs#threadViewPost")]
    Post(ThreadViewPost),
    #[serde(rename = "app.bsky.feed.defs#notFoundPost")]
    NotFound { uri: String },
    #[serde(rename = "app.bsky.feed.defs#blockedPost")]
    Blocked { uri: String },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThreadViewPost {
    pub post: PostView,
    #[serde(default)]
    pub replies: Vec<ThreadNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostView {
    pub uri: String,
    pub author: ProfileView,
}

impl ReplyThread {
    /// Authors of the direct replies that are visible posts.
    pub fn reply_authors(&self) -> Vec<&ProfileView> {
        match &self.thread {
            ThreadNode::Post(root) => root
                .replies
                .iter()
                .filter_map(|reply| match reply {
                    ThreadNode::Post(view) => Some(&view.post.author),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Read-only access to the account directory of the social network.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Look up a profile by handle.
    async fn resolve_actor(&self, handle: &str) -> Result<ProfileView, DirectoryError>;

    async fn list_reposts(
        &self,
        post_ref: &str,
        cursor: Option<&str>,
    ) -> Result<RepostPage, DirectoryError>;

    async fn list_likes(
        &self,
        post_ref: &str,
        cursor: Option<&str>,
    ) -> Result<LikePage, DirectoryError>;

    /// Direct replies only (thread depth 1).
    async fn list_replies(&self, post_ref: &str) -> Result<ReplyThread, DirectoryError>;

    async fn list_followers(
        &self,
        actor: &str,
        cursor: Option<&str>,
    ) -> Result<FollowerPage, DirectoryError>;
}
