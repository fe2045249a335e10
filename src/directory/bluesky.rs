//! Bluesky XRPC client
//!
//! Logs in with an app password (`com.atproto.server.createSession`) and
//! calls the `app.bsky.*` read endpoints through the same service host,
//! which proxies them to the AppView.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{
    DirectoryClient, DirectoryError, FollowerPage, LikePage, ProfileView, ReplyThread, RepostPage,
};
use crate::config::{BlueskyConfig, Credentials};

const CREATE_SESSION: &str = "com.atproto.server.createSession";
pub(crate) const GET_PROFILE: &str = "app.bsky.actor.getProfile";
const GET_REPOSTED_BY: &str = "app.bsky.feed.getRepostedBy";
const GET_LIKES: &str = "app.bsky.feed.getLikes";
const GET_POST_THREAD: &str = "app.bsky.feed.getPostThread";
pub(crate) const GET_FOLLOWERS: &str = "app.bsky.graph.getFollowers";

const USER_AGENT: &str = concat!("giveaway-picker/", env!("CARGO_PKG_VERSION"));

#[derive(Serialize)]
struct CreateSessionRequest<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionResponse {
    access_jwt: String,
    handle: String,
}

/// Error body shared by all XRPC methods.
#[derive(Deserialize)]
struct XrpcErrorBody {
    error: String,
    #[serde(default)]
    message: Option<String>,
}

pub struct BlueskyClient {
    client: reqwest::Client,
    service_url: String,
    access_jwt: String,
    page_limit: u32,
}

impl BlueskyClient {
    /// Build a client around an existing session token.
    pub fn with_session(settings: &BlueskyConfig, access_jwt: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            service_url: settings.service_url.trim_end_matches('/').to_string(),
            access_jwt: access_jwt.into(),
            page_limit: settings.page_limit.clamp(1, 100),
        }
    }

    /// Open a session with the service credentials.
    pub async fn login(
        settings: &BlueskyConfig,
        credentials: &Credentials,
    ) -> Result<Self, DirectoryError> {
        let mut this = Self::with_session(settings, String::new());
        let url = this.xrpc_url(CREATE_SESSION);

        let response = this
            .client
            .post(&url)
            .json(&CreateSessionRequest {
                identifier: &credentials.identifier,
                password: &credentials.app_password,
            })
            .send()
            .await
            .map_err(|source| DirectoryError::Http {
                method: CREATE_SESSION,
                source,
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let message = match response.json::<XrpcErrorBody>().await {
                Ok(body) => body.message.unwrap_or(body.error),
                Err(_) => status.to_string(),
            };
            return Err(DirectoryError::Login(message));
        }

        let session: CreateSessionResponse =
            response
                .json()
                .await
                .map_err(|source| DirectoryError::Decode {
                    method: CREATE_SESSION,
                    source,
                })?;

        info!("Logged in to {} as {}", this.service_url, session.handle);
        this.access_jwt = session.access_jwt;
        Ok(this)
    }

    fn xrpc_url(&self, method: &str) -> String {
        format!("{}/xrpc/{}", self.service_url, method)
    }

    fn paged_query(
        &self,
        key: &'static str,
        value: &str,
        cursor: Option<&str>,
    ) -> Vec<(&'static str, String)> {
        let mut query = vec![(key, value.to_string()), ("limit", self.page_limit.to_string())];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }
        query
    }

    async fn get<T: DeserializeOwned>(
        &self,
        method: &'static str,
        query: &[(&'static str, String)],
    ) -> Result<T, DirectoryError> {
        let url = self.xrpc_url(method);
        debug!("GET {} {:?}", method, query);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_jwt)
            .query(query)
            .send()
            .await
            .map_err(|source| DirectoryError::Http { method, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(match response.json::<XrpcErrorBody>().await {
                Ok(body) => DirectoryError::Xrpc {
                    method,
                    status: status.as_u16(),
                    message: body.message.unwrap_or_default(),
                    error: body.error,
                },
                Err(_) => DirectoryError::UnexpectedStatus { method, status },
            });
        }

        response
            .json()
            .await
            .map_err(|source| DirectoryError::Decode { method, source })
    }
}

#[async_trait]
impl DirectoryClient for BlueskyClient {
    async fn resolve_actor(&self, handle: &str) -> Result<ProfileView, DirectoryError> {
        self.get(GET_PROFILE, &[("actor", handle.to_string())])
            .await
            .map_err(|e| e.for_actor(handle))
    }

    async fn list_reposts(
        &self,
        post_ref: &str,
        cursor: Option<&str>,
    ) -> Result<RepostPage, DirectoryError> {
        let query = self.paged_query("uri", post_ref, cursor);
        self.get(GET_REPOSTED_BY, &query).await
    }

    async fn list_likes(
        &self,
        post_ref: &str,
        cursor: Option<&str>,
    ) -> Result<LikePage, DirectoryError> {
        let query = self.paged_query("uri", post_ref, cursor);
        self.get(GET_LIKES, &query).await
    }

    async fn list_replies(&self, post_ref: &str) -> Result<ReplyThread, DirectoryError> {
        self.get(
            GET_POST_THREAD,
            &[
                ("uri", post_ref.to_string()),
                ("depth", "1".to_string()),
                ("parentHeight", "0".to_string()),
            ],
        )
        .await
    }

    async fn list_followers(
        &self,
        actor: &str,
        cursor: Option<&str>,
    ) -> Result<FollowerPage, DirectoryError> {
        let query = self.paged_query("actor", actor, cursor);
        self.get(GET_FOLLOWERS, &query)
            .await
            .map_err(|e| e.for_actor(actor))
    }
}
