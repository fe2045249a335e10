//! Draw orchestration
//!
//! Turns a `/pick_winner` request into a draw: validate, collect
//! participants (or reuse the caller's snapshot), apply eligibility rules,
//! select winners and record fresh draws in the ledger.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, warn};

use crate::aggregator::{aggregate, dedup_participants};
use crate::config::{BlueskyConfig, Credentials};
use crate::directory::{BlueskyClient, DirectoryClient};
use crate::eligibility::{collect_followers, filter};
use crate::error::{PickError, Result};
use crate::ledger::DrawLedger;
use crate::models::{Participant, SignalFilter};
use crate::post::{PostReference, PostUrl};
use crate::selector::select;

fn default_num_winners() -> i64 {
    1
}

/// Accept `2` as well as `"2"`; HTML form fields arrive as strings.
fn number_or_string<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid number of winners '{}'", s))),
    }
}

/// Body of `POST /pick_winner`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PickRequest {
    #[serde(default)]
    pub post_url: String,
    #[serde(default = "default_num_winners", deserialize_with = "number_or_string")]
    pub num_winners: i64,
    #[serde(default)]
    pub filter_repost: bool,
    #[serde(default)]
    pub filter_comments: bool,
    #[serde(default)]
    pub filter_likes: bool,
    #[serde(default)]
    pub filter_followers: bool,
    #[serde(default)]
    pub follower_check_handle: String,
    /// Non-empty means a re-roll, which is never recorded.
    #[serde(default)]
    pub exclude_winners: Vec<String>,
    /// Participant snapshot from an earlier response.
    #[serde(default)]
    pub participants: Option<Vec<Participant>>,
    #[serde(default)]
    pub post_owner: Option<String>,
}

/// Participants supplied by the caller instead of fetched. Handles are
/// unique; the owner is resolved from the post URL when not supplied.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub participants: Vec<Participant>,
    pub post_owner: Option<String>,
}

/// A validated request, ready to run.
#[derive(Debug, Clone)]
pub struct DrawPlan {
    pub post_url: String,
    pub num_winners: usize,
    pub signals: SignalFilter,
    pub follower_check: Option<String>,
    pub exclude: HashSet<String>,
    pub snapshot: Option<Snapshot>,
}

impl DrawPlan {
    pub fn is_reroll(&self) -> bool {
        !self.exclude.is_empty()
    }
}

impl PickRequest {
    /// Reject malformed requests before anything touches the network.
    pub fn validate(self) -> Result<DrawPlan> {
        let post_url = self.post_url.trim().to_string();
        if post_url.is_empty() {
            return Err(PickError::Validation("Post URL is required."));
        }

        let signals = SignalFilter {
            reposts: self.filter_repost,
            comments: self.filter_comments,
            likes: self.filter_likes,
        };
        if !signals.any() {
            return Err(PickError::Validation(
                "Select at least one participation criterion.",
            ));
        }

        let follower_check = if self.filter_followers {
            let handle = self
                .follower_check_handle
                .trim()
                .trim_start_matches('@')
                .to_string();
            if handle.is_empty() {
                return Err(PickError::Validation(
                    "Enter a handle for the follower check.",
                ));
            }
            Some(handle)
        } else {
            None
        };

        if self.num_winners < 1 {
            return Err(PickError::Validation(
                "Number of winners must be at least 1.",
            ));
        }

        let exclude = self
            .exclude_winners
            .iter()
            .map(|h| h.trim())
            .filter(|h| !h.is_empty())
            .map(str::to_string)
            .collect();

        let snapshot = match self.participants {
            Some(participants) if !participants.is_empty() => Some(Snapshot {
                participants: dedup_participants(participants),
                post_owner: self
                    .post_owner
                    .map(|owner| owner.trim().trim_start_matches('@').to_string())
                    .filter(|owner| !owner.is_empty()),
            }),
            _ => None,
        };

        Ok(DrawPlan {
            post_url,
            num_winners: usize::try_from(self.num_winners).unwrap_or(usize::MAX),
            signals,
            follower_check,
            exclude,
            snapshot,
        })
    }
}

/// Successful draw as returned to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct DrawOutcome {
    pub winner: Vec<Participant>,
    /// Size of the eligible pool the winners were drawn from.
    pub participant_count: usize,
    /// Every collected participant, for reuse in a later re-roll.
    pub participants: Vec<Participant>,
    pub post_owner: String,
    pub draw_time: String,
    /// Ledger id; absent for re-rolls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draw_id: Option<i64>,
}

/// Response body of `POST /pick_winner`. Always sent with HTTP 200.
#[derive(Debug, Clone, Serialize)]
pub struct PickResponse {
    pub success: bool,
    #[serde(flatten)]
    pub outcome: Option<DrawOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PickResponse {
    pub fn success(outcome: DrawOutcome) -> Self {
        Self {
            success: true,
            outcome: Some(outcome),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            outcome: None,
            error: Some(message.into()),
        }
    }
}

pub struct GiveawayPicker {
    ledger: Arc<DrawLedger>,
    bluesky: BlueskyConfig,
    credentials: Option<Credentials>,
}

impl GiveawayPicker {
    pub fn new(
        ledger: Arc<DrawLedger>,
        bluesky: BlueskyConfig,
        credentials: Option<Credentials>,
    ) -> Self {
        if credentials.is_none() {
            warn!("Bluesky credentials are not set; draws will be refused");
        }
        Self {
            ledger,
            bluesky,
            credentials,
        }
    }

    pub fn ledger(&self) -> &DrawLedger {
        &self.ledger
    }

    /// Handle one request end to end. Never fails: errors become a
    /// `success: false` response.
    pub async fn pick_winner(&self, request: PickRequest) -> PickResponse {
        match self.try_pick(request).await {
            Ok(outcome) => PickResponse::success(outcome),
            Err(e) => {
                warn!("Draw failed: {}", e);
                PickResponse::failure(e.to_string())
            }
        }
    }

    async fn try_pick(&self, request: PickRequest) -> Result<DrawOutcome> {
        let credentials = self.credentials.as_ref().ok_or(PickError::Config)?;
        let plan = request.validate()?;
        let directory = BlueskyClient::login(&self.bluesky, credentials).await?;
        self.run_draw(&directory, plan).await
    }

    /// Run a validated draw against `directory`.
    pub async fn run_draw(
        &self,
        directory: &dyn DirectoryClient,
        plan: DrawPlan,
    ) -> Result<DrawOutcome> {
        let reroll = plan.is_reroll();

        let (participants, post_owner) = match plan.snapshot {
            Some(snapshot) => {
                info!(
                    "Using caller snapshot of {} participants",
                    snapshot.participants.len()
                );
                let post_owner = match snapshot.post_owner {
                    Some(owner) => owner,
                    None => resolve_post(directory, &plan.post_url).await?.owner_handle,
                };
                (snapshot.participants, post_owner)
            }
            None => {
                let reference = resolve_post(directory, &plan.post_url).await?;
                let aggregation = aggregate(directory, &reference, plan.signals).await?;
                (aggregation.participants, aggregation.owner_handle)
            }
        };

        let followers = match &plan.follower_check {
            Some(handle) => Some(collect_followers(directory, handle).await?),
            None => None,
        };

        let eligible = filter(&participants, &post_owner, &plan.exclude, followers.as_ref());
        let winners = select(&eligible, plan.num_winners)?;
        let draw_time = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

        let draw_id = if reroll {
            info!(
                "Re-roll for {}: {} winners from {} eligible (not recorded)",
                plan.post_url,
                winners.len(),
                eligible.len()
            );
            None
        } else {
            let record = self
                .ledger
                .record_draw(&plan.post_url, &draw_time, &winners)
                .map_err(|e| PickError::Ledger(e.into()))?;
            Some(record.id)
        };

        Ok(DrawOutcome {
            winner: winners,
            participant_count: eligible.len(),
            participants,
            post_owner,
            draw_time,
            draw_id,
        })
    }
}

async fn resolve_post(directory: &dyn DirectoryClient, post_url: &str) -> Result<PostReference> {
    let post = PostUrl::parse(post_url).map_err(PickError::InvalidPost)?;
    post.resolve(directory)
        .await
        .map_err(PickError::InvalidPost)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::fake::{profiles, FakeDirectory};

    const POST_URL: &str = "https://bsky.app/profile/o/post/3k";

    fn picker(credentials: Option<Credentials>) -> GiveawayPicker {
        GiveawayPicker::new(
            Arc::new(DrawLedger::in_memory().unwrap()),
            crate::config::Config::default().bluesky,
            credentials,
        )
    }

    /// Reposts {a,b,c}, likes {b,d}, owner o.
    fn example_directory() -> FakeDirectory {
        let mut directory = FakeDirectory::with_owner("o");
        directory.reposts = vec![profiles(&["a", "b", "c", "o"])];
        directory.likes = vec![profiles(&["b", "d"])];
        directory
    }

    fn request(num_winners: i64) -> PickRequest {
        PickRequest {
            post_url: POST_URL.to_string(),
            num_winners,
            filter_repost: true,
            filter_likes: true,
            ..Default::default()
        }
    }

    fn handles(list: &[Participant]) -> HashSet<String> {
        list.iter().map(|p| p.handle.clone()).collect()
    }

    fn set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_validation_rules() {
        let mut req = request(1);
        req.post_url = "   ".to_string();
        assert_eq!(req.validate().unwrap_err().to_string(), "Post URL is required.");

        let mut req = request(1);
        req.filter_repost = false;
        req.filter_likes = false;
        assert!(matches!(req.validate(), Err(PickError::Validation(_))));

        let mut req = request(1);
        req.filter_followers = true;
        req.follower_check_handle = " @ ".to_string();
        assert!(matches!(req.validate(), Err(PickError::Validation(_))));

        assert!(matches!(request(0).validate(), Err(PickError::Validation(_))));
    }

    #[test]
    fn test_request_defaults_and_string_count() {
        let req: PickRequest = serde_json::from_str(
            r#"{"post_url": "https://bsky.app/profile/o/post/3k", "filter_likes": true}"#,
        )
        .unwrap();
        assert_eq!(req.num_winners, 1);
        assert!(req.exclude_winners.is_empty());

        let req: PickRequest =
            serde_json::from_str(r#"{"post_url": "x", "num_winners": " 3 "}"#).unwrap();
        assert_eq!(req.num_winners, 3);

        assert!(serde_json::from_str::<PickRequest>(r#"{"num_winners": "many"}"#).is_err());
    }

    #[test]
    fn test_empty_snapshot_is_ignored() {
        let mut req = request(1);
        req.participants = Some(Vec::new());
        req.post_owner = Some("o".to_string());
        assert!(req.validate().unwrap().snapshot.is_none());
    }

    #[tokio::test]
    async fn test_missing_credentials_reported_before_validation() {
        let picker = picker(None);
        let response = picker.pick_winner(PickRequest::default()).await;
        assert!(!response.success);
        assert_eq!(
            response.error.as_deref(),
            Some("Server credentials are not configured.")
        );
        assert_eq!(picker.ledger().total_draws().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_fresh_draw_is_recorded() {
        let picker = picker(None);
        let directory = example_directory();

        let outcome = picker
            .run_draw(&directory, request(2).validate().unwrap())
            .await
            .unwrap();

        assert_eq!(outcome.participant_count, 4);
        assert_eq!(outcome.post_owner, "o");
        assert_eq!(outcome.winner.len(), 2);
        assert!(handles(&outcome.winner).is_subset(&set(&["a", "b", "c", "d"])));
        assert_eq!(handles(&outcome.participants), set(&["a", "b", "c", "d", "o"]));

        let ledger = picker.ledger();
        assert_eq!(ledger.total_draws().unwrap(), 1);
        assert_eq!(ledger.total_winners().unwrap(), 2);
        let stored = ledger
            .draw_with_winners(outcome.draw_id.unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(stored.draw.winner_count, 2);
        assert_eq!(stored.draw.post_url, POST_URL);
        let stored_handles: HashSet<String> =
            stored.winners.iter().map(|w| w.handle.clone()).collect();
        assert_eq!(handles(&outcome.winner), stored_handles);
    }

    #[tokio::test]
    async fn test_follower_filter_narrows_and_clamps() {
        let picker = picker(None);
        let mut directory = example_directory();
        directory
            .followers
            .insert("x".to_string(), vec![profiles(&["a", "d"])]);

        let mut req = request(5);
        req.filter_followers = true;
        req.follower_check_handle = "x".to_string();

        let outcome = picker
            .run_draw(&directory, req.validate().unwrap())
            .await
            .unwrap();
        assert_eq!(handles(&outcome.winner), set(&["a", "d"]));
        assert_eq!(outcome.participant_count, 2);
    }

    #[tokio::test]
    async fn test_unknown_follower_account_aborts_draw() {
        let picker = picker(None);
        let directory = example_directory();

        let mut req = request(1);
        req.filter_followers = true;
        req.follower_check_handle = "x".to_string();

        let err = picker
            .run_draw(&directory, req.validate().unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Account 'x' not found.");
        assert_eq!(picker.ledger().total_draws().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reroll_is_not_recorded() {
        let picker = picker(None);
        let directory = example_directory();

        let mut req = request(1);
        req.exclude_winners = vec!["a".to_string(), "b".to_string()];

        let outcome = picker
            .run_draw(&directory, req.validate().unwrap())
            .await
            .unwrap();
        assert!(outcome.draw_id.is_none());
        assert!(handles(&outcome.winner).is_subset(&set(&["c", "d"])));
        assert_eq!(picker.ledger().total_draws().unwrap(), 0);
        assert_eq!(picker.ledger().total_winners().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_reroll_is_not_recorded() {
        let picker = picker(None);
        let directory = example_directory();

        let mut req = request(1);
        req.exclude_winners = vec!["a".into(), "b".into(), "c".into(), "d".into()];

        let err = picker
            .run_draw(&directory, req.validate().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, PickError::NoEligibleParticipants));
        assert_eq!(picker.ledger().total_draws().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_snapshot_skips_remote_collection() {
        let picker = picker(None);
        let directory = FakeDirectory::default();

        let mut req = request(1);
        req.participants = Some(vec![
            Participant::new("o", None),
            Participant::new("z", Some("https://cdn/z.jpg".to_string())),
        ]);
        req.post_owner = Some("o".to_string());
        req.exclude_winners = vec!["y".to_string()];

        let outcome = picker
            .run_draw(&directory, req.validate().unwrap())
            .await
            .unwrap();
        assert_eq!(outcome.winner[0].handle, "z");
        assert_eq!(outcome.participants.len(), 2);
        assert!(directory.calls().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_with_duplicates_draws_distinct_winners() {
        let picker = picker(None);
        let directory = FakeDirectory::default();

        let mut req = request(2);
        req.participants = Some(vec![
            Participant::new("a", Some("https://cdn/a.jpg".to_string())),
            Participant::new("a", None),
        ]);
        req.post_owner = Some("o".to_string());

        let outcome = picker
            .run_draw(&directory, req.validate().unwrap())
            .await
            .unwrap();
        assert_eq!(outcome.winner.len(), 1);
        assert_eq!(outcome.winner[0].handle, "a");
        assert_eq!(outcome.winner[0].avatar, "https://cdn/a.jpg");
        assert_eq!(outcome.participant_count, 1);
        assert_eq!(outcome.participants.len(), 1);
        assert_eq!(picker.ledger().total_winners().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_without_owner_resolves_post_author() {
        let picker = picker(None);
        let directory = FakeDirectory::with_owner("o");

        let mut req = request(5);
        req.participants = Some(vec![Participant::new("o", None), Participant::new("z", None)]);
        req.post_owner = Some("  ".to_string());

        let outcome = picker
            .run_draw(&directory, req.validate().unwrap())
            .await
            .unwrap();
        assert_eq!(outcome.post_owner, "o");
        assert_eq!(handles(&outcome.winner), set(&["z"]));
        assert_eq!(outcome.participant_count, 1);
        assert_eq!(directory.calls(), vec!["resolve:o"]);
    }

    #[tokio::test]
    async fn test_snapshot_fresh_draw_is_recorded() {
        let picker = picker(None);
        let directory = FakeDirectory::default();

        let mut req = request(2);
        req.participants = Some(vec![
            Participant::new("o", None),
            Participant::new("a", None),
            Participant::new("b", None),
        ]);
        req.post_owner = Some("@o".to_string());

        let outcome = picker
            .run_draw(&directory, req.validate().unwrap())
            .await
            .unwrap();
        assert_eq!(handles(&outcome.winner), set(&["a", "b"]));
        let stored = picker
            .ledger()
            .draw_with_winners(outcome.draw_id.unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(stored.draw.post_url, POST_URL);
        assert_eq!(stored.winners.len(), 2);
        assert!(directory.calls().is_empty());
    }

    #[tokio::test]
    async fn test_bad_post_url_is_resolution_error() {
        let picker = picker(None);
        let directory = example_directory();

        let mut req = request(1);
        req.post_url = "https://bsky.app/profile/o".to_string();
        let err = picker
            .run_draw(&directory, req.validate().unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Post URL is invalid or inaccessible.");
        assert!(directory.calls().is_empty());
    }

    #[test]
    fn test_response_shapes() {
        let failure = serde_json::to_value(PickResponse::failure("No valid participants.")).unwrap();
        assert_eq!(
            failure,
            serde_json::json!({"success": false, "error": "No valid participants."})
        );

        let success = serde_json::to_value(PickResponse::success(DrawOutcome {
            winner: vec![Participant::new("a", None)],
            participant_count: 1,
            participants: vec![Participant::new("a", None)],
            post_owner: "o".to_string(),
            draw_time: "2024-05-01T12:00:00.000Z".to_string(),
            draw_id: None,
        }))
        .unwrap();
        assert_eq!(success["success"], true);
        assert_eq!(success["winner"][0]["handle"], "a");
        assert_eq!(success["winner"][0]["avatar"], "");
        assert_eq!(success["participant_count"], 1);
        assert!(success.get("error").is_none());
        assert!(success.get("draw_id").is_none());
    }
}
