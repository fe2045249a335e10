//! Giveaway Picker API client

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Body of `POST /pick_winner`
#[derive(Debug, Default, Serialize)]
pub struct DrawRequest {
    pub post_url: String,
    pub num_winners: u32,
    pub filter_repost: bool,
    pub filter_comments: bool,
    pub filter_likes: bool,
    pub filter_followers: bool,
    pub follower_check_handle: String,
    pub exclude_winners: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Entrant {
    pub handle: String,
}

/// Response of `POST /pick_winner`
#[derive(Debug, Deserialize)]
pub struct DrawResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub winner: Vec<Entrant>,
    #[serde(default)]
    pub participant_count: usize,
    #[serde(default)]
    pub participants: Vec<Entrant>,
    #[serde(default)]
    pub post_owner: Option<String>,
    #[serde(default)]
    pub draw_time: Option<String>,
    #[serde(default)]
    pub draw_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct PastWinner {
    pub handle: String,
}

#[derive(Debug, Deserialize)]
pub struct PastDraw {
    pub id: i64,
    pub post_url: String,
    pub draw_time: String,
    pub winner_count: u32,
    #[serde(default)]
    pub winners: Vec<PastWinner>,
}

/// Response of `GET /history`
#[derive(Debug, Deserialize)]
pub struct HistoryResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub draws: Vec<PastDraw>,
    #[serde(default)]
    pub total_draws: u32,
}

pub struct PickerClient {
    client: Client,
    base_url: String,
}

impl PickerClient {
    pub fn new(server_url: &str) -> Self {
        // Paging large giveaways can take a while
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: server_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn pick_winner(&self, request: &DrawRequest) -> Result<DrawResponse> {
        let resp = self
            .client
            .post(self.url("pick_winner"))
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            Ok(resp.json().await?)
        } else {
            let error_text = resp.text().await.unwrap_or_else(|_| "Unknown error".into());
            Err(anyhow!("Draw request failed ({}): {}", status, error_text))
        }
    }

    pub async fn history(&self, limit: u32) -> Result<HistoryResponse> {
        let resp = self
            .client
            .get(self.url(&format!("history?limit={}", limit)))
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            Ok(resp.json().await?)
        } else {
            let error_text = resp.text().await.unwrap_or_else(|_| "Unknown error".into());
            Err(anyhow!(
                "Failed to fetch history ({}): {}",
                status,
                error_text
            ))
        }
    }
}
