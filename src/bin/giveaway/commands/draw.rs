//! Draw command - pick winners for a post

use std::time::Duration;

use anyhow::{bail, Result};
use indicatif::{ProgressBar, ProgressStyle};

use crate::client::{DrawRequest, PickerClient};
use crate::style::*;

pub async fn run(server: &str, request: DrawRequest) -> Result<()> {
    let reroll = !request.exclude_winners.is_empty();
    heading(if reroll { "Giveaway Re-roll" } else { "Giveaway Draw" });
    println!("Post:     {}", Tone::Link.paint(&request.post_url));
    if request.filter_followers {
        println!(
            "Must follow: {}",
            at_handle(&request.follower_check_handle)
        );
    }
    println!();

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Collecting participants...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let client = PickerClient::new(server);
    let result = client.pick_winner(&request).await;
    spinner.finish_and_clear();

    let response = result?;
    if !response.success {
        bail!(response
            .error
            .unwrap_or_else(|| "Draw failed for an unknown reason".to_string()));
    }

    success(&format!(
        "{} winner(s) from {} eligible participants",
        response.winner.len(),
        response.participant_count
    ));
    println!();

    for (i, winner) in response.winner.iter().enumerate() {
        println!(
            "  {:>3}  {}",
            Tone::Rank.paint(&format!("#{}", i + 1)),
            Tone::Strong.paint(&at_handle(&winner.handle))
        );
    }

    println!();
    if let Some(owner) = &response.post_owner {
        println!("Post owner:   {}", Tone::Muted.paint(&at_handle(owner)));
    }
    println!("Collected:    {} accounts", response.participants.len());
    if let Some(time) = &response.draw_time {
        println!("Drawn at:     {}", short_time(time));
    }
    match response.draw_id {
        Some(id) => note(&format!("Recorded as draw #{}", id)),
        None => note("Re-roll results are not recorded in history"),
    }

    Ok(())
}
