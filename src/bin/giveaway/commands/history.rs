//! History command - list recorded draws

use anyhow::{bail, Result};

use crate::client::PickerClient;
use crate::style::*;

pub async fn run(server: &str, limit: u32) -> Result<()> {
    heading("Draw History");

    let client = PickerClient::new(server);
    let history = client.history(limit).await?;

    if !history.success {
        bail!(history
            .error
            .unwrap_or_else(|| "Failed to load history".to_string()));
    }

    if history.draws.is_empty() {
        note("No draws recorded yet.");
        return Ok(());
    }

    println!();
    println!(
        "{:>5}  {:<16}  {:>7}  Post",
        "Draw", "Time", "Winners"
    );
    println!("{}", "─".repeat(75));

    for draw in &history.draws {
        println!(
            "{:>5}  {:<16}  {:>7}  {}",
            format!("#{}", draw.id),
            short_time(&draw.draw_time),
            draw.winner_count,
            Tone::Muted.paint(&draw.post_url)
        );
        let handles: Vec<String> = draw.winners.iter().map(|w| at_handle(&w.handle)).collect();
        if !handles.is_empty() {
            println!("{:>5}  {}", "", Tone::Link.paint(&handles.join(", ")));
        }
    }

    println!();
    println!(
        "Showing {} of {} draws",
        history.draws.len(),
        history.total_draws
    );

    Ok(())
}
