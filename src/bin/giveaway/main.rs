//! Giveaway Picker CLI
//!
//! Command-line front end for a running picker server.

mod client;
mod commands;
mod style;

use clap::{Parser, Subcommand};
use client::DrawRequest;
use style::*;

#[derive(Parser)]
#[command(name = "giveaway")]
#[command(version)]
#[command(about = "Giveaway Picker - Draw random winners from Bluesky posts", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Picker server URL
    #[arg(
        short,
        long,
        env = "PICKER_URL",
        default_value = "http://localhost:5000",
        global = true
    )]
    server: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Draw winners for a post
    #[command(visible_alias = "d")]
    Draw {
        /// Post share link, e.g. https://bsky.app/profile/<handle>/post/<id>
        post_url: String,

        /// Number of winners
        #[arg(short = 'n', long, default_value = "1")]
        winners: u32,

        /// Count reposts as entries
        #[arg(long)]
        reposts: bool,

        /// Count likes as entries
        #[arg(long)]
        likes: bool,

        /// Count direct replies as entries
        #[arg(long)]
        comments: bool,

        /// Only followers of this account may win
        #[arg(long, value_name = "HANDLE")]
        followers_of: Option<String>,

        /// Exclude a previous winner (re-roll; not recorded)
        #[arg(short = 'x', long = "exclude", value_name = "HANDLE")]
        exclude: Vec<String>,
    },

    /// List recorded draws
    #[command(visible_alias = "h")]
    History {
        /// Number of draws to show
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt().with_env_filter("info").init();
    }

    let result = match cli.command {
        Commands::Draw {
            post_url,
            winners,
            reposts,
            likes,
            comments,
            followers_of,
            exclude,
        } => {
            let request = DrawRequest {
                post_url,
                num_winners: winners,
                filter_repost: reposts,
                filter_comments: comments,
                filter_likes: likes,
                filter_followers: followers_of.is_some(),
                follower_check_handle: followers_of.unwrap_or_default(),
                exclude_winners: exclude,
            };
            commands::draw::run(&cli.server, request).await
        }
        Commands::History { limit } => commands::history::run(&cli.server, limit).await,
    };

    if let Err(e) = result {
        failure(&format!("{}", e));
        std::process::exit(1);
    }
}
