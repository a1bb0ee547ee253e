/*
    saved-tracks-rs | Lazy, self-refreshing stream over Spotify Liked Songs.
    Copyright (C) 2025  Israel Alberto Roldan Vega

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use clap::{Args, Parser, Subcommand};
use dotenvy::dotenv;
use futures::StreamExt;
use log::info;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::process;
use std::time::Duration;
use tracks_core::{connect, ExportSummary, SavedTrackRecord, SpotifyLibrary, StreamConfig};

#[derive(Parser)]
#[command(name = "saved-tracks")]
#[command(about = "Streams every track in your Spotify Liked Songs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prints every saved track, or writes them as JSON Lines.
    Export {
        /// Write one JSON object per track to this file (e.g., --json=liked.jsonl)
        #[arg(long)]
        json: Option<String>,

        /// Stop after this many tracks
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        max: Option<u32>,

        #[command(flatten)]
        stream: StreamArgs,
    },
    /// Counts the tracks in your Liked Songs by walking the whole library.
    Count {
        #[command(flatten)]
        stream: StreamArgs,
    },
}

#[derive(Args)]
struct StreamArgs {
    /// Tracks requested per page (1-50)
    #[arg(long, default_value_t = tracks_core::config::DEFAULT_PAGE_SIZE)]
    page_size: u32,

    /// Give up on a page that takes longer than this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

impl StreamArgs {
    fn to_config(&self) -> StreamConfig {
        let config = match StreamConfig::new(self.page_size) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(2);
            }
        };

        match self.timeout_secs {
            Some(secs) => config.with_fetch_timeout(Duration::from_secs(secs)),
            None => config,
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    if dotenv().is_err() {
        // Silently ignore
    }

    let cli = Cli::parse();

    match &cli.command {
        Commands::Export { json, max, stream } => {
            handle_export(json.as_deref(), *max, stream.to_config()).await;
        }
        Commands::Count { stream } => {
            handle_count(stream.to_config()).await;
        }
    }
}

async fn get_library() -> SpotifyLibrary {
    match connect().await {
        Ok(spotify) => SpotifyLibrary::new(spotify),
        Err(e) => {
            eprintln!("Error initializing Spotify client: {}", e);
            process::exit(1);
        }
    }
}

async fn handle_export(json_path: Option<&str>, max: Option<u32>, config: StreamConfig) {
    let library = get_library().await;

    let mut writer = match json_path {
        Some(path) => match File::create(path) {
            Ok(file) => Some(BufWriter::new(file)),
            Err(e) => {
                eprintln!("[ERROR] Failed to create file '{}': {}", path, e);
                process::exit(1);
            }
        },
        None => None,
    };

    println!("Streaming Liked Songs...");

    let mut tracks = library.saved_tracks(config);
    let mut summary = ExportSummary::new();

    while let Some(item) = tracks.next().await {
        let saved = match item {
            Ok(saved) => saved,
            Err(e) => {
                eprintln!();
                eprintln!("Export failed after {} tracks: {}", summary.total_tracks, e);
                process::exit(1);
            }
        };

        let record = SavedTrackRecord::from(&saved);
        summary.record(&record);

        match writer.as_mut() {
            Some(w) => {
                let line = serde_json::to_string(&record).unwrap_or_default();
                if let Err(e) = writeln!(w, "{}", line) {
                    eprintln!("[ERROR] Failed to write report to file: {}", e);
                    process::exit(1);
                }
            }
            None => println!("{}. {}", summary.total_tracks, record),
        }

        if max.is_some_and(|limit| summary.total_tracks >= limit) {
            info!("Reached limit of {} tracks, stopping", summary.total_tracks);
            summary.stopped_early = true;
            tracks.cancel();
        }
    }

    if let Some(mut w) = writer {
        if let Err(e) = w.flush() {
            eprintln!("[ERROR] Failed to write report to file: {}", e);
            process::exit(1);
        }
    }

    println!();
    println!("---------------------------------------------------");
    println!("EXPORT COMPLETE");
    println!("---------------------------------------------------");
    println!("Tracks Exported: {}", summary.total_tracks);
    println!("Local Files:     {}", summary.local_tracks);
    if summary.stopped_early {
        println!("(Stopped at the --max limit.)");
    }
    println!("---------------------------------------------------");

    if let Some(path) = json_path {
        println!();
        println!("[SAVED] Tracks saved to: {}", path);
    }
}

async fn handle_count(config: StreamConfig) {
    let library = get_library().await;
    println!("Counting Liked Songs...");

    let mut tracks = library.saved_tracks(config);
    let mut total: u64 = 0;

    while let Some(item) = tracks.next().await {
        if let Err(e) = item {
            eprintln!();
            eprintln!("Count failed after {} tracks: {}", total, e);
            process::exit(1);
        }
        total += 1;
    }

    println!();
    println!("Liked Songs: {}", total);
}
