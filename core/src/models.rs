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

use rspotify::{model::SavedTrack, prelude::*};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A flat, serializable view of one entry of the user's Liked Songs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedTrackRecord {
    pub id: String, // Empty for local files
    pub name: String,
    pub artists: String,
    pub album: String,
    pub added_at: String, // RFC 3339
    pub duration_ms: i64,
    pub is_local: bool,
    pub external_url: String,
}

impl From<&SavedTrack> for SavedTrackRecord {
    fn from(saved: &SavedTrack) -> Self {
        let track = &saved.track;

        Self {
            id: track
                .id
                .as_ref()
                .map(|id| id.id().to_string())
                .unwrap_or_default(),
            name: track.name.clone(),
            artists: track
                .artists
                .iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<&str>>()
                .join(", "),
            album: track.album.name.clone(),
            added_at: saved.added_at.to_rfc3339(),
            duration_ms: track.duration.num_milliseconds(),
            is_local: track.is_local,
            external_url: track
                .external_urls
                .get("spotify")
                .cloned()
                .unwrap_or_default(),
        }
    }
}

impl fmt::Display for SavedTrackRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = if self.is_local { "local" } else { self.id.as_str() };
        let minutes = self.duration_ms / 60_000;
        let seconds = (self.duration_ms % 60_000) / 1_000;

        write!(
            f,
            "[{}] {} - {} (Album: {}) {}:{:02} | added {}",
            id, self.name, self.artists, self.album, minutes, seconds, self.added_at
        )
    }
}

/// Totals for one pass over the Liked Songs.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ExportSummary {
    pub total_tracks: u32,
    pub local_tracks: u32,
    pub stopped_early: bool, // Cancelled at the --max limit
}

impl ExportSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, track: &SavedTrackRecord) {
        self.total_tracks += 1;
        if track.is_local {
            self.local_tracks += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, is_local: bool) -> SavedTrackRecord {
        SavedTrackRecord {
            id: if is_local { String::new() } else { "4uLU6hMCjMI75M1A2tKUQC".to_string() },
            name: name.to_string(),
            artists: "Rick Astley".to_string(),
            album: "Whenever You Need Somebody".to_string(),
            added_at: "2024-03-01T10:00:00+00:00".to_string(),
            duration_ms: 213_573,
            is_local,
            external_url: String::new(),
        }
    }

    #[test]
    fn test_saved_track_display() {
        let display = format!("{}", record("Never Gonna Give You Up", false));
        assert_eq!(
            display,
            "[4uLU6hMCjMI75M1A2tKUQC] Never Gonna Give You Up - Rick Astley \
             (Album: Whenever You Need Somebody) 3:33 | added 2024-03-01T10:00:00+00:00"
        );
    }

    #[test]
    fn test_local_track_display() {
        let display = format!("{}", record("Demo Take", true));
        assert!(display.starts_with("[local] Demo Take"));
    }

    #[test]
    fn test_export_summary_counts_local_tracks() {
        let mut summary = ExportSummary::new();
        summary.record(&record("A", false));
        summary.record(&record("B", true));
        summary.record(&record("C", false));

        assert_eq!(summary.total_tracks, 3);
        assert_eq!(summary.local_tracks, 1);
        assert!(!summary.stopped_early);
    }

    #[test]
    fn test_record_serializes_as_flat_json() {
        let json = serde_json::to_value(record("A", false)).unwrap();
        assert_eq!(json["name"], "A");
        assert_eq!(json["duration_ms"], 213_573);
        assert_eq!(json["is_local"], false);
    }
}
