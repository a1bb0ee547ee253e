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

//! Saved-tracks endpoints of the Spotify Web API as a [`CollectionClient`].

use crate::client::{ClientError, CollectionClient};
use crate::config::StreamConfig;
use crate::stream::PagedAuthStream;
use async_trait::async_trait;
use log::{debug, warn};
use rspotify::{
    http::HttpError,
    model::SavedTrack,
    prelude::*,
    AuthCodeSpotify, Token,
};
use std::sync::Arc;

const UNAUTHORIZED: u16 = 401;

pub struct SpotifyLibrary {
    spotify: AuthCodeSpotify,
}

impl SpotifyLibrary {
    pub fn new(spotify: AuthCodeSpotify) -> Self {
        Self { spotify }
    }

    /// Every track in the user's Liked Songs, most recently added first.
    pub fn saved_tracks(self, config: StreamConfig) -> PagedAuthStream<Self> {
        PagedAuthStream::new(Arc::new(self), config)
    }
}

/// Spotify answers 401 ("The access token expired") once the access token is stale.
///
/// Every 401 is treated as an expired token, including "Invalid access token";
/// a refresh that cannot fix it fails on the retried request instead. The body
/// is not read, so the message carries only the status line.
fn classify(err: rspotify::ClientError) -> ClientError {
    if let rspotify::ClientError::Http(http) = &err {
        if let HttpError::StatusCode(response) = http.as_ref() {
            if response.status().as_u16() == UNAUTHORIZED {
                return ClientError::AuthExpired(err.to_string());
            }
        }
    }
    ClientError::Other(Box::new(err))
}

#[async_trait]
impl CollectionClient for SpotifyLibrary {
    type Item = SavedTrack;
    type Credential = Token;

    async fn fetch_page(&self, offset: u32, limit: u32) -> Result<Vec<SavedTrack>, ClientError> {
        let page = self
            .spotify
            .current_user_saved_tracks_manual(None, Some(limit), Some(offset))
            .await
            .map_err(classify)?;
        Ok(page.items)
    }

    async fn refresh_credential(&self) -> Result<Token, ClientError> {
        debug!("refreshing access token");
        self.spotify
            .refetch_token()
            .await
            .map_err(|e| ClientError::Credential(e.to_string()))?
            .ok_or_else(|| ClientError::Credential("No refresh token available".to_string()))
    }

    async fn set_credential(&self, token: Token) -> Result<(), ClientError> {
        {
            let store = self.spotify.get_token();
            let mut current = store
                .lock()
                .await
                .map_err(|_| ClientError::Credential("Token store is unavailable".to_string()))?;
            *current = Some(token);
        }

        if let Err(e) = self.spotify.write_token_cache().await {
            warn!("Failed to update token cache: {}", e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_http_failure_is_not_auth_expiry() {
        let parse = serde_json::from_str::<u32>("not json").unwrap_err();
        let err = classify(rspotify::ClientError::from(parse));
        assert!(!err.is_auth_expired());
        assert!(matches!(err, ClientError::Other(_)));
    }

    fn status_error(status: u16, body: &'static str) -> rspotify::ClientError {
        let response = http::Response::builder().status(status).body(body).unwrap();
        let response = reqwest::Response::from(response);
        rspotify::ClientError::Http(Box::new(HttpError::StatusCode(response)))
    }

    #[test]
    fn test_unauthorized_is_auth_expiry() {
        let body = r#"{"error":{"status":401,"message":"The access token expired"}}"#;
        let err = classify(status_error(401, body));
        assert!(err.is_auth_expired());
        assert!(err.to_string().contains("401"));
    }

    #[test]
    fn test_server_error_is_not_auth_expiry() {
        let err = classify(status_error(500, "Internal Server Error"));
        assert!(!err.is_auth_expired());
        assert!(matches!(err, ClientError::Other(_)));
    }
}
