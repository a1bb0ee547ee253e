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

use async_trait::async_trait;
use std::error::Error as StdError;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

#[derive(Error, Debug)]
pub enum ClientError {
    /// The current credential is no longer accepted by the remote service.
    #[error("Access token expired: {0}")]
    AuthExpired(String),
    #[error("Credential refresh failed: {0}")]
    Credential(String),
    #[error(transparent)]
    Other(Box<dyn StdError + Send + Sync>),
}

impl ClientError {
    /// Only this kind of failure is recovered from, by refreshing once.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, ClientError::AuthExpired(_))
    }
}

/// A remote, paginated collection guarded by a renewable credential.
///
/// Implementations own their transport, retries and backoff. The stream only
/// ever calls one of these methods at a time.
#[cfg_attr(test, automock(type Item = u32; type Credential = String;))]
#[async_trait]
pub trait CollectionClient: Send + Sync {
    type Item: Send + 'static;
    type Credential: Send + 'static;

    /// Fetches up to `limit` items starting at `offset`, in collection order.
    async fn fetch_page(&self, offset: u32, limit: u32) -> Result<Vec<Self::Item>, ClientError>;

    /// Obtains a fresh credential, usually from a refresh token.
    async fn refresh_credential(&self) -> Result<Self::Credential, ClientError>;

    /// Installs `credential` for every subsequent request made by this client.
    async fn set_credential(&self, credential: Self::Credential) -> Result<(), ClientError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_auth_expired_is_recoverable() {
        assert!(ClientError::AuthExpired("The access token expired".to_string()).is_auth_expired());
        assert!(!ClientError::Credential("refresh token revoked".to_string()).is_auth_expired());

        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(!ClientError::Other(Box::new(io)).is_auth_expired());
    }

    #[test]
    fn test_other_error_is_transparent() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "socket timed out");
        let err = ClientError::Other(Box::new(io));
        assert_eq!(err.to_string(), "socket timed out");
    }
}
