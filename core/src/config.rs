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

use std::time::Duration;
use thiserror::Error;

/// How many tracks to request per page. The saved-tracks endpoint caps `limit` at 50.
pub const MAX_PAGE_SIZE: u32 = 50;
pub const DEFAULT_PAGE_SIZE: u32 = MAX_PAGE_SIZE;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid page size {0}: must be between 1 and {max}", max = MAX_PAGE_SIZE)]
    InvalidPageSize(u32),
}

/// Tuning for a [`PagedAuthStream`](crate::stream::PagedAuthStream).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    page_size: u32,
    fetch_timeout: Option<Duration>,
}

impl StreamConfig {
    pub fn new(page_size: u32) -> Result<Self, ConfigError> {
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::InvalidPageSize(page_size));
        }

        Ok(Self {
            page_size,
            fetch_timeout: None,
        })
    }

    /// Bounds a whole fetch cycle, including a credential refresh and its retry.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            fetch_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_uses_largest_page() {
        let config = StreamConfig::default();
        assert_eq!(config.page_size(), 50);
        assert_eq!(config.fetch_timeout(), None);
    }

    #[test]
    fn test_rejects_out_of_range_page_size() {
        assert_eq!(StreamConfig::new(0), Err(ConfigError::InvalidPageSize(0)));
        assert_eq!(StreamConfig::new(51), Err(ConfigError::InvalidPageSize(51)));
        assert_eq!(StreamConfig::new(1).map(|c| c.page_size()), Ok(1));
    }

    #[test]
    fn test_fetch_timeout_builder() {
        let config = StreamConfig::new(20)
            .unwrap()
            .with_fetch_timeout(Duration::from_secs(5));
        assert_eq!(config.page_size(), 20);
        assert_eq!(config.fetch_timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_error_message_names_bounds() {
        let err = StreamConfig::new(99).unwrap_err();
        assert_eq!(err.to_string(), "Invalid page size 99: must be between 1 and 50");
    }
}
