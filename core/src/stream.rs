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

use crate::client::{ClientError, CollectionClient};
use crate::config::StreamConfig;
use futures::future::BoxFuture;
use futures::ready;
use futures::stream::{FusedStream, Stream};
use futures::task::AtomicWaker;
use futures::FutureExt;
use log::{debug, warn};
use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Failed to fetch page at offset {offset}: {source}")]
    Fetch { offset: u32, source: ClientError },
    #[error("Failed to refresh credential at offset {offset}: {source}")]
    RefreshFailed { offset: u32, source: ClientError },
    #[error("Credential rejected again after refresh at offset {offset}: {source}")]
    AuthRejected { offset: u32, source: ClientError },
    #[error("Fetch at offset {offset} timed out after {after:?}")]
    Timeout { offset: u32, after: Duration },
}

impl StreamError {
    /// Offset of the page whose fetch cycle failed.
    pub fn offset(&self) -> u32 {
        match self {
            StreamError::Fetch { offset, .. }
            | StreamError::RefreshFailed { offset, .. }
            | StreamError::AuthRejected { offset, .. }
            | StreamError::Timeout { offset, .. } => *offset,
        }
    }
}

/// Observable lifecycle of a [`PagedAuthStream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No fetch outstanding; the next demand past the buffered items fetches.
    Idle,
    Fetching,
    /// The last page was short. Buffered items may still be pending delivery.
    Exhausted,
    Failed,
    Cancelled,
}

enum State<T> {
    Idle,
    Fetching(BoxFuture<'static, Result<Vec<T>, StreamError>>),
    Exhausted,
    Failed,
    Cancelled,
}

#[derive(Debug, Default)]
struct CancelSignal {
    cancelled: AtomicBool,
    waker: AtomicWaker,
}

/// Tears a [`PagedAuthStream`] down from another task.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<CancelSignal>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.cancelled.store(true, Ordering::Release);
        self.0.waker.wake();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.cancelled.load(Ordering::Acquire)
    }

    fn register(&self, cx: &Context<'_>) {
        self.0.waker.register(cx.waker());
    }
}

/// A lazy, finite stream over every item of a [`CollectionClient`].
///
/// Pages are fetched strictly one at a time, in increasing offset order, and
/// only when the consumer polls past the items already received. A page
/// shorter than the configured page size ends the stream.
///
/// An expired credential is refreshed once per fetch attempt and the same
/// offset is retried; the consumer never sees that failure. Any other failure
/// is yielded once as `Err` and the stream then ends.
pub struct PagedAuthStream<C: CollectionClient> {
    client: Arc<C>,
    config: StreamConfig,
    offset: u32,
    state: State<C::Item>,
    pending: VecDeque<C::Item>,
    cancel: CancelHandle,
    terminated: bool,
}

// Buffered items are never pinned.
impl<C: CollectionClient> Unpin for PagedAuthStream<C> {}

impl<C: CollectionClient + 'static> PagedAuthStream<C> {
    pub fn new(client: Arc<C>, config: StreamConfig) -> Self {
        Self {
            client,
            config,
            offset: 0,
            state: State::Idle,
            pending: VecDeque::new(),
            cancel: CancelHandle::default(),
            terminated: false,
        }
    }

    /// Offset of the next page to fetch.
    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn page_size(&self) -> u32 {
        self.config.page_size()
    }

    pub fn phase(&self) -> Phase {
        match self.state {
            State::Idle => Phase::Idle,
            State::Fetching(_) => Phase::Fetching,
            State::Exhausted => Phase::Exhausted,
            State::Failed => Phase::Failed,
            State::Cancelled => Phase::Cancelled,
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Drops any outstanding fetch and undelivered items. The stream then ends.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        self.shut_down();
    }

    fn shut_down(&mut self) {
        if self.terminated || matches!(self.state, State::Failed | State::Cancelled) {
            return;
        }
        debug!(
            "cancelled at offset {} with {} undelivered items",
            self.offset,
            self.pending.len()
        );
        self.state = State::Cancelled;
        self.pending.clear();
    }

    fn start_fetch(&self) -> BoxFuture<'static, Result<Vec<C::Item>, StreamError>> {
        let offset = self.offset;
        let cycle = fetch_cycle(Arc::clone(&self.client), offset, self.config.page_size());

        match self.config.fetch_timeout() {
            Some(after) => async move {
                match tokio::time::timeout(after, cycle).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(StreamError::Timeout { offset, after }),
                }
            }
            .boxed(),
            None => cycle.boxed(),
        }
    }

    fn complete_page(&mut self, items: Vec<C::Item>) {
        let page_size = self.config.page_size();
        let received = items.len();
        debug!("received {} items at offset {}", received, self.offset);

        if received < page_size as usize {
            self.state = State::Exhausted;
        } else {
            if received > page_size as usize {
                warn!(
                    "page at offset {} returned {} items, more than the {} requested",
                    self.offset, received, page_size
                );
            }
            self.offset += page_size;
            self.state = State::Idle;
        }

        self.pending.extend(items);
    }

    fn fail(&mut self, err: &StreamError) {
        debug!("error fetching items: {}", err);
        self.state = State::Failed;
        self.pending.clear();
        self.terminated = true;
    }
}

/// One fetch attempt at `offset`, with a single refresh-and-retry on expiry.
async fn fetch_cycle<C: CollectionClient>(
    client: Arc<C>,
    offset: u32,
    limit: u32,
) -> Result<Vec<C::Item>, StreamError> {
    match client.fetch_page(offset, limit).await {
        Ok(items) => Ok(items),
        Err(err) if err.is_auth_expired() => {
            debug!("refreshing credential after: {}", err);
            let credential = client
                .refresh_credential()
                .await
                .map_err(|source| StreamError::RefreshFailed { offset, source })?;
            client
                .set_credential(credential)
                .await
                .map_err(|source| StreamError::RefreshFailed { offset, source })?;

            client.fetch_page(offset, limit).await.map_err(|source| {
                if source.is_auth_expired() {
                    StreamError::AuthRejected { offset, source }
                } else {
                    StreamError::Fetch { offset, source }
                }
            })
        }
        Err(source) => Err(StreamError::Fetch { offset, source }),
    }
}

impl<C: CollectionClient + 'static> Stream for PagedAuthStream<C> {
    type Item = Result<C::Item, StreamError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.cancel.is_cancelled() {
            this.shut_down();
        }

        if let Some(item) = this.pending.pop_front() {
            return Poll::Ready(Some(Ok(item)));
        }

        loop {
            match &mut this.state {
                State::Idle => {
                    debug!("fetching from offset {}", this.offset);
                    this.state = State::Fetching(this.start_fetch());
                }
                State::Fetching(cycle) => {
                    this.cancel.register(cx);
                    match ready!(cycle.as_mut().poll(cx)) {
                        Ok(items) => {
                            this.complete_page(items);
                            if let Some(item) = this.pending.pop_front() {
                                return Poll::Ready(Some(Ok(item)));
                            }
                        }
                        Err(err) => {
                            this.fail(&err);
                            return Poll::Ready(Some(Err(err)));
                        }
                    }
                }
                State::Exhausted | State::Failed | State::Cancelled => {
                    this.terminated = true;
                    return Poll::Ready(None);
                }
            }
        }
    }
}

impl<C: CollectionClient + 'static> FusedStream for PagedAuthStream<C> {
    fn is_terminated(&self) -> bool {
        self.terminated
    }
}

impl<C: CollectionClient> fmt::Debug for PagedAuthStream<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self.state {
            State::Idle => "Idle",
            State::Fetching(_) => "Fetching",
            State::Exhausted => "Exhausted",
            State::Failed => "Failed",
            State::Cancelled => "Cancelled",
        };
        f.debug_struct("PagedAuthStream")
            .field("offset", &self.offset)
            .field("page_size", &self.config.page_size())
            .field("phase", &phase)
            .field("pending", &self.pending.len())
            .finish()
    }
}
