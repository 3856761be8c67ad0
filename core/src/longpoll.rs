/*
 * longpoll.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Telegrafo, a Telegram bot API client library.
 *
 * Telegrafo is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Telegrafo is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Telegrafo.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Pull delivery: repeated long-poll rounds against the getUpdates method.
//!
//! At most one outstanding request; each batch is delivered to the handler
//! in order before the offset cursor advances or the next request goes
//! out. Failed rounds back off exponentially up to a ceiling and the loop
//! keeps going; only cancellation through the handle ends it. The offset
//! cursor is nullable: `None` omits the offset argument entirely (nothing
//! confirmed yet), `Some(n)` always sends n. Zero is never overloaded to
//! mean "absent".

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::api::{Api, Update, UpdateDecoder};
use crate::protocol::http::RequestArg;

/// Extra wall-clock allowance on top of the server-side hold time, so the
/// socket deadline does not fire on a healthy hold.
const POLL_DEADLINE_MARGIN: Duration = Duration::from_secs(10);

/// Long-poll tuning. `allowed_updates`, when set, is a pre-encoded JSON
/// array produced by the external codec and passed through opaquely.
#[derive(Debug, Clone)]
pub struct LongPollOptions {
    /// Max events per batch; the server clamps to 1..=100 and so do we.
    pub limit: u32,
    /// Server-side hold time in seconds.
    pub timeout_secs: u32,
    pub backoff_floor: Duration,
    pub backoff_ceiling: Duration,
    pub allowed_updates: Option<String>,
}

impl Default for LongPollOptions {
    fn default() -> Self {
        Self {
            limit: 100,
            timeout_secs: 30,
            backoff_floor: Duration::from_secs(1),
            backoff_ceiling: Duration::from_secs(30),
            allowed_updates: None,
        }
    }
}

/// Stop switch for a running poll loop. Takes effect between rounds; a
/// request already in flight completes or times out first.
#[derive(Clone)]
pub struct PollHandle {
    running: Arc<AtomicBool>,
}

impl PollHandle {
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Long-poll driver. One loop per bot; owns the offset cursor and failure
/// counter, both mutated only by its own rounds.
pub struct LongPoll<D: UpdateDecoder> {
    api: Api,
    decoder: D,
    options: LongPollOptions,
    next_offset: Option<i64>,
    failures: u32,
    running: Arc<AtomicBool>,
}

/// Offset after delivering a batch: one past the highest id seen, never
/// decreasing, unchanged for an empty batch.
fn advance_offset(current: Option<i64>, batch: &[Update]) -> Option<i64> {
    let highest = batch.iter().map(|u| u.id).max();
    match (current, highest) {
        (cur, None) => cur,
        (None, Some(h)) => Some(h + 1),
        (Some(c), Some(h)) => Some(c.max(h + 1)),
    }
}

/// Backoff delay for the n-th consecutive failure (n >= 1): floor doubled
/// per failure, capped at the ceiling.
fn backoff_delay(failures: u32, floor: Duration, ceiling: Duration) -> Duration {
    let doublings = failures.saturating_sub(1).min(16);
    let delay = floor.saturating_mul(1u32 << doublings);
    delay.min(ceiling)
}

impl<D: UpdateDecoder> LongPoll<D> {
    pub fn new(api: Api, decoder: D, options: LongPollOptions) -> Self {
        Self {
            api,
            decoder,
            options,
            next_offset: None,
            failures: 0,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Handle to stop the loop from another task.
    pub fn handle(&self) -> PollHandle {
        PollHandle {
            running: self.running.clone(),
        }
    }

    /// Arguments for one getUpdates round.
    fn build_args(&self) -> Vec<RequestArg> {
        let mut args = Vec::new();
        if let Some(offset) = self.next_offset {
            args.push(RequestArg::text("offset", offset.to_string()));
        }
        let limit = self.options.limit.clamp(1, 100);
        args.push(RequestArg::text("limit", limit.to_string()));
        args.push(RequestArg::text("timeout", self.options.timeout_secs.to_string()));
        if let Some(ref allowed) = self.options.allowed_updates {
            args.push(RequestArg::text("allowed_updates", allowed.clone()));
        }
        args
    }

    /// Run rounds until the handle is stopped. Events are handed to
    /// `on_update` one at a time, in batch order; the next request is not
    /// issued until the whole batch has been delivered.
    pub async fn run<F>(&mut self, mut on_update: F)
    where
        F: FnMut(Update),
    {
        let deadline = Duration::from_secs(u64::from(self.options.timeout_secs))
            + POLL_DEADLINE_MARGIN;
        while self.running.load(Ordering::SeqCst) {
            let args = self.build_args();
            let round = match self.api.send_request("getUpdates", &args, Some(deadline)).await {
                Ok(body) => self.decoder.decode_updates(&body),
                Err(e) => Err(e),
            };
            match round {
                Ok(batch) => {
                    self.failures = 0;
                    for update in &batch {
                        on_update(update.clone());
                    }
                    self.next_offset = advance_offset(self.next_offset, &batch);
                }
                Err(e) => {
                    self.failures += 1;
                    let delay = backoff_delay(
                        self.failures,
                        self.options.backoff_floor,
                        self.options.backoff_ceiling,
                    );
                    eprintln!(
                        "[longpoll] round failed ({}), retrying in {:?}",
                        e, delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Offset the next round would send, for inspection in tests and
    /// diagnostics.
    pub fn next_offset(&self) -> Option<i64> {
        self.next_offset
    }
}
