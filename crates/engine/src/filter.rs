// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Incremental live filter
//!
//! Keeps the positions of a growing sequence that match a predicate. Each
//! pass scans only the positions added since the previous pass. When the
//! sequence shrinks (a circular buffer wrapped, or it was reset) every
//! earlier position is invalid, so the cursor is reset and the next pass
//! rescans from zero.

use evl_core::EventSequence;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Progress of one filter over one sequence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCursor {
    /// Next position to examine
    pub last_scanned: u64,
    /// Matching positions in ascending order
    pub matched: Vec<u64>,
}

pub struct LiveFilter<E, S: ?Sized, P> {
    sequence: Arc<S>,
    predicate: P,
    cursor: FilterCursor,
    _marker: PhantomData<fn() -> E>,
}

impl<E, S, P> LiveFilter<E, S, P>
where
    S: EventSequence<E> + ?Sized,
    P: Fn(&E) -> bool,
{
    pub fn new(sequence: Arc<S>, predicate: P) -> Self {
        Self {
            sequence,
            predicate,
            cursor: FilterCursor::default(),
            _marker: PhantomData,
        }
    }

    pub fn cursor(&self) -> &FilterCursor {
        &self.cursor
    }

    /// Run one pass, returning how many new matches it found
    pub fn pass(&mut self) -> usize {
        let current = self.sequence.len();
        if current < self.cursor.last_scanned {
            tracing::debug!(
                from = self.cursor.last_scanned,
                to = current,
                "sequence shrank, filter reset"
            );
            self.cursor = FilterCursor::default();
        }

        let mut found = 0;
        while self.cursor.last_scanned < current {
            let position = self.cursor.last_scanned;
            let event = match self.sequence.try_get(position) {
                Ok(event) => event,
                Err(e) => {
                    // Not a gap: stay here and read it again next pass
                    tracing::debug!(position, error = %e, "position unreadable, pass stopped");
                    break;
                }
            };
            if let Some(event) = event {
                if (self.predicate)(&event) {
                    self.cursor.matched.push(position);
                    found += 1;
                }
            }
            self.cursor.last_scanned = position + 1;
        }
        found
    }
}

impl<E, S, P> LiveFilter<E, S, P>
where
    E: 'static,
    S: EventSequence<E> + ?Sized + 'static,
    P: Fn(&E) -> bool + Send + 'static,
{
    /// Run one pass on the blocking pool; store reads are file I/O
    async fn pass_blocking(self) -> Result<Self, tokio::task::JoinError> {
        tokio::task::spawn_blocking(move || {
            let mut filter = self;
            filter.pass();
            filter
        })
        .await
    }

    /// Pass every `poll_delay` until the sequence is disposed or `cancel`
    /// turns true, returning the last scanned position
    ///
    /// `matches` receives a snapshot of the cursor after every pass that
    /// changed it.
    pub async fn run(
        mut self,
        poll_delay: Duration,
        mut cancel: watch::Receiver<bool>,
        matches: watch::Sender<FilterCursor>,
    ) -> u64 {
        loop {
            let before = self.cursor.clone();
            self = match self.pass_blocking().await {
                Ok(filter) => filter,
                Err(e) => {
                    tracing::warn!(error = %e, "filter pass failed");
                    return before.last_scanned;
                }
            };
            if self.cursor != before {
                matches.send_replace(self.cursor.clone());
            }
            if self.sequence.is_disposed() {
                tracing::debug!(position = self.cursor.last_scanned, "sequence disposed, filter done");
                break;
            }
            if *cancel.borrow() {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(poll_delay) => {}
                changed = cancel.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        self.cursor.last_scanned
    }

    /// Run on a background task
    pub fn spawn(self, poll_delay: Duration) -> FilterHandle {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (matches_tx, matches_rx) = watch::channel(FilterCursor::default());
        let task = tokio::spawn(self.run(poll_delay, cancel_rx, matches_tx));
        FilterHandle {
            cancel: cancel_tx,
            matches: matches_rx,
            task,
        }
    }
}

/// Handle to a filter running in the background
pub struct FilterHandle {
    cancel: watch::Sender<bool>,
    matches: watch::Receiver<FilterCursor>,
    task: JoinHandle<u64>,
}

impl FilterHandle {
    /// Latest published cursor
    pub fn cursor(&self) -> FilterCursor {
        self.matches.borrow().clone()
    }

    pub fn matched(&self) -> Vec<u64> {
        self.matches.borrow().matched.clone()
    }

    /// Wait until the published cursor satisfies `done`
    pub async fn wait_for<F>(&mut self, done: F) -> FilterCursor
    where
        F: FnMut(&FilterCursor) -> bool,
    {
        let _ = self.matches.wait_for(done).await;
        self.matches.borrow().clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the filter and return its last scanned position
    pub async fn stop(self) -> u64 {
        let _ = self.cancel.send(true);
        match self.task.await {
            Ok(position) => position,
            Err(e) => {
                tracing::warn!(error = %e, "filter task failed");
                self.matches.borrow().last_scanned
            }
        }
    }
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
