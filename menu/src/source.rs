//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Pushback-aware input source
//!
//! Wraps the shared input receiver with a small pushback buffer owned by the
//! consumer. Unconsumed bytes are pushed back here and consulted before the
//! channel, instead of being re-injected through detached tasks.

use bytes::Bytes;
use std::collections::VecDeque;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub(crate) struct InputSource {
    receiver: Option<mpsc::Receiver<Bytes>>,
    pushback: VecDeque<Bytes>,
}

impl InputSource {
    pub(crate) fn new(receiver: mpsc::Receiver<Bytes>) -> Self {
        Self {
            receiver: Some(receiver),
            pushback: VecDeque::new(),
        }
    }

    /// Next chunk: pushback first, then the channel, raced against
    /// cancellation. `None` means the source is gone or the context ended.
    pub(crate) async fn next(&mut self, cancel: &CancellationToken) -> Option<Bytes> {
        if let Some(chunk) = self.pushback.pop_front() {
            return Some(chunk);
        }
        let receiver = self.receiver.as_mut()?;
        tokio::select! {
            _ = cancel.cancelled() => None,
            maybe = receiver.recv() => maybe,
        }
    }

    /// Queue a chunk so the next read sees it before anything else.
    pub(crate) fn push_back(&mut self, chunk: Bytes) {
        if !chunk.is_empty() {
            self.pushback.push_back(chunk);
        }
    }

    /// Take any pushed-back chunks, oldest first.
    pub(crate) fn drain_pushback(&mut self) -> Vec<Bytes> {
        self.pushback.drain(..).collect()
    }

    /// Lend the underlying receiver out, e.g. to a dialog bridge.
    pub(crate) fn lend(&mut self) -> Option<mpsc::Receiver<Bytes>> {
        self.receiver.take()
    }

    /// Restore a previously lent receiver.
    pub(crate) fn restore(&mut self, receiver: mpsc::Receiver<Bytes>) {
        self.receiver = Some(receiver);
    }
}
