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

//! Channel to Stream Pump
//!
//! This crate provides [`StreamPump`], the primitive the rest of the gateway
//! composes on: it bridges an `(mpsc::Receiver<Bytes>, mpsc::Sender<Bytes>)`
//! channel pair to an `(AsyncRead, AsyncWrite)` stream pair, driving both
//! directions concurrently.
//!
//! Send on the input channel to write to the writer; receive from the output
//! channel to observe what the reader produced. Chunks are opaque: they carry
//! no alignment guarantees with lines, reads, or writes, and consumers must
//! tolerate arbitrary fragmentation and coalescing.
//!
//! Cancellation is context-driven: every channel operation and every I/O
//! operation races a [`CancellationToken`](tokio_util::sync::CancellationToken),
//! and the pump releases its stream halves when it returns.

mod pump;

pub use pump::{DEFAULT_READ_BUF_SIZE, StreamPump};
