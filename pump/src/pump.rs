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

//! Bidirectional channel/stream pump

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Default read buffer size, tuned for interactive TTY traffic. Larger sizes
/// amortize syscalls but add latency for small interactive writes.
pub const DEFAULT_READ_BUF_SIZE: usize = 32;

/// Bridges a `(Receiver, Sender)` channel pair to a `(reader, writer)` stream
/// pair, both directions running concurrently.
///
/// The input direction drains the receiver and writes each chunk verbatim to
/// the writer. The output direction reads up to the configured buffer size
/// from the reader and publishes the trimmed chunk on the sender.
///
/// Failures are unilateral: one direction ending does not force the other to
/// end. The orchestrator decides the pump's overall fate through the
/// cancellation token passed to [`run`](StreamPump::run).
pub struct StreamPump<R, W> {
    input: mpsc::Receiver<Bytes>,
    output: mpsc::Sender<Bytes>,
    reader: R,
    writer: W,
    read_buf_size: usize,
}

impl<R, W> StreamPump<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Create a pump over the given channel pair and stream pair.
    pub fn new(
        input: mpsc::Receiver<Bytes>,
        output: mpsc::Sender<Bytes>,
        reader: R,
        writer: W,
    ) -> Self {
        Self {
            input,
            output,
            reader,
            writer,
            read_buf_size: DEFAULT_READ_BUF_SIZE,
        }
    }

    /// Set the read buffer size. Zero is ignored and leaves the default.
    pub fn with_read_buf_size(mut self, size: usize) -> Self {
        if size > 0 {
            self.read_buf_size = size;
        }
        self
    }

    /// Drive both directions until cancellation or until each direction ends
    /// on its own.
    ///
    /// The reader and writer are dropped when the pump returns; the input
    /// receiver is handed back so a caller that lent its channel can reclaim
    /// it afterwards.
    pub async fn run(self, cancel: CancellationToken) -> mpsc::Receiver<Bytes> {
        let Self {
            input,
            output,
            reader,
            writer,
            read_buf_size,
        } = self;

        let (input, _) = tokio::join!(
            pump_input(input, output.clone(), writer, cancel.clone()),
            pump_output(reader, output, read_buf_size, cancel),
        );

        input
    }
}

/// Input direction: channel chunks into the writer.
///
/// A chunk that fails to write is pushed back onto the output channel before
/// the direction terminates, so the orchestrator can surface or re-route it.
async fn pump_input<W>(
    mut input: mpsc::Receiver<Bytes>,
    output: mpsc::Sender<Bytes>,
    mut writer: W,
    cancel: CancellationToken,
) -> mpsc::Receiver<Bytes>
where
    W: AsyncWrite + Unpin,
{
    loop {
        let chunk = tokio::select! {
            _ = cancel.cancelled() => break,
            maybe = input.recv() => match maybe {
                Some(chunk) => chunk,
                None => break,
            },
        };

        let failed = tokio::select! {
            _ = cancel.cancelled() => break,
            written = writer.write_all(&chunk) => written.err(),
        };

        if let Some(err) = failed {
            if !is_disconnect(&err) {
                tracing::warn!(error = %err, "failed to write to stream");
            }
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = output.send(chunk) => {}
            }
            break;
        }
    }

    input
}

/// Output direction: reader bytes onto the channel.
async fn pump_output<R>(
    mut reader: R,
    output: mpsc::Sender<Bytes>,
    read_buf_size: usize,
    cancel: CancellationToken,
) where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; read_buf_size];

    loop {
        let n = tokio::select! {
            _ = cancel.cancelled() => return,
            read = reader.read(&mut buf) => match read {
                Ok(0) => return,
                Ok(n) => n,
                Err(err) => {
                    if !is_disconnect(&err) {
                        tracing::warn!(error = %err, "failed to read from stream");
                    }
                    return;
                }
            },
        };

        let chunk = Bytes::copy_from_slice(&buf[..n]);
        tokio::select! {
            // a pending send loses the chunk on cancellation
            _ = cancel.cancelled() => return,
            sent = output.send(chunk) => {
                if sent.is_err() {
                    return;
                }
            }
        }
    }
}

/// EOF-like conditions terminate a direction without noise.
fn is_disconnect(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
    )
}
