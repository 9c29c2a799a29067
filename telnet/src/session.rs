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

//! Backend telnet session

use crate::{Result, TelnetCodec, TelnetError, TelnetFrame};
use bytes::{BufMut, Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;

/// Read chunk size for the backend connection.
const READ_CHUNK_SIZE: usize = 32;

/// ASCII DEL, what most SSH clients send for the backspace key.
const DEL: u8 = 0x7F;
/// ASCII BS, what legacy telnet servers expect for the backspace key.
const BS: u8 = 0x08;

/// A dialed backend telnet connection, presented to the rest of the gateway
/// as a byte-channel endpoint.
///
/// The session does not retry: any I/O error or cancellation collapses it,
/// the connection is closed and the channel ends are dropped so the owner of
/// the counterpart handles observes termination.
pub struct TelnetSession {
    stream: TcpStream,
    addr: String,
}

impl TelnetSession {
    /// Dial the backend over plain TCP.
    pub async fn dial(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        tracing::debug!(%addr, "connected to telnet backend");
        Ok(Self {
            stream,
            addr: addr.to_string(),
        })
    }

    /// The address this session was dialed to.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Drive the session: decoded backend data goes onto `output`, chunks
    /// drained from `input` go down the wire with the DEL to BS rewrite
    /// applied. Returns the task handle; the task ends on cancellation, on
    /// any I/O error, or when either channel counterpart goes away.
    pub fn start(
        self,
        cancel: CancellationToken,
        input: mpsc::Receiver<Bytes>,
        output: mpsc::Sender<Bytes>,
    ) -> JoinHandle<()> {
        let addr = self.addr;
        let framed = Framed::with_capacity(self.stream, TelnetCodec::new(), READ_CHUNK_SIZE);
        tokio::spawn(async move {
            if let Err(err) = run_session(framed, cancel, input, output).await {
                if !err.is_disconnect() {
                    tracing::warn!(%addr, error = %err, "telnet session failed");
                }
            }
            tracing::debug!(%addr, "telnet session ended");
        })
    }
}

async fn run_session(
    mut framed: Framed<TcpStream, TelnetCodec>,
    cancel: CancellationToken,
    mut input: mpsc::Receiver<Bytes>,
    output: mpsc::Sender<Bytes>,
) -> Result<()> {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),

            frame = framed.next() => {
                let data = match frame {
                    Some(frame) => frame?,
                    None => return Ok(()),
                };

                // answer queued option refusals before touching the data
                if let Some(responses) = framed.codec_mut().take_responses() {
                    SinkExt::<TelnetFrame>::send(&mut framed, TelnetFrame::Protocol(responses))
                        .await?;
                }

                if !data.is_empty() {
                    tokio::select! {
                        _ = cancel.cancelled() => return Ok(()),
                        sent = output.send(data) => {
                            if sent.is_err() {
                                return Err(TelnetError::ChannelClosed);
                            }
                        }
                    }
                }
            }

            chunk = input.recv() => {
                let chunk = match chunk {
                    Some(chunk) => chunk,
                    None => return Err(TelnetError::ChannelClosed),
                };
                let chunk = rewrite_del(chunk);
                SinkExt::<TelnetFrame>::send(&mut framed, TelnetFrame::Data(chunk)).await?;
            }
        }
    }
}

/// Rewrite DEL to BS on the way to the backend.
fn rewrite_del(chunk: Bytes) -> Bytes {
    if !chunk.contains(&DEL) {
        return chunk;
    }
    let mut rewritten = BytesMut::with_capacity(chunk.len());
    for byte in &chunk {
        rewritten.put_u8(if *byte == DEL { BS } else { *byte });
    }
    rewritten.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_del_to_bs() {
        let rewritten = rewrite_del(Bytes::from_static(&[b'a', DEL, b'b']));
        assert_eq!(&rewritten[..], &[b'a', BS, b'b']);
    }

    #[test]
    fn test_rewrite_without_del_is_passthrough() {
        let chunk = Bytes::from_static(b"plain");
        assert_eq!(rewrite_del(chunk.clone()), chunk);
    }
}
