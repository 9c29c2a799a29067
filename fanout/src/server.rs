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

//! SSH fan-out listener
//!
//! Accepts SSH connections with the none auth method, registers the first
//! session channel of each connection as a peer, multiplexes peer input into
//! the shared input channel, and broadcasts the shared output channel to all
//! peers. A peer whose write fails is closed and pruned in the same registry
//! pass, so the peer record never outlives its usefulness.

use crate::{Charmap, FanoutError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use russh::server::{Auth, Config, Handle, Msg, Session};
use russh::{Channel, ChannelId, CryptoVec, MethodSet};
use russh_keys::key::KeyPair;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{RwLock, mpsc};
use tokio_util::sync::CancellationToken;

/// One attached peer: the session's write handle and its channel id, pruned
/// together or not at all.
struct Peer {
    handle: Handle,
    channel: ChannelId,
}

/// The SSH fan-out listener.
///
/// Lives for the process lifetime. Set the channel pair (and optionally a
/// charmap) before calling [`start`](SshFanout::start); start binds the
/// listener, spawns the accept and broadcast tasks, and returns.
pub struct SshFanout {
    listen_addr: String,
    config: Arc<Config>,
    registry: Arc<RwLock<Vec<Peer>>>,
    input: Option<mpsc::Sender<Bytes>>,
    output: Option<mpsc::Receiver<Bytes>>,
    charmap: Option<Charmap>,
    local_addr: Option<SocketAddr>,
}

impl SshFanout {
    /// Create a listener advertising the given host key, with client auth
    /// disabled.
    pub fn new(listen_addr: impl Into<String>, key: KeyPair) -> Self {
        let mut config = Config::default();
        config.methods = MethodSet::NONE;
        config.auth_rejection_time = Duration::from_secs(3);
        config.auth_rejection_time_initial = Some(Duration::ZERO);
        config.keys = vec![key];

        Self {
            listen_addr: listen_addr.into(),
            config: Arc::new(config),
            registry: Arc::new(RwLock::new(Vec::new())),
            input: None,
            output: None,
            charmap: None,
            local_addr: None,
        }
    }

    /// Set the shared channel pair: peers produce onto `input`, the
    /// broadcaster drains `output`.
    pub fn set_chans(&mut self, input: mpsc::Sender<Bytes>, output: mpsc::Receiver<Bytes>) {
        self.input = Some(input);
        self.output = Some(output);
    }

    /// Enable codepage translation on both directions.
    pub fn set_charmap(&mut self, charmap: Charmap) {
        self.charmap = Some(charmap);
    }

    /// The bound address, available after [`start`](SshFanout::start).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Number of currently attached peers.
    pub async fn connections(&self) -> usize {
        self.registry.read().await.len()
    }

    /// Bind the listener and spawn the accept and broadcast tasks. Returns
    /// once the port is bound; cancellation stops both tasks, leaving
    /// attached sessions to the parent's teardown.
    pub async fn start(&mut self, cancel: CancellationToken) -> Result<()> {
        if self.local_addr.is_some() {
            return Err(FanoutError::AlreadyStarted);
        }
        let input = self.input.take().ok_or(FanoutError::ChannelsNotSet)?;
        let output = self.output.take().ok_or(FanoutError::ChannelsNotSet)?;

        let listener = TcpListener::bind(&self.listen_addr).await?;
        let local_addr = listener.local_addr()?;
        self.local_addr = Some(local_addr);
        tracing::info!(addr = %local_addr, "ssh listener bound");

        tokio::spawn(broadcast_loop(
            output,
            self.registry.clone(),
            self.charmap,
            cancel.clone(),
        ));
        tokio::spawn(accept_loop(
            listener,
            self.config.clone(),
            self.registry.clone(),
            input,
            self.charmap,
            cancel,
        ));

        Ok(())
    }
}

impl std::fmt::Debug for SshFanout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshFanout")
            .field("listen_addr", &self.listen_addr)
            .field("local_addr", &self.local_addr)
            .field("charmap", &self.charmap)
            .finish()
    }
}

/// Accept connections until cancellation. One bad peer never breaks the
/// listener: handshake and channel failures end that peer's task only.
async fn accept_loop(
    listener: TcpListener,
    config: Arc<Config>,
    registry: Arc<RwLock<Vec<Peer>>>,
    input: mpsc::Sender<Bytes>,
    charmap: Option<Charmap>,
    cancel: CancellationToken,
) {
    loop {
        let (socket, peer_addr) = tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok(pair) => pair,
                Err(err) => {
                    tracing::warn!(error = %err, "failed to accept connection");
                    continue;
                }
            },
        };
        tracing::debug!(%peer_addr, "accepted ssh connection");

        let handler = PeerHandler {
            registry: registry.clone(),
            input: input.clone(),
            charmap,
            channel: None,
        };
        let config = config.clone();
        tokio::spawn(async move {
            if let Err(err) = russh::server::run_stream(config, socket, handler).await {
                tracing::debug!(%peer_addr, error = %err, "ssh session ended");
            }
        });
    }
    tracing::info!("ssh accept loop terminated");
}

/// Replicate the shared output to every peer, translating first when a
/// charmap is set. A failed or short write closes and prunes that peer; the
/// registry lock is held for the whole pass, which serializes broadcasts.
async fn broadcast_loop(
    mut output: mpsc::Receiver<Bytes>,
    registry: Arc<RwLock<Vec<Peer>>>,
    charmap: Option<Charmap>,
    cancel: CancellationToken,
) {
    loop {
        let chunk = tokio::select! {
            _ = cancel.cancelled() => break,
            maybe = output.recv() => match maybe {
                Some(chunk) => chunk,
                None => break,
            },
        };
        let chunk = match charmap {
            Some(charmap) => charmap.decode(&chunk),
            None => chunk,
        };

        if !broadcast_chunk(&registry, &chunk, &cancel).await {
            break;
        }
    }
    tracing::info!("ssh broadcast loop terminated");
}

/// Write one chunk to every peer, pruning peers whose writes fail. Every
/// peer write races cancellation so a frozen client cannot wedge the
/// broadcaster or the registry lock it holds. Returns `false` once
/// cancellation interrupts the pass; peers not yet written are kept, so the
/// registry stays coherent.
async fn broadcast_chunk(
    registry: &RwLock<Vec<Peer>>,
    chunk: &Bytes,
    cancel: &CancellationToken,
) -> bool {
    let mut peers = registry.write().await;
    let mut kept = Vec::with_capacity(peers.len());
    let mut cancelled = false;

    for peer in peers.drain(..) {
        if cancelled {
            kept.push(peer);
            continue;
        }
        let write = tokio::select! {
            _ = cancel.cancelled() => {
                cancelled = true;
                kept.push(peer);
                continue;
            }
            write = peer.handle.data(peer.channel, CryptoVec::from(chunk.to_vec())) => write,
        };
        match write {
            Ok(()) => kept.push(peer),
            Err(_) => {
                tracing::debug!("pruning ssh peer after failed write");
                tokio::select! {
                    _ = cancel.cancelled() => cancelled = true,
                    _ = peer.handle.close(peer.channel) => {}
                }
            }
        }
    }
    *peers = kept;

    !cancelled
}

/// Per-connection handler: accepts none auth, registers the first session
/// channel, and forwards channel data into the shared input channel.
struct PeerHandler {
    registry: Arc<RwLock<Vec<Peer>>>,
    input: mpsc::Sender<Bytes>,
    charmap: Option<Charmap>,
    channel: Option<ChannelId>,
}

#[async_trait]
impl russh::server::Handler for PeerHandler {
    type Error = russh::Error;

    async fn auth_none(&mut self, _user: &str) -> std::result::Result<Auth, Self::Error> {
        Ok(Auth::Accept)
    }

    async fn channel_open_session(
        &mut self,
        channel: Channel<Msg>,
        session: &mut Session,
    ) -> std::result::Result<bool, Self::Error> {
        // one session channel per connection; refuse the rest
        if self.channel.is_some() {
            return Ok(false);
        }
        self.channel = Some(channel.id());
        self.registry.write().await.push(Peer {
            handle: session.handle(),
            channel: channel.id(),
        });
        tracing::debug!(channel = %channel.id(), "ssh peer attached");
        Ok(true)
    }

    async fn data(
        &mut self,
        channel: ChannelId,
        data: &[u8],
        _session: &mut Session,
    ) -> std::result::Result<(), Self::Error> {
        if self.channel != Some(channel) {
            return Ok(());
        }
        let chunk = match self.charmap {
            Some(charmap) => match charmap.encode(data) {
                Some(chunk) => chunk,
                None => {
                    tracing::debug!("dropping untranslatable input chunk");
                    return Ok(());
                }
            },
            None => Bytes::copy_from_slice(data),
        };
        // the consumer going away is not the peer's problem
        let _ = self.input.send(chunk).await;
        Ok(())
    }
}
