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

//! Escape-activated dialog proxy
//!
//! Forwards bytes from its input channel to its output channel until the
//! escape byte appears; then splices a [`Dialog`] in front of the user and
//! interprets line commands until `quit` restores transparent flow.
//!
//! The dialog never touches the channels directly: a
//! [`StreamPump`](teleway_pump::StreamPump) bridges the channel pair to a
//! pair of in-memory pipes, and the dialog reads and writes plain streams.
//! Bytes that followed the escape byte in the triggering chunk are delivered
//! through the same path, so the dialog sees them as its first input.

use crate::menu::ESCAPE_BYTE;
use crate::source::InputSource;
use crate::{Dialog, DialogKind, MenuError, Result, dialog};
use bytes::Bytes;
use std::sync::{Arc, Mutex};
use teleway_pump::StreamPump;
use tokio::io::duplex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Capacity of the bridge channel feeding the pump.
const BRIDGE_CAPACITY: usize = 64;

/// Capacity of the in-memory pipes between pump and dialog.
const PIPE_CAPACITY: usize = 1024;

/// A transparent byte proxy with an escape-activated command dialog.
pub struct DialogProxy {
    source: InputSource,
    output: mpsc::Sender<Bytes>,
    kind: DialogKind,
    menu_active: Arc<Mutex<bool>>,
}

impl DialogProxy {
    /// Create a proxy over the given channel pair, using the basic dialog.
    pub fn new(input: mpsc::Receiver<Bytes>, output: mpsc::Sender<Bytes>) -> Self {
        Self {
            source: InputSource::new(input),
            output,
            kind: DialogKind::Basic,
            menu_active: Arc::new(Mutex::new(false)),
        }
    }

    /// Select the dialog flavor.
    pub fn with_dialog(mut self, kind: DialogKind) -> Self {
        self.kind = kind;
        self
    }

    /// Whether the dialog is currently spliced into the stream.
    pub fn is_active(&self) -> bool {
        *self.menu_active.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_active(&self, active: bool) {
        *self.menu_active.lock().unwrap_or_else(|e| e.into_inner()) = active;
    }

    /// Drive the proxy until cancellation or until the input channel closes.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<()> {
        loop {
            let chunk = match self.source.next(&cancel).await {
                Some(chunk) => chunk,
                None => return Ok(()),
            };

            match chunk.iter().position(|&b| b == ESCAPE_BYTE) {
                Some(i) => {
                    self.set_active(true);
                    let initial = chunk.slice(i + 1..);
                    self.run_dialog(&cancel, initial).await?;
                    self.set_active(false);
                }
                None => {
                    tokio::select! {
                        _ = cancel.cancelled() => return Ok(()),
                        sent = self.output.send(chunk) => {
                            if sent.is_err() {
                                return Err(MenuError::ChannelClosed);
                            }
                        }
                    }
                }
            }
        }
    }

    /// Splice a dialog into the stream and interpret commands until `quit`.
    async fn run_dialog(&mut self, cancel: &CancellationToken, initial: Bytes) -> Result<()> {
        let bridge = cancel.child_token();

        let (bridge_tx, bridge_rx) = mpsc::channel(BRIDGE_CAPACITY);
        let (pump_writer, dialog_reader) = duplex(PIPE_CAPACITY);
        let (dialog_writer, pump_reader) = duplex(PIPE_CAPACITY);

        let mut dialog = dialog::instantiate(self.kind, dialog_writer, dialog_reader);

        let pump = StreamPump::new(bridge_rx, self.output.clone(), pump_reader, pump_writer);
        let pump_task = tokio::spawn(pump.run(bridge.clone()));

        let mut seeds = Vec::new();
        if !initial.is_empty() {
            seeds.push(initial);
        }
        seeds.extend(self.source.drain_pushback());
        let receiver = self.source.lend().ok_or(MenuError::InputUnavailable)?;
        let feeder = tokio::spawn(feed_dialog(receiver, seeds, bridge_tx, bridge.clone()));

        let result = self.command_loop(cancel, dialog.as_mut()).await;

        bridge.cancel();
        match feeder.await {
            Ok(receiver) => self.source.restore(receiver),
            Err(err) => tracing::warn!(error = %err, "dialog feeder task failed"),
        }
        if let Err(err) = pump_task.await {
            tracing::warn!(error = %err, "dialog pump task failed");
        }

        result
    }

    async fn command_loop(
        &mut self,
        cancel: &CancellationToken,
        dialog: &mut dyn Dialog,
    ) -> Result<()> {
        loop {
            let command = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                command = dialog.get_command() => match command {
                    Ok(command) => command,
                    Err(err) => {
                        tracing::warn!(error = %err, "dialog read failed");
                        return Ok(());
                    }
                },
            };

            match command.as_str() {
                "quit" => {
                    if let Err(err) = dialog.close().await {
                        tracing::warn!(error = %err, "dialog close failed");
                    }
                    let left = dialog.left();
                    if !left.is_empty() && self.output.send(left).await.is_err() {
                        return Err(MenuError::ChannelClosed);
                    }
                    return Ok(());
                }
                "echo" => self.send(Bytes::from_static(b"echo")).await?,
                _ => self.send(Bytes::from_static(b"invalid command")).await?,
            }
        }
    }

    async fn send(&self, chunk: Bytes) -> Result<()> {
        self.output
            .send(chunk)
            .await
            .map_err(|_| MenuError::ChannelClosed)
    }
}

/// Feed the dialog bridge: seed chunks first, then the lent input channel.
/// Hands the receiver back when the bridge ends.
pub(crate) async fn feed_dialog(
    mut receiver: mpsc::Receiver<Bytes>,
    seeds: Vec<Bytes>,
    bridge_tx: mpsc::Sender<Bytes>,
    cancel: CancellationToken,
) -> mpsc::Receiver<Bytes> {
    for seed in seeds {
        let delivered = tokio::select! {
            _ = cancel.cancelled() => false,
            sent = bridge_tx.send(seed) => sent.is_ok(),
        };
        if !delivered {
            return receiver;
        }
    }
    loop {
        let chunk = tokio::select! {
            _ = cancel.cancelled() => break,
            maybe = receiver.recv() => match maybe {
                Some(chunk) => chunk,
                None => break,
            },
        };
        tokio::select! {
            _ = cancel.cancelled() => break,
            sent = bridge_tx.send(chunk) => {
                if sent.is_err() {
                    break;
                }
            }
        }
    }
    receiver
}
