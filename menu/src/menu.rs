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

//! Gateway menu proxy
//!
//! The [`MenuProxy`] sits between the SSH fan-out and the telnet backend.
//! Before a session exists it runs a one-key command loop (help, connect,
//! shutdown). The connect flow reads a `host:port` line from the same byte
//! channel it multiplexes, with in-band editing. Once connected it becomes a
//! four-way multiplexer: cancellation, backend output, peer input, and the
//! escape-activated in-session menu. Backend output keeps flowing to the
//! peer while the menu is active; the menu intercepts input only.

use crate::dialog::{self, Dialog, DialogKind, ERASE_TO_EOL};
use crate::proxy::feed_dialog;
use crate::source::InputSource;
use crate::{MenuError, Result};
use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use std::sync::{Arc, Mutex};
use teleway_pump::StreamPump;
use tokio::io::duplex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// The in-band escape byte, Ctrl-E.
pub const ESCAPE_BYTE: u8 = 0x05;

/// ASCII DEL, deletes the previous byte in the connect prompt.
const DEL: u8 = 0x7F;

/// Capacity of the bridge channel feeding the in-session dialog pump.
const BRIDGE_CAPACITY: usize = 64;

/// Capacity of the in-memory pipes between pump and dialog.
const PIPE_CAPACITY: usize = 1024;

const HELP_TEXT: &str = "\r\n?: This menu\r\nC: Connect to a host:port pair\r\nS: Shutdown the proxy\r\n";
const SESSION_MENU_TEXT: &str =
    "\r\n?: This menu\r\nR: Reattach to the session\r\nS: Shutdown the proxy\r\n";

/// Which in-session menu implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MenuVariant {
    /// Byte-scanning key menu (`?`, `R`, `S`)
    #[default]
    Scan,
    /// Line-oriented dialog bridged through a stream pump (`quit`, `echo`)
    Dialog,
}

/// A dialed backend session: one channel per direction. The menu owns no
/// backend state beyond these two handles.
pub struct BackendSession {
    /// Peer input headed for the backend
    pub input: mpsc::Sender<Bytes>,
    /// Backend output headed for the peer
    pub output: mpsc::Receiver<Bytes>,
}

/// Seam to the backend transport: dial a `host:port` string and get a
/// session channel pair back. Cancelling the token tears the session down.
#[async_trait]
pub trait BackendDialer: Send + Sync {
    async fn dial(&self, addr: &str, cancel: CancellationToken) -> Result<BackendSession>;
}

#[derive(Debug, Default, Clone, Copy)]
struct MenuState {
    connected: bool,
    menu_active: bool,
}

/// Control flow after a connect attempt.
enum Flow {
    Continue,
    Terminate,
}

/// Control flow out of the in-session menu.
enum MenuAction {
    Resume,
    SessionClosed,
    Shutdown,
}

/// Outcome of a connected session.
enum SessionOutcome {
    Closed,
    Shutdown,
}

/// The gateway menu proxy.
pub struct MenuProxy<D> {
    source: InputSource,
    output: mpsc::Sender<Bytes>,
    dialer: D,
    variant: MenuVariant,
    dialog_kind: DialogKind,
    state: Arc<Mutex<MenuState>>,
}

impl<D: BackendDialer> MenuProxy<D> {
    /// Create a proxy over the given channel pair and backend dialer.
    pub fn new(input: mpsc::Receiver<Bytes>, output: mpsc::Sender<Bytes>, dialer: D) -> Self {
        Self {
            source: InputSource::new(input),
            output,
            dialer,
            variant: MenuVariant::default(),
            dialog_kind: DialogKind::Basic,
            state: Arc::new(Mutex::new(MenuState::default())),
        }
    }

    /// Select the in-session menu implementation.
    pub fn with_variant(mut self, variant: MenuVariant) -> Self {
        self.variant = variant;
        self
    }

    /// Select the dialog flavor used by [`MenuVariant::Dialog`].
    pub fn with_dialog(mut self, kind: DialogKind) -> Self {
        self.dialog_kind = kind;
        self
    }

    /// Whether a backend session is currently attached.
    pub fn is_connected(&self) -> bool {
        self.state().connected
    }

    /// Whether the in-session menu is intercepting input.
    pub fn is_menu_active(&self) -> bool {
        self.state().menu_active
    }

    fn state(&self) -> MenuState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_connected(&self, connected: bool) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.connected = connected;
        if !connected {
            state.menu_active = false;
        }
    }

    fn set_menu_active(&self, active: bool) {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).menu_active = active;
    }

    /// Drive the proxy until shutdown, cancellation, or the input channel
    /// closing. Channels are owned by the orchestrator; this never closes
    /// them.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<()> {
        loop {
            let chunk = match self.source.next(&cancel).await {
                Some(chunk) => chunk,
                None => return Ok(()),
            };

            let mut offset = 0;
            while offset < chunk.len() {
                match chunk[offset] {
                    b'?' => self.send_help().await?,
                    b'c' | b'C' => {
                        let seed = chunk.slice(offset + 1..);
                        if let Flow::Terminate = self.connect(seed, &cancel).await? {
                            return Ok(());
                        }
                        // whatever followed the command in this chunk was
                        // consumed by the connect flow or is stale by now
                        break;
                    }
                    b's' | b'S' => {
                        self.respond("shutting down").await?;
                        return Ok(());
                    }
                    _ => self.send_help().await?,
                }
                offset += 1;
            }
        }
    }

    /// The connect flow: prompt, read a `host:port` line in-band, dial, and
    /// hand over to the connected-mode multiplexer on success.
    async fn connect(&mut self, seed: Bytes, cancel: &CancellationToken) -> Result<Flow> {
        self.send_raw(Bytes::from_static(b"Connect: ")).await?;

        let (host, leftover) = match self.read_line(seed, cancel).await? {
            Some(line) => line,
            None => return Ok(Flow::Terminate),
        };

        self.respond(&format!("connecting to host: {host}")).await?;

        let session_cancel = cancel.child_token();
        let session = match self.dialer.dial(&host, session_cancel.clone()).await {
            Ok(session) => session,
            Err(err) => {
                self.respond(&format!("could not connect: {err}")).await?;
                return Ok(Flow::Continue);
            }
        };

        self.set_connected(true);
        // bytes past the terminating CR are the first ones the backend sees
        self.source.push_back(leftover);

        let outcome = self.connected_loop(session, cancel).await;
        session_cancel.cancel();
        self.set_connected(false);

        match outcome? {
            SessionOutcome::Shutdown => Ok(Flow::Terminate),
            SessionOutcome::Closed => Ok(Flow::Continue),
        }
    }

    /// Read one line from the input source with in-band editing: DEL deletes
    /// the previous byte and nudges the terminal to redraw, printable bytes
    /// are echoed, CR terminates. Returns the line and the unconsumed bytes
    /// of the final chunk.
    async fn read_line(
        &mut self,
        seed: Bytes,
        cancel: &CancellationToken,
    ) -> Result<Option<(String, Bytes)>> {
        let mut line: Vec<u8> = Vec::new();
        let mut chunk = seed;

        loop {
            let mut echo = BytesMut::new();
            for (i, &byte) in chunk.iter().enumerate() {
                match byte {
                    DEL => {
                        if line.pop().is_some() {
                            echo.extend_from_slice(&ERASE_TO_EOL);
                        }
                    }
                    b'\r' => {
                        echo.extend_from_slice(b"\r\n");
                        self.send_raw(echo.freeze()).await?;
                        let leftover = chunk.slice(i + 1..);
                        let host = String::from_utf8_lossy(&line).into_owned();
                        return Ok(Some((host, leftover)));
                    }
                    byte => {
                        line.push(byte);
                        if byte >= 0x20 {
                            echo.put_u8(byte);
                        }
                    }
                }
            }
            if !echo.is_empty() {
                self.send_raw(echo.freeze()).await?;
            }

            chunk = match self.source.next(cancel).await {
                Some(chunk) => chunk,
                None => return Ok(None),
            };
        }
    }

    /// Connected-mode multiplexer. Backend output always flows to the peer;
    /// peer input flows to the backend unless the in-session menu holds it.
    async fn connected_loop(
        &mut self,
        mut session: BackendSession,
        cancel: &CancellationToken,
    ) -> Result<SessionOutcome> {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(SessionOutcome::Closed),

                backend = session.output.recv() => match backend {
                    Some(chunk) => {
                        tokio::select! {
                            _ = cancel.cancelled() => return Ok(SessionOutcome::Closed),
                            sent = self.output.send(chunk) => {
                                if sent.is_err() {
                                    return Err(MenuError::ChannelClosed);
                                }
                            }
                        }
                    }
                    None => {
                        let _ = self.respond("connection closed").await;
                        return Ok(SessionOutcome::Closed);
                    }
                },

                chunk = self.source.next(cancel) => {
                    let chunk = match chunk {
                        Some(chunk) => chunk,
                        None => return Ok(SessionOutcome::Closed),
                    };
                    if self.is_menu_active() {
                        if let MenuAction::Shutdown = self.handle_menu_bytes(&chunk).await? {
                            return Ok(SessionOutcome::Shutdown);
                        }
                    } else if let Some(i) = chunk.iter().position(|&b| b == ESCAPE_BYTE) {
                        // the escape byte itself never reaches the backend
                        let rest = chunk.slice(i + 1..);
                        match self.enter_menu(rest, &mut session, cancel).await? {
                            MenuAction::Shutdown => return Ok(SessionOutcome::Shutdown),
                            MenuAction::SessionClosed => {
                                let _ = self.respond("connection closed").await;
                                return Ok(SessionOutcome::Closed);
                            }
                            MenuAction::Resume => {}
                        }
                    } else {
                        tokio::select! {
                            _ = cancel.cancelled() => return Ok(SessionOutcome::Closed),
                            sent = session.input.send(chunk) => {
                                if sent.is_err() {
                                    let _ = self.respond("connection closed").await;
                                    return Ok(SessionOutcome::Closed);
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    /// Escape byte seen: hand input over to the selected in-session menu.
    async fn enter_menu(
        &mut self,
        rest: Bytes,
        session: &mut BackendSession,
        cancel: &CancellationToken,
    ) -> Result<MenuAction> {
        match self.variant {
            MenuVariant::Scan => {
                self.set_menu_active(true);
                self.send_session_menu().await?;
                if rest.is_empty() {
                    Ok(MenuAction::Resume)
                } else {
                    self.handle_menu_bytes(&rest).await
                }
            }
            MenuVariant::Dialog => self.run_session_dialog(rest, session, cancel).await,
        }
    }

    /// The byte-scanning in-session menu.
    async fn handle_menu_bytes(&mut self, bytes: &[u8]) -> Result<MenuAction> {
        for &byte in bytes {
            match byte {
                b'?' => self.send_session_menu().await?,
                b's' | b'S' => {
                    self.respond("shutting down").await?;
                    return Ok(MenuAction::Shutdown);
                }
                b'r' | b'R' => {
                    self.set_menu_active(false);
                    self.respond("reattached").await?;
                    // the rest of the chunk is dropped; a trailing CR
                    // typically follows the command and is harmless
                    return Ok(MenuAction::Resume);
                }
                // already connected, nested connects are a no-op
                b'c' | b'C' => {}
                _ => self.send_session_menu().await?,
            }
        }
        Ok(MenuAction::Resume)
    }

    /// The dialog-proxy in-session menu: a line dialog bridged through a
    /// stream pump, with backend output still flowing to the peer.
    async fn run_session_dialog(
        &mut self,
        initial: Bytes,
        session: &mut BackendSession,
        cancel: &CancellationToken,
    ) -> Result<MenuAction> {
        self.set_menu_active(true);
        let bridge = cancel.child_token();

        let (bridge_tx, bridge_rx) = mpsc::channel(BRIDGE_CAPACITY);
        let (pump_writer, dialog_reader) = duplex(PIPE_CAPACITY);
        let (dialog_writer, pump_reader) = duplex(PIPE_CAPACITY);

        let mut dialog = dialog::instantiate(self.dialog_kind, dialog_writer, dialog_reader);

        let pump = StreamPump::new(bridge_rx, self.output.clone(), pump_reader, pump_writer);
        let pump_task = tokio::spawn(pump.run(bridge.clone()));

        let mut seeds = Vec::new();
        if !initial.is_empty() {
            seeds.push(initial);
        }
        seeds.extend(self.source.drain_pushback());
        let receiver = self.source.lend().ok_or(MenuError::InputUnavailable)?;
        let feeder = tokio::spawn(feed_dialog(receiver, seeds, bridge_tx, bridge.clone()));

        let result = self
            .session_command_loop(cancel, dialog.as_mut(), session)
            .await;

        bridge.cancel();
        match feeder.await {
            Ok(receiver) => self.source.restore(receiver),
            Err(err) => tracing::warn!(error = %err, "dialog feeder task failed"),
        }
        if let Err(err) = pump_task.await {
            tracing::warn!(error = %err, "dialog pump task failed");
        }
        self.set_menu_active(false);

        result
    }

    async fn session_command_loop(
        &mut self,
        cancel: &CancellationToken,
        dialog: &mut dyn Dialog,
        session: &mut BackendSession,
    ) -> Result<MenuAction> {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(MenuAction::Resume),

                backend = session.output.recv() => match backend {
                    Some(chunk) => {
                        tokio::select! {
                            _ = cancel.cancelled() => return Ok(MenuAction::Resume),
                            sent = self.output.send(chunk) => {
                                if sent.is_err() {
                                    return Err(MenuError::ChannelClosed);
                                }
                            }
                        }
                    }
                    None => return Ok(MenuAction::SessionClosed),
                },

                command = dialog.get_command() => {
                    let command = match command {
                        Ok(command) => command,
                        Err(err) => {
                            tracing::warn!(error = %err, "dialog read failed");
                            return Ok(MenuAction::Resume);
                        }
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
                            return Ok(MenuAction::Resume);
                        }
                        "echo" => self.send_raw(Bytes::from_static(b"echo")).await?,
                        _ => self.send_raw(Bytes::from_static(b"invalid command")).await?,
                    }
                }
            }
        }
    }

    async fn send_help(&self) -> Result<()> {
        self.send_raw(Bytes::from_static(HELP_TEXT.as_bytes())).await
    }

    async fn send_session_menu(&self) -> Result<()> {
        self.send_raw(Bytes::from_static(SESSION_MENU_TEXT.as_bytes()))
            .await
    }

    async fn respond(&self, text: &str) -> Result<()> {
        self.send_raw(Bytes::from(format!("{text}\r\n"))).await
    }

    async fn send_raw(&self, chunk: Bytes) -> Result<()> {
        self.output
            .send(chunk)
            .await
            .map_err(|_| MenuError::ChannelClosed)
    }
}
