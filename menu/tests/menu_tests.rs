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

//! Gateway menu behavior against a mock backend dialer.

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use teleway_menu::{
    BackendDialer, BackendSession, ESCAPE_BYTE, MenuError, MenuProxy, MenuVariant,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// The backend side of a mock dial: what the menu forwarded downstream, and
/// a sender to inject backend output.
struct MockBackend {
    addr: String,
    input: mpsc::Receiver<Bytes>,
    output: mpsc::Sender<Bytes>,
}

struct MockDialer {
    fail: bool,
    backends: mpsc::Sender<MockBackend>,
}

#[async_trait]
impl BackendDialer for MockDialer {
    async fn dial(
        &self,
        addr: &str,
        _cancel: CancellationToken,
    ) -> teleway_menu::Result<BackendSession> {
        if self.fail {
            return Err(MenuError::Dial(format!("no route to {addr}")));
        }
        let (input_tx, input_rx) = mpsc::channel(8);
        let (output_tx, output_rx) = mpsc::channel(8);
        let _ = self
            .backends
            .send(MockBackend {
                addr: addr.to_string(),
                input: input_rx,
                output: output_tx,
            })
            .await;
        Ok(BackendSession {
            input: input_tx,
            output: output_rx,
        })
    }
}

struct Harness {
    input_tx: mpsc::Sender<Bytes>,
    output_rx: mpsc::Receiver<Bytes>,
    backends: mpsc::Receiver<MockBackend>,
    cancel: CancellationToken,
    task: JoinHandle<teleway_menu::Result<()>>,
}

fn spawn_menu(fail: bool, variant: MenuVariant) -> Harness {
    let (input_tx, input_rx) = mpsc::channel(8);
    let (output_tx, output_rx) = mpsc::channel(64);
    let (backends_tx, backends) = mpsc::channel(8);

    let dialer = MockDialer {
        fail,
        backends: backends_tx,
    };
    let menu = MenuProxy::new(input_rx, output_tx, dialer).with_variant(variant);
    let cancel = CancellationToken::new();
    let task = tokio::spawn(menu.run(cancel.clone()));

    Harness {
        input_tx,
        output_rx,
        backends,
        cancel,
        task,
    }
}

impl Harness {
    async fn send(&self, bytes: &[u8]) {
        self.input_tx
            .send(Bytes::copy_from_slice(bytes))
            .await
            .expect("menu input channel closed");
    }

    async fn expect_chunk(&mut self, expected: &[u8]) {
        let chunk = timeout(Duration::from_secs(1), self.output_rx.recv())
            .await
            .unwrap_or_else(|_| {
                panic!("timeout waiting for {:?}", String::from_utf8_lossy(expected))
            })
            .expect("menu output channel closed");
        assert_eq!(
            String::from_utf8_lossy(&chunk),
            String::from_utf8_lossy(expected)
        );
    }

    /// Receive chunks until one contains `needle`; returns everything
    /// received along the way.
    async fn expect_containing(&mut self, needle: &[u8]) -> Vec<u8> {
        let mut seen = Vec::new();
        timeout(Duration::from_secs(1), async {
            loop {
                let chunk = self.output_rx.recv().await.expect("menu output closed");
                seen.extend_from_slice(&chunk);
                if seen
                    .windows(needle.len())
                    .any(|window| window == needle)
                {
                    break;
                }
            }
        })
        .await
        .unwrap_or_else(|_| {
            panic!(
                "timeout waiting for {:?}; saw {:?}",
                String::from_utf8_lossy(needle),
                String::from_utf8_lossy(&seen)
            )
        });
        seen
    }

    async fn backend(&mut self) -> MockBackend {
        timeout(Duration::from_secs(1), self.backends.recv())
            .await
            .expect("timeout waiting for a backend dial")
            .expect("dialer channel closed")
    }

    /// Connect to the mock backend through the real connect flow.
    async fn connect(&mut self, host: &str) -> MockBackend {
        self.send(b"C").await;
        self.expect_chunk(b"Connect: ").await;
        let mut line = host.as_bytes().to_vec();
        line.push(b'\r');
        self.send(&line).await;
        self.expect_containing(b"connecting to host: ").await;
        let backend = self.backend().await;
        assert_eq!(backend.addr, host);
        backend
    }
}

impl MockBackend {
    async fn expect_input(&mut self, expected: &[u8]) {
        let chunk = timeout(Duration::from_secs(1), self.input.recv())
            .await
            .unwrap_or_else(|_| {
                panic!(
                    "timeout waiting for backend input {:?}",
                    String::from_utf8_lossy(expected)
                )
            })
            .expect("backend input closed");
        assert_eq!(
            String::from_utf8_lossy(&chunk),
            String::from_utf8_lossy(expected)
        );
    }
}

#[tokio::test]
async fn help_banner_lists_the_commands() {
    let mut harness = spawn_menu(true, MenuVariant::Scan);

    harness.send(b"?").await;
    let banner = harness.expect_containing(b"S:").await;
    let banner = String::from_utf8_lossy(&banner);
    assert!(banner.contains("?:"));
    assert!(banner.contains("C:"));

    harness.cancel.cancel();
}

#[tokio::test]
async fn unknown_pre_connect_byte_reprints_the_help() {
    let mut harness = spawn_menu(true, MenuVariant::Scan);

    harness.send(b"z").await;
    harness.expect_containing(b"C: Connect").await;

    harness.cancel.cancel();
}

#[tokio::test]
async fn pre_connect_shutdown_completes_the_task() {
    let mut harness = spawn_menu(true, MenuVariant::Scan);

    harness.send(b"S").await;
    harness.expect_chunk(b"shutting down\r\n").await;

    timeout(Duration::from_secs(1), harness.task)
        .await
        .expect("menu task did not complete")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn failed_dial_reports_and_returns_to_menu() {
    let mut harness = spawn_menu(true, MenuVariant::Scan);

    harness.send(b"C").await;
    harness.expect_chunk(b"Connect: ").await;
    harness.send(b"bbs.example:23\r").await;
    harness
        .expect_containing(b"could not connect: no route to bbs.example:23")
        .await;

    // still in the pre-connect menu
    harness.send(b"?").await;
    harness.expect_containing(b"C: Connect").await;

    harness.cancel.cancel();
}

#[tokio::test]
async fn backspace_editing_resolves_the_host() {
    let mut harness = spawn_menu(false, MenuVariant::Scan);

    harness.send(b"C").await;
    harness.expect_chunk(b"Connect: ").await;
    harness.send(&[b'a', b'b', 0x7F, b'c', b'd', b'\r']).await;

    // the echo must carry the backspace-erase nudge at least once
    let echoed = harness.expect_containing(b"connecting to host: acd").await;
    let nudge = [0x08, 0x1B, b'[', b'K'];
    assert!(
        echoed.windows(nudge.len()).any(|window| window == nudge),
        "no erase nudge in {:?}",
        echoed
    );

    let backend = harness.backend().await;
    assert_eq!(backend.addr, "acd");

    harness.cancel.cancel();
}

#[tokio::test]
async fn deleting_every_byte_yields_the_shorter_host() {
    let mut harness = spawn_menu(false, MenuVariant::Scan);

    harness.send(b"C").await;
    harness.expect_chunk(b"Connect: ").await;
    harness.send(&[b'a', b'b', b'c', 0x7F, b'\r']).await;
    harness.expect_containing(b"connecting to host: ab").await;

    let backend = harness.backend().await;
    assert_eq!(backend.addr, "ab");

    harness.cancel.cancel();
}

#[tokio::test]
async fn bytes_after_the_terminator_reach_the_backend_first() {
    let mut harness = spawn_menu(false, MenuVariant::Scan);

    harness.send(b"C").await;
    harness.expect_chunk(b"Connect: ").await;
    harness.send(b"host:23\rfirst bytes").await;
    harness.expect_containing(b"connecting to host: host:23").await;

    let mut backend = harness.backend().await;
    backend.expect_input(b"first bytes").await;

    harness.cancel.cancel();
}

#[tokio::test]
async fn connected_flow_is_transparent_without_the_escape_byte() {
    let mut harness = spawn_menu(false, MenuVariant::Scan);
    let mut backend = harness.connect("host:23").await;

    harness.send(b"typed at the keyboard").await;
    backend.expect_input(b"typed at the keyboard").await;

    backend
        .output
        .send(Bytes::from_static(b"backend says hi"))
        .await
        .unwrap();
    harness.expect_chunk(b"backend says hi").await;

    harness.cancel.cancel();
}

#[tokio::test]
async fn escape_byte_is_consumed_and_menu_intercepts_input() {
    let mut harness = spawn_menu(false, MenuVariant::Scan);
    let mut backend = harness.connect("host:23").await;

    harness.send(b"before").await;
    backend.expect_input(b"before").await;

    // the escape byte activates the menu and never reaches the backend
    harness.send(&[ESCAPE_BYTE]).await;
    harness.expect_containing(b"R: Reattach").await;

    // menu-mode input stays out of the backend too
    harness.send(b"r").await;
    harness.expect_chunk(b"reattached\r\n").await;

    // after reattach the flow is transparent again; the backend's next
    // chunk proves nothing in between leaked downstream
    harness.send(b"after").await;
    backend.expect_input(b"after").await;

    harness.cancel.cancel();
}

#[tokio::test]
async fn backend_output_keeps_flowing_while_the_menu_is_active() {
    let mut harness = spawn_menu(false, MenuVariant::Scan);
    let backend = harness.connect("host:23").await;

    harness.send(&[ESCAPE_BYTE]).await;
    harness.expect_containing(b"R: Reattach").await;

    backend
        .output
        .send(Bytes::from_static(b"still streaming"))
        .await
        .unwrap();
    harness.expect_chunk(b"still streaming").await;

    harness.cancel.cancel();
}

#[tokio::test]
async fn in_session_shutdown_completes_the_task() {
    let mut harness = spawn_menu(false, MenuVariant::Scan);
    let _backend = harness.connect("host:23").await;

    harness.send(&[ESCAPE_BYTE, b's']).await;
    harness.expect_containing(b"shutting down\r\n").await;

    timeout(Duration::from_secs(1), harness.task)
        .await
        .expect("menu task did not complete")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn nested_connect_is_a_no_op() {
    let mut harness = spawn_menu(false, MenuVariant::Scan);
    let mut backend = harness.connect("host:23").await;

    harness.send(&[ESCAPE_BYTE, b'c', b'r']).await;
    // the C is swallowed, the R reattaches
    harness.expect_containing(b"reattached\r\n").await;

    harness.send(b"onward").await;
    backend.expect_input(b"onward").await;

    harness.cancel.cancel();
}

#[tokio::test]
async fn backend_death_returns_to_the_pre_connect_menu() {
    let mut harness = spawn_menu(false, MenuVariant::Scan);
    let backend = harness.connect("host:23").await;

    drop(backend.output);
    harness.expect_containing(b"connection closed\r\n").await;

    // pre-connect commands work again
    harness.send(b"?").await;
    harness.expect_containing(b"C: Connect").await;

    harness.cancel.cancel();
}

#[tokio::test]
async fn dialog_variant_runs_the_line_menu_in_session() {
    let mut harness = spawn_menu(false, MenuVariant::Dialog);
    let mut backend = harness.connect("host:23").await;

    harness.send(b"downstream").await;
    backend.expect_input(b"downstream").await;

    // escape plus a dialog command in one chunk
    let mut chunk = vec![ESCAPE_BYTE];
    chunk.extend_from_slice(b"echo\n");
    harness.send(&chunk).await;
    harness.expect_chunk(b"echo").await;

    // backend output still flows while the dialog holds the input side
    backend
        .output
        .send(Bytes::from_static(b"interleaved"))
        .await
        .unwrap();
    harness.expect_chunk(b"interleaved").await;

    harness.send(b"quit\n").await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    harness.send(b"resumed").await;
    backend.expect_input(b"resumed").await;

    harness.cancel.cancel();
}
