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

//! Gateway orchestration
//!
//! Owns the shared channel pair and the root cancellation token, wires the
//! SSH fan-out to the menu proxy, and runs until the menu finishes or the
//! process is interrupted. Components signal termination through
//! cancellation; nobody closes a channel they did not create.

use crate::cli::Cli;
use crate::keys;
use anyhow::Context;
use async_trait::async_trait;
use teleway_fanout::{Charmap, SshFanout};
use teleway_menu::{BackendDialer, BackendSession, MenuError, MenuProxy, MenuVariant};
use teleway_telnet::TelnetSession;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Capacity of the shared input and output channels.
const CHANNEL_CAPACITY: usize = 64;

/// Run the gateway until shutdown.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let key = keys::load_or_generate(&cli.host_key, cli.generate_key)?;

    let (input_tx, input_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (output_tx, output_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let cancel = CancellationToken::new();

    let mut fanout = SshFanout::new(cli.listen.clone(), key);
    fanout.set_chans(input_tx, output_rx);
    if cli.codepage {
        fanout.set_charmap(Charmap::Cp437);
    }
    fanout
        .start(cancel.child_token())
        .await
        .context("could not start the SSH listener")?;

    let variant = if cli.dialog_menu {
        MenuVariant::Dialog
    } else {
        MenuVariant::Scan
    };
    let menu = MenuProxy::new(input_rx, output_tx, TelnetDialer).with_variant(variant);
    let menu_task = tokio::spawn(menu.run(cancel.child_token()));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt received, shutting down");
        }
        finished = menu_task => match finished {
            Ok(Ok(())) => tracing::info!("menu finished, shutting down"),
            Ok(Err(err)) => tracing::error!(error = %err, "menu failed"),
            Err(err) => tracing::error!(error = %err, "menu task panicked"),
        },
    }

    cancel.cancel();
    Ok(())
}

/// Wires [`TelnetSession`] into the menu's backend seam: each dial creates a
/// fresh channel pair and a session task bound to the menu's session scope.
struct TelnetDialer;

#[async_trait]
impl BackendDialer for TelnetDialer {
    async fn dial(
        &self,
        addr: &str,
        cancel: CancellationToken,
    ) -> Result<BackendSession, MenuError> {
        let session = TelnetSession::dial(addr)
            .await
            .map_err(|err| MenuError::Dial(err.to_string()))?;

        let (input_tx, input_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (output_tx, output_rx) = mpsc::channel(CHANNEL_CAPACITY);
        session.start(cancel, input_rx, output_tx);

        Ok(BackendSession {
            input: input_tx,
            output: output_rx,
        })
    }
}
