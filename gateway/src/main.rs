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

//! SSH to Telnet Gateway
//!
//! Listens for SSH clients, fans them into one logical byte stream, and
//! relays that stream to a telnet backend chosen through an in-band command
//! menu (Ctrl-E). See the crate-level docs of the member crates for the
//! moving parts.
//!
//! ```bash
//! teleway &
//! ssh -p 2002 localhost
//! ```

mod app;
mod cli;
mod keys;

use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = cli::Cli::parse();
    match cli.command {
        Some(cli::Command::Keygen) => {
            let key_path = cli.host_key.clone();
            keys::generate_to(&key_path)?;
            println!("host key written to {}", key_path.display());
            Ok(())
        }
        None => app::run(cli).await,
    }
}
