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

//! Command line surface

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// SSH to telnet gateway with an in-band command shell.
///
/// Start the gateway and connect to it over SSH; press Ctrl-E inside a
/// session to reach the menu.
#[derive(Debug, Parser)]
#[command(name = "teleway", version, about)]
pub struct Cli {
    /// host:port of the SSH listener
    #[arg(short = 'l', long, default_value = "localhost:2002")]
    pub listen: String,

    /// Path to the PEM-encoded host key
    #[arg(long, default_value = "teleway-host-key.pem")]
    pub host_key: PathBuf,

    /// Generate the host key if the file does not exist
    #[arg(long)]
    pub generate_key: bool,

    /// Translate peer traffic through IBM code page 437
    #[arg(long)]
    pub codepage: bool,

    /// Use the line-oriented dialog for the in-session menu
    #[arg(long)]
    pub dialog_menu: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a host key at the --host-key path and exit
    Keygen,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["teleway"]);
        assert_eq!(cli.listen, "localhost:2002");
        assert_eq!(cli.host_key, PathBuf::from("teleway-host-key.pem"));
        assert!(!cli.generate_key);
        assert!(!cli.codepage);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_keygen_subcommand() {
        let cli = Cli::parse_from(["teleway", "--host-key", "/tmp/key.pem", "keygen"]);
        assert!(matches!(cli.command, Some(Command::Keygen)));
        assert_eq!(cli.host_key, PathBuf::from("/tmp/key.pem"));
    }
}
