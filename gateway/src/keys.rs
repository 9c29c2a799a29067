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

//! Host key persistence
//!
//! The host key lives as a PKCS#8 PEM private key on disk. Generation is
//! explicit (the `keygen` subcommand) or opt-in (`--generate-key`); the
//! gateway refuses to invent a key silently so fingerprints stay stable.

use anyhow::{Context, bail};
use russh_keys::key::KeyPair;
use std::path::Path;

/// Load the host key, generating it first when allowed and absent.
pub fn load_or_generate(path: &Path, generate: bool) -> anyhow::Result<KeyPair> {
    if !path.exists() {
        if !generate {
            bail!(
                "host key {} does not exist; run `teleway keygen` or pass --generate-key",
                path.display()
            );
        }
        generate_to(path)?;
    }
    russh_keys::load_secret_key(path, None)
        .with_context(|| format!("could not load host key {}", path.display()))
}

/// Generate a fresh Ed25519 host key and write it as PKCS#8 PEM.
pub fn generate_to(path: &Path) -> anyhow::Result<KeyPair> {
    let key = KeyPair::generate_ed25519().context("host key generation failed")?;

    let file = std::fs::File::create(path)
        .with_context(|| format!("could not create host key file {}", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))
            .context("could not restrict host key permissions")?;
    }
    russh_keys::encode_pkcs8_pem(&key, file).context("could not encode host key")?;

    tracing::info!(path = %path.display(), "generated host key");
    Ok(key)
}
