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

//! In-band Menu and Dialog Multiplexer
//!
//! This crate watches a bidirectional byte stream for the escape byte
//! (`0x05`, Ctrl-E), pauses transparent forwarding when it appears, and
//! exposes a small command surface to the user.
//!
//! Three layers compose here:
//!
//! - [`Dialog`]: a line-oriented command reader over a raw byte stream, in a
//!   basic newline-delimited flavor and a line-editing flavor, selected by
//!   [`DialogKind`].
//! - [`DialogProxy`]: a standalone proxy that forwards bytes transparently
//!   until the escape byte appears, then splices a dialog in front of the
//!   user through a [`StreamPump`](teleway_pump::StreamPump) over in-memory
//!   pipes.
//! - [`MenuProxy`]: the gateway menu. A pre-connect command loop (help,
//!   connect, shutdown), a connect flow with in-band line editing, and a
//!   connected-mode multiplexer that keeps backend output flowing while the
//!   in-session menu is active.
//!
//! The backend is reached through the [`BackendDialer`] seam, which yields a
//! [`BackendSession`] channel pair per dialed session; the crate never holds
//! backend state beyond those two channels.

mod dialog;
mod error;
mod menu;
mod proxy;
mod source;

pub use dialog::{BasicDialog, Dialog, DialogKind, LineEditorDialog, instantiate};
pub use error::{MenuError, Result};
pub use menu::{BackendDialer, BackendSession, ESCAPE_BYTE, MenuProxy, MenuVariant};
pub use proxy::DialogProxy;
