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

//! Telnet Backend Session
//!
//! This crate carries the backend half of the gateway: a TCP dial to a remote
//! telnet server presented as a byte-channel endpoint.
//!
//! [`TelnetCodec`] is a deliberately negotiation-passive wire codec: it
//! decodes the raw stream into data chunks, strips IAC command sequences,
//! refuses every option the server proposes, and escapes outbound data
//! bytes that collide with IAC. [`TelnetSession`] drives the codec over a
//! [`Framed`](tokio_util::codec::Framed) transport: one select loop moves
//! decoded data onto the output channel and drains the input channel onto
//! the wire, rewriting DEL to BS for legacy servers on the way down.

mod codec;
mod error;
mod session;

pub use codec::{TelnetCodec, TelnetFrame};
pub use error::{Result, TelnetError};
pub use session::TelnetSession;
