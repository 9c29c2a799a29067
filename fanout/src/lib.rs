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

//! SSH Fan-out Listener
//!
//! [`SshFanout`] accepts SSH peer sessions on a TCP port and presents all of
//! them to the rest of the gateway as a single logical channel pair: every
//! peer's input is multiplexed into one shared input channel, and one
//! broadcast task replicates the shared output channel to every attached
//! peer, pruning peers whose writes fail.
//!
//! This is intentional fan-out, not multi-tenant isolation: all peers
//! observe the same backend session and their inputs coalesce arbitrarily.
//!
//! Peers authenticate with the none method; an optional [`Charmap`] bridges
//! a legacy backend codepage (CP437) to UTF-8-clean SSH clients.

mod codec;
mod error;
mod server;

pub use codec::Charmap;
pub use error::{FanoutError, Result};
pub use server::SshFanout;
