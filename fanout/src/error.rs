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

//! Error types for the SSH fan-out

use thiserror::Error;

/// Result type for fan-out operations
pub type Result<T> = std::result::Result<T, FanoutError>;

/// SSH fan-out error types
#[derive(Debug, Error)]
pub enum FanoutError {
    /// I/O error from the TCP listener
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The channel pair was not set before start
    #[error("Channels not configured")]
    ChannelsNotSet,

    /// The listener was already started
    #[error("Listener already started")]
    AlreadyStarted,
}
