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

//! Error types for the menu subsystem

use thiserror::Error;

/// Result type for menu operations
pub type Result<T> = std::result::Result<T, MenuError>;

/// Menu subsystem error types
#[derive(Debug, Error)]
pub enum MenuError {
    /// I/O error from a dialog stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A byte channel counterpart went away
    #[error("Byte channel closed")]
    ChannelClosed,

    /// The input channel is lent out to a dialog bridge
    #[error("Input channel unavailable")]
    InputUnavailable,

    /// Dialing the backend failed; the message is surfaced to the user
    #[error("{0}")]
    Dial(String),
}
