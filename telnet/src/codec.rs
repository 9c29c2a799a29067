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

//! Negotiation-passive telnet codec
//!
//! The gateway forwards raw bytes and leaves terminal behavior to the peers,
//! so this codec's job is narrow: hide the telnet protocol layer from the
//! byte pipeline. Incoming IAC command sequences are stripped from the data
//! stream, every option the server proposes is refused, and outgoing data is
//! escaped so a literal `0xFF` survives the wire.

use crate::TelnetError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Interpret As Command
const IAC: u8 = 255;
/// Negotiation verb: don't you use this option
const DONT: u8 = 254;
/// Negotiation verb: please use this option
const DO: u8 = 253;
/// Negotiation verb: I refuse this option
const WONT: u8 = 252;
/// Negotiation verb: I want to use this option
const WILL: u8 = 251;
/// Subnegotiation begin
const SB: u8 = 250;
/// Subnegotiation end
const SE: u8 = 240;

/// Decoder state across chunk boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderState {
    /// Plain data bytes
    Data,
    /// Saw IAC, expecting a command byte
    Command,
    /// Saw IAC + negotiation verb, expecting an option byte
    Negotiation(u8),
    /// Inside an IAC SB ... IAC SE block
    Subnegotiation,
    /// Saw IAC inside a subnegotiation block
    SubnegotiationCommand,
}

/// Frames accepted by the encoder.
///
/// `Data` is user payload and gets IAC-escaped; `Protocol` is an already
/// well-formed command sequence (the queued refusals) written verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelnetFrame {
    /// User payload, escaped on encode
    Data(Bytes),
    /// Raw protocol bytes, written verbatim
    Protocol(Bytes),
}

/// Telnet codec for [`Framed`](tokio_util::codec::Framed) transports.
///
/// Decoding yields the data bytes of the stream with all protocol sequences
/// removed. Negotiation requests are answered with refusals which accumulate
/// internally; the session drains them with
/// [`take_responses`](TelnetCodec::take_responses) and writes them back as
/// [`TelnetFrame::Protocol`].
#[derive(Debug)]
pub struct TelnetCodec {
    state: DecoderState,
    responses: BytesMut,
}

impl Default for TelnetCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl TelnetCodec {
    /// Create a codec in the initial data state.
    pub fn new() -> Self {
        Self {
            state: DecoderState::Data,
            responses: BytesMut::new(),
        }
    }

    /// Drain the refusal responses queued during decoding, if any.
    pub fn take_responses(&mut self) -> Option<Bytes> {
        if self.responses.is_empty() {
            None
        } else {
            Some(self.responses.split().freeze())
        }
    }

    fn refuse(&mut self, verb: u8, option: u8) {
        let refusal = match verb {
            // they ask us to enable an option: we won't
            DO => WONT,
            // they offer to enable an option: we don't want it
            WILL => DONT,
            // DONT and WONT need no answer, nothing was ever enabled
            _ => return,
        };
        self.responses.put_u8(IAC);
        self.responses.put_u8(refusal);
        self.responses.put_u8(option);
    }
}

impl Decoder for TelnetCodec {
    type Item = Bytes;
    type Error = TelnetError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, TelnetError> {
        let mut data = BytesMut::with_capacity(src.len());

        while src.has_remaining() {
            let byte = src.get_u8();
            let next = match self.state {
                DecoderState::Data => {
                    if byte == IAC {
                        DecoderState::Command
                    } else {
                        data.put_u8(byte);
                        DecoderState::Data
                    }
                }
                DecoderState::Command => match byte {
                    // escaped literal 0xFF
                    IAC => {
                        data.put_u8(IAC);
                        DecoderState::Data
                    }
                    DO | DONT | WILL | WONT => DecoderState::Negotiation(byte),
                    SB => DecoderState::Subnegotiation,
                    // NOP, GA, AYT and friends carry no payload for us
                    _ => DecoderState::Data,
                },
                DecoderState::Negotiation(verb) => {
                    self.refuse(verb, byte);
                    DecoderState::Data
                }
                DecoderState::Subnegotiation => {
                    if byte == IAC {
                        DecoderState::SubnegotiationCommand
                    } else {
                        DecoderState::Subnegotiation
                    }
                }
                DecoderState::SubnegotiationCommand => match byte {
                    SE => DecoderState::Data,
                    // IAC IAC inside a subnegotiation is an escaped data byte
                    _ => DecoderState::Subnegotiation,
                },
            };
            self.state = next;
        }

        // an all-protocol read still surfaces as an empty frame when refusals
        // are waiting, so the session flushes them without new data arriving
        if data.is_empty() && self.responses.is_empty() {
            Ok(None)
        } else {
            Ok(Some(data.freeze()))
        }
    }
}

impl Encoder<TelnetFrame> for TelnetCodec {
    type Error = TelnetError;

    fn encode(&mut self, item: TelnetFrame, dst: &mut BytesMut) -> Result<(), TelnetError> {
        match item {
            TelnetFrame::Data(data) => {
                dst.reserve(data.len());
                for byte in &data {
                    if *byte == IAC {
                        dst.put_u8(IAC);
                    }
                    dst.put_u8(*byte);
                }
            }
            TelnetFrame::Protocol(raw) => {
                dst.extend_from_slice(&raw);
            }
        }
        Ok(())
    }
}
