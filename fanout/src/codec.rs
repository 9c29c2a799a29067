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

//! Codepage translation
//!
//! Legacy telnet backends speak single-byte codepages; SSH clients expect
//! UTF-8. A [`Charmap`] translates per chunk: peer input is encoded toward
//! the backend charset, backend output is decoded back to UTF-8.
//!
//! A chunk that cannot be translated is dropped rather than corrupted; with
//! interactive traffic the next chunk resynchronizes the stream.

use bytes::Bytes;
use codepage_437::{CP437_CONTROL, ToCp437};

/// A single-byte charmap bridging the backend encoding and UTF-8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charmap {
    /// IBM code page 437, the classic PC / BBS charset
    Cp437,
}

impl Charmap {
    /// Peer to backend: UTF-8 chunk into codepage bytes. Returns `None` when
    /// the chunk is not valid UTF-8 or contains unmappable characters.
    pub fn encode(&self, chunk: &[u8]) -> Option<Bytes> {
        match self {
            Charmap::Cp437 => {
                let text = std::str::from_utf8(chunk).ok()?;
                let encoded = text.to_cp437(&CP437_CONTROL).ok()?;
                Some(Bytes::copy_from_slice(&encoded))
            }
        }
    }

    /// Backend to peer: codepage bytes into UTF-8. Total, every byte maps.
    pub fn decode(&self, chunk: &[u8]) -> Bytes {
        match self {
            Charmap::Cp437 => {
                use codepage_437::FromCp437;
                let text = String::from_cp437(chunk.to_vec(), &CP437_CONTROL);
                Bytes::from(text.into_bytes())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_round_trips() {
        let charmap = Charmap::Cp437;
        let encoded = charmap.encode(b"login: guest\r\n").unwrap();
        assert_eq!(&encoded[..], b"login: guest\r\n");
        assert_eq!(&charmap.decode(&encoded)[..], b"login: guest\r\n");
    }

    #[test]
    fn test_box_drawing_decodes_to_utf8() {
        let charmap = Charmap::Cp437;
        // 0xC9 is the double-line top-left box corner in CP437
        let decoded = charmap.decode(&[0xC9]);
        assert_eq!(std::str::from_utf8(&decoded).unwrap(), "\u{2554}");
    }

    #[test]
    fn test_utf8_encodes_to_single_byte() {
        let charmap = Charmap::Cp437;
        let encoded = charmap.encode("\u{2554}".as_bytes()).unwrap();
        assert_eq!(&encoded[..], &[0xC9]);
    }

    #[test]
    fn test_untranslatable_chunk_is_dropped() {
        let charmap = Charmap::Cp437;
        // a partial UTF-8 sequence cannot be encoded
        assert!(charmap.encode(&[0xE2, 0x95]).is_none());
        // neither can characters outside the codepage
        assert!(charmap.encode("\u{1F600}".as_bytes()).is_none());
    }
}
