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

//! Line-oriented command dialogs
//!
//! A [`Dialog`] turns a raw byte stream into a sequence of line commands.
//! The basic flavor splits on newlines and is primarily intended for tests
//! and pipes; the line-editor flavor echoes input back and honors in-band
//! editing, which is what an interactive terminal expects.

use crate::{MenuError, Result};
use async_trait::async_trait;
use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Read chunk size for dialog input.
const DIALOG_READ_CHUNK: usize = 32;

/// ASCII DEL, deletes the previous byte in the editor flavor.
const DEL: u8 = 0x7F;

/// Backspace plus ANSI erase-to-end-of-line, nudges the terminal to redraw
/// after a deletion.
pub(crate) const ERASE_TO_EOL: [u8; 4] = [0x08, 0x1B, b'[', b'K'];

/// Which dialog flavor to instantiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DialogKind {
    /// Newline-delimited commands, no echo, no editing
    #[default]
    Basic,
    /// Local echo with backspace editing and terminal erase sequences
    LineEditor,
}

/// A line-oriented command reader over a raw byte stream.
///
/// `get_command` never returns a string containing a newline; `left` may
/// contain partial next-command bytes for the caller to push back into the
/// stream after the dialog closes.
#[async_trait]
pub trait Dialog: Send {
    /// Read the next command line.
    async fn get_command(&mut self) -> Result<String>;

    /// Unconsumed bytes past the most recent command.
    fn left(&mut self) -> Bytes;

    /// Close the dialog's stream halves.
    async fn close(&mut self) -> Result<()>;
}

/// Construct the dialog flavor selected by `kind` over the given stream pair.
pub fn instantiate<R, W>(kind: DialogKind, writer: W, reader: R) -> Box<dyn Dialog>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    match kind {
        DialogKind::Basic => Box::new(BasicDialog::new(writer, reader)),
        DialogKind::LineEditor => Box::new(LineEditorDialog::new(writer, reader)),
    }
}

/// One command per newline, accumulated across arbitrarily fragmented reads.
pub struct BasicDialog<R, W> {
    writer: W,
    reader: R,
    temp: BytesMut,
}

impl<R, W> BasicDialog<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W, reader: R) -> Self {
        Self {
            writer,
            reader,
            temp: BytesMut::new(),
        }
    }
}

#[async_trait]
impl<R, W> Dialog for BasicDialog<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn get_command(&mut self) -> Result<String> {
        loop {
            // carry-over first: the previous read may already hold a command
            if let Some(i) = self.temp.iter().position(|&b| b == b'\n') {
                let line = self.temp.split_to(i);
                self.temp.advance(1);
                return Ok(String::from_utf8_lossy(&line).trim_end().to_string());
            }

            let mut buf = [0u8; DIALOG_READ_CHUNK];
            let n = self.reader.read(&mut buf).await?;
            if n == 0 {
                return Err(MenuError::ChannelClosed);
            }
            self.temp.extend_from_slice(&buf[..n]);
        }
    }

    fn left(&mut self) -> Bytes {
        self.temp.split().freeze()
    }

    async fn close(&mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }
}

/// Line editor flavor: echoes bytes back to the writer, deletes on DEL with
/// a terminal redraw nudge, and terminates a command on CR or LF.
pub struct LineEditorDialog<R, W> {
    writer: W,
    reader: R,
    temp: BytesMut,
}

impl<R, W> LineEditorDialog<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W, reader: R) -> Self {
        Self {
            writer,
            reader,
            temp: BytesMut::new(),
        }
    }
}

#[async_trait]
impl<R, W> Dialog for LineEditorDialog<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn get_command(&mut self) -> Result<String> {
        let mut line: Vec<u8> = Vec::new();

        loop {
            while self.temp.has_remaining() {
                let byte = self.temp.get_u8();
                match byte {
                    DEL => {
                        if line.pop().is_some() {
                            self.writer.write_all(&ERASE_TO_EOL).await?;
                        }
                    }
                    b'\r' | b'\n' => {
                        // swallow the LF of a CRLF pair
                        if byte == b'\r' && self.temp.first() == Some(&b'\n') {
                            self.temp.advance(1);
                        }
                        self.writer.write_all(b"\r\n").await?;
                        return Ok(String::from_utf8_lossy(&line).trim_end().to_string());
                    }
                    byte => {
                        line.push(byte);
                        if byte >= 0x20 {
                            self.writer.write_all(&[byte]).await?;
                        }
                    }
                }
            }

            let mut buf = [0u8; DIALOG_READ_CHUNK];
            let n = self.reader.read(&mut buf).await?;
            if n == 0 {
                return Err(MenuError::ChannelClosed);
            }
            self.temp.extend_from_slice(&buf[..n]);
        }
    }

    fn left(&mut self) -> Bytes {
        self.temp.split().freeze()
    }

    async fn close(&mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }
}
