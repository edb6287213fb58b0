// SPDX-FileCopyrightText: 2026 Ragline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Frame decoder for the chat service's streamed responses.
//!
//! The service streams newline-delimited `data: ` lines rather than full
//! SSE events (there are no `event:` names and no blank-line separators),
//! so this is a hand-rolled line decoder instead of an SSE crate: an SSE
//! parser would buffer until a blank line and never emit incremental
//! frames for this wire format.
//!
//! The decoder is pure and synchronous: callers feed it byte chunks as
//! they arrive and collect the frames each chunk completes. Bytes after
//! the last newline stay buffered until the terminating newline arrives,
//! which also keeps multi-byte UTF-8 sequences split across chunk
//! boundaries intact.

/// Prefix marking a payload-bearing line.
const DATA_PREFIX: &str = "data: ";

/// Terminal marker: the response is complete.
const DONE_MARKER: &str = "[DONE]";

/// Error marker used by edit streams; the remainder is the message.
const ERROR_MARKER: &str = "[ERROR]";

/// A decoded frame from the response stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A chunk of response text, exactly as sent (no trimming).
    Data(String),
    /// The stream completed normally.
    Done,
    /// The service reported a failure mid-stream.
    Error(String),
}

/// Incremental decoder over the byte stream.
///
/// After a [`Frame::Done`] or [`Frame::Error`] the decoder latches: later
/// input is dropped without decoding.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
    finished: bool,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk of bytes, returning the frames it completed.
    ///
    /// Only lines terminated by `\n` are decoded; a trailing fragment is
    /// carried over to the next call. At end of input an unterminated
    /// fragment is never decoded (see [`FrameDecoder::has_partial`]).
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Frame> {
        let mut frames = Vec::new();
        if self.finished {
            return frames;
        }
        self.buf.extend_from_slice(chunk);

        let mut consumed = 0;
        while let Some(rel) = self.buf[consumed..].iter().position(|&b| b == b'\n') {
            let line_end = consumed + rel;
            let line = &self.buf[consumed..line_end];
            let frame = decode_line(line);
            consumed = line_end + 1;

            if let Some(frame) = frame {
                let terminal = !matches!(frame, Frame::Data(_));
                frames.push(frame);
                if terminal {
                    self.finished = true;
                    break;
                }
            }
        }

        if self.finished {
            self.buf.clear();
        } else {
            self.buf.drain(..consumed);
        }
        frames
    }

    /// True when undecoded bytes remain buffered (an unterminated line).
    pub fn has_partial(&self) -> bool {
        !self.finished && !self.buf.is_empty()
    }

    /// True once a terminal frame has been decoded.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

/// Decodes one complete line (without its `\n`). Returns `None` for lines
/// that carry no frame: missing `data: ` prefix, or blank payload.
fn decode_line(raw: &[u8]) -> Option<Frame> {
    // Tolerate CRLF line endings; the `\r` belongs to the terminator.
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    let line = String::from_utf8_lossy(raw);
    let payload = line.strip_prefix(DATA_PREFIX)?;

    if payload == DONE_MARKER {
        return Some(Frame::Done);
    }
    if let Some(rest) = payload.strip_prefix(ERROR_MARKER) {
        let message = rest.trim_start();
        return Some(Frame::Error(if message.is_empty() {
            "unknown stream error".to_string()
        } else {
            message.to_string()
        }));
    }
    if payload.trim().is_empty() {
        return None;
    }
    Some(Frame::Data(payload.to_string()))
}
