//! `Content-Length` framing over a byte stream.
//!
//! Decoding is incremental: feed chunks as they arrive, pull complete bodies
//! out. Chunk boundaries can fall anywhere, inside a header or a body.

use tracing::warn;

/// A declared length above this is treated as a malformed header, so a
/// corrupt length cannot force an unbounded allocation.
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Incremental decoder for `Content-Length` framed messages.
#[derive(Debug, Default)]
pub struct FrameCodec {
    buf: Vec<u8>,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk of raw input.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Extract the next complete body, if one has fully arrived.
    ///
    /// A header with no parsable length (or one over [`MAX_FRAME_BYTES`]) is
    /// discarded through its separator and scanning continues: lossy
    /// recovery, logged here but invisible to the peer.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        loop {
            let (header_end, body_start) = find_separator(&self.buf)?;
            match parse_content_length(&self.buf[..header_end]) {
                Some(len) if len <= MAX_FRAME_BYTES => {
                    if self.buf.len() < body_start + len {
                        // Body still in flight.
                        return None;
                    }
                    let body = self.buf[body_start..body_start + len].to_vec();
                    self.buf.drain(..body_start + len);
                    return Some(body);
                }
                Some(len) => {
                    warn!(
                        declared = len,
                        max = MAX_FRAME_BYTES,
                        "oversized frame declared, resynchronizing"
                    );
                    self.buf.drain(..body_start);
                }
                None => {
                    warn!(
                        header = %String::from_utf8_lossy(&self.buf[..header_end]),
                        "malformed frame header, resynchronizing"
                    );
                    self.buf.drain(..body_start);
                }
            }
        }
    }
}

/// Frame a body for the wire.
pub fn encode_frame(body: &[u8]) -> Vec<u8> {
    let header = format!("Content-Length: {}\r\n\r\n", body.len());
    let mut frame = Vec::with_capacity(header.len() + body.len());
    frame.extend_from_slice(header.as_bytes());
    frame.extend_from_slice(body);
    frame
}

/// Locate the earliest header/body separator. `\r\n\r\n` is the wire format;
/// bare `\n\n` is tolerated for sloppy peers. Returns (header_end, body_start).
fn find_separator(buf: &[u8]) -> Option<(usize, usize)> {
    let crlf = buf.windows(4).position(|w| w == b"\r\n\r\n");
    let lf = buf.windows(2).position(|w| w == b"\n\n");
    match (crlf, lf) {
        (Some(c), Some(l)) if l < c => Some((l, l + 2)),
        (Some(c), _) => Some((c, c + 4)),
        (None, Some(l)) => Some((l, l + 2)),
        (None, None) => None,
    }
}

/// Pull the declared length out of a header block, case-insensitively.
fn parse_content_length(header: &[u8]) -> Option<usize> {
    let text = std::str::from_utf8(header).ok()?;
    for line in text.split('\n') {
        let line = line.trim_end_matches('\r');
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                return value.trim().parse::<usize>().ok();
            }
        }
    }
    None
}
