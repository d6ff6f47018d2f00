/// MoldUDP64-style frame unwrapping
///
/// Frame header: 20 bytes
///   - session: [u8; 10] ASCII, right-padded
///   - sequence: u64 big-endian, sequence of the first contained message
///   - count: u16 big-endian (0 = heartbeat, 0xFFFF = end of session)
///
/// Followed by `count` blocks of [length: u16 big-endian][payload].
/// A frame is validated in full before any block is handed out, so a
/// malformed frame is rejected with no partial processing.

use byteorder::{BigEndian, ByteOrder};
use std::fmt;
use thiserror::Error;

pub const SESSION_LEN: usize = 10;
pub const FRAME_HEADER_SIZE: usize = SESSION_LEN + 8 + 2;
pub const HEARTBEAT_COUNT: u16 = 0;
pub const END_OF_SESSION_COUNT: u16 = 0xFFFF;

/// Default sanity bound on messages per frame
pub const MAX_MESSAGES_PER_FRAME: u16 = 100;
/// Largest accepted block; ITCH records are all under 64 bytes
pub const MAX_BLOCK_LEN: u16 = 256;

const _: () = assert!(FRAME_HEADER_SIZE == 20);

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame too short: need {need} bytes, have {have}")]
    TooShort { need: usize, have: usize },

    #[error("message count {count} exceeds limit {limit}")]
    ExcessiveCount { count: u16, limit: u16 },

    #[error("block {index} has invalid length {length}")]
    InvalidBlockLength { index: u16, length: u16 },

    #[error("frame truncated in block {index}: need {need} bytes, have {have}")]
    Truncated { index: u16, need: usize, have: usize },

    #[error("{extra} trailing bytes after last block")]
    TrailingBytes { extra: usize },
}

pub type FrameResult<T> = Result<T, FrameError>;

/// Session identifier. Compared with trailing spaces/NULs removed;
/// interior characters are significant.
#[derive(Clone, Copy, Default)]
pub struct SessionId([u8; SESSION_LEN]);

impl SessionId {
    pub fn from_wire(src: &[u8; SESSION_LEN]) -> Self {
        SessionId(*src)
    }

    pub fn new(s: &str) -> Self {
        let mut raw = [b' '; SESSION_LEN];
        let n = s.len().min(SESSION_LEN);
        raw[..n].copy_from_slice(&s.as_bytes()[..n]);
        SessionId(raw)
    }

    pub fn raw(&self) -> &[u8; SESSION_LEN] {
        &self.0
    }

    pub fn trimmed(&self) -> &[u8] {
        let mut len = SESSION_LEN;
        while len > 0 && matches!(self.0[len - 1], b' ' | 0) {
            len -= 1;
        }
        &self.0[..len]
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(self.trimmed()).unwrap_or("")
    }
}

impl PartialEq for SessionId {
    fn eq(&self, other: &Self) -> bool {
        self.trimmed() == other.trimmed()
    }
}

impl Eq for SessionId {}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({:?})", self.as_str())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub session: SessionId,
    pub sequence: u64,
    pub message_count: u16,
}

impl FrameHeader {
    pub fn parse(buf: &[u8]) -> FrameResult<Self> {
        if buf.len() < FRAME_HEADER_SIZE {
            return Err(FrameError::TooShort {
                need: FRAME_HEADER_SIZE,
                have: buf.len(),
            });
        }

        let mut session = [0u8; SESSION_LEN];
        session.copy_from_slice(&buf[..SESSION_LEN]);

        Ok(FrameHeader {
            session: SessionId(session),
            sequence: BigEndian::read_u64(&buf[SESSION_LEN..SESSION_LEN + 8]),
            message_count: BigEndian::read_u16(&buf[SESSION_LEN + 8..FRAME_HEADER_SIZE]),
        })
    }

    pub fn is_heartbeat(&self) -> bool {
        self.message_count == HEARTBEAT_COUNT
    }

    pub fn is_end_of_session(&self) -> bool {
        self.message_count == END_OF_SESSION_COUNT
    }

    pub fn carries_data(&self) -> bool {
        !(self.is_heartbeat() || self.is_end_of_session())
    }

    /// Messages actually carried; heartbeat and end-of-session carry none
    pub fn block_count(&self) -> u16 {
        if self.carries_data() {
            self.message_count
        } else {
            0
        }
    }

    /// For heartbeats and end-of-session this is the next sequence the sender will use
    pub fn first_sequence(&self) -> u64 {
        self.sequence
    }

    pub fn last_sequence(&self) -> u64 {
        if self.carries_data() {
            self.sequence.wrapping_add(self.message_count as u64 - 1)
        } else {
            self.sequence
        }
    }

    /// Sequence immediately after this frame's last message
    pub fn next_sequence(&self) -> u64 {
        self.sequence.wrapping_add(self.block_count() as u64)
    }
}

/// One message payload, borrowed from the received packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageBlock<'a> {
    pub sequence: u64,
    pub data: &'a [u8],
}

/// A validated frame borrowing the caller's receive buffer
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    header: FrameHeader,
    body: &'a [u8],
}

impl<'a> Frame<'a> {
    pub fn parse(buf: &'a [u8]) -> FrameResult<Self> {
        Self::parse_with_limit(buf, MAX_MESSAGES_PER_FRAME)
    }

    pub fn parse_with_limit(buf: &'a [u8], max_messages: u16) -> FrameResult<Self> {
        let header = FrameHeader::parse(buf)?;
        let body = &buf[FRAME_HEADER_SIZE..];

        if header.carries_data() && header.message_count > max_messages {
            return Err(FrameError::ExcessiveCount {
                count: header.message_count,
                limit: max_messages,
            });
        }

        let count = header.block_count();
        // Cheapest inconsistency first: every block needs at least its prefix
        // plus one byte of payload.
        if body.len() < count as usize * 3 {
            return Err(FrameError::Truncated {
                index: 0,
                need: FRAME_HEADER_SIZE + count as usize * 3,
                have: buf.len(),
            });
        }

        let mut offset = 0usize;
        for index in 0..count {
            if offset + 2 > body.len() {
                return Err(FrameError::Truncated {
                    index,
                    need: FRAME_HEADER_SIZE + offset + 2,
                    have: buf.len(),
                });
            }
            let length = BigEndian::read_u16(&body[offset..offset + 2]);
            if length == 0 || length > MAX_BLOCK_LEN {
                return Err(FrameError::InvalidBlockLength { index, length });
            }
            offset += 2;

            let end = offset + length as usize;
            if end > body.len() {
                return Err(FrameError::Truncated {
                    index,
                    need: FRAME_HEADER_SIZE + end,
                    have: buf.len(),
                });
            }
            offset = end;
        }

        if offset != body.len() {
            return Err(FrameError::TrailingBytes {
                extra: body.len() - offset,
            });
        }

        Ok(Frame { header, body })
    }

    pub fn header(&self) -> &FrameHeader {
        &self.header
    }

    pub fn is_heartbeat(&self) -> bool {
        self.header.is_heartbeat()
    }

    pub fn is_end_of_session(&self) -> bool {
        self.header.is_end_of_session()
    }

    pub fn len(&self) -> usize {
        self.header.block_count() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate blocks in wire order; block i carries sequence `base + i`
    pub fn blocks(&self) -> Blocks<'a> {
        Blocks {
            body: self.body,
            offset: 0,
            next_sequence: self.header.sequence,
            remaining: self.header.block_count(),
        }
    }
}

pub struct Blocks<'a> {
    body: &'a [u8],
    offset: usize,
    next_sequence: u64,
    remaining: u16,
}

impl<'a> Iterator for Blocks<'a> {
    type Item = MessageBlock<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        // Bounds were established by Frame::parse_with_limit
        let length = BigEndian::read_u16(&self.body[self.offset..self.offset + 2]) as usize;
        let start = self.offset + 2;
        let data = &self.body[start..start + length];

        let block = MessageBlock {
            sequence: self.next_sequence,
            data,
        };
        self.offset = start + length;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        self.remaining -= 1;
        Some(block)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining as usize, Some(self.remaining as usize))
    }
}

impl ExactSizeIterator for Blocks<'_> {}
