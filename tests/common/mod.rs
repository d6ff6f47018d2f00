#![allow(dead_code)]

/// Wire builders shared by integration tests, benches and the demo

use byteorder::{BigEndian, ByteOrder};

pub const SESSION: &str = "TESTSESS01";

/// Fixed-layout ITCH record under construction
pub struct Rec(Vec<u8>);

impl Rec {
    pub fn new(tag: u8, len: usize, stock_locate: u16, timestamp: u64) -> Self {
        let mut buf = vec![0u8; len];
        buf[0] = tag;
        BigEndian::write_u16(&mut buf[1..3], stock_locate);
        BigEndian::write_u48(&mut buf[5..11], timestamp);
        Rec(buf)
    }

    pub fn tracking(mut self, n: u16) -> Self {
        BigEndian::write_u16(&mut self.0[3..5], n);
        self
    }

    pub fn u8(mut self, off: usize, v: u8) -> Self {
        self.0[off] = v;
        self
    }

    pub fn u16(mut self, off: usize, v: u16) -> Self {
        BigEndian::write_u16(&mut self.0[off..off + 2], v);
        self
    }

    pub fn u32(mut self, off: usize, v: u32) -> Self {
        BigEndian::write_u32(&mut self.0[off..off + 4], v);
        self
    }

    pub fn u64(mut self, off: usize, v: u64) -> Self {
        BigEndian::write_u64(&mut self.0[off..off + 8], v);
        self
    }

    /// Left-justified, space-padded ASCII of `width` bytes
    pub fn alpha(mut self, off: usize, s: &str, width: usize) -> Self {
        let field = &mut self.0[off..off + width];
        field.fill(b' ');
        let n = s.len().min(width);
        field[..n].copy_from_slice(&s.as_bytes()[..n]);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.0
    }
}

pub fn system_event(timestamp: u64, code: u8) -> Vec<u8> {
    Rec::new(b'S', 12, 0, timestamp).u8(11, code).build()
}

pub fn add_order(locate: u16, order_ref: u64, side: u8, shares: u32, symbol: &str, price: u32) -> Vec<u8> {
    Rec::new(b'A', 36, locate, 0)
        .u64(11, order_ref)
        .u8(19, side)
        .u32(20, shares)
        .alpha(24, symbol, 8)
        .u32(32, price)
        .build()
}

pub fn add_order_mpid(locate: u16, order_ref: u64, side: u8, shares: u32, symbol: &str, price: u32, mpid: &str) -> Vec<u8> {
    Rec::new(b'F', 40, locate, 0)
        .u64(11, order_ref)
        .u8(19, side)
        .u32(20, shares)
        .alpha(24, symbol, 8)
        .u32(32, price)
        .alpha(36, mpid, 4)
        .build()
}

pub fn order_executed(locate: u16, order_ref: u64, shares: u32, match_number: u64) -> Vec<u8> {
    Rec::new(b'E', 31, locate, 0)
        .u64(11, order_ref)
        .u32(19, shares)
        .u64(23, match_number)
        .build()
}

pub fn order_executed_with_price(locate: u16, order_ref: u64, shares: u32, match_number: u64, price: u32) -> Vec<u8> {
    Rec::new(b'C', 36, locate, 0)
        .u64(11, order_ref)
        .u32(19, shares)
        .u64(23, match_number)
        .u8(31, b'Y')
        .u32(32, price)
        .build()
}

pub fn order_cancel(locate: u16, order_ref: u64, shares: u32) -> Vec<u8> {
    Rec::new(b'X', 23, locate, 0).u64(11, order_ref).u32(19, shares).build()
}

pub fn order_delete(locate: u16, order_ref: u64) -> Vec<u8> {
    Rec::new(b'D', 19, locate, 0).u64(11, order_ref).build()
}

pub fn order_replace(locate: u16, original_ref: u64, new_ref: u64, shares: u32, price: u32) -> Vec<u8> {
    Rec::new(b'U', 35, locate, 0)
        .u64(11, original_ref)
        .u64(19, new_ref)
        .u32(27, shares)
        .u32(31, price)
        .build()
}

pub fn trade(locate: u16, order_ref: u64, side: u8, shares: u32, symbol: &str, price: u32, match_number: u64) -> Vec<u8> {
    Rec::new(b'P', 44, locate, 0)
        .u64(11, order_ref)
        .u8(19, side)
        .u32(20, shares)
        .alpha(24, symbol, 8)
        .u32(32, price)
        .u64(36, match_number)
        .build()
}

/// Frame of `blocks` starting at `sequence`
pub fn frame(session: &str, sequence: u64, blocks: &[Vec<u8>]) -> Vec<u8> {
    frame_with_count(session, sequence, blocks.len() as u16, blocks)
}

pub fn frame_with_count(session: &str, sequence: u64, count: u16, blocks: &[Vec<u8>]) -> Vec<u8> {
    let mut out = vec![b' '; 10];
    let n = session.len().min(10);
    out[..n].copy_from_slice(&session.as_bytes()[..n]);

    let mut hdr = [0u8; 10];
    BigEndian::write_u64(&mut hdr[..8], sequence);
    BigEndian::write_u16(&mut hdr[8..], count);
    out.extend_from_slice(&hdr);

    for b in blocks {
        let mut len = [0u8; 2];
        BigEndian::write_u16(&mut len, b.len() as u16);
        out.extend_from_slice(&len);
        out.extend_from_slice(b);
    }
    out
}

pub fn heartbeat(session: &str, next_sequence: u64) -> Vec<u8> {
    frame_with_count(session, next_sequence, 0, &[])
}

pub fn end_of_session(session: &str, next_sequence: u64) -> Vec<u8> {
    frame_with_count(session, next_sequence, 0xFFFF, &[])
}
