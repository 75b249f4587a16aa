//! RDM6300 125 kHz RFID reader.
//!
//! The module streams one ASCII frame per read cycle (~65 ms) while a tag
//! is in the field:
//!
//! ```text
//!  0x02 | 10 hex chars (5 data bytes) | 2 hex chars (checksum) | 0x03
//! ```
//!
//! The checksum is the XOR of the five data bytes.  The first data byte is
//! a version/customer byte; the tag id is the remaining four, big-endian.

use crate::app::ports::RfidReader;
use crate::timing::{Micros, elapsed_us};

const STX: u8 = 0x02;
const ETX: u8 = 0x03;
pub const FRAME_LEN: usize = 14;

/// A tag stays present this long after its last frame.
pub const TAG_HOLD_US: u32 = 300_000;

/// Non-blocking byte source (the UART RX FIFO on hardware).
pub trait ByteSource {
    /// Copy available bytes into `buf`, returning how many.  Never waits.
    fn read_available(&mut self, buf: &mut [u8]) -> usize;
}

/// Incremental frame decoder.  Resynchronizes on every STX.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: [u8; FRAME_LEN],
    len: usize,
}

impl FrameDecoder {
    pub const fn new() -> Self {
        Self {
            buf: [0; FRAME_LEN],
            len: 0,
        }
    }

    /// Feed one byte.  Returns the tag id when a valid frame completes.
    pub fn feed(&mut self, byte: u8) -> Option<u32> {
        if byte == STX {
            self.buf[0] = STX;
            self.len = 1;
            return None;
        }
        if self.len == 0 {
            return None;
        }
        self.buf[self.len] = byte;
        self.len += 1;
        if self.len < FRAME_LEN {
            return None;
        }
        self.len = 0;
        Self::parse(&self.buf)
    }

    fn parse(frame: &[u8; FRAME_LEN]) -> Option<u32> {
        if frame[FRAME_LEN - 1] != ETX {
            return None;
        }
        let mut bytes = [0u8; 6];
        for (i, pair) in frame[1..FRAME_LEN - 1].chunks_exact(2).enumerate() {
            bytes[i] = (hex_value(pair[0])? << 4) | hex_value(pair[1])?;
        }
        let checksum = bytes[..5].iter().fold(0u8, |acc, b| acc ^ b);
        if checksum != bytes[5] {
            return None;
        }
        Some(u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]))
    }
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'A'..=b'F' => Some(c - b'A' + 10),
        b'a'..=b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}

/// RDM6300 over any [`ByteSource`].
pub struct Rdm6300<S> {
    source: S,
    decoder: FrameDecoder,
    current: Option<u32>,
    last_seen_us: Micros,
}

impl<S: ByteSource> Rdm6300<S> {
    pub const fn new(source: S) -> Self {
        Self {
            source,
            decoder: FrameDecoder::new(),
            current: None,
            last_seen_us: 0,
        }
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}

impl<S: ByteSource> RfidReader for Rdm6300<S> {
    fn poll_new_tag(&mut self, now_us: Micros) -> Option<u32> {
        let mut buf = [0u8; 32];
        let n = self.source.read_available(&mut buf).min(buf.len());
        let mut fresh = None;
        for &byte in &buf[..n] {
            if let Some(tag) = self.decoder.feed(byte) {
                if self.current_tag(now_us) != Some(tag) {
                    fresh = Some(tag);
                }
                self.current = Some(tag);
                self.last_seen_us = now_us;
            }
        }
        fresh
    }

    fn current_tag(&self, now_us: Micros) -> Option<u32> {
        self.current
            .filter(|_| elapsed_us(self.last_seen_us, now_us) < TAG_HOLD_US)
    }
}

#[cfg(target_os = "espidf")]
impl ByteSource for esp_idf_hal::uart::UartRxDriver<'_> {
    fn read_available(&mut self, buf: &mut [u8]) -> usize {
        self.read(buf, 0).unwrap_or(0)
    }
}
