//! Streaming content-defined chunker.
//!
//! A Rabin rolling hash over a 64-byte window decides chunk boundaries:
//! once at least `min_size` bytes have accumulated, the chunk ends on any
//! byte where the low `avg_bits` bits of the rolling digest are zero, and
//! unconditionally at `max_size`. The hash is parameterized by an
//! irreducible polynomial, so boundary positions are a pure function of
//! (polynomial, bounds, input).
//!
//! The first `min_size - 64` bytes of every chunk are consumed without
//! hashing; a boundary cannot occur there anyway, and skipping them keeps
//! the hot loop short. Consequently `min_size` values below the window
//! size behave as if they were the window size.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::pol::Pol;

/// Width of the rolling-hash window in bytes.
pub const WINDOW_SIZE: usize = 64;

const READ_BUF_SIZE: usize = 64 * 1024;

// Bits above this position index the per-byte reduction table.
const POL_SHIFT: u32 = 45; // polynomial degree 53 - 8

/// Chunk size bounds and the target average (as a power-of-two exponent).
#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    pub min_size: u32,
    pub max_size: u32,
    /// Target average chunk size is `2^avg_bits` bytes.
    pub avg_bits: u32,
}

/// Precomputed per-polynomial lookup tables for the rolling hash.
///
/// Building these costs a few hundred polynomial reductions; derive them
/// once per secret and share via `Arc`.
pub struct Tables {
    /// Contribution of the byte sliding out of the window.
    out: [u64; 256],
    /// Reduction of the digest's top byte after an 8-bit shift.
    mods: [u64; 256],
}

impl Tables {
    pub fn new(pol: Pol) -> Arc<Self> {
        let k = pol.deg() as u32;
        let mut out = [0u64; 256];
        for (b, entry) in out.iter_mut().enumerate() {
            let mut h = append_byte(Pol::from_raw(0), b as u8, pol);
            for _ in 0..WINDOW_SIZE - 1 {
                h = append_byte(h, 0, pol);
            }
            *entry = h.as_raw();
        }
        let mut mods = [0u64; 256];
        for (b, entry) in mods.iter_mut().enumerate() {
            let shifted = (b as u64) << k;
            *entry = Pol::from_raw(shifted).modulo(pol).as_raw() | shifted;
        }
        Arc::new(Self { out, mods })
    }
}

fn append_byte(h: Pol, b: u8, pol: Pol) -> Pol {
    Pol::from_raw((h.as_raw() << 8) | b as u64).modulo(pol)
}

/// Splits a byte stream into content-defined chunks.
pub struct Chunker<R> {
    source: R,
    tables: Arc<Tables>,
    min: usize,
    max: usize,
    split_mask: u64,

    buf: Box<[u8]>,
    buf_pos: usize,
    buf_len: usize,
    eof: bool,

    window: [u8; WINDOW_SIZE],
    wpos: usize,
    digest: u64,
}

impl<R: AsyncRead + Unpin> Chunker<R> {
    pub fn new(source: R, tables: Arc<Tables>, config: ChunkerConfig) -> Self {
        let min = (config.min_size as usize).max(WINDOW_SIZE);
        let max = (config.max_size as usize).max(min);
        Self {
            source,
            tables,
            min,
            max,
            split_mask: (1u64 << config.avg_bits) - 1,
            buf: vec![0u8; READ_BUF_SIZE].into_boxed_slice(),
            buf_pos: 0,
            buf_len: 0,
            eof: false,
            window: [0u8; WINDOW_SIZE],
            wpos: 0,
            digest: 0,
        }
    }

    /// Returns the next chunk, or `None` once the stream is exhausted.
    ///
    /// Every chunk except possibly the last has a length in
    /// `[min_size, max_size]`; the last holds whatever remained at EOF.
    pub async fn next_chunk(&mut self) -> std::io::Result<Option<Vec<u8>>> {
        self.reset_window();
        let mut chunk: Vec<u8> = Vec::with_capacity(self.min.min(READ_BUF_SIZE));
        // Bytes consumed before the rolling hash starts; no boundary can
        // fall inside the minimum size anyway.
        let mut pre = self.min - WINDOW_SIZE;

        loop {
            if self.buf_pos == self.buf_len {
                if self.eof {
                    break;
                }
                self.fill().await?;
                if self.buf_pos == self.buf_len {
                    break;
                }
            }
            let b = self.buf[self.buf_pos];
            self.buf_pos += 1;
            chunk.push(b);
            if pre > 0 {
                pre -= 1;
                continue;
            }
            self.slide(b);
            let len = chunk.len();
            if (len >= self.min && self.digest & self.split_mask == 0) || len >= self.max {
                return Ok(Some(chunk));
            }
        }

        if chunk.is_empty() {
            Ok(None)
        } else {
            Ok(Some(chunk))
        }
    }

    async fn fill(&mut self) -> std::io::Result<()> {
        self.buf_pos = 0;
        self.buf_len = 0;
        let n = self.source.read(&mut self.buf).await?;
        if n == 0 {
            self.eof = true;
        } else {
            self.buf_len = n;
        }
        Ok(())
    }

    fn reset_window(&mut self) {
        self.window = [0u8; WINDOW_SIZE];
        self.wpos = 0;
        self.digest = 0;
        self.slide(1);
    }

    #[inline]
    fn slide(&mut self, b: u8) {
        let out = self.window[self.wpos];
        self.window[self.wpos] = b;
        self.wpos = (self.wpos + 1) % WINDOW_SIZE;
        self.digest ^= self.tables.out[out as usize];

        let index = (self.digest >> POL_SHIFT) as usize;
        self.digest <<= 8;
        self.digest |= b as u64;
        self.digest ^= self.tables.mods[index];
    }
}
