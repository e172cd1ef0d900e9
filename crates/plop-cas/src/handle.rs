//! Open streams: random-access and sequential reads over an extent list.

use bytes::Bytes;

use plop_core::{Error, Result};

use crate::extents::ExtentList;
use crate::store::Store;

/// An open stream: an immutable extent list plus the store to fetch its
/// chunks through. Cheap to clone and share across tasks.
#[derive(Clone)]
pub struct Handle {
    store: Store,
    extents: ExtentList,
}

impl Handle {
    pub(crate) fn new(store: Store, extents: ExtentList) -> Self {
        Self { store, extents }
    }

    /// Stream length in bytes.
    pub fn size(&self) -> u64 {
        self.extents.size()
    }

    /// A reader with its own cursor, starting at offset zero. Create one
    /// per sequential consumer; the handle itself stays shareable.
    pub fn reader(&self) -> Reader {
        Reader {
            handle: self.clone(),
            offset: 0,
        }
    }

    /// Reads into `buf` starting at `offset`, returning how many bytes
    /// were copied. A short count only happens at end of stream; `Ok(0)`
    /// means `offset` was at or past EOF. Safe to call concurrently with
    /// distinct buffers.
    pub async fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        let Some(mut idx) = self.extents.find(offset) else {
            return Ok(0);
        };
        let mut in_off = (offset - self.extents.start_offset(idx)) as usize;
        let mut copied = 0;
        while copied < buf.len() {
            let chunk = self
                .store
                .load_chunk_cached(&self.extents.address(idx))
                .await?;
            if chunk.len() <= in_off {
                // chunk is shorter than its extent record claims
                return Err(Error::CorruptBlob);
            }
            let n = (buf.len() - copied).min(chunk.len() - in_off);
            buf[copied..copied + n].copy_from_slice(&chunk[in_off..in_off + n]);
            copied += n;
            in_off = 0;
            idx += 1;
            if idx == self.extents.len() {
                break;
            }
        }
        Ok(copied)
    }

    /// The extent containing `offset`, or `None` at or past EOF. Note the
    /// extent's start is usually before the requested offset.
    pub fn extent_at(&self, offset: u64) -> Option<Extent<'_>> {
        let idx = self.extents.find(offset)?;
        Some(Extent { handle: self, idx })
    }
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("size", &self.size())
            .field("extents", &self.extents.len())
            .finish()
    }
}

/// Sequential reader over a handle. The cursor is single-owner: clone the
/// handle and make another reader instead of sharing one.
pub struct Reader {
    handle: Handle,
    offset: u64,
}

impl Reader {
    /// Reads at the cursor and advances it. `Ok(0)` is end of stream.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self.handle.read_at(buf, self.offset).await?;
        self.offset += n as u64;
        Ok(n)
    }

    /// Reads from the cursor to end of stream.
    pub async fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let remaining = self.handle.size().saturating_sub(self.offset);
        let mut out = vec![0u8; remaining as usize];
        let mut filled = 0;
        while filled < out.len() {
            let n = self.handle.read_at(&mut out[filled..], self.offset).await?;
            if n == 0 {
                break;
            }
            filled += n;
            self.offset += n as u64;
        }
        out.truncate(filled);
        Ok(out)
    }
}

/// A view of one extent record of an open stream.
pub struct Extent<'a> {
    handle: &'a Handle,
    idx: usize,
}

impl Extent<'_> {
    /// The chunk's content address, zbase32-encoded.
    pub fn key(&self) -> String {
        self.handle.extents.address(self.idx).to_string()
    }

    /// Offset of the first byte covered by this extent.
    pub fn start(&self) -> u64 {
        self.handle.extents.start_offset(self.idx)
    }

    /// Offset one past the last byte covered by this extent.
    pub fn end(&self) -> u64 {
        self.handle.extents.end_offset(self.idx)
    }

    /// The chunk's plaintext, fetched through the chunk cache.
    pub async fn bytes(&self) -> Result<Bytes> {
        self.handle
            .store
            .load_chunk_cached(&self.handle.extents.address(self.idx))
            .await
    }

    /// The following extent, if any.
    pub fn next(&self) -> Option<Extent<'_>> {
        let idx = self.idx + 1;
        (idx < self.handle.extents.len()).then_some(Extent {
            handle: self.handle,
            idx,
        })
    }
}
