//! The extent list: a stream's binary manifest.
//!
//! Wire format is a sequence of fixed 40-byte records, each
//! `u64 big-endian end offset || 32-byte content address`. Storing end
//! offsets means the first extent implicitly starts at zero and the last
//! record doubles as the stream length. A stream of size zero has no
//! records at all.

use bytes::Bytes;

use plop_core::{ContentAddress, Error, Result, ADDRESS_SIZE};

/// Size of one extent record on the wire.
pub const EXTENT_SIZE: usize = 8 + ADDRESS_SIZE;

/// Decoded extents plaintext above this size is rejected as corrupt.
/// A fixed, documented cap rather than whatever the platform's address
/// space happens to allow.
pub const MAX_EXTENTS_BYTES: usize = 1 << 30;

/// An immutable, validated extent list.
#[derive(Debug, Clone)]
pub struct ExtentList {
    raw: Bytes,
}

impl ExtentList {
    /// Wraps decoded extents-object plaintext. The length must be a whole
    /// number of records and under the size cap, otherwise the manifest
    /// is corrupt.
    pub fn from_bytes(raw: Bytes) -> Result<Self> {
        if raw.len() > MAX_EXTENTS_BYTES || raw.len() % EXTENT_SIZE != 0 {
            return Err(Error::CorruptBlob);
        }
        Ok(Self { raw })
    }

    /// Number of extents.
    pub fn len(&self) -> usize {
        self.raw.len() / EXTENT_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Total stream size: the last record's end offset, 0 with no records.
    pub fn size(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            self.end_offset(self.len() - 1)
        }
    }

    /// End offset of extent `idx`. Caller keeps `idx` in range.
    pub fn end_offset(&self, idx: usize) -> u64 {
        let record = &self.raw[idx * EXTENT_SIZE..(idx + 1) * EXTENT_SIZE];
        u64::from_be_bytes(record[..8].try_into().expect("record has 8 offset bytes"))
    }

    /// Start offset of extent `idx`: the previous extent's end, 0 for the
    /// first.
    pub fn start_offset(&self, idx: usize) -> u64 {
        if idx == 0 {
            0
        } else {
            self.end_offset(idx - 1)
        }
    }

    /// Content address of extent `idx`'s chunk.
    pub fn address(&self, idx: usize) -> ContentAddress {
        let record = &self.raw[idx * EXTENT_SIZE + 8..(idx + 1) * EXTENT_SIZE];
        ContentAddress::from_bytes(record.try_into().expect("record has 32 address bytes"))
    }

    /// Index of the extent containing `offset`: binary search for the
    /// first record whose end offset is strictly greater. `None` when
    /// `offset` is at or past the end of the stream.
    pub fn find(&self, offset: u64) -> Option<usize> {
        let mut lo = 0;
        let mut hi = self.len();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.end_offset(mid) <= offset {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        (lo < self.len()).then_some(lo)
    }
}

/// Accumulates extent records in stream order during a write.
#[derive(Debug, Default)]
pub struct ExtentListBuilder {
    buf: Vec<u8>,
    offset: u64,
}

impl ExtentListBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the record for a chunk of `len` bytes stored at `address`.
    pub fn push(&mut self, len: u64, address: &ContentAddress) {
        debug_assert!(len > 0, "chunks are never empty");
        self.offset += len;
        self.buf.extend_from_slice(&self.offset.to_be_bytes());
        self.buf.extend_from_slice(address.as_bytes());
    }

    /// Number of records so far.
    pub fn len(&self) -> usize {
        self.buf.len() / EXTENT_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Bytes covered so far.
    pub fn size(&self) -> u64 {
        self.offset
    }

    /// The accumulated records: the extents object's plaintext.
    pub fn into_plaintext(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(fill: u8) -> ContentAddress {
        ContentAddress::from_bytes([fill; ADDRESS_SIZE])
    }

    fn two_extent_list() -> ExtentList {
        let mut builder = ExtentListBuilder::new();
        builder.push(100, &addr(1));
        builder.push(30, &addr(2));
        ExtentList::from_bytes(builder.into_plaintext().into()).unwrap()
    }

    #[test]
    fn empty_list() {
        let list = ExtentList::from_bytes(Bytes::new()).unwrap();
        assert!(list.is_empty());
        assert_eq!(list.size(), 0);
        assert_eq!(list.find(0), None);
    }

    #[test]
    fn offsets_and_addresses() {
        let list = two_extent_list();
        assert_eq!(list.len(), 2);
        assert_eq!(list.size(), 130);
        assert_eq!(list.start_offset(0), 0);
        assert_eq!(list.end_offset(0), 100);
        assert_eq!(list.start_offset(1), 100);
        assert_eq!(list.end_offset(1), 130);
        assert_eq!(list.address(0), addr(1));
        assert_eq!(list.address(1), addr(2));
    }

    #[test]
    fn find_locates_containing_extent() {
        let list = two_extent_list();
        assert_eq!(list.find(0), Some(0));
        assert_eq!(list.find(99), Some(0));
        assert_eq!(list.find(100), Some(1));
        assert_eq!(list.find(129), Some(1));
        assert_eq!(list.find(130), None);
        assert_eq!(list.find(u64::MAX), None);
    }

    #[test]
    fn ragged_length_is_corrupt() {
        let raw = Bytes::from(vec![0u8; EXTENT_SIZE + 1]);
        assert!(matches!(
            ExtentList::from_bytes(raw),
            Err(Error::CorruptBlob)
        ));
    }

    #[test]
    fn builder_tracks_cumulative_offsets() {
        let mut builder = ExtentListBuilder::new();
        assert!(builder.is_empty());
        builder.push(1, &addr(9));
        assert_eq!(builder.len(), 1);
        assert_eq!(builder.size(), 1);
        let plaintext = builder.into_plaintext();
        assert_eq!(plaintext.len(), EXTENT_SIZE);
        assert_eq!(&plaintext[..8], &1u64.to_be_bytes());
    }
}
