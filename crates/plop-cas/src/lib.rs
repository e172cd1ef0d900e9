//! plop-cas: content-addressed storage with convergent encryption
//!
//! Stores byte streams in one or more backing object stores. Streams are
//! split into content-defined chunks; every chunk is compressed,
//! encrypted, and stored under an opaque derived name; a binary extent
//! list ties the chunks back together and is itself stored the same way.
//! Its content address, zbase32-encoded, is the stream's key.
//!
//! Identical plaintext under the same passphrase produces identical keys
//! and identical ciphertext, so any number of writers deduplicate against
//! each other without the backend learning anything but sizes.
//!
//! Reads and writes race all configured buckets with staggered starts; a
//! slow or dead bucket costs its configured delay, not a stall.
//!
//! Limitations, at this level: no key rotation, no garbage collection,
//! no deletes — the store is append-only.

mod cache;
mod multiflight;

pub mod extents;
pub mod handle;
pub mod options;
pub mod store;
pub mod writer;

pub use extents::{ExtentList, EXTENT_SIZE};
pub use handle::{Extent, Handle, Reader};
pub use options::StoreBuilder;
pub use store::Store;
pub use writer::Writer;

pub use plop_core::{Error, Result};
pub use plop_storage::{Bucket, S3Config};
