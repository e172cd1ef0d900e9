//! The store façade: chunk, seal, and race uploads on the way in;
//! locate, fetch, and open objects on the way out.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use secrecy::SecretString;
use tokio::io::AsyncRead;
use tracing::debug;

use plop_chunks::{Chunker, ChunkerConfig, Tables};
use plop_core::{ContentAddress, Error, Result};
use plop_crypto::{derive_secrets, open_object, seal_object, DomainPrefix, KeySet};

use crate::cache::SegmentedLru;
use crate::extents::{ExtentList, ExtentListBuilder};
use crate::handle::Handle;
use crate::multiflight::Multiflight;
use crate::options::{StoreBuilder, StoreConfig};
use crate::writer::Writer;

/// Cached entries are whole decoded chunks, typically several MiB, so a
/// few tens of entries is plenty: all the cache has to absorb is
/// smaller-than-extent reads for a couple of streams at a time.
const CHUNK_CACHE_ENTRIES: usize = 40;

pub(crate) struct StoreInner {
    config: StoreConfig,
    keys: KeySet,
    chunker_tables: Arc<Tables>,
    cache: Mutex<SegmentedLru>,
}

/// A content-addressed, convergently encrypted blob store over one or
/// more backend buckets.
///
/// Cheap to clone; clones share the derived secrets, the buckets, and
/// the chunk cache. Immutable after construction, so no locking beyond
/// the cache's own mutex.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Starts building a store for one sharing passphrase.
    pub fn builder(passphrase: impl Into<SecretString>) -> StoreBuilder {
        StoreBuilder::new(passphrase.into())
    }

    pub(crate) fn new(passphrase: &SecretString, config: StoreConfig) -> Result<Self> {
        let secrets = derive_secrets(passphrase)?;
        Ok(Self {
            inner: Arc::new(StoreInner {
                config,
                keys: secrets.keys,
                // Same passphrase, same polynomial, same chunk boundaries:
                // without that, users sharing a secret would not dedup.
                chunker_tables: Tables::new(secrets.polynomial),
                cache: Mutex::new(SegmentedLru::new(CHUNK_CACHE_ENTRIES)),
            }),
        })
    }

    /// Stores a byte stream and returns its key.
    ///
    /// The stream is chunked at content-defined boundaries; every chunk
    /// is sealed and uploaded, its extent recorded in stream order; at
    /// EOF the extent list itself is sealed and uploaded, and its
    /// address — zbase32-encoded — is the key.
    ///
    /// On error nothing is rolled back: already-uploaded chunks are
    /// content-addressed, unreferenced, and harmless.
    pub async fn create<R: AsyncRead + Unpin>(&self, reader: R) -> Result<String> {
        let config = ChunkerConfig {
            min_size: self.inner.config.chunk_min,
            max_size: self.inner.config.chunk_max,
            avg_bits: self.inner.config.chunk_avg_bits,
        };
        let mut chunker = Chunker::new(reader, self.inner.chunker_tables.clone(), config);
        let mut extents = ExtentListBuilder::new();
        while let Some(chunk) = chunker.next_chunk().await? {
            let len = chunk.len() as u64;
            let address = self.save_object(DomainPrefix::Blob, &chunk).await?;
            extents.push(len, &address);
        }
        debug!(chunks = extents.len(), bytes = extents.size(), "stream chunked");

        let plaintext = extents.into_plaintext();
        let address = self.save_object(DomainPrefix::Extents, &plaintext).await?;
        Ok(address.to_string())
    }

    /// Returns a push-style [`Writer`] feeding the same pipeline as
    /// [`create`](Store::create).
    pub fn writer(&self) -> Writer {
        Writer::new(self.clone())
    }

    /// Opens a stream by its key.
    ///
    /// A malformed key is [`Error::BadKey`]; a key whose extents object
    /// is in no configured bucket is [`Error::NotExist`]; an extents
    /// object that decrypts but does not parse is [`Error::CorruptBlob`].
    pub async fn open(&self, key: &str) -> Result<Handle> {
        let address: ContentAddress = key.parse()?;
        let plaintext = self.load_object(DomainPrefix::Extents, &address).await?;
        let extents = ExtentList::from_bytes(plaintext.into())?;
        Ok(Handle::new(self.clone(), extents))
    }

    /// Seals an object and races its upload to every bucket. Convergent
    /// ciphertext makes concurrent winners harmless: whoever loses the
    /// race finds the same bytes already there.
    pub(crate) async fn save_object(
        &self,
        prefix: DomainPrefix,
        plaintext: &[u8],
    ) -> Result<ContentAddress> {
        let sealed = seal_object(&self.inner.keys, prefix, plaintext)?;
        let mut flight = Multiflight::new();
        for bucket in &self.inner.config.buckets {
            let bucket = bucket.clone();
            let name = sealed.name;
            let data = sealed.ciphertext.clone();
            flight.add(
                bucket.delay(),
                Box::pin(async move { bucket.put(&name, data).await }),
            );
        }
        flight.run().await?;
        debug!(name = %sealed.name, len = sealed.ciphertext.len(), "object stored");
        Ok(sealed.address)
    }

    /// Races a fetch of one object across every bucket and opens it.
    /// An error composed solely of not-found alternatives becomes
    /// [`Error::NotExist`]; anything else is surfaced as-is.
    pub(crate) async fn load_object(
        &self,
        prefix: DomainPrefix,
        address: &ContentAddress,
    ) -> Result<Vec<u8>> {
        let name = self.inner.keys.boxed_name(address);
        let mut flight = Multiflight::new();
        for bucket in &self.inner.config.buckets {
            let bucket = bucket.clone();
            flight.add(
                bucket.delay(),
                Box::pin(async move { bucket.get(&name).await }),
            );
        }
        let ciphertext = flight.run().await.map_err(Error::into_not_exist)?;
        open_object(&self.inner.keys, prefix, address, &ciphertext)
    }

    /// Chunk fetch for the read path, through the chunk cache. The cache
    /// only buys throughput; a cold read takes the same path minus the
    /// lookup.
    pub(crate) async fn load_chunk_cached(&self, address: &ContentAddress) -> Result<Bytes> {
        if let Some(hit) = self.cache_lock().get(address) {
            return Ok(hit);
        }
        let plaintext = Bytes::from(self.load_object(DomainPrefix::Blob, address).await?);
        self.cache_lock().insert(*address, plaintext.clone());
        Ok(plaintext)
    }

    fn cache_lock(&self) -> std::sync::MutexGuard<'_, SegmentedLru> {
        self.inner.cache.lock().expect("chunk cache mutex poisoned")
    }
}
