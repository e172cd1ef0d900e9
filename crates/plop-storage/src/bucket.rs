//! One backend alternative: an OpenDAL operator plus its racing delay
//! and an optional name-sharding layout.

use std::time::Duration;

use bytes::Bytes;
use opendal::{ErrorKind, Operator};
use tracing::debug;

use plop_core::{BoxedName, Error, Result};

use crate::{CACHE_CONTROL, CONTENT_TYPE_V1};

/// Object bodies at or below this size are not worth a separate request
/// to avoid re-transferring.
const PREFLIGHT_SIZE: usize = 1024 * 1024;

/// S3-compatible backend settings.
///
/// Uses path-style addressing (the OpenDAL default), which is what
/// MinIO, SeaweedFS, and most self-hosted S3 endpoints require.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

/// An object-store backend the store races reads and writes against.
#[derive(Clone)]
pub struct Bucket {
    op: Operator,
    delay: Duration,
    shard_chars: usize,
}

impl Bucket {
    /// Wrap an existing operator with no delay and flat name layout.
    pub fn new(op: Operator) -> Self {
        Self {
            op,
            delay: Duration::ZERO,
            shard_chars: 0,
        }
    }

    /// Sets how long the multiflight coordinator waits before trying this
    /// bucket, when an earlier alternative is still in flight.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Shards object names under a directory level covering the first
    /// `bits` bits of the name (one zbase32 character per 5 bits). Purely
    /// a backend layout choice; names themselves are unchanged.
    pub fn with_shard_bits(mut self, bits: u32) -> Self {
        self.shard_chars = (bits as usize).div_ceil(5);
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// In-memory bucket; used by tests and as the simplest backend.
    pub fn memory() -> Result<Self> {
        let op = Operator::new(opendal::services::Memory::default())?.finish();
        Ok(Self::new(op))
    }

    /// Bucket rooted at a local filesystem directory.
    pub fn fs(root: &str) -> Result<Self> {
        let op = Operator::new(opendal::services::Fs::default().root(root))?
            .layer(opendal::layers::LoggingLayer::default())
            .finish();
        Ok(Self::new(op))
    }

    /// S3-compatible bucket.
    pub fn s3(config: &S3Config) -> Result<Self> {
        let builder = opendal::services::S3::default()
            .endpoint(&config.endpoint)
            .region(&config.region)
            .bucket(&config.bucket)
            .access_key_id(&config.access_key_id)
            .secret_access_key(&config.secret_access_key);
        let op = Operator::new(builder)?
            .layer(opendal::layers::LoggingLayer::default())
            .finish();
        Ok(Self::new(op))
    }

    fn object_path(&self, name: &BoxedName) -> String {
        let encoded = name.to_string();
        if self.shard_chars == 0 {
            return encoded;
        }
        let shard = &encoded[..self.shard_chars.min(encoded.len())];
        format!("{shard}/{encoded}")
    }

    /// Upload an object body.
    ///
    /// Objects are immutable and convergent: a name that already exists
    /// holds these exact bytes, so a native already-exists rejection and
    /// a failed create-if-absent precondition both count as success. When
    /// the backend has no conditional create, large bodies get a HEAD
    /// probe first to skip the redundant transfer. (With several
    /// alternative buckets a winner may still upload twice; that is
    /// harmless.)
    pub async fn put(&self, name: &BoxedName, data: Bytes) -> Result<()> {
        let path = self.object_path(name);
        let cap = self.op.info().full_capability();

        if !cap.write_with_if_not_exists
            && data.len() > PREFLIGHT_SIZE
            && self.op.exists(&path).await?
        {
            debug!(name = %name, "object already present, skipping upload");
            return Ok(());
        }

        let mut write = self.op.write_with(&path, data);
        if cap.write_with_content_type {
            write = write.content_type(CONTENT_TYPE_V1);
        }
        if cap.write_with_cache_control {
            write = write.cache_control(CACHE_CONTROL);
        }
        if cap.write_with_if_not_exists {
            write = write.if_not_exists(true);
        }
        match write.await {
            Ok(_) => Ok(()),
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::AlreadyExists | ErrorKind::ConditionNotMatch
                ) =>
            {
                debug!(name = %name, "object already present");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Existence probe (HEAD).
    pub async fn exists(&self, name: &BoxedName) -> Result<bool> {
        Ok(self.op.exists(&self.object_path(name)).await?)
    }

    /// Fetch an object body.
    ///
    /// A backend that reports a media type other than ours fails with
    /// [`Error::UnexpectedContentType`]; backends that record no media
    /// type (memory, plain filesystems) skip the check.
    pub async fn get(&self, name: &BoxedName) -> Result<Bytes> {
        let path = self.object_path(name);
        let meta = self.op.stat(&path).await?;
        if let Some(content_type) = meta.content_type() {
            if content_type != CONTENT_TYPE_V1 {
                return Err(Error::UnexpectedContentType(content_type.to_string()));
            }
        }
        let buffer = self.op.read(&path).await?;
        Ok(buffer.to_bytes())
    }
}

impl std::fmt::Debug for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bucket")
            .field("scheme", &self.op.info().scheme())
            .field("delay", &self.delay)
            .field("shard_chars", &self.shard_chars)
            .finish()
    }
}
