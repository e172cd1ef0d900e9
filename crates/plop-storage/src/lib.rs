//! plop-storage: the bucket adapter over object-store backends
//!
//! A [`Bucket`] treats any OpenDAL-reachable backend as an untrusted
//! name→bytes map with three operations: conditional create, existence
//! probe, and read. S3-compatible services, a local filesystem directory,
//! and an in-memory map (for tests) are all driven through the same
//! adapter.

pub mod bucket;

pub use bucket::{Bucket, S3Config};

/// The single media type for every stored object. All objects are
/// superficially the same; the real kind is only learned (and
/// authenticated) after opening the crypto. The version suffix governs
/// the crypto algorithm and plaintext content format.
pub const CONTENT_TYPE_V1: &str = "application/x.org.bazil.plop.v1";

/// Objects are immutable and content-addressed, so caches may hold them
/// forever.
pub const CACHE_CONTROL: &str = "public, max-age=2147483648, immutable";
