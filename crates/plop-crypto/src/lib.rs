//! plop-crypto: key derivation and the convergent object codec
//!
//! Pipeline: plaintext → keyed BLAKE3 content address → zstd compress
//! (padded) → XChaCha20-Poly1305 with a derived nonce and the address as
//! AAD. Everything is deterministic per `(passphrase, plaintext)`:
//! objects with identical contents under the same secret have identical
//! names and identical ciphertext, which is what enables cross-user
//! deduplication on an untrusted backend.
//!
//! Key hierarchy:
//! ```text
//! Master secret (256-bit, Argon2id from passphrase + fixed public salt)
//!   ├── blob cipher key        (BLAKE3 derive-key, AEAD encryption)
//!   ├── object name boxing key (BLAKE3 derive-key, external names)
//!   ├── hash-for-id key        (BLAKE3 derive-key, content addresses)
//!   ├── hash-for-nonce key     (BLAKE3 derive-key, deterministic nonces)
//!   └── rolling hash polynomial (BLAKE3 derive-key XOF → GF(2) derivation)
//! ```

pub mod codec;
pub mod kdf;
pub mod keys;

pub use codec::{open_object, seal_object, SealedObject};
pub use kdf::{derive_master_secret, MasterSecret, SHARING_SALT};
pub use keys::{derive_secrets, KeySet, Secrets};

/// Size of every derived key in bytes (256-bit).
pub const KEY_SIZE: usize = 32;

/// Size of an XChaCha20-Poly1305 nonce (192-bit).
pub const NONCE_SIZE: usize = 24;

/// Size of a Poly1305 authentication tag.
pub const TAG_SIZE: usize = 16;

/// Size of a domain prefix. Fixed at 32 bytes for simple, aligned
/// concatenation; part of the on-disk format.
pub const PREFIX_SIZE: usize = 32;

/// The domain tag embedded at the front of every object's plaintext,
/// inside the crypto. Stored objects are outwardly indistinguishable;
/// only a successful decrypt reveals (and authenticates) the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainPrefix {
    /// An extent-list manifest for one stream.
    Extents,
    /// One chunk of stream data.
    Blob,
}

impl DomainPrefix {
    pub const fn as_bytes(self) -> &'static [u8; PREFIX_SIZE] {
        match self {
            DomainPrefix::Extents => b"bazil.org/plop#type/extents/v1\x00\x00",
            DomainPrefix::Blob => b"bazil.org/plop#type/blob/v1\x00\x00\x00\x00\x00",
        }
    }
}

// The 32-byte prefix length is an invariant of the wire format.
const _: () = assert!(DomainPrefix::Extents.as_bytes().len() == PREFIX_SIZE);
const _: () = assert!(DomainPrefix::Blob.as_bytes().len() == PREFIX_SIZE);
