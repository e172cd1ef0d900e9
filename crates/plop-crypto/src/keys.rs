//! Role keys: master secret → four single-purpose keys + chunker polynomial

use chacha20poly1305::{KeyInit, XChaCha20Poly1305, XNonce};
use secrecy::SecretString;
use zeroize::Zeroize;

use plop_chunks::{derive_polynomial, Pol};
use plop_core::{BoxedName, ContentAddress, Result};

use crate::kdf::{derive_master_secret, MasterSecret};
use crate::{DomainPrefix, KEY_SIZE, NONCE_SIZE};

// Derivation context strings. Part of the on-disk format; each role gets
// its own context so no key is ever reused across roles.
const CONTEXT_BLOB_CIPHER: &str = "bazil.org/plop 2020-04-07 blob cipher";
const CONTEXT_NAME_BOXING: &str = "bazil.org/plop 2020-04-07 object name boxing";
const CONTEXT_HASH_FOR_ID: &str = "bazil.org/plop 2020-04-07 blob hash for id";
const CONTEXT_HASH_FOR_NONCE: &str = "bazil.org/plop 2020-04-07 blob hash for nonce";
const CONTEXT_ROLLING_HASH: &str = "bazil.org/plop 2020-04-07 rolling hash polynomial";

/// The role keys derived from one master secret.
pub struct KeySet {
    hash_secret: [u8; KEY_SIZE],
    nonce_secret: [u8; KEY_SIZE],
    name_secret: [u8; KEY_SIZE],
    cipher: XChaCha20Poly1305,
}

impl KeySet {
    pub fn derive(master: &MasterSecret) -> Self {
        let mut cipher_key = blake3::derive_key(CONTEXT_BLOB_CIPHER, master.as_bytes());
        let keys = Self {
            hash_secret: blake3::derive_key(CONTEXT_HASH_FOR_ID, master.as_bytes()),
            nonce_secret: blake3::derive_key(CONTEXT_HASH_FOR_NONCE, master.as_bytes()),
            name_secret: blake3::derive_key(CONTEXT_NAME_BOXING, master.as_bytes()),
            cipher: XChaCha20Poly1305::new((&cipher_key).into()),
        };
        cipher_key.zeroize();
        keys
    }

    /// Content address: keyed hash of the domain-prefixed plaintext.
    pub fn content_address(&self, prefix: DomainPrefix, plaintext: &[u8]) -> ContentAddress {
        let mut hasher = blake3::Hasher::new_keyed(&self.hash_secret);
        hasher.update(prefix.as_bytes());
        hasher.update(plaintext);
        ContentAddress::from_bytes(*hasher.finalize().as_bytes())
    }

    /// Deterministic AEAD nonce for an address.
    ///
    /// Safe only because the address already commits to the plaintext:
    /// under one cipher key, a nonce can never repeat with two different
    /// messages.
    pub fn nonce(&self, address: &ContentAddress) -> XNonce {
        let mut hasher = blake3::Hasher::new_keyed(&self.nonce_secret);
        hasher.update(address.as_bytes());
        let mut nonce = [0u8; NONCE_SIZE];
        hasher.finalize_xof().fill(&mut nonce);
        XNonce::from(nonce)
    }

    /// The external name an object is stored under. Backends see only
    /// this; it reveals nothing about the address it was derived from.
    pub fn boxed_name(&self, address: &ContentAddress) -> BoxedName {
        let mut hasher = blake3::Hasher::new_keyed(&self.name_secret);
        hasher.update(address.as_bytes());
        BoxedName::from_bytes(*hasher.finalize().as_bytes())
    }

    pub(crate) fn cipher(&self) -> &XChaCha20Poly1305 {
        &self.cipher
    }
}

impl Drop for KeySet {
    fn drop(&mut self) {
        self.hash_secret.zeroize();
        self.nonce_secret.zeroize();
        self.name_secret.zeroize();
    }
}

impl std::fmt::Debug for KeySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeySet").finish_non_exhaustive()
    }
}

/// Everything derived from one sharing passphrase.
pub struct Secrets {
    pub keys: KeySet,
    /// Rolling-hash polynomial; same passphrase, same chunk boundaries.
    pub polynomial: Pol,
}

/// Runs the full derivation: passphrase → master secret → role keys and
/// chunker polynomial. CPU-heavy (Argon2id); call once per store.
pub fn derive_secrets(passphrase: &SecretString) -> Result<Secrets> {
    let master = derive_master_secret(passphrase)?;
    let keys = KeySet::derive(&master);
    let mut xof = blake3::Hasher::new_derive_key(CONTEXT_ROLLING_HASH);
    xof.update(master.as_bytes());
    let polynomial = derive_polynomial(xof.finalize_xof())?;
    Ok(Secrets { keys, polynomial })
}
