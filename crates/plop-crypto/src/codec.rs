//! The object codec: seal plaintext into a storable ciphertext, open it
//! back.
//!
//! Wire layout of a stored object (no outer framing):
//! ```text
//! XChaCha20-Poly1305( domain prefix (32 bytes) || zstd(plaintext) + pad )
//!     nonce = keyed-hash(nonce key, address), AAD = address
//! ```
//! Using the content address as AAD binds the ciphertext to its name: a
//! backend that serves the wrong bytes for a name cannot produce a valid
//! plaintext. The prefix inside the crypto rules out type confusion
//! between blob and extents objects.

use bytes::Bytes;
use chacha20poly1305::aead::{Aead, Payload};

use plop_core::{BoxedName, ContentAddress, Error, Result};

use crate::keys::KeySet;
use crate::{DomainPrefix, PREFIX_SIZE};

/// Compressed payloads are padded up to a multiple of this, obscuring
/// minor plaintext size differences from the backend.
const COMPRESSION_PAD: usize = 32;

const SKIPPABLE_MAGIC: u32 = 0x184D2A50;
const SKIPPABLE_HEADER: usize = 8;

/// A sealed object, ready for upload.
pub struct SealedObject {
    pub address: ContentAddress,
    pub name: BoxedName,
    pub ciphertext: Bytes,
}

/// Seal `(prefix, plaintext)` into a ciphertext plus its addresses.
///
/// Fully deterministic: equal inputs under equal keys produce equal
/// output, byte for byte.
pub fn seal_object(
    keys: &KeySet,
    prefix: DomainPrefix,
    plaintext: &[u8],
) -> Result<SealedObject> {
    let address = keys.content_address(prefix, plaintext);
    let nonce = keys.nonce(&address);

    // The prefix goes inside the crypto but in front of the compression.
    let mut inner = Vec::with_capacity(PREFIX_SIZE + plaintext.len() / 2 + 64);
    inner.extend_from_slice(prefix.as_bytes());
    let compressed = zstd::stream::encode_all(plaintext, 0).map_err(Error::Io)?;
    inner.extend_from_slice(&compressed);
    pad_compressed(&mut inner, PREFIX_SIZE);

    let ciphertext = keys
        .cipher()
        .encrypt(
            &nonce,
            Payload {
                msg: &inner,
                aad: address.as_bytes(),
            },
        )
        .map_err(|_| Error::Other(anyhow::anyhow!("object encryption failed")))?;

    let name = keys.boxed_name(&address);
    Ok(SealedObject {
        address,
        name,
        ciphertext: ciphertext.into(),
    })
}

/// Open a ciphertext fetched for `address`, expecting `prefix`.
///
/// The caller supplies the address because it already knows it (from the
/// user key or an extent record); the AEAD then authenticates that the
/// bytes really are that object. AEAD rejection, a mismatched prefix, and
/// undecompressable data all mean the same thing to a caller — the blob
/// is corrupt (or the passphrase is wrong; we cannot tell them apart).
pub fn open_object(
    keys: &KeySet,
    prefix: DomainPrefix,
    address: &ContentAddress,
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    let nonce = keys.nonce(address);
    let inner = keys
        .cipher()
        .decrypt(
            &nonce,
            Payload {
                msg: ciphertext,
                aad: address.as_bytes(),
            },
        )
        .map_err(|_| Error::CorruptBlob)?;

    let compressed = inner
        .strip_prefix(prefix.as_bytes().as_slice())
        .ok_or(Error::CorruptBlob)?;

    // Trailing padding is a zstd skippable frame; the streaming decoder
    // skips it.
    zstd::stream::decode_all(compressed).map_err(|_| Error::CorruptBlob)
}

/// Pad the compressed payload (everything after `payload_start`) to a
/// multiple of [`COMPRESSION_PAD`] with one zstd skippable frame. Already
/// aligned payloads are left alone; otherwise the padding grows by whole
/// multiples until the 8-byte frame header fits.
fn pad_compressed(buf: &mut Vec<u8>, payload_start: usize) {
    let leftover = (buf.len() - payload_start) % COMPRESSION_PAD;
    if leftover == 0 {
        return;
    }
    let mut add = COMPRESSION_PAD - leftover;
    while add < SKIPPABLE_HEADER {
        add += COMPRESSION_PAD;
    }
    let content = add - SKIPPABLE_HEADER;
    buf.extend_from_slice(&SKIPPABLE_MAGIC.to_le_bytes());
    buf.extend_from_slice(&(content as u32).to_le_bytes());
    buf.resize(buf.len() + content, 0);
}
