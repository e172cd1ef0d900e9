//! Key derivation: Argon2id passphrase → master secret

use argon2::{Algorithm, Argon2, Params, Version};
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroize;

use plop_core::{Error, Result};

use crate::KEY_SIZE;

/// Salt for the passphrase KDF. This is obviously not secret (and cannot
/// be), but it does force any attacker to attack this format specifically
/// instead of relying on existing rainbow tables. Part of the on-disk
/// format; changing it orphans every stored object.
pub const SHARING_SALT: &[u8] = b"bazil.org/plop 2020-04-07 sharing salt";

// Argon2id cost parameters. Also part of the on-disk format.
const MEM_COST_KIB: u32 = 64 * 1024;
const TIME_COST: u32 = 1;
const PARALLELISM: u32 = 4;

/// A 256-bit master secret derived from a sharing passphrase.
///
/// Zeroized on drop so the secret does not linger in memory.
#[derive(Clone)]
pub struct MasterSecret {
    bytes: [u8; KEY_SIZE],
}

impl MasterSecret {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for MasterSecret {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for MasterSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterSecret")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Derive the master secret from a sharing passphrase via Argon2id.
///
/// Deliberately expensive (64 MiB, 4 lanes); runs once per store. Every
/// holder of the same passphrase derives the same secret, and from it the
/// same role keys and chunker polynomial.
pub fn derive_master_secret(passphrase: &SecretString) -> Result<MasterSecret> {
    let params = Params::new(MEM_COST_KIB, TIME_COST, PARALLELISM, Some(KEY_SIZE))
        .map_err(|e| Error::Config(format!("invalid Argon2id params: {e}")))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut secret = [0u8; KEY_SIZE];
    argon2
        .hash_password_into(
            passphrase.expose_secret().as_bytes(),
            SHARING_SALT,
            &mut secret,
        )
        .map_err(|e| Error::Config(format!("Argon2id KDF failed: {e}")))?;

    Ok(MasterSecret::from_bytes(secret))
}
