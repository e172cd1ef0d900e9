//! Content addresses and external object names.
//!
//! A [`ContentAddress`] is the keyed hash of an object's domain-prefixed
//! plaintext; it never leaves the process except as the user-visible
//! stream key. A [`BoxedName`] is the keyed hash of a content address and
//! is the only name a backend ever sees.

use std::fmt;
use std::str::FromStr;

use crate::{zbase32, Error};

/// Length in bytes of content addresses and boxed names, before encoding.
pub const ADDRESS_SIZE: usize = 32;

/// zbase32-encoded length of a 32-byte value.
pub const ENCODED_LEN: usize = 52;

/// The 32-byte keyed hash identifying an object's plaintext.
///
/// Deterministic per `(passphrase, domain prefix, plaintext)`; equal
/// plaintexts converge on equal addresses, which is what makes
/// deduplication work.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentAddress([u8; ADDRESS_SIZE]);

impl ContentAddress {
    pub fn from_bytes(bytes: [u8; ADDRESS_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_SIZE] {
        &self.0
    }
}

impl fmt::Display for ContentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&zbase32::encode(&self.0))
    }
}

impl fmt::Debug for ContentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentAddress({self})")
    }
}

impl FromStr for ContentAddress {
    type Err = Error;

    /// Parses a user-visible key. Wrong length or a character outside the
    /// zbase32 alphabet is [`Error::BadKey`].
    fn from_str(s: &str) -> Result<Self, Error> {
        if s.len() != ENCODED_LEN {
            return Err(Error::BadKey);
        }
        let raw = zbase32::decode(s)?;
        let bytes: [u8; ADDRESS_SIZE] = raw.try_into().map_err(|_| Error::BadKey)?;
        Ok(Self(bytes))
    }
}

/// The externally visible name of an object in a backend.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoxedName([u8; ADDRESS_SIZE]);

impl BoxedName {
    pub fn from_bytes(bytes: [u8; ADDRESS_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_SIZE] {
        &self.0
    }
}

impl fmt::Display for BoxedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&zbase32::encode(&self.0))
    }
}

impl fmt::Debug for BoxedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BoxedName({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_parse_roundtrip() {
        let addr = ContentAddress::from_bytes([0xa7; ADDRESS_SIZE]);
        let text = addr.to_string();
        assert_eq!(text.len(), ENCODED_LEN);
        assert_eq!(text.parse::<ContentAddress>().unwrap(), addr);
    }

    #[test]
    fn wrong_length_is_bad_key() {
        assert!(matches!("yy".parse::<ContentAddress>(), Err(Error::BadKey)));
        let long = "y".repeat(ENCODED_LEN + 1);
        assert!(matches!(long.parse::<ContentAddress>(), Err(Error::BadKey)));
    }

    #[test]
    fn wrong_alphabet_is_bad_key() {
        let bad = "l".repeat(ENCODED_LEN);
        assert!(matches!(bad.parse::<ContentAddress>(), Err(Error::BadKey)));
    }

    #[test]
    fn debug_redacts_nothing_but_is_compact() {
        let name = BoxedName::from_bytes([1; ADDRESS_SIZE]);
        let dbg = format!("{name:?}");
        assert!(dbg.starts_with("BoxedName("));
        assert_eq!(dbg.len(), "BoxedName()".len() + ENCODED_LEN);
    }
}
