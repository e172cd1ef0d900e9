//! Store construction options.

use std::time::Duration;

use secrecy::SecretString;

use plop_core::{Error, Result};
use plop_storage::Bucket;

use crate::store::Store;

const MIB: u32 = 1024 * 1024;

#[derive(Debug)]
pub(crate) struct StoreConfig {
    pub chunk_min: u32,
    pub chunk_max: u32,
    pub chunk_avg_bits: u32,
    pub buckets: Vec<Bucket>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            chunk_min: 4 * MIB,
            chunk_max: 16 * MIB,
            chunk_avg_bits: 23, // 8 MiB
            buckets: Vec::new(),
        }
    }
}

/// Builds a [`Store`]. Obtained from [`Store::builder`].
pub struct StoreBuilder {
    passphrase: SecretString,
    config: StoreConfig,
}

impl StoreBuilder {
    pub(crate) fn new(passphrase: SecretString) -> Self {
        Self {
            passphrase,
            config: StoreConfig::default(),
        }
    }

    /// Sets the minimum and maximum chunk size.
    ///
    /// Zero leaves the previous value in effect. An invalid combination
    /// (min above max, including through a kept previous value) clamps
    /// the minimum down to the maximum.
    pub fn chunk_limits(mut self, min: u32, max: u32) -> Self {
        if min != 0 {
            self.config.chunk_min = min;
        }
        if max != 0 {
            self.config.chunk_max = max;
        }
        if self.config.chunk_min > self.config.chunk_max {
            self.config.chunk_min = self.config.chunk_max;
        }
        self
    }

    /// Sets the desired average chunk size, rounded to the nearest power
    /// of two. Zero leaves the previous value in effect.
    pub fn chunk_goal(mut self, size: u32) -> Self {
        if size != 0 {
            self.config.chunk_avg_bits = bits_of_power_of_two(size);
        }
        self
    }

    /// Appends a bucket as an alternate destination for reads and writes.
    pub fn bucket(mut self, bucket: Bucket) -> Self {
        self.config.buckets.push(bucket);
        self
    }

    /// Appends a bucket that is only tried after `delay` has passed, or
    /// once every earlier alternative has failed.
    pub fn bucket_after(self, delay: Duration, bucket: Bucket) -> Self {
        self.bucket(bucket.with_delay(delay))
    }

    /// Derives the secrets (CPU-heavy, runs the password KDF once) and
    /// builds the store. A store without buckets is a programmer error.
    pub fn build(self) -> Result<Store> {
        if self.config.buckets.is_empty() {
            return Err(Error::Config(
                "store must have at least one bucket".into(),
            ));
        }
        Store::new(&self.passphrase, self.config)
    }
}

/// Rounds to the nearest power of two and reports the number of bits
/// needed to store it.
fn bits_of_power_of_two(v: u32) -> u32 {
    if v > 1 << 31 {
        return 31;
    }
    let next = v.next_power_of_two();
    let prev = next >> 1;
    if prev != 0 && v - prev < next - v {
        prev.trailing_zeros()
    } else {
        next.trailing_zeros()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_round_to_nearest_power() {
        assert_eq!(bits_of_power_of_two(1), 0);
        assert_eq!(bits_of_power_of_two(2), 1);
        assert_eq!(bits_of_power_of_two(3), 2); // ties round up
        assert_eq!(bits_of_power_of_two(4), 2);
        assert_eq!(bits_of_power_of_two(5), 2);
        assert_eq!(bits_of_power_of_two(6), 3);
        assert_eq!(bits_of_power_of_two(7), 3);
        assert_eq!(bits_of_power_of_two(8), 3);
        assert_eq!(bits_of_power_of_two(8 * MIB), 23);
        assert_eq!(bits_of_power_of_two(u32::MAX), 31);
    }

    #[test]
    fn zero_keeps_previous_chunk_limits() {
        let builder = StoreBuilder::new(SecretString::from("test"))
            .chunk_limits(100, 200)
            .chunk_limits(0, 0);
        assert_eq!(builder.config.chunk_min, 100);
        assert_eq!(builder.config.chunk_max, 200);
    }

    #[test]
    fn min_above_max_clamps_to_max() {
        let builder = StoreBuilder::new(SecretString::from("test")).chunk_limits(300, 200);
        assert_eq!(builder.config.chunk_min, 200);
        assert_eq!(builder.config.chunk_max, 200);

        // also via a kept previous value
        let builder = StoreBuilder::new(SecretString::from("test"))
            .chunk_limits(0, 2 * MIB)
            .chunk_limits(0, 0);
        assert_eq!(builder.config.chunk_min, 2 * MIB);
    }

    #[test]
    fn goal_is_stored_as_bits() {
        let builder = StoreBuilder::new(SecretString::from("test")).chunk_goal(6 * MIB);
        assert_eq!(builder.config.chunk_avg_bits, 23);

        let unchanged = StoreBuilder::new(SecretString::from("test")).chunk_goal(0);
        assert_eq!(unchanged.config.chunk_avg_bits, 23);
    }

    #[test]
    fn build_without_buckets_is_config_error() {
        let result = StoreBuilder::new(SecretString::from("test")).build();
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
