//! Partition routing.

use skein_core::PartitionId;

/// Maps a partition key to a partition index.
///
/// Pure and deterministic: the same key always yields the same index for a
/// fixed partition count, independent of insertion order or any external
/// state. FIFO order within a partition therefore implies FIFO order for all
/// events sharing a key.
#[derive(Debug, Clone, Copy)]
pub struct PartitionRouter {
    num_partitions: u32,
}

impl PartitionRouter {
    /// Create a router for the given partition count.
    ///
    /// The count must be at least 1; [`BrokerConfig::validate`] enforces
    /// this before a broker constructs its router.
    ///
    /// [`BrokerConfig::validate`]: skein_core::BrokerConfig::validate
    #[must_use]
    pub const fn new(num_partitions: u32) -> Self {
        debug_assert!(num_partitions > 0);
        Self { num_partitions }
    }

    /// Route a key to a partition.
    ///
    /// Polynomial hash over the key's UTF-8 bytes, reduced modulo the
    /// partition count at every step so the accumulator stays small.
    #[must_use]
    pub fn route(&self, key: &str) -> PartitionId {
        let modulus = u64::from(self.num_partitions);
        let hash = key
            .bytes()
            .fold(0u64, |hash, byte| (hash * 31 + u64::from(byte)) % modulus);
        // hash < num_partitions <= u32::MAX
        PartitionId::new(hash as u32)
    }

    /// The partition count this router was built with.
    #[must_use]
    pub const fn num_partitions(&self) -> u32 {
        self.num_partitions
    }
}
