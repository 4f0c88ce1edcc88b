//! Ledger storage with O(1) snapshots.
//!
//! The whole ledger is one persistent ordered map. Cloning it is O(1) and
//! shares structure, so the chain keeps a snapshot per block for historical
//! reads and proofs, and every dispatch runs against a cheap copy that is
//! either committed or dropped.

use im::OrdMap;
use std::ops::RangeBounds;
use xregion_types::{state_root, Hash, StorageKey, StoragePrefix, StorageProof, StorageValue};

/// A chain's ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    entries: OrdMap<StorageKey, StorageValue>,
}

impl Ledger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read an entry.
    pub fn get(&self, key: &StorageKey) -> Option<&StorageValue> {
        self.entries.get(key)
    }

    /// Whether an entry exists.
    pub fn contains(&self, key: &StorageKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Write an entry, returning the previous value.
    pub fn insert(&mut self, key: StorageKey, value: StorageValue) -> Option<StorageValue> {
        self.entries.insert(key, value)
    }

    /// Remove an entry, returning it.
    pub fn remove(&mut self, key: &StorageKey) -> Option<StorageValue> {
        self.entries.remove(key)
    }

    /// Entries with keys in `range`, in key order.
    pub fn range<R>(&self, range: R) -> impl Iterator<Item = (&StorageKey, &StorageValue)> + '_
    where
        R: RangeBounds<StorageKey>,
    {
        self.entries.range(range)
    }

    /// All entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&StorageKey, &StorageValue)> {
        self.entries.iter()
    }

    /// Entries of one map, in key order.
    pub fn iter_prefix(
        &self,
        prefix: StoragePrefix,
    ) -> impl Iterator<Item = (&StorageKey, &StorageValue)> {
        self.entries.iter().filter(move |(key, _)| key.prefix() == prefix)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the ledger is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merkle root over all entries.
    pub fn root(&self) -> Hash {
        state_root(self.entries.iter())
    }

    /// Storage proof of `keys` against [`Ledger::root`].
    pub fn proof(&self, keys: &[StorageKey]) -> StorageProof {
        StorageProof::generate(self.entries.iter(), keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xregion_types::{AccountId, BlockHeight, ParaId};

    #[test]
    fn test_snapshot_is_isolated() {
        let alice = AccountId::from_seed("//Alice");
        let mut ledger = Ledger::new();
        ledger.insert(StorageKey::Account(alice), StorageValue::Balance(10));

        let snapshot = ledger.clone();
        ledger.insert(StorageKey::Account(alice), StorageValue::Balance(20));

        assert_eq!(
            snapshot.get(&StorageKey::Account(alice)),
            Some(&StorageValue::Balance(10))
        );
        assert_ne!(snapshot.root(), ledger.root());
    }

    #[test]
    fn test_iter_prefix() {
        let mut ledger = Ledger::new();
        ledger.insert(StorageKey::RequestNonce, StorageValue::Nonce(1));
        for seed in ["//Alice", "//Bob"] {
            ledger.insert(
                StorageKey::Account(AccountId::from_seed(seed)),
                StorageValue::Balance(1),
            );
        }
        assert_eq!(ledger.iter_prefix(StoragePrefix::Accounts).count(), 2);
        assert_eq!(ledger.iter_prefix(StoragePrefix::RequestNonce).count(), 1);
        assert_eq!(ledger.iter_prefix(StoragePrefix::Orders).count(), 0);
    }

    #[test]
    fn test_range_stays_within_one_chain() {
        let mut ledger = Ledger::new();
        for (para, height) in [(2000, 3), (2000, 7), (2000, 9), (2001, 1)] {
            ledger.insert(
                StorageKey::StateCommitment {
                    para: ParaId(para),
                    height: BlockHeight(height),
                },
                StorageValue::StateRoot(Hash::ZERO),
            );
        }
        let below_eight: Vec<BlockHeight> = ledger
            .range(
                StorageKey::StateCommitment {
                    para: ParaId(2000),
                    height: BlockHeight(0),
                }..StorageKey::StateCommitment {
                    para: ParaId(2000),
                    height: BlockHeight(8),
                },
            )
            .filter_map(|(key, _)| match key {
                StorageKey::StateCommitment { height, .. } => Some(*height),
                _ => None,
            })
            .collect();
        assert_eq!(below_eight, vec![BlockHeight(3), BlockHeight(7)]);
    }

    #[test]
    fn test_proof_verifies_against_root() {
        let mut ledger = Ledger::new();
        ledger.insert(StorageKey::RequestNonce, StorageValue::Nonce(7));
        ledger.insert(StorageKey::NextOrderId, StorageValue::Nonce(2));
        let keys = [StorageKey::RequestNonce];

        let values = ledger
            .proof(&keys)
            .verify(&ledger.root(), &keys)
            .expect("proof should verify");
        assert_eq!(values, vec![(StorageKey::RequestNonce, StorageValue::Nonce(7))]);
    }
}
