//! Merkle state roots and storage proofs.
//!
//! A chain's state root is the root of a binary Merkle tree over all of its
//! ledger entries in key order. A storage proof carries, for each requested
//! key, the encoded value and the sibling path to the root. A chain that
//! trusts another chain's state root at some height can therefore check a
//! value read from that chain's historical state.

use crate::{Hash, StorageKey, StorageValue};
use serde::{Deserialize, Serialize};

/// Sibling path from one leaf to the root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// Position of the leaf among the ledger entries.
    pub leaf_index: u32,

    /// Sibling at each level, leaf level first.
    pub siblings: Vec<Hash>,
}

impl MerkleProof {
    /// Whether `leaf` sits at `leaf_index` under `root`.
    pub fn verify(&self, leaf: &Hash, root: &Hash) -> bool {
        let mut index = self.leaf_index;
        let node = self.siblings.iter().fold(*leaf, |node, sibling| {
            let parent = if index % 2 == 0 {
                hash_pair(&node, sibling)
            } else {
                hash_pair(sibling, &node)
            };
            index /= 2;
            parent
        });
        node == *root
    }

    pub fn depth(&self) -> usize {
        self.siblings.len()
    }
}

fn hash_pair(left: &Hash, right: &Hash) -> Hash {
    Hash::from_parts(&[left.as_bytes(), right.as_bytes()])
}

/// Binary Merkle tree over ledger leaves.
///
/// Every level is kept so paths can be read off without rehashing. A level
/// of odd width is padded with [`Hash::ZERO`] before pairing.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    /// `levels[0]` are the leaves; the last level holds only the root.
    levels: Vec<Vec<Hash>>,
}

impl MerkleTree {
    pub fn new(leaves: Vec<Hash>) -> Self {
        let mut levels = vec![leaves];
        while levels.last().map_or(0, Vec::len) > 1 {
            let below = &levels[levels.len() - 1];
            let above = below
                .chunks(2)
                .map(|pair| hash_pair(&pair[0], pair.get(1).unwrap_or(&Hash::ZERO)))
                .collect();
            levels.push(above);
        }
        Self { levels }
    }

    /// Root of the tree; the zero hash when there are no leaves.
    pub fn root(&self) -> Hash {
        self.levels
            .last()
            .and_then(|top| top.first())
            .copied()
            .unwrap_or(Hash::ZERO)
    }

    pub fn len(&self) -> usize {
        self.levels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels[0].is_empty()
    }

    /// Path from leaf `index` to the root, or `None` past the last leaf.
    pub fn proof(&self, index: usize) -> Option<MerkleProof> {
        if index >= self.len() {
            return None;
        }
        let top = self.levels.len() - 1;
        let mut position = index;
        let siblings = self.levels[..top]
            .iter()
            .map(|level| {
                let sibling = level.get(position ^ 1).copied().unwrap_or(Hash::ZERO);
                position /= 2;
                sibling
            })
            .collect();
        Some(MerkleProof {
            leaf_index: index as u32,
            siblings,
        })
    }
}

/// Compute the leaf hash for a ledger entry.
///
/// Key and value are length-prefixed so that no entry can be reinterpreted
/// as a different split of the same bytes.
pub fn storage_leaf_hash(key: &[u8], value: &[u8]) -> Hash {
    Hash::from_parts(&[
        &(key.len() as u64).to_le_bytes(),
        key,
        &(value.len() as u64).to_le_bytes(),
        value,
    ])
}

/// Compute the state root over ledger entries given in key order.
///
/// An empty ledger has the zero root.
pub fn state_root<'a, I>(entries: I) -> Hash
where
    I: IntoIterator<Item = (&'a StorageKey, &'a StorageValue)>,
{
    let leaves = entries
        .into_iter()
        .map(|(key, value)| storage_leaf_hash(&crate::encode(key), &value.encode()))
        .collect();
    MerkleTree::new(leaves).root()
}

/// One proven ledger entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenEntry {
    /// The key read.
    pub key: StorageKey,
    /// Encoded value at the key.
    pub value: Vec<u8>,
    /// Path from the entry to the state root.
    pub proof: MerkleProof,
}

/// Proof of a set of ledger entries against a single state root.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageProof {
    /// Proven entries, one per key that exists.
    pub entries: Vec<ProvenEntry>,
}

/// Reasons a storage proof is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProofError {
    /// A requested key has no proven entry.
    #[error("no proven value for key {0:?}")]
    MissingKey(StorageKey),

    /// The entry does not hash to the trusted root.
    #[error("proof for key {0:?} does not verify against the state root")]
    RootMismatch(StorageKey),

    /// The proven bytes are not a valid ledger value.
    #[error("proven value for key {0:?} cannot be decoded")]
    Undecodable(StorageKey),
}

impl StorageProof {
    /// Build proofs for `keys` from ledger entries given in key order.
    ///
    /// Keys absent from the ledger are skipped; verification reports them as
    /// missing.
    pub fn generate<'a, I>(entries: I, keys: &[StorageKey]) -> Self
    where
        I: IntoIterator<Item = (&'a StorageKey, &'a StorageValue)>,
    {
        let encoded: Vec<(&StorageKey, Vec<u8>)> = entries
            .into_iter()
            .map(|(key, value)| (key, value.encode()))
            .collect();
        let tree = MerkleTree::new(
            encoded
                .iter()
                .map(|(key, value)| storage_leaf_hash(&crate::encode(*key), value))
                .collect(),
        );

        let entries = keys
            .iter()
            .filter_map(|wanted| {
                let index = encoded.iter().position(|(key, _)| *key == wanted)?;
                Some(ProvenEntry {
                    key: wanted.clone(),
                    value: encoded[index].1.clone(),
                    proof: tree.proof(index)?,
                })
            })
            .collect();

        Self { entries }
    }

    /// Verify every requested key against `root` and decode the values.
    pub fn verify(
        &self,
        root: &Hash,
        keys: &[StorageKey],
    ) -> Result<Vec<(StorageKey, StorageValue)>, ProofError> {
        keys.iter()
            .map(|key| {
                let entry = self
                    .entries
                    .iter()
                    .find(|entry| &entry.key == key)
                    .ok_or_else(|| ProofError::MissingKey(key.clone()))?;
                let leaf = storage_leaf_hash(&crate::encode(key), &entry.value);
                if !entry.proof.verify(&leaf, root) {
                    return Err(ProofError::RootMismatch(key.clone()));
                }
                let value = crate::decode::<StorageValue>(&entry.value)
                    .ok_or_else(|| ProofError::Undecodable(key.clone()))?;
                Ok((key.clone(), value))
            })
            .collect()
    }
}
