//! Sorted "simple" Merkle tree over manifest rows.
//!
//! The claim contract anchors roots built with OpenZeppelin's
//! `SimpleMerkleTree`: leaves are sorted, laid out at the tail of a flat
//! array (a complete binary tree), and each inner node is the keccak256 of its
//! two children concatenated in ascending order. The layout here must match
//! bit for bit.

use serde::Serialize;

use crate::{error::ClaimsError, keccak256, manifest::ManifestRow, Address, Hash};

/// Leaf hash for a manifest entry:
/// `keccak256(uint256(index) ‖ uint256(address) ‖ uint256(amount))`, each
/// word big-endian and zero-padded to 32 bytes.
pub fn leaf_for(index: u64, address: &Address, amount: &num_bigint::BigUint) -> Hash {
    let mut input = [0u8; 96];
    input[24..32].copy_from_slice(&index.to_be_bytes());
    input[44..64].copy_from_slice(address);

    // Manifest parsing rejects amounts wider than uint256.
    debug_assert!(amount.bits() <= 256, "amount exceeds uint256");
    let amount_bytes = amount.to_bytes_be();
    let amount_bytes = &amount_bytes[amount_bytes.len().saturating_sub(32)..];
    input[96 - amount_bytes.len()..].copy_from_slice(amount_bytes);

    keccak256(&input)
}

pub fn row_leaf(row: &ManifestRow) -> Hash {
    leaf_for(row.index, &row.address, &row.amount)
}

/// Inclusion proof for one leaf.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleProof {
    #[serde(with = "crate::hex_hash")]
    pub leaf_value: Hash,
    /// Position of the leaf in the flat tree array.
    pub leaf_index: usize,
    #[serde(serialize_with = "serialize_hashes")]
    pub proof: Vec<Hash>,
}

#[derive(Clone, Debug)]
pub struct SimpleMerkleTree {
    /// Flat node array; `nodes[0]` is the root, leaves occupy the tail.
    nodes: Vec<Hash>,
    /// Leaves in tree order (sorted), paired with their node position.
    leaves: Vec<(Hash, usize)>,
}

impl SimpleMerkleTree {
    /// Build a tree over pre-hashed leaves. Returns `None` for an empty set,
    /// which has no root.
    pub fn from_leaves(mut leaves: Vec<Hash>) -> Option<Self> {
        if leaves.is_empty() {
            return None;
        }
        leaves.sort_unstable();

        let node_count = 2 * leaves.len() - 1;
        let mut nodes = vec![[0u8; 32]; node_count];
        let mut positions = Vec::with_capacity(leaves.len());
        for (i, leaf) in leaves.iter().enumerate() {
            let pos = node_count - 1 - i;
            nodes[pos] = *leaf;
            positions.push((*leaf, pos));
        }
        for i in (0..node_count - leaves.len()).rev() {
            nodes[i] = hash_pair(&nodes[2 * i + 1], &nodes[2 * i + 2]);
        }

        Some(Self {
            nodes,
            leaves: positions,
        })
    }

    pub fn from_rows(rows: &[ManifestRow]) -> Option<Self> {
        Self::from_leaves(rows.iter().map(row_leaf).collect())
    }

    pub fn root(&self) -> Hash {
        self.nodes[0]
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Leaves in tree order.
    pub fn leaves(&self) -> impl Iterator<Item = &Hash> {
        self.leaves.iter().map(|(leaf, _)| leaf)
    }

    pub fn proof_for(&self, leaf: &Hash) -> Result<MerkleProof, ClaimsError> {
        let &(leaf_value, leaf_index) = self
            .leaves
            .iter()
            .find(|(candidate, _)| candidate == leaf)
            .ok_or(ClaimsError::LeafNotFound)?;

        let mut proof = Vec::new();
        let mut pos = leaf_index;
        while pos > 0 {
            let sibling = if pos % 2 == 1 { pos + 1 } else { pos - 1 };
            proof.push(self.nodes[sibling]);
            pos = (pos - 1) / 2;
        }

        Ok(MerkleProof {
            leaf_value,
            leaf_index,
            proof,
        })
    }

    /// Proofs for every given row, in row order.
    pub fn proofs_for(&self, rows: &[ManifestRow]) -> Result<Vec<MerkleProof>, ClaimsError> {
        rows.iter().map(|row| self.proof_for(&row_leaf(row))).collect()
    }
}

/// Fold `leaf` up through `proof` and compare with `root`.
pub fn verify_proof(root: &Hash, leaf: &Hash, proof: &[Hash]) -> bool {
    let computed = proof
        .iter()
        .fold(*leaf, |acc, sibling| hash_pair(&acc, sibling));
    computed == *root
}

fn hash_pair(a: &Hash, b: &Hash) -> Hash {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut input = [0u8; 64];
    input[..32].copy_from_slice(lo);
    input[32..].copy_from_slice(hi);
    keccak256(&input)
}

fn serialize_hashes<S: serde::Serializer>(hashes: &[Hash], serializer: S) -> Result<S::Ok, S::Error> {
    use serde::ser::SerializeSeq;
    let mut seq = serializer.serialize_seq(Some(hashes.len()))?;
    for h in hashes {
        seq.serialize_element(&crate::to_hex(h))?;
    }
    seq.end()
}
