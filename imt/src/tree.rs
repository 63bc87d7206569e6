// Copyright (C) 2023, Ava Labs, Inc. All rights reserved.
// See the file LICENSE.md for licensing terms.

//! The tree engine: chain maintenance, hash recomputation, proof assembly.

use std::fmt;

use imt_storage::{OrderedStore, StoreError};
use log::trace;
use metrics::counter;
use num_bigint::BigUint;
use thiserror::Error;

use crate::fe;
use crate::hash::{HashError, Hasher};
use crate::node::{self, DecodeError, EncodeError, Node};
use crate::proof::{MutateProof, Proof};

const PREFIX_NODE: u8 = 0x00;
const PREFIX_HASH: u8 = 0x01;
const PREFIX_SIZE: u8 = 0x02;

/// Store key of the persisted tree size.
const SIZE_KEY: [u8; 1] = [PREFIX_SIZE];

/// Errors from tree operations.
///
/// Every error aborts the surrounding [`Tree::set`] and discards its batch:
/// a failed mutation leaves the tree at its pre-call state.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TreeError {
    /// The backing store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The injected hash capability failed.
    #[error(transparent)]
    Hash(#[from] HashError),

    /// A persisted node record did not decode; indicates corruption.
    #[error("corrupt node record: {0}")]
    Decode(#[from] DecodeError),

    /// A node field exceeded the serialized payload limit.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// Insertion would exceed the capacity fixed by the leaf level.
    #[error("tree is over capacity")]
    OverCapacity,

    /// A key wider than the configured field-element width.
    #[error("key does not fit in {0} bytes")]
    KeyOutOfRange(u8),

    /// Key zero is the sentinel's and cannot hold a live leaf.
    #[error("key 0 is reserved for the sentinel")]
    ReservedKey,

    /// A construction-time parameter outside its documented range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// The store contradicts a structural invariant; a bug or corruption.
    #[error("invariant violated: {0}")]
    InvariantViolated(&'static str),
}

/// An indexed merkle tree layered over an [`OrderedStore`].
///
/// Leaves live at the configured `leaf_level` and additionally form a singly
/// linked list sorted by key, headed by the sentinel at key 0. Because the
/// chain is sorted, non-inclusion of a key is witnessed by an ordinary
/// inclusion proof of its low nullifier: the live leaf with the greatest
/// key strictly below it.
///
/// All state lives in the store; the engine itself only carries the
/// configuration and the injected hash capability. A `Tree` must have a
/// single logical writer, which `set(&mut self)` enforces at the type level.
pub struct Tree<S, H> {
    store: S,
    fe_len: u8,
    leaf_level: u8,
    hasher: H,
}

impl<S: OrderedStore, H: Hasher> Tree<S, H> {
    /// Create an engine over `store`.
    ///
    /// `fe_len` is the fixed byte width of keys in the persistent encoding
    /// (1..=64); `leaf_level` is the depth of the leaf level (1..=63), fixing
    /// the capacity at `2^leaf_level` leaf positions with position 0 reserved
    /// for the sentinel. The tree itself is created lazily by the first
    /// insert; no explicit initialization is stored.
    pub fn new(store: S, fe_len: u8, leaf_level: u8, hasher: H) -> Result<Self, TreeError> {
        if !(1..=64).contains(&fe_len) {
            return Err(TreeError::InvalidConfig("fe_len must be in 1..=64"));
        }
        if !(1..=63).contains(&leaf_level) {
            return Err(TreeError::InvalidConfig("leaf_level must be in 1..=63"));
        }
        Ok(Tree {
            store,
            fe_len,
            leaf_level,
            hasher,
        })
    }

    /// The depth of the leaf level.
    #[must_use]
    pub fn leaf_level(&self) -> u8 {
        self.leaf_level
    }

    /// The injected hash capability.
    #[must_use]
    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// The root hash: `hash[0][0]`, or the hash of the empty node when
    /// nothing has been inserted yet.
    pub fn root(&self) -> Result<BigUint, TreeError> {
        match self.store.get(&hash_key(0, 0))? {
            Some(bytes) => Ok(fe::from_bytes(&bytes)),
            None => Ok(Node::empty().hash(&self.hasher)?),
        }
    }

    /// The count of live leaves.
    pub fn size(&self) -> Result<u64, TreeError> {
        match self.store.get(&SIZE_KEY)? {
            Some(bytes) => decode_size(&bytes),
            None => Ok(0),
        }
    }

    /// The leaf record stored at `key`, if any.
    ///
    /// Key 0 is the sentinel's slot; once the tree is non-empty it holds the
    /// head of the sorted chain.
    pub fn get(&self, key: &BigUint) -> Result<Option<Node>, TreeError> {
        let node_key = self.node_key(key)?;
        match self.store.get(&node_key)? {
            Some(bytes) => Ok(Some(Node::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Set `value` for `key`, inserting a leaf if the key is absent and
    /// updating the leaf in place otherwise. Returns the [`MutateProof`] for
    /// the transition.
    ///
    /// The whole operation, its reads included, runs in one store batch;
    /// on any error the batch is discarded and the tree is left exactly at
    /// its pre-call state.
    pub fn set(&mut self, key: &BigUint, value: &BigUint) -> Result<MutateProof, TreeError> {
        match self.set_in_batch(key, value) {
            Ok(proof) => {
                self.store.commit()?;
                Ok(proof)
            }
            Err(e) => {
                self.store.discard();
                Err(e)
            }
        }
    }

    /// Inclusion proof for the leaf at `key` or, when `key` is absent, for
    /// its low nullifier, the witness a consumer checks for non-membership.
    /// Returns the proved leaf's key alongside the proof.
    pub fn prove(&self, key: &BigUint) -> Result<(BigUint, Proof), TreeError> {
        let node_key = self.node_key(key)?;
        match self.store.get(&node_key)? {
            Some(bytes) => {
                let node = Node::from_bytes(&bytes)?;
                Ok((key.clone(), self.node_proof(&node)?))
            }
            None => {
                let size = self.size()?;
                let (ln_key, _, proof) = self.low_nullifier(key, size)?;
                Ok((ln_key, proof))
            }
        }
    }

    /// The body of [`Tree::set`], run inside the store batch.
    fn set_in_batch(&mut self, key: &BigUint, value: &BigUint) -> Result<MutateProof, TreeError> {
        if key.bits() == 0 {
            return Err(TreeError::ReservedKey);
        }
        let value_len = fe::to_bytes(value).len();
        if value_len > node::MAX_PAYLOAD_BYTES {
            return Err(EncodeError {
                field: "value",
                len: value_len,
            }
            .into());
        }

        let node_key = self.node_key(key)?;
        match self.store.get(&node_key)? {
            // Update: only the payload changes. The chain is untouched, so no
            // low-nullifier proofs are produced.
            Some(bytes) => {
                trace!("update key={key}");
                let mut node = Node::from_bytes(&bytes)?;
                node.value = value.clone();
                let node_proof = self.set_node(&node_key, node, false)?;
                counter!("imt.update").increment(1);
                Ok(MutateProof {
                    ln_pre: None,
                    node: node_proof,
                    ln_post: None,
                })
            }
            None => {
                trace!("insert key={key}");
                let size = self.size()?;
                if size >= capacity(self.leaf_level) {
                    return Err(TreeError::OverCapacity);
                }

                let (ln_key, mut ln_node, ln_pre) = self.low_nullifier(key, size)?;

                let node = Node {
                    // Assigned from the bumped size in set_node.
                    index: 0,
                    value: value.clone(),
                    next_key: ln_node.next_key.clone(),
                };
                let node_proof = self.set_node(&node_key, node, true)?;

                // The low nullifier is relinked strictly after the new leaf is
                // written, so its proof carries the post-operation root.
                ln_node.next_key = key.clone();
                let ln_key_bytes = self.node_key(&ln_key)?;
                let ln_post = self.set_node(&ln_key_bytes, ln_node, false)?;

                counter!("imt.insert").increment(1);
                Ok(MutateProof {
                    ln_pre: Some(ln_pre),
                    node: node_proof,
                    ln_post: Some(ln_post),
                })
            }
        }
    }

    /// The low nullifier for `key`: the live leaf with the greatest key
    /// strictly below it, or the sentinel when the tree is empty. Also
    /// returns its inclusion proof against the current tree.
    fn low_nullifier(
        &self,
        key: &BigUint,
        size: u64,
    ) -> Result<(BigUint, Node, Proof), TreeError> {
        if size == 0 {
            let ln_node = Node::empty();
            let proof = self.node_proof(&ln_node)?;
            return Ok((BigUint::default(), ln_node, proof));
        }

        let node_key = self.node_key(key)?;
        let Some((ln_key_bytes, ln_node_bytes)) = self.store.get_lt(&node_key)? else {
            return Err(TreeError::InvariantViolated(
                "non-empty tree has no low nullifier",
            ));
        };

        // The predecessor of a node key is always another node key; anything
        // else means the keyspace prefixes were violated.
        let ln_key = match ln_key_bytes.split_first() {
            Some((&PREFIX_NODE, rest)) if rest.len() == usize::from(self.fe_len) => {
                fe::from_bytes(rest)
            }
            _ => {
                return Err(TreeError::InvariantViolated(
                    "low nullifier key is not a node key",
                ))
            }
        };
        let ln_node = Node::from_bytes(&ln_node_bytes)?;
        let proof = self.node_proof(&ln_node)?;

        Ok((ln_key, ln_node, proof))
    }

    /// Write `node` under `node_key` and rebuild the hash path up to the
    /// root. On insertion the persisted size is bumped first and the node
    /// adopts it as its index.
    fn set_node(
        &mut self,
        node_key: &[u8],
        mut node: Node,
        insertion: bool,
    ) -> Result<Proof, TreeError> {
        let mut size = self.size()?;
        if insertion {
            size += 1;
            self.set_size(size)?;
            node.index = size;
        }

        self.store.set(node_key, &node.to_bytes()?)?;

        let mut hash = node.hash(&self.hasher)?;
        self.store
            .set(&hash_key(self.leaf_level, node.index), &fe::to_bytes(&hash))?;

        let mut sibling_hashes = vec![BigUint::default(); usize::from(self.leaf_level)];
        let mut index = node.index;
        let mut level = self.leaf_level;
        while level > 0 {
            let sibling_hash = self.level_hash(level, index ^ 1)?;

            hash = if index % 2 == 0 {
                self.hasher.hash(&[hash, sibling_hash.clone()])?
            } else {
                self.hasher.hash(&[sibling_hash.clone(), hash])?
            };
            sibling_hashes[usize::from(level) - 1] = sibling_hash;

            level -= 1;
            index /= 2;

            if level == 0 && index != 0 {
                return Err(TreeError::OverCapacity);
            }

            self.store.set(&hash_key(level, index), &fe::to_bytes(&hash))?;
        }

        Ok(Proof {
            root: hash,
            size,
            node,
            sibling_hashes,
        })
    }

    /// Read-only inclusion proof for `node` against the current tree.
    fn node_proof(&self, node: &Node) -> Result<Proof, TreeError> {
        let size = self.size()?;
        let root = self.root()?;

        let mut sibling_hashes = vec![BigUint::default(); usize::from(self.leaf_level)];
        let mut index = node.index;
        for level in (1..=self.leaf_level).rev() {
            sibling_hashes[usize::from(level) - 1] = self.level_hash(level, index ^ 1)?;
            index /= 2;
        }

        Ok(Proof {
            root,
            size,
            node: node.clone(),
            sibling_hashes,
        })
    }

    /// The stored hash at `(level, index)`, absent positions reading as the
    /// integer zero. Distinct from absent *leaves*, which read as the empty
    /// node: the two defaults are observable in proof contents and must not
    /// be conflated.
    fn level_hash(&self, level: u8, index: u64) -> Result<BigUint, TreeError> {
        Ok(self
            .store
            .get(&hash_key(level, index))?
            .map(|bytes| fe::from_bytes(&bytes))
            .unwrap_or_default())
    }

    /// Store key of the node record for `key`: the node prefix followed by
    /// the key zero-padded to `fe_len` bytes.
    fn node_key(&self, key: &BigUint) -> Result<Vec<u8>, TreeError> {
        let bytes = fe::to_bytes(key);
        let width = usize::from(self.fe_len);
        if bytes.len() > width {
            return Err(TreeError::KeyOutOfRange(self.fe_len));
        }

        let mut out = Vec::with_capacity(1 + width);
        out.push(PREFIX_NODE);
        out.resize(1 + width - bytes.len(), 0);
        out.extend_from_slice(&bytes);
        Ok(out)
    }

    fn set_size(&mut self, size: u64) -> Result<(), StoreError> {
        self.store.set(&SIZE_KEY, &fe::to_bytes(&BigUint::from(size)))
    }
}

impl<S: fmt::Debug, H> fmt::Debug for Tree<S, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("store", &self.store)
            .field("fe_len", &self.fe_len)
            .field("leaf_level", &self.leaf_level)
            .finish_non_exhaustive()
    }
}

/// Store key of the merkle hash at `(level, index)`.
fn hash_key(level: u8, index: u64) -> [u8; 10] {
    let mut out = [0u8; 10];
    out[0] = PREFIX_HASH;
    out[1] = level;
    out[2..].copy_from_slice(&index.to_be_bytes());
    out
}

/// Leaf positions at `leaf_level`, the sentinel's included.
fn capacity(leaf_level: u8) -> u64 {
    1 << leaf_level
}

fn decode_size(bytes: &[u8]) -> Result<u64, TreeError> {
    if bytes.len() > 8 {
        return Err(TreeError::InvariantViolated(
            "tree size record wider than u64",
        ));
    }
    Ok(bytes.iter().fold(0u64, |acc, &b| acc << 8 | u64::from(b)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Sha256Hasher;
    use imt_storage::MemStore;
    use test_case::test_case;

    fn tree(fe_len: u8, leaf_level: u8) -> Tree<MemStore, Sha256Hasher> {
        Tree::new(MemStore::new(), fe_len, leaf_level, Sha256Hasher).unwrap()
    }

    #[test_case(0, &[0, 0, 0, 0, 0]; "key zero is all padding")]
    #[test_case(1, &[0, 0, 0, 0, 1]; "one byte key")]
    #[test_case(0x0203, &[0, 0, 0, 0x02, 0x03]; "two byte key")]
    #[test_case(0x0102_0304, &[0, 0x01, 0x02, 0x03, 0x04]; "full width key")]
    fn node_key_pads_to_fe_len(key: u64, expected: &[u8]) {
        let tree = tree(4, 4);
        assert_eq!(tree.node_key(&BigUint::from(key)).unwrap(), expected);
    }

    #[test]
    fn node_key_rejects_wide_keys() {
        let tree = tree(2, 4);
        let err = tree.node_key(&BigUint::from(0x0102_03u32)).unwrap_err();
        assert!(matches!(err, TreeError::KeyOutOfRange(2)));
    }

    #[test]
    fn hash_key_layout() {
        assert_eq!(
            hash_key(3, 0x0102),
            [PREFIX_HASH, 3, 0, 0, 0, 0, 0, 0, 0x01, 0x02]
        );
    }

    #[test_case(&[], 0; "absent bytes decode as zero")]
    #[test_case(&[5], 5; "single byte")]
    #[test_case(&[1, 0], 256; "two bytes")]
    fn size_decoding(bytes: &[u8], expected: u64) {
        assert_eq!(decode_size(bytes).unwrap(), expected);
    }

    #[test]
    fn oversized_size_record_is_corruption() {
        assert!(matches!(
            decode_size(&[1; 9]),
            Err(TreeError::InvariantViolated(_))
        ));
    }

    #[test_case(0, 4; "fe_len too small")]
    #[test_case(65, 4; "fe_len too large")]
    #[test_case(32, 0; "leaf_level too small")]
    #[test_case(32, 64; "leaf_level too large")]
    fn configuration_ranges_are_enforced(fe_len: u8, leaf_level: u8) {
        let result = Tree::new(MemStore::new(), fe_len, leaf_level, Sha256Hasher);
        assert!(matches!(result, Err(TreeError::InvalidConfig(_))));
    }

    #[test]
    fn key_zero_is_rejected() {
        let mut tree = tree(32, 4);
        let err = tree
            .set(&BigUint::default(), &BigUint::from(1u8))
            .unwrap_err();
        assert!(matches!(err, TreeError::ReservedKey));
    }
}
