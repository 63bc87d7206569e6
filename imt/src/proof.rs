// Copyright (C) 2023, Ava Labs, Inc. All rights reserved.
// See the file LICENSE.md for licensing terms.

//! Proof objects and their verification.

use std::fmt;

use imt_storage::OrderedStore;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::fe;
use crate::hash::Hasher;
use crate::node::Node;
use crate::tree::{Tree, TreeError};

/// An inclusion proof for one leaf against the root it embeds.
///
/// The proof carries its own root, so callers can keep historical proofs and
/// verify them later against any tree configured with the same hash and leaf
/// level; verification never reads the tree's current root.
///
/// A valid proof on a leaf `L` with `L.key < k* < L.next_key` (or
/// `L.key < k*` with `L.next_key == 0`) doubles as a non-membership witness
/// for `k*`; checking that ordering against the proof's node fields is the
/// consumer's job.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// The root this proof commits to.
    pub root: BigUint,
    /// The live-leaf count at assembly time.
    pub size: u64,
    /// The leaf being proved.
    pub node: Node,
    /// One sibling hash per level, the leaf level's last.
    pub sibling_hashes: Vec<BigUint>,
}

impl Proof {
    /// Recompute the root from the node and sibling hashes and compare it
    /// with the embedded root.
    ///
    /// A mismatch is `Ok(false)`; `Err` is reserved for failures of the hash
    /// capability itself.
    pub fn is_valid<S, H>(&self, tree: &Tree<S, H>) -> Result<bool, TreeError>
    where
        S: OrderedStore,
        H: Hasher,
    {
        let mut hash = self.node.hash(tree.hasher())?;

        // An empty tree proves exactly one statement: the sentinel is the
        // root.
        if self.size == 0 {
            return Ok(self.node.is_empty() && hash == self.root);
        }

        if self.sibling_hashes.len() != usize::from(tree.leaf_level()) {
            return Ok(false);
        }

        let mut index = self.node.index;
        for sibling in self.sibling_hashes.iter().rev() {
            hash = if index % 2 == 0 {
                tree.hasher().hash(&[hash, sibling.clone()])?
            } else {
                tree.hasher().hash(&[sibling.clone(), hash])?
            };
            index /= 2;
        }

        Ok(hash == self.root)
    }
}

impl fmt::Debug for Proof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proof")
            .field("root", &hex::encode(fe::to_bytes(&self.root)))
            .field("size", &self.size)
            .field("node", &self.node)
            .field("levels", &self.sibling_hashes.len())
            .finish()
    }
}

/// The proofs of one [`Tree::set`]: the low nullifier before the mutation,
/// the written leaf after it, and the low nullifier after its relink.
///
/// Updates do not touch the chain, so both low-nullifier proofs are `None`.
/// For insertions, `ln_pre` commits to the pre-mutation root while `node`
/// and `ln_post` commit to roots after their respective writes; `ln_post`
/// carries the final, post-operation root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutateProof {
    /// Inclusion of the low nullifier in the pre-mutation tree; insertions
    /// only.
    pub ln_pre: Option<Proof>,
    /// Inclusion of the written leaf.
    pub node: Proof,
    /// Inclusion of the relinked low nullifier; insertions only.
    pub ln_post: Option<Proof>,
}

impl MutateProof {
    /// Require every present part to validate.
    pub fn is_valid<S, H>(&self, tree: &Tree<S, H>) -> Result<bool, TreeError>
    where
        S: OrderedStore,
        H: Hasher,
    {
        for ln in [&self.ln_pre, &self.ln_post].into_iter().flatten() {
            if !ln.is_valid(tree)? {
                return Ok(false);
            }
        }
        self.node.is_valid(tree)
    }
}
