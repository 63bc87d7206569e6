// Copyright (C) 2023, Ava Labs, Inc. All rights reserved.
// See the file LICENSE.md for licensing terms.
#![warn(missing_debug_implementations, rust_2018_idioms, missing_docs)]
#![forbid(unsafe_code)]

//! # imt: an indexed merkle tree over ordered key/value storage
//!
//! A sparse merkle accumulator whose leaves additionally form a singly
//! linked list sorted by key (the low-nullifier chain). Inclusion of a key
//! is proved the usual way; *non*-inclusion of a key is proved by an
//! inclusion proof of its predecessor in the sort order, whose `next_key`
//! jumps past the missing key.
//!
//! The two heavy collaborators are injected: persistence is any
//! [`storage::OrderedStore`] (ordered byte keys, point and predecessor
//! reads, an atomic write batch) and hashing is any [`Hasher`] (field
//! elements in, field element out). Field elements are unbounded
//! non-negative integers ([`num_bigint::BigUint`]).
//!
//! ```
//! use imt::{Sha256Hasher, Tree};
//! use imt::storage::MemStore;
//! use num_bigint::BigUint;
//!
//! # fn main() -> Result<(), imt::TreeError> {
//! let mut tree = Tree::new(MemStore::new(), 32, 4, Sha256Hasher)?;
//!
//! let proof = tree.set(&BigUint::from(1u8), &BigUint::from(5u8))?;
//! assert!(proof.is_valid(&tree)?);
//! assert_eq!(tree.size()?, 1);
//! # Ok(())
//! # }
//! ```

pub mod fe;
pub mod hash;
pub mod node;
pub mod proof;
pub mod tree;

pub use hash::{HashError, Hasher, Sha256Hasher};
pub use node::Node;
pub use proof::{MutateProof, Proof};
pub use tree::{Tree, TreeError};

pub use imt_storage as storage;
