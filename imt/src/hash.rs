// Copyright (C) 2023, Ava Labs, Inc. All rights reserved.
// See the file LICENSE.md for licensing terms.

//! The injected hash capability.

use num_bigint::BigUint;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::fe;

/// Failure reported by an injected hash capability.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("hash function failed: {0}")]
pub struct HashError(pub String);

/// The compression function the tree hashes with: a sequence of field
/// elements in, one field element out.
///
/// Implemented for plain closures, so a capability can be injected as
/// `|inputs: &[BigUint]| -> Result<BigUint, HashError> { .. }`.
pub trait Hasher {
    /// Hash `inputs` into a single field element.
    ///
    /// Zero is a legitimate input: absent siblings hash in as the integer
    /// zero.
    fn hash(&self, inputs: &[BigUint]) -> Result<BigUint, HashError>;
}

impl<F> Hasher for F
where
    F: Fn(&[BigUint]) -> Result<BigUint, HashError>,
{
    fn hash(&self, inputs: &[BigUint]) -> Result<BigUint, HashError> {
        self(inputs)
    }
}

/// SHA-256 over the concatenated minimal big-endian bytes of the inputs.
///
/// Zero contributes no bytes, so hashing the empty node digests the empty
/// string.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256Hasher;

impl Hasher for Sha256Hasher {
    fn hash(&self, inputs: &[BigUint]) -> Result<BigUint, HashError> {
        let mut digest = Sha256::new();
        for input in inputs {
            digest.update(fe::to_bytes(input));
        }
        Ok(BigUint::from_bytes_be(&digest.finalize()))
    }
}
