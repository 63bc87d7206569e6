// Copyright (C) 2023, Ava Labs, Inc. All rights reserved.
// See the file LICENSE.md for licensing terms.

//! The leaf record and its persistent codec.

use std::fmt;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fe;
use crate::hash::{HashError, Hasher};

/// Widest permitted `value`/`next_key` payload: the length prefix is one byte.
pub const MAX_PAYLOAD_BYTES: usize = u8::MAX as usize;

/// Byte width of the serialized index prefix.
const INDEX_BYTES: usize = std::mem::size_of::<u64>();

/// A leaf record of the tree.
///
/// Live leaves double as links of a list sorted by key: `next_key` names the
/// smallest live key greater than this leaf's own, or zero at the tail. Index
/// 0 is reserved for the sentinel `{0, 0, 0}` heading that list; it also
/// stands in for any absent node.
///
/// Serialized as `be_u64(index) || len1(value) || value || len1(next_key) ||
/// next_key`, the payloads in minimal big-endian form.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Position within the leaf level; 1-based, assigned at insertion.
    pub index: u64,
    /// The payload stored under the leaf's key.
    pub value: BigUint,
    /// Key of the next-greater live leaf, or zero if none.
    pub next_key: BigUint,
}

/// A node field too wide for the one-byte length prefix.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{field} is {len} bytes, exceeding the 255-byte payload limit")]
pub struct EncodeError {
    /// Which field overflowed.
    pub field: &'static str,
    /// Its encoded width.
    pub len: usize,
}

/// Malformed persisted node bytes; indicates corruption.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeError {
    /// Fewer bytes than the index prefix plus a length byte.
    #[error("node record truncated at {0} bytes")]
    Truncated(usize),

    /// A length byte declaring more payload than remains.
    #[error("declared payload of {declared} bytes overruns the {remaining} remaining")]
    PayloadOverrun {
        /// The declared payload width.
        declared: usize,
        /// The bytes actually left in the record.
        remaining: usize,
    },
}

impl Node {
    /// The empty node `{0, 0, 0}`.
    #[must_use]
    pub fn empty() -> Self {
        Node {
            index: 0,
            value: BigUint::default(),
            next_key: BigUint::default(),
        }
    }

    /// True for the sentinel/empty record `{0, 0, 0}`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index == 0 && self.value.bits() == 0 && self.next_key.bits() == 0
    }

    /// Serialize into the persistent record format.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        let value = fe::to_bytes(&self.value);
        let next_key = fe::to_bytes(&self.next_key);

        let mut out = Vec::with_capacity(INDEX_BYTES + 2 + value.len() + next_key.len());
        out.extend_from_slice(&self.index.to_be_bytes());
        for (field, payload) in [("value", value), ("next_key", next_key)] {
            let len = u8::try_from(payload.len()).map_err(|_| EncodeError {
                field,
                len: payload.len(),
            })?;
            out.push(len);
            out.extend_from_slice(&payload);
        }
        Ok(out)
    }

    /// Deserialize a persistent record. Trailing bytes are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let index = bytes
            .get(..INDEX_BYTES)
            .and_then(|prefix| prefix.try_into().ok())
            .map(u64::from_be_bytes)
            .ok_or(DecodeError::Truncated(bytes.len()))?;

        let mut rest = &bytes[INDEX_BYTES..];
        let mut payload = || -> Result<BigUint, DecodeError> {
            let (&declared, tail) = rest
                .split_first()
                .ok_or(DecodeError::Truncated(bytes.len()))?;
            let declared = usize::from(declared);
            if tail.len() < declared {
                return Err(DecodeError::PayloadOverrun {
                    declared,
                    remaining: tail.len(),
                });
            }
            let (bytes, tail) = tail.split_at(declared);
            rest = tail;
            Ok(fe::from_bytes(bytes))
        };

        let value = payload()?;
        let next_key = payload()?;

        Ok(Node {
            index,
            value,
            next_key,
        })
    }

    /// The record's hash: `H([index, value, next_key])`, the index widened to
    /// a field element.
    pub fn hash<H: Hasher>(&self, hasher: &H) -> Result<BigUint, HashError> {
        hasher.hash(&[
            BigUint::from(self.index),
            self.value.clone(),
            self.next_key.clone(),
        ])
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[Node index={} value={} next_key={}]",
            self.index, self.value, self.next_key
        )
    }
}
