// Copyright (C) 2023, Ava Labs, Inc. All rights reserved.
// See the file LICENSE.md for licensing terms.

//! Minimal big-endian encoding of field elements.
//!
//! A field element is an unbounded non-negative integer. Everywhere one is
//! persisted (node payloads, sibling hashes, the tree size) it is written
//! as its big-endian bytes with every leading zero stripped, so the integer
//! zero is the empty byte string. `BigUint::to_bytes_be` returns `[0]` for
//! zero instead, which is why the convention is pinned down here.

use num_bigint::BigUint;

/// Minimal big-endian bytes of `fe`; empty for zero.
#[must_use]
pub fn to_bytes(fe: &BigUint) -> Vec<u8> {
    if fe.bits() == 0 {
        Vec::new()
    } else {
        fe.to_bytes_be()
    }
}

/// Parse big-endian bytes into a field element; the empty string is zero.
#[must_use]
pub fn from_bytes(bytes: &[u8]) -> BigUint {
    BigUint::from_bytes_be(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0, &[]; "zero is empty")]
    #[test_case(1, &[1]; "one byte")]
    #[test_case(0x1234, &[0x12, 0x34]; "two bytes")]
    #[test_case(0x0100, &[1, 0]; "trailing zero kept")]
    fn round_trip(value: u64, encoded: &[u8]) {
        let fe = BigUint::from(value);
        assert_eq!(to_bytes(&fe), encoded);
        assert_eq!(from_bytes(encoded), fe);
    }

    #[test]
    fn leading_zeros_parse_to_the_same_element() {
        assert_eq!(from_bytes(&[0, 0, 7]), BigUint::from(7u8));
    }
}
