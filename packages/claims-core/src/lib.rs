//! Claims verification and payout accounting for energy-royalty tokens.
//!
//! Everything in this crate is pure and synchronous: manifest parsing, the
//! Merkle tree the claim contract anchors on-chain, claim-event ABI decoding
//! and the claimed/unclaimed reconciliation. Network access lives in the
//! server crate.

pub mod abi;
pub mod error;
pub mod integrity;
pub mod manifest;
pub mod merkle;
pub mod reconcile;
pub mod units;

pub use abi::{
    decode_claim_event, encode_claim_event, try_decode_claim_event, ClaimEvent, ClaimPayload,
};
pub use error::ClaimsError;
pub use integrity::{
    content_id_from_url, is_zero_root, validate_content_id, validate_manifest_integrity,
    ContentCheck, IntegrityReport,
};
pub use manifest::{parse_manifest_csv, ManifestRecord, ManifestRow};
pub use merkle::{leaf_for, row_leaf, verify_proof, MerkleProof, SimpleMerkleTree};
pub use reconcile::{
    reconcile_claims, reconcile_claims_with_decimals, ClaimRecord, ClaimedRow, HoldingRecord,
    ReconciledClaims,
};
pub use units::format_units;

/// 32-byte hash (keccak256 output, Merkle nodes, roots).
pub type Hash = [u8; 32];

/// 20-byte account address.
pub type Address = [u8; 20];

/// Expected-root sentinel for claim sources that predate on-chain anchoring.
pub const ZERO_ROOT: Hash = [0u8; 32];

/// Zero address, used as the "decode failed" marker on claim events.
pub const ZERO_ADDRESS: Address = [0u8; 20];

/// Decimals of the payout token (wei-denominated amounts).
pub const DEFAULT_DECIMALS: u32 = 18;

pub fn keccak256(data: &[u8]) -> Hash {
    use tiny_keccak::{Hasher, Keccak};
    let mut keccak = Keccak::v256();
    keccak.update(data);
    let mut out = [0u8; 32];
    keccak.finalize(&mut out);
    out
}

/// Render bytes as a lowercase 0x-prefixed hex string.
pub fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Parse a 0x-prefixed 20-byte address. Mixed case is accepted; checksums
/// are not enforced.
pub fn parse_address(s: &str) -> Option<Address> {
    let stripped = strip_hex_prefix(s)?;
    if stripped.len() != 40 {
        return None;
    }
    let bytes = hex::decode(stripped).ok()?;
    let mut out = [0u8; 20];
    out.copy_from_slice(&bytes);
    Some(out)
}

/// Parse a 0x-prefixed 32-byte hash.
pub fn parse_hash(s: &str) -> Option<Hash> {
    let stripped = strip_hex_prefix(s.trim())?;
    if stripped.len() != 64 {
        return None;
    }
    let bytes = hex::decode(stripped).ok()?;
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Some(out)
}

fn strip_hex_prefix(s: &str) -> Option<&str> {
    s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))
}

/// Serde adapter writing big integers as decimal strings, so amounts survive
/// JSON consumers that would otherwise round them through a double.
pub mod decimal_string {
    use num_bigint::BigUint;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_str_radix(10))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let s = String::deserialize(deserializer)?;
        BigUint::parse_bytes(s.as_bytes(), 10)
            .ok_or_else(|| D::Error::custom(format!("invalid decimal integer: {s}")))
    }
}

pub mod hex_address {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    use crate::Address;

    pub fn serialize<S: Serializer>(value: &Address, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&crate::to_hex(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Address, D::Error> {
        let s = String::deserialize(deserializer)?;
        crate::parse_address(&s).ok_or_else(|| D::Error::custom(format!("invalid address: {s}")))
    }
}

pub mod hex_hash {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    use crate::Hash;

    pub fn serialize<S: Serializer>(value: &Hash, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&crate::to_hex(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Hash, D::Error> {
        let s = String::deserialize(deserializer)?;
        crate::parse_hash(&s).ok_or_else(|| D::Error::custom(format!("invalid hash: {s}")))
    }
}
