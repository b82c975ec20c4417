//! Payout manifests: the CSV entitlement table published per claim source.
//!
//! Header names are matched case-insensitively once, here, so every other
//! component sees the canonical [`ManifestRow`] shape.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::{error::ClaimsError, parse_address, to_hex, Address};

pub const FIELD_INDEX: &str = "index";
pub const FIELD_ADDRESS: &str = "address";
pub const FIELD_AMOUNT: &str = "amount";

const UINT256_BITS: u64 = 256;

/// One payout entitlement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRow {
    pub index: u64,
    #[serde(with = "crate::hex_address")]
    pub address: Address,
    /// Minor units (wei).
    #[serde(with = "crate::decimal_string")]
    pub amount: BigUint,
}

impl ManifestRow {
    pub fn new(index: u64, address: Address, amount: impl Into<BigUint>) -> Self {
        Self {
            index,
            address,
            amount: amount.into(),
        }
    }

    /// Normalize a raw record. `row` is the zero-based data row position and
    /// only feeds error messages.
    pub fn from_record(row: usize, record: &ManifestRecord) -> Result<Self, ClaimsError> {
        let index_raw = record.require(row, FIELD_INDEX)?;
        let address_raw = record.require(row, FIELD_ADDRESS)?;
        let amount_raw = record.require(row, FIELD_AMOUNT)?;

        let address = parse_address(address_raw).ok_or_else(|| ClaimsError::InvalidAddress {
            row,
            value: address_raw.to_string(),
        })?;
        let amount = parse_unsigned(amount_raw).ok_or_else(|| ClaimsError::InvalidAmount {
            row,
            value: amount_raw.to_string(),
        })?;
        let index = index_raw
            .parse::<u64>()
            .ok()
            .filter(|_| is_decimal(index_raw))
            .ok_or_else(|| ClaimsError::InvalidIndex {
                row,
                value: index_raw.to_string(),
            })?;

        Ok(Self {
            index,
            address,
            amount,
        })
    }

    pub fn address_hex(&self) -> String {
        to_hex(&self.address)
    }
}

/// A raw manifest line keyed by header name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ManifestRecord {
    fields: Vec<(String, String)>,
}

impl ManifestRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.fields.push((name.to_string(), value.to_string()));
        self
    }

    /// Case-insensitive field lookup (`Index`, `INDEX` and `index` all match).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Like [`get`](Self::get), but blank values count as absent.
    fn require(&self, row: usize, field: &'static str) -> Result<&str, ClaimsError> {
        self.get(field)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(ClaimsError::MissingField { row, field })
    }
}

/// Parse a manifest body: a comma-separated header line followed by one
/// record per non-blank line, split positionally. Quoting is not supported;
/// manifests carry only integers and hex strings.
pub fn parse_manifest_csv(body: &str) -> Result<Vec<ManifestRecord>, ClaimsError> {
    let body = body.trim_start_matches('\u{feff}');
    let mut lines = body.lines().map(|l| l.trim_end_matches('\r'));

    let header_line = lines
        .by_ref()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| ClaimsError::MalformedManifest("empty body".into()))?;
    let headers: Vec<String> = header_line
        .split(',')
        .map(|h| h.trim().to_string())
        .collect();

    let records = lines
        .filter(|l| !l.trim().is_empty())
        .map(|line| ManifestRecord {
            fields: headers
                .iter()
                .cloned()
                .zip(line.split(',').map(|v| v.trim().to_string()))
                .collect(),
        })
        .collect();

    Ok(records)
}

/// Parse a decimal uint256. Wider values are rejected: they cannot be packed
/// into a leaf without colliding with their low 256 bits.
fn parse_unsigned(s: &str) -> Option<BigUint> {
    if !is_decimal(s) {
        return None;
    }
    BigUint::parse_bytes(s.as_bytes(), 10).filter(|v| v.bits() <= UINT256_BITS)
}

fn is_decimal(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
