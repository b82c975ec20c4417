//! ABI decoding of the claim contract's payout event.
//!
//! The event data is encoded as `(address claimant, uint256[][] entries)`.
//! Entry [`CLAIM_ENTRY_SLOT`] holds `[index, amount, ...]` for the manifest
//! row being claimed; this position is fixed by the emitting contract.

use num_bigint::BigUint;
use num_traits::Zero;
use serde::Serialize;

use crate::{error::ClaimsError, to_hex, Address, ZERO_ADDRESS};

/// Slot of the nested-array entry carrying the claimed manifest row.
pub const CLAIM_ENTRY_SLOT: usize = 6;
/// Position of the manifest index inside the claim entry.
pub const CLAIM_INDEX_POS: usize = 0;
/// Position of the claimed amount inside the claim entry.
pub const CLAIM_AMOUNT_POS: usize = 1;

const WORD: usize = 32;

/// Decoded event payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClaimPayload {
    #[serde(with = "crate::hex_address")]
    pub address: Address,
    pub index: u64,
    #[serde(with = "crate::decimal_string")]
    pub amount: BigUint,
}

impl ClaimPayload {
    /// Record returned for undecodable logs: zero address, zero index and
    /// amount. No owner can match it.
    pub fn sentinel() -> Self {
        Self {
            address: ZERO_ADDRESS,
            index: 0,
            amount: BigUint::zero(),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.address == ZERO_ADDRESS
    }
}

/// A claim log enriched with its position on chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimEvent {
    pub block_number: u64,
    pub transaction_hash: String,
    /// Unix seconds of the containing block, when the indexer supplied it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(with = "crate::hex_address")]
    pub address: Address,
    pub index: u64,
    #[serde(with = "crate::decimal_string")]
    pub amount: BigUint,
}

impl ClaimEvent {
    pub fn new(
        block_number: u64,
        transaction_hash: &str,
        timestamp: Option<i64>,
        payload: ClaimPayload,
    ) -> Self {
        Self {
            block_number,
            transaction_hash: transaction_hash.to_ascii_lowercase(),
            timestamp,
            address: payload.address,
            index: payload.index,
            amount: payload.amount,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.address == ZERO_ADDRESS
    }

    pub fn address_hex(&self) -> String {
        to_hex(&self.address)
    }
}

/// Decode a claim event's data field. Never fails: any decode error yields
/// [`ClaimPayload::sentinel`], which callers filter out.
pub fn decode_claim_event(data_hex: &str) -> ClaimPayload {
    try_decode_claim_event(data_hex).unwrap_or_else(|_| ClaimPayload::sentinel())
}

pub fn try_decode_claim_event(data_hex: &str) -> Result<ClaimPayload, ClaimsError> {
    let data = decode_hex_payload(data_hex)?;
    let (address, entries) = decode_address_uint_matrix(&data)?;

    let entry = entries
        .get(CLAIM_ENTRY_SLOT)
        .ok_or(ClaimsError::DecodeFailure("claim entry slot missing"))?;
    let index = entry
        .get(CLAIM_INDEX_POS)
        .ok_or(ClaimsError::DecodeFailure("claim index missing"))?;
    let amount = entry
        .get(CLAIM_AMOUNT_POS)
        .ok_or(ClaimsError::DecodeFailure("claim amount missing"))?;

    let index = u64::try_from(index).map_err(|_| ClaimsError::DecodeFailure("index exceeds u64"))?;

    Ok(ClaimPayload {
        address,
        index,
        amount: amount.clone(),
    })
}

/// Decode `(address, uint256[][])` from raw ABI bytes.
pub fn decode_address_uint_matrix(data: &[u8]) -> Result<(Address, Vec<Vec<BigUint>>), ClaimsError> {
    let head = word(data, 0)?;
    let mut address = [0u8; 20];
    address.copy_from_slice(&head[12..]);

    let outer = read_offset(data, WORD)?;
    let outer_len = read_length(data, outer)?;
    let heads = outer + WORD;

    let mut rows = Vec::with_capacity(outer_len);
    for i in 0..outer_len {
        let inner = heads
            .checked_add(read_offset(data, heads + i * WORD)?)
            .ok_or(ClaimsError::DecodeFailure("offset overflow"))?;
        let inner_len = read_length(data, inner)?;
        let values = (0..inner_len)
            .map(|j| word(data, inner + WORD + j * WORD).map(BigUint::from_bytes_be))
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(values);
    }

    Ok((address, rows))
}

fn decode_hex_payload(data_hex: &str) -> Result<Vec<u8>, ClaimsError> {
    let stripped = data_hex
        .strip_prefix("0x")
        .or_else(|| data_hex.strip_prefix("0X"))
        .unwrap_or(data_hex);
    hex::decode(stripped).map_err(|_| ClaimsError::DecodeFailure("payload is not hex"))
}

fn word(data: &[u8], offset: usize) -> Result<&[u8], ClaimsError> {
    let end = offset
        .checked_add(WORD)
        .ok_or(ClaimsError::DecodeFailure("offset overflow"))?;
    data.get(offset..end)
        .ok_or(ClaimsError::DecodeFailure("payload too short"))
}

/// Read a word that must fit a `usize` (offsets and lengths).
fn read_usize(data: &[u8], offset: usize) -> Result<usize, ClaimsError> {
    let w = word(data, offset)?;
    if w[..24].iter().any(|b| *b != 0) {
        return Err(ClaimsError::DecodeFailure("offset or length too large"));
    }
    let mut low = [0u8; 8];
    low.copy_from_slice(&w[24..]);
    usize::try_from(u64::from_be_bytes(low))
        .map_err(|_| ClaimsError::DecodeFailure("offset or length too large"))
}

fn read_offset(data: &[u8], at: usize) -> Result<usize, ClaimsError> {
    let offset = read_usize(data, at)?;
    if offset >= data.len() {
        return Err(ClaimsError::DecodeFailure("offset out of range"));
    }
    Ok(offset)
}

/// Read an array length and check that many words can follow it.
fn read_length(data: &[u8], at: usize) -> Result<usize, ClaimsError> {
    let len = read_usize(data, at)?;
    let available = data.len().saturating_sub(at + WORD) / WORD;
    if len > available {
        return Err(ClaimsError::DecodeFailure("array length exceeds payload"));
    }
    Ok(len)
}

/// Encode `(address, uint256[][])`. The inverse of
/// [`decode_address_uint_matrix`], used to build event fixtures.
pub fn encode_address_uint_matrix(address: &Address, rows: &[Vec<BigUint>]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut head = [0u8; WORD];
    head[12..].copy_from_slice(address);
    out.extend_from_slice(&head);
    out.extend_from_slice(&usize_word(2 * WORD));

    out.extend_from_slice(&usize_word(rows.len()));
    let mut tail = Vec::new();
    let mut offset = rows.len() * WORD;
    for row in rows {
        out.extend_from_slice(&usize_word(offset));
        tail.extend_from_slice(&usize_word(row.len()));
        for value in row {
            tail.extend_from_slice(&uint_word(value));
        }
        offset += WORD * (row.len() + 1);
    }
    out.extend_from_slice(&tail);
    out
}

/// Event data for a claim of manifest row `index` worth `amount`, with the
/// entry at [`CLAIM_ENTRY_SLOT`] and zero-filled entries before it.
pub fn encode_claim_event(address: &Address, index: u64, amount: &BigUint) -> Vec<u8> {
    let mut rows = vec![Vec::new(); CLAIM_ENTRY_SLOT];
    rows.push(vec![BigUint::from(index), amount.clone()]);
    encode_address_uint_matrix(address, &rows)
}

fn usize_word(value: usize) -> [u8; WORD] {
    let mut out = [0u8; WORD];
    out[24..].copy_from_slice(&(value as u64).to_be_bytes());
    out
}

fn uint_word(value: &BigUint) -> [u8; WORD] {
    let bytes = value.to_bytes_be();
    let bytes = &bytes[bytes.len().saturating_sub(WORD)..];
    let mut out = [0u8; WORD];
    out[WORD - bytes.len()..].copy_from_slice(bytes);
    out
}
