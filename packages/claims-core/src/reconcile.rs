//! Claimed/unclaimed reconciliation of a manifest against on-chain claim
//! events for one wallet.

use std::collections::HashMap;

use num_bigint::BigUint;
use serde::Serialize;

use crate::{
    abi::ClaimEvent, manifest::ManifestRow, parse_address, units::format_units, DEFAULT_DECIMALS,
};

pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_PRODUCING: &str = "producing";

/// A manifest row with the claim event that settled it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimedRow {
    #[serde(flatten)]
    pub row: ManifestRow,
    pub decoded_log: ClaimEvent,
}

/// Claim-history entry for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRecord {
    pub index: u64,
    /// `YYYY-MM-DD` of the claim block, if its timestamp is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Decimal display units.
    pub amount: String,
    pub tx_hash: String,
    pub status: &'static str,
}

/// Unclaimed payout entry for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingRecord {
    pub index: u64,
    pub unclaimed_amount: String,
    pub total_earned: String,
    pub status: &'static str,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciledClaims {
    pub claimed_rows: Vec<ClaimedRow>,
    pub unclaimed_rows: Vec<ManifestRow>,
    pub claims: Vec<ClaimRecord>,
    pub holdings: Vec<HoldingRecord>,
    #[serde(with = "crate::decimal_string")]
    pub total_claimed_amount: BigUint,
    #[serde(with = "crate::decimal_string")]
    pub total_unclaimed_amount: BigUint,
    #[serde(with = "crate::decimal_string")]
    pub total_earned: BigUint,
    pub owner_address: String,
}

/// Split `owner`'s manifest rows into claimed and unclaimed using `logs`, with
/// amounts displayed in 18-decimal units.
pub fn reconcile_claims(rows: &[ManifestRow], logs: &[ClaimEvent], owner: &str) -> ReconciledClaims {
    reconcile_claims_with_decimals(rows, logs, owner, DEFAULT_DECIMALS)
}

pub fn reconcile_claims_with_decimals(
    rows: &[ManifestRow],
    logs: &[ClaimEvent],
    owner: &str,
    decimals: u32,
) -> ReconciledClaims {
    let owner_bytes = parse_address(owner);
    let is_owner = |address: &[u8; 20]| owner_bytes.as_ref() == Some(address);

    // First event per index wins; later duplicates carry no extra information.
    let mut claimed_by_index: HashMap<u64, &ClaimEvent> = HashMap::new();
    for log in logs
        .iter()
        .filter(|log| !log.is_sentinel() && is_owner(&log.address))
    {
        claimed_by_index.entry(log.index).or_insert(log);
    }

    let mut claimed_rows = Vec::new();
    let mut unclaimed_rows = Vec::new();
    for row in rows.iter().filter(|row| is_owner(&row.address)) {
        match claimed_by_index.get(&row.index) {
            Some(log) => claimed_rows.push(ClaimedRow {
                row: row.clone(),
                decoded_log: (*log).clone(),
            }),
            None => unclaimed_rows.push(row.clone()),
        }
    }

    let total_claimed_amount: BigUint = claimed_rows.iter().map(|c| &c.row.amount).sum();
    let total_unclaimed_amount: BigUint = unclaimed_rows.iter().map(|r| &r.amount).sum();
    let total_earned = &total_claimed_amount + &total_unclaimed_amount;

    let claims = claimed_rows
        .iter()
        .map(|c| ClaimRecord {
            index: c.row.index,
            date: c.decoded_log.timestamp.and_then(format_date),
            amount: format_units(&c.row.amount, decimals),
            tx_hash: c.decoded_log.transaction_hash.clone(),
            status: STATUS_COMPLETED,
        })
        .collect();

    let holdings = unclaimed_rows
        .iter()
        .map(|r| {
            let amount = format_units(&r.amount, decimals);
            HoldingRecord {
                index: r.index,
                unclaimed_amount: amount.clone(),
                total_earned: amount,
                status: STATUS_PRODUCING,
            }
        })
        .collect();

    ReconciledClaims {
        claimed_rows,
        unclaimed_rows,
        claims,
        holdings,
        total_claimed_amount,
        total_unclaimed_amount,
        total_earned,
        owner_address: owner.trim().to_ascii_lowercase(),
    }
}

fn format_date(timestamp: i64) -> Option<String> {
    chrono::DateTime::from_timestamp(timestamp, 0).map(|dt| dt.format("%Y-%m-%d").to_string())
}
