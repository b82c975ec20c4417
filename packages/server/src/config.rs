//! Claim-source configuration: one entry per energy-field payout round.

use std::{collections::HashSet, path::Path};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use royalty_claims_core::{parse_address, parse_hash, DEFAULT_DECIMALS};

/// Everything needed to verify and reconcile one claims manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimSource {
    /// Unique, URL-safe name (used in API paths).
    pub name: String,
    /// Gateway URL of the CSV manifest; its last path segment is the content id.
    pub manifest_url: String,
    /// Content id the manifest is expected to carry.
    pub content_id: String,
    /// On-chain anchored Merkle root (0x-prefixed). All zeros for sources
    /// that predate anchoring.
    pub merkle_root: String,
    /// Contract emitting claim events.
    pub contract_address: String,
    /// topic0 of the claim event.
    pub event_topic: String,
    pub from_block: u64,
    pub to_block: u64,
    /// Log indexer endpoint; falls back to the server-wide default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexer_url: Option<String>,
    #[serde(default = "default_decimals")]
    pub decimals: u32,
    /// Restrict claim logs to these transaction hashes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_filter: Option<Vec<String>>,
}

fn default_decimals() -> u32 {
    DEFAULT_DECIMALS
}

/// Load and validate a JSON array of claim sources.
pub fn load_sources(path: &Path) -> Result<Vec<ClaimSource>> {
    let raw = std::fs::read(path)
        .with_context(|| format!("failed reading claim sources from {}", path.display()))?;
    let sources: Vec<ClaimSource> = serde_json::from_slice(&raw)
        .with_context(|| format!("invalid claim sources file {}", path.display()))?;
    validate_sources(&sources)?;
    Ok(sources)
}

/// Sources are totalled together in one portfolio, so they must all pay out
/// the same token precision.
pub fn validate_sources(sources: &[ClaimSource]) -> Result<()> {
    let mut names = HashSet::new();
    let decimals = sources.first().map(|s| s.decimals);
    for source in sources {
        if source.name.trim().is_empty() {
            bail!("claim source with empty name");
        }
        if !names.insert(source.name.as_str()) {
            bail!("duplicate claim source name: {}", source.name);
        }
        if source.from_block > source.to_block {
            bail!(
                "claim source {}: fromBlock {} is after toBlock {}",
                source.name,
                source.from_block,
                source.to_block
            );
        }
        if parse_hash(&source.merkle_root).is_none() {
            bail!("claim source {}: merkleRoot must be 32 bytes of hex", source.name);
        }
        if parse_address(&source.contract_address).is_none() {
            bail!("claim source {}: invalid contractAddress", source.name);
        }
        if parse_hash(&source.event_topic).is_none() {
            bail!("claim source {}: eventTopic must be 32 bytes of hex", source.name);
        }
        if Some(source.decimals) != decimals {
            bail!(
                "claim source {}: decimals {} differ from the other sources ({})",
                source.name,
                source.decimals,
                decimals.unwrap_or_default()
            );
        }
    }
    Ok(())
}
