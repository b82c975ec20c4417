//! Per-source claims pipeline and the portfolio scatter-gather.
//!
//! For each claim source: manifest fetch → integrity gate → claim-log scan →
//! decode → reconciliation. Sources are independent and run concurrently;
//! reconciliation itself is pure.

use std::sync::Arc;

use num_bigint::BigUint;
use serde::Serialize;
use tokio::task::JoinSet;

use royalty_claims_core::{
    format_units, reconcile::reconcile_claims_with_decimals, row_leaf, ClaimsError, ManifestRow,
    MerkleProof, ReconciledClaims, SimpleMerkleTree, DEFAULT_DECIMALS,
};

use crate::{
    cache::TtlCache,
    chain::{decode_claim_logs, IndexerClient, LogQuery},
    config::ClaimSource,
    manifest::{try_fetch_and_validate_manifest, VerifiedManifest},
};

/// How complete a source's reconciliation is.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Ok,
    /// The manifest could not be fetched or failed verification; totals are zero.
    NoManifest,
    /// The log scan stopped early; some claims may show as unclaimed.
    PartialLogs,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceClaims {
    pub source: String,
    pub status: SourceStatus,
    pub integrity_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub result: ReconciledClaims,
}

/// Reconciled claims across every configured source for one wallet.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub owner_address: String,
    pub sources: Vec<SourceClaims>,
    #[serde(with = "royalty_claims_core::decimal_string")]
    pub total_claimed_amount: BigUint,
    #[serde(with = "royalty_claims_core::decimal_string")]
    pub total_unclaimed_amount: BigUint,
    #[serde(with = "royalty_claims_core::decimal_string")]
    pub total_earned: BigUint,
    /// `total_earned` in decimal display units.
    pub total_earned_display: String,
}

/// Claim proof for one unclaimed manifest row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnclaimedProof {
    pub index: u64,
    #[serde(with = "royalty_claims_core::decimal_string")]
    pub amount: BigUint,
    #[serde(flatten)]
    pub proof: MerkleProof,
}

pub struct ClaimsPipeline {
    http: reqwest::Client,
    default_indexer_url: String,
    /// Verified manifests keyed by source name. Manifests are content
    /// addressed, so a hit never goes stale in substance; the TTL bounds memory.
    manifests: TtlCache<String, Arc<VerifiedManifest>>,
}

impl ClaimsPipeline {
    pub fn new(
        http: reqwest::Client,
        default_indexer_url: String,
        manifests: TtlCache<String, Arc<VerifiedManifest>>,
    ) -> Self {
        Self {
            http,
            default_indexer_url,
            manifests,
        }
    }

    pub fn invalidate_manifest(&self, source: &str) -> bool {
        self.manifests.invalidate(&source.to_string())
    }

    pub async fn load_manifest(
        &self,
        source: &ClaimSource,
    ) -> Result<Arc<VerifiedManifest>, ClaimsError> {
        if let Some(hit) = self.manifests.get(&source.name) {
            return Ok(hit);
        }
        let manifest = Arc::new(
            try_fetch_and_validate_manifest(
                &self.http,
                &source.manifest_url,
                &source.merkle_root,
                &source.content_id,
            )
            .await?,
        );
        self.manifests.insert(source.name.clone(), manifest.clone());
        Ok(manifest)
    }

    pub async fn reconcile_source(&self, source: &ClaimSource, owner: &str) -> SourceClaims {
        let manifest = match self.load_manifest(source).await {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(source = %source.name, kind = e.kind(), error = %e, "no claims from source");
                return SourceClaims {
                    source: source.name.clone(),
                    status: SourceStatus::NoManifest,
                    integrity_verified: false,
                    error: Some(e.to_string()),
                    result: reconcile_claims_with_decimals(&[], &[], owner, source.decimals),
                };
            }
        };

        let indexer = IndexerClient::with_http(
            self.http.clone(),
            source
                .indexer_url
                .clone()
                .unwrap_or_else(|| self.default_indexer_url.clone()),
        );
        let logs = indexer
            .fetch_claim_logs(&LogQuery {
                contract_address: &source.contract_address,
                event_topic: &source.event_topic,
                from_block: source.from_block,
                to_block: source.to_block,
                transaction_filter: source.transaction_filter.as_deref(),
            })
            .await;
        let events = decode_claim_logs(&logs.items);

        let result =
            reconcile_claims_with_decimals(&manifest.rows, &events, owner, source.decimals);
        tracing::info!(
            source = %source.name,
            owner,
            claimed = result.claimed_rows.len(),
            unclaimed = result.unclaimed_rows.len(),
            "source reconciled"
        );

        let (status, error) = match logs.interrupted {
            Some(reason) => (SourceStatus::PartialLogs, Some(reason)),
            None => (SourceStatus::Ok, None),
        };
        SourceClaims {
            source: source.name.clone(),
            status,
            integrity_verified: manifest.integrity_verified,
            error,
            result,
        }
    }

    /// Merkle proofs for `owner`'s unclaimed rows in `source`.
    pub async fn unclaimed_proofs(
        &self,
        source: &ClaimSource,
        owner: &str,
    ) -> Result<Vec<UnclaimedProof>, ClaimsError> {
        let manifest = self.load_manifest(source).await?;
        let claims = self.reconcile_source(source, owner).await;
        unclaimed_proofs_for(&manifest.rows, &claims.result.unclaimed_rows)
    }
}

/// Proofs for `unclaimed` within the tree built over all `rows`.
pub fn unclaimed_proofs_for(
    rows: &[ManifestRow],
    unclaimed: &[ManifestRow],
) -> Result<Vec<UnclaimedProof>, ClaimsError> {
    if unclaimed.is_empty() {
        return Ok(Vec::new());
    }
    let tree = SimpleMerkleTree::from_rows(rows).ok_or(ClaimsError::LeafNotFound)?;
    unclaimed
        .iter()
        .map(|row| {
            Ok(UnclaimedProof {
                index: row.index,
                amount: row.amount.clone(),
                proof: tree.proof_for(&row_leaf(row))?,
            })
        })
        .collect()
}

/// Reconcile `owner` against every source concurrently and total the results.
/// Source order in the output follows `sources`.
pub async fn build_portfolio(
    pipeline: Arc<ClaimsPipeline>,
    sources: &[ClaimSource],
    owner: &str,
) -> Portfolio {
    // Sources share one token precision; see `config::validate_sources`.
    let decimals = sources.first().map_or(DEFAULT_DECIMALS, |s| s.decimals);

    let mut tasks = JoinSet::new();
    for (i, source) in sources.iter().cloned().enumerate() {
        let pipeline = pipeline.clone();
        let owner = owner.to_string();
        tasks.spawn(async move { (i, pipeline.reconcile_source(&source, &owner).await) });
    }

    let mut results = Vec::with_capacity(sources.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(result) => results.push(result),
            Err(e) => tracing::error!(error = %e, "claims pipeline task failed"),
        }
    }
    results.sort_by_key(|(i, _)| *i);
    let sources: Vec<SourceClaims> = results.into_iter().map(|(_, s)| s).collect();

    let total_claimed_amount: BigUint = sources
        .iter()
        .map(|s| &s.result.total_claimed_amount)
        .sum();
    let total_unclaimed_amount: BigUint = sources
        .iter()
        .map(|s| &s.result.total_unclaimed_amount)
        .sum();
    let total_earned = &total_claimed_amount + &total_unclaimed_amount;

    Portfolio {
        owner_address: owner.trim().to_ascii_lowercase(),
        sources,
        total_earned_display: format_units(&total_earned, decimals),
        total_claimed_amount,
        total_unclaimed_amount,
        total_earned,
    }
}
