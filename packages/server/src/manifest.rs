//! Manifest retrieval from the content-addressed gateway, gated on content-id
//! and Merkle root checks.

use royalty_claims_core::{
    is_zero_root, parse_manifest_csv, validate_content_id, validate_manifest_integrity,
    ClaimsError, ContentCheck, ManifestRow,
};
use serde::Serialize;

/// Manifest rows that passed the integrity gate.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedManifest {
    pub rows: Vec<ManifestRow>,
    /// Root rebuilt from `rows`.
    pub merkle_root: String,
    /// False when the rows were accepted through the zero-root escape hatch
    /// without matching an anchored root.
    pub integrity_verified: bool,
}

/// Check that `url` names `expected_content_id` and that the gateway serves
/// it. The response body is discarded.
pub async fn validate_content_address(
    http: &reqwest::Client,
    url: &str,
    expected_content_id: &str,
) -> ContentCheck {
    ContentCheck::from_result(try_validate_content_address(http, url, expected_content_id).await)
}

pub async fn try_validate_content_address(
    http: &reqwest::Client,
    url: &str,
    expected_content_id: &str,
) -> Result<String, ClaimsError> {
    let content_id = validate_content_id(url, expected_content_id)?;
    let resp = http
        .get(url)
        .send()
        .await
        .map_err(|e| ClaimsError::NetworkFailure(e.to_string()))?;
    if !resp.status().is_success() {
        return Err(ClaimsError::ContentUnreachable {
            status: resp.status().as_u16(),
        });
    }
    Ok(content_id)
}

/// Fetch, parse and verify a manifest.
///
/// A root mismatch is tolerated only when `expected_merkle_root` is the
/// all-zero sentinel; the rows then come back with `integrity_verified` unset.
pub async fn try_fetch_and_validate_manifest(
    http: &reqwest::Client,
    url: &str,
    expected_merkle_root: &str,
    expected_content_id: &str,
) -> Result<VerifiedManifest, ClaimsError> {
    try_validate_content_address(http, url, expected_content_id).await?;

    let resp = http
        .get(url)
        .send()
        .await
        .map_err(|e| ClaimsError::NetworkFailure(e.to_string()))?;
    if !resp.status().is_success() {
        return Err(ClaimsError::ContentUnreachable {
            status: resp.status().as_u16(),
        });
    }
    let body = resp
        .text()
        .await
        .map_err(|e| ClaimsError::NetworkFailure(e.to_string()))?;

    let records = parse_manifest_csv(&body)?;
    let report = validate_manifest_integrity(&records, expected_merkle_root);
    let merkle_root = report.merkle_root.clone().unwrap_or_default();

    match report.error {
        None => Ok(VerifiedManifest {
            rows: report.rows,
            merkle_root,
            integrity_verified: true,
        }),
        Some(ClaimsError::MerkleRootMismatch { .. }) if is_zero_root(expected_merkle_root) => {
            tracing::warn!(
                url,
                computed_root = %merkle_root,
                "accepting manifest without anchored merkle root"
            );
            Ok(VerifiedManifest {
                rows: report.rows,
                merkle_root,
                integrity_verified: false,
            })
        }
        Some(e) => Err(e),
    }
}

/// Boundary form of [`try_fetch_and_validate_manifest`]: any failure becomes
/// `None`, which callers read as "no claims from this source".
pub async fn fetch_and_validate_manifest(
    http: &reqwest::Client,
    url: &str,
    expected_merkle_root: &str,
    expected_content_id: &str,
) -> Option<Vec<ManifestRow>> {
    match try_fetch_and_validate_manifest(http, url, expected_merkle_root, expected_content_id).await
    {
        Ok(manifest) => Some(manifest.rows),
        Err(e) => {
            tracing::warn!(url, kind = e.kind(), error = %e, "manifest rejected");
            None
        }
    }
}
