//! Integrity gate for fetched manifests: content-id matching and Merkle root
//! reconstruction against the on-chain anchored value.

use std::collections::HashSet;

use serde::Serialize;

use crate::{
    error::ClaimsError,
    manifest::{ManifestRecord, ManifestRow},
    merkle::SimpleMerkleTree,
    parse_hash, to_hex, ZERO_ROOT,
};

/// Outcome of the content-id comparison.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentCheck {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Trailing path segment of a gateway URL, ignoring query, fragment and a
/// trailing slash.
///
/// e.g. `https://gw.example/ipfs/bafy...xyz?download=1` → `bafy...xyz`
pub fn content_id_from_url(url: &str) -> Option<&str> {
    let end = url.find(|c: char| c == '?' || c == '#').unwrap_or(url.len());
    let path = url[..end].trim_end_matches('/');
    let scheme_end = path.find("://").map(|i| i + 3).unwrap_or(0);
    let (_, tail) = path[scheme_end..].rsplit_once('/')?;
    (!tail.is_empty()).then_some(tail)
}

/// Compare the id embedded in `url` with `expected_content_id`. The network
/// reachability half of the check lives with the HTTP client.
pub fn validate_content_id(url: &str, expected_content_id: &str) -> Result<String, ClaimsError> {
    let actual = content_id_from_url(url).unwrap_or_default();
    if actual != expected_content_id.trim() {
        return Err(ClaimsError::ContentMismatch {
            expected: expected_content_id.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(actual.to_string())
}

impl ContentCheck {
    pub fn from_result(result: Result<String, ClaimsError>) -> Self {
        match result {
            Ok(content_id) => Self {
                is_valid: true,
                content_id: Some(content_id),
                error: None,
            },
            Err(e) => Self {
                is_valid: false,
                content_id: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Outcome of manifest validation and root reconstruction.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityReport {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merkle_root: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_merkle_root: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ClaimsError>,
    /// Normalized rows; populated whenever every row passed field validation,
    /// even if the root then mismatched.
    #[serde(skip)]
    pub rows: Vec<ManifestRow>,
}

impl IntegrityReport {
    fn failed(error: ClaimsError) -> Self {
        Self {
            is_valid: false,
            merkle_root: None,
            expected_merkle_root: None,
            error: Some(error),
            rows: Vec::new(),
        }
    }

    pub fn into_result(self) -> Result<Vec<ManifestRow>, ClaimsError> {
        match self.error {
            None => Ok(self.rows),
            Some(e) => Err(e),
        }
    }
}

/// Validate every record, rebuild the tree and compare its root with
/// `expected_merkle_root` (case-insensitive hex).
pub fn validate_manifest_integrity(
    records: &[ManifestRecord],
    expected_merkle_root: &str,
) -> IntegrityReport {
    if records.is_empty() {
        return IntegrityReport::failed(ClaimsError::MalformedManifest(
            "manifest has no rows".into(),
        ));
    }

    let rows = match records
        .iter()
        .enumerate()
        .map(|(i, record)| ManifestRow::from_record(i, record))
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(rows) => rows,
        Err(e) => return IntegrityReport::failed(e),
    };

    let mut seen = HashSet::with_capacity(rows.len());
    if let Some((row, dup)) = rows.iter().enumerate().find(|(_, r)| !seen.insert(r.index)) {
        return IntegrityReport::failed(ClaimsError::DuplicateIndex {
            row,
            index: dup.index,
        });
    }

    let root = match SimpleMerkleTree::from_rows(&rows) {
        Some(tree) => to_hex(&tree.root()),
        None => {
            return IntegrityReport::failed(ClaimsError::MalformedManifest(
                "manifest has no rows".into(),
            ))
        }
    };
    let expected = expected_merkle_root.trim().to_string();

    let error = (!root.eq_ignore_ascii_case(&expected)).then(|| ClaimsError::MerkleRootMismatch {
        computed: root.clone(),
        expected: expected.clone(),
    });

    IntegrityReport {
        is_valid: error.is_none(),
        merkle_root: Some(root),
        expected_merkle_root: Some(expected),
        error,
        rows,
    }
}

/// Whether `root` is the all-zero sentinel used by unanchored claim sources.
pub fn is_zero_root(root: &str) -> bool {
    parse_hash(root) == Some(ZERO_ROOT)
}
