use core::fmt;

/// Failure kinds of the claims verification pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClaimsError {
    /// The content id embedded in the fetched URL differs from the expected id.
    ContentMismatch { expected: String, actual: String },
    /// The content URL answered with a non-success status.
    ContentUnreachable { status: u16 },
    /// The manifest is empty or could not be parsed as a table.
    MalformedManifest(String),
    MissingField { row: usize, field: &'static str },
    InvalidAddress { row: usize, value: String },
    InvalidAmount { row: usize, value: String },
    InvalidIndex { row: usize, value: String },
    /// A later row reuses an index; indices are claim keys and must be unique.
    DuplicateIndex { row: usize, index: u64 },
    MerkleRootMismatch { computed: String, expected: String },
    LeafNotFound,
    DecodeFailure(&'static str),
    NetworkFailure(String),
}

impl ClaimsError {
    /// Short machine-readable label, stable across versions.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ContentMismatch { .. } => "content_mismatch",
            Self::ContentUnreachable { .. } => "content_unreachable",
            Self::MalformedManifest(_) => "malformed_manifest",
            Self::MissingField { .. } => "missing_field",
            Self::InvalidAddress { .. } => "invalid_address",
            Self::InvalidAmount { .. } => "invalid_amount",
            Self::InvalidIndex { .. } => "invalid_index",
            Self::DuplicateIndex { .. } => "duplicate_index",
            Self::MerkleRootMismatch { .. } => "merkle_root_mismatch",
            Self::LeafNotFound => "leaf_not_found",
            Self::DecodeFailure(_) => "decode_failure",
            Self::NetworkFailure(_) => "network_failure",
        }
    }
}

impl fmt::Display for ClaimsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContentMismatch { expected, actual } => {
                write!(f, "content id mismatch: expected {expected}, got {actual}")
            }
            Self::ContentUnreachable { status } => {
                write!(f, "content unreachable: HTTP status {status}")
            }
            Self::MalformedManifest(reason) => write!(f, "malformed manifest: {reason}"),
            Self::MissingField { row, field } => {
                write!(f, "row {row}: missing required field `{field}`")
            }
            Self::InvalidAddress { row, value } => {
                write!(f, "row {row}: invalid address {value:?}")
            }
            Self::InvalidAmount { row, value } => write!(f, "row {row}: invalid amount {value:?}"),
            Self::InvalidIndex { row, value } => write!(f, "row {row}: invalid index {value:?}"),
            Self::DuplicateIndex { row, index } => write!(f, "row {row}: duplicate index {index}"),
            Self::MerkleRootMismatch { computed, expected } => write!(
                f,
                "merkle root mismatch: computed {computed}, expected {expected}"
            ),
            Self::LeafNotFound => f.write_str("leaf not found in merkle tree"),
            Self::DecodeFailure(reason) => write!(f, "claim event decode failed: {reason}"),
            Self::NetworkFailure(reason) => write!(f, "network failure: {reason}"),
        }
    }
}

impl std::error::Error for ClaimsError {}

impl serde::Serialize for ClaimsError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
