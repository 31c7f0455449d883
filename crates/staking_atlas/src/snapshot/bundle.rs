//! A validator map written to disk, with a fingerprint over its content.
//!
//! The fingerprint covers everything except the creation time, so two polls
//! that saw the same bakers and registry hash identically.

use crate::staking::ValidatorMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::info;

const SNAPSHOT_VERSION: u32 = 1;
pub const CHAIN_TEZOS: &str = "tezos";

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("serialize: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("unsupported snapshot version {0}")]
    Version(u32),
    #[error("fingerprint mismatch: computed {computed}, expected {expected}")]
    Mismatch { computed: String, expected: String },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidatorSnapshot {
    pub version: u32,
    pub chain: String,
    pub created_utc_rfc3339: String,
    pub validators: ValidatorMap,
}

/// Fields that contribute to the fingerprint.
#[derive(Serialize)]
struct Fingerprinted<'a> {
    version: u32,
    chain: &'a str,
    validators: &'a ValidatorMap,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    pub computed: String,
    pub expected: Option<String>,
    pub matches: bool,
}

impl ValidatorSnapshot {
    pub fn new(validators: ValidatorMap) -> Self {
        Self::at(validators, OffsetDateTime::now_utc())
    }

    pub fn at(validators: ValidatorMap, created: OffsetDateTime) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            chain: CHAIN_TEZOS.to_string(),
            created_utc_rfc3339: created.format(&Rfc3339).unwrap_or_default(),
            validators,
        }
    }

    pub fn fingerprint(&self) -> Result<String, SnapshotError> {
        fingerprint_of(&Fingerprinted {
            version: self.version,
            chain: &self.chain,
            validators: &self.validators,
        })
    }

    pub fn verify(&self, expected_hex: Option<&str>) -> Result<Verification, SnapshotError> {
        let computed = self.fingerprint()?;
        let expected = expected_hex.map(|e| e.trim().to_lowercase());
        let matches = expected.as_deref() == Some(computed.as_str());
        Ok(Verification {
            computed,
            expected,
            matches,
        })
    }

    /// Write the snapshot JSON and its `.sha256` sibling. Returns the fingerprint.
    pub fn save(&self, path: &Path) -> Result<String, SnapshotError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let hash = self.fingerprint()?;
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        std::fs::write(digest_path(path), format!("{hash}\n"))?;
        info!(path = %path.display(), validators = self.validators.len(), "snapshot saved");
        Ok(hash)
    }

    /// Read a snapshot; when a `.sha256` sibling exists it must match.
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::Version(snapshot.version));
        }
        if let Ok(expected) = std::fs::read_to_string(digest_path(path)) {
            let v = snapshot.verify(Some(expected.as_str()))?;
            if !v.matches {
                return Err(SnapshotError::Mismatch {
                    computed: v.computed,
                    expected: v.expected.unwrap_or_default(),
                });
            }
        }
        Ok(snapshot)
    }
}

/// `validators.json` -> `validators.sha256`.
pub fn digest_path(path: &Path) -> PathBuf {
    path.with_extension("sha256")
}

/// Normalize JSON for hashing: sorted keys, no whitespace.
pub fn normalize_for_hash(value: &serde_json::Value) -> Result<String, SnapshotError> {
    Ok(serde_json::to_string(&sort_json_keys(value))?)
}

fn sort_json_keys(v: &serde_json::Value) -> serde_json::Value {
    match v {
        serde_json::Value::Object(m) => {
            let sorted: BTreeMap<&String, serde_json::Value> =
                m.iter().map(|(k, v)| (k, sort_json_keys(v))).collect();
            serde_json::Value::Object(
                sorted
                    .into_iter()
                    .map(|(k, v)| (k.clone(), v))
                    .collect(),
            )
        }
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.iter().map(sort_json_keys).collect())
        }
        other => other.clone(),
    }
}

/// SHA-256 (hex) over the normalized JSON form of any serializable value.
pub fn fingerprint_of<T: Serialize>(value: &T) -> Result<String, SnapshotError> {
    let normalized = normalize_for_hash(&serde_json::to_value(value)?)?;
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}
