//! Persisted validator map snapshots with a SHA-256 fingerprint.

mod bundle;

pub use bundle::{
    digest_path, fingerprint_of, normalize_for_hash, SnapshotError, ValidatorSnapshot, CHAIN_TEZOS,
    Verification,
};
