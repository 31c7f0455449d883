//! staking_atlas — canonical staking data for Tezos.
//!
//! Normalizes BakingBad baker records and Tezos node account records into a
//! chain-agnostic model: validators with an estimated yield, merged with a
//! curated identity registry, and per-account delegations.
//! Read-only; no signing; no transaction construction.

pub mod chain;
pub mod config;
pub mod snapshot;
pub mod staking;

pub use chain::{Cache, FetchConfig, Fetcher, RawAccount, RawValidator};
pub use config::AtlasConfig;
pub use snapshot::ValidatorSnapshot;
pub use staking::{
    build_delegations_page, build_validator_map, merge_validator, normalize_validator,
    resolve_delegation, DelegationRecord, DelegationStatus, DelegationsPage, IdentityLookup,
    Registry, StakeValidator, Validator, ValidatorMap,
};
