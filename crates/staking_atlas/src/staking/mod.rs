//! Tezos staking normalization: bakers, registry merge, delegations.

pub(crate) mod delegation;
mod registry;
mod reward;
pub(crate) mod types;
mod validator;

pub use delegation::{
    build_delegations_page, resolve_delegation, undelegated_balance, PageOutcome, RejectedAccount,
};
pub use registry::{
    merge_validator, IdentityLookup, Registry, RegistryEntry, RegistryError, SnapshotCell,
    ValidatorMap, DEFAULT_IMAGE_BASE,
};
pub use reward::{estimate_annual_yield, MISSING_ROI_ANNUAL};
pub use types::{
    Amount, DelegationRecord, DelegationStatus, DelegationType, DelegationsPage, Delegator,
    StakeValidator, StakingDetails, StakingReward, Validator, ValidatorIdentity,
};
pub use validator::{
    default_staking_details, normalize_validator, normalize_validators, staking_details,
};

use crate::chain::decode::{decode_validators, DecodeError, ValidationError};

/// Decode a baker list payload and merge it with curated identities.
///
/// A malformed payload fails the whole call; individual impossible bakers are
/// skipped and returned alongside the map.
pub fn build_validator_map(
    bakers_body: &[u8],
    lookup: &impl IdentityLookup,
) -> Result<(ValidatorMap, Vec<ValidationError>), DecodeError> {
    let raws = decode_validators(bakers_body)?;
    let (validators, rejected) = normalize_validators(&raws);
    Ok((ValidatorMap::build(&validators, lookup), rejected))
}
