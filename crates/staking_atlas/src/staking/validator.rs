//! Baker record to canonical validator.

use crate::chain::decode::{RawValidator, ValidationError};
use crate::staking::reward::estimate_annual_yield;
use crate::staking::types::{Amount, DelegationType, StakingDetails, StakingReward, Validator};
use tracing::{debug, warn};

/// Delegations on Tezos can be withdrawn at any time.
const LOCK_TIME_SECS: u64 = 0;

/// Staking details derived from a single baker record.
pub fn staking_details(raw: &RawValidator) -> StakingDetails {
    StakingDetails {
        reward: StakingReward {
            annual: estimate_annual_yield(raw),
        },
        minimum_amount: raw
            .min_delegation
            .as_deref()
            .map(Amount::new)
            .unwrap_or_default(),
        lock_time: LOCK_TIME_SECS,
        delegation_type: DelegationType::Delegate,
    }
}

/// Chain-level defaults when no particular baker is selected.
pub fn default_staking_details() -> StakingDetails {
    StakingDetails {
        reward: StakingReward::default(),
        minimum_amount: Amount::default(),
        lock_time: LOCK_TIME_SECS,
        delegation_type: DelegationType::Delegate,
    }
}

/// A baker open for delegation is reported active.
pub fn normalize_validator(raw: &RawValidator) -> Validator {
    Validator {
        id: raw.address.clone(),
        status: raw.open_for_delegation.unwrap_or(false),
        details: staking_details(raw),
    }
}

/// Normalize a whole baker list, dropping (and logging) records that fail validation.
pub fn normalize_validators(raws: &[RawValidator]) -> (Vec<Validator>, Vec<ValidationError>) {
    let mut validators = Vec::with_capacity(raws.len());
    let mut rejected = Vec::new();
    for raw in raws {
        match raw.validate() {
            Ok(()) => validators.push(normalize_validator(raw)),
            Err(e) => {
                warn!(address = %raw.address, error = %e, "skipping baker");
                rejected.push(e);
            }
        }
    }
    debug!(
        accepted = validators.len(),
        rejected = rejected.len(),
        "normalized bakers"
    );
    (validators, rejected)
}
