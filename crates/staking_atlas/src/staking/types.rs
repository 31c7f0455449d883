//! Canonical, chain-agnostic staking types consumed by the aggregation API.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Decimal amount kept as text so chain-native precision is never lost.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(String);

impl Default for Amount {
    fn default() -> Self {
        Self("0".to_string())
    }
}

impl Amount {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Staking mechanism tag. Tezos only supports plain delegation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelegationType {
    #[default]
    Delegate,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StakingReward {
    /// Estimated annual yield in percent (5.5 means 5.5%).
    pub annual: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StakingDetails {
    pub reward: StakingReward,
    pub minimum_amount: Amount,
    /// Seconds a delegation stays locked after undelegating.
    pub lock_time: u64,
    #[serde(rename = "type")]
    pub delegation_type: DelegationType,
}

/// Live validator as seen on one poll.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Validator {
    pub id: String,
    pub status: bool,
    pub details: StakingDetails,
}

/// Curated branding for a validator address.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorIdentity {
    pub name: String,
    pub description: String,
    pub image: String,
    pub website: String,
}

/// Live validator joined with its curated identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StakeValidator {
    pub id: String,
    pub status: bool,
    pub info: ValidatorIdentity,
    pub details: StakingDetails,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelegationStatus {
    Active,
    Pending,
}

/// Validator a delegation points at: either found in the snapshot, or only
/// known by the raw address reported on-chain.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(into = "StakeValidator")]
pub enum Delegator {
    Known(StakeValidator),
    Pending { id: String },
}

impl Delegator {
    pub fn id(&self) -> &str {
        match self {
            Delegator::Known(v) => &v.id,
            Delegator::Pending { id } => id,
        }
    }
}

impl From<Delegator> for StakeValidator {
    fn from(d: Delegator) -> Self {
        match d {
            Delegator::Known(v) => v,
            Delegator::Pending { id } => StakeValidator {
                id,
                status: false,
                info: ValidatorIdentity::default(),
                details: StakingDetails::default(),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DelegationRecord {
    pub delegator: Delegator,
    pub value: String,
    pub status: DelegationStatus,
}

pub type DelegationsPage = Vec<DelegationRecord>;
