//! Typed raw records for the BakingBad baker list and Tezos node account payloads.
//!
//! Decoding is structural only. Semantic checks live in `validate` so that a
//! well-formed but impossible record is reported as a [`ValidationError`]
//! instead of being silently defaulted.

use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::value::RawValue;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("baker list: {0}")]
    Bakers(#[source] serde_json::Error),
    #[error("account: {0}")]
    Account(#[source] serde_json::Error),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("baker address is empty")]
    EmptyAddress,
    #[error("baker {address}: fee {fee} outside 0..=1")]
    FeeOutOfRange { address: String, fee: f64 },
    #[error("baker {address}: negative minimum delegation {value}")]
    NegativeMinDelegation { address: String, value: String },
    #[error("{field}: not a decimal amount: {value:?}")]
    NotAnAmount { field: &'static str, value: String },
}

/// One entry of the baker list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawValidator {
    pub address: String,
    pub name: Option<String>,
    pub logo: Option<String>,
    pub balance: Option<f64>,
    pub staking_balance: Option<f64>,
    pub staking_capacity: Option<f64>,
    pub max_staking_balance: Option<f64>,
    pub free_space: Option<f64>,
    pub fee: Option<f64>,
    /// Number token exactly as it appeared in the payload.
    #[serde(
        default,
        deserialize_with = "number_token",
        serialize_with = "write_number_token"
    )]
    pub min_delegation: Option<String>,
    pub payout_delay: Option<u32>,
    pub payout_period: Option<u32>,
    pub open_for_delegation: Option<bool>,
    pub estimated_roi: Option<f64>,
    pub service_type: Option<String>,
    pub service_health: Option<String>,
    pub payout_timing: Option<String>,
    pub payout_accuracy: Option<String>,
    pub insurance_coverage: Option<f64>,
}

impl RawValidator {
    /// Reject records that decode fine but cannot describe a real baker.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.address.trim().is_empty() {
            return Err(ValidationError::EmptyAddress);
        }
        if let Some(fee) = self.fee {
            if !(0.0..=1.0).contains(&fee) {
                return Err(ValidationError::FeeOutOfRange {
                    address: self.address.clone(),
                    fee,
                });
            }
        }
        if let Some(value) = &self.min_delegation {
            // Checked on the token so `-0` is rejected too.
            if value.starts_with('-') {
                return Err(ValidationError::NegativeMinDelegation {
                    address: self.address.clone(),
                    value: value.clone(),
                });
            }
            if value.contains(['e', 'E']) {
                return Err(ValidationError::NotAnAmount {
                    field: "minDelegation",
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }
}

fn number_token<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<Box<RawValue>>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let token = raw.get();
    if serde_json::from_str::<serde_json::Number>(token).is_err() {
        return Err(D::Error::custom(format!("expected a number, got {token}")));
    }
    Ok(Some(token.to_string()))
}

fn write_number_token<S>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(token) => RawValue::from_string(token.clone())
            .map_err(S::Error::custom)?
            .serialize(serializer),
        None => serializer.serialize_none(),
    }
}

/// Frozen deposit/fees/rewards for one cycle, as reported by the node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrozenBalance {
    pub cycle: u32,
    pub deposit: String,
    pub fees: String,
    pub rewards: String,
}

/// Account record from `contracts/{address}` or `delegates/{address}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAccount {
    pub delegate: Option<String>,
    pub balance: String,
    pub frozen_balance: Option<String>,
    pub frozen_balance_by_cycle: Option<Vec<FrozenBalance>>,
    pub staking_balance: Option<String>,
    pub delegated_contracts: Option<Vec<String>>,
    pub delegated_balance: Option<String>,
    pub deactivated: Option<bool>,
    pub grace_period: Option<u32>,
}

impl RawAccount {
    /// Delegate address as reported, treating an empty string the same as an
    /// absent field.
    pub fn delegate_address(&self) -> Option<&str> {
        self.delegate.as_deref().filter(|d| !d.is_empty())
    }

    /// Every amount string must be a non-negative integer in mutez.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_amount("balance", &self.balance)?;
        let optional = [
            ("frozen_balance", &self.frozen_balance),
            ("staking_balance", &self.staking_balance),
            ("delegated_balance", &self.delegated_balance),
        ];
        for (field, value) in optional {
            if let Some(v) = value {
                check_amount(field, v)?;
            }
        }
        for frozen in self.frozen_balance_by_cycle.iter().flatten() {
            check_amount("frozen_balance_by_cycle.deposit", &frozen.deposit)?;
            check_amount("frozen_balance_by_cycle.fees", &frozen.fees)?;
            check_amount("frozen_balance_by_cycle.rewards", &frozen.rewards)?;
        }
        Ok(())
    }
}

fn check_amount(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::NotAnAmount {
            field,
            value: value.to_string(),
        })
    }
}

pub fn decode_validators(body: &[u8]) -> Result<Vec<RawValidator>, DecodeError> {
    serde_json::from_slice(body).map_err(DecodeError::Bakers)
}

pub fn decode_account(body: &[u8]) -> Result<RawAccount, DecodeError> {
    serde_json::from_slice(body).map_err(DecodeError::Account)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BAKER: &str = r#"[{
        "address":"tz2TSvNTh2epDMhZHrw73nV9piBX7kLZ9K9m",
        "name":"Polychain Labs 2",
        "fee":0.1,
        "minDelegation":0,
        "openForDelegation":true,
        "estimatedRoi":0.055564,
        "payoutDelay":6
    }]"#;

    #[test]
    fn decode_baker_with_missing_optionals() {
        let v = decode_validators(BAKER.as_bytes()).unwrap();
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].address, "tz2TSvNTh2epDMhZHrw73nV9piBX7kLZ9K9m");
        assert_eq!(v[0].estimated_roi, Some(0.055564));
        assert_eq!(v[0].payout_delay, Some(6));
        assert!(v[0].logo.is_none());
        assert!(v[0].validate().is_ok());
    }

    #[test]
    fn decode_malformed_is_error() {
        assert!(matches!(
            decode_validators(b"[{\"address\":"),
            Err(DecodeError::Bakers(_))
        ));
        assert!(matches!(
            decode_account(b"{\"balance\": 12}"),
            Err(DecodeError::Account(_))
        ));
    }

    #[test]
    fn baker_fee_out_of_range() {
        let mut v = decode_validators(BAKER.as_bytes()).unwrap().remove(0);
        v.fee = Some(1.5);
        assert!(matches!(
            v.validate(),
            Err(ValidationError::FeeOutOfRange { .. })
        ));
        v.fee = None;
        v.address = " ".into();
        assert_eq!(v.validate(), Err(ValidationError::EmptyAddress));
    }

    #[test]
    fn account_delegate_empty_means_none() {
        let a = decode_account(br#"{"delegate":"","balance":"1"}"#).unwrap();
        assert_eq!(a.delegate_address(), None);
        let a = decode_account(br#"{"balance":"1"}"#).unwrap();
        assert_eq!(a.delegate_address(), None);
        let a = decode_account(br#"{"delegate":"tz1abc","balance":"1"}"#).unwrap();
        assert_eq!(a.delegate_address(), Some("tz1abc"));
    }

    #[test]
    fn account_delegate_kept_verbatim() {
        let a = decode_account(br#"{"delegate":" tz1raw ","balance":"1"}"#).unwrap();
        assert_eq!(a.delegate_address(), Some(" tz1raw "));
    }

    #[test]
    fn min_delegation_keeps_number_token() {
        let v = decode_validators(
            br#"[{"address":"tz1big","minDelegation":12345678901234567891},
                 {"address":"tz1frac","minDelegation":0.10},
                 {"address":"tz1none","minDelegation":null}]"#,
        )
        .unwrap();
        assert_eq!(v[0].min_delegation.as_deref(), Some("12345678901234567891"));
        assert_eq!(v[1].min_delegation.as_deref(), Some("0.10"));
        assert_eq!(v[2].min_delegation, None);
        assert!(v.iter().all(|b| b.validate().is_ok()));
        assert!(decode_validators(br#"[{"address":"tz1s","minDelegation":"5"}]"#).is_err());
    }

    #[test]
    fn negative_zero_min_delegation_rejected() {
        let v = decode_validators(br#"[{"address":"tz1neg","minDelegation":-0}]"#)
            .unwrap()
            .remove(0);
        assert_eq!(
            v.validate(),
            Err(ValidationError::NegativeMinDelegation {
                address: "tz1neg".into(),
                value: "-0".into()
            })
        );
        let v = decode_validators(br#"[{"address":"tz1exp","minDelegation":1e3}]"#)
            .unwrap()
            .remove(0);
        assert!(matches!(
            v.validate(),
            Err(ValidationError::NotAnAmount { field: "minDelegation", .. })
        ));
    }

    #[test]
    fn account_non_numeric_balance_rejected() {
        let a = decode_account(br#"{"delegate":"tz1abc","balance":"12.5"}"#).unwrap();
        assert_eq!(
            a.validate(),
            Err(ValidationError::NotAnAmount {
                field: "balance",
                value: "12.5".into()
            })
        );
        let a = decode_account(
            br#"{"balance":"10","frozen_balance_by_cycle":[{"cycle":1,"deposit":"x","fees":"0","rewards":"0"}]}"#,
        )
        .unwrap();
        assert!(a.validate().is_err());
    }
}
