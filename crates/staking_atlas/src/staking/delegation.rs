//! Account record to delegation, resolved against a validator map snapshot.

use crate::chain::decode::{RawAccount, ValidationError};
use crate::staking::registry::ValidatorMap;
use crate::staking::types::{DelegationRecord, DelegationStatus, DelegationsPage, Delegator};
use tracing::{debug, warn};

/// Resolve one account.
///
/// Returns `Ok(None)` when the account has no delegate. A delegate that is not
/// in `registry` yields a pending record with an unbranded placeholder.
pub fn resolve_delegation(
    account: &RawAccount,
    registry: &ValidatorMap,
) -> Result<Option<DelegationRecord>, ValidationError> {
    account.validate()?;
    let Some(delegate) = account.delegate_address() else {
        return Ok(None);
    };
    let (delegator, status) = match registry.get(delegate) {
        Some(validator) => (Delegator::Known(validator.clone()), DelegationStatus::Active),
        None => (
            Delegator::Pending {
                id: delegate.to_string(),
            },
            DelegationStatus::Pending,
        ),
    };
    Ok(Some(DelegationRecord {
        delegator,
        value: account.balance.clone(),
        status,
    }))
}

/// An account that could not be resolved, by position in the input.
#[derive(Clone, Debug, PartialEq)]
pub struct RejectedAccount {
    pub index: usize,
    pub error: ValidationError,
}

/// Page plus the accounts that were dropped from it for being invalid.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PageOutcome {
    pub page: DelegationsPage,
    pub rejected: Vec<RejectedAccount>,
}

/// Resolve a batch of accounts in input order. Accounts without a delegate are
/// omitted; invalid accounts are reported in `rejected` and do not stop the rest.
pub fn build_delegations_page(accounts: &[RawAccount], registry: &ValidatorMap) -> PageOutcome {
    let mut out = PageOutcome::default();
    for (index, account) in accounts.iter().enumerate() {
        match resolve_delegation(account, registry) {
            Ok(Some(record)) => out.page.push(record),
            Ok(None) => {}
            Err(error) => {
                warn!(index, error = %error, "rejecting account");
                out.rejected.push(RejectedAccount { index, error });
            }
        }
    }
    debug!(
        records = out.page.len(),
        rejected = out.rejected.len(),
        "built delegations page"
    );
    out
}

/// Spendable balance reported for an account, verbatim.
pub fn undelegated_balance(account: &RawAccount) -> Result<String, ValidationError> {
    account.validate()?;
    Ok(account.balance.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staking::types::{StakeValidator, StakingDetails, ValidatorIdentity};

    const KNOWN: &str = "tz2FCNBrERXtaTtNX6iimR1UJ5JSDxvdHM93";

    fn registry() -> ValidatorMap {
        std::iter::once(StakeValidator {
            id: KNOWN.into(),
            status: true,
            info: ValidatorIdentity {
                name: "stake.fish".into(),
                ..Default::default()
            },
            details: StakingDetails::default(),
        })
        .collect()
    }

    fn account(delegate: Option<&str>, balance: &str) -> RawAccount {
        RawAccount {
            delegate: delegate.map(str::to_string),
            balance: balance.into(),
            ..Default::default()
        }
    }

    #[test]
    fn known_delegate_is_active() {
        let r = resolve_delegation(&account(Some(KNOWN), "91237897"), &registry())
            .unwrap()
            .unwrap();
        assert_eq!(r.status, DelegationStatus::Active);
        assert_eq!(r.value, "91237897");
        assert_eq!(r.delegator.id(), KNOWN);
        assert_eq!(StakeValidator::from(r.delegator.clone()).info.name, "stake.fish");
    }

    #[test]
    fn unknown_delegate_is_pending_placeholder() {
        let r = resolve_delegation(&account(Some("tz1unknown"), "5"), &registry())
            .unwrap()
            .unwrap();
        assert_eq!(r.status, DelegationStatus::Pending);
        assert_eq!(
            r.delegator,
            Delegator::Pending {
                id: "tz1unknown".into()
            }
        );
        let sv = StakeValidator::from(r.delegator);
        assert!(!sv.status);
        assert_eq!(sv.info, ValidatorIdentity::default());
    }

    #[test]
    fn placeholder_keeps_raw_delegate() {
        let r = resolve_delegation(&account(Some(" tz1raw "), "5"), &registry())
            .unwrap()
            .unwrap();
        assert_eq!(r.delegator.id(), " tz1raw ");
        assert_eq!(r.status, DelegationStatus::Pending);
    }

    #[test]
    fn no_delegate_no_record() {
        assert_eq!(resolve_delegation(&account(None, "1"), &registry()), Ok(None));
        assert_eq!(
            resolve_delegation(&account(Some(""), "1"), &registry()),
            Ok(None)
        );
    }

    #[test]
    fn invalid_balance_is_validation_error() {
        assert!(resolve_delegation(&account(Some(KNOWN), "abc"), &registry()).is_err());
    }

    #[test]
    fn page_keeps_order_and_skips_bad_accounts() {
        let accounts = vec![
            account(Some("tz1unknown"), "1"),
            account(None, "2"),
            account(Some(KNOWN), "not-a-number"),
            account(Some(KNOWN), "4"),
        ];
        let out = build_delegations_page(&accounts, &registry());
        assert_eq!(out.page.len(), 2);
        assert_eq!(out.page[0].delegator.id(), "tz1unknown");
        assert_eq!(out.page[1].value, "4");
        assert_eq!(out.rejected.len(), 1);
        assert_eq!(out.rejected[0].index, 2);
    }

    #[test]
    fn resolve_is_idempotent() {
        let reg = registry();
        let a = account(Some(KNOWN), "10");
        assert_eq!(
            resolve_delegation(&a, &reg).unwrap(),
            resolve_delegation(&a, &reg).unwrap()
        );
    }

    #[test]
    fn frozen_cycles_untouched() {
        let mut a = account(Some(KNOWN), "10");
        a.frozen_balance_by_cycle = Some(vec![crate::chain::decode::FrozenBalance {
            cycle: 240,
            deposit: "3072000000".into(),
            fees: "15676".into(),
            rewards: "90000000".into(),
        }]);
        let before = a.clone();
        let r = resolve_delegation(&a, &registry()).unwrap().unwrap();
        assert_eq!(r.value, "10");
        assert_eq!(a, before);
    }
}
