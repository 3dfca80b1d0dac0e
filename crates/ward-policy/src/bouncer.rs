//! Termination predicates
//!
//! Each check looks at one obligation and returns `Some(reason)` when the
//! contract has to be terminated for it. [`verdict`] combines them in
//! precedence order for the contract's current state.

use ward_types::{ContractState, DelegationContract, TerminationReason};

/// The delegator did not confirm deposited keys in time.
///
/// Holds strictly after `round_keys_deposited + confirmation_window`. A
/// contract without a recorded deposit round has no deadline.
pub fn confirmation_deadline_elapsed(current_round: u64, contract: &DelegationContract) -> bool {
    if contract.keys_confirmed {
        return false;
    }
    match contract.round_keys_deposited {
        Some(deposited) => {
            current_round > deposited.saturating_add(contract.terms.confirmation_window)
        }
        None => false,
    }
}

/// The delegation window has passed (strictly after `round_end`)
pub fn has_expired(current_round: u64, contract: &DelegationContract) -> bool {
    current_round > contract.round_end
}

/// The delegator indefinitely breached the terms.
///
/// Takes the round like the other predicates but does not depend on it. A
/// `max_breach_count` of zero disables the check.
pub fn has_breached_terms(_current_round: u64, contract: &DelegationContract) -> bool {
    let max = contract.terms.max_breach_count;
    max > 0 && contract.breach_count >= max
}

fn check_breach(current_round: u64, contract: &DelegationContract) -> Option<TerminationReason> {
    has_breached_terms(current_round, contract).then_some(TerminationReason::Breach)
}

fn check_expiry(current_round: u64, contract: &DelegationContract) -> Option<TerminationReason> {
    has_expired(current_round, contract).then_some(TerminationReason::Expiry)
}

fn check_confirmation(current_round: u64, contract: &DelegationContract) -> Option<TerminationReason> {
    confirmation_deadline_elapsed(current_round, contract).then_some(TerminationReason::UnconfirmedKeys)
}

/// Why `contract` must be terminated at `current_round`, if at all.
///
/// Active contracts are checked for breach before expiry. Deposited
/// contracts only answer to the confirmation deadline. Created contracts
/// are never terminated.
pub fn verdict(current_round: u64, contract: &DelegationContract) -> Option<TerminationReason> {
    match contract.state() {
        ContractState::Created => None,
        ContractState::Deposited => check_confirmation(current_round, contract),
        ContractState::Active => check_breach(current_round, contract).or_else(|| check_expiry(current_round, contract)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use ward_types::{Account, ContractId, ContractTerms, ValidatorId};

    fn contract() -> DelegationContract {
        DelegationContract {
            id: ContractId::new(1),
            validator_id: ValidatorId::new(7),
            account: Account::new("ACC"),
            round_start: 100,
            round_end: 200,
            keys_confirmed: false,
            part_keys_deposited: false,
            round_keys_deposited: None,
            breach_count: 0,
            terms: ContractTerms {
                confirmation_window: 10,
                max_breach_count: 3,
            },
        }
    }

    fn deposited_at(round: u64) -> DelegationContract {
        DelegationContract {
            part_keys_deposited: true,
            round_keys_deposited: Some(round),
            ..contract()
        }
    }

    fn active() -> DelegationContract {
        DelegationContract {
            keys_confirmed: true,
            ..deposited_at(100)
        }
    }

    #[test]
    fn test_confirmation_deadline_boundary() {
        let c = deposited_at(50);
        assert!(!confirmation_deadline_elapsed(59, &c));
        assert!(!confirmation_deadline_elapsed(60, &c));
        assert!(confirmation_deadline_elapsed(61, &c));
    }

    #[test]
    fn test_no_deadline_without_deposit_round() {
        let c = DelegationContract {
            part_keys_deposited: true,
            ..contract()
        };
        assert!(!confirmation_deadline_elapsed(u64::MAX, &c));
    }

    #[test]
    fn test_confirmed_keys_never_time_out() {
        assert!(!confirmation_deadline_elapsed(10_000, &active()));
    }

    #[test]
    fn test_deadline_saturates() {
        let mut c = deposited_at(u64::MAX - 1);
        c.terms.confirmation_window = 10;
        assert!(!confirmation_deadline_elapsed(u64::MAX, &c));
    }

    #[test]
    fn test_expiry_is_strict() {
        let c = active();
        assert!(!has_expired(199, &c));
        assert!(!has_expired(200, &c));
        assert!(has_expired(201, &c));
    }

    #[test]
    fn test_breach_threshold() {
        let mut c = active();
        c.breach_count = 2;
        assert!(!has_breached_terms(150, &c));
        c.breach_count = 3;
        assert!(has_breached_terms(150, &c));
        assert!(has_breached_terms(u64::MAX, &c));

        c.terms.max_breach_count = 0;
        assert!(!has_breached_terms(150, &c));
    }

    #[test]
    fn test_verdict_breach_before_expiry() {
        let mut c = active();
        c.breach_count = 5;
        assert_eq!(verdict(500, &c), Some(TerminationReason::Breach));
        // Breach has no grace, it applies inside the window too
        assert_eq!(verdict(150, &c), Some(TerminationReason::Breach));

        c.breach_count = 0;
        assert_eq!(verdict(500, &c), Some(TerminationReason::Expiry));
        assert_eq!(verdict(150, &c), None);
    }

    #[test]
    fn test_verdict_by_state() {
        let mut created = contract();
        created.breach_count = 10;
        assert_eq!(verdict(10_000, &created), None);

        // A deposited contract past its window only answers to the deadline
        let deposited = deposited_at(195);
        assert_eq!(verdict(201, &deposited), None);
        assert_eq!(verdict(206, &deposited), Some(TerminationReason::UnconfirmedKeys));
    }

    proptest! {
        #[test]
        fn property_expiry_iff_past_end(round in 0u64..1_000, end in 0u64..1_000) {
            let mut c = active();
            c.round_end = end;
            prop_assert_eq!(has_expired(round, &c), round > end);
        }

        #[test]
        fn property_deadline_iff_past_window(
            round in 0u64..10_000,
            deposited in 0u64..5_000,
            window in 0u64..5_000,
        ) {
            let mut c = deposited_at(deposited);
            c.terms.confirmation_window = window;
            prop_assert_eq!(confirmation_deadline_elapsed(round, &c), round > deposited + window);
        }
    }
}
