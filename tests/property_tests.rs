//! Property-based tests for the zone capacity ledger.
//!
//! Production, reservations and movements are generated at watt-hour precision, the
//! same scale the ledger normalizes to.

use assert_matches::assert_matches;
use coop_energy_api::entities::energy_zone_summary::ZoneStatus;
use coop_energy_api::errors::ServiceError;
use coop_energy_api::services::zone_ledger::{Ledger, Thresholds};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn kwh_strategy(max_wh: i64) -> impl Strategy<Value = Decimal> {
    (0i64..=max_wh).prop_map(|wh| Decimal::new(wh, 3))
}

/// A ledger whose reservations fit inside its production.
fn ledger_strategy() -> impl Strategy<Value = Ledger> {
    (kwh_strategy(50_000_000), 0u32..=1000, kwh_strategy(80_000_000)).prop_map(
        |(production, per_mille, requested)| {
            let reserved = (production * Decimal::from(per_mille) / dec!(1000)).round_dp(3);
            Ledger::new(production, reserved, requested)
        },
    )
}

fn thresholds_strategy() -> impl Strategy<Value = Thresholds> {
    (0u32..=100, 0u32..=100).prop_map(|(a, b)| {
        let (amber, red) = if a <= b { (a, b) } else { (b, a) };
        Thresholds::new(Decimal::from(amber), Decimal::from(red)).expect("ordered thresholds")
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn availability_is_production_minus_reserved(ledger in ledger_strategy()) {
        let figures = ledger.recompute(&Thresholds::default());
        prop_assert_eq!(figures.available_kwh_day, ledger.production - ledger.reserved);
        prop_assert!(figures.available_kwh_day >= Decimal::ZERO);
        prop_assert!(ledger.validate().is_ok());
    }

    #[test]
    fn recompute_is_idempotent(ledger in ledger_strategy(), thresholds in thresholds_strategy()) {
        let first = ledger.recompute(&thresholds);
        let second = ledger.recompute(&thresholds);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn zero_production_is_always_red(reserved in kwh_strategy(1_000), thresholds in thresholds_strategy()) {
        let ledger = Ledger::new(Decimal::ZERO, reserved, Decimal::ZERO);
        prop_assert_eq!(ledger.recompute(&thresholds).status, ZoneStatus::Red);
    }

    #[test]
    fn status_follows_utilization(ledger in ledger_strategy()) {
        prop_assume!(ledger.production > Decimal::ZERO);
        let utilization = ledger.reserved / ledger.production * dec!(100);
        let expected = if utilization > dec!(90) {
            ZoneStatus::Red
        } else if utilization >= dec!(70) {
            ZoneStatus::Amber
        } else {
            ZoneStatus::Green
        };
        prop_assert_eq!(ledger.recompute(&Thresholds::default()).status, expected);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn reservations_never_exceed_production(
        ledger in ledger_strategy(),
        requests in prop::collection::vec(kwh_strategy(10_000_000), 1..20),
    ) {
        let mut current = ledger;
        for kwh in requests {
            match current.reserve(kwh) {
                Ok(next) => {
                    prop_assert!(kwh > Decimal::ZERO);
                    prop_assert_eq!(next.reserved, current.reserved + kwh);
                    current = next;
                }
                Err(ServiceError::CapacityShortage(shortage)) => {
                    prop_assert_eq!(shortage.available, current.available());
                    prop_assert_eq!(shortage.shortfall, kwh - current.available());
                }
                Err(other) => {
                    prop_assert!(kwh.is_zero(), "unexpected error {:?}", other);
                }
            }
            prop_assert!(current.reserved <= current.production);
        }
    }

    #[test]
    fn shortage_leaves_the_ledger_untouched(ledger in ledger_strategy(), extra in 1i64..1_000_000) {
        let request = ledger.available() + Decimal::new(extra, 3);
        let before = ledger;
        assert_matches!(ledger.reserve(request), Err(ServiceError::CapacityShortage(_)));
        prop_assert_eq!(ledger, before);
    }

    #[test]
    fn release_undoes_reserve(ledger in ledger_strategy(), wh in 1i64..5_000_000) {
        let kwh = Decimal::new(wh, 3);
        prop_assume!(kwh <= ledger.available());
        let reserved = ledger.reserve(kwh).expect("fits");
        let released = reserved.release(kwh).expect("was reserved");
        prop_assert_eq!(released.reserved, ledger.reserved);
        prop_assert_eq!(released.recompute(&Thresholds::default()), ledger.recompute(&Thresholds::default()));
    }

    #[test]
    fn releasing_more_than_reserved_fails(ledger in ledger_strategy(), extra in 1i64..1_000_000) {
        let request = ledger.reserved + Decimal::new(extra, 3);
        assert_matches!(ledger.release(request), Err(ServiceError::ValidationFailed(fields)) if fields.contains_key("kwh"));
    }
}
