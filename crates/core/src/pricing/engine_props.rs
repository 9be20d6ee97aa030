//! Property-based tests for the pricing engine.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use rust_decimal::Decimal;
use staybook_shared::types::{Money, ServiceFeeId};

use crate::availability::types::StayRange;
use crate::pricing::engine::PricingEngine;
use crate::pricing::policy::FlatRateTax;
use crate::pricing::types::{FeeType, QuoteRequest, ServiceFeeSnapshot};

/// Nightly prices between 0.01 and 10,000.00, in cents.
fn arb_price() -> impl Strategy<Value = Money> {
    (1i64..=1_000_000).prop_map(Money::from_minor)
}

fn arb_stay() -> impl Strategy<Value = StayRange> {
    (0i64..365, 1i64..=365).prop_map(|(offset, nights)| {
        let check_in = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap() + Duration::days(offset);
        StayRange::new(check_in, check_in + Duration::days(nights)).unwrap()
    })
}

fn arb_fee() -> impl Strategy<Value = ServiceFeeSnapshot> {
    (any::<bool>(), 0i64..5_000).prop_map(|(flat, raw)| ServiceFeeSnapshot {
        service_fee_id: ServiceFeeId::new(1),
        fee_type: if flat { FeeType::Flat } else { FeeType::Percentage },
        value: Decimal::new(raw, 2),
    })
}

/// Tax rates between 0% and 30% with up to four decimals.
fn arb_tax_rate() -> impl Strategy<Value = Decimal> {
    (0i64..=3_000).prop_map(|raw| Decimal::new(raw, 4))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Subtotal is exactly price × nights for 1–365 nights.
    #[test]
    fn prop_subtotal_is_exact(price in arb_price(), stay in arb_stay(), fee in arb_fee()) {
        let quote = PricingEngine::quote(
            &QuoteRequest { price_per_night: price, stay, discount: Money::zero(), service_fee: fee },
            &FlatRateTax::new(Decimal::ZERO),
        ).unwrap();

        prop_assert!(quote.nights >= 1);
        prop_assert_eq!(quote.sub_total.amount, price.amount * Decimal::from(stay.nights()));
    }

    /// The breakdown always reconciles and every component is in minor units.
    #[test]
    fn prop_total_reconciles(
        price in arb_price(),
        stay in arb_stay(),
        fee in arb_fee(),
        rate in arb_tax_rate(),
        discount_share in 0u32..=100
    ) {
        let sub_total = price.times(stay.nights());
        let discount = sub_total.percent(Decimal::from(discount_share));
        let quote = PricingEngine::quote(
            &QuoteRequest { price_per_night: price, stay, discount, service_fee: fee },
            &FlatRateTax::new(rate),
        ).unwrap();

        prop_assert!(quote.is_consistent());
        prop_assert_eq!(quote.total, quote.sub_total - quote.discount + quote.fee + quote.tax);
        for part in [quote.discount, quote.fee, quote.tax, quote.total] {
            prop_assert_eq!(part.round_to_minor(), part);
        }
        prop_assert!(!quote.total.is_negative());
    }
}
