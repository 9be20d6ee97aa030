//! Property-based tests for the settlement ledger.

use chrono::{DateTime, Utc};
use proptest::prelude::*;
use staybook_shared::types::{
    BookingId, DetailVoucherId, FinancialAccountId, Money, TransactionId, UserId, VoucherId,
};

use crate::settlement::error::SettlementError;
use crate::settlement::ledger::SettlementLedger;
use crate::settlement::types::FinancialAccount;
use crate::voucher::types::{DetailVoucher, Voucher, VoucherState};

fn voucher(total_minor: i64, state: VoucherState) -> Voucher {
    let total = Money::from_minor(total_minor);
    Voucher {
        id: VoucherId::new(1),
        creation_date: DateTime::<Utc>::default(),
        guest_id: UserId::new(1),
        booking_id: Some(BookingId::new(1)),
        sub_total: total,
        discount: Money::zero(),
        fee: Money::zero(),
        tax: Money::zero(),
        total,
        state,
        payment_method_id: Some(FinancialAccountId::new(1)),
        detail: DetailVoucher {
            id: DetailVoucherId::new(1),
            price_night: total,
            number_nights: 1,
            sub_total: total,
            description: String::new(),
        },
    }
}

fn account(balance_minor: i64) -> FinancialAccount {
    FinancialAccount {
        id: FinancialAccountId::new(1),
        id_user: UserId::new(1),
        bank_name: String::new(),
        number_account: String::new(),
        available_balance: Money::from_minor(balance_minor),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// A successful settlement never leaves a negative balance, and funds
    /// short of the total are always rejected.
    #[test]
    fn prop_settle_never_overdraws(total in 1i64..10_000_000, balance in 0i64..10_000_000) {
        let result = SettlementLedger::settle(
            &voucher(total, VoucherState::Pending),
            &account(balance),
            DateTime::<Utc>::default(),
        );
        if balance >= total {
            let posting = result.unwrap();
            prop_assert!(!posting.new_balance.is_negative());
            prop_assert_eq!(posting.previous_balance - posting.new_balance, Money::from_minor(total));
        } else {
            let is_insufficient = matches!(result, Err(SettlementError::InsufficientFunds { .. }));
            prop_assert!(is_insufficient);
        }
    }

    /// Payment followed by its reversal restores the original balance exactly.
    #[test]
    fn prop_reverse_restores_balance(total in 1i64..10_000_000, surplus in 0i64..10_000_000) {
        let start = total + surplus;
        let payment = SettlementLedger::settle(
            &voucher(total, VoucherState::Pending),
            &account(start),
            DateTime::<Utc>::default(),
        )
        .unwrap();
        let original = payment.transaction.into_transaction(TransactionId::new(1));

        let refund = SettlementLedger::reverse(
            &original,
            &voucher(total, VoucherState::Paid),
            &account(payment.new_balance.to_minor().unwrap()),
            DateTime::<Utc>::default(),
        )
        .unwrap();

        prop_assert_eq!(refund.new_balance, Money::from_minor(start));
        prop_assert_eq!(refund.transaction.amount, original.amount);
        prop_assert_eq!(refund.voucher_state, VoucherState::Refunded);
    }
}
