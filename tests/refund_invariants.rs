//! Property tests for refund/void accounting invariants.

use std::collections::HashMap;

use proptest::prelude::*;
use rust_decimal::Decimal;

use paygate::domain::foundation::{Currency, ExternalId, Money, PaymentId};
use paygate::domain::payment::{Payment, PaymentMethod, PaymentStatus};

fn usd_cents(cents: i64) -> Money {
    Money::new(Decimal::new(cents, 2), Currency::USD)
}

fn captured_payment(amount_cents: i64) -> Payment {
    let mut payment = Payment::create(
        PaymentId::new(),
        ExternalId::new("order-prop").unwrap(),
        usd_cents(amount_cents),
        PaymentMethod::CreditCard,
        None,
        HashMap::new(),
    );
    payment.charge("txn_prop".to_string()).unwrap();
    payment
}

proptest! {
    /// Whatever refunds are attempted, the accounting never leaves
    /// 0 <= refunded_amount <= amount, and refund_count equals the number
    /// of refunds that succeeded.
    #[test]
    fn refund_accounting_invariants_hold(
        amount_cents in 1i64..1_000_000,
        refunds in prop::collection::vec(-10_000i64..1_000_000, 0..12),
    ) {
        let mut payment = captured_payment(amount_cents);
        let mut successes = 0u32;

        for refund_cents in refunds {
            let before = payment.clone();
            match payment.apply_refund(usd_cents(refund_cents)) {
                Ok(()) => successes += 1,
                Err(_) => prop_assert_eq!(&payment, &before, "failed refund must not mutate"),
            }

            prop_assert!(payment.refunded_amount.amount() >= Decimal::ZERO);
            prop_assert!(payment.refunded_amount.amount() <= payment.amount.amount());
            prop_assert_eq!(payment.refund_count, successes);
            prop_assert!(
                payment.remaining_refund_amount().amount() >= Decimal::ZERO,
                "remaining refundable amount must never go negative"
            );
        }
    }

    /// The status always reflects the accounting: fully refunded payments
    /// are Refunded, partially refunded ones PartiallyRefunded.
    #[test]
    fn refund_status_matches_accounting(
        amount_cents in 2i64..100_000,
        first_cents in 1i64..100_000,
    ) {
        let mut payment = captured_payment(amount_cents);

        if payment.apply_refund(usd_cents(first_cents)).is_ok() {
            if payment.refunded_amount == payment.amount {
                prop_assert_eq!(payment.status, PaymentStatus::Refunded);
                prop_assert!(payment.apply_refund(usd_cents(1)).is_err());
            } else {
                prop_assert_eq!(payment.status, PaymentStatus::PartiallyRefunded);
            }
        } else {
            // Only an overdraw can fail here; the record must be untouched.
            prop_assert!(first_cents > amount_cents);
            prop_assert_eq!(payment.status, PaymentStatus::Captured);
            prop_assert_eq!(payment.refund_count, 0);
        }
    }

    /// Voiding is only possible before capture, and a voided payment
    /// accepts no further mutations.
    #[test]
    fn void_only_before_capture(amount_cents in 1i64..100_000, capture_first in any::<bool>()) {
        let mut payment = Payment::create(
            PaymentId::new(),
            ExternalId::new("order-void").unwrap(),
            usd_cents(amount_cents),
            PaymentMethod::DebitCard,
            None,
            HashMap::new(),
        );

        if capture_first {
            payment.charge("txn_v".to_string()).unwrap();
            prop_assert!(payment.void().is_err());
            prop_assert_eq!(payment.status, PaymentStatus::Captured);
        } else {
            payment.void().unwrap();
            prop_assert_eq!(payment.status, PaymentStatus::Voided);
            prop_assert!(payment.void().is_err());
            prop_assert!(payment.apply_refund(usd_cents(1)).is_err());
        }
    }
}
