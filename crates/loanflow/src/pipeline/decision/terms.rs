use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};
use rust_decimal_macros::dec;
use tracing::warn;

use crate::pipeline::domain::{LoanTerms, Money, Rate};

const SHORT_TERM_INSTALLMENTS: u32 = 12;
const MEDIUM_TERM_INSTALLMENTS: u32 = 24;
const LONG_TERM_INSTALLMENTS: u32 = 36;
const MEDIUM_TERM_THRESHOLD: Decimal = dec!(10_000.00);
const LONG_TERM_THRESHOLD: Decimal = dec!(25_000.00);

/// Compute the standard terms for an approved amount and annual rate: the
/// installment count is banded by amount, the installment value follows the
/// annuity formula.
pub fn standard_terms(approved_amount: Money, annual_interest_rate: Rate) -> LoanTerms {
    let number_of_installments = installments_for(approved_amount);
    let installment_amount = if annual_interest_rate.is_zero() {
        zero_rate_installment(approved_amount, number_of_installments)
    } else {
        annuity_installment(approved_amount, annual_interest_rate, number_of_installments)
    };

    LoanTerms {
        approved_amount,
        annual_interest_rate,
        number_of_installments,
        installment_amount,
    }
}

fn installments_for(approved_amount: Money) -> u32 {
    if approved_amount >= LONG_TERM_THRESHOLD {
        LONG_TERM_INSTALLMENTS
    } else if approved_amount >= MEDIUM_TERM_THRESHOLD {
        MEDIUM_TERM_INSTALLMENTS
    } else {
        SHORT_TERM_INSTALLMENTS
    }
}

fn zero_rate_installment(approved_amount: Money, number_of_installments: u32) -> Money {
    (approved_amount / Decimal::from(number_of_installments))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Annuity installment: `P * i * (1+i)^n / ((1+i)^n - 1)` with the monthly
/// rate at 10 decimal places half-up. A denominator that rounds to exactly
/// zero (near-zero rates) falls back to the zero-rate split.
fn annuity_installment(
    approved_amount: Money,
    annual_interest_rate: Rate,
    number_of_installments: u32,
) -> Money {
    let monthly_rate = (annual_interest_rate / dec!(12))
        .round_dp_with_strategy(10, RoundingStrategy::MidpointAwayFromZero);
    let growth = (Decimal::ONE + monthly_rate).powi(i64::from(number_of_installments));
    let denominator = growth - Decimal::ONE;

    if denominator.is_zero() {
        warn!(
            %approved_amount,
            %annual_interest_rate,
            number_of_installments,
            "annuity denominator rounded to zero, falling back to zero-rate split"
        );
        return zero_rate_installment(approved_amount, number_of_installments);
    }

    (approved_amount * monthly_rate * growth / denominator)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
