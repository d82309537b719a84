use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::{PolicyConfig, TierTreatment};
use crate::decimal::{Money, Rate};
use crate::engine::amortization::monthly_payment;
use crate::engine::scoring::credit_score;
use crate::types::{Customer, DecisionReason, Loan, LoanRequest};

/// outcome of an eligibility check
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EligibilityDecision {
    pub eligible: bool,
    pub credit_score: u8,
    pub requested_rate: Rate,
    /// rate after the score tier floor; equals the requested rate on rejection
    pub corrected_rate: Rate,
    pub reason: DecisionReason,
    /// installment for the requested amount and tenure at the corrected rate
    pub monthly_installment: Money,
    /// installment at the requested rate, as used by the income check
    pub proposed_emi: Money,
    /// installments of the existing loans, recomputed from their terms
    pub current_emi_total: Money,
}

/// sum of installments for a loan history, recomputed from stored terms
pub fn current_emi_total(loans: &[Loan]) -> Money {
    loans
        .iter()
        .map(|l| monthly_payment(l.loan_amount, l.interest_rate, i64::from(l.tenure)))
        .sum()
}

/// decide a loan request against a customer's history as of `today`
///
/// The income check runs before the score tiers and rejects regardless of
/// score. A score at or below the lowest tier rejects even when the income
/// check passed.
pub fn check_eligibility(
    customer: &Customer,
    loans: &[Loan],
    request: &LoanRequest,
    today: NaiveDate,
    policy: &PolicyConfig,
) -> EligibilityDecision {
    let credit_score = credit_score(customer, loans, today);
    let tenure = i64::from(request.tenure);
    let proposed_emi = monthly_payment(request.loan_amount, request.interest_rate, tenure);
    let current_emi_total = current_emi_total(loans);

    let reject = |reason: DecisionReason| EligibilityDecision {
        eligible: false,
        credit_score,
        requested_rate: request.interest_rate,
        corrected_rate: request.interest_rate,
        reason,
        monthly_installment: proposed_emi,
        proposed_emi,
        current_emi_total,
    };

    let income_threshold = customer.monthly_income * policy.emi_income_cap;
    if current_emi_total + proposed_emi > income_threshold {
        return reject(DecisionReason::EmiExceedsIncomeCap);
    }

    let corrected_rate = match policy.tier_for(credit_score).map(|tier| tier.treatment) {
        Some(TierTreatment::AsRequested) => request.interest_rate,
        Some(TierTreatment::Floor(floor)) => request.interest_rate.at_least(floor),
        None => return reject(DecisionReason::CreditScoreTooLow),
    };

    EligibilityDecision {
        eligible: true,
        credit_score,
        requested_rate: request.interest_rate,
        corrected_rate,
        reason: DecisionReason::Eligible,
        monthly_installment: monthly_payment(request.loan_amount, corrected_rate, tenure),
        proposed_emi,
        current_emi_total,
    }
}
