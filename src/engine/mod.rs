pub mod amortization;
pub mod eligibility;
pub mod scoring;

use chrono::NaiveDate;

use crate::config::PolicyConfig;
use crate::decimal::Money;
use crate::errors::Result;
use crate::types::{Customer, Loan, LoanRequest};

pub use amortization::{approved_limit, monthly_payment};
pub use eligibility::{check_eligibility, current_emi_total, EligibilityDecision};
pub use scoring::{credit_score, score_breakdown, ScoreBreakdown, MAX_SCORE};

/// scoring and eligibility engine bound to a credit policy
///
/// Holds no state besides the policy; every call is a pure function of its
/// arguments and the engine can be shared freely across threads.
#[derive(Debug, Clone, Default)]
pub struct CreditEngine {
    policy: PolicyConfig,
}

impl CreditEngine {
    pub fn new(policy: PolicyConfig) -> Result<Self> {
        policy.validate()?;
        Ok(Self { policy })
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    pub fn approved_limit(&self, monthly_income: Money) -> Money {
        approved_limit(monthly_income, &self.policy)
    }

    pub fn credit_score(&self, customer: &Customer, loans: &[Loan], today: NaiveDate) -> u8 {
        credit_score(customer, loans, today)
    }

    pub fn check_eligibility(
        &self,
        customer: &Customer,
        loans: &[Loan],
        request: &LoanRequest,
        today: NaiveDate,
    ) -> EligibilityDecision {
        check_eligibility(customer, loans, request, today, &self.policy)
    }
}
