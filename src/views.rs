/// serializable response payloads for customers, loans and decisions
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::engine::EligibilityDecision;
use crate::types::{Customer, CustomerId, DecisionReason, Loan, LoanId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerView {
    pub id: CustomerId,
    pub first_name: String,
    pub last_name: String,
    pub age: u32,
    pub phone_number: String,
    pub monthly_income: Money,
    pub approved_limit: Money,
    pub current_debt: Money,
}

impl From<&Customer> for CustomerView {
    fn from(customer: &Customer) -> Self {
        CustomerView {
            id: customer.id,
            first_name: customer.first_name.clone(),
            last_name: customer.last_name.clone(),
            age: customer.age,
            phone_number: customer.phone_number.clone(),
            monthly_income: customer.monthly_income,
            approved_limit: customer.approved_limit,
            current_debt: customer.current_debt,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanView {
    pub loan_id: LoanId,
    pub customer: CustomerId,
    pub loan_amount: Money,
    pub tenure: u32,
    /// annual percent
    pub interest_rate: Decimal,
    pub monthly_repayment: Money,
    pub emis_paid_on_time: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl From<&Loan> for LoanView {
    fn from(loan: &Loan) -> Self {
        LoanView {
            loan_id: loan.loan_id,
            customer: loan.customer_id,
            loan_amount: loan.loan_amount,
            tenure: loan.tenure,
            interest_rate: loan.interest_rate.as_percentage(),
            monthly_repayment: loan.monthly_repayment,
            emis_paid_on_time: loan.emis_paid_on_time,
            start_date: loan.start_date,
            end_date: loan.end_date,
        }
    }
}

/// eligibility response; rates are annual percents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityView {
    pub customer_id: CustomerId,
    pub eligible: bool,
    pub credit_score: u8,
    pub interest_rate: Decimal,
    pub corrected_interest_rate: Decimal,
    pub tenure: u32,
    pub monthly_installment: Money,
    pub message: String,
}

impl EligibilityView {
    pub fn from_decision(
        customer_id: CustomerId,
        tenure: u32,
        decision: &EligibilityDecision,
    ) -> Self {
        EligibilityView {
            customer_id,
            eligible: decision.eligible,
            credit_score: decision.credit_score,
            interest_rate: decision.requested_rate.as_percentage(),
            corrected_interest_rate: decision.corrected_rate.as_percentage(),
            tenure,
            monthly_installment: decision.monthly_installment,
            message: decision.reason.to_string(),
        }
    }
}

/// response for a loan that was not created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRejectionView {
    pub eligible: bool,
    pub credit_score: u8,
    pub message: String,
}

impl LoanRejectionView {
    pub fn new(reason: DecisionReason, credit_score: u8) -> Self {
        LoanRejectionView {
            eligible: false,
            credit_score,
            message: reason.to_string(),
        }
    }
}

/// convert a view to a pretty-printed json string
pub fn to_json_pretty<T: Serialize>(view: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(view)
}
