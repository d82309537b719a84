use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::errors::{CreditError, Result};

/// sequential identifier for a customer
pub type CustomerId = u64;

/// unique identifier for a loan
pub type LoanId = Uuid;

const MAX_NAME_LEN: usize = 100;
const MAX_PHONE_LEN: usize = 20;
const MIN_AGE: u32 = 18;
const MAX_AGE: u32 = 120;
const MAX_RATE_PERCENT: Decimal = dec!(999.99);
/// twelve digits, two of them fractional
const MAX_AMOUNT: Decimal = dec!(9_999_999_999.99);
const AMOUNT_DP: u32 = 2;

/// registered customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub first_name: String,
    pub last_name: String,
    pub age: u32,
    pub phone_number: String,
    pub monthly_income: Money,
    /// credit ceiling, always a multiple of the limit rounding unit
    pub approved_limit: Money,
    /// informational only; never read by the engine
    pub current_debt: Money,
}

/// loan held by a customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub loan_id: LoanId,
    pub customer_id: CustomerId,
    pub loan_amount: Money,
    /// term in months
    pub tenure: u32,
    pub interest_rate: Rate,
    /// installment snapshot taken at creation, never recomputed
    pub monthly_repayment: Money,
    pub emis_paid_on_time: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Loan {
    /// true when the loan starts or ends in the given calendar year
    pub fn touches_year(&self, year: i32) -> bool {
        use chrono::Datelike;
        self.start_date.year() == year || self.end_date.year() == year
    }
}

/// end date of a loan: `days_per_month` days for every month of tenure
pub fn loan_end_date(start: NaiveDate, tenure: u32, days_per_month: u32) -> NaiveDate {
    let days = u64::from(tenure) * u64::from(days_per_month);
    start.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX)
}

/// registration payload for a new customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub first_name: String,
    pub last_name: String,
    pub age: u32,
    pub phone_number: String,
    pub monthly_income: Money,
}

impl NewCustomer {
    pub fn validate(&self) -> Result<()> {
        validate_name("first_name", &self.first_name)?;
        validate_name("last_name", &self.last_name)?;

        if !(MIN_AGE..=MAX_AGE).contains(&self.age) {
            return Err(CreditError::invalid(
                "age",
                format!("must be between {} and {}", MIN_AGE, MAX_AGE),
            ));
        }

        let phone = self.phone_number.trim();
        if phone.is_empty() || phone.chars().count() > MAX_PHONE_LEN {
            return Err(CreditError::invalid(
                "phone_number",
                format!("must be 1 to {} characters", MAX_PHONE_LEN),
            ));
        }

        if self.monthly_income.is_negative() {
            return Err(CreditError::invalid("monthly_income", "must not be negative"));
        }
        if !is_currency_amount(self.monthly_income.as_decimal()) {
            return Err(CreditError::invalid(
                "monthly_income",
                format!("must be at most {} with two decimal places", MAX_AMOUNT),
            ));
        }

        Ok(())
    }
}

fn validate_name(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() || value.chars().count() > MAX_NAME_LEN {
        return Err(CreditError::invalid(
            field,
            format!("must be 1 to {} characters", MAX_NAME_LEN),
        ));
    }
    Ok(())
}

fn has_two_places(value: Decimal) -> bool {
    value.normalize().scale() <= AMOUNT_DP
}

/// a non-negative currency amount of at most twelve digits, two fractional
pub(crate) fn is_currency_amount(value: Decimal) -> bool {
    value >= Decimal::ZERO && value <= MAX_AMOUNT && has_two_places(value)
}

/// an annual percent in `[0, 999.99]` with at most two decimal places
pub(crate) fn is_rate_percent(percent: Decimal) -> bool {
    percent >= Decimal::ZERO && percent <= MAX_RATE_PERCENT && has_two_places(percent)
}

/// requested loan terms
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoanRequest {
    pub loan_amount: Money,
    pub interest_rate: Rate,
    pub tenure: u32,
}

impl LoanRequest {
    pub fn new(loan_amount: Money, interest_rate: Rate, tenure: u32) -> Self {
        Self {
            loan_amount,
            interest_rate,
            tenure,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.loan_amount.is_positive() {
            return Err(CreditError::invalid("loan_amount", "must be positive"));
        }
        if !is_currency_amount(self.loan_amount.as_decimal()) {
            return Err(CreditError::invalid(
                "loan_amount",
                format!("must be at most {} with two decimal places", MAX_AMOUNT),
            ));
        }

        if !is_rate_percent(self.interest_rate.as_percentage()) {
            return Err(CreditError::invalid(
                "interest_rate",
                format!("must be between 0 and {} with two decimal places", MAX_RATE_PERCENT),
            ));
        }

        if self.tenure == 0 {
            return Err(CreditError::invalid("tenure", "must be at least one month"));
        }

        Ok(())
    }
}

/// why a request was accepted or rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionReason {
    Eligible,
    EmiExceedsIncomeCap,
    CreditScoreTooLow,
}

impl DecisionReason {
    pub fn message(&self) -> &'static str {
        match self {
            DecisionReason::Eligible => "Eligible",
            DecisionReason::EmiExceedsIncomeCap => "EMI exceeds 50% income",
            DecisionReason::CreditScoreTooLow => "Credit score too low",
        }
    }
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}
