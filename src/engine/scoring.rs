use chrono::{Datelike, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{Customer, Loan};

pub const MAX_SCORE: u8 = 100;

const ON_TIME_WEIGHT: i64 = 40;
const LOAN_COUNT_WEIGHT: i64 = 20;
const LOAN_COUNT_PENALTY: i64 = 2;
const LOAN_COUNT_CAP: usize = 10;
const ACTIVE_THIS_YEAR: i64 = 20;
const INACTIVE_THIS_YEAR: i64 = 10;
const UTILIZATION_WEIGHT: i64 = 20;

/// per-component view of a credit score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// total borrowing exceeds the approved limit; every component is zero
    pub over_limit: bool,
    pub on_time: u8,
    pub loan_count: u8,
    pub recent_activity: u8,
    pub utilization: u8,
    pub total: u8,
}

/// credit score in `[0, 100]` for a customer's loan history as of `today`
pub fn credit_score(customer: &Customer, loans: &[Loan], today: NaiveDate) -> u8 {
    score_breakdown(customer, loans, today).total
}

/// credit score with each weighted component exposed
pub fn score_breakdown(customer: &Customer, loans: &[Loan], today: NaiveDate) -> ScoreBreakdown {
    let total_amount: Money = loans.iter().map(|l| l.loan_amount).sum();
    if total_amount > customer.approved_limit {
        return ScoreBreakdown {
            over_limit: true,
            ..ScoreBreakdown::default()
        };
    }

    let on_time = on_time_component(loans);
    let loan_count = loan_count_component(loans.len());
    let recent_activity = activity_component(loans, today.year());
    let utilization = utilization_component(total_amount, customer.approved_limit);

    let total = (on_time + loan_count + recent_activity + utilization)
        .clamp(0, i64::from(MAX_SCORE));

    ScoreBreakdown {
        over_limit: false,
        on_time: to_points(on_time),
        loan_count: to_points(loan_count),
        recent_activity: to_points(recent_activity),
        utilization: to_points(utilization),
        total: to_points(total),
    }
}

/// share of installments paid on time; full credit with no history
fn on_time_component(loans: &[Loan]) -> i64 {
    let total_tenure: u64 = loans.iter().map(|l| u64::from(l.tenure)).sum();
    let paid_on_time: u64 = loans.iter().map(|l| u64::from(l.emis_paid_on_time)).sum();

    let ratio = if total_tenure > 0 {
        Decimal::from(paid_on_time) / Decimal::from(total_tenure)
    } else {
        Decimal::ONE
    };

    floor_points(ratio * Decimal::from(ON_TIME_WEIGHT))
}

fn loan_count_component(count: usize) -> i64 {
    let counted = count.min(LOAN_COUNT_CAP) as i64;
    (LOAN_COUNT_WEIGHT - LOAN_COUNT_PENALTY * counted).max(0)
}

fn activity_component(loans: &[Loan], year: i32) -> i64 {
    if loans.iter().any(|l| l.touches_year(year)) {
        ACTIVE_THIS_YEAR
    } else {
        INACTIVE_THIS_YEAR
    }
}

fn utilization_component(total_amount: Money, approved_limit: Money) -> i64 {
    let volume = total_amount.ratio_of(approved_limit).min(Decimal::ONE);
    floor_points((Decimal::ONE - volume) * Decimal::from(UTILIZATION_WEIGHT))
}

fn floor_points(points: Decimal) -> i64 {
    points.floor().to_i64().unwrap_or(0).max(0)
}

fn to_points(points: i64) -> u8 {
    points.clamp(0, i64::from(u8::MAX)) as u8
}
