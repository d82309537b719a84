//! In-memory customer and loan store.
//!
//! The ledger is the storage collaborator of the engine: it owns customers
//! and their loans, feeds loan histories to the engine and records the loans
//! the engine approves. Eligibility and insertion run under one write lock,
//! so concurrent requests for the same customer never both pass the income
//! check against a stale installment total.

use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::engine::{monthly_payment, CreditEngine, EligibilityDecision};
use crate::errors::{CreditError, Result};
use crate::events::{Event, EventStore};
use crate::types::{loan_end_date, Customer, CustomerId, Loan, LoanId, LoanRequest, NewCustomer};

/// customer fields taken from a bulk record
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedCustomer {
    pub first_name: String,
    pub last_name: String,
    pub age: u32,
    pub phone_number: String,
    pub monthly_income: Money,
    pub current_debt: Money,
}

/// loan fields taken from a bulk record
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedLoan {
    pub loan_amount: Money,
    pub tenure: u32,
    pub interest_rate: Rate,
    pub emis_paid_on_time: u32,
    pub start_date: NaiveDate,
}

#[derive(Debug)]
struct LedgerState {
    next_customer_id: CustomerId,
    customers: BTreeMap<CustomerId, Customer>,
    phone_index: HashMap<String, CustomerId>,
    loans: HashMap<LoanId, Loan>,
    /// loan ids per customer, in insertion order
    customer_loans: BTreeMap<CustomerId, Vec<LoanId>>,
    events: EventStore,
}

impl LedgerState {
    fn new() -> Self {
        Self {
            next_customer_id: 1,
            customers: BTreeMap::new(),
            phone_index: HashMap::new(),
            loans: HashMap::new(),
            customer_loans: BTreeMap::new(),
            events: EventStore::new(),
        }
    }

    fn customer(&self, id: CustomerId) -> Result<&Customer> {
        self.customers
            .get(&id)
            .ok_or(CreditError::CustomerNotFound { id })
    }

    fn history(&self, id: CustomerId) -> Vec<Loan> {
        self.customer_loans
            .get(&id)
            .map(|ids| ids.iter().filter_map(|loan_id| self.loans.get(loan_id)).cloned().collect())
            .unwrap_or_default()
    }

    fn insert_customer(&mut self, mut customer: Customer) -> Customer {
        customer.id = self.next_customer_id;
        self.next_customer_id += 1;
        self.phone_index.insert(customer.phone_number.clone(), customer.id);
        self.customers.insert(customer.id, customer.clone());
        customer
    }

    fn insert_loan(&mut self, loan: Loan) {
        self.customer_loans
            .entry(loan.customer_id)
            .or_default()
            .push(loan.loan_id);
        self.loans.insert(loan.loan_id, loan);
    }
}

/// customer and loan store wired to a credit engine
///
/// Every operation appends to an in-memory event log, eligibility checks
/// included. The log is only emptied by [`CreditLedger::take_events`], so
/// long-running callers must drain it periodically.
#[derive(Debug)]
pub struct CreditLedger {
    engine: CreditEngine,
    state: RwLock<LedgerState>,
}

impl Default for CreditLedger {
    fn default() -> Self {
        Self::new(CreditEngine::default())
    }
}

impl CreditLedger {
    pub fn new(engine: CreditEngine) -> Self {
        Self {
            engine,
            state: RwLock::new(LedgerState::new()),
        }
    }

    pub fn engine(&self) -> &CreditEngine {
        &self.engine
    }

    /// register a customer; the approved limit is derived from income
    pub fn register_customer(
        &self,
        registration: NewCustomer,
        time_provider: &SafeTimeProvider,
    ) -> Result<Customer> {
        registration.validate()?;
        let phone_number = registration.phone_number.trim().to_string();

        let mut state = self.state.write();
        if state.phone_index.contains_key(&phone_number) {
            return Err(CreditError::DuplicatePhoneNumber { phone_number });
        }

        let approved_limit = self.engine.approved_limit(registration.monthly_income);
        let customer = state.insert_customer(Customer {
            id: 0,
            first_name: registration.first_name.trim().to_string(),
            last_name: registration.last_name.trim().to_string(),
            age: registration.age,
            phone_number,
            monthly_income: registration.monthly_income,
            approved_limit,
            current_debt: Money::ZERO,
        });

        state.events.emit(Event::CustomerRegistered {
            customer_id: customer.id,
            monthly_income: customer.monthly_income,
            approved_limit,
            timestamp: time_provider.now(),
        });
        info!(customer_id = customer.id, %approved_limit, "customer registered");

        Ok(customer)
    }

    pub fn customer(&self, id: CustomerId) -> Result<Customer> {
        self.state.read().customer(id).cloned()
    }

    pub fn customer_by_phone(&self, phone_number: &str) -> Option<Customer> {
        let state = self.state.read();
        state
            .phone_index
            .get(phone_number.trim())
            .and_then(|id| state.customers.get(id))
            .cloned()
    }

    pub fn loan(&self, loan_id: LoanId) -> Result<Loan> {
        self.state
            .read()
            .loans
            .get(&loan_id)
            .cloned()
            .ok_or(CreditError::LoanNotFound { id: loan_id })
    }

    /// all loans of a customer, oldest first
    pub fn customer_loans(&self, customer_id: CustomerId) -> Result<Vec<Loan>> {
        let state = self.state.read();
        state.customer(customer_id)?;
        Ok(state.history(customer_id))
    }

    /// run the engine for a request without recording anything but the event
    pub fn check_eligibility(
        &self,
        customer_id: CustomerId,
        request: &LoanRequest,
        time_provider: &SafeTimeProvider,
    ) -> Result<EligibilityDecision> {
        request.validate()?;
        let now = time_provider.now();

        let decision = {
            let state = self.state.read();
            let customer = state.customer(customer_id)?;
            let history = state.history(customer_id);
            self.engine
                .check_eligibility(customer, &history, request, now.date_naive())
        };

        debug!(
            customer_id,
            eligible = decision.eligible,
            credit_score = decision.credit_score,
            reason = %decision.reason,
            "eligibility checked"
        );

        self.state.write().events.emit(Event::EligibilityChecked {
            customer_id,
            eligible: decision.eligible,
            credit_score: decision.credit_score,
            reason: decision.reason,
            timestamp: now,
        });

        Ok(decision)
    }

    /// decide a request and, when approved, record the loan at the corrected
    /// rate starting today
    pub fn create_loan(
        &self,
        customer_id: CustomerId,
        request: &LoanRequest,
        time_provider: &SafeTimeProvider,
    ) -> Result<Loan> {
        request.validate()?;
        let now = time_provider.now();
        let today = now.date_naive();

        let mut state = self.state.write();
        let customer = state.customer(customer_id)?;
        let decision = self
            .engine
            .check_eligibility(customer, &state.history(customer_id), request, today);

        if !decision.eligible {
            state.events.emit(Event::LoanRejected {
                customer_id,
                amount: request.loan_amount,
                credit_score: decision.credit_score,
                reason: decision.reason,
                timestamp: now,
            });
            warn!(
                customer_id,
                credit_score = decision.credit_score,
                reason = %decision.reason,
                "loan rejected"
            );

            return Err(CreditError::NotEligible {
                reason: decision.reason,
                credit_score: decision.credit_score,
            });
        }

        let loan = Loan {
            loan_id: Uuid::new_v4(),
            customer_id,
            loan_amount: request.loan_amount,
            tenure: request.tenure,
            interest_rate: decision.corrected_rate,
            monthly_repayment: decision.monthly_installment,
            emis_paid_on_time: 0,
            start_date: today,
            end_date: loan_end_date(
                today,
                request.tenure,
                self.engine.policy().days_per_tenure_month,
            ),
        };
        state.insert_loan(loan.clone());

        state.events.emit(Event::LoanApproved {
            customer_id,
            loan_id: loan.loan_id,
            amount: loan.loan_amount,
            requested_rate: request.interest_rate,
            corrected_rate: loan.interest_rate,
            monthly_repayment: loan.monthly_repayment,
            timestamp: now,
        });
        info!(
            customer_id,
            loan_id = %loan.loan_id,
            amount = %loan.loan_amount,
            rate = %loan.interest_rate,
            "loan approved"
        );

        Ok(loan)
    }

    /// remove a customer together with every loan it owns
    pub fn remove_customer(
        &self,
        customer_id: CustomerId,
        time_provider: &SafeTimeProvider,
    ) -> Result<Vec<Loan>> {
        let mut state = self.state.write();
        let customer = state
            .customers
            .remove(&customer_id)
            .ok_or(CreditError::CustomerNotFound { id: customer_id })?;
        state.phone_index.remove(&customer.phone_number);

        let loan_ids = state.customer_loans.remove(&customer_id).unwrap_or_default();
        let removed: Vec<Loan> = loan_ids
            .iter()
            .filter_map(|loan_id| state.loans.remove(loan_id))
            .collect();

        state.events.emit(Event::CustomerRemoved {
            customer_id,
            loans_removed: removed.len(),
            timestamp: time_provider.now(),
        });
        info!(customer_id, loans_removed = removed.len(), "customer removed");

        Ok(removed)
    }

    /// get-or-create a customer keyed by phone number; returns whether it
    /// was created
    pub fn import_customer(
        &self,
        record: ImportedCustomer,
        time_provider: &SafeTimeProvider,
    ) -> (Customer, bool) {
        let phone_number = record.phone_number.trim().to_string();

        let mut state = self.state.write();
        if let Some(existing) = state
            .phone_index
            .get(&phone_number)
            .and_then(|id| state.customers.get(id))
        {
            return (existing.clone(), false);
        }

        let customer = state.insert_customer(Customer {
            id: 0,
            first_name: record.first_name,
            last_name: record.last_name,
            age: record.age,
            phone_number,
            monthly_income: record.monthly_income,
            approved_limit: self.engine.approved_limit(record.monthly_income),
            current_debt: record.current_debt,
        });

        state.events.emit(Event::CustomerImported {
            customer_id: customer.id,
            phone_number: customer.phone_number.clone(),
            timestamp: time_provider.now(),
        });

        (customer, true)
    }

    /// get-or-create a loan with identical terms for a customer; the
    /// repayment snapshot and end date are derived here
    pub fn import_loan(
        &self,
        customer_id: CustomerId,
        record: ImportedLoan,
        time_provider: &SafeTimeProvider,
    ) -> Result<(Loan, bool)> {
        let monthly_repayment = monthly_payment(
            record.loan_amount,
            record.interest_rate,
            i64::from(record.tenure),
        );
        let end_date = loan_end_date(
            record.start_date,
            record.tenure,
            self.engine.policy().days_per_tenure_month,
        );

        let mut state = self.state.write();
        state.customer(customer_id)?;

        let existing = state.history(customer_id).into_iter().find(|loan| {
            loan.loan_amount == record.loan_amount
                && loan.tenure == record.tenure
                && loan.interest_rate == record.interest_rate
                && loan.monthly_repayment == monthly_repayment
                && loan.start_date == record.start_date
                && loan.end_date == end_date
        });
        if let Some(loan) = existing {
            return Ok((loan, false));
        }

        let loan = Loan {
            loan_id: Uuid::new_v4(),
            customer_id,
            loan_amount: record.loan_amount,
            tenure: record.tenure,
            interest_rate: record.interest_rate,
            monthly_repayment,
            emis_paid_on_time: record.emis_paid_on_time,
            start_date: record.start_date,
            end_date,
        };
        state.insert_loan(loan.clone());

        state.events.emit(Event::LoanImported {
            customer_id,
            loan_id: loan.loan_id,
            amount: loan.loan_amount,
            timestamp: time_provider.now(),
        });

        Ok((loan, true))
    }

    pub(crate) fn emit(&self, event: Event) {
        self.state.write().events.emit(event);
    }

    /// drain the event log; nothing else releases recorded events
    pub fn take_events(&self) -> Vec<Event> {
        self.state.write().events.take_events()
    }

    pub fn pending_events(&self) -> usize {
        self.state.read().events.len()
    }

    pub fn customer_count(&self) -> usize {
        self.state.read().customers.len()
    }

    pub fn loan_count(&self) -> usize {
        self.state.read().loans.len()
    }
}
