use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::types::{CustomerId, DecisionReason, LoanId};

/// all events emitted by the ledger and the ingestion job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // customer events
    CustomerRegistered {
        customer_id: CustomerId,
        monthly_income: Money,
        approved_limit: Money,
        timestamp: DateTime<Utc>,
    },
    CustomerRemoved {
        customer_id: CustomerId,
        loans_removed: usize,
        timestamp: DateTime<Utc>,
    },

    // decision events
    EligibilityChecked {
        customer_id: CustomerId,
        eligible: bool,
        credit_score: u8,
        reason: DecisionReason,
        timestamp: DateTime<Utc>,
    },
    LoanApproved {
        customer_id: CustomerId,
        loan_id: LoanId,
        amount: Money,
        requested_rate: Rate,
        corrected_rate: Rate,
        monthly_repayment: Money,
        timestamp: DateTime<Utc>,
    },
    LoanRejected {
        customer_id: CustomerId,
        amount: Money,
        credit_score: u8,
        reason: DecisionReason,
        timestamp: DateTime<Utc>,
    },

    // ingestion events
    CustomerImported {
        customer_id: CustomerId,
        phone_number: String,
        timestamp: DateTime<Utc>,
    },
    LoanImported {
        customer_id: CustomerId,
        loan_id: LoanId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },
    RowSkipped {
        source: String,
        row: usize,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
