pub mod config;
pub mod decimal;
pub mod engine;
pub mod errors;
pub mod events;
pub mod ingestion;
pub mod ledger;
pub mod types;
pub mod views;

// re-export key types
pub use config::{AppConfig, IngestionConfig, PolicyConfig, RateTier, TierTreatment};
pub use decimal::{Money, Rate};
pub use engine::{
    approved_limit, check_eligibility, credit_score, current_emi_total, monthly_payment,
    score_breakdown, CreditEngine, EligibilityDecision, ScoreBreakdown, MAX_SCORE,
};
pub use errors::{CreditError, Result};
pub use events::{Event, EventStore};
pub use ingestion::{
    ingest_batch, load_batch, run_ingestion, Cell, CustomerRecord, IngestionBatch,
    IngestionReport, LoanRecord, RecordSource, SkipReason, SkippedRow,
};
pub use ledger::{CreditLedger, ImportedCustomer, ImportedLoan};
pub use types::{
    loan_end_date, Customer, CustomerId, DecisionReason, Loan, LoanId, LoanRequest, NewCustomer,
};
pub use views::{to_json_pretty, CustomerView, EligibilityView, LoanRejectionView, LoanView};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
