//! Bulk ingestion of customer and loan records.
//!
//! Records arrive as header-keyed rows exported from the customer and loan
//! sheets. Cells may hold text or numbers. Rows that cannot be tied to a
//! customer are skipped and reported; they never abort the batch.

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime};
use hourglass_rs::SafeTimeProvider;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::config::IngestionConfig;
use crate::decimal::{round_half_up, Money, Rate, CURRENCY_DP};
use crate::errors::{CreditError, Result};
use crate::events::Event;
use crate::ledger::{CreditLedger, ImportedCustomer, ImportedLoan};
use crate::types::{is_currency_amount, is_rate_percent};

/// a spreadsheet cell as exported to json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    /// trimmed text form; numbers keep their plain representation
    pub fn as_text(&self) -> Option<String> {
        let text = match self {
            Cell::Int(i) => i.to_string(),
            Cell::Float(f) => f.to_string(),
            Cell::Text(s) => s.trim().to_string(),
        };
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Cell::Int(i) => Some(Decimal::from(*i)),
            Cell::Float(f) => Decimal::from_str(&f.to_string()).ok(),
            Cell::Text(s) => Decimal::from_str(s.trim().replace(',', "").as_str()).ok(),
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        self.as_decimal()
            .filter(|d| *d >= Decimal::ZERO)
            .and_then(|d| d.trunc().to_u32())
    }

    /// calendar date from ISO text or a spreadsheet serial day number
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Int(serial) => from_serial_day(*serial),
            Cell::Float(serial) => serial.trunc().to_i64().and_then(from_serial_day),
            Cell::Text(s) => parse_date_text(s.trim()),
        }
    }
}

// day zero of spreadsheet serial dates
fn from_serial_day(serial: i64) -> Option<NaiveDate> {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    let days = u64::try_from(serial).ok()?;
    epoch.checked_add_days(Days::new(days))
}

fn parse_date_text(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_date_time(text, "%Y-%m-%d %H:%M:%S"))
        .or_else(|| parse_date_time(text, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.date_naive()))
}

fn parse_date_time(text: &str, format: &str) -> Option<NaiveDate> {
    NaiveDateTime::parse_from_str(text, format)
        .ok()
        .map(|dt| dt.date())
}

/// one row of the customer sheet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomerRecord {
    pub first_name: Option<Cell>,
    pub last_name: Option<Cell>,
    pub age: Option<Cell>,
    pub phone_number: Option<Cell>,
    pub monthly_income: Option<Cell>,
    pub current_debt: Option<Cell>,
}

/// one row of the loan sheet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoanRecord {
    pub phone_number: Option<Cell>,
    pub loan_amount: Option<Cell>,
    pub tenure: Option<Cell>,
    pub interest_rate: Option<Cell>,
    pub emis_paid_on_time: Option<Cell>,
    pub start_date: Option<Cell>,
}

/// customer and loan rows of one ingestion run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestionBatch {
    pub customers: Vec<CustomerRecord>,
    pub loans: Vec<LoanRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordSource {
    Customers,
    Loans,
}

impl fmt::Display for RecordSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordSource::Customers => f.write_str("customers"),
            RecordSource::Loans => f.write_str("loans"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    MissingPhoneNumber,
    UnknownCustomer { phone_number: String },
    InvalidValue { field: &'static str, value: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingPhoneNumber => f.write_str("missing phone number"),
            SkipReason::UnknownCustomer { phone_number } => {
                write!(f, "no customer with phone number {}", phone_number)
            }
            SkipReason::InvalidValue { field, value } => {
                write!(f, "invalid {}: {}", field, value)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    pub source: RecordSource,
    /// 1-based position in the source file
    pub row: usize,
    pub reason: SkipReason,
}

/// outcome of an ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestionReport {
    pub customers_created: usize,
    pub customers_existing: usize,
    pub loans_created: usize,
    pub loans_existing: usize,
    pub skipped: Vec<SkippedRow>,
}

/// read the batch files named by the config; absent files yield no rows
pub fn load_batch(config: &IngestionConfig) -> Result<IngestionBatch> {
    Ok(IngestionBatch {
        customers: read_records(&config.customer_path())?,
        loans: read_records(&config.loan_path())?,
    })
}

fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        debug!(path = %path.display(), "ingestion file absent, skipping");
        return Ok(Vec::new());
    }

    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| CreditError::Ingestion {
        file: path.display().to_string(),
        message: e.to_string(),
    })
}

/// load the configured files and ingest them into the ledger
pub fn run_ingestion(
    ledger: &CreditLedger,
    config: &IngestionConfig,
    time_provider: &SafeTimeProvider,
) -> Result<IngestionReport> {
    let batch = load_batch(config)?;
    Ok(ingest_batch(ledger, &batch, time_provider))
}

/// ingest customers first, then loans, so loans can reference customers
/// from the same batch
pub fn ingest_batch(
    ledger: &CreditLedger,
    batch: &IngestionBatch,
    time_provider: &SafeTimeProvider,
) -> IngestionReport {
    let mut report = IngestionReport::default();

    for (index, record) in batch.customers.iter().enumerate() {
        let row = index + 1;
        match customer_from_record(record) {
            Ok(imported) => {
                let (_, created) = ledger.import_customer(imported, time_provider);
                if created {
                    report.customers_created += 1;
                } else {
                    report.customers_existing += 1;
                }
            }
            Err(reason) => {
                skip(ledger, &mut report, RecordSource::Customers, row, reason, time_provider)
            }
        }
    }

    let today = time_provider.now().date_naive();
    for (index, record) in batch.loans.iter().enumerate() {
        let row = index + 1;
        let outcome = loan_from_record(record, today).and_then(|(phone_number, imported)| {
            let customer = ledger
                .customer_by_phone(&phone_number)
                .ok_or(SkipReason::UnknownCustomer { phone_number })?;
            ledger
                .import_loan(customer.id, imported, time_provider)
                .map_err(|_| SkipReason::UnknownCustomer {
                    phone_number: customer.phone_number.clone(),
                })
        });

        match outcome {
            Ok((_, true)) => report.loans_created += 1,
            Ok((_, false)) => report.loans_existing += 1,
            Err(reason) => {
                skip(ledger, &mut report, RecordSource::Loans, row, reason, time_provider)
            }
        }
    }

    info!(
        customers_created = report.customers_created,
        customers_existing = report.customers_existing,
        loans_created = report.loans_created,
        loans_existing = report.loans_existing,
        skipped = report.skipped.len(),
        "ingestion finished"
    );

    report
}

fn skip(
    ledger: &CreditLedger,
    report: &mut IngestionReport,
    source: RecordSource,
    row: usize,
    reason: SkipReason,
    time_provider: &SafeTimeProvider,
) {
    warn!(%source, row, %reason, "skipping row");
    ledger.emit(Event::RowSkipped {
        source: source.to_string(),
        row,
        reason: reason.to_string(),
        timestamp: time_provider.now(),
    });
    report.skipped.push(SkippedRow { source, row, reason });
}

fn phone_of(cell: &Option<Cell>) -> std::result::Result<String, SkipReason> {
    cell.as_ref()
        .and_then(Cell::as_text)
        .ok_or(SkipReason::MissingPhoneNumber)
}

fn text_or_empty(cell: &Option<Cell>) -> String {
    cell.as_ref().and_then(Cell::as_text).unwrap_or_default()
}

/// numeric cell; absent or blank is zero, unparsable is an error
fn decimal_or_zero(
    cell: &Option<Cell>,
    field: &'static str,
) -> std::result::Result<Decimal, SkipReason> {
    match cell {
        None => Ok(Decimal::ZERO),
        Some(Cell::Text(s)) if s.trim().is_empty() => Ok(Decimal::ZERO),
        Some(c) => c.as_decimal().ok_or_else(|| invalid(field, c)),
    }
}

/// currency cell stored at two places; negative or oversized is an error
fn amount_or_zero(
    cell: &Option<Cell>,
    field: &'static str,
) -> std::result::Result<Money, SkipReason> {
    let amount = round_half_up(decimal_or_zero(cell, field)?, CURRENCY_DP);
    if is_currency_amount(amount) {
        Ok(Money::from_decimal(amount))
    } else {
        Err(out_of_range(field, amount))
    }
}

/// annual percent cell stored at two places; outside `[0, 999.99]` is an error
fn rate_or_zero(cell: &Option<Cell>) -> std::result::Result<Rate, SkipReason> {
    let percent = round_half_up(decimal_or_zero(cell, "interest_rate")?, CURRENCY_DP);
    if is_rate_percent(percent) {
        Ok(Rate::from_percent(percent))
    } else {
        Err(out_of_range("interest_rate", percent))
    }
}

fn count_or_zero(cell: &Option<Cell>, field: &'static str) -> std::result::Result<u32, SkipReason> {
    match cell {
        None => Ok(0),
        Some(Cell::Text(s)) if s.trim().is_empty() => Ok(0),
        Some(c) => c.as_u32().ok_or_else(|| invalid(field, c)),
    }
}

fn invalid(field: &'static str, cell: &Cell) -> SkipReason {
    SkipReason::InvalidValue {
        field,
        value: cell.as_text().unwrap_or_default(),
    }
}

fn out_of_range(field: &'static str, value: Decimal) -> SkipReason {
    SkipReason::InvalidValue {
        field,
        value: value.to_string(),
    }
}

fn customer_from_record(
    record: &CustomerRecord,
) -> std::result::Result<ImportedCustomer, SkipReason> {
    let phone_number = phone_of(&record.phone_number)?;
    Ok(ImportedCustomer {
        first_name: text_or_empty(&record.first_name),
        last_name: text_or_empty(&record.last_name),
        age: count_or_zero(&record.age, "age")?,
        phone_number,
        monthly_income: amount_or_zero(&record.monthly_income, "monthly_income")?,
        current_debt: amount_or_zero(&record.current_debt, "current_debt")?,
    })
}

fn loan_from_record(
    record: &LoanRecord,
    today: NaiveDate,
) -> std::result::Result<(String, ImportedLoan), SkipReason> {
    let phone_number = phone_of(&record.phone_number)?;

    let tenure = count_or_zero(&record.tenure, "tenure")?;
    if tenure == 0 {
        return Err(SkipReason::InvalidValue {
            field: "tenure",
            value: "0".to_string(),
        });
    }

    let emis_paid_on_time = count_or_zero(&record.emis_paid_on_time, "emis_paid_on_time")?;
    if emis_paid_on_time > tenure {
        return Err(SkipReason::InvalidValue {
            field: "emis_paid_on_time",
            value: emis_paid_on_time.to_string(),
        });
    }

    let loan_amount = amount_or_zero(&record.loan_amount, "loan_amount")?;
    let interest_rate = rate_or_zero(&record.interest_rate)?;
    let start_date = record
        .start_date
        .as_ref()
        .and_then(Cell::as_date)
        .unwrap_or(today);

    Ok((
        phone_number,
        ImportedLoan {
            loan_amount,
            tenure,
            interest_rate,
            emis_paid_on_time,
            start_date,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use hourglass_rs::TimeSource;
    use rust_decimal_macros::dec;

    fn time() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
        ))
    }

    fn batch() -> IngestionBatch {
        serde_json::from_str(
            r#"{
                "customers": [
                    { "first_name": "Aaron", "last_name": "Garcia", "age": 63,
                      "phone_number": 9629317944, "monthly_income": 9000, "current_debt": 0 },
                    { "first_name": "Carmelo", "last_name": "Cohen", "age": "30",
                      "phone_number": "9732633970", "monthly_income": "110000.50" },
                    { "first_name": "Nobody", "monthly_income": 50000 },
                    { "phone_number": "9000000000", "monthly_income": "lots" }
                ],
                "loans": [
                    { "phone_number": 9629317944, "loan_amount": 900000, "tenure": 138,
                      "interest_rate": 16.93, "emis_paid_on_time": 138,
                      "start_date": "2022-11-20" },
                    { "phone_number": "9732633970", "loan_amount": 200000, "tenure": 12,
                      "interest_rate": "9.5", "emis_paid_on_time": 4, "start_date": 44927 },
                    { "phone_number": "9732633970", "loan_amount": 50000, "tenure": 6,
                      "interest_rate": 8 },
                    { "phone_number": "1111111111", "loan_amount": 1000, "tenure": 6 },
                    { "loan_amount": 1000, "tenure": 6 },
                    { "phone_number": 9629317944, "loan_amount": 1000, "tenure": 0 }
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_cell_conversions() {
        assert_eq!(Cell::Int(9629317944).as_text().unwrap(), "9629317944");
        assert_eq!(Cell::Text("  ".to_string()).as_text(), None);
        assert_eq!(Cell::Float(16.93).as_decimal().unwrap(), dec!(16.93));
        assert_eq!(Cell::Text("1,50,000".to_string()).as_decimal().unwrap(), dec!(150000));
        assert_eq!(Cell::Float(12.0).as_u32(), Some(12));
        assert_eq!(Cell::Int(-3).as_u32(), None);
        assert_eq!(
            Cell::Int(44927).as_date(),
            NaiveDate::from_ymd_opt(2023, 1, 1)
        );
        assert_eq!(
            Cell::Text("2023-05-04 00:00:00".to_string()).as_date(),
            NaiveDate::from_ymd_opt(2023, 5, 4)
        );
        assert_eq!(Cell::Text("not a date".to_string()).as_date(), None);
    }

    #[test]
    fn test_ingest_batch() {
        let ledger = CreditLedger::default();
        let time = time();

        let report = ingest_batch(&ledger, &batch(), &time);

        assert_eq!(report.customers_created, 2);
        assert_eq!(report.loans_created, 3);
        assert_eq!(report.skipped.len(), 5);
        assert_eq!(
            report.skipped[0],
            SkippedRow {
                source: RecordSource::Customers,
                row: 3,
                reason: SkipReason::MissingPhoneNumber,
            }
        );
        assert!(matches!(
            report.skipped[1].reason,
            SkipReason::InvalidValue { field: "monthly_income", .. }
        ));
        assert_eq!(
            report.skipped[2].reason,
            SkipReason::UnknownCustomer { phone_number: "1111111111".to_string() }
        );
        assert_eq!(report.skipped[3].reason, SkipReason::MissingPhoneNumber);
        assert!(matches!(
            report.skipped[4].reason,
            SkipReason::InvalidValue { field: "tenure", .. }
        ));

        let aaron = ledger.customer_by_phone("9629317944").unwrap();
        assert_eq!(aaron.approved_limit, Money::from_major(300_000));

        let carmelo = ledger.customer_by_phone("9732633970").unwrap();
        assert_eq!(carmelo.age, 30);
        assert_eq!(carmelo.monthly_income, Money::from_decimal(dec!(110000.50)));
        assert_eq!(carmelo.approved_limit, Money::from_major(4_000_000));

        let loans = ledger.customer_loans(carmelo.id).unwrap();
        assert_eq!(loans.len(), 2);
        assert_eq!(loans[0].start_date, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(loans[0].interest_rate, Rate::from_percent(dec!(9.5)));
        assert_eq!(
            loans[0].monthly_repayment,
            crate::engine::monthly_payment(
                Money::from_major(200_000),
                Rate::from_percent(dec!(9.5)),
                12
            )
        );
        // missing start date falls back to today
        assert_eq!(loans[1].start_date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(loans[1].end_date, NaiveDate::from_ymd_opt(2024, 11, 28).unwrap());

        let skipped_events = ledger
            .take_events()
            .into_iter()
            .filter(|e| matches!(e, Event::RowSkipped { .. }))
            .count();
        assert_eq!(skipped_events, 5);
    }

    #[test]
    fn test_out_of_range_values_are_skipped() {
        let ledger = CreditLedger::default();
        let batch: IngestionBatch = serde_json::from_str(
            r#"{
                "customers": [
                    { "first_name": "Ira", "phone_number": "9555500001", "monthly_income": 40000 },
                    { "first_name": "Neg", "phone_number": "9555500002", "monthly_income": -5 }
                ],
                "loans": [
                    { "phone_number": "9555500001", "loan_amount": 1000, "tenure": 28,
                      "interest_rate": 10800 },
                    { "phone_number": "9555500001", "loan_amount": 1000, "tenure": 3,
                      "interest_rate": -2400 },
                    { "phone_number": "9555500001", "loan_amount": -1000, "tenure": 12,
                      "interest_rate": 10 },
                    { "phone_number": "9555500001", "loan_amount": "1200.004", "tenure": 12,
                      "interest_rate": "12.005" }
                ]
            }"#,
        )
        .unwrap();

        let report = ingest_batch(&ledger, &batch, &time());

        assert_eq!(report.customers_created, 1);
        assert_eq!(report.loans_created, 1);
        let fields: Vec<_> = report
            .skipped
            .iter()
            .map(|row| match &row.reason {
                SkipReason::InvalidValue { field, .. } => *field,
                other => panic!("unexpected skip: {}", other),
            })
            .collect();
        assert_eq!(
            fields,
            vec!["monthly_income", "interest_rate", "interest_rate", "loan_amount"]
        );

        // stored at two places, half-up
        let customer = ledger.customer_by_phone("9555500001").unwrap();
        let loans = ledger.customer_loans(customer.id).unwrap();
        assert_eq!(loans[0].loan_amount, Money::from_decimal(dec!(1200.00)));
        assert_eq!(loans[0].interest_rate, Rate::from_percent(dec!(12.01)));
    }

    #[test]
    fn test_reingesting_does_not_duplicate() {
        let ledger = CreditLedger::default();
        let time = time();

        ingest_batch(&ledger, &batch(), &time);
        let again = ingest_batch(&ledger, &batch(), &time);

        assert_eq!(again.customers_created, 0);
        assert_eq!(again.customers_existing, 2);
        assert_eq!(again.loans_created, 0);
        assert_eq!(again.loans_existing, 3);
        assert_eq!(ledger.customer_count(), 2);
        assert_eq!(ledger.loan_count(), 3);
    }

    #[test]
    fn test_run_ingestion_from_directory() {
        let dir = std::env::temp_dir().join(format!("credit-ingest-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("customer_data.json"),
            r#"[{ "first_name": "Ira", "last_name": "Sen", "age": 41,
                  "phone_number": "9555500000", "monthly_income": 40000 }]"#,
        )
        .unwrap();

        let ledger = CreditLedger::default();
        let config = IngestionConfig::with_data_dir(&dir);
        let report = run_ingestion(&ledger, &config, &time()).unwrap();

        // loan file is absent
        assert_eq!(report.customers_created, 1);
        assert_eq!(report.loans_created, 0);
        assert_eq!(
            ledger.customer_by_phone("9555500000").unwrap().approved_limit,
            Money::from_major(1_400_000)
        );

        std::fs::write(dir.join("loan_data.json"), "{ not json").unwrap();
        let result = run_ingestion(&ledger, &config, &time());
        assert!(matches!(result, Err(CreditError::Ingestion { .. })));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
