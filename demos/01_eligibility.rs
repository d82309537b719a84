/// eligibility - rate tiers and the income cap with controlled time
use credit_approval_rs::{
    to_json_pretty, CreditError, CreditLedger, EligibilityView, LoanRejectionView, LoanRequest,
    Money, NewCustomer, Rate, SafeTimeProvider, TimeSource,
};
use chrono::{Duration, TimeZone, Utc};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== eligibility example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    ));
    let controller = time.test_control().unwrap();
    let ledger = CreditLedger::default();

    let customer = ledger.register_customer(
        NewCustomer {
            first_name: "Vikram".to_string(),
            last_name: "Shah".to_string(),
            age: 45,
            phone_number: "9800011111".to_string(),
            monthly_income: Money::from_major(60_000),
        },
        &time,
    )?;
    println!("customer {} limit {}", customer.id, customer.approved_limit);

    // a fresh customer scores high and keeps the requested rate
    let request = LoanRequest::new(Money::from_major(300_000), Rate::from_percentage(10), 12);
    let decision = ledger.check_eligibility(customer.id, &request, &time)?;
    let view = EligibilityView::from_decision(customer.id, request.tenure, &decision);
    println!("first check:\n{}", to_json_pretty(&view)?);

    ledger.create_loan(customer.id, &request, &time)?;
    controller.advance(Duration::days(30));
    println!("\nadvanced to: {}", time.now().format("%Y-%m-%d"));

    // a second installment of the same size breaches half of income
    match ledger.create_loan(customer.id, &request, &time) {
        Ok(loan) => println!("second loan approved: {}", loan.loan_id),
        Err(CreditError::NotEligible { reason, credit_score }) => {
            let view = LoanRejectionView::new(reason, credit_score);
            println!("second loan rejected:\n{}", to_json_pretty(&view)?);
        }
        Err(e) => return Err(e.into()),
    }

    println!("\nevents recorded: {}", ledger.take_events().len());

    Ok(())
}
