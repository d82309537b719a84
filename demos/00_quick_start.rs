/// quick start - register a customer and book a loan
use credit_approval_rs::{
    to_json_pretty, CreditLedger, LoanRequest, LoanView, Money, NewCustomer, Rate,
    SafeTimeProvider, TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let time = SafeTimeProvider::new(TimeSource::System);
    let ledger = CreditLedger::default();

    // approved limit is derived from income
    let customer = ledger.register_customer(
        NewCustomer {
            first_name: "Asha".to_string(),
            last_name: "Rao".to_string(),
            age: 34,
            phone_number: "9876543210".to_string(),
            monthly_income: Money::from_major(100_000),
        },
        &time,
    )?;
    println!("approved limit: {}", customer.approved_limit);

    // book a 12 month loan at 12%
    let request = LoanRequest::new(Money::from_major(100_000), Rate::from_percentage(12), 12);
    let loan = ledger.create_loan(customer.id, &request, &time)?;

    println!("{}", to_json_pretty(&LoanView::from(&loan))?);

    Ok(())
}
