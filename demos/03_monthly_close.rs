/// monthly close - recurring charges, statement payment and budgets
use card_ledger_rs::{
    BillingPeriod, Ledger, MemoryStore, Money, NewCard, NewPurchase, NewRecurring, PaymentMethod,
    SafeTimeProvider, StaticSession, TimeSource, Uuid,
};
use chrono::{Datelike, Duration, TimeZone, Utc};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== monthly close example ===\n");

    // controlled time
    let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()));
    let controller = time.test_control().unwrap();

    let mut ledger = Ledger::with_defaults(MemoryStore::new(), StaticSession::signed_in(Uuid::new_v4()));
    let card = ledger.create_card(NewCard::new("Visa", 25, Some(5)))?.ok_or("no user")?;

    ledger.create_expense_type("Assinaturas", Some("#a855f7"))?;
    ledger.create_expense_type("Mercado", Some("#22c55e"))?;

    ledger.create_recurring(NewRecurring {
        description: "Streaming".to_string(),
        amount: Money::from_str_exact("39.90")?,
        category: Some("Assinaturas".to_string()),
        payment_method: PaymentMethod::Card,
        card_id: Some(card.id),
        day_of_month: 8,
    })?;

    // first day of the month: materialize recurring charges
    let created = ledger.materialize_current_month(&time)?;
    println!("{} recurring purchase(s) created", created.len());

    let may = BillingPeriod::new(2024, 5)?;
    ledger.set_budget("Mercado", may, Money::from_major(600))?;
    ledger.set_budget("Assinaturas", may, Money::from_major(50))?;

    for (day, amount) in [(4, 180), (11, 220), (19, 140)] {
        let today = time.now().date_naive();
        controller.advance(Duration::days(day - today.day() as i64));
        ledger.record_purchase(
            NewPurchase::new("Feira", Money::from_major(amount), time.now().date_naive(), PaymentMethod::Card)
                .on_card(card.id)
                .category("Mercado"),
        )?;
    }

    // the statement closes on the 25th
    controller.advance(Duration::days(6));
    let statement = ledger.statement(card.id, may)?.ok_or("no user")?;
    println!("\nstatement {} closes {} due {}: {}", statement.period, statement.closing_date, statement.due_date, statement.total);

    let paid = ledger.mark_statement_paid(card.id, may, None, &time)?.ok_or("no user")?;
    println!("paid {} on {}", paid.total_paid, paid.payment_date);
    println!("purchases today go to {}", ledger.current_period(card.id, &time)?.ok_or("no user")?);

    println!("\nbudgets:");
    for line in ledger.budget_report(may)? {
        println!(
            "  {:<12} spent {:>8} of {:>8} ({:?})",
            line.budget.category, line.spent, line.budget.limit, line.status
        );
    }

    Ok(())
}
