/// installments - plans, rounding remainder and plans already in progress
use card_ledger_rs::{
    generate_installments, Card, Ledger, MemoryStore, Money, NewCard, NewInstallmentPlan, NewPurchase,
    PaymentMethod, StaticSession, Uuid,
};
use chrono::NaiveDate;
use tracing_subscriber::EnvFilter;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== installments example ===\n");

    // the last installment absorbs the rounding remainder
    let card = Card::new(Uuid::new_v4(), "Visa", 10, None)?;
    let plan = generate_installments(Money::from_major(100), date(2024, 11, 20), 3, 1, Some(&card))?;
    for installment in &plan.installments {
        println!("{} due {}: {}", installment.label(), installment.due_date, installment.amount);
    }
    println!("total: {}", plan.total());

    // without a card the start date is advanced month by month
    let plan = generate_installments(Money::from_major(300), date(2024, 1, 31), 3, 1, None)?;
    let due: Vec<String> = plan.installments.iter().map(|i| i.due_date.to_string()).collect();
    println!("\ncalendar schedule: {}", due.join(", "));

    // through the ledger
    let mut ledger = Ledger::with_defaults(MemoryStore::new(), StaticSession::signed_in(Uuid::new_v4()));
    let card = ledger.create_card(NewCard::new("Nubank", 3, Some(10)))?.ok_or("no user")?;

    let tv = ledger
        .record_purchase(
            NewPurchase::new("TV", Money::from_major(2_999), date(2024, 5, 2), PaymentMethod::Card)
                .on_card(card.id)
                .in_installments(10),
        )?
        .ok_or("no user")?;
    println!("\n{} in {} installments:", tv.description, tv.installment_count.unwrap_or(1));
    for installment in ledger.installments_for_purchase(tv.id)? {
        println!("  {} due {}: {}", installment.description, installment.due_date, installment.amount);
    }

    // a plan that started before it was tracked
    let resumed = ledger
        .create_installment_in_progress(NewInstallmentPlan {
            description: "Notebook".to_string(),
            total_amount: Money::from_major(4_800),
            start_date: date(2024, 5, 10),
            count: 12,
            start_index: 9,
            card_id: Some(card.id),
            category: Some("Eletrônicos".to_string()),
        })?
        .ok_or("no user")?;
    println!("\nresumed plan: {} installments left", resumed.len());

    for event in ledger.events.take_events() {
        println!("event: {:?}", event);
    }

    Ok(())
}
