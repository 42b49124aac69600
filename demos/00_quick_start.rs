/// quick start - minimal example to get started
use card_ledger_rs::{Ledger, MemoryStore, Money, NewCard, NewPurchase, PaymentMethod, StaticSession, Uuid};
use chrono::NaiveDate;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // a ledger over an in-memory store with a signed-in user
    let mut ledger = Ledger::with_defaults(MemoryStore::new(), StaticSession::signed_in(Uuid::new_v4()));

    // card closing on the 10th, due on the 17th
    let card = ledger
        .create_card(NewCard::new("Nubank", 10, Some(17)))?
        .ok_or("no user signed in")?;

    // buy something on the card
    let purchase = ledger
        .record_purchase(
            NewPurchase::new("Mercado", Money::from_major(250), NaiveDate::from_ymd_opt(2024, 3, 12).unwrap(), PaymentMethod::Card)
                .on_card(card.id),
        )?
        .ok_or("no user signed in")?;

    // made after the closing day, so it lands in the next statement
    let period = ledger.purchase_period(purchase.id)?.ok_or("not a card purchase")?;
    println!("purchase billed in {}", period);

    let statement = ledger.statement(card.id, period)?.ok_or("no user signed in")?;
    println!("{}", statement.to_json_pretty()?);

    Ok(())
}
