/// billing cycle - closing days, due dates and early closure
use card_ledger_rs::{
    assign_period, period_closing_date, period_due_date, BillingPeriod, Card, Money, PaidStatement, Uuid,
};
use chrono::NaiveDate;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== billing cycle example ===\n");

    let owner = Uuid::new_v4();
    let card = Card::new(owner, "Visa", 31, Some(31))?;

    // closing and due days are clamped to the month length
    for month in 1..=12 {
        let period = BillingPeriod::new(2023, month)?;
        println!(
            "{}: closes {} / due {}",
            period,
            period_closing_date(period, card.closing_day)?,
            period_due_date(period, 31)?
        );
    }

    // nominal allocation around the closing day
    let card = Card::new(owner, "Inter", 20, Some(27))?;
    for day in [19, 20, 21] {
        let purchase_date = date(2024, 3, day);
        println!("\npurchase on {} -> {}", purchase_date, assign_period(purchase_date, &card, &[])?);
    }

    // paying the March statement early closes the cycle on the payment date
    let paid = vec![PaidStatement::new(
        owner,
        card.id,
        BillingPeriod::new(2024, 3)?,
        date(2024, 3, 15),
        Money::from_major(812),
    )];
    println!("\nMarch statement paid on 2024-03-15");
    for day in [14, 16, 18] {
        let purchase_date = date(2024, 3, day);
        println!("purchase on {} -> {}", purchase_date, assign_period(purchase_date, &card, &paid)?);
    }

    Ok(())
}
