use tracing::{info, instrument};
use uuid::Uuid;

use super::Ledger;
use crate::errors::Result;
use crate::events::Event;
use crate::models::{Card, NewCard, PaidStatement};
use crate::session::SessionProvider;
use crate::store::{Filter, Record, Store, StoreExt};
use crate::types::CardId;

impl<S: Store, P: SessionProvider> Ledger<S, P> {
    /// register a card
    #[instrument(skip(self, new), fields(name = %new.name))]
    pub fn create_card(&mut self, new: NewCard) -> Result<Option<Card>> {
        let Some(user) = self.user() else {
            return Ok(None);
        };
        new.validate()?;

        let card = Card {
            id: Uuid::new_v4(),
            owner_id: user,
            name: new.name.trim().to_string(),
            brand: new.brand,
            credit_limit: new.credit_limit,
            closing_day: new.closing_day,
            due_day: new.due_day,
            color: new.color,
        };
        let card = self.store.insert_record(&card)?;

        info!(card_id = %card.id, closing_day = card.closing_day, "card created");
        self.events.emit(Event::CardCreated {
            card_id: card.id,
            name: card.name.clone(),
        });
        Ok(Some(card))
    }

    /// replace a card's editable fields
    #[instrument(skip(self, changes))]
    pub fn update_card(&mut self, card_id: CardId, changes: NewCard) -> Result<Option<Card>> {
        let Some(user) = self.user() else {
            return Ok(None);
        };
        changes.validate()?;

        let mut card: Card = self.require(user, card_id)?;
        card.name = changes.name.trim().to_string();
        card.brand = changes.brand;
        card.credit_limit = changes.credit_limit;
        card.closing_day = changes.closing_day;
        card.due_day = changes.due_day;
        card.color = changes.color;
        self.store.update_record(&card)?;

        self.events.emit(Event::CardUpdated { card_id });
        Ok(Some(card))
    }

    /// Delete a card and its paid statements. Purchases and installments
    /// keep their reference. Returns the number of cards deleted.
    #[instrument(skip(self))]
    pub fn delete_card(&mut self, card_id: CardId) -> Result<usize> {
        let Some(user) = self.user() else {
            return Ok(0);
        };
        let card: Card = self.require(user, card_id)?;

        let statements_removed = self.store.delete(
            PaidStatement::TABLE,
            &[Filter::eq("owner_id", user), Filter::eq("card_id", card.id)],
        )?;
        let deleted = self.store.delete_by_id::<Card>(card.id)?;

        info!(%card_id, statements_removed, "card deleted");
        self.events.emit(Event::CardDeleted {
            card_id,
            statements_removed,
        });
        Ok(deleted)
    }

    /// cards of the signed-in user, by name
    pub fn list_cards(&self) -> Result<Vec<Card>> {
        let Some(user) = self.user() else {
            return Ok(Vec::new());
        };
        self.store.fetch(&self.owned(user).order_by("name", true))
    }

    pub fn card(&self, card_id: CardId) -> Result<Option<Card>> {
        let Some(user) = self.user() else {
            return Ok(None);
        };
        let query = self.owned(user).eq("id", card_id).limit(1);
        Ok(self.store.fetch::<Card>(&query)?.into_iter().next())
    }
}
