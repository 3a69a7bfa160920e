use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Card, NewCardCmd, ResultEngine, cards,
    util::{normalize_optional_text, normalize_required_text},
};

use super::{Engine, with_tx};

impl Engine {
    /// Register a card owned by `cmd.user_id`.
    pub async fn new_card(&self, cmd: NewCardCmd) -> ResultEngine<Card> {
        let card = Card {
            id: Uuid::new_v4(),
            user_id: cmd.user_id,
            number: normalize_required_text(&cmd.number, "card number")?,
            card_holder: normalize_required_text(&cmd.card_holder, "card holder")?,
            exp_date: cmd.exp_date,
            design: normalize_optional_text(cmd.design.as_deref()),
        };
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, card.user_id, "user").await?;
            cards::ActiveModel::from(&card).insert(&db_tx).await?;
            Ok(card)
        })
    }

    /// Cards owned by `user_id`.
    pub async fn cards_of(&self, user_id: Uuid) -> ResultEngine<Vec<Card>> {
        self.require_user(&self.database, user_id, "user").await?;
        let models = cards::Entity::find()
            .filter(cards::Column::UserId.eq(user_id))
            .order_by_asc(cards::Column::Number)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Card::from).collect())
    }
}
