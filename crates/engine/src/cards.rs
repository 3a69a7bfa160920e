//! Payment cards.
//!
//! A card is the funding instrument of a transfer and belongs to exactly one
//! user.

use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: Uuid,
    pub user_id: Uuid,
    pub number: String,
    pub card_holder: String,
    pub exp_date: Date,
    pub design: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "cards")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub number: String,
    pub card_holder: String,
    pub exp_date: Date,
    pub design: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Card> for ActiveModel {
    fn from(card: &Card) -> Self {
        Self {
            id: ActiveValue::Set(card.id),
            user_id: ActiveValue::Set(card.user_id),
            number: ActiveValue::Set(card.number.clone()),
            card_holder: ActiveValue::Set(card.card_holder.clone()),
            exp_date: ActiveValue::Set(card.exp_date),
            design: ActiveValue::Set(card.design.clone()),
        }
    }
}

impl From<Model> for Card {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            number: model.number,
            card_holder: model.card_holder,
            exp_date: model.exp_date,
            design: model.design,
        }
    }
}
