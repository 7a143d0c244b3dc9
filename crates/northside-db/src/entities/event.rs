use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    /// Numeric join code handed out to guests.
    #[sea_orm(unique)]
    pub code: i32,
    pub is_active: bool,
    pub location: String,
    pub description: Option<String>,
    pub owner_id: Uuid,
    pub dj_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id"
    )]
    Owner,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::DjId",
        to = "super::user::Column::Id"
    )]
    Dj,
    #[sea_orm(has_many = "super::event_member::Entity")]
    EventMember,
    #[sea_orm(has_many = "super::voted_song::Entity")]
    VotedSong,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::event_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EventMember.def()
    }
}

impl Related<super::voted_song::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VotedSong.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
