use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub username: String,
    #[sea_orm(unique)]
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub about_me: Option<String>,
    /// Mirrors whether an `event_members` row exists for this user.
    pub in_event: bool,
    /// Path of the profile picture, relative to the upload directory.
    pub avatar_path: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::event_member::Entity")]
    EventMember,
    #[sea_orm(has_many = "super::voted_song::Entity")]
    VotedSong,
    #[sea_orm(has_many = "super::favourite_song::Entity")]
    FavouriteSong,
    #[sea_orm(has_many = "super::song_review::Entity")]
    SongReview,
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

impl Related<super::favourite_song::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FavouriteSong.def()
    }
}

impl Related<super::song_review::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SongReview.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
