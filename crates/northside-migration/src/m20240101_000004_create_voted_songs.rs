use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_users::Users;
use super::m20240101_000002_create_events::Events;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VotedSongs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(VotedSongs::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(VotedSongs::EventId).uuid().not_null())
                    .col(ColumnDef::new(VotedSongs::UserId).uuid().not_null())
                    .col(ColumnDef::new(VotedSongs::TrackId).string_len(64).not_null())
                    .col(ColumnDef::new(VotedSongs::SongName).string_len(255).not_null())
                    .col(
                        ColumnDef::new(VotedSongs::ArtistName)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VotedSongs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_voted_songs_event_id")
                            .from(VotedSongs::Table, VotedSongs::EventId)
                            .to(Events::Table, Events::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_voted_songs_user_id")
                            .from(VotedSongs::Table, VotedSongs::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // A user votes for a given track at most once per event.
        manager
            .create_index(
                Index::create()
                    .name("idx_voted_songs_unique_vote")
                    .table(VotedSongs::Table)
                    .col(VotedSongs::EventId)
                    .col(VotedSongs::UserId)
                    .col(VotedSongs::TrackId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_voted_songs_event_track")
                    .table(VotedSongs::Table)
                    .col(VotedSongs::EventId)
                    .col(VotedSongs::TrackId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VotedSongs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum VotedSongs {
    Table,
    Id,
    EventId,
    UserId,
    TrackId,
    SongName,
    ArtistName,
    CreatedAt,
}
