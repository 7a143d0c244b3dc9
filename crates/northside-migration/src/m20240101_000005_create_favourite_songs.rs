use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FavouriteSongs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(FavouriteSongs::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(FavouriteSongs::TrackId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FavouriteSongs::SongName)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FavouriteSongs::ArtistName)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FavouriteSongs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(FavouriteSongs::UserId)
                            .col(FavouriteSongs::TrackId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_favourite_songs_user_id")
                            .from(FavouriteSongs::Table, FavouriteSongs::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FavouriteSongs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum FavouriteSongs {
    Table,
    UserId,
    TrackId,
    SongName,
    ArtistName,
    CreatedAt,
}
