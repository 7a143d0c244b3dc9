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
                    .table(SongReviews::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SongReviews::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SongReviews::TrackId).string_len(64).not_null())
                    .col(ColumnDef::new(SongReviews::UserId).uuid().not_null())
                    .col(ColumnDef::new(SongReviews::Body).string_len(140).not_null())
                    .col(
                        ColumnDef::new(SongReviews::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_song_reviews_user_id")
                            .from(SongReviews::Table, SongReviews::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_song_reviews_track_id")
                    .table(SongReviews::Table)
                    .col(SongReviews::TrackId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SongReviews::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum SongReviews {
    Table,
    Id,
    TrackId,
    UserId,
    Body,
    CreatedAt,
}
