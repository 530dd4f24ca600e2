use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name("idx_episodes_series_season_episode")
                    .table(Episodes::Table)
                    .col(Episodes::SeriesId)
                    .col(Episodes::SeasonNumber)
                    .col(Episodes::EpisodeNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movies_title")
                    .table(Movies::Table)
                    .col(Movies::Title)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_series_title")
                    .table(SeriesTable::Table)
                    .col(SeriesTable::Title)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_video_files_hash")
                    .table(VideoFiles::Table)
                    .col(VideoFiles::FileHash)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_episodes_series_season_episode")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(Index::drop().name("idx_movies_title").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_series_title").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_video_files_hash").to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Episodes {
    Table,
    SeriesId,
    SeasonNumber,
    EpisodeNumber,
}

#[derive(DeriveIden)]
enum Movies {
    Table,
    Title,
}

#[derive(DeriveIden)]
enum SeriesTable {
    #[sea_orm(iden = "series")]
    Table,
    Title,
}

#[derive(DeriveIden)]
enum VideoFiles {
    Table,
    FileHash,
}
