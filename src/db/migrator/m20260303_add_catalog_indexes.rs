use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name("idx_movies_tmdb_id")
                    .table(Movies::Table)
                    .col(Movies::TmdbId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_movies_imdb_id")
                    .table(Movies::Table)
                    .col(Movies::ImdbId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_movies_watched")
                    .table(Movies::Table)
                    .col(Movies::Watched)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_series_tmdb_id")
                    .table(SeriesTable::Table)
                    .col(SeriesTable::TmdbId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_series_tvdb_id")
                    .table(SeriesTable::Table)
                    .col(SeriesTable::TvdbId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_series_imdb_id")
                    .table(SeriesTable::Table)
                    .col(SeriesTable::ImdbId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_series_watched")
                    .table(SeriesTable::Table)
                    .col(SeriesTable::Watched)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_video_files_path")
                    .table(VideoFiles::Table)
                    .col(VideoFiles::Path)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for name in [
            "idx_movies_tmdb_id",
            "idx_movies_imdb_id",
            "idx_movies_watched",
            "idx_series_tmdb_id",
            "idx_series_tvdb_id",
            "idx_series_imdb_id",
            "idx_series_watched",
            "idx_video_files_path",
        ] {
            manager
                .drop_index(Index::drop().name(name).to_owned())
                .await?;
        }
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Movies {
    Table,
    TmdbId,
    ImdbId,
    Watched,
}

#[derive(DeriveIden)]
enum SeriesTable {
    #[sea_orm(iden = "series")]
    Table,
    TmdbId,
    TvdbId,
    ImdbId,
    Watched,
}

#[derive(DeriveIden)]
enum VideoFiles {
    Table,
    Path,
}
