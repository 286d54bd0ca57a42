use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20240601_000001_create_records_table::Migration)]
    }
}

mod m20240601_000001_create_records_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000001_create_records_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // One table for every collection, aligned with entities::record Model
            manager
                .create_table(
                    Table::create()
                        .table(Records::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Records::Collection).string().not_null())
                        .col(ColumnDef::new(Records::Id).uuid().not_null())
                        .col(ColumnDef::new(Records::Position).big_integer().not_null())
                        .col(ColumnDef::new(Records::UniqueKey).string().null())
                        .col(ColumnDef::new(Records::Body).json().not_null())
                        .primary_key(
                            Index::create()
                                .col(Records::Collection)
                                .col(Records::Id),
                        )
                        .to_owned(),
                )
                .await?;

            // Product codes (and usernames) are unique within their collection
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_records_collection_unique_key")
                        .table(Records::Table)
                        .col(Records::Collection)
                        .col(Records::UniqueKey)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_records_collection_position")
                        .table(Records::Table)
                        .col(Records::Collection)
                        .col(Records::Position)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Records::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Records {
        Table,
        Collection,
        Id,
        Position,
        UniqueKey,
        Body,
    }
}
