//! Initial migration creating the commit record table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CommitRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CommitRecords::CommitId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    // Origin
                    .col(
                        ColumnDef::new(CommitRecords::ProjectId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CommitRecords::Branch).string().not_null())
                    // Authorship
                    .col(
                        ColumnDef::new(CommitRecords::AuthorName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CommitRecords::AuthorEmail)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CommitRecords::CommitterEmail)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CommitRecords::CommittedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    // Size
                    .col(
                        ColumnDef::new(CommitRecords::Additions)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CommitRecords::Deletions)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CommitRecords::ParentIds)
                            .json()
                            .not_null()
                            .default(Expr::cust("'[]'")),
                    )
                    .col(
                        ColumnDef::new(CommitRecords::HarvestedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Per-author reports
        manager
            .create_index(
                Index::create()
                    .name("idx_commit_records_author_name")
                    .table(CommitRecords::Table)
                    .col(CommitRecords::AuthorName)
                    .to_owned(),
            )
            .await?;

        // Window queries
        manager
            .create_index(
                Index::create()
                    .name("idx_commit_records_committed_at")
                    .table(CommitRecords::Table)
                    .col(CommitRecords::CommittedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CommitRecords::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
#[sea_orm(iden = "commit_records")]
enum CommitRecords {
    Table,
    CommitId,
    ProjectId,
    Branch,
    AuthorName,
    AuthorEmail,
    CommitterEmail,
    CommittedAt,
    Additions,
    Deletions,
    ParentIds,
    HarvestedAt,
}
