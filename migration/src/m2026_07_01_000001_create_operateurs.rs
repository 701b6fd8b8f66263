//! Migration to create the operateurs table.
//!
//! Creates the baseline operateurs table with an auto-incrementing surrogate
//! key and a unique index on the SIRET business identifier.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Operateurs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Operateurs::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Operateurs::Siret).big_integer().not_null())
                    .col(
                        ColumnDef::new(Operateurs::NumeroBio)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Operateurs::Nom).string_len(150).not_null())
                    .col(ColumnDef::new(Operateurs::Cp).integer().not_null())
                    .col(
                        ColumnDef::new(Operateurs::DateEngagement)
                            .date()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Operateurs::Producteur).boolean().not_null())
                    .col(
                        ColumnDef::new(Operateurs::Preparateur)
                            .boolean()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Operateurs::Distributeur)
                            .boolean()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Operateurs::Restaurateur)
                            .boolean()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Operateurs::Stockeur).boolean().not_null())
                    .col(
                        ColumnDef::new(Operateurs::Importateur)
                            .boolean()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Operateurs::Exportateur)
                            .boolean()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Operateurs::OrganismeCertificateur)
                            .string_len(100)
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // SIRET is the external key for every single-record operation; the
        // legacy schema left it unconstrained and accumulated duplicates.
        manager
            .create_index(
                Index::create()
                    .name("idx_operateurs_siret_unique")
                    .table(Operateurs::Table)
                    .col(Operateurs::Siret)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Operateurs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Operateurs {
    Table,
    Id,
    Siret,
    NumeroBio,
    Nom,
    Cp,
    DateEngagement,
    Producteur,
    Preparateur,
    Distributeur,
    Restaurateur,
    Stockeur,
    Importateur,
    Exportateur,
    OrganismeCertificateur,
}
