//! Operateur entity model
//!
//! This module contains the SeaORM entity model for the operateurs table,
//! which stores one row per certified organic operator.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use serde::Serialize;

/// Organic operator registration, keyed externally by SIRET
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "operateurs")]
pub struct Model {
    /// Surrogate key, assigned on insert (primary key)
    #[sea_orm(primary_key)]
    #[serde(skip_serializing)]
    pub id: i32,

    /// 14-digit French business-establishment identifier
    pub siret: i64,

    /// Sequential organic-registration number
    pub numero_bio: i64,

    /// Business name (dénomination)
    pub nom: String,

    /// Postal code of the registered office
    pub cp: i32,

    /// Date the operator committed to the organic scheme
    pub date_engagement: Date,

    pub producteur: bool,
    pub preparateur: bool,
    pub distributeur: bool,
    pub restaurateur: bool,
    pub stockeur: bool,
    pub importateur: bool,
    pub exportateur: bool,

    /// Name of the certifying body
    pub organisme_certificateur: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
