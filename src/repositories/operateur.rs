//! # Operateur Repository
//!
//! This module contains the repository implementation for Operateur entities,
//! providing keyed lookups by SIRET, filtered listing, and the sequential
//! `numero_bio` assignment used by the create path.

use crate::error::RepositoryError;
use crate::models::operateur::{
    ActiveModel as OperateurActiveModel, Column, Entity as Operateur, Model as OperateurModel,
};
use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};

/// Maximum length of the business name column.
const NOM_MAX_LEN: usize = 150;
/// Maximum length of the certifying body column.
const ORGANISME_MAX_LEN: usize = 100;

/// Request data for creating a new operator through the API.
///
/// `numero_bio` is intentionally absent: the store assigns it.
#[derive(Debug, Clone)]
pub struct NewOperateur {
    pub nom: String,
    pub cp: i32,
    pub date_engagement: NaiveDate,
    pub producteur: bool,
    pub preparateur: bool,
    pub distributeur: bool,
    pub restaurateur: bool,
    pub stockeur: bool,
    pub importateur: bool,
    pub exportateur: bool,
    pub organisme_certificateur: String,
}

/// A normalized feed row ready for insertion.
///
/// Unlike [`NewOperateur`], the registration number comes from the feed
/// itself rather than from the store sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperateurDraft {
    pub siret: i64,
    pub numero_bio: i64,
    pub nom: String,
    pub cp: i32,
    pub date_engagement: NaiveDate,
    pub producteur: bool,
    pub preparateur: bool,
    pub distributeur: bool,
    pub restaurateur: bool,
    pub stockeur: bool,
    pub importateur: bool,
    pub exportateur: bool,
    pub organisme_certificateur: String,
}

impl From<OperateurDraft> for OperateurActiveModel {
    fn from(draft: OperateurDraft) -> Self {
        Self {
            siret: Set(draft.siret),
            numero_bio: Set(draft.numero_bio),
            nom: Set(draft.nom),
            cp: Set(draft.cp),
            date_engagement: Set(draft.date_engagement),
            producteur: Set(draft.producteur),
            preparateur: Set(draft.preparateur),
            distributeur: Set(draft.distributeur),
            restaurateur: Set(draft.restaurateur),
            stockeur: Set(draft.stockeur),
            importateur: Set(draft.importateur),
            exportateur: Set(draft.exportateur),
            organisme_certificateur: Set(draft.organisme_certificateur),
            ..Default::default()
        }
    }
}

/// Partial update where `None` means "leave unchanged".
///
/// Booleans are wrapped in `Option` so that an explicit `false` is a real
/// update, not an absent field.
#[derive(Debug, Clone, Default)]
pub struct UpdateOperateur {
    pub nom: Option<String>,
    pub cp: Option<i32>,
    pub date_engagement: Option<NaiveDate>,
    pub producteur: Option<bool>,
    pub preparateur: Option<bool>,
    pub distributeur: Option<bool>,
    pub restaurateur: Option<bool>,
    pub stockeur: Option<bool>,
    pub importateur: Option<bool>,
    pub exportateur: Option<bool>,
    pub organisme_certificateur: Option<String>,
}

impl UpdateOperateur {
    /// True when no field is provided; such a patch leaves the record untouched.
    pub fn is_empty(&self) -> bool {
        self.nom.is_none()
            && self.cp.is_none()
            && self.date_engagement.is_none()
            && self.producteur.is_none()
            && self.preparateur.is_none()
            && self.distributeur.is_none()
            && self.restaurateur.is_none()
            && self.stockeur.is_none()
            && self.importateur.is_none()
            && self.exportateur.is_none()
            && self.organisme_certificateur.is_none()
    }
}

/// Equality filters AND-combined over any subset of fields.
#[derive(Debug, Clone, Default)]
pub struct OperateurFilter {
    pub nom: Option<String>,
    pub cp: Option<i32>,
    pub date_engagement: Option<NaiveDate>,
    pub producteur: Option<bool>,
    pub preparateur: Option<bool>,
    pub distributeur: Option<bool>,
    pub restaurateur: Option<bool>,
    pub stockeur: Option<bool>,
    pub importateur: Option<bool>,
    pub exportateur: Option<bool>,
    pub organisme_certificateur: Option<String>,
}

impl OperateurFilter {
    /// True when no filter field is provided.
    pub fn is_empty(&self) -> bool {
        self.nom.is_none()
            && self.cp.is_none()
            && self.date_engagement.is_none()
            && self.producteur.is_none()
            && self.preparateur.is_none()
            && self.distributeur.is_none()
            && self.restaurateur.is_none()
            && self.stockeur.is_none()
            && self.importateur.is_none()
            && self.exportateur.is_none()
            && self.organisme_certificateur.is_none()
    }

    fn condition(&self) -> Condition {
        let mut condition = Condition::all();
        if let Some(ref nom) = self.nom {
            condition = condition.add(Column::Nom.eq(nom.clone()));
        }
        if let Some(cp) = self.cp {
            condition = condition.add(Column::Cp.eq(cp));
        }
        if let Some(date) = self.date_engagement {
            condition = condition.add(Column::DateEngagement.eq(date));
        }
        if let Some(producteur) = self.producteur {
            condition = condition.add(Column::Producteur.eq(producteur));
        }
        if let Some(preparateur) = self.preparateur {
            condition = condition.add(Column::Preparateur.eq(preparateur));
        }
        if let Some(distributeur) = self.distributeur {
            condition = condition.add(Column::Distributeur.eq(distributeur));
        }
        if let Some(restaurateur) = self.restaurateur {
            condition = condition.add(Column::Restaurateur.eq(restaurateur));
        }
        if let Some(stockeur) = self.stockeur {
            condition = condition.add(Column::Stockeur.eq(stockeur));
        }
        if let Some(importateur) = self.importateur {
            condition = condition.add(Column::Importateur.eq(importateur));
        }
        if let Some(exportateur) = self.exportateur {
            condition = condition.add(Column::Exportateur.eq(exportateur));
        }
        if let Some(ref organisme) = self.organisme_certificateur {
            condition = condition.add(Column::OrganismeCertificateur.eq(organisme.clone()));
        }
        condition
    }
}

/// Repository for Operateur database operations
pub struct OperateurRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> OperateurRepository<'a> {
    /// Create a new OperateurRepository with the given database connection
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a new operator with a store-assigned `numero_bio`.
    ///
    /// The existence check, the sequence read, and the insert all run inside
    /// one transaction so two concurrent creates cannot observe the same
    /// maximum. An empty store starts the sequence at 1.
    pub async fn create(
        &self,
        siret: i64,
        request: NewOperateur,
    ) -> Result<OperateurModel, RepositoryError> {
        validate_siret(siret)?;
        validate_nom(&request.nom)?;
        validate_organisme(&request.organisme_certificateur)?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(RepositoryError::database_error)?;

        let existing = Operateur::find()
            .filter(Column::Siret.eq(siret))
            .one(&txn)
            .await
            .map_err(RepositoryError::database_error)?;
        if existing.is_some() {
            return Err(RepositoryError::Conflict(
                "un enregistrement existe déjà pour ce numéro SIRET".to_string(),
            ));
        }

        let next_numero_bio = Operateur::find()
            .order_by_desc(Column::NumeroBio)
            .one(&txn)
            .await
            .map_err(RepositoryError::database_error)?
            .map_or(1, |latest| latest.numero_bio + 1);

        let operateur = OperateurActiveModel {
            siret: Set(siret),
            numero_bio: Set(next_numero_bio),
            nom: Set(request.nom),
            cp: Set(request.cp),
            date_engagement: Set(request.date_engagement),
            producteur: Set(request.producteur),
            preparateur: Set(request.preparateur),
            distributeur: Set(request.distributeur),
            restaurateur: Set(request.restaurateur),
            stockeur: Set(request.stockeur),
            importateur: Set(request.importateur),
            exportateur: Set(request.exportateur),
            organisme_certificateur: Set(request.organisme_certificateur),
            ..Default::default()
        };

        let result = operateur
            .insert(&txn)
            .await
            .map_err(RepositoryError::database_error)?;

        txn.commit().await.map_err(RepositoryError::database_error)?;

        Ok(result)
    }

    /// Insert a normalized feed row, keeping its feed-assigned `numero_bio`.
    ///
    /// A duplicate SIRET surfaces as a conflict through the unique index.
    pub async fn insert_draft(
        &self,
        draft: OperateurDraft,
    ) -> Result<OperateurModel, RepositoryError> {
        OperateurActiveModel::from(draft)
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Get an operator by SIRET (first match)
    pub async fn find_by_siret(
        &self,
        siret: i64,
    ) -> Result<Option<OperateurModel>, RepositoryError> {
        Operateur::find()
            .filter(Column::Siret.eq(siret))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// List all operators matching every provided filter field.
    ///
    /// An empty filter set is a caller error, not a "return everything"
    /// request.
    pub async fn find_by_filters(
        &self,
        filter: &OperateurFilter,
    ) -> Result<Vec<OperateurModel>, RepositoryError> {
        if filter.is_empty() {
            return Err(RepositoryError::EmptyFilter);
        }

        Operateur::find()
            .filter(filter.condition())
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Maximum `numero_bio` across all records, or `None` on an empty store
    pub async fn max_numero_bio(&self) -> Result<Option<i64>, RepositoryError> {
        Ok(Operateur::find()
            .order_by_desc(Column::NumeroBio)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .map(|latest| latest.numero_bio))
    }

    /// Apply a partial update to the operator with the given SIRET.
    ///
    /// Each provided field overwrites the stored value; an empty patch
    /// returns the record unchanged.
    pub async fn update_by_siret(
        &self,
        siret: i64,
        update: UpdateOperateur,
    ) -> Result<OperateurModel, RepositoryError> {
        let operateur = self.find_by_siret(siret).await?.ok_or_else(|| {
            RepositoryError::NotFound(
                "pas d'opérateur trouvé en base pour le SIRET fourni".to_string(),
            )
        })?;

        if update.is_empty() {
            return Ok(operateur);
        }

        if let Some(ref nom) = update.nom {
            validate_nom(nom)?;
        }
        if let Some(ref organisme) = update.organisme_certificateur {
            validate_organisme(organisme)?;
        }

        let mut active = operateur.into_active_model();
        if let Some(nom) = update.nom {
            active.nom = Set(nom);
        }
        if let Some(cp) = update.cp {
            active.cp = Set(cp);
        }
        if let Some(date) = update.date_engagement {
            active.date_engagement = Set(date);
        }
        if let Some(producteur) = update.producteur {
            active.producteur = Set(producteur);
        }
        if let Some(preparateur) = update.preparateur {
            active.preparateur = Set(preparateur);
        }
        if let Some(distributeur) = update.distributeur {
            active.distributeur = Set(distributeur);
        }
        if let Some(restaurateur) = update.restaurateur {
            active.restaurateur = Set(restaurateur);
        }
        if let Some(stockeur) = update.stockeur {
            active.stockeur = Set(stockeur);
        }
        if let Some(importateur) = update.importateur {
            active.importateur = Set(importateur);
        }
        if let Some(exportateur) = update.exportateur {
            active.exportateur = Set(exportateur);
        }
        if let Some(organisme) = update.organisme_certificateur {
            active.organisme_certificateur = Set(organisme);
        }

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Delete every record matching the given SIRET.
    ///
    /// Returns the number of rows removed; zero matches is a not-found error
    /// so a second delete reports the same outcome as deleting a SIRET that
    /// never existed.
    pub async fn delete_by_siret(&self, siret: i64) -> Result<u64, RepositoryError> {
        let result = Operateur::delete_many()
            .filter(Column::Siret.eq(siret))
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound(
                "pas d'opérateur trouvé en base pour le SIRET fourni".to_string(),
            ));
        }

        Ok(result.rows_affected)
    }

    /// Total number of stored operators
    pub async fn count(&self) -> Result<u64, RepositoryError> {
        Operateur::find()
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }
}

fn validate_siret(siret: i64) -> Result<(), RepositoryError> {
    if siret <= 0 {
        return Err(RepositoryError::validation_error(
            "SIRET must be a positive integer",
        ));
    }
    Ok(())
}

fn validate_nom(nom: &str) -> Result<(), RepositoryError> {
    if nom.trim().is_empty() {
        return Err(RepositoryError::validation_error("nom cannot be empty"));
    }
    if nom.chars().count() > NOM_MAX_LEN {
        return Err(RepositoryError::validation_error(format!(
            "nom cannot exceed {} characters",
            NOM_MAX_LEN
        )));
    }
    Ok(())
}

fn validate_organisme(organisme: &str) -> Result<(), RepositoryError> {
    if organisme.trim().is_empty() {
        return Err(RepositoryError::validation_error(
            "organisme_certificateur cannot be empty",
        ));
    }
    if organisme.chars().count() > ORGANISME_MAX_LEN {
        return Err(RepositoryError::validation_error(format!(
            "organisme_certificateur cannot exceed {} characters",
            ORGANISME_MAX_LEN
        )));
    }
    Ok(())
}
