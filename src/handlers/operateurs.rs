//! # Operateur API Handlers
//!
//! This module contains handlers for the single-operator CRUD endpoints and
//! the filtered list endpoint, all keyed by SIRET.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::{ApiError, ApiJson, siret_not_found};
use crate::models::operateur::Model as OperateurModel;
use crate::repositories::{NewOperateur, OperateurFilter, OperateurRepository, UpdateOperateur};
use crate::server::AppState;

/// API representation of a stored operator
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OperateurDto {
    /// 14-digit business identifier
    #[schema(example = 82893944100016u64)]
    pub siret: i64,
    /// Store-assigned organic-registration number
    pub numero_bio: i64,
    /// Business name
    #[schema(example = "EARL DES OLIVIERS")]
    pub nom: String,
    /// Postal code of the registered office
    #[schema(example = 75001)]
    pub cp: i32,
    /// Engagement date (YYYY-MM-DD)
    pub date_engagement: NaiveDate,
    pub producteur: bool,
    pub preparateur: bool,
    pub distributeur: bool,
    pub restaurateur: bool,
    pub stockeur: bool,
    pub importateur: bool,
    pub exportateur: bool,
    /// Certifying body
    #[schema(example = "ECOCERT FRANCE")]
    pub organisme_certificateur: String,
}

impl From<OperateurModel> for OperateurDto {
    fn from(model: OperateurModel) -> Self {
        Self {
            siret: model.siret,
            numero_bio: model.numero_bio,
            nom: model.nom,
            cp: model.cp,
            date_engagement: model.date_engagement,
            producteur: model.producteur,
            preparateur: model.preparateur,
            distributeur: model.distributeur,
            restaurateur: model.restaurateur,
            stockeur: model.stockeur,
            importateur: model.importateur,
            exportateur: model.exportateur,
            organisme_certificateur: model.organisme_certificateur,
        }
    }
}

/// Request payload for creating an operator (all fields required)
///
/// `numero_bio` is absent on purpose: the store assigns the next number in
/// the sequence. Unknown fields are rejected rather than silently dropped.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateOperateurDto {
    #[schema(example = "EARL DES OLIVIERS")]
    pub nom: String,
    #[schema(example = 75001)]
    pub cp: i32,
    pub date_engagement: NaiveDate,
    pub producteur: bool,
    pub preparateur: bool,
    pub distributeur: bool,
    pub restaurateur: bool,
    pub stockeur: bool,
    pub importateur: bool,
    pub exportateur: bool,
    #[schema(example = "ECOCERT FRANCE")]
    pub organisme_certificateur: String,
}

/// Request payload for a partial update (any subset of fields)
///
/// A boolean set to `false` is a real update; an absent field is left
/// unchanged.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct PatchOperateurDto {
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

impl From<PatchOperateurDto> for UpdateOperateur {
    fn from(dto: PatchOperateurDto) -> Self {
        Self {
            nom: dto.nom,
            cp: dto.cp,
            date_engagement: dto.date_engagement,
            producteur: dto.producteur,
            preparateur: dto.preparateur,
            distributeur: dto.distributeur,
            restaurateur: dto.restaurateur,
            stockeur: dto.stockeur,
            importateur: dto.importateur,
            exportateur: dto.exportateur,
            organisme_certificateur: dto.organisme_certificateur,
        }
    }
}

/// Query parameters for the filtered list endpoint (any subset of fields)
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(deny_unknown_fields)]
pub struct OperateurFilterQuery {
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

impl From<OperateurFilterQuery> for OperateurFilter {
    fn from(query: OperateurFilterQuery) -> Self {
        Self {
            nom: query.nom,
            cp: query.cp,
            date_engagement: query.date_engagement,
            producteur: query.producteur,
            preparateur: query.preparateur,
            distributeur: query.distributeur,
            restaurateur: query.restaurateur,
            stockeur: query.stockeur,
            importateur: query.importateur,
            exportateur: query.exportateur,
            organisme_certificateur: query.organisme_certificateur,
        }
    }
}

/// Get a single operator by SIRET
#[utoipa::path(
    get,
    path = "/api/v1/resources/operateur/{siret}",
    params(
        ("siret" = i64, Path, description = "14-digit SIRET of the operator")
    ),
    responses(
        (status = 200, description = "Operator found", body = OperateurDto),
        (status = 404, description = "No operator for this SIRET", body = ApiError)
    ),
    tag = "operateurs"
)]
pub async fn get_operateur(
    State(state): State<AppState>,
    Path(siret): Path<i64>,
) -> Result<Json<OperateurDto>, ApiError> {
    let repo = OperateurRepository::new(&state.db);

    let operateur = repo
        .find_by_siret(siret)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| siret_not_found(siret))?;

    Ok(Json(operateur.into()))
}

/// Create an operator for a SIRET not yet present in the store
#[utoipa::path(
    put,
    path = "/api/v1/resources/operateur/{siret}",
    params(
        ("siret" = i64, Path, description = "14-digit SIRET of the operator")
    ),
    request_body = CreateOperateurDto,
    responses(
        (status = 201, description = "Operator created", body = OperateurDto),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 409, description = "SIRET already registered", body = ApiError)
    ),
    tag = "operateurs"
)]
pub async fn create_operateur(
    State(state): State<AppState>,
    Path(siret): Path<i64>,
    ApiJson(request): ApiJson<CreateOperateurDto>,
) -> Result<(StatusCode, Json<OperateurDto>), ApiError> {
    let repo = OperateurRepository::new(&state.db);

    let operateur = repo
        .create(
            siret,
            NewOperateur {
                nom: request.nom,
                cp: request.cp,
                date_engagement: request.date_engagement,
                producteur: request.producteur,
                preparateur: request.preparateur,
                distributeur: request.distributeur,
                restaurateur: request.restaurateur,
                stockeur: request.stockeur,
                importateur: request.importateur,
                exportateur: request.exportateur,
                organisme_certificateur: request.organisme_certificateur,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(operateur.into())))
}

/// Partially update an operator by SIRET
#[utoipa::path(
    patch,
    path = "/api/v1/resources/operateur/{siret}",
    params(
        ("siret" = i64, Path, description = "14-digit SIRET of the operator")
    ),
    request_body = PatchOperateurDto,
    responses(
        (status = 200, description = "Operator updated", body = OperateurDto),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 404, description = "No operator for this SIRET", body = ApiError)
    ),
    tag = "operateurs"
)]
pub async fn patch_operateur(
    State(state): State<AppState>,
    Path(siret): Path<i64>,
    ApiJson(request): ApiJson<PatchOperateurDto>,
) -> Result<Json<OperateurDto>, ApiError> {
    let repo = OperateurRepository::new(&state.db);

    let operateur = repo.update_by_siret(siret, request.into()).await?;

    Ok(Json(operateur.into()))
}

/// Delete all records for a SIRET
#[utoipa::path(
    delete,
    path = "/api/v1/resources/operateur/{siret}",
    params(
        ("siret" = i64, Path, description = "14-digit SIRET of the operator")
    ),
    responses(
        (status = 204, description = "Operator deleted"),
        (status = 404, description = "No operator for this SIRET", body = ApiError)
    ),
    tag = "operateurs"
)]
pub async fn delete_operateur(
    State(state): State<AppState>,
    Path(siret): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let repo = OperateurRepository::new(&state.db);

    repo.delete_by_siret(siret).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// List operators matching every provided equality filter
#[utoipa::path(
    get,
    path = "/api/v1/resources/operateurs-filtres",
    params(OperateurFilterQuery),
    responses(
        (status = 200, description = "Matching operators", body = [OperateurDto]),
        (status = 400, description = "No filter field provided", body = ApiError),
        (status = 404, description = "No operator matches the filters", body = ApiError)
    ),
    tag = "operateurs"
)]
pub async fn list_operateurs_filtres(
    State(state): State<AppState>,
    Query(query): Query<OperateurFilterQuery>,
) -> Result<Json<Vec<OperateurDto>>, ApiError> {
    let repo = OperateurRepository::new(&state.db);

    let operateurs = repo.find_by_filters(&query.into()).await?;

    if operateurs.is_empty() {
        return Err(ApiError::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "pas d'opérateur trouvé en base satisfaisant les filtres demandés",
        ));
    }

    Ok(Json(
        operateurs.into_iter().map(OperateurDto::from).collect(),
    ))
}
