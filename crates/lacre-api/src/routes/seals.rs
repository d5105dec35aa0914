//! # Seal Routes
//!
//! - `GET    /v1/seals`              — filtered, paginated listing
//! - `POST   /v1/seals/generate`     — mint a range of codes
//! - `GET    /v1/seals/next-number`  — suggested start for the next range
//! - `GET    /v1/seals/:id`          — one seal
//! - `PUT    /v1/seals/:id`          — lifecycle update
//! - `DELETE /v1/seals/:id`          — administrative hard delete
//! - `POST   /v1/seals/:id/consume`  — consume a held seal on a package

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use lacre_core::{LotNumber, SealStatus, SectorId};
use lacre_engine::generator::DEFAULT_PREFIX;
use lacre_engine::{
    ConsumeSeal, GenerateSeals, GenerationReport, NextNumber, PageRequest, Seal, SealFilter,
    SealPage, SealPatch, DEFAULT_PAGE_LIMIT,
};

use super::seal_id;
use crate::error::AppError;
use crate::extractors::{extract_json, extract_query, extract_validated_json, Validate};
use crate::state::AppState;

/// Assemble the seal router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/seals", get(list_seals))
        .route("/v1/seals/generate", post(generate_seals))
        .route("/v1/seals/next-number", get(next_number))
        .route(
            "/v1/seals/:id",
            get(get_seal).put(update_seal).delete(delete_seal),
        )
        .route("/v1/seals/:id/consume", post(consume_seal))
}

// ---------------------------------------------------------------------------
// Request and response types
// ---------------------------------------------------------------------------

/// One seal as returned by the API.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SealResponse {
    pub id: i64,
    pub code: String,
    /// Canonical status.
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot_number: Option<String>,
    /// Sector currently holding the seal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector_id: Option<i64>,
    /// Package the seal was consumed on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_package_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destruction_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Seal> for SealResponse {
    fn from(seal: Seal) -> Self {
        Self {
            id: seal.id.get(),
            code: seal.code.as_str().to_string(),
            status: seal.status.as_str().to_string(),
            lot_number: seal.lot_number.map(String::from),
            sector_id: seal.sector_id.map(|s| s.get()),
            linked_package_id: seal.linked_package_id.map(|p| p.get()),
            destruction_reason: seal.destruction_reason,
            created_at: seal.created_at,
            updated_at: seal.updated_at,
        }
    }
}

/// One page of seals, most recent first.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SealListResponse {
    pub seals: Vec<SealResponse>,
    /// Number of seals matching the filter across all pages.
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

impl From<SealPage> for SealListResponse {
    fn from(page: SealPage) -> Self {
        let total_pages = page.total_pages();
        Self {
            seals: page.seals.into_iter().map(SealResponse::from).collect(),
            total: page.total,
            page: page.page,
            limit: page.limit,
            total_pages,
        }
    }
}

/// Listing filters. All criteria are combined.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListSealsQuery {
    /// One-based page number (default 1).
    pub page: Option<u32>,
    /// Page size, 1 to 1000 (default 24).
    pub limit: Option<u32>,
    /// Case-insensitive substring of the code or lot.
    pub search: Option<String>,
    /// Status, in any accepted spelling.
    pub status: Option<String>,
    pub sector_id: Option<i64>,
    /// Exact lot label.
    pub lot: Option<String>,
}

impl ListSealsQuery {
    fn into_filter(self) -> Result<(SealFilter, PageRequest), AppError> {
        let status = match self.status.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(
                SealStatus::canonicalize(raw)
                    .ok_or_else(|| AppError::Validation(format!("unknown seal status: {raw:?}")))?,
            ),
            _ => None,
        };
        let filter = SealFilter {
            search: self
                .search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            status,
            sector_id: self.sector_id.map(SectorId::new).transpose()?,
            lot_number: LotNumber::optional(self.lot.as_deref())?,
        };
        let page = PageRequest {
            page: self.page.unwrap_or(1),
            limit: self.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
        };
        Ok((filter, page))
    }
}

/// Request to mint seals `start..=end` under a prefix.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GenerateSealsRequest {
    /// Code prefix. Absent means `LACRE`; a blank prefix is rejected.
    #[serde(default)]
    pub prefix: Option<String>,
    pub start: i64,
    pub end: i64,
    #[serde(default)]
    pub lot_number: Option<String>,
}

impl Validate for GenerateSealsRequest {
    fn validate(&self) -> Result<(), String> {
        if self.end < self.start {
            return Err(format!(
                "end ({}) must not be less than start ({})",
                self.end, self.start
            ));
        }
        Ok(())
    }
}

/// Outcome of a generation run.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GenerationResponse {
    pub prefix: String,
    pub start: u64,
    pub end: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot_number: Option<String>,
    pub first_code: String,
    pub last_code: String,
    /// Codes in the range.
    pub requested: u64,
    /// Codes actually created; existing codes are skipped.
    pub inserted: u64,
}

impl From<GenerationReport> for GenerationResponse {
    fn from(r: GenerationReport) -> Self {
        Self {
            prefix: r.prefix.into(),
            start: r.start,
            end: r.end,
            lot_number: r.lot_number.map(String::from),
            first_code: r.first_code.as_str().to_string(),
            last_code: r.last_code.as_str().to_string(),
            requested: r.requested,
            inserted: r.inserted,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NextNumberQuery {
    /// Code prefix (default `LACRE`).
    pub prefix: Option<String>,
}

/// Suggested start for the next generation run.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NextNumberResponse {
    pub prefix: String,
    /// Highest sequence number in use, absent when the prefix is unused.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highest: Option<u64>,
    pub next: u64,
    pub next_code: String,
}

impl From<NextNumber> for NextNumberResponse {
    fn from(n: NextNumber) -> Self {
        Self {
            prefix: n.prefix.into(),
            highest: n.highest,
            next: n.next,
            next_code: n.next_code.as_str().to_string(),
        }
    }
}

/// Partial update. Omitted fields keep their stored value; an explicit
/// `null` clears `sector_id` or `linked_package_id`.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateSealRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    #[schema(value_type = Option<i64>)]
    pub sector_id: Option<Option<i64>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    #[schema(value_type = Option<i64>)]
    pub linked_package_id: Option<Option<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destruction_reason: Option<String>,
}

impl Validate for UpdateSealRequest {
    fn validate(&self) -> Result<(), String> {
        if self.status.is_none()
            && self.sector_id.is_none()
            && self.linked_package_id.is_none()
            && self.destruction_reason.is_none()
        {
            return Err("update must change at least one field".to_string());
        }
        Ok(())
    }
}

/// Consume a held seal on a package.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConsumeSealRequest {
    pub package_id: i64,
    /// Sector sealing the package; must hold the seal.
    pub sector_id: i64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// List seals, most recent first.
#[utoipa::path(
    get,
    path = "/v1/seals",
    params(ListSealsQuery),
    responses(
        (status = 200, description = "Page of seals", body = SealListResponse),
        (status = 422, description = "Invalid filter or page", body = crate::error::ErrorBody),
    ),
    tag = "seals"
)]
async fn list_seals(
    State(state): State<AppState>,
    query: Result<Query<ListSealsQuery>, QueryRejection>,
) -> Result<Json<SealListResponse>, AppError> {
    let (filter, page) = extract_query(query)?.into_filter()?;
    let page = state.engine.list(&filter, page).await?;
    Ok(Json(page.into()))
}

/// Mint one `available` seal per number of the range.
#[utoipa::path(
    post,
    path = "/v1/seals/generate",
    request_body = GenerateSealsRequest,
    responses(
        (status = 201, description = "Seals generated", body = GenerationResponse),
        (status = 422, description = "Invalid range", body = crate::error::ErrorBody),
    ),
    tag = "seals"
)]
async fn generate_seals(
    State(state): State<AppState>,
    body: Result<Json<GenerateSealsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<GenerationResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let report = state
        .engine
        .generate(&GenerateSeals {
            prefix: req.prefix,
            start: req.start,
            end: req.end,
            lot_number: req.lot_number,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(report.into())))
}

/// Highest sequence in use under a prefix and the number after it.
#[utoipa::path(
    get,
    path = "/v1/seals/next-number",
    params(NextNumberQuery),
    responses(
        (status = 200, description = "Next sequence number", body = NextNumberResponse),
        (status = 422, description = "Invalid prefix", body = crate::error::ErrorBody),
    ),
    tag = "seals"
)]
async fn next_number(
    State(state): State<AppState>,
    query: Result<Query<NextNumberQuery>, QueryRejection>,
) -> Result<Json<NextNumberResponse>, AppError> {
    let query = extract_query(query)?;
    let prefix = query
        .prefix
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_PREFIX.to_string());
    let next = state.engine.next_number(&prefix).await?;
    Ok(Json(next.into()))
}

/// Get one seal.
#[utoipa::path(
    get,
    path = "/v1/seals/{id}",
    params(("id" = i64, Path, description = "Seal id")),
    responses(
        (status = 200, description = "Seal", body = SealResponse),
        (status = 404, description = "Seal not found", body = crate::error::ErrorBody),
    ),
    tag = "seals"
)]
async fn get_seal(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SealResponse>, AppError> {
    let seal = state.engine.get(seal_id(id)?).await?;
    Ok(Json(seal.into()))
}

/// Apply a lifecycle update.
#[utoipa::path(
    put,
    path = "/v1/seals/{id}",
    params(("id" = i64, Path, description = "Seal id")),
    request_body = UpdateSealRequest,
    responses(
        (status = 200, description = "Updated seal", body = SealResponse),
        (status = 404, description = "Seal not found", body = crate::error::ErrorBody),
        (status = 409, description = "Transition not allowed or seal changed concurrently", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid patch", body = crate::error::ErrorBody),
    ),
    tag = "seals"
)]
async fn update_seal(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Result<Json<UpdateSealRequest>, JsonRejection>,
) -> Result<Json<SealResponse>, AppError> {
    let id = seal_id(id)?;
    let req = extract_validated_json(body)?;
    let patch = SealPatch {
        status: req.status,
        sector_id: req.sector_id,
        linked_package_id: req.linked_package_id,
        destruction_reason: req.destruction_reason,
    };
    let seal = state.engine.update_seal(id, &patch).await?;
    Ok(Json(seal.into()))
}

/// Remove a seal record. No lifecycle guards apply.
#[utoipa::path(
    delete,
    path = "/v1/seals/{id}",
    params(("id" = i64, Path, description = "Seal id")),
    responses(
        (status = 204, description = "Seal deleted"),
        (status = 404, description = "Seal not found", body = crate::error::ErrorBody),
    ),
    tag = "seals"
)]
async fn delete_seal(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.engine.delete_seal(seal_id(id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Mark a held seal `used` on a package.
#[utoipa::path(
    post,
    path = "/v1/seals/{id}/consume",
    params(("id" = i64, Path, description = "Seal id")),
    request_body = ConsumeSealRequest,
    responses(
        (status = 200, description = "Consumed seal", body = SealResponse),
        (status = 404, description = "Seal not found", body = crate::error::ErrorBody),
        (status = 409, description = "Seal not held by the sector or not consumable", body = crate::error::ErrorBody),
    ),
    tag = "seals"
)]
async fn consume_seal(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Result<Json<ConsumeSealRequest>, JsonRejection>,
) -> Result<Json<SealResponse>, AppError> {
    let id = seal_id(id)?;
    let req = extract_json(body)?;
    let seal = state
        .engine
        .consume_seal(
            id,
            ConsumeSeal {
                package_id: req.package_id,
                sector_id: req.sector_id,
            },
        )
        .await?;
    Ok(Json(seal.into()))
}
