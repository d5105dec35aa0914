//! # Distribution Routes
//!
//! - `POST /v1/seals/distribute/manual`     — oldest available seals to one sector
//! - `POST /v1/seals/distribute/automatic`  — split the pool across sectors
//! - `GET  /v1/seals/by-sector`             — a sector's seals with resolved availability

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use lacre_core::SectorId;
use lacre_engine::{AutomaticDistribution, BlockClaim, ManualDistribution, ResolvedSeal};

use super::seals::SealResponse;
use crate::error::AppError;
use crate::extractors::{extract_query, extract_validated_json, Validate};
use crate::middleware::metrics::{MODE_AUTOMATIC, MODE_MANUAL};
use crate::state::AppState;

/// Upper bound on the sector list of one automatic distribution.
const MAX_SECTORS_PER_REQUEST: usize = 1000;

/// Assemble the distribution router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/seals/distribute/manual", post(distribute_manual))
        .route("/v1/seals/distribute/automatic", post(distribute_automatic))
        .route("/v1/seals/by-sector", get(seals_by_sector))
}

// ---------------------------------------------------------------------------
// Request and response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ManualDistributionRequest {
    pub sector_id: i64,
    /// Number of seals to hand out; must be positive.
    pub quantity: i64,
}

impl Validate for ManualDistributionRequest {
    fn validate(&self) -> Result<(), String> {
        if self.quantity <= 0 {
            return Err(format!(
                "quantity must be a positive integer, got {}",
                self.quantity
            ));
        }
        Ok(())
    }
}

/// Outcome of a manual distribution. `distributed < requested` means the
/// pool ran out.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ManualDistributionResponse {
    pub sector_id: i64,
    pub requested: u64,
    pub distributed: u64,
    pub seal_ids: Vec<i64>,
}

impl From<ManualDistribution> for ManualDistributionResponse {
    fn from(d: ManualDistribution) -> Self {
        Self {
            sector_id: d.sector_id.get(),
            requested: d.requested,
            distributed: d.distributed,
            seal_ids: d.seal_ids.iter().map(|s| s.get()).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AutomaticDistributionRequest {
    /// Target sectors, in allocation order. Earlier sectors receive the
    /// remainder.
    pub sector_ids: Vec<i64>,
    /// Optional cap on the number of seals taken from the pool.
    #[serde(default)]
    pub total: Option<i64>,
}

impl Validate for AutomaticDistributionRequest {
    fn validate(&self) -> Result<(), String> {
        if self.sector_ids.is_empty() {
            return Err("sector_ids must not be empty".to_string());
        }
        if self.sector_ids.len() > MAX_SECTORS_PER_REQUEST {
            return Err(format!(
                "at most {MAX_SECTORS_PER_REQUEST} sectors per request, got {}",
                self.sector_ids.len()
            ));
        }
        Ok(())
    }
}

/// Seals one sector received.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SectorAllocation {
    pub sector_id: i64,
    /// Size of the planned block.
    pub planned: u64,
    /// Seals actually claimed; fewer than planned when another request won
    /// the race for some of them.
    pub distributed: u64,
    pub seal_ids: Vec<i64>,
}

impl From<BlockClaim> for SectorAllocation {
    fn from(c: BlockClaim) -> Self {
        Self {
            sector_id: c.sector_id.get(),
            planned: c.planned,
            distributed: c.claimed.len() as u64,
            seal_ids: c.claimed.iter().map(|s| s.get()).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AutomaticDistributionResponse {
    pub sector_count: u64,
    /// Size of the pool the plan was built from.
    pub planned: u64,
    pub distributed: u64,
    pub allocations: Vec<SectorAllocation>,
}

impl From<AutomaticDistribution> for AutomaticDistributionResponse {
    fn from(d: AutomaticDistribution) -> Self {
        Self {
            sector_count: d.sector_count,
            planned: d.planned,
            distributed: d.distributed,
            allocations: d.allocations.into_iter().map(SectorAllocation::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BySectorQuery {
    pub sector_id: i64,
}

/// A held seal with its resolved availability.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SectorSealResponse {
    #[serde(flatten)]
    pub seal: SealResponse,
    /// `available` or `unavailable`.
    pub availability: String,
    /// Operator-facing label.
    pub label: String,
    pub has_package_link: bool,
}

impl From<ResolvedSeal> for SectorSealResponse {
    fn from(r: ResolvedSeal) -> Self {
        Self {
            availability: r.availability.as_str().to_string(),
            label: r.label().to_string(),
            has_package_link: r.has_package_link,
            seal: r.seal.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Hand the oldest available seals to one sector.
#[utoipa::path(
    post,
    path = "/v1/seals/distribute/manual",
    request_body = ManualDistributionRequest,
    responses(
        (status = 200, description = "Seals distributed (possibly fewer than requested)", body = ManualDistributionResponse),
        (status = 422, description = "Invalid quantity or unknown sector", body = crate::error::ErrorBody),
    ),
    tag = "distribution"
)]
async fn distribute_manual(
    State(state): State<AppState>,
    body: Result<Json<ManualDistributionRequest>, JsonRejection>,
) -> Result<Json<ManualDistributionResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let sector = SectorId::new(req.sector_id)?;
    let outcome = state.engine.distribute_manual(sector, req.quantity).await?;
    state
        .metrics
        .record_distribution(MODE_MANUAL, outcome.distributed);
    Ok(Json(outcome.into()))
}

/// Split the available pool across sectors in contiguous blocks.
#[utoipa::path(
    post,
    path = "/v1/seals/distribute/automatic",
    request_body = AutomaticDistributionRequest,
    responses(
        (status = 200, description = "Pool distributed", body = AutomaticDistributionResponse),
        (status = 422, description = "Invalid sector list or cap", body = crate::error::ErrorBody),
    ),
    tag = "distribution"
)]
async fn distribute_automatic(
    State(state): State<AppState>,
    body: Result<Json<AutomaticDistributionRequest>, JsonRejection>,
) -> Result<Json<AutomaticDistributionResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let sectors = req
        .sector_ids
        .iter()
        .map(|id| SectorId::new(*id))
        .collect::<Result<Vec<_>, _>>()?;
    let outcome = state.engine.distribute_automatic(&sectors, req.total).await?;
    state
        .metrics
        .record_distribution(MODE_AUTOMATIC, outcome.distributed);
    Ok(Json(outcome.into()))
}

/// Seals held by a sector, newest first, with resolved availability.
#[utoipa::path(
    get,
    path = "/v1/seals/by-sector",
    params(BySectorQuery),
    responses(
        (status = 200, description = "Held seals", body = Vec<SectorSealResponse>),
        (status = 422, description = "Missing or invalid sector id", body = crate::error::ErrorBody),
    ),
    tag = "distribution"
)]
async fn seals_by_sector(
    State(state): State<AppState>,
    query: Result<Query<BySectorQuery>, QueryRejection>,
) -> Result<Json<Vec<SectorSealResponse>>, AppError> {
    let sector = SectorId::new(extract_query(query)?.sector_id)?;
    let seals = state.engine.sector_availability(sector).await?;
    Ok(Json(seals.into_iter().map(SectorSealResponse::from).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::testing::{send, test_router};
    use axum::http::StatusCode;
    use lacre_engine::GenerateSeals;
    use serde_json::json;

    async fn seed(state: &AppState, count: i64) {
        state
            .engine
            .generate(&GenerateSeals {
                prefix: None,
                start: 1,
                end: count,
                lot_number: Some("L1".to_string()),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn manual_reports_partial_fulfilment() {
        let (app, state) = test_router(router());
        seed(&state, 3).await;
        let (status, body) = send(
            &app,
            "POST",
            "/v1/seals/distribute/manual",
            Some(json!({"sector_id": 7, "quantity": 5})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["requested"], 5);
        assert_eq!(body["distributed"], 3);
        assert_eq!(body["seal_ids"], json!([1, 2, 3]));
        assert_eq!(state.metrics.distributed(MODE_MANUAL), 3);
    }

    #[tokio::test]
    async fn manual_rejects_unknown_sector_and_bad_quantity() {
        let (app, state) = test_router(router());
        seed(&state, 3).await;
        let (status, body) = send(
            &app,
            "POST",
            "/v1/seals/distribute/manual",
            Some(json!({"sector_id": 8, "quantity": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"]["message"].as_str().unwrap().contains('8'));

        let (status, _) = send(
            &app,
            "POST",
            "/v1/seals/distribute/manual",
            Some(json!({"sector_id": 7, "quantity": 0})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn automatic_splits_in_contiguous_blocks() {
        let (app, state) = test_router(router());
        seed(&state, 10).await;
        let (status, body) = send(
            &app,
            "POST",
            "/v1/seals/distribute/automatic",
            Some(json!({"sector_ids": [7, 9, 11]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["distributed"], 10);
        assert_eq!(body["allocations"][0]["seal_ids"], json!([1, 2, 3, 4]));
        assert_eq!(body["allocations"][1]["seal_ids"], json!([5, 6, 7]));
        assert_eq!(body["allocations"][2]["seal_ids"], json!([8, 9, 10]));
        assert_eq!(state.metrics.distributed(MODE_AUTOMATIC), 10);
    }

    #[tokio::test]
    async fn automatic_rejects_duplicates_and_empty_lists() {
        let (app, _) = test_router(router());
        for body in [json!({"sector_ids": []}), json!({"sector_ids": [7, 7]})] {
            let (status, _) =
                send(&app, "POST", "/v1/seals/distribute/automatic", Some(body)).await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        }
    }

    #[tokio::test]
    async fn by_sector_resolves_availability() {
        let (app, state) = test_router(router());
        seed(&state, 2).await;
        state
            .engine
            .distribute_manual(SectorId(9), 2)
            .await
            .unwrap();
        state
            .engine
            .consume_seal(
                lacre_core::SealId(1),
                lacre_engine::ConsumeSeal {
                    package_id: 40,
                    sector_id: 9,
                },
            )
            .await
            .unwrap();

        let (status, body) = send(&app, "GET", "/v1/seals/by-sector?sector_id=9", None).await;
        assert_eq!(status, StatusCode::OK);
        let seals = body.as_array().unwrap();
        assert_eq!(seals.len(), 2);
        assert_eq!(seals[0]["id"], 2);
        assert_eq!(seals[0]["availability"], "available");
        assert_eq!(seals[1]["id"], 1);
        assert_eq!(seals[1]["availability"], "unavailable");
        assert_eq!(seals[1]["label"], "Used / Unavailable");
        assert_eq!(seals[1]["has_package_link"], true);
    }

    #[tokio::test]
    async fn by_sector_requires_sector_id() {
        let (app, _) = test_router(router());
        let (status, body) = send(&app, "GET", "/v1/seals/by-sector", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }
}
