//! # Destruction Routes
//!
//! - `GET  /v1/seals/lots`         — per-lot counters and destroyability
//! - `POST /v1/seals/destroy-lot`  — destroy a whole lot, or nothing
//! - `POST /v1/seals/:id/destroy`  — destroy one unheld seal

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use lacre_engine::{LotDestroyed, LotSummary};

use super::seal_id;
use super::seals::SealResponse;
use crate::error::AppError;
use crate::extractors::{extract_json, extract_validated_json, Validate};
use crate::state::AppState;

/// Assemble the destruction router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/seals/lots", get(list_lots))
        .route("/v1/seals/destroy-lot", post(destroy_lot))
        .route("/v1/seals/:id/destroy", post(destroy_seal))
}

// ---------------------------------------------------------------------------
// Request and response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LotSummaryResponse {
    pub lot_number: String,
    pub total: u64,
    /// Seals that are not `available`, have a holder, or carry a package link.
    pub held: u64,
    pub destroyed: u64,
    /// Whether `POST /v1/seals/destroy-lot` would currently succeed.
    pub destroyable: bool,
}

impl From<LotSummary> for LotSummaryResponse {
    fn from(s: LotSummary) -> Self {
        Self {
            destroyable: s.destroyable(),
            lot_number: s.lot_number.into(),
            total: s.total,
            held: s.held,
            destroyed: s.destroyed,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DestroyLotRequest {
    pub lot_number: String,
    pub reason: String,
}

impl Validate for DestroyLotRequest {
    fn validate(&self) -> Result<(), String> {
        if self.lot_number.trim().is_empty() {
            return Err("lot_number must not be empty".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LotDestroyedResponse {
    pub lot_number: String,
    /// Seals moved to `destroyed`; zero for an unknown lot.
    pub destroyed: u64,
}

impl From<LotDestroyed> for LotDestroyedResponse {
    fn from(d: LotDestroyed) -> Self {
        Self {
            lot_number: d.lot_number.into(),
            destroyed: d.destroyed,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DestroySealRequest {
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Per-lot counters, ordered by lot label.
#[utoipa::path(
    get,
    path = "/v1/seals/lots",
    responses(
        (status = 200, description = "Lot summaries", body = Vec<LotSummaryResponse>),
    ),
    tag = "destruction"
)]
async fn list_lots(
    State(state): State<AppState>,
) -> Result<Json<Vec<LotSummaryResponse>>, AppError> {
    let lots = state.engine.lot_summaries().await?;
    Ok(Json(lots.into_iter().map(LotSummaryResponse::from).collect()))
}

/// Destroy every seal in a lot. Refused as a whole when any seal is held.
#[utoipa::path(
    post,
    path = "/v1/seals/destroy-lot",
    request_body = DestroyLotRequest,
    responses(
        (status = 200, description = "Lot destroyed", body = LotDestroyedResponse),
        (status = 409, description = "Some seals of the lot are held; details carry the count", body = crate::error::ErrorBody),
        (status = 422, description = "Missing lot or reason", body = crate::error::ErrorBody),
    ),
    tag = "destruction"
)]
async fn destroy_lot(
    State(state): State<AppState>,
    body: Result<Json<DestroyLotRequest>, JsonRejection>,
) -> Result<Json<LotDestroyedResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let destroyed = state.engine.destroy_lot(&req.lot_number, &req.reason).await?;
    Ok(Json(destroyed.into()))
}

/// Destroy one `available` seal that no sector holds and no package references.
#[utoipa::path(
    post,
    path = "/v1/seals/{id}/destroy",
    params(("id" = i64, Path, description = "Seal id")),
    request_body = DestroySealRequest,
    responses(
        (status = 200, description = "Destroyed seal", body = SealResponse),
        (status = 404, description = "Seal not found", body = crate::error::ErrorBody),
        (status = 409, description = "Seal is held, linked or already final", body = crate::error::ErrorBody),
        (status = 422, description = "Missing reason", body = crate::error::ErrorBody),
    ),
    tag = "destruction"
)]
async fn destroy_seal(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Result<Json<DestroySealRequest>, JsonRejection>,
) -> Result<Json<SealResponse>, AppError> {
    let id = seal_id(id)?;
    let req = extract_json(body)?;
    let seal = state.engine.destroy_seal(id, &req.reason).await?;
    Ok(Json(seal.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::testing::{send, test_router};
    use axum::http::StatusCode;
    use lacre_core::SectorId;
    use lacre_engine::GenerateSeals;
    use serde_json::json;

    async fn seed(state: &AppState, start: i64, end: i64, lot: &str) {
        state
            .engine
            .generate(&GenerateSeals {
                prefix: None,
                start,
                end,
                lot_number: Some(lot.to_string()),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn held_lot_is_refused_with_count() {
        let (app, state) = test_router(router());
        seed(&state, 1, 5, "L1").await;
        state.engine.distribute_manual(SectorId(7), 2).await.unwrap();

        let (status, body) = send(
            &app,
            "POST",
            "/v1/seals/destroy-lot",
            Some(json!({"lot_number": "L1", "reason": "expired"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "CONFLICT");
        assert_eq!(body["error"]["details"]["held"], 2);

        let (_, lots) = send(&app, "GET", "/v1/seals/lots", None).await;
        assert_eq!(lots[0]["lot_number"], "L1");
        assert_eq!(lots[0]["held"], 2);
        assert_eq!(lots[0]["destroyed"], 0);
        assert_eq!(lots[0]["destroyable"], false);
    }

    #[tokio::test]
    async fn clean_lot_is_destroyed() {
        let (app, state) = test_router(router());
        seed(&state, 1, 4, "L2").await;
        let (status, body) = send(
            &app,
            "POST",
            "/v1/seals/destroy-lot",
            Some(json!({"lot_number": "L2", "reason": "misprint"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["destroyed"], 4);

        let (_, lots) = send(&app, "GET", "/v1/seals/lots", None).await;
        assert_eq!(lots[0]["destroyed"], 4);
        assert_eq!(lots[0]["destroyable"], false);
    }

    #[tokio::test]
    async fn lot_destruction_requires_reason() {
        let (app, state) = test_router(router());
        seed(&state, 1, 1, "L3").await;
        let (status, body) = send(
            &app,
            "POST",
            "/v1/seals/destroy-lot",
            Some(json!({"lot_number": "L3", "reason": "  "})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn single_seal_destruction_guards() {
        let (app, state) = test_router(router());
        seed(&state, 1, 2, "L4").await;
        state.engine.distribute_manual(SectorId(7), 1).await.unwrap();

        let (status, _) = send(
            &app,
            "POST",
            "/v1/seals/1/destroy",
            Some(json!({"reason": "cracked"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = send(
            &app,
            "POST",
            "/v1/seals/2/destroy",
            Some(json!({"reason": "cracked"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "destroyed");
        assert_eq!(body["destruction_reason"], "cracked");

        let (status, _) = send(
            &app,
            "POST",
            "/v1/seals/2/destroy",
            Some(json!({"reason": "again"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }
}
