//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json` without authentication.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Adds the Bearer token security scheme to the OpenAPI spec.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some(
                            "Operator bearer token. Set via LACRE_AUTH_TOKEN.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Lacre API",
        version = "0.3.2",
        description = "Seal lifecycle and distribution service.\n\nMints numbered seals in lots, hands them out to sectors manually or in proportional contiguous blocks, resolves per-sector availability, and guards lot destruction.\n\nAuthentication: `Authorization: Bearer <token>` on every `/v1/*` endpoint. Health probes, `/metrics` and this document are unauthenticated.",
        license(name = "BUSL-1.1")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    security(
        ("bearer_auth" = [])
    ),
    paths(
        crate::routes::seals::list_seals,
        crate::routes::seals::generate_seals,
        crate::routes::seals::next_number,
        crate::routes::seals::get_seal,
        crate::routes::seals::update_seal,
        crate::routes::seals::delete_seal,
        crate::routes::seals::consume_seal,
        crate::routes::distribution::distribute_manual,
        crate::routes::distribution::distribute_automatic,
        crate::routes::distribution::seals_by_sector,
        crate::routes::destruction::list_lots,
        crate::routes::destruction::destroy_lot,
        crate::routes::destruction::destroy_seal,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::seals::SealResponse,
        crate::routes::seals::SealListResponse,
        crate::routes::seals::GenerateSealsRequest,
        crate::routes::seals::GenerationResponse,
        crate::routes::seals::NextNumberResponse,
        crate::routes::seals::UpdateSealRequest,
        crate::routes::seals::ConsumeSealRequest,
        crate::routes::distribution::ManualDistributionRequest,
        crate::routes::distribution::ManualDistributionResponse,
        crate::routes::distribution::AutomaticDistributionRequest,
        crate::routes::distribution::AutomaticDistributionResponse,
        crate::routes::distribution::SectorAllocation,
        crate::routes::distribution::SectorSealResponse,
        crate::routes::destruction::LotSummaryResponse,
        crate::routes::destruction::DestroyLotRequest,
        crate::routes::destruction::LotDestroyedResponse,
        crate::routes::destruction::DestroySealRequest,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "seals", description = "Seal listing, generation and lifecycle updates"),
        (name = "distribution", description = "Manual and automatic distribution to sectors, per-sector availability"),
        (name = "destruction", description = "Lot summaries and guarded destruction"),
    )
)]
pub struct ApiDoc;

/// Serves the OpenAPI JSON spec at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
