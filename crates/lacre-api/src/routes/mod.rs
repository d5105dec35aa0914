//! # API Route Modules
//!
//! - `seals` — listing, lookup, generation, next sequence number, and
//!   single-seal lifecycle updates (update, consume, delete).
//! - `distribution` — manual and automatic distribution to sectors and the
//!   per-sector availability view.
//! - `destruction` — lot summaries, lot destruction and single-seal
//!   destruction.

pub mod destruction;
pub mod distribution;
pub mod seals;

use lacre_core::SealId;

use crate::error::AppError;

/// Validate a seal id taken from the request path.
pub(crate) fn seal_id(raw: i64) -> Result<SealId, AppError> {
    Ok(SealId::new(raw)?)
}

#[cfg(test)]
pub(crate) mod testing {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use lacre_core::SectorId;

    use crate::state::{AppConfig, AppState};

    /// Router over in-memory backends knowing sectors 7, 9 and 11.
    pub(crate) fn test_router(router: Router<AppState>) -> (Router, AppState) {
        let state = AppState::in_memory(
            AppConfig::default(),
            [SectorId(7), SectorId(9), SectorId(11)],
        );
        (router.with_state(state.clone()), state)
    }

    pub(crate) async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }
}
