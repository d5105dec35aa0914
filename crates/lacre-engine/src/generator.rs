//! # Seal Generator
//!
//! Mints one `available` seal per integer of an inclusive range. Codes that
//! already exist are skipped, so re-running a range only fills its gaps.

use serde::{Deserialize, Serialize};

use lacre_core::{LotNumber, SealCode, SealPrefix};

use crate::error::EngineError;
use crate::SealEngine;

/// Prefix used when the request does not name one.
pub const DEFAULT_PREFIX: &str = "LACRE";

/// Upper bound on the number of codes one request may mint.
pub const MAX_CODES_PER_REQUEST: u64 = 100_000;

/// Raw generation request, validated by [`GenerateSeals::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateSeals {
    /// Absent means [`DEFAULT_PREFIX`]; an explicit blank prefix is rejected.
    pub prefix: Option<String>,
    pub start: i64,
    pub end: i64,
    pub lot_number: Option<String>,
}

/// A generation request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRange {
    pub prefix: SealPrefix,
    pub start: u64,
    pub end: u64,
    pub lot: Option<LotNumber>,
}

impl ValidRange {
    /// Number of codes in the range; never zero.
    pub fn count(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn codes(&self) -> Vec<SealCode> {
        (self.start..=self.end)
            .map(|n| SealCode::compose(&self.prefix, n))
            .collect()
    }
}

impl GenerateSeals {
    pub fn validate(&self) -> Result<ValidRange, EngineError> {
        let prefix = match self.prefix.as_deref() {
            Some(p) => SealPrefix::new(p)?,
            None => SealPrefix::new(DEFAULT_PREFIX)?,
        };
        if self.start < 0 {
            return Err(EngineError::Validation(format!(
                "start must be non-negative, got {}",
                self.start
            )));
        }
        if self.end < self.start {
            return Err(EngineError::Validation(format!(
                "end ({}) must be greater than or equal to start ({})",
                self.end, self.start
            )));
        }
        let (start, end) = (self.start as u64, self.end as u64);
        let count = end - start + 1;
        if count > MAX_CODES_PER_REQUEST {
            return Err(EngineError::Validation(format!(
                "range covers {count} codes; at most {MAX_CODES_PER_REQUEST} per request"
            )));
        }
        let lot = LotNumber::optional(self.lot_number.as_deref())?;
        Ok(ValidRange {
            prefix,
            start,
            end,
            lot,
        })
    }
}

/// Summary of a generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    pub prefix: SealPrefix,
    pub start: u64,
    pub end: u64,
    pub lot_number: Option<LotNumber>,
    pub first_code: SealCode,
    pub last_code: SealCode,
    /// Codes in the range.
    pub requested: u64,
    /// Codes that were new; the rest already existed.
    pub inserted: u64,
}

impl SealEngine {
    /// Generate the seals of an inclusive range in one atomic batch.
    pub async fn generate(&self, request: &GenerateSeals) -> Result<GenerationReport, EngineError> {
        let range = request.validate()?;
        let codes = range.codes();
        let inserted = self
            .store
            .generate_range(&codes, range.lot.as_ref())
            .await
            .map_err(EngineError::store("generate"))?;

        let requested = range.count();
        tracing::info!(
            prefix = %range.prefix,
            start = range.start,
            end = range.end,
            lot = range.lot.as_ref().map(LotNumber::as_str).unwrap_or(""),
            requested,
            inserted,
            "seals generated"
        );
        if inserted < requested {
            tracing::debug!(skipped = requested - inserted, "existing codes skipped");
        }

        Ok(GenerationReport {
            first_code: SealCode::compose(&range.prefix, range.start),
            last_code: SealCode::compose(&range.prefix, range.end),
            prefix: range.prefix,
            start: range.start,
            end: range.end,
            lot_number: range.lot,
            requested,
            inserted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PageRequest, SealFilter};
    use crate::testing::{fixture, generate_request};
    use std::collections::BTreeSet;

    #[test]
    fn absent_prefix_defaults_and_blank_prefix_is_rejected() {
        let req = GenerateSeals {
            prefix: None,
            start: 1,
            end: 1,
            lot_number: None,
        };
        assert_eq!(req.validate().unwrap().prefix.as_str(), DEFAULT_PREFIX);
        for blank in ["", "  "] {
            let req = GenerateSeals {
                prefix: Some(blank.to_string()),
                ..req.clone()
            };
            assert!(matches!(req.validate(), Err(EngineError::Validation(_))));
        }
    }

    #[test]
    fn rejects_bad_ranges() {
        assert!(generate_request("L", -1, 5, None).validate().is_err());
        assert!(generate_request("L", 5, 4, None).validate().is_err());
        assert!(generate_request("L", 0, 100_000, None).validate().is_err());
        assert!(generate_request("L", 1, 100_000, None).validate().is_ok());
        assert!(generate_request("LA CRE", 1, 2, None).validate().is_err());
    }

    #[test]
    fn single_code_range() {
        let range = generate_request("L", 7, 7, Some(" L1 ")).validate().unwrap();
        assert_eq!(range.count(), 1);
        assert_eq!(range.codes()[0].as_str(), "L000007");
        assert_eq!(range.lot.unwrap().as_str(), "L1");
    }

    #[tokio::test]
    async fn generates_padded_codes_in_lot() {
        let fx = fixture(&[]);
        let report = fx
            .engine
            .generate(&generate_request("LACRE", 1, 10, Some("L1")))
            .await
            .unwrap();
        assert_eq!(report.requested, 10);
        assert_eq!(report.inserted, 10);
        assert_eq!(report.first_code.as_str(), "LACRE000001");
        assert_eq!(report.last_code.as_str(), "LACRE000010");
        assert_eq!(fx.store.len(), 10);
    }

    #[tokio::test]
    async fn generation_is_idempotent() {
        let fx = fixture(&[]);
        let req = generate_request("LACRE", 1, 25, None);
        fx.engine.generate(&req).await.unwrap();
        let second = fx.engine.generate(&req).await.unwrap();
        assert_eq!(second.requested, 25);
        assert_eq!(second.inserted, 0);

        let page = fx
            .engine
            .list(&SealFilter::default(), PageRequest { page: 1, limit: 100 })
            .await
            .unwrap();
        assert_eq!(page.total, 25);
        let codes: BTreeSet<String> = page.seals.iter().map(|s| s.code.to_string()).collect();
        let expected: BTreeSet<String> = (1..=25).map(|n| format!("LACRE{n:06}")).collect();
        assert_eq!(codes, expected);
    }

    #[tokio::test]
    async fn overlapping_range_fills_gaps_only() {
        let fx = fixture(&[]);
        fx.engine
            .generate(&generate_request("LACRE", 1, 5, None))
            .await
            .unwrap();
        let report = fx
            .engine
            .generate(&generate_request("LACRE", 4, 8, None))
            .await
            .unwrap();
        assert_eq!(report.inserted, 3);
        assert_eq!(fx.store.len(), 8);
    }

    #[tokio::test]
    async fn validation_happens_before_store_access() {
        let fx = fixture(&[]);
        fx.store.set_offline(true);
        let err = fx
            .engine
            .generate(&generate_request("LACRE", 3, 1, None))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn blank_prefix_mints_nothing() {
        let fx = fixture(&[]);
        let err = fx
            .engine
            .generate(&generate_request("", 1, 3, None))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert!(fx.store.is_empty());
    }

    #[tokio::test]
    async fn store_failure_is_reported_with_operation() {
        let fx = fixture(&[]);
        fx.store.set_offline(true);
        let err = fx
            .engine
            .generate(&generate_request("LACRE", 1, 3, None))
            .await
            .unwrap_err();
        match err {
            EngineError::Store { operation, .. } => assert_eq!(operation, "generate"),
            other => panic!("expected Store, got {other:?}"),
        }
        fx.store.set_offline(false);
        assert!(fx.store.is_empty());
    }
}
