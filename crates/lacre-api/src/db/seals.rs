//! Seal persistence on the `seals` table.
//!
//! Every multi-row write is a single statement or a single transaction.
//! Claims re-check `status = 'available'` in the `UPDATE` itself, so two
//! concurrent distributions can never assign the same row. Lifecycle rules
//! are enforced by the engine, not in SQL; the table only carries CHECK
//! constraints for canonical statuses and destruction reasons.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use lacre_core::{LotNumber, PackageId, SealCode, SealId, SealPrefix, SealStatus, SectorId};
use lacre_engine::{
    BlockClaim, ConditionalUpdate, LotDestruction, LotSummary, PageRequest, Seal, SealChange,
    SealFilter, SealPage, SealStore, SectorBlock, StoreError,
};

use super::store_err;

const SEAL_COLUMNS: &str = "id, code, status, lot_number, sector_id, linked_package_id, \
                            destruction_reason, created_at, updated_at";

/// Row filter shared by the listing and count queries. `$1` search pattern,
/// `$2` status, `$3` sector, `$4` lot; a NULL parameter disables its clause.
const LIST_FILTER: &str = "($1::text IS NULL OR code ILIKE $1 OR lot_number ILIKE $1) \
                           AND ($2::text IS NULL OR status = $2) \
                           AND ($3::bigint IS NULL OR sector_id = $3) \
                           AND ($4::text IS NULL OR lot_number = $4)";

/// Rows that keep a lot from being destroyed.
const BLOCKS_LOT: &str =
    "status <> 'available' OR sector_id IS NOT NULL OR linked_package_id IS NOT NULL";

/// [`SealStore`] backed by Postgres.
#[derive(Clone)]
pub struct PgSealStore {
    pool: PgPool,
}

impl PgSealStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SealStore for PgSealStore {
    async fn generate_range(
        &self,
        codes: &[SealCode],
        lot: Option<&LotNumber>,
    ) -> Result<u64, StoreError> {
        let codes: Vec<String> = codes.iter().map(|c| c.as_str().to_string()).collect();
        let result = sqlx::query(
            "INSERT INTO seals (code, status, lot_number)
             SELECT c, 'available', $2
             FROM unnest($1::text[]) WITH ORDINALITY AS t(c, ord)
             ORDER BY ord
             ON CONFLICT (code) DO NOTHING",
        )
        .bind(&codes)
        .bind(lot.map(LotNumber::as_str))
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(result.rows_affected())
    }

    async fn list_seals(
        &self,
        filter: &SealFilter,
        page: &PageRequest,
    ) -> Result<SealPage, StoreError> {
        let search = filter.search.as_deref().map(like_pattern);
        let status = filter.status.map(|s| s.as_str());
        let sector = filter.sector_id.map(|s| s.get());
        let lot = filter.lot_number.as_ref().map(LotNumber::as_str);

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM seals WHERE {LIST_FILTER}"
        ))
        .bind(search.as_deref())
        .bind(status)
        .bind(sector)
        .bind(lot)
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;

        let rows = sqlx::query_as::<_, SealRow>(&format!(
            "SELECT {SEAL_COLUMNS} FROM seals WHERE {LIST_FILTER}
             ORDER BY created_at DESC, id DESC LIMIT $5 OFFSET $6"
        ))
        .bind(search.as_deref())
        .bind(status)
        .bind(sector)
        .bind(lot)
        .bind(i64::from(page.limit))
        .bind(to_i64(page.offset()))
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(SealPage {
            seals: readable(rows),
            total: to_u64(total),
            page: page.page,
            limit: page.limit,
        })
    }

    async fn get_seal(&self, id: SealId) -> Result<Option<Seal>, StoreError> {
        let row = sqlx::query_as::<_, SealRow>(&format!(
            "SELECT {SEAL_COLUMNS} FROM seals WHERE id = $1"
        ))
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        row.map(SealRow::into_record).transpose()
    }

    async fn available_ids(&self, limit: Option<u64>) -> Result<Vec<SealId>, StoreError> {
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT id FROM seals WHERE status = 'available' ORDER BY id LIMIT $1",
        )
        .bind(limit.map(to_i64))
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(ids.into_iter().map(SealId).collect())
    }

    async fn claim_oldest(
        &self,
        sector: SectorId,
        quantity: u64,
    ) -> Result<Vec<SealId>, StoreError> {
        let mut ids: Vec<i64> = sqlx::query_scalar(
            "UPDATE seals SET status = 'assigned', sector_id = $1, updated_at = now()
             WHERE id IN (
                 SELECT id FROM seals WHERE status = 'available'
                 ORDER BY id LIMIT $2 FOR UPDATE SKIP LOCKED
             )
             AND status = 'available'
             RETURNING id",
        )
        .bind(sector.get())
        .bind(to_i64(quantity))
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        ids.sort_unstable();
        Ok(ids.into_iter().map(SealId).collect())
    }

    async fn claim_blocks(&self, blocks: &[SectorBlock]) -> Result<Vec<BlockClaim>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;
        let mut claims = Vec::with_capacity(blocks.len());
        for block in blocks {
            let ids: Vec<i64> = block.seal_ids.iter().map(SealId::get).collect();
            let mut claimed: Vec<i64> = if ids.is_empty() {
                Vec::new()
            } else {
                sqlx::query_scalar(
                    "UPDATE seals SET status = 'assigned', sector_id = $1, updated_at = now()
                     WHERE id = ANY($2) AND status = 'available'
                     RETURNING id",
                )
                .bind(block.sector_id.get())
                .bind(&ids)
                .fetch_all(&mut *tx)
                .await
                .map_err(store_err)?
            };
            claimed.sort_unstable();
            claims.push(BlockClaim {
                sector_id: block.sector_id,
                planned: block.seal_ids.len() as u64,
                claimed: claimed.into_iter().map(SealId).collect(),
            });
        }
        tx.commit().await.map_err(store_err)?;
        Ok(claims)
    }

    async fn destroy_lot(
        &self,
        lot: &LotNumber,
        reason: &str,
    ) -> Result<LotDestruction, StoreError> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        // Lock the lot so no claim can slip in between the count and the update.
        sqlx::query("SELECT id FROM seals WHERE lot_number = $1 FOR UPDATE")
            .bind(lot.as_str())
            .fetch_all(&mut *tx)
            .await
            .map_err(store_err)?;

        let held: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM seals WHERE lot_number = $1 AND ({BLOCKS_LOT})"
        ))
        .bind(lot.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(store_err)?;

        if held > 0 {
            tx.rollback().await.map_err(store_err)?;
            return Ok(LotDestruction::Blocked {
                held: to_u64(held),
            });
        }

        let result = sqlx::query(
            "UPDATE seals SET status = 'destroyed', destruction_reason = $2, updated_at = now()
             WHERE lot_number = $1",
        )
        .bind(lot.as_str())
        .bind(reason)
        .execute(&mut *tx)
        .await
        .map_err(store_err)?;

        tx.commit().await.map_err(store_err)?;
        Ok(LotDestruction::Destroyed {
            rows: result.rows_affected(),
        })
    }

    async fn update_seal(
        &self,
        expected: &Seal,
        change: &SealChange,
    ) -> Result<ConditionalUpdate, StoreError> {
        let row = sqlx::query_as::<_, SealRow>(&format!(
            "UPDATE seals
             SET status = $1, sector_id = $2, linked_package_id = $3,
                 destruction_reason = $4, updated_at = now()
             WHERE id = $5 AND status = $6 AND updated_at = $7
             RETURNING {SEAL_COLUMNS}"
        ))
        .bind(change.status.as_str())
        .bind(change.sector_id.map(|s| s.get()))
        .bind(change.linked_package_id.map(|p| p.get()))
        .bind(change.destruction_reason.as_deref())
        .bind(expected.id.get())
        .bind(expected.status.as_str())
        .bind(expected.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        if let Some(row) = row {
            return row.into_record().map(ConditionalUpdate::Applied);
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM seals WHERE id = $1)")
            .bind(expected.id.get())
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(if exists {
            ConditionalUpdate::Stale
        } else {
            ConditionalUpdate::Missing
        })
    }

    async fn delete_seal(&self, id: SealId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM seals WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn seals_held_by(&self, sector: SectorId) -> Result<Vec<Seal>, StoreError> {
        let rows = sqlx::query_as::<_, SealRow>(&format!(
            "SELECT {SEAL_COLUMNS} FROM seals WHERE sector_id = $1 ORDER BY id DESC"
        ))
        .bind(sector.get())
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(readable(rows))
    }

    async fn lot_summaries(&self) -> Result<Vec<LotSummary>, StoreError> {
        let rows = sqlx::query_as::<_, LotRow>(&format!(
            "SELECT lot_number,
                    COUNT(*) AS total,
                    COUNT(*) FILTER (WHERE {BLOCKS_LOT}) AS held,
                    COUNT(*) FILTER (WHERE status = 'destroyed') AS destroyed
             FROM seals
             WHERE lot_number IS NOT NULL
             GROUP BY lot_number
             ORDER BY lot_number"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(rows.into_iter().filter_map(LotRow::into_summary).collect())
    }

    async fn max_sequence(&self, prefix: &SealPrefix) -> Result<Option<u64>, StoreError> {
        // Suffixes longer than 18 digits cannot be stored as BIGINT and are ignored.
        let max: Option<i64> = sqlx::query_scalar(
            "SELECT MAX(substring(code FROM char_length($1) + 1)::bigint)
             FROM seals
             WHERE starts_with(code, $1)
               AND substring(code FROM char_length($1) + 1) ~ '^[0-9]{1,18}$'",
        )
        .bind(prefix.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(max.map(to_u64))
    }

    async fn count_by_status(&self) -> Result<Vec<(SealStatus, u64)>, StoreError> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM seals GROUP BY status")
                .fetch_all(&self.pool)
                .await
                .map_err(store_err)?;

        let mut counts: HashMap<SealStatus, u64> = HashMap::new();
        for (raw, n) in rows {
            match SealStatus::canonicalize(&raw) {
                Some(status) => *counts.entry(status).or_default() += to_u64(n),
                None => tracing::error!(status = %raw, rows = n, "unknown seal status in database"),
            }
        }
        Ok(SealStatus::all()
            .iter()
            .filter_map(|s| counts.get(s).map(|n| (*s, *n)))
            .collect())
    }
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct SealRow {
    id: i64,
    code: String,
    status: String,
    lot_number: Option<String>,
    sector_id: Option<i64>,
    linked_package_id: Option<i64>,
    destruction_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SealRow {
    /// Map the row into the domain model. Legacy status spellings are
    /// folded into the canonical enumeration.
    fn into_record(self) -> Result<Seal, StoreError> {
        let status = SealStatus::canonicalize(&self.status).ok_or_else(|| {
            StoreError::CorruptRecord {
                id: self.id,
                reason: format!("unknown status {:?}", self.status),
            }
        })?;
        let lot_number = LotNumber::optional(self.lot_number.as_deref()).map_err(|e| {
            StoreError::CorruptRecord {
                id: self.id,
                reason: e.to_string(),
            }
        })?;
        Ok(Seal {
            id: SealId(self.id),
            code: SealCode::from_stored(self.code),
            status,
            lot_number,
            sector_id: self.sector_id.map(SectorId),
            linked_package_id: self.linked_package_id.map(PackageId),
            destruction_reason: self.destruction_reason,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Map rows for listings, skipping and logging the ones that cannot be read.
fn readable(rows: Vec<SealRow>) -> Vec<Seal> {
    rows.into_iter()
        .filter_map(|row| match row.into_record() {
            Ok(seal) => Some(seal),
            Err(e) => {
                tracing::error!(error = %e, "skipping unreadable seal row");
                None
            }
        })
        .collect()
}

#[derive(sqlx::FromRow)]
struct LotRow {
    lot_number: String,
    total: i64,
    held: i64,
    destroyed: i64,
}

impl LotRow {
    fn into_summary(self) -> Option<LotSummary> {
        match LotNumber::new(&self.lot_number) {
            Ok(lot_number) => Some(LotSummary {
                lot_number,
                total: to_u64(self.total),
                held: to_u64(self.held),
                destroyed: to_u64(self.destroyed),
            }),
            Err(e) => {
                tracing::error!(lot = %self.lot_number, error = %e, "skipping unreadable lot");
                None
            }
        }
    }
}

/// `ILIKE` pattern for a case-insensitive substring match on `term`.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn to_u64(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}
