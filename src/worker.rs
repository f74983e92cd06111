use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::config::WorkerConfig;
use crate::eth::ChainSubmitter;
use crate::models::outbox::{STATUS_FAILED, STATUS_PENDING, STATUS_SENT, SubmissionJob};
use crate::proof::decode_hash;
use crate::types::SubmissionView;

pub async fn enqueue_submission(db: &SqlitePool, battle_id: &str, merkle_root_hex: &str) -> Result<Uuid> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO submissions
        (id, battle_id, merkle_root, status, retries, created_at, updated_at)
        VALUES (?, ?, ?, ?, 0, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(battle_id)
    .bind(merkle_root_hex)
    .bind(STATUS_PENDING)
    .bind(now)
    .bind(now)
    .execute(db)
    .await
    .context("failed to enqueue submission")?;

    Ok(id)
}

pub async fn get_submission(db: &SqlitePool, id: Uuid) -> Result<Option<SubmissionView>> {
    let row = sqlx::query(
        r#"
        SELECT id, battle_id, merkle_root, status, retries, last_error, tx_id, created_at, updated_at
        FROM submissions
        WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(db)
    .await
    .context("failed to load submission")?;

    let Some(row) = row else {
        return Ok(None);
    };

    let created_at: DateTime<Utc> = row.get("created_at");
    let updated_at: DateTime<Utc> = row.get("updated_at");

    Ok(Some(SubmissionView {
        id,
        battle_id: row.get("battle_id"),
        merkle_root: row.get("merkle_root"),
        status: row.get("status"),
        retries: row.get("retries"),
        last_error: row.get("last_error"),
        tx_id: row.get("tx_id"),
        created_at,
        updated_at,
    }))
}

async fn mark_failed(db: &SqlitePool, id: Uuid, error: &str) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE submissions
        SET status = ?,
            last_error = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(STATUS_FAILED)
    .bind(error)
    .bind(Utc::now())
    .bind(id.to_string())
    .execute(db)
    .await?;
    Ok(())
}

async fn pending_jobs(db: &SqlitePool) -> Result<Vec<SubmissionJob>> {
    let rows = sqlx::query(
        r#"
        SELECT id, battle_id, merkle_root, retries
        FROM submissions
        WHERE status = ?
        ORDER BY created_at ASC
        LIMIT 10
        "#,
    )
    .bind(STATUS_PENDING)
    .fetch_all(db)
    .await
    .context("failed to poll submissions")?;

    let mut jobs = Vec::with_capacity(rows.len());
    for row in rows {
        let id: String = row.get("id");
        jobs.push(SubmissionJob {
            id: Uuid::parse_str(&id).with_context(|| format!("bad submission id {id}"))?,
            battle_id: row.get("battle_id"),
            merkle_root_hex: row.get("merkle_root"),
            retries: row.get("retries"),
        });
    }

    Ok(jobs)
}

/// Submits one batch of pending roots. Returns how many were confirmed.
pub async fn process_pending(db: &SqlitePool, submitter: &dyn ChainSubmitter, max_retries: i64) -> Result<usize> {
    let mut sent = 0;

    for job in pending_jobs(db).await? {
        let Some(root) = decode_hash(&job.merkle_root_hex) else {
            tracing::error!(job = %job.id, root = %job.merkle_root_hex, "malformed merkle root");
            mark_failed(db, job.id, "merkle root is not 32 bytes of hex").await?;
            continue;
        };

        match submitter.submit_root(root).await {
            Ok(tx_id) => {
                sqlx::query(
                    r#"
                    UPDATE submissions
                    SET status = ?,
                        tx_id = ?,
                        last_error = NULL,
                        updated_at = ?
                    WHERE id = ?
                    "#,
                )
                .bind(STATUS_SENT)
                .bind(&tx_id)
                .bind(Utc::now())
                .bind(job.id.to_string())
                .execute(db)
                .await?;

                tracing::info!(job = %job.id, battle_id = %job.battle_id, %tx_id, "merkle root submitted");
                sent += 1;
            }
            Err(e) => {
                let next_retries = job.retries + 1;
                let next_status = if next_retries > max_retries {
                    STATUS_FAILED
                } else {
                    STATUS_PENDING
                };

                tracing::warn!(
                    job = %job.id,
                    battle_id = %job.battle_id,
                    retries = next_retries,
                    status = next_status,
                    "chain submit failed: {e:#}"
                );

                sqlx::query(
                    r#"
                    UPDATE submissions
                    SET retries = ?,
                        last_error = ?,
                        status = ?,
                        updated_at = ?
                    WHERE id = ?
                    "#,
                )
                .bind(next_retries)
                .bind(format!("{e:#}"))
                .bind(next_status)
                .bind(Utc::now())
                .bind(job.id.to_string())
                .execute(db)
                .await?;
            }
        }
    }

    Ok(sent)
}

pub async fn run_worker(db: SqlitePool, submitter: Arc<dyn ChainSubmitter>, config: WorkerConfig) {
    tracing::info!(interval = ?config.poll_interval, "submission worker started");

    loop {
        if let Err(e) = process_pending(&db, submitter.as_ref(), config.max_retries).await {
            tracing::error!("submission worker pass failed: {e:#}");
        }

        tokio::time::sleep(config.poll_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;
    use crate::eth::MockChainSubmitter;
    use anyhow::anyhow;

    const ROOT: &str = "8f2a5e7c1d4b3a69f0e1c2d3b4a5968778695a4b3c2d1e0f1a2b3c4d5e6f7081";

    #[tokio::test]
    async fn confirmed_submission_is_marked_sent() {
        let db = memory_pool().await;
        let id = enqueue_submission(&db, "battle-1", ROOT).await.unwrap();

        let mut submitter = MockChainSubmitter::new();
        submitter
            .expect_submit_root()
            .withf(|root| hex::encode(root) == ROOT)
            .times(1)
            .returning(|_| Ok("0xabc".to_string()));

        assert_eq!(process_pending(&db, &submitter, 5).await.unwrap(), 1);

        let view = get_submission(&db, id).await.unwrap().unwrap();
        assert_eq!(view.status, STATUS_SENT);
        assert_eq!(view.tx_id.as_deref(), Some("0xabc"));
        assert_eq!(view.battle_id, "battle-1");

        // nothing left to do on the next pass
        assert_eq!(process_pending(&db, &submitter, 5).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn failures_retry_until_the_limit() {
        let db = memory_pool().await;
        let id = enqueue_submission(&db, "battle-2", ROOT).await.unwrap();

        let mut submitter = MockChainSubmitter::new();
        submitter
            .expect_submit_root()
            .times(3)
            .returning(|_| Err(anyhow!("rpc unavailable")));

        process_pending(&db, &submitter, 2).await.unwrap();
        let view = get_submission(&db, id).await.unwrap().unwrap();
        assert_eq!(view.status, STATUS_PENDING);
        assert_eq!(view.retries, 1);
        assert_eq!(view.last_error.as_deref(), Some("rpc unavailable"));

        process_pending(&db, &submitter, 2).await.unwrap();
        process_pending(&db, &submitter, 2).await.unwrap();

        let view = get_submission(&db, id).await.unwrap().unwrap();
        assert_eq!(view.status, STATUS_FAILED);
        assert_eq!(view.retries, 3);
    }

    #[tokio::test]
    async fn malformed_root_fails_without_submitting() {
        let db = memory_pool().await;
        let id = enqueue_submission(&db, "battle-3", "not-hex").await.unwrap();

        let mut submitter = MockChainSubmitter::new();
        submitter.expect_submit_root().never();

        assert_eq!(process_pending(&db, &submitter, 5).await.unwrap(), 0);
        let view = get_submission(&db, id).await.unwrap().unwrap();
        assert_eq!(view.status, STATUS_FAILED);
    }

    #[tokio::test]
    async fn unknown_submission_is_none() {
        let db = memory_pool().await;
        assert!(get_submission(&db, Uuid::new_v4()).await.unwrap().is_none());
    }
}
