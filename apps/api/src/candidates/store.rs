use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use crate::models::candidate::CandidateRow;
use crate::schema::CandidateResult;

/// Inserts one analyzed candidate. Commits or leaves no trace.
pub async fn insert_candidate(pool: &SqlitePool, result: &CandidateResult) -> Result<()> {
    let row = CandidateRow::from_result(result, Utc::now());

    let mut tx = pool.begin().await?;
    sqlx::query(
        r#"
        INSERT INTO candidates
            (id, created_at, full_name, raw_summary, retention_score, risk_factors,
             vec_skills_count, vec_years_experience, vec_commute_minutes,
             vec_shift_preference, vec_salary_expectation, vec_has_certifications)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&row.id)
    .bind(row.created_at)
    .bind(&row.full_name)
    .bind(&row.raw_summary)
    .bind(row.retention_score)
    .bind(&row.risk_factors)
    .bind(row.vec_skills_count)
    .bind(row.vec_years_experience)
    .bind(row.vec_commute_minutes)
    .bind(row.vec_shift_preference)
    .bind(row.vec_salary_expectation)
    .bind(row.vec_has_certifications)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    info!(id = %row.id, score = row.retention_score, "candidate stored");
    Ok(())
}

/// Every stored candidate, newest first. Ties on `created_at` fall back to insertion order.
pub async fn list_candidates(pool: &SqlitePool) -> Result<Vec<CandidateResult>> {
    let rows: Vec<CandidateRow> =
        sqlx::query_as("SELECT * FROM candidates ORDER BY created_at DESC, rowid DESC")
            .fetch_all(pool)
            .await?;

    rows.into_iter()
        .map(|row| {
            let id = row.id.clone();
            CandidateResult::try_from(row)
                .with_context(|| format!("Stored candidate {id} is corrupt"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;
    use crate::scoring::rules::{LONG_COMMUTE, NO_CERTIFICATIONS};
    use crate::schema::{FeatureVector, ShiftPreference};
    use uuid::Uuid;

    fn candidate(name: &str, score: f64) -> CandidateResult {
        CandidateResult {
            id: Uuid::new_v4(),
            full_name: name.to_string(),
            raw_summary: format!("{name} summary"),
            vector: FeatureVector {
                skills_verified_count: 3,
                years_experience: 2.5,
                commute_time_minutes: 45,
                shift_preference: ShiftPreference::Any,
                salary_expectation: 70000,
                has_certifications: false,
            },
            retention_score: score,
            risk_factors: vec![LONG_COMMUTE.to_string(), NO_CERTIFICATIONS.to_string()],
        }
    }

    #[tokio::test]
    async fn test_empty_history() {
        let pool = memory_pool().await;
        assert!(list_candidates(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_round_trip_preserves_fields() {
        let pool = memory_pool().await;
        let stored = candidate("Иван Петров", 0.9);
        insert_candidate(&pool, &stored).await.unwrap();

        let history = list_candidates(&pool).await.unwrap();
        assert_eq!(history, vec![stored]);
    }

    #[tokio::test]
    async fn test_history_is_newest_first() {
        let pool = memory_pool().await;
        let names = ["first", "second", "third"];
        for (i, name) in names.iter().enumerate() {
            insert_candidate(&pool, &candidate(name, 0.1 * i as f64))
                .await
                .unwrap();
        }

        let history: Vec<String> = list_candidates(&pool)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.full_name)
            .collect();
        assert_eq!(history, vec!["third", "second", "first"]);
    }

    #[tokio::test]
    async fn test_duplicate_id_is_rejected_and_not_persisted_twice() {
        let pool = memory_pool().await;
        let stored = candidate("dup", 0.5);
        insert_candidate(&pool, &stored).await.unwrap();
        assert!(insert_candidate(&pool, &stored).await.is_err());
        assert_eq!(list_candidates(&pool).await.unwrap().len(), 1);
    }
}
