use super::{SqliteStore, decode_list, encode_list};
use crate::error::StoreError;
use crate::types::{NewStep, RenumberSummary, SkillId, StepRecord};

type StepTuple = (i64, SkillId, i64, String, String, String, bool, Option<i64>);

const STEP_COLUMNS: &str =
    "id, skill_id, step_number, title, description, key_points, is_critical, time_estimate_secs";

fn step_from_tuple(t: StepTuple) -> StepRecord {
    StepRecord {
        id: t.0,
        skill_id: t.1,
        step_number: t.2,
        title: t.3,
        description: t.4,
        key_points: decode_list(&t.5),
        is_critical: t.6,
        time_estimate_secs: t.7,
    }
}

impl SqliteStore {
    /// Replace every step of `skill_id` with `steps`, in one transaction.
    ///
    /// Step numbers come from array position (1-based); a source-provided
    /// number that disagrees is logged and ignored. Returns the number of
    /// inserted rows.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails (the whole replace is rolled back).
    pub async fn replace_steps(
        &self,
        skill_id: SkillId,
        steps: &[NewStep],
    ) -> Result<usize, StoreError> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM skill_steps WHERE skill_id = ?")
            .bind(skill_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        for (idx, step) in steps.iter().enumerate() {
            let number = i64::try_from(idx + 1)?;
            if let Some(claimed) = step.source_step_number
                && claimed != number
            {
                tracing::warn!(
                    skill = %skill_id,
                    claimed,
                    assigned = number,
                    "source step number disagrees with position, using position"
                );
            }
            sqlx::query(
                "INSERT INTO skill_steps \
                 (skill_id, step_number, title, description, key_points, is_critical, time_estimate_secs) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(skill_id)
            .bind(number)
            .bind(&step.title)
            .bind(&step.description)
            .bind(encode_list(&step.key_points)?)
            .bind(step.is_critical)
            .bind(step.time_estimate_secs)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(skill = %skill_id, deleted, inserted = steps.len(), "steps replaced");
        Ok(steps.len())
    }

    /// Insert one step with an explicit number, without touching siblings.
    ///
    /// Used for importing legacy rows; contiguity is not enforced here, see
    /// [`renumber_steps`](Self::renumber_steps).
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn append_step(
        &self,
        skill_id: SkillId,
        step_number: i64,
        step: &NewStep,
    ) -> Result<i64, StoreError> {
        let row: (i64,) = sqlx::query_as(
            "INSERT INTO skill_steps \
             (skill_id, step_number, title, description, key_points, is_critical, time_estimate_secs) \
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(skill_id)
        .bind(step_number)
        .bind(&step.title)
        .bind(&step.description)
        .bind(encode_list(&step.key_points)?)
        .bind(step.is_critical)
        .bind(step.time_estimate_secs)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0)
    }

    /// Steps of one skill ordered by step number, then insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn steps_for_skill(&self, skill_id: SkillId) -> Result<Vec<StepRecord>, StoreError> {
        let rows: Vec<StepTuple> = sqlx::query_as(&format!(
            "SELECT {STEP_COLUMNS} FROM skill_steps WHERE skill_id = ? ORDER BY step_number, id"
        ))
        .bind(skill_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(step_from_tuple).collect())
    }

    /// Every step, grouped by skill.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn all_steps(&self) -> Result<Vec<StepRecord>, StoreError> {
        let rows: Vec<StepTuple> = sqlx::query_as(&format!(
            "SELECT {STEP_COLUMNS} FROM skill_steps ORDER BY skill_id, step_number, id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(step_from_tuple).collect())
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn step_count(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM skill_steps")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Rewrite the step numbers of one skill to `1..=n`, keeping the current
    /// relative order (step number, then insertion order). Returns how many
    /// rows changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the query or any update fails.
    pub async fn renumber_steps(&self, skill_id: SkillId) -> Result<usize, StoreError> {
        let mut tx = self.pool.begin().await?;
        let rows: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT id, step_number FROM skill_steps WHERE skill_id = ? ORDER BY step_number, id",
        )
        .bind(skill_id)
        .fetch_all(&mut *tx)
        .await?;

        let mut changed = 0;
        for (idx, (id, current)) in rows.into_iter().enumerate() {
            let expected = i64::try_from(idx + 1)?;
            if current == expected {
                continue;
            }
            sqlx::query("UPDATE skill_steps SET step_number = ? WHERE id = ?")
                .bind(expected)
                .bind(id)
                .execute(&mut *tx)
                .await?;
            changed += 1;
        }
        tx.commit().await?;
        Ok(changed)
    }

    /// Run [`renumber_steps`](Self::renumber_steps) for every skill that has steps.
    ///
    /// # Errors
    ///
    /// Returns an error on the first failing skill; earlier skills stay repaired.
    pub async fn renumber_all_steps(&self) -> Result<RenumberSummary, StoreError> {
        let skill_ids: Vec<(SkillId,)> =
            sqlx::query_as("SELECT DISTINCT skill_id FROM skill_steps ORDER BY skill_id")
                .fetch_all(&self.pool)
                .await?;

        let mut summary = RenumberSummary::default();
        for (skill_id,) in skill_ids {
            let changed = self.renumber_steps(skill_id).await?;
            if changed > 0 {
                tracing::info!(skill = %skill_id, changed, "renumbered steps");
                summary.skills_touched += 1;
                summary.rows_changed += changed;
            }
        }
        Ok(summary)
    }
}
