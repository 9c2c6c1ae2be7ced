use super::{SqliteStore, decode_list, encode_list};
use crate::error::StoreError;
use crate::types::{
    Category, CategoryId, Difficulty, NewSkill, SkillId, SkillRecord, SkillSummary, Subject,
    SubjectId,
};

type SkillTuple = (
    SkillId,
    String,
    Option<CategoryId>,
    Option<SubjectId>,
    String,
    bool,
    String,
    String,
    String,
    String,
);

const SKILL_COLUMNS: &str = "id, name, category_id, subject_id, difficulty, is_critical, \
     objectives, indications, contraindications, common_errors";

fn skill_from_tuple(t: SkillTuple) -> SkillRecord {
    SkillRecord {
        id: t.0,
        name: t.1,
        category_id: t.2,
        subject_id: t.3,
        difficulty: t.4.parse().unwrap_or(Difficulty::Basic),
        is_critical: t.5,
        objectives: decode_list(&t.6),
        indications: decode_list(&t.7),
        contraindications: decode_list(&t.8),
        common_errors: decode_list(&t.9),
    }
}

impl SqliteStore {
    /// Insert a category and return its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails (including a duplicate name).
    pub async fn insert_category(
        &self,
        name: &str,
        description: &str,
    ) -> Result<CategoryId, StoreError> {
        let row: (CategoryId,) = sqlx::query_as(
            "INSERT INTO categories (name, description) VALUES (?, ?) RETURNING id",
        )
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0)
    }

    /// Look up a category by name, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find_category(&self, name: &str) -> Result<Option<Category>, StoreError> {
        let row: Option<(CategoryId, String, String)> = sqlx::query_as(
            "SELECT id, name, description FROM categories WHERE name = ? COLLATE NOCASE LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, name, description)| Category {
            id,
            name,
            description,
        }))
    }

    /// Return the existing category with this name or create it.
    ///
    /// The boolean is `true` when a row was created.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup or insert fails.
    pub async fn ensure_category(
        &self,
        name: &str,
        description: &str,
    ) -> Result<(CategoryId, bool), StoreError> {
        if let Some(existing) = self.find_category(name).await? {
            return Ok((existing.id, false));
        }
        Ok((self.insert_category(name, description).await?, true))
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let rows: Vec<(CategoryId, String, String)> =
            sqlx::query_as("SELECT id, name, description FROM categories ORDER BY name")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows
            .into_iter()
            .map(|(id, name, description)| Category {
                id,
                name,
                description,
            })
            .collect())
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find_subject(&self, hem_code: &str) -> Result<Option<Subject>, StoreError> {
        let row: Option<(SubjectId, String, String)> = sqlx::query_as(
            "SELECT id, hem_code, name FROM subjects WHERE hem_code = ? COLLATE NOCASE LIMIT 1",
        )
        .bind(hem_code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, hem_code, name)| Subject { id, hem_code, name }))
    }

    /// Return the subject with this HEM code or create it.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup or insert fails.
    pub async fn ensure_subject(
        &self,
        hem_code: &str,
        name: &str,
    ) -> Result<(SubjectId, bool), StoreError> {
        if let Some(existing) = self.find_subject(hem_code).await? {
            return Ok((existing.id, false));
        }
        let row: (SubjectId,) =
            sqlx::query_as("INSERT INTO subjects (hem_code, name) VALUES (?, ?) RETURNING id")
                .bind(hem_code)
                .bind(name)
                .fetch_one(&self.pool)
                .await?;
        Ok((row.0, true))
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_subjects(&self) -> Result<Vec<Subject>, StoreError> {
        let rows: Vec<(SubjectId, String, String)> =
            sqlx::query_as("SELECT id, hem_code, name FROM subjects ORDER BY hem_code")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows
            .into_iter()
            .map(|(id, hem_code, name)| Subject { id, hem_code, name })
            .collect())
    }

    /// Insert a skill and return its ID. Duplicate names are allowed.
    ///
    /// # Errors
    ///
    /// Returns an error if list encoding or the insert fails.
    pub async fn insert_skill(&self, skill: &NewSkill) -> Result<SkillId, StoreError> {
        let row: (SkillId,) = sqlx::query_as(
            "INSERT INTO skills (name, category_id, subject_id, difficulty, is_critical, \
             objectives, indications, contraindications, common_errors) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(&skill.name)
        .bind(skill.category_id)
        .bind(skill.subject_id)
        .bind(skill.difficulty.as_str())
        .bind(skill.is_critical)
        .bind(encode_list(&skill.objectives)?)
        .bind(encode_list(&skill.indications)?)
        .bind(encode_list(&skill.contraindications)?)
        .bind(encode_list(&skill.common_errors)?)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn skill(&self, id: SkillId) -> Result<Option<SkillRecord>, StoreError> {
        let row: Option<SkillTuple> =
            sqlx::query_as(&format!("SELECT {SKILL_COLUMNS} FROM skills WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(skill_from_tuple))
    }

    /// All skills whose name equals `name` ignoring case, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find_skills_by_name(&self, name: &str) -> Result<Vec<SkillRecord>, StoreError> {
        let rows: Vec<SkillTuple> = sqlx::query_as(&format!(
            "SELECT {SKILL_COLUMNS} FROM skills WHERE name = ? COLLATE NOCASE ORDER BY id"
        ))
        .bind(name)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(skill_from_tuple).collect())
    }

    /// All skills in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_skills(&self) -> Result<Vec<SkillRecord>, StoreError> {
        let rows: Vec<SkillTuple> =
            sqlx::query_as(&format!("SELECT {SKILL_COLUMNS} FROM skills ORDER BY id"))
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(skill_from_tuple).collect())
    }

    /// Skills that have no steps yet, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_skills_without_steps(&self) -> Result<Vec<SkillRecord>, StoreError> {
        let rows: Vec<SkillTuple> = sqlx::query_as(&format!(
            "SELECT {SKILL_COLUMNS} FROM skills s \
             WHERE NOT EXISTS (SELECT 1 FROM skill_steps st WHERE st.skill_id = s.id) \
             ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(skill_from_tuple).collect())
    }

    /// Skills without quiz questions, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_skills_without_questions(&self) -> Result<Vec<SkillRecord>, StoreError> {
        let rows: Vec<SkillTuple> = sqlx::query_as(&format!(
            "SELECT {SKILL_COLUMNS} FROM skills s \
             WHERE NOT EXISTS (SELECT 1 FROM quiz_questions q WHERE q.skill_id = s.id) \
             ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(skill_from_tuple).collect())
    }

    /// Every skill with category name, HEM code and child counts.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn skill_summaries(&self) -> Result<Vec<SkillSummary>, StoreError> {
        let rows: Vec<(SkillId, String, Option<String>, Option<String>, i64, i64)> =
            sqlx::query_as(
                "SELECT s.id, s.name, c.name, sub.hem_code, \
                 (SELECT COUNT(*) FROM skill_steps st WHERE st.skill_id = s.id), \
                 (SELECT COUNT(*) FROM quiz_questions q WHERE q.skill_id = s.id) \
                 FROM skills s \
                 LEFT JOIN categories c ON c.id = s.category_id \
                 LEFT JOIN subjects sub ON sub.id = s.subject_id \
                 ORDER BY s.id",
            )
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(
                |(id, name, category, hem_code, step_count, question_count)| SkillSummary {
                    id,
                    name,
                    category,
                    hem_code,
                    step_count,
                    question_count,
                },
            )
            .collect())
    }
}
