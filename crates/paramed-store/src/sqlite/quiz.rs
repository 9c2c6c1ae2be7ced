use super::{SqliteStore, decode_list, encode_list};
use crate::error::StoreError;
use crate::types::{Difficulty, NewQuestion, QuestionRecord, SkillId};

type QuestionTuple = (i64, SkillId, String, String, i64, String, String);

const QUESTION_COLUMNS: &str =
    "id, skill_id, question, options, correct_index, explanation, difficulty";

fn question_from_tuple(t: QuestionTuple) -> QuestionRecord {
    QuestionRecord {
        id: t.0,
        skill_id: t.1,
        question: t.2,
        options: decode_list(&t.3),
        correct_index: t.4,
        explanation: t.5,
        difficulty: t.6.parse().unwrap_or(Difficulty::Basic),
    }
}

impl SqliteStore {
    /// Replace every quiz question of `skill_id`, in one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails (the whole replace is rolled back).
    pub async fn replace_questions(
        &self,
        skill_id: SkillId,
        questions: &[NewQuestion],
    ) -> Result<usize, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM quiz_questions WHERE skill_id = ?")
            .bind(skill_id)
            .execute(&mut *tx)
            .await?;

        for q in questions {
            sqlx::query(
                "INSERT INTO quiz_questions \
                 (skill_id, question, options, correct_index, explanation, difficulty) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(skill_id)
            .bind(&q.question)
            .bind(encode_list(&q.options)?)
            .bind(q.correct_index)
            .bind(&q.explanation)
            .bind(q.difficulty.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(questions.len())
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn questions_for_skill(
        &self,
        skill_id: SkillId,
    ) -> Result<Vec<QuestionRecord>, StoreError> {
        let rows: Vec<QuestionTuple> = sqlx::query_as(&format!(
            "SELECT {QUESTION_COLUMNS} FROM quiz_questions WHERE skill_id = ? ORDER BY id"
        ))
        .bind(skill_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(question_from_tuple).collect())
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn all_questions(&self) -> Result<Vec<QuestionRecord>, StoreError> {
        let rows: Vec<QuestionTuple> = sqlx::query_as(&format!(
            "SELECT {QUESTION_COLUMNS} FROM quiz_questions ORDER BY skill_id, id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(question_from_tuple).collect())
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn question_count(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quiz_questions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NewSkill;

    fn question(text: &str, correct: i64) -> NewQuestion {
        NewQuestion {
            question: text.into(),
            options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            correct_index: correct,
            explanation: "because".into(),
            difficulty: Difficulty::Intermediate,
        }
    }

    #[tokio::test]
    async fn replace_and_load_questions() {
        let store = SqliteStore::new(":memory:").await.unwrap();
        let skill = store.insert_skill(&NewSkill::named("CPR")).await.unwrap();

        store
            .replace_questions(skill, &[question("Rate?", 1), question("Depth?", 2)])
            .await
            .unwrap();
        let stored = store.questions_for_skill(skill).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].question, "Rate?");
        assert_eq!(stored[0].options.len(), 4);
        assert_eq!(stored[1].correct_index, 2);
        assert_eq!(stored[1].difficulty, Difficulty::Intermediate);

        store
            .replace_questions(skill, &[question("Only", 0)])
            .await
            .unwrap();
        assert_eq!(store.question_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn all_questions_spans_skills() {
        let store = SqliteStore::new(":memory:").await.unwrap();
        let a = store.insert_skill(&NewSkill::named("A")).await.unwrap();
        let b = store.insert_skill(&NewSkill::named("B")).await.unwrap();
        store.replace_questions(a, &[question("q1", 0)]).await.unwrap();
        store.replace_questions(b, &[question("q2", 0)]).await.unwrap();

        let all = store.all_questions().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].skill_id, a);
        assert_eq!(all[1].skill_id, b);
        assert_eq!(store.list_skills_without_questions().await.unwrap().len(), 0);
    }
}
