//! Sequential document → model → matcher → store loop.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use paramed_llm::{Extractor, LlmError, LlmProvider};
use paramed_skills::{MatchTier, SkillMatcher};
use paramed_store::SqliteStore;
use paramed_store::document::DocumentReader;
use paramed_store::types::{NewQuestion, NewStep, SkillId, SkillRecord};

use crate::error::PipelineError;
use crate::extraction::{
    QUIZ_PREAMBLE, QuizExtraction, STEP_PREAMBLE, StepExtraction, quiz_prompt, step_prompt,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMode {
    Steps,
    Quiz,
}

impl ExtractionMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Steps => "steps",
            Self::Quiz => "quiz",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub mode: ExtractionMode,
    /// Documents to skip from the start of the sorted listing.
    pub skip: usize,
    pub limit: Option<usize>,
    /// Pause between documents; not applied after the last one.
    pub delay: Duration,
    /// Only consider skills that have no steps (or questions) yet.
    pub only_unpopulated: bool,
    /// Extract and match but write nothing.
    pub dry_run: bool,
}

impl RunOptions {
    #[must_use]
    pub fn new(mode: ExtractionMode) -> Self {
        Self {
            mode,
            skip: 0,
            limit: None,
            delay: Duration::ZERO,
            only_unpopulated: false,
            dry_run: false,
        }
    }
}

/// What happened to a single document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentOutcome {
    Persisted {
        skill_id: SkillId,
        skill: String,
        tier: MatchTier,
        count: usize,
    },
    DryRun {
        skill: String,
        tier: MatchTier,
        count: usize,
    },
    /// No text could be read.
    Unreadable,
    /// Transport or API failure.
    ExtractionFailed(String),
    /// The model answered but not with usable content.
    Malformed(String),
    Unmatched {
        candidate: String,
    },
    PersistFailed(String),
}

impl DocumentOutcome {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Persisted { .. } => "persisted",
            Self::DryRun { .. } => "dry-run",
            Self::Unreadable => "unreadable",
            Self::ExtractionFailed(_) => "extraction-failed",
            Self::Malformed(_) => "malformed",
            Self::Unmatched { .. } => "unmatched",
            Self::PersistFailed(_) => "persist-failed",
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Persisted { .. } | Self::DryRun { .. })
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub documents: Vec<(PathBuf, DocumentOutcome)>,
}

impl RunSummary {
    #[must_use]
    pub fn count(&self, label: &str) -> usize {
        self.documents
            .iter()
            .filter(|(_, o)| o.label() == label)
            .count()
    }

    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.documents.iter().filter(|(_, o)| o.is_success()).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.documents.len() - self.succeeded()
    }

    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (path, outcome) in &self.documents {
            let name = file_name(path);
            let detail = match outcome {
                DocumentOutcome::Persisted { skill, tier, count, .. }
                | DocumentOutcome::DryRun { skill, tier, count } => {
                    format!("{skill} ({tier}, {count} rows)")
                }
                DocumentOutcome::Unmatched { candidate } => format!("no skill for {candidate:?}"),
                DocumentOutcome::ExtractionFailed(e)
                | DocumentOutcome::Malformed(e)
                | DocumentOutcome::PersistFailed(e) => e.clone(),
                DocumentOutcome::Unreadable => String::new(),
            };
            let _ = writeln!(out, "  {:<18} {name} {detail}", outcome.label());
        }
        let _ = writeln!(
            out,
            "{} documents: {} ok, {} unmatched, {} malformed, {} failed",
            self.documents.len(),
            self.succeeded(),
            self.count("unmatched"),
            self.count("malformed"),
            self.failed() - self.count("unmatched") - self.count("malformed"),
        );
        out
    }
}

/// A document file name matched against the catalogue without calling the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingRow {
    pub file: PathBuf,
    pub candidate: String,
    pub skill: Option<(String, MatchTier)>,
}

enum Content {
    Steps(Vec<NewStep>),
    Questions(Vec<NewQuestion>),
}

impl Content {
    fn len(&self) -> usize {
        match self {
            Self::Steps(s) => s.len(),
            Self::Questions(q) => q.len(),
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map_or_else(String::new, |s| s.to_string_lossy().into_owned())
}

pub struct ExtractionPipeline<'a, P: LlmProvider> {
    provider: &'a P,
    store: &'a SqliteStore,
    reader: DocumentReader,
    matcher: SkillMatcher,
    char_budget: usize,
    quiz_questions: usize,
}

impl<'a, P: LlmProvider> ExtractionPipeline<'a, P> {
    #[must_use]
    pub fn new(provider: &'a P, store: &'a SqliteStore, matcher: SkillMatcher) -> Self {
        Self {
            provider,
            store,
            reader: DocumentReader::new(),
            matcher,
            char_budget: 3000,
            quiz_questions: 10,
        }
    }

    #[must_use]
    pub fn with_char_budget(mut self, budget: usize) -> Self {
        self.char_budget = budget;
        self
    }

    #[must_use]
    pub fn with_quiz_questions(mut self, count: usize) -> Self {
        self.quiz_questions = count;
        self
    }

    async fn candidate_skills(
        &self,
        options: &RunOptions,
    ) -> Result<Vec<SkillRecord>, PipelineError> {
        let skills = match (options.only_unpopulated, options.mode) {
            (false, _) => self.store.list_skills().await?,
            (true, ExtractionMode::Steps) => self.store.list_skills_without_steps().await?,
            (true, ExtractionMode::Quiz) => self.store.list_skills_without_questions().await?,
        };
        Ok(skills)
    }

    /// Process every supported document in `dir`, one at a time.
    ///
    /// Per-document failures are recorded in the summary and never stop the run.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed or the skill
    /// catalogue cannot be loaded.
    pub async fn run(&self, dir: &Path, options: &RunOptions) -> Result<RunSummary, PipelineError> {
        let files: Vec<PathBuf> = self
            .reader
            .list_documents(dir)
            .await?
            .into_iter()
            .skip(options.skip)
            .take(options.limit.unwrap_or(usize::MAX))
            .collect();
        let mut skills = self.candidate_skills(options).await?;

        tracing::info!(
            dir = %dir.display(),
            documents = files.len(),
            skills = skills.len(),
            mode = options.mode.as_str(),
            dry_run = options.dry_run,
            "starting extraction run"
        );

        let mut summary = RunSummary::default();
        let total = files.len();
        for (idx, path) in files.into_iter().enumerate() {
            let outcome = self.process_document(&path, &skills, options).await;
            let name = file_name(&path);
            if outcome.is_success() {
                tracing::info!(file = %name, status = outcome.label(), "[{}/{total}] done", idx + 1);
            } else {
                tracing::warn!(file = %name, status = outcome.label(), "[{}/{total}] skipped", idx + 1);
            }

            if options.only_unpopulated
                && let DocumentOutcome::Persisted { skill_id, .. } = &outcome
            {
                skills.retain(|s| s.id != *skill_id);
            }
            summary.documents.push((path, outcome));

            if let Some(delay) = pause_after(idx, total, options.delay) {
                tokio::time::sleep(delay).await;
            }
        }
        Ok(summary)
    }

    /// Read, extract, match and persist a single document.
    pub async fn process_document(
        &self,
        path: &Path,
        skills: &[SkillRecord],
        options: &RunOptions,
    ) -> DocumentOutcome {
        let text = self.reader.read_text(path).await;
        if text.trim().is_empty() {
            return DocumentOutcome::Unreadable;
        }
        let name = file_name(path);

        match options.mode {
            ExtractionMode::Steps => {
                let prompt = step_prompt(&name, &text, self.char_budget);
                let extraction: StepExtraction = match Extractor::new(self.provider)
                    .with_preamble(STEP_PREAMBLE)
                    .extract(&prompt)
                    .await
                {
                    Ok(e) => e,
                    Err(e) => return llm_failure(&e),
                };
                if let Err(e) = extraction.validate() {
                    return DocumentOutcome::Malformed(e.to_string());
                }
                let content = Content::Steps(extraction.to_new_steps());
                self.persist(&extraction.skill_name, skills, options, content)
                    .await
            }
            ExtractionMode::Quiz => {
                let prompt = quiz_prompt(&name, &text, self.char_budget, self.quiz_questions);
                let extraction: QuizExtraction = match Extractor::new(self.provider)
                    .with_preamble(QUIZ_PREAMBLE)
                    .extract(&prompt)
                    .await
                {
                    Ok(e) => e,
                    Err(e) => return llm_failure(&e),
                };
                if let Err(e) = extraction.validate() {
                    return DocumentOutcome::Malformed(e.to_string());
                }
                let candidate = extraction
                    .named_skill()
                    .map_or_else(|| file_stem(path), str::to_owned);
                let content = Content::Questions(extraction.to_new_questions());
                self.persist(&candidate, skills, options, content).await
            }
        }
    }

    async fn persist(
        &self,
        candidate: &str,
        skills: &[SkillRecord],
        options: &RunOptions,
        content: Content,
    ) -> DocumentOutcome {
        let Some(found) = self.matcher.find(candidate, skills) else {
            return DocumentOutcome::Unmatched {
                candidate: candidate.to_owned(),
            };
        };
        let skill = found.skill.name.clone();
        if options.dry_run {
            return DocumentOutcome::DryRun {
                skill,
                tier: found.tier,
                count: content.len(),
            };
        }
        let written = match &content {
            Content::Steps(steps) => self.store.replace_steps(found.skill.id, steps).await,
            Content::Questions(qs) => self.store.replace_questions(found.skill.id, qs).await,
        };
        match written {
            Ok(count) => {
                tracing::debug!(skill = %skill, tier = %found.tier, count, "content replaced");
                DocumentOutcome::Persisted {
                    skill_id: found.skill.id,
                    skill,
                    tier: found.tier,
                    count,
                }
            }
            Err(e) => DocumentOutcome::PersistFailed(e.to_string()),
        }
    }

    /// Match each document's file name against the catalogue.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or the catalogue cannot be read.
    pub async fn map(&self, dir: &Path) -> Result<Vec<MappingRow>, PipelineError> {
        map_documents(&self.reader, &self.matcher, self.store, dir).await
    }
}

/// Match each document's file stem against the catalogue without calling a model.
///
/// # Errors
///
/// Returns an error if the directory or the catalogue cannot be read.
pub async fn map_documents(
    reader: &DocumentReader,
    matcher: &SkillMatcher,
    store: &SqliteStore,
    dir: &Path,
) -> Result<Vec<MappingRow>, PipelineError> {
    let files = reader.list_documents(dir).await?;
    let skills = store.list_skills().await?;
    Ok(files
        .into_iter()
        .map(|file| {
            let candidate = file_stem(&file);
            let skill = matcher
                .find(&candidate, &skills)
                .map(|m| (m.skill.name.clone(), m.tier));
            MappingRow {
                file,
                candidate,
                skill,
            }
        })
        .collect())
}

/// Pacing between model calls; nothing follows the last document.
fn pause_after(idx: usize, total: usize, delay: Duration) -> Option<Duration> {
    (idx + 1 < total && !delay.is_zero()).then_some(delay)
}

fn llm_failure(e: &LlmError) -> DocumentOutcome {
    if e.is_malformed() {
        DocumentOutcome::Malformed(e.to_string())
    } else {
        DocumentOutcome::ExtractionFailed(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use paramed_llm::mock::MockProvider;
    use paramed_store::types::NewSkill;

    use super::*;
    use crate::extraction::truncate_chars;

    const STEPS_JSON: &str = r#"{"skillName": "Needle Decompression", "steps": [
        {"stepNumber": 1, "title": "Identify site", "description": "Second intercostal space, midclavicular line",
         "keyPoints": ["Above third rib"], "isCritical": true, "timeEstimate": 30},
        {"stepNumber": 1, "title": "Insert needle", "description": "Insert at ninety degrees until air escapes",
         "keyPoints": ["Listen for hiss"], "isCritical": true, "timeEstimate": 20}
    ]}"#;

    const QUIZ_JSON: &str = r#"{"questions": [
        {"question": "Where is the needle inserted?", "options": ["2nd ICS MCL", "5th ICS MAL"],
         "correctAnswer": 0, "explanation": "Classic anterior site", "difficulty": "basic"}
    ]}"#;

    async fn setup() -> (SqliteStore, tempfile::TempDir) {
        let store = SqliteStore::new(":memory:").await.unwrap();
        for name in ["Needle Decompression", "Splinting", "Oral Suction"] {
            store.insert_skill(&NewSkill::named(name)).await.unwrap();
        }
        (store, tempfile::tempdir().unwrap())
    }

    fn write(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[tokio::test]
    async fn persists_steps_numbered_by_position() {
        let (store, dir) = setup().await;
        write(&dir, "needle.txt", "Needle decompression handout");
        let provider = MockProvider::with_responses(vec![STEPS_JSON.into()]);
        let pipeline = ExtractionPipeline::new(&provider, &store, SkillMatcher::default());

        let summary = pipeline
            .run(dir.path(), &RunOptions::new(ExtractionMode::Steps))
            .await
            .unwrap();
        assert_eq!(summary.succeeded(), 1);
        assert!(matches!(
            &summary.documents[0].1,
            DocumentOutcome::Persisted { skill, tier: MatchTier::Exact, count: 2, .. } if skill == "Needle Decompression"
        ));

        let skill = &store.find_skills_by_name("Needle Decompression").await.unwrap()[0];
        let steps = store.steps_for_skill(skill.id).await.unwrap();
        let numbers: Vec<i64> = steps.iter().map(|s| s.step_number).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[tokio::test]
    async fn prompt_carries_file_name_and_budget() {
        let (store, dir) = setup().await;
        let long = "a".repeat(100);
        write(&dir, "needle.txt", &long);
        let provider = MockProvider::with_responses(vec![STEPS_JSON.into()]);
        let pipeline =
            ExtractionPipeline::new(&provider, &store, SkillMatcher::default()).with_char_budget(10);
        pipeline
            .run(dir.path(), &RunOptions::new(ExtractionMode::Steps))
            .await
            .unwrap();

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        let messages = &requests[0];
        assert_eq!(messages[0].content, STEP_PREAMBLE);
        assert!(messages[1].content.contains("Document: needle.txt"));
        assert!(messages[1].content.ends_with(truncate_chars(&long, 10)));
        assert!(!messages[1].content.contains(&"a".repeat(11)));
    }

    #[tokio::test]
    async fn failures_are_recorded_and_run_continues() {
        let (store, dir) = setup().await;
        write(&dir, "a-empty.txt", "   ");
        write(&dir, "b-garbage.txt", "text");
        write(&dir, "c-unknown.txt", "text");
        write(&dir, "d-invalid.txt", "text");
        write(&dir, "e-good.txt", "text");
        let provider = MockProvider::with_responses(vec![
            "I cannot help with that".into(),
            r#"{"skillName": "Childbirth Delivery", "steps": [{"title": "Prepare"}]}"#.into(),
            r#"{"skillName": "Splinting", "steps": []}"#.into(),
            STEPS_JSON.into(),
        ]);
        let pipeline = ExtractionPipeline::new(&provider, &store, SkillMatcher::default());

        let summary = pipeline
            .run(dir.path(), &RunOptions::new(ExtractionMode::Steps))
            .await
            .unwrap();
        let labels: Vec<&str> = summary.documents.iter().map(|(_, o)| o.label()).collect();
        assert_eq!(
            labels,
            vec!["unreadable", "malformed", "unmatched", "malformed", "persisted"]
        );
        assert_eq!(provider.call_count(), 4);
        assert_eq!(summary.failed(), 4);
        assert!(summary.render().contains("5 documents: 1 ok, 1 unmatched, 2 malformed, 1 failed"));
    }

    #[tokio::test]
    async fn transport_error_is_extraction_failed() {
        let (store, dir) = setup().await;
        write(&dir, "needle.txt", "text");
        let provider = MockProvider::failing();
        let pipeline = ExtractionPipeline::new(&provider, &store, SkillMatcher::default());
        let summary = pipeline
            .run(dir.path(), &RunOptions::new(ExtractionMode::Steps))
            .await
            .unwrap();
        assert!(matches!(
            summary.documents[0].1,
            DocumentOutcome::ExtractionFailed(_)
        ));
    }

    #[tokio::test]
    async fn dry_run_writes_nothing() {
        let (store, dir) = setup().await;
        write(&dir, "needle.txt", "text");
        let provider = MockProvider::with_responses(vec![STEPS_JSON.into()]);
        let pipeline = ExtractionPipeline::new(&provider, &store, SkillMatcher::default());
        let mut options = RunOptions::new(ExtractionMode::Steps);
        options.dry_run = true;

        let summary = pipeline.run(dir.path(), &options).await.unwrap();
        assert_eq!(summary.count("dry-run"), 1);
        assert_eq!(store.step_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn skip_and_limit_select_a_window() {
        let (store, dir) = setup().await;
        for name in ["1.txt", "2.txt", "3.txt", "4.txt"] {
            write(&dir, name, "text");
        }
        let provider = MockProvider::default();
        let pipeline = ExtractionPipeline::new(&provider, &store, SkillMatcher::default());
        let mut options = RunOptions::new(ExtractionMode::Steps);
        options.skip = 1;
        options.limit = Some(2);

        let summary = pipeline.run(dir.path(), &options).await.unwrap();
        let names: Vec<String> = summary.documents.iter().map(|(p, _)| file_name(p)).collect();
        assert_eq!(names, vec!["2.txt", "3.txt"]);
    }

    #[tokio::test]
    async fn only_unpopulated_ignores_skills_with_steps() {
        let (store, dir) = setup().await;
        write(&dir, "needle.txt", "text");
        let skill = store.find_skills_by_name("Needle Decompression").await.unwrap()[0].id;
        store
            .replace_steps(skill, &[paramed_store::types::NewStep::default()])
            .await
            .unwrap();

        let provider = MockProvider::with_responses(vec![STEPS_JSON.into()]);
        let pipeline = ExtractionPipeline::new(&provider, &store, SkillMatcher::default());
        let mut options = RunOptions::new(ExtractionMode::Steps);
        options.only_unpopulated = true;

        let summary = pipeline.run(dir.path(), &options).await.unwrap();
        assert_eq!(summary.count("unmatched"), 1);
        assert_eq!(store.steps_for_skill(skill).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn quiz_falls_back_to_file_stem() {
        let (store, dir) = setup().await;
        write(&dir, "Needle Decompression.txt", "text");
        let provider = MockProvider::with_responses(vec![QUIZ_JSON.into()]);
        let pipeline = ExtractionPipeline::new(&provider, &store, SkillMatcher::default())
            .with_quiz_questions(1);

        let summary = pipeline
            .run(dir.path(), &RunOptions::new(ExtractionMode::Quiz))
            .await
            .unwrap();
        assert_eq!(summary.succeeded(), 1);
        assert_eq!(store.question_count().await.unwrap(), 1);
        assert!(provider.requests()[0][1].content.contains("Write 1 multiple-choice"));
    }

    #[tokio::test]
    async fn only_unpopulated_fills_duplicate_names_in_turn() {
        let (store, dir) = setup().await;
        let twin = store
            .insert_skill(&NewSkill::named("Needle Decompression"))
            .await
            .unwrap();
        let first = store.find_skills_by_name("Needle Decompression").await.unwrap()[0].id;
        assert_ne!(first, twin);
        write(&dir, "1.txt", "text");
        write(&dir, "2.txt", "text");

        let provider = MockProvider::with_responses(vec![STEPS_JSON.into(), STEPS_JSON.into()]);
        let pipeline = ExtractionPipeline::new(&provider, &store, SkillMatcher::default());
        let mut options = RunOptions::new(ExtractionMode::Steps);
        options.only_unpopulated = true;

        let summary = pipeline.run(dir.path(), &options).await.unwrap();
        let ids: Vec<SkillId> = summary
            .documents
            .iter()
            .filter_map(|(_, o)| match o {
                DocumentOutcome::Persisted { skill_id, .. } => Some(*skill_id),
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec![first, twin]);
        assert_eq!(store.steps_for_skill(twin).await.unwrap().len(), 2);
    }

    #[test]
    fn delay_is_skipped_after_last_document() {
        let delay = Duration::from_secs(30);
        assert_eq!(pause_after(0, 3, delay), Some(delay));
        assert_eq!(pause_after(1, 3, delay), Some(delay));
        assert_eq!(pause_after(2, 3, delay), None);
        assert_eq!(pause_after(0, 1, delay), None);
        assert_eq!(pause_after(0, 3, Duration::ZERO), None);
    }

    #[tokio::test]
    async fn map_matches_file_stems() {
        let (store, dir) = setup().await;
        write(&dir, "splinting-lower-limb.txt", "x");
        write(&dir, "obstetrics.txt", "x");
        let provider = MockProvider::default();
        let pipeline = ExtractionPipeline::new(&provider, &store, SkillMatcher::default());

        let rows = pipeline.map(dir.path()).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].candidate, "obstetrics");
        assert!(rows[0].skill.is_none());
        assert_eq!(
            rows[1].skill,
            Some(("Splinting".to_owned(), MatchTier::Substring))
        );
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn missing_directory_is_fatal() {
        let (store, _dir) = setup().await;
        let provider = MockProvider::default();
        let pipeline = ExtractionPipeline::new(&provider, &store, SkillMatcher::default());
        let result = pipeline
            .run(Path::new("/nonexistent/docs"), &RunOptions::new(ExtractionMode::Steps))
            .await;
        assert!(matches!(result, Err(PipelineError::Document(_))));
    }
}
