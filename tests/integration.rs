use std::io::Write;
use std::path::{Path, PathBuf};

use paramed_core::config::Config;
use paramed_core::report::{ProgressReport, QualityBand, QualityReport, QuizValidation};
use paramed_core::{
    Catalogue, DocumentOutcome, ExtractionMode, ExtractionPipeline, RunOptions,
    group_conversations, seed_catalogue,
};
use paramed_llm::mock::MockProvider;
use paramed_skills::{MatchTier, SkillMatcher};
use paramed_store::types::{NewMessage, UserId};
use paramed_store::{MessageStore, SqliteStore};
use zip::write::SimpleFileOptions;

fn write_docx(path: &Path, paragraphs: &[&str]) {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t xml:space=\"preserve\">{p}</w:t></w:r></w:p>"))
        .collect();
    let xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
         <w:body>{body}</w:body></w:document>"
    );
    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    zip.start_file("word/document.xml", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(xml.as_bytes()).unwrap();
    zip.finish().unwrap();
}

async fn seeded_store() -> SqliteStore {
    let store = SqliteStore::new(":memory:").await.unwrap();
    let catalogue = Catalogue::load(Path::new("config/catalogue.example.toml")).unwrap();
    seed_catalogue(&store, &catalogue).await.unwrap();
    store
}

fn matcher(config: &Config) -> SkillMatcher {
    SkillMatcher::new(&config.matching).unwrap()
}

fn shipped_config() -> Config {
    let raw = std::fs::read_to_string("config/default.toml").unwrap();
    toml::from_str(&raw).unwrap()
}

fn documents() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    write_docx(
        &root.join("01 Needle Decompression.docx"),
        &[
            "Needle Decompression",
            "Indications: tension pneumothorax with haemodynamic compromise &amp; hypoxia",
            "Identify the second intercostal space in the midclavicular line.",
        ],
    );
    write_docx(
        &root.join("02 BVM.docx"),
        &["Bag valve mask ventilation", "Seal the mask with a C-E grip."],
    );
    write_docx(&root.join("03 Obstetrics.docx"), &["Normal delivery"]);
    write_docx(&root.join("~$ Needle Decompression.docx"), &["lock file"]);
    std::fs::write(root.join("notes.csv"), "ignored").unwrap();
    (dir, root)
}

const NEEDLE_STEPS: &str = r#"```json
{"skillName": "Needle Decompression", "steps": [
  {"stepNumber": 1, "title": "Confirm indication", "description": "Confirm signs of tension pneumothorax and haemodynamic compromise",
   "keyPoints": ["Absent breath sounds", "Hypotension"], "isCritical": true, "timeEstimate": "1 minute"},
  {"stepNumber": 2, "title": "Locate site", "description": "Second intercostal space, midclavicular line, above the third rib",
   "keyPoints": ["Avoid neurovascular bundle"], "isCritical": true, "timeEstimate": 30},
  {"stepNumber": 2, "title": "Insert catheter", "description": "Insert perpendicular to the chest wall until a rush of air is heard",
   "keyPoints": ["Leave catheter in place"], "isCritical": true, "timeEstimate": "20 seconds"}
]}
```"#;

const BVM_STEPS: &str = r#"{"skillName": "BVM", "steps": [
  {"title": "Open airway", "description": "Head tilt chin lift unless spinal injury is suspected",
   "keyPoints": ["Consider airway adjunct"], "isCritical": true, "timeEstimate": 15},
  {"title": "Ventilate", "description": "One breath every six seconds, watching for chest rise",
   "keyPoints": ["Avoid hyperventilation"], "isCritical": true, "timeEstimate": 60}
]}"#;

const OBSTETRICS_STEPS: &str = r#"{"skillName": "Normal Vaginal Delivery", "steps": [
  {"title": "Prepare", "description": "Prepare the delivery kit and warm the environment"}
]}"#;

#[test]
fn shipped_config_is_valid() {
    let config = shipped_config();
    config.validate().unwrap();
    assert_eq!(config.matching.aliases.len(), 4);
}

#[tokio::test]
async fn seeding_example_catalogue_twice_adds_nothing() {
    let store = seeded_store().await;
    let catalogue = Catalogue::load(Path::new("config/catalogue.example.toml")).unwrap();
    let again = seed_catalogue(&store, &catalogue).await.unwrap();
    assert_eq!(again.skills, 0);
    assert_eq!(again.skills_existing, catalogue.skills.len());
}

#[tokio::test]
async fn extract_steps_end_to_end() {
    let store = seeded_store().await;
    let (_guard, dir) = documents();
    let config = shipped_config();
    let provider = MockProvider::with_responses(vec![
        NEEDLE_STEPS.into(),
        BVM_STEPS.into(),
        OBSTETRICS_STEPS.into(),
    ]);
    let pipeline = ExtractionPipeline::new(&provider, &store, matcher(&config))
        .with_char_budget(config.extraction.char_budget);

    let summary = pipeline
        .run(&dir, &RunOptions::new(ExtractionMode::Steps))
        .await
        .unwrap();

    assert_eq!(summary.documents.len(), 3, "lock file and csv are skipped");
    assert!(matches!(
        &summary.documents[0].1,
        DocumentOutcome::Persisted { skill, tier: MatchTier::Exact, count: 3, .. }
            if skill == "Needle Decompression"
    ));
    assert!(matches!(
        &summary.documents[1].1,
        DocumentOutcome::Persisted { skill, tier: MatchTier::Alias, count: 2, .. }
            if skill == "Bag Valve Mask Ventilation"
    ));
    assert!(matches!(
        summary.documents[2].1,
        DocumentOutcome::Unmatched { .. }
    ));

    let first_prompt = &provider.requests()[0][1].content;
    assert!(first_prompt.contains("Document: 01 Needle Decompression.docx"));
    assert!(first_prompt.contains("haemodynamic compromise & hypoxia"));

    let needle = &store
        .find_skills_by_name("Needle Decompression")
        .await
        .unwrap()[0];
    let steps = store.steps_for_skill(needle.id).await.unwrap();
    let numbers: Vec<i64> = steps.iter().map(|s| s.step_number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert_eq!(steps[0].time_estimate_secs, Some(60));
    assert_eq!(steps[2].time_estimate_secs, Some(20));

    let progress = ProgressReport::collect(&store).await.unwrap();
    assert_eq!(progress.skills_with_steps, 2);
    assert_eq!(progress.total_steps, 5);

    let quality = QualityReport::collect(&store, &config.quality).await.unwrap();
    let needle_quality = quality
        .skills
        .iter()
        .find(|s| s.name == "Needle Decompression")
        .unwrap();
    assert_eq!(needle_quality.score, 90, "only the missing quiz is penalised");
    assert_eq!(needle_quality.band, QualityBand::Excellent);
}

#[tokio::test]
async fn rerun_replaces_previous_steps() {
    let store = seeded_store().await;
    let dir = tempfile::tempdir().unwrap();
    write_docx(&dir.path().join("needle.docx"), &["Needle decompression"]);
    let config = shipped_config();

    let provider = MockProvider::with_responses(vec![NEEDLE_STEPS.into(), BVM_STEPS
        .replace("\"BVM\"", "\"Needle Decompression\"")]);
    let pipeline = ExtractionPipeline::new(&provider, &store, matcher(&config));
    let options = RunOptions::new(ExtractionMode::Steps);
    pipeline.run(dir.path(), &options).await.unwrap();
    pipeline.run(dir.path(), &options).await.unwrap();

    assert_eq!(store.step_count().await.unwrap(), 2);
}

#[tokio::test]
async fn extract_quiz_then_validate() {
    let store = seeded_store().await;
    let dir = tempfile::tempdir().unwrap();
    write_docx(&dir.path().join("Splinting.docx"), &["Splint above and below the joint"]);
    let config = shipped_config();

    let quiz = r#"{"questions": [
        {"question": "What do you check before and after splinting?",
         "options": ["Circulation, motor, sensation", "Blood glucose", "Pupils"],
         "correctAnswer": "A", "explanation": "CMS confirms the splint is not too tight",
         "difficulty": "easy"},
        {"question": "How far should a splint extend?",
         "options": ["Joint above and below", "Only the injury"],
         "correctAnswer": "Joint above and below", "explanation": "Immobilises the bone ends"}
    ]}"#;
    let provider = MockProvider::with_responses(vec![quiz.into()]);
    let pipeline = ExtractionPipeline::new(&provider, &store, matcher(&config))
        .with_quiz_questions(config.extraction.quiz_questions);

    let summary = pipeline
        .run(dir.path(), &RunOptions::new(ExtractionMode::Quiz))
        .await
        .unwrap();
    assert_eq!(summary.succeeded(), 1);

    let splinting = &store.find_skills_by_name("Splinting").await.unwrap()[0];
    let questions = store.questions_for_skill(splinting.id).await.unwrap();
    assert_eq!(questions.len(), 2);
    assert_eq!(questions[0].correct_index, 0);
    assert_eq!(questions[1].correct_index, 0);

    let validation = QuizValidation::collect(&store).await.unwrap();
    assert_eq!(validation.checked, 2);
    assert!(validation.is_clean());
}

#[tokio::test]
async fn repair_renumbers_legacy_rows() {
    let store = seeded_store().await;
    let skill = store.find_skills_by_name("Splinting").await.unwrap()[0].id;
    for number in [1, 1, 3, 4] {
        store
            .append_step(skill, number, &paramed_store::types::NewStep::default())
            .await
            .unwrap();
    }

    let summary = store.renumber_all_steps().await.unwrap();
    assert_eq!(summary.skills_touched, 1);
    assert_eq!(summary.rows_changed, 1);
    let numbers: Vec<i64> = store
        .steps_for_skill(skill)
        .await
        .unwrap()
        .iter()
        .map(|s| s.step_number)
        .collect();
    assert_eq!(numbers, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn messaging_over_sqlite() {
    let store = SqliteStore::new(":memory:").await.unwrap();
    let student = UserId(10);
    let instructor = UserId(20);

    for (sender, recipient, body) in [
        (instructor, student, "Please redo the splinting video"),
        (student, instructor, "Uploaded a new attempt"),
        (instructor, student, "Looks good now"),
    ] {
        store
            .send(NewMessage {
                sender,
                recipient,
                subject: "Splinting".into(),
                body: body.into(),
            })
            .await
            .unwrap();
    }

    let conversations = group_conversations(student, &store.messages_for(student).await.unwrap());
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0].message_count, 3);
    assert_eq!(conversations[0].unread_count, 2);
    assert_eq!(conversations[0].last_message.body, "Looks good now");

    assert_eq!(
        store
            .mark_conversation_read(student, instructor)
            .await
            .unwrap(),
        2
    );
    let conversations = group_conversations(student, &store.messages_for(student).await.unwrap());
    assert_eq!(conversations[0].unread_count, 0);
}
