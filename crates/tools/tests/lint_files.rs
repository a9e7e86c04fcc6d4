use std::fs;

use triplearn_tools::lint::lint_paths;
use triplearn_tools::sql::{generate_update_sql, load_inputs};

#[test]
fn lint_reports_missing_files_and_prefixes_paths() {
    let dir = tempfile::tempdir().expect("tempdir");
    let good = dir.path().join("good.json");
    let bad = dir.path().join("bad.json");
    let missing = dir.path().join("missing.json");
    fs::write(
        &good,
        r#"[{ "story": "Mia said Arigato (Ah-REE-gah-toh).", "question": "What did Mia say?" }]"#,
    )
    .expect("write good");
    fs::write(&bad, r#"[{}, { "question": "True or false?" }]"#).expect("write bad");

    let issues = lint_paths(&[good, bad.clone(), missing.clone()]).expect("lint");

    assert_eq!(issues.len(), 2, "{issues:?}");
    assert_eq!(issues[0], format!("{} [1] question uses true/false", bad.display()));
    assert_eq!(issues[1], format!("[missing] {} not found", missing.display()));
}

#[test]
fn lint_rejects_non_array_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("object.json");
    fs::write(&path, r#"{ "story": "hi" }"#).expect("write");

    let err = lint_paths(&[path]).unwrap_err();
    assert!(err.to_string().contains("expected JSON array"), "{err}");
}

#[test]
fn sql_inputs_round_through_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let topics = dir.path().join("topics.json");
    let levels = dir.path().join("levels.json");
    let lessons = dir.path().join("lessons.json");
    fs::write(
        &topics,
        r#"[{
            "title": "Thank You: Arigatou",
            "description": "Say Arigatou",
            "intro": "After dinner, Ben says **Arigatou**.",
            "question": "What does Arigatou mean?",
            "options": [
                { "id": "1", "text": "Thank you", "is_correct": true },
                { "id": "2", "text": "Goodbye", "is_correct": false }
            ]
        }]"#,
    )
    .expect("write topics");
    fs::write(&levels, r#"["level-a"]"#).expect("write levels");
    fs::write(&lessons, r#"["lesson-a"]"#).expect("write lessons");

    let (topics, level_ids, lesson_ids) = load_inputs(&topics, &levels, &lessons).expect("load");
    let sql = generate_update_sql(&topics, &level_ids, &lesson_ids).expect("generate");

    assert!(sql.contains("UPDATE public.lessons SET title = 'Thank You: Arigatou' WHERE id = 'lesson-a';"));
    assert_eq!(sql.lines().count(), 7);
}
