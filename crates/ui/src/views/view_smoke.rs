use lesson_core::leveling::{Difficulty, PRACTICE_XP};
use lesson_core::model::{Activity, ActivityKind, LessonId, OptionId};
use lesson_core::time::fixed_now;
use storage::repository::{CompletionRecord, CompletionRepository};

use super::test_harness::{LESSON_ID, ViewKind, question, setup_view_harness};
use crate::vm::PlayerIntent;

#[tokio::test(flavor = "current_thread")]
async fn dashboard_renders_child_and_missions() {
    let mut harness = setup_view_harness(ViewKind::Dashboard, vec![question("q1", 1)]).await;

    harness.rebuild();
    harness.drive_async().await;
    let html = harness.render();

    assert!(html.contains("Explorers"), "missing heading in {html}");
    assert!(html.contains("Mika"), "missing child in {html}");
    assert!(html.contains("Grades 3-5"), "missing grade label in {html}");
    assert!(html.contains("Japan Basics"), "missing lesson in {html}");
    assert!(html.contains("Play"), "missing play link in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn dashboard_marks_completed_lessons_and_offers_practice() {
    let mut harness = setup_view_harness(ViewKind::Dashboard, vec![question("q1", 1)]).await;
    harness
        .repo
        .record_completion(&CompletionRecord {
            child_id: harness.child_id.clone(),
            lesson_id: LessonId::new(LESSON_ID),
            completed_at: fixed_now(),
            score: 100,
            xp_earned: 150,
        })
        .await
        .expect("record completion");

    harness.rebuild();
    harness.drive_async().await;
    let html = harness.render();

    assert!(html.contains("More Missions"), "missing group heading in {html}");
    assert!(html.contains("1/1 completed"), "missing group progress in {html}");
    assert!(html.contains("lesson-done"), "missing completed marker in {html}");
    assert!(html.contains("Replay"), "missing replay link in {html}");
    assert!(html.contains("Practice Hard Skills"), "missing practice link in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn lesson_opens_on_difficulty_picker() {
    let mut harness = setup_view_harness(ViewKind::Lesson, vec![question("q1", 1)]).await;

    harness.rebuild();
    harness.drive_async().await;
    let html = harness.render();

    assert!(html.contains("Choose Your Challenge Level!"), "missing picker in {html}");
    assert!(html.contains("Rookie"), "missing easy card in {html}");
    assert!(html.contains("30 Questions"), "missing hard count in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn lesson_without_activities_says_so() {
    let mut harness = setup_view_harness(ViewKind::Lesson, Vec::new()).await;

    harness.rebuild();
    harness.drive_async().await;
    let html = harness.render();

    assert!(html.contains("No activities found."), "missing empty copy in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn lesson_answers_then_completes_and_grants_xp() {
    let activities = vec![
        Activity::info("intro", "Konnichiwa", "Welcome to **Japan**.").with_order_index(0),
        question("q1", 1),
    ];
    let mut harness = setup_view_harness(ViewKind::Lesson, activities).await;
    harness.rebuild();
    harness.drive_async().await;

    harness.dispatch(PlayerIntent::ChooseDifficulty(Difficulty::Easy));
    let html = harness.render();
    assert!(html.contains("Konnichiwa"), "missing info slide in {html}");
    assert!(html.contains("<strong>Japan</strong>"), "markdown not rendered in {html}");
    assert!(html.contains("1 / 2"), "missing step label in {html}");

    harness.dispatch(PlayerIntent::Primary);
    let html = harness.render();
    assert!(html.contains("Question q1"), "missing question in {html}");
    assert!(html.contains("Tokyo"), "missing option in {html}");

    harness.dispatch(PlayerIntent::Select(OptionId::new("right")));
    harness.dispatch(PlayerIntent::Primary);
    let html = harness.render();
    assert!(html.contains("Tokyo is the capital."), "missing feedback in {html}");
    assert!(html.contains("Score: 10"), "missing score in {html}");

    harness.dispatch(PlayerIntent::Primary);
    harness.drive_async().await;
    let html = harness.render();
    assert!(html.contains("Mission Complete!"), "missing completion in {html}");
    assert!(html.contains("Return to Base"), "missing exit button in {html}");

    let completions = harness.repo.completions().expect("completions");
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0].child_id, harness.child_id);
    assert!(completions[0].xp_earned > 0);
    assert!(harness.speech.events().is_empty());
}

#[tokio::test(flavor = "current_thread")]
async fn restart_returns_to_picker() {
    let mut harness = setup_view_harness(ViewKind::Lesson, vec![question("q1", 1)]).await;
    harness.rebuild();
    harness.drive_async().await;

    harness.dispatch(PlayerIntent::ChooseDifficulty(Difficulty::Medium));
    assert!(harness.render().contains("Question q1"));

    harness.dispatch(PlayerIntent::Restart);
    let html = harness.render();
    assert!(html.contains("Choose Your Challenge Level!"), "missing picker in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn onboarding_shows_first_step_until_done() {
    let mut harness = setup_view_harness(ViewKind::Onboarding, Vec::new()).await;

    harness.rebuild();
    harness.drive_async().await;
    let html = harness.render();

    assert!(html.contains("Welcome to TripLearn!"), "missing first step in {html}");
    assert!(html.contains("Skip"), "missing skip in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn content_admin_lists_activities_with_issues() {
    let broken =
        Activity::question("q2", ActivityKind::MultipleChoice, "Pick one", Vec::new()).with_order_index(2);
    let mut harness =
        setup_view_harness(ViewKind::ContentAdmin, vec![question("q1", 1), broken]).await;

    harness.rebuild();
    harness.drive_async().await;
    let html = harness.render();

    assert!(html.contains("Question q1"), "missing row in {html}");
    assert!(html.contains("Pick one"), "missing broken row in {html}");
    assert!(html.contains("has-issues"), "missing lint marker in {html}");
    assert!(html.contains("New activity"), "missing editor in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn completion_is_recorded_once_per_lesson() {
    let mut harness = setup_view_harness(ViewKind::Lesson, vec![question("q1", 1)]).await;
    harness.rebuild();
    harness.drive_async().await;

    for _ in 0..2 {
        harness.dispatch(PlayerIntent::ChooseDifficulty(Difficulty::Easy));
        harness.dispatch(PlayerIntent::Select(OptionId::new("wrong")));
        harness.dispatch(PlayerIntent::Primary);
        harness.dispatch(PlayerIntent::Primary);
        harness.drive_async().await;
        assert!(harness.render().contains("Mission Complete!"));
        harness.dispatch(PlayerIntent::Restart);
    }

    let completions = harness.repo.completions().expect("completions");
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0].score, 0);
    let stored = harness
        .repo
        .grant_xp(&harness.child_id, 0)
        .await
        .expect("child exists");
    assert!(stored > 0, "participation xp should accumulate");
}

#[tokio::test(flavor = "current_thread")]
async fn practice_plays_linked_questions_for_flat_xp() {
    let activities = vec![
        Activity::info("intro", "Konnichiwa", "Welcome.").with_order_index(0),
        question("q1", 1),
    ];
    let mut harness = setup_view_harness(ViewKind::Practice, activities).await;
    harness.rebuild();
    harness.drive_async().await;

    let html = harness.render();
    assert!(html.contains("Skill Practice"), "missing header in {html}");
    assert!(html.contains("Question q1"), "info slides should be left out in {html}");

    harness.dispatch(PlayerIntent::Select(OptionId::new("right")));
    harness.dispatch(PlayerIntent::Primary);
    harness.dispatch(PlayerIntent::Primary);
    harness.drive_async().await;
    let html = harness.render();
    assert!(html.contains("Practice Complete!"), "missing completion in {html}");

    assert!(harness.repo.completions().expect("completions").is_empty());
    let total = harness
        .repo
        .grant_xp(&harness.child_id, 0)
        .await
        .expect("child exists");
    assert_eq!(total, u64::from(PRACTICE_XP));
}

#[tokio::test(flavor = "current_thread")]
async fn practice_without_questions_offers_the_way_back() {
    let activities = vec![Activity::info("intro", "Konnichiwa", "Welcome.")];
    let mut harness = setup_view_harness(ViewKind::Practice, activities).await;

    harness.rebuild();
    harness.drive_async().await;
    let html = harness.render();

    assert!(html.contains("No practice activities found!"), "missing empty copy in {html}");
    assert!(html.contains("Back to Dashboard"), "missing exit in {html}");
}
