use chrono::{Duration, Utc};
use lesson_core::model::{
    Activity, ActivityId, ActivityKind, AgeGroup, ChildId, ChildProfileDraft, ChoiceOption,
    Hotspot, Lesson, LessonId, LevelId, ProfileId, SkillId,
};
use lesson_core::time::{fixed_clock, fixed_now};
use storage::repository::{
    ActivityRepository, ChildRepository, CompletionRecord, CompletionRepository, FamilyRepository,
    LessonRepository, MasteryRepository, PreferenceRepository, StorageError,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let repo = SqliteRepository::connect(&format!("sqlite:file:{name}?mode=memory&cache=shared"))
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn lesson(id: &str, level: &str, order: i32) -> Lesson {
    Lesson {
        id: LessonId::new(id),
        level_id: Some(LevelId::new(level)),
        title: format!("Lesson {id}"),
        description: None,
        order_index: order,
    }
}

#[tokio::test]
async fn sqlite_activities_round_trip_in_order() {
    let repo = connect("memdb_activities").await;
    repo.upsert_lesson(&lesson("l1", "lv1", 0)).await.unwrap();

    let map = Activity::question(
        "map",
        ActivityKind::MapClick,
        "Tap Tokyo",
        vec![
            ChoiceOption::new("1", "Tokyo", true).with_hotspot(Hotspot::new(62.0, 48.0)),
            ChoiceOption::new("2", "Osaka", false),
        ],
    )
    .with_lesson(LessonId::new("l1"))
    .with_order_index(2);
    let intro = Activity::info("intro", "Hello", "Welcome")
        .with_lesson(LessonId::new("l1"))
        .with_order_index(1);
    let odd = Activity::new("odd", ActivityKind::from_tag("drag_and_drop"), "Later")
        .with_lesson(LessonId::new("l1"))
        .with_order_index(3);

    repo.upsert_activity(&map).await.unwrap();
    repo.upsert_activity(&intro).await.unwrap();
    repo.upsert_activity(&odd).await.unwrap();

    let loaded = repo.list_activities(&LessonId::new("l1")).await.unwrap();
    let ids: Vec<&str> = loaded.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["intro", "map", "odd"]);
    assert_eq!(loaded[1], map);
    assert_eq!(loaded[2].kind, ActivityKind::Unsupported("drag_and_drop".into()));

    repo.delete_activity(&ActivityId::new("odd")).await.unwrap();
    assert!(matches!(
        repo.delete_activity(&ActivityId::new("odd")).await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn sqlite_lessons_filter_by_level() {
    let repo = connect("memdb_lessons").await;
    repo.upsert_lesson(&lesson("b", "lv1", 2)).await.unwrap();
    repo.upsert_lesson(&lesson("a", "lv1", 1)).await.unwrap();
    repo.upsert_lesson(&lesson("c", "lv2", 0)).await.unwrap();

    let level_one = repo.list_lessons(Some(&LevelId::new("lv1"))).await.unwrap();
    let ids: Vec<&str> = level_one.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(repo.list_lessons(None).await.unwrap().len(), 3);
    assert!(repo.get_lesson(&LessonId::new("zzz")).await.unwrap().is_none());
}

#[tokio::test]
async fn sqlite_resolve_family_is_idempotent() {
    let repo = connect("memdb_family").await;
    let user = ProfileId::new("parent-1");

    let first = repo
        .resolve_family(&user, Some("ana@example.com"), "ana's Family")
        .await
        .unwrap();
    let second = repo.resolve_family(&user, None, "ana's Family").await.unwrap();

    assert_eq!(first.family_id, second.family_id);
    assert_eq!(second.profile.email.as_deref(), Some("ana@example.com"));
}

#[tokio::test]
async fn sqlite_children_completions_and_xp() {
    let repo = connect("memdb_children").await;
    let family = repo
        .resolve_family(&ProfileId::new("parent-2"), None, "My Family")
        .await
        .unwrap()
        .family_id;
    repo.upsert_lesson(&lesson("l1", "lv1", 0)).await.unwrap();

    let draft = ChildProfileDraft::new(family.clone(), "  Mika  ", Some(AgeGroup::ThirdToFifth));
    let child = repo.insert_child(draft.validate().unwrap()).await.unwrap();
    assert_eq!(child.name, "Mika");

    let children = repo.list_children(&family).await.unwrap();
    assert_eq!(children, vec![child.clone()]);

    let record = CompletionRecord {
        child_id: child.id.clone(),
        lesson_id: LessonId::new("l1"),
        completed_at: Utc::now(),
        score: 30,
        xp_earned: 100,
    };
    repo.record_completion(&record).await.unwrap();
    repo.record_completion(&CompletionRecord { score: 40, ..record }).await.unwrap();

    assert_eq!(repo.grant_xp(&child.id, 100).await.unwrap(), 100);
    assert_eq!(repo.grant_xp(&child.id, 200).await.unwrap(), 300);
    assert!(matches!(
        repo.grant_xp(&ChildId::new("ghost"), 5).await,
        Err(StorageError::NotFound)
    ));
    assert!(repo.list_mastery(&child.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn sqlite_child_for_unknown_family_surfaces_backend_message() {
    let repo = connect("memdb_orphan_child").await;
    let draft = ChildProfileDraft::new("no-such-family".into(), "Kai", Some(AgeGroup::SixthToEighth));
    let err = repo.insert_child(draft.validate().unwrap()).await.unwrap_err();
    match err {
        StorageError::Remote { message, .. } => assert!(message.contains("FOREIGN KEY")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn sqlite_preference_flag_persists() {
    let repo = connect("memdb_prefs").await;
    assert_eq!(repo.get_flag("triplearn_onboarding_done").await.unwrap(), None);
    repo.set_flag("triplearn_onboarding_done", true).await.unwrap();
    assert_eq!(
        repo.get_flag("triplearn_onboarding_done").await.unwrap(),
        Some(true)
    );
}

#[tokio::test]
async fn sqlite_completions_list_latest_score_per_lesson() {
    let repo = connect("memdb_completion_list").await;
    let family = repo
        .resolve_family(&ProfileId::new("parent-3"), None, "My Family")
        .await
        .unwrap()
        .family_id;
    let draft = ChildProfileDraft::new(family, "Noa", Some(AgeGroup::KindergartenToSecond));
    let child = repo.insert_child(draft.validate().unwrap()).await.unwrap();

    let first = CompletionRecord {
        child_id: child.id.clone(),
        lesson_id: LessonId::new("l2"),
        completed_at: fixed_now(),
        score: 20,
        xp_earned: 100,
    };
    repo.record_completion(&first).await.unwrap();
    repo.record_completion(&CompletionRecord {
        lesson_id: LessonId::new("l1"),
        completed_at: fixed_now() + Duration::minutes(3),
        ..first.clone()
    })
    .await
    .unwrap();
    repo.record_completion(&CompletionRecord { score: 50, ..first }).await.unwrap();

    let listed = repo.list_completions(&child.id).await.unwrap();
    let lessons: Vec<&str> = listed.iter().map(|c| c.lesson_id.as_str()).collect();
    assert_eq!(lessons, vec!["l2", "l1"]);
    assert_eq!(listed[0].score, 50);
    assert_eq!(listed[0].completed_at, fixed_now());
    assert!(repo.list_completions(&ChildId::new("ghost")).await.unwrap().is_empty());
}

#[tokio::test]
async fn sqlite_skill_links_find_practice_lessons() {
    let repo = connect("memdb_lesson_skills").await;
    for (id, order) in [("l1", 0), ("l2", 1), ("l3", 2)] {
        repo.upsert_lesson(&lesson(id, "lv1", order)).await.unwrap();
    }
    repo.link_skill(&LessonId::new("l2"), &SkillId::new("greetings")).await.unwrap();
    repo.link_skill(&LessonId::new("l1"), &SkillId::new("maps")).await.unwrap();
    repo.link_skill(&LessonId::new("l2"), &SkillId::new("maps")).await.unwrap();
    repo.link_skill(&LessonId::new("l2"), &SkillId::new("maps")).await.unwrap();
    repo.link_skill(&LessonId::new("l3"), &SkillId::new("trains")).await.unwrap();

    let lessons = repo
        .lessons_for_skills(&[SkillId::new("greetings"), SkillId::new("maps")])
        .await
        .unwrap();
    assert_eq!(lessons, vec![LessonId::new("l1"), LessonId::new("l2")]);
    assert_eq!(
        repo.linked_skills(2).await.unwrap(),
        vec![SkillId::new("greetings"), SkillId::new("maps")]
    );
}

#[tokio::test]
async fn sqlite_rows_are_stamped_from_the_injected_clock() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_clocked?mode=memory&cache=shared")
        .await
        .expect("connect")
        .with_clock(fixed_clock());
    repo.migrate().await.expect("migrate");

    let family = repo
        .resolve_family(&ProfileId::new("parent-4"), None, "Clocked Family")
        .await
        .unwrap()
        .family_id;
    let draft = ChildProfileDraft::new(family.clone(), "Ira", Some(AgeGroup::ThirdToFifth));
    repo.insert_child(draft.validate().unwrap()).await.unwrap();

    let pool = repo.pool();
    let stamps: Vec<chrono::DateTime<Utc>> = vec![
        sqlx::query_scalar("SELECT created_at FROM profiles WHERE id = 'parent-4'")
            .fetch_one(pool)
            .await
            .unwrap(),
        sqlx::query_scalar("SELECT created_at FROM families WHERE id = ?1")
            .bind(family.as_str())
            .fetch_one(pool)
            .await
            .unwrap(),
        sqlx::query_scalar("SELECT created_at FROM child_profiles WHERE family_id = ?1")
            .bind(family.as_str())
            .fetch_one(pool)
            .await
            .unwrap(),
        sqlx::query_scalar("SELECT applied_at FROM schema_migrations WHERE version = 2")
            .fetch_one(pool)
            .await
            .unwrap(),
    ];
    assert!(stamps.iter().all(|stamp| *stamp == fixed_now()));
}
