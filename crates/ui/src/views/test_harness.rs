use std::sync::Arc;

use dioxus::core::NoOpMutations;
use dioxus::prelude::*;
use dioxus_router::{Routable, Router};
use lesson_core::model::{
    Activity, ActivityKind, AgeGroup, ChildId, ChildProfileDraft, ChoiceOption, Lesson, LessonId,
    SkillId,
};
use lesson_core::speech::{RecordingSpeech, SpeechBackend};
use lesson_core::time::fixed_clock;
use services::{AppServices, FamilyContext, LocalAuthClient};
use storage::repository::{ActivityRepository, InMemoryRepository, LessonRepository, Storage};

use crate::context::{UiApp, build_app_context};
use crate::views::lesson::PlayerTestHandles;
use crate::views::{ContentAdminView, DashboardView, LessonView, OnboardingOverlay, PracticeView};

pub const LESSON_ID: &str = "japan-basics";
pub const SKILL_ID: &str = "greetings";

#[derive(Clone)]
struct TestApp {
    services: AppServices,
    family: FamilyContext,
    initial_child: Option<ChildId>,
    speech: Arc<RecordingSpeech>,
}

impl UiApp for TestApp {
    fn services(&self) -> AppServices {
        self.services.clone()
    }

    fn family(&self) -> FamilyContext {
        self.family.clone()
    }

    fn initial_child(&self) -> Option<ChildId> {
        self.initial_child.clone()
    }

    fn speech_backend(&self) -> Arc<dyn SpeechBackend> {
        self.speech.clone()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Dashboard,
    Lesson,
    Practice,
    Onboarding,
    ContentAdmin,
}

#[derive(Props, Clone)]
struct ViewHarnessProps {
    app: Arc<TestApp>,
    view: ViewKind,
    child_id: ChildId,
    player_handles: Option<PlayerTestHandles>,
}

impl PartialEq for ViewHarnessProps {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Eq for ViewHarnessProps {}

#[component]
fn ViewRouterHarness(props: ViewHarnessProps) -> Element {
    let app: Arc<dyn UiApp> = props.app.clone();
    use_context_provider(|| build_app_context(&app));
    use_context_provider(|| props.view);
    use_context_provider(|| props.child_id.clone());
    if let Some(handles) = props.player_handles.clone() {
        use_context_provider(|| handles);
    }
    rsx! { Router::<TestRoute> {} }
}

#[derive(Clone, Routable, PartialEq)]
#[rustfmt::skip]
enum TestRoute {
    #[route("/")]
    Root {},
}

#[component]
fn Root() -> Element {
    let view = use_context::<ViewKind>();
    let child_id = use_context::<ChildId>();
    match view {
        ViewKind::Dashboard => rsx! { DashboardView {} },
        ViewKind::Lesson => rsx! {
            LessonView { child_id: child_id.to_string(), lesson_id: LESSON_ID.to_string() }
        },
        ViewKind::Practice => rsx! { PracticeView { child_id: child_id.to_string() } },
        ViewKind::Onboarding => rsx! { OnboardingOverlay {} },
        ViewKind::ContentAdmin => rsx! { ContentAdminView { lesson_id: LESSON_ID.to_string() } },
    }
}

pub struct ViewHarness {
    pub dom: VirtualDom,
    pub repo: InMemoryRepository,
    pub child_id: ChildId,
    pub speech: Arc<RecordingSpeech>,
    pub player_handles: Option<PlayerTestHandles>,
}

impl ViewHarness {
    pub fn rebuild(&mut self) {
        self.dom.rebuild_in_place();
        drive_dom(&mut self.dom);
    }

    pub async fn drive_async(&mut self) {
        for _ in 0..4 {
            let _ = tokio::time::timeout(
                std::time::Duration::from_millis(50),
                self.dom.wait_for_work(),
            )
            .await;
            self.dom.render_immediate(&mut NoOpMutations);
            self.dom.process_events();
        }
    }

    pub fn render(&self) -> String {
        dioxus_ssr::render(&self.dom)
    }

    /// Routes a player intent through the registered dispatch callback.
    pub fn dispatch(&mut self, intent: crate::vm::PlayerIntent) {
        let dispatch = self
            .player_handles
            .as_ref()
            .expect("player view harness")
            .dispatch();
        self.dom.in_runtime(|| dispatch.call(intent));
        drive_dom(&mut self.dom);
    }
}

pub fn drive_dom(dom: &mut VirtualDom) {
    dom.process_events();
    dom.render_immediate(&mut NoOpMutations);
    dom.process_events();
}

pub fn question(id: &str, order: i32) -> Activity {
    Activity::question(
        id,
        ActivityKind::MultipleChoice,
        format!("Question {id}"),
        vec![
            ChoiceOption::new("right", "Tokyo", true).with_explanation("Tokyo is the capital."),
            ChoiceOption::new("wrong", "Osaka", false),
        ],
    )
    .with_order_index(order)
}

/// Seeds a lesson with `activities` and a child, then mounts `view`.
pub async fn setup_view_harness(view: ViewKind, activities: Vec<Activity>) -> ViewHarness {
    let repo = InMemoryRepository::new();
    let lesson_id = LessonId::new(LESSON_ID);
    repo.upsert_lesson(&Lesson {
        id: lesson_id.clone(),
        level_id: None,
        title: "Japan Basics".into(),
        description: Some("Trains, temples and tea.".into()),
        order_index: 0,
    })
    .await
    .expect("seed lesson");
    repo.link_skill(&lesson_id, &SkillId::new(SKILL_ID))
        .await
        .expect("link skill");
    for activity in activities {
        repo.upsert_activity(&activity.with_lesson(lesson_id.clone()))
            .await
            .expect("seed activity");
    }

    let services = AppServices::from_storage(
        Storage::from_in_memory(repo.clone()),
        Arc::new(LocalAuthClient),
        None,
        fixed_clock(),
    );
    let family = services
        .sign_in("parent@example.com", "pw")
        .await
        .expect("sign in");
    let child = services
        .dashboard()
        .create_child(ChildProfileDraft::new(
            family.family_id.clone(),
            "Mika",
            Some(AgeGroup::ThirdToFifth),
        ))
        .await
        .expect("create child");

    let speech = Arc::new(RecordingSpeech::default());
    let player_handles = match view {
        ViewKind::Lesson | ViewKind::Practice => Some(PlayerTestHandles::default()),
        _ => None,
    };
    let app = Arc::new(TestApp {
        services,
        family,
        initial_child: None,
        speech: Arc::clone(&speech),
    });

    let dom = VirtualDom::new_with_props(
        ViewRouterHarness,
        ViewHarnessProps {
            app,
            view,
            child_id: child.id.clone(),
            player_handles: player_handles.clone(),
        },
    );

    ViewHarness {
        dom,
        repo,
        child_id: child.id,
        speech,
        player_handles,
    }
}
