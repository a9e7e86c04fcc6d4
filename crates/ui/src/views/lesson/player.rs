use std::time::Duration;

use dioxus::prelude::*;
use dioxus_router::{Navigator, use_navigator};
use lesson_core::engine::{Advance, LessonEngine};
use lesson_core::leveling::Difficulty;
use lesson_core::model::{Activity, ChildId, LessonId};
use lesson_core::player::{LessonRun, RunEvent};
use lesson_core::widgets::ActivityWidget;
use services::CompletionSummary;
use tracing::{info, warn};

use crate::context::AppContext;
use crate::routes::Route;
use crate::views::{ViewError, ViewState, view_state_from_resource};
use crate::vm::{PlayerIntent, choice_key_from_char, difficulty_card_label, progress_style, step_label};

use super::activities::{
    CardStackPanel, ChoicePanel, FeedbackBanner, InfoSlidePanel, MapPanel, UnsupportedPanel,
};
use super::completion::CompletionScreen;

#[cfg(test)]
use std::cell::RefCell;
#[cfg(test)]
use std::rc::Rc;

#[derive(Clone, Debug, PartialEq)]
struct LessonData {
    title: String,
    activities: Vec<Activity>,
}

/// The mounted run plus the question count the completion call needs.
pub(super) struct ActiveRun {
    pub(super) run: LessonRun,
    pub(super) question_count: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    Picking,
    Playing,
    Empty,
    Finishing,
    Finished,
}

#[component]
pub fn LessonView(child_id: String, lesson_id: String) -> Element {
    let ctx = use_context::<AppContext>();
    let navigator = use_navigator();
    let lessons = ctx.lessons();
    let clock = ctx.clock();
    let child_id = ChildId::new(child_id);
    let lesson_id = LessonId::new(lesson_id);

    let active = use_signal(|| None::<ActiveRun>);
    let picked = use_signal(|| Difficulty::Easy);
    let stage = use_signal(|| Stage::Picking);
    let summary = use_signal(|| None::<CompletionSummary>);
    let mut tick = use_signal(|| 0_u64);

    let resource = {
        let lessons = lessons.clone();
        let lesson_id = lesson_id.clone();
        use_resource(move || {
            let lessons = lessons.clone();
            let lesson_id = lesson_id.clone();
            async move {
                let title = match lessons.load_lesson(&lesson_id).await {
                    Ok(lesson) => lesson.title,
                    Err(err) => {
                        warn!(lesson_id = %lesson_id, error = %err, "failed to load lesson");
                        "Lesson".to_string()
                    }
                };
                let activities = lessons.load_activities(&lesson_id).await;
                Ok::<_, ViewError>(LessonData { title, activities })
            }
        })
    };
    let state = view_state_from_resource(resource);

    // Re-renders once a second so the stuck hint can appear.
    use_future(move || async move {
        loop {
            tokio::time::sleep(Duration::from_secs(1)).await;
            tick += 1;
        }
    });

    use_drop({
        let speech = ctx.speech();
        move || speech.stop()
    });

    let dispatch = {
        let lessons = lessons.clone();
        let speech = ctx.speech();
        use_callback(move |intent: PlayerIntent| {
            let mut active = active;
            let mut picked = picked;
            let mut stage = stage;
            let mut summary = summary;

            let event = match intent {
                PlayerIntent::ChooseDifficulty(difficulty) => {
                    let activities = resource
                        .value()
                        .read()
                        .as_ref()
                        .and_then(|value| value.as_ref().ok())
                        .map(|data| data.activities.clone())
                        .unwrap_or_default();
                    let plan = lessons.plan(&activities, difficulty, &lessons.new_nonce());
                    let engine = LessonEngine::with_clock(plan.activities, clock).map(|engine| {
                        engine.on_complete(|outcome| {
                            info!(score = outcome.score, correct = outcome.correct_count, "lesson run finished");
                        })
                    });
                    match engine {
                        Ok(engine) => {
                            picked.set(difficulty);
                            active.set(Some(ActiveRun {
                                run: LessonRun::new(engine),
                                question_count: plan.question_count,
                            }));
                            stage.set(Stage::Playing);
                        }
                        Err(err) => {
                            warn!(error = %err, "lesson plan is empty");
                            active.set(None);
                            stage.set(Stage::Empty);
                        }
                    }
                    return;
                }
                PlayerIntent::Restart => {
                    speech.stop();
                    active.set(None);
                    summary.set(None);
                    stage.set(Stage::Picking);
                    return;
                }
                intent => {
                    let mut guard = active.write();
                    let Some(current) = guard.as_mut() else {
                        return;
                    };
                    drive_run(&mut current.run, intent)
                }
            };

            match event {
                RunEvent::Advanced(Advance::Moved { .. }) => speech.stop(),
                RunEvent::Advanced(Advance::Completed(outcome)) => {
                    speech.stop();
                    let difficulty = picked();
                    let question_count = active.read().as_ref().map_or(0, |current| current.question_count);
                    stage.set(Stage::Finishing);
                    let lessons = lessons.clone();
                    let child_id = child_id.clone();
                    let lesson_id = lesson_id.clone();
                    spawn(async move {
                        let finished = lessons
                            .complete_lesson(&child_id, &lesson_id, difficulty, question_count, &outcome)
                            .await;
                        summary.set(Some(finished));
                        stage.set(Stage::Finished);
                    });
                }
                _ => {}
            }
        })
    };

    #[cfg(test)]
    {
        let mut registered = use_signal(|| false);
        if !registered() {
            registered.set(true);
            if let Some(handles) = try_consume_context::<PlayerTestHandles>() {
                handles.register(dispatch);
            }
        }
    }

    let on_key = move |evt: KeyboardEvent| handle_run_key(&evt, active, dispatch, navigator);

    let tick_now = tick();
    let stage_now = stage();
    let title = match &state {
        ViewState::Ready(data) => data.title.clone(),
        _ => "Lesson".to_string(),
    };

    rsx! {
        div { class: "page lesson", id: "lesson-root", tabindex: "0", onkeydown: on_key,
            header { class: "lesson-header",
                button {
                    class: "btn link",
                    r#type: "button",
                    onclick: move |_| {
                        navigator.push(Route::Dashboard {});
                    },
                    "← Back"
                }
                h2 { "{title}" }
            }
            match state {
                ViewState::Idle | ViewState::Loading => rsx! {
                    p { "Loading..." }
                },
                ViewState::Error(_) => rsx! {
                    p { "{ViewError::message()}" }
                },
                ViewState::Ready(data) if data.activities.is_empty() => rsx! {
                    p { class: "empty", "No activities found." }
                },
                ViewState::Ready(_) => match stage_now {
                    Stage::Picking => rsx! {
                        DifficultyPicker { dispatch }
                    },
                    Stage::Empty => rsx! {
                        p { class: "empty", "No activities found." }
                    },
                    Stage::Finishing => rsx! {
                        p { "Saving your progress..." }
                    },
                    Stage::Finished => match summary() {
                        Some(summary) => rsx! {
                            CompletionScreen {
                                summary,
                                on_retry: move |()| dispatch.call(PlayerIntent::Restart),
                                on_exit: move |()| {
                                    navigator.push(Route::Dashboard {});
                                },
                            }
                        },
                        None => rsx! {
                            p { "Saving your progress..." }
                        },
                    },
                    Stage::Playing => rsx! {
                        RunPanel { active, dispatch, tick: tick_now }
                    },
                },
            }
        }
    }
}

/// Enter submits or continues, digits and letters pick choices, Escape leaves.
pub(super) fn handle_run_key(
    evt: &KeyboardEvent,
    active: Signal<Option<ActiveRun>>,
    dispatch: Callback<PlayerIntent>,
    navigator: Navigator,
) {
    let on_choice = active
        .read()
        .as_ref()
        .is_some_and(|current| matches!(current.run.widget(), ActivityWidget::Choice(_)));
    match evt.data.key() {
        Key::Enter => {
            evt.prevent_default();
            dispatch.call(PlayerIntent::Primary);
        }
        Key::Character(value) if on_choice => {
            if let Some(key) = choice_key_from_char(&value) {
                dispatch.call(PlayerIntent::Key(key));
            }
        }
        Key::Escape => {
            navigator.push(Route::Dashboard {});
        }
        _ => {}
    }
}

/// Routes an in-run intent to the mounted run. Picking and restarting
/// belong to the view.
pub(super) fn drive_run(run: &mut LessonRun, intent: PlayerIntent) -> RunEvent {
    match intent {
        PlayerIntent::Select(option_id) => run.select_option(&option_id),
        PlayerIntent::Key(key) => run.choice_key(key),
        PlayerIntent::MoveCard { index, direction } => run.move_card(index, direction),
        PlayerIntent::BeginDrag(index) => {
            run.begin_drag(index);
            RunEvent::Ignored
        }
        PlayerIntent::DropCard(index) => run.drop_card(index),
        PlayerIntent::Primary => run.primary_action(),
        PlayerIntent::Skip => run.advance(),
        PlayerIntent::Hint => {
            let _ = run.request_hint();
            RunEvent::Ignored
        }
        PlayerIntent::ChooseDifficulty(_) | PlayerIntent::Restart => RunEvent::Ignored,
    }
}

#[component]
fn DifficultyPicker(dispatch: Callback<PlayerIntent>) -> Element {
    rsx! {
        section { class: "difficulty-picker",
            h2 { "Choose Your Challenge Level!" }
            div { class: "difficulty-options",
                for difficulty in Difficulty::ALL {
                    button {
                        key: "{difficulty}",
                        id: "difficulty-{difficulty}",
                        class: "difficulty difficulty-{difficulty}",
                        r#type: "button",
                        onclick: move |_| dispatch.call(PlayerIntent::ChooseDifficulty(difficulty)),
                        span { class: "difficulty-label", "{difficulty.label()}" }
                        span { class: "difficulty-tagline", "{difficulty.tagline()}" }
                        span { class: "difficulty-count", "{difficulty_card_label(difficulty)}" }
                    }
                }
            }
        }
    }
}

/// `tick` only forces a re-render so a due hint shows up.
#[component]
pub(super) fn RunPanel(active: Signal<Option<ActiveRun>>, dispatch: Callback<PlayerIntent>, tick: u64) -> Element {
    let _ = tick;
    let guard = active.read();
    let Some(current) = guard.as_ref() else {
        return rsx! {};
    };
    let run = &current.run;
    let engine = run.engine();
    let activity = run.current().clone();
    let widget = run.widget().clone();
    let feedback = run.feedback();
    let hint = run.visible_hint();
    let offer_hint = hint.is_none() && engine.hint_due();
    let primary_label = engine.primary_action_label();
    let primary_enabled = engine.phase().is_enabled();
    let progress = progress_style(run);
    let step = step_label(run);
    let score = engine.score();
    let streak = engine.streak();
    let show_streak = run.show_streak_banner();
    let is_unsupported = matches!(widget, ActivityWidget::Unsupported { .. });
    let unsupported_message = widget.unsupported_message().unwrap_or_default();
    drop(guard);

    rsx! {
        div { class: "lesson-run",
            div { class: "lesson-progress",
                div { class: "bar",
                    div { class: "bar-fill", style: "{progress}" }
                }
                span { class: "lesson-step", "{step}" }
                span { class: "lesson-score", "Score: {score}" }
            }
            if show_streak {
                div { class: "streak-banner", "🔥 {streak} in a row!" }
            }
            div { key: "{activity.id}", class: "activity-frame",
                match widget {
                    ActivityWidget::InfoSlide { .. } => rsx! {
                        InfoSlidePanel { activity: activity.clone() }
                    },
                    ActivityWidget::Choice(widget) => rsx! {
                        ChoicePanel { activity: activity.clone(), widget, dispatch }
                    },
                    ActivityWidget::MapClick(widget) => rsx! {
                        MapPanel { activity: activity.clone(), widget, dispatch }
                    },
                    ActivityWidget::CardReorder(widget) => rsx! {
                        CardStackPanel { activity: activity.clone(), widget, dispatch }
                    },
                    ActivityWidget::Unsupported { .. } => rsx! {
                        UnsupportedPanel { message: unsupported_message.clone(), dispatch }
                    },
                }
            }
            if let Some(feedback) = feedback {
                FeedbackBanner { feedback }
            }
            if let Some(hint) = hint {
                p { class: "hint", role: "note", "💡 {hint}" }
            }
            footer { class: "lesson-footer",
                if offer_hint {
                    button {
                        id: "lesson-hint",
                        class: "btn link",
                        r#type: "button",
                        onclick: move |_| dispatch.call(PlayerIntent::Hint),
                        "Need a hint?"
                    }
                }
                if !is_unsupported {
                    button {
                        id: "lesson-primary",
                        class: "btn primary",
                        r#type: "button",
                        aria_disabled: !primary_enabled,
                        onclick: move |_| dispatch.call(PlayerIntent::Primary),
                        "{primary_label}"
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct PlayerTestHandles {
    dispatch: Rc<RefCell<Option<Callback<PlayerIntent>>>>,
}

#[cfg(test)]
impl PlayerTestHandles {
    pub(crate) fn register(&self, dispatch: Callback<PlayerIntent>) {
        *self.dispatch.borrow_mut() = Some(dispatch);
    }

    pub(crate) fn dispatch(&self) -> Callback<PlayerIntent> {
        (*self.dispatch.borrow()).expect("player dispatch registered")
    }
}
