use std::time::Duration;

use dioxus::prelude::*;
use dioxus_router::use_navigator;
use lesson_core::engine::{Advance, LessonEngine};
use lesson_core::model::{ChildId, SkillId};
use lesson_core::player::{LessonRun, RunEvent};
use services::CompletionSummary;
use tracing::warn;

use crate::context::AppContext;
use crate::routes::Route;
use crate::views::{ViewError, ViewState, view_state_from_resource};
use crate::vm::PlayerIntent;

use super::completion::CompletionScreen;
use super::player::{ActiveRun, RunPanel, drive_run, handle_run_key};

#[cfg(test)]
use super::player::PlayerTestHandles;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PracticeStage {
    Playing,
    Finishing,
    Finished,
}

/// Practice on the child's weakest skills.
#[component]
pub fn PracticeView(child_id: String) -> Element {
    rsx! {
        PracticePlayer { child_id, skill_id: None }
    }
}

/// Practice on one chosen skill.
#[component]
pub fn SkillPracticeView(child_id: String, skill_id: String) -> Element {
    rsx! {
        PracticePlayer { child_id, skill_id: Some(skill_id) }
    }
}

#[component]
fn PracticePlayer(child_id: String, skill_id: Option<String>) -> Element {
    let ctx = use_context::<AppContext>();
    let navigator = use_navigator();
    let lessons = ctx.lessons();
    let clock = ctx.clock();
    let child_id = ChildId::new(child_id);
    let skill_id = skill_id.map(SkillId::new);

    let active = use_signal(|| None::<ActiveRun>);
    let stage = use_signal(|| PracticeStage::Playing);
    let summary = use_signal(|| None::<CompletionSummary>);
    let session = use_signal(|| 0_u32);
    let mut tick = use_signal(|| 0_u64);

    // Plans a session and mounts its run. Bumping `session` plans a new one.
    let resource = {
        let lessons = lessons.clone();
        let child_id = child_id.clone();
        use_resource(move || {
            let _ = session();
            let lessons = lessons.clone();
            let child_id = child_id.clone();
            let skill_id = skill_id.clone();
            let mut active = active;
            let mut stage = stage;
            let mut summary = summary;
            async move {
                let planned = lessons
                    .practice_plan(&child_id, skill_id.as_ref(), &lessons.new_nonce())
                    .await
                    .map_err(|err| {
                        warn!(child_id = %child_id, error = %err, "failed to plan practice");
                        ViewError::Unknown
                    })?;
                let question_count = planned.plan.question_count;
                match LessonEngine::with_clock(planned.plan.activities, clock) {
                    Ok(engine) => active.set(Some(ActiveRun {
                        run: LessonRun::new(engine),
                        question_count,
                    })),
                    Err(err) => {
                        warn!(child_id = %child_id, error = %err, "practice plan is empty");
                        active.set(None);
                    }
                }
                summary.set(None);
                stage.set(PracticeStage::Playing);
                Ok::<_, ViewError>(question_count)
            }
        })
    };
    let state = view_state_from_resource(resource);

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
        let speech = ctx.speech();
        use_callback(move |intent: PlayerIntent| {
            let mut stage = stage;
            let mut summary = summary;
            let mut session = session;

            let event = match intent {
                PlayerIntent::Restart => {
                    speech.stop();
                    session += 1;
                    return;
                }
                PlayerIntent::ChooseDifficulty(_) => return,
                intent => {
                    let mut active = active;
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
                    let question_count = active.read().as_ref().map_or(0, |current| current.question_count);
                    stage.set(PracticeStage::Finishing);
                    let lessons = lessons.clone();
                    let child_id = child_id.clone();
                    spawn(async move {
                        let finished = lessons
                            .complete_practice(&child_id, question_count, &outcome)
                            .await;
                        summary.set(Some(finished));
                        stage.set(PracticeStage::Finished);
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

    rsx! {
        div { class: "page lesson practice", id: "practice-root", tabindex: "0", onkeydown: on_key,
            header { class: "lesson-header",
                button {
                    class: "btn link",
                    r#type: "button",
                    onclick: move |_| {
                        navigator.push(Route::Dashboard {});
                    },
                    "← Back"
                }
                h2 { "Skill Practice" }
            }
            match state {
                ViewState::Idle | ViewState::Loading => rsx! {
                    p { class: "loading", "Generating Practice Session..." }
                },
                ViewState::Error(_) => rsx! {
                    p { "{ViewError::message()}" }
                },
                ViewState::Ready(0) => rsx! {
                    section { class: "empty practice-empty",
                        h2 { "No practice activities found!" }
                        p { "We couldn't find enough content for these skills yet." }
                        button {
                            class: "btn primary",
                            r#type: "button",
                            onclick: move |_| {
                                navigator.push(Route::Dashboard {});
                            },
                            "Back to Dashboard"
                        }
                    }
                },
                ViewState::Ready(_) => match stage_now {
                    PracticeStage::Playing => rsx! {
                        RunPanel { active, dispatch, tick: tick_now }
                    },
                    PracticeStage::Finishing => rsx! {
                        p { "Saving your progress..." }
                    },
                    PracticeStage::Finished => match summary() {
                        Some(summary) => rsx! {
                            CompletionScreen {
                                summary,
                                practice: true,
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
                },
            }
        }
    }
}
