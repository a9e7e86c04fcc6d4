use dioxus::prelude::*;
use dioxus_router::Link;
use lesson_core::model::{ActivityId, LessonId};
use tracing::warn;

use crate::context::AppContext;
use crate::routes::Route;
use crate::views::{ViewError, ViewState, view_state_from_resource};
use crate::vm::{
    ActivityForm, ActivityRowVm, EDITABLE_KINDS, LessonRowVm, map_activity_rows, map_lesson_rows,
};

#[component]
pub fn AdminLessonsView() -> Element {
    let ctx = use_context::<AppContext>();
    let dashboard = ctx.dashboard();

    let resource = use_resource(move || {
        let dashboard = dashboard.clone();
        async move {
            let lessons = dashboard
                .list_lessons(None)
                .await
                .map_err(|_| ViewError::Unknown)?;
            Ok::<_, ViewError>(map_lesson_rows(&lessons))
        }
    });
    let state: ViewState<Vec<LessonRowVm>> = view_state_from_resource(resource);

    rsx! {
        div { class: "page admin",
            h2 { "Content" }
            match state {
                ViewState::Idle | ViewState::Loading => rsx! {
                    p { "Loading..." }
                },
                ViewState::Error(_) => rsx! {
                    p { "{ViewError::message()}" }
                },
                ViewState::Ready(lessons) => rsx! {
                    if lessons.is_empty() {
                        p { class: "empty", "No lessons yet." }
                    }
                    ul { class: "admin-lessons",
                        for lesson in lessons {
                            li { key: "{lesson.id}",
                                Link {
                                    to: Route::ContentAdmin { lesson_id: lesson.id.clone() },
                                    "{lesson.title}"
                                }
                            }
                        }
                    }
                },
            }
        }
    }
}

/// Activity table and editor for one lesson.
#[component]
pub fn ContentAdminView(lesson_id: String) -> Element {
    let ctx = use_context::<AppContext>();
    let content_admin = ctx.content_admin();
    let mut form = use_signal(ActivityForm::blank);
    let mut error = use_signal(|| None::<String>);
    let mut saving = use_signal(|| false);

    let mut resource = {
        let content_admin = content_admin.clone();
        let lesson_id = lesson_id.clone();
        use_resource(move || {
            let content_admin = content_admin.clone();
            let lesson_id = LessonId::new(lesson_id.clone());
            async move {
                content_admin
                    .list(&lesson_id)
                    .await
                    .map_err(|_| ViewError::Unknown)
            }
        })
    };

    let activities = match &*resource.value().read() {
        Some(Ok(activities)) => activities.clone(),
        _ => Vec::new(),
    };
    let state = view_state_from_resource(resource).map(|_| map_activity_rows(&activities));

    let on_save = {
        let content_admin = content_admin.clone();
        let lesson_id = LessonId::new(lesson_id.clone());
        move |evt: FormEvent| {
            evt.prevent_default();
            if saving() {
                return;
            }
            let activity = match form.read().to_activity() {
                Ok(activity) => activity,
                Err(message) => {
                    error.set(Some(message));
                    return;
                }
            };
            let content_admin = content_admin.clone();
            let lesson_id = lesson_id.clone();
            saving.set(true);
            spawn(async move {
                match content_admin.save(&lesson_id, activity).await {
                    Ok(_) => {
                        error.set(None);
                        form.set(ActivityForm::blank());
                        resource.restart();
                    }
                    Err(err) => error.set(Some(err.to_string())),
                }
                saving.set(false);
            });
        }
    };

    let on_delete = use_callback(move |activity_id: String| {
        let content_admin = content_admin.clone();
        spawn(async move {
            match content_admin.delete(&ActivityId::new(activity_id)).await {
                Ok(()) => resource.restart(),
                Err(err) => {
                    warn!(error = %err, "failed to delete activity");
                    error.set(Some(err.to_string()));
                }
            }
        });
    });

    let on_edit = use_callback(move |activity_id: String| {
        let found = resource.value().read().as_ref().and_then(|result| {
            result.as_ref().ok().and_then(|activities| {
                activities
                    .iter()
                    .find(|activity| activity.id.as_str() == activity_id)
                    .map(ActivityForm::from_activity)
            })
        });
        if let Some(found) = found {
            error.set(None);
            form.set(found);
        }
    });

    let editing = !form.read().id.is_empty();

    rsx! {
        div { class: "page admin",
            Link { to: Route::AdminLessons {}, "← Lessons" }
            h2 { "Activities" }
            match state {
                ViewState::Idle | ViewState::Loading => rsx! {
                    p { "Loading..." }
                },
                ViewState::Error(_) => rsx! {
                    p { "{ViewError::message()}" }
                },
                ViewState::Ready(rows) => rsx! {
                    if rows.is_empty() {
                        p { class: "empty", "No activities yet." }
                    }
                    table { class: "activity-table",
                        tbody {
                            for row in rows {
                                ActivityRow {
                                    key: "{row.id}",
                                    row: row.clone(),
                                    on_edit,
                                    on_delete,
                                }
                            }
                        }
                    }
                },
            }
            form { class: "activity-form", onsubmit: on_save,
                h3 { if editing { "Edit activity" } else { "New activity" } }
                label {
                    "Type"
                    select {
                        id: "activity-kind",
                        onchange: move |evt| form.write().kind = evt.value(),
                        for kind in EDITABLE_KINDS {
                            option {
                                key: "{kind}",
                                value: "{kind}",
                                selected: form.read().kind == kind,
                                "{kind}"
                            }
                        }
                    }
                }
                label {
                    "Question"
                    input {
                        id: "activity-question",
                        r#type: "text",
                        value: "{form.read().question_text}",
                        oninput: move |evt| form.write().question_text = evt.value(),
                    }
                }
                label {
                    "Content (markdown)"
                    textarea {
                        id: "activity-content",
                        value: "{form.read().content}",
                        oninput: move |evt| form.write().content = evt.value(),
                    }
                }
                label {
                    "Image URL"
                    input {
                        id: "activity-media",
                        r#type: "url",
                        value: "{form.read().media_url}",
                        oninput: move |evt| form.write().media_url = evt.value(),
                    }
                }
                label {
                    "Options"
                    textarea {
                        id: "activity-options",
                        placeholder: "*Correct answer | why\nOther answer",
                        value: "{form.read().options}",
                        oninput: move |evt| form.write().options = evt.value(),
                    }
                }
                div { class: "form-row",
                    label {
                        "Order"
                        input {
                            id: "activity-order",
                            r#type: "number",
                            value: "{form.read().order_index}",
                            oninput: move |evt| form.write().order_index = evt.value(),
                        }
                    }
                    label {
                        "Difficulty"
                        input {
                            id: "activity-difficulty",
                            r#type: "number",
                            min: "1",
                            max: "3",
                            value: "{form.read().difficulty}",
                            oninput: move |evt| form.write().difficulty = evt.value(),
                        }
                    }
                }
                if let Some(message) = error() {
                    p { class: "form-error", role: "alert", "{message}" }
                }
                div { class: "form-actions",
                    if editing {
                        button {
                            class: "btn secondary",
                            r#type: "button",
                            onclick: move |_| {
                                error.set(None);
                                form.set(ActivityForm::blank());
                            },
                            "Cancel"
                        }
                    }
                    button {
                        id: "activity-save",
                        class: "btn primary",
                        r#type: "submit",
                        disabled: saving(),
                        "Save"
                    }
                }
            }
        }
    }
}

#[component]
fn ActivityRow(
    row: ActivityRowVm,
    on_edit: Callback<String>,
    on_delete: Callback<String>,
) -> Element {
    let edit_id = row.id.clone();
    let delete_id = row.id.clone();

    rsx! {
        tr { class: if row.issues.is_empty() { "activity-row" } else { "activity-row has-issues" },
            td { "{row.order_label}" }
            td { code { "{row.kind}" } }
            td {
                "{row.text}"
                if !row.issues.is_empty() {
                    ul { class: "issues",
                        for issue in row.issues.clone() {
                            li { key: "{issue}", "⚠ {issue}" }
                        }
                    }
                }
            }
            td { "{row.option_count} options" }
            td {
                button {
                    class: "btn link",
                    r#type: "button",
                    onclick: move |_| on_edit.call(edit_id.clone()),
                    "Edit"
                }
                button {
                    class: "btn danger",
                    r#type: "button",
                    onclick: move |_| on_delete.call(delete_id.clone()),
                    "Delete"
                }
            }
        }
    }
}
