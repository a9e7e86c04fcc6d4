use dioxus::prelude::*;
use dioxus_router::Link;
use lesson_core::model::{AgeGroup, ChildId, ChildProfileDraft};
use services::ChildOverview;
use tracing::warn;

use crate::context::AppContext;
use crate::routes::Route;
use crate::views::{ViewError, ViewState, view_state_from_resource};
use crate::vm::{
    ChildCardVm, LessonGroupVm, MasteryRowVm, grade_label, map_child_card, map_lesson_groups,
    map_mastery_rows,
};

#[derive(Clone, Debug, PartialEq)]
struct DashboardData {
    children: Vec<ChildCardVm>,
}

#[component]
pub fn DashboardView() -> Element {
    let ctx = use_context::<AppContext>();
    let dashboard = ctx.dashboard();
    let family_id = ctx.family_id();
    let mut selected = use_signal(|| ctx.initial_child());

    let mut resource = {
        let dashboard = dashboard.clone();
        use_resource(move || {
            let dashboard = dashboard.clone();
            let family_id = family_id.clone();
            async move {
                let children = dashboard
                    .list_children(&family_id)
                    .await
                    .map_err(|_| ViewError::Unknown)?;
                Ok::<_, ViewError>(DashboardData {
                    children: children.iter().map(map_child_card).collect(),
                })
            }
        })
    };
    let state = view_state_from_resource(resource);

    // Falls back to the first child once the list is known.
    let active_child: Option<ChildCardVm> = match &state {
        ViewState::Ready(data) => {
            let wanted = selected.read().clone();
            wanted
                .and_then(|id| data.children.iter().find(|child| child.id == id.as_str()).cloned())
                .or_else(|| data.children.first().cloned())
        }
        _ => None,
    };

    rsx! {
        div { class: "page dashboard",
            h2 { "Explorers" }
            match state {
                ViewState::Idle | ViewState::Loading => rsx! {
                    p { "Loading..." }
                },
                ViewState::Error(_) => rsx! {
                    p { "{ViewError::message()}" }
                },
                ViewState::Ready(data) => rsx! {
                    if data.children.is_empty() {
                        p { class: "empty", "Add your first explorer to start learning." }
                    }
                    ul { class: "child-list",
                        for child in data.children.clone() {
                            li { key: "{child.id}",
                                button {
                                    class: if active_child.as_ref().is_some_and(|active| active.id == child.id) { "child-card active" } else { "child-card" },
                                    r#type: "button",
                                    onclick: {
                                        let id = child.id.clone();
                                        move |_| selected.set(Some(ChildId::new(id.clone())))
                                    },
                                    span { class: "avatar", "{child.initial}" }
                                    span { class: "child-name", "{child.name}" }
                                    span { class: "child-grade", "{child.grade_label}" }
                                    span { class: "child-level", "{child.level_label} · {child.xp_label}" }
                                    if let Some(streak) = child.streak_label.clone() {
                                        span { class: "child-streak", "🔥 {streak}" }
                                    }
                                }
                            }
                        }
                    }
                    CreateChildForm {
                        on_created: move |child_id: ChildId| {
                            selected.set(Some(child_id));
                            resource.restart();
                        }
                    }
                    if let Some(child) = active_child.clone() {
                        MasteryPanel { key: "{child.id}", child_id: child.id.clone(), child_name: child.name.clone() }
                        LessonList { key: "{child.id}", child_id: child.id.clone() }
                    }
                },
            }
        }
    }
}

#[component]
fn CreateChildForm(on_created: EventHandler<ChildId>) -> Element {
    let ctx = use_context::<AppContext>();
    let dashboard = ctx.dashboard();
    let family_id = ctx.family_id();
    let mut name = use_signal(String::new);
    let mut age_group = use_signal(|| None::<AgeGroup>);
    let mut error = use_signal(|| None::<String>);
    let mut saving = use_signal(|| false);

    let on_submit = move |evt: FormEvent| {
        evt.prevent_default();
        if saving() {
            return;
        }
        let draft = ChildProfileDraft::new(family_id.clone(), name(), age_group());
        let dashboard = dashboard.clone();
        saving.set(true);
        spawn(async move {
            match dashboard.create_child(draft).await {
                Ok(child) => {
                    error.set(None);
                    name.set(String::new());
                    age_group.set(None);
                    on_created.call(child.id);
                }
                // Backend text goes straight to the form.
                Err(err) => error.set(Some(err.to_string())),
            }
            saving.set(false);
        });
    };

    rsx! {
        form { class: "create-child", onsubmit: on_submit,
            h3 { "Add an explorer" }
            label {
                "Name"
                input {
                    id: "child-name",
                    r#type: "text",
                    maxlength: "40",
                    value: "{name}",
                    oninput: move |evt| name.set(evt.value()),
                }
            }
            label {
                "Grade"
                select {
                    id: "child-age-group",
                    onchange: move |evt| age_group.set(evt.value().parse::<AgeGroup>().ok()),
                    option { value: "", selected: age_group().is_none(), "Choose..." }
                    for group in AgeGroup::ALL {
                        option {
                            key: "{group.as_str()}",
                            value: "{group.as_str()}",
                            selected: age_group() == Some(group),
                            "{grade_label(group)}"
                        }
                    }
                }
            }
            if let Some(message) = error() {
                p { class: "form-error", role: "alert", "{message}" }
            }
            button { class: "btn primary", r#type: "submit", disabled: saving(), "Add" }
        }
    }
}

#[component]
fn MasteryPanel(child_id: String, child_name: String) -> Element {
    let ctx = use_context::<AppContext>();
    let dashboard = ctx.dashboard();

    let resource = use_resource({
        let child_id = child_id.clone();
        move || {
            let dashboard = dashboard.clone();
            let child_id = ChildId::new(child_id.clone());
            async move {
                let Some(child) = dashboard
                    .get_child(&child_id)
                    .await
                    .map_err(|_| ViewError::Unknown)?
                else {
                    return Err(ViewError::Unknown);
                };
                let overview: ChildOverview = dashboard
                    .overview(child)
                    .await
                    .map_err(|_| ViewError::Unknown)?;
                Ok::<_, ViewError>((
                    format!("Level {} · {:.0}%", overview.level.level, overview.level.percent),
                    map_mastery_rows(&overview.mastery),
                ))
            }
        }
    });
    let state = view_state_from_resource(resource);

    rsx! {
        section { class: "mastery",
            h3 { "{child_name}'s skills" }
            match state {
                ViewState::Ready((level, rows)) => rsx! {
                    p { class: "mastery-level", "{level}" }
                    if rows.is_empty() {
                        p { class: "empty", "No skills practiced yet." }
                    }
                    for row in rows {
                        MasteryRow { key: "{row.skill_id}", child_id: child_id.clone(), row: row.clone() }
                    }
                },
                ViewState::Error(_) => rsx! {
                    p { class: "empty", "No skills practiced yet." }
                },
                ViewState::Idle | ViewState::Loading => rsx! {
                    p { "Loading..." }
                },
            }
            Link {
                class: "btn secondary practice-link",
                to: Route::Practice { child_id: child_id.clone() },
                "Practice Hard Skills 💪"
            }
        }
    }
}

#[component]
fn MasteryRow(child_id: String, row: MasteryRowVm) -> Element {
    rsx! {
        div { class: "mastery-row",
            span { class: "mastery-name", "{row.skill_name}" }
            div { class: "bar",
                div { class: "bar-fill", style: "{row.bar_style}" }
            }
            span { class: "mastery-percent", "{row.percent_label}" }
            Link {
                class: "btn link",
                to: Route::SkillPractice { child_id: child_id.clone(), skill_id: row.skill_id.clone() },
                "Practice"
            }
        }
    }
}

#[component]
fn LessonList(child_id: String) -> Element {
    let ctx = use_context::<AppContext>();
    let dashboard = ctx.dashboard();

    let resource = use_resource({
        let child_id = child_id.clone();
        move || {
            let dashboard = dashboard.clone();
            let child_id = ChildId::new(child_id.clone());
            async move {
                match dashboard.lesson_map(&child_id).await {
                    Ok(groups) => Ok::<_, ViewError>(map_lesson_groups(&groups)),
                    Err(err) => {
                        warn!(child_id = %child_id, error = %err, "failed to load lessons");
                        Ok(Vec::new())
                    }
                }
            }
        }
    });
    let state = view_state_from_resource(resource);

    rsx! {
        section { class: "lessons",
            h3 { "Missions" }
            match state {
                ViewState::Ready(groups) => rsx! {
                    if groups.is_empty() {
                        p { class: "empty", "No lessons yet." }
                    }
                    for group in groups {
                        LessonGroupSection { key: "{group.key}", child_id: child_id.clone(), group: group.clone() }
                    }
                },
                ViewState::Error(_) => rsx! {
                    p { class: "empty", "No lessons yet." }
                },
                ViewState::Idle | ViewState::Loading => rsx! {
                    p { "Loading..." }
                },
            }
        }
    }
}

#[component]
fn LessonGroupSection(child_id: String, group: LessonGroupVm) -> Element {
    rsx! {
        div { class: "lesson-group",
            div { class: "lesson-group-header",
                h4 { "{group.title}" }
                span { class: "lesson-group-progress", "{group.progress_label}" }
            }
            ul {
                for lesson in group.rows {
                    li {
                        key: "{lesson.id}",
                        class: if lesson.completed { "lesson-row completed" } else { "lesson-row" },
                        div {
                            strong { "{lesson.title}" }
                            if lesson.completed {
                                span { class: "lesson-done", aria_label: "completed", " ✅" }
                            }
                            if let Some(description) = lesson.description.clone() {
                                p { "{description}" }
                            }
                        }
                        Link {
                            class: "btn primary",
                            to: Route::Lesson { child_id: child_id.clone(), lesson_id: lesson.id.clone() },
                            if lesson.completed { "Replay" } else { "Play" }
                        }
                    }
                }
            }
        }
    }
}
