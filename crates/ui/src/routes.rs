use dioxus::prelude::*;
use dioxus_router::{Link, Outlet, Routable};

use crate::context::AppContext;
use crate::views::{
    AdminLessonsView, ContentAdminView, DashboardView, LessonView, OnboardingOverlay, PracticeView,
    SkillPracticeView,
};

#[derive(Clone, Routable, PartialEq)]
#[rustfmt::skip]
pub enum Route {
    #[layout(Layout)]
        #[route("/", DashboardView)] Dashboard {},
        #[route("/play/:child_id/:lesson_id", LessonView)] Lesson { child_id: String, lesson_id: String },
        #[route("/practice/:child_id", PracticeView)] Practice { child_id: String },
        #[route("/practice/:child_id/:skill_id", SkillPracticeView)] SkillPractice { child_id: String, skill_id: String },
        #[route("/admin", AdminLessonsView)] AdminLessons {},
        #[route("/admin/:lesson_id", ContentAdminView)] ContentAdmin { lesson_id: String },
}

#[component]
fn Layout() -> Element {
    rsx! {
        div { class: "app",
            Sidebar {}
            main { class: "content",
                Outlet::<Route> {}
            }
            OnboardingOverlay {}
        }
    }
}

#[component]
fn Sidebar() -> Element {
    let ctx = use_context::<AppContext>();
    let family = ctx.family();
    let signed_in = family.profile.email.clone().unwrap_or_default();

    rsx! {
        nav { class: "sidebar",
            h1 { "TripLearn" }
            ul {
                li { Link { to: Route::Dashboard {}, "Dashboard" } }
                li { Link { to: Route::AdminLessons {}, "Content" } }
            }
            if !signed_in.is_empty() {
                p { class: "sidebar-account", "{signed_in}" }
            }
        }
    }
}
