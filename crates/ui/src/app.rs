use dioxus::prelude::*;
use dioxus_router::Router;

use crate::routes::Route;

/// Root component: stylesheet, window title and the routed shell.
#[component]
pub fn App() -> Element {
    rsx! {
        document::Stylesheet { href: asset!("/assets/style.css") }
        document::Title { "TripLearn" }

        div { class: "app-root",
            ErrorBoundary {
                handle_error: |errors: ErrorContext| {
                    tracing::error!(errors = ?errors, "view crashed");
                    rsx! {
                        div { class: "fatal", role: "alert",
                            h1 { "Oops! Our map got torn." }
                            p { "Close TripLearn and open it again to keep exploring." }
                            details {
                                summary { "Details for grown-ups" }
                                pre { "{errors:?}" }
                            }
                        }
                    }
                },
                Router::<Route> {}
            }
        }
    }
}
