use crate::config::EnvConfig;
use crate::pages::{LoginPage, RootAuthed, StudioPage};
use crate::state::{AppContext, AppState};
use leptos::prelude::*;
use leptos_router::components::{Route, Router, Routes};
use leptos_router::path;

#[component]
pub fn App(config: EnvConfig) -> impl IntoView {
    provide_context(AppContext(AppState::new(config)));

    view! {
        <Router>
            <Routes fallback=|| view! { <div class="px-4 py-8 text-xs text-muted-foreground">"Not found"</div> }>
                <Route path=path!("login") view=LoginPage />
                <Route path=path!("doc/:id") view=move || view! {
                    <RootAuthed>
                        <StudioPage />
                    </RootAuthed>
                } />
                <Route path=path!("") view=move || view! {
                    <RootAuthed>
                        <StudioPage />
                    </RootAuthed>
                } />
            </Routes>
        </Router>
    }
}
