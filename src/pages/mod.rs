use crate::components::ui::{
    Alert, AlertDescription, Button, ButtonSize, ButtonVariant, Card, CardContent,
    CardDescription, CardHeader, CardTitle, Input, Label, Spinner, Textarea,
};
use crate::links::{page_list_url, print_url, DeepLink};
use crate::markup::{image_data_url, ContentSource, EditorContent, EMPTY_EDITOR_HTML};
use crate::models::{DocId, Permission, Visibility};
use crate::notify::{NoticeKind, TOAST_TTL_MS};
use crate::sidebar::DocSidebar;
use crate::state::AppContext;
use crate::storage::{load_last_doc_id, save_last_doc_id};
use crate::studio::{SearchStep, SEARCH_DEBOUNCE_MS};
use crate::util::{
    clear_timeout, copy_to_clipboard, location_hash, location_origin, open_in_new_tab, prompt,
    replace_hash, set_timeout,
};
use crate::viewer::{ViewSurface, ViewerMode};
use icons::X;
use leptos::ev;
use leptos::html;
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_dom::helpers::window_event_listener;
use leptos_router::hooks::use_params;
use leptos_router::params::Params;
use std::sync::Arc;
use strum::IntoEnumIterator;

#[component]
pub fn LoginPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();

    let db: RwSignal<String> = RwSignal::new(app_state.0.config.db.clone().unwrap_or_default());
    let login: RwSignal<String> = RwSignal::new(String::new());
    let password: RwSignal<String> = RwSignal::new(String::new());
    let error: RwSignal<Option<String>> = RwSignal::new(None);
    let loading: RwSignal<bool> = RwSignal::new(false);

    let client = StoredValue::new(app_state.0.client.clone());
    let session = app_state.0.session;

    let on_submit = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();

        let db_val = db.get_untracked();
        let login_val = login.get_untracked();
        let password_val = password.get_untracked();
        let client = client.get_value();

        loading.set(true);
        error.set(None);

        spawn_local(async move {
            match client.authenticate(&db_val, &login_val, &password_val).await {
                Ok(info) if info.uid.is_some() => {
                    tracing::info!(login = %login_val, "signed in");
                    session.set(Some(info));
                    let _ = window().location().set_href("/");
                }
                Ok(_) => error.set(Some("Wrong login/password".to_string())),
                Err(e) => {
                    tracing::warn!(error = %e, "authentication failed");
                    error.set(Some(e.to_string()));
                }
            }
            loading.set(false);
        });
    };

    view! {
        <div class="min-h-screen bg-background">
            <div class="mx-auto flex min-h-screen w-full max-w-sm flex-col justify-center px-4 py-10">
                <div class="mb-6 flex items-center justify-center">
                    <a href="/" class="text-sm font-medium text-foreground">"Doc Studio"</a>
                </div>

                <Card>
                    <CardHeader>
                        <CardTitle class="text-lg">"Log in"</CardTitle>
                        <CardDescription class="text-xs">"Sign in to your Odoo database to continue."</CardDescription>
                    </CardHeader>

                    <CardContent>
                        <form class="flex flex-col gap-3" on:submit=on_submit>
                            <div class="flex flex-col gap-1.5">
                                <Label html_for="db">"Database"</Label>
                                <Input id="db" placeholder="odoo" bind_value=db class="h-8 text-sm" />
                            </div>

                            <div class="flex flex-col gap-1.5">
                                <Label html_for="login">"Login"</Label>
                                <Input
                                    id="login"
                                    placeholder="admin"
                                    bind_value=login
                                    required=true
                                    class="h-8 text-sm"
                                />
                            </div>

                            <div class="flex flex-col gap-1.5">
                                <Label html_for="password">"Password"</Label>
                                <Input
                                    id="password"
                                    r#type="password"
                                    placeholder="••••••••"
                                    bind_value=password
                                    required=true
                                    class="h-8 text-sm"
                                />
                            </div>

                            <Show when=move || error.get().is_some() fallback=|| ().into_view()>
                                {move || {
                                    error.get().map(|e| {
                                        view! {
                                            <Alert class="border-destructive/30">
                                                <AlertDescription class="text-destructive text-xs">
                                                    {e}
                                                </AlertDescription>
                                            </Alert>
                                        }
                                    })
                                }}
                            </Show>

                            <Button
                                class="w-full"
                                size=ButtonSize::Sm
                                attr:disabled=move || loading.get()
                            >
                                <span class="inline-flex items-center gap-2">
                                    <Show when=move || loading.get() fallback=|| ().into_view()>
                                        <Spinner />
                                    </Show>
                                    {move || if loading.get() { "Signing in..." } else { "Continue" }}
                                </span>
                            </Button>
                        </form>
                    </CardContent>
                </Card>
            </div>
        </div>
    }
}

/// Renders `children` once a backend session exists, the login page otherwise.
#[component]
pub fn RootAuthed(children: ChildrenFn) -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let session = app_state.0.session;
    let client = app_state.0.client.clone();
    let checked: RwSignal<bool> = RwSignal::new(session.get_untracked().is_some());

    if !checked.get_untracked() {
        spawn_local(async move {
            match client.session_info().await {
                Ok(info) if info.uid.is_some() => session.set(Some(info)),
                Ok(_) => tracing::info!("no active session"),
                Err(e) if e.is_session_expired() => tracing::info!("session expired"),
                Err(e) => tracing::warn!(error = %e, "reading session failed"),
            }
            checked.set(true);
        });
    }

    let is_authenticated = move || session.with(|s| s.is_some());

    // Store children so the view macro sees an `Fn` (not an `FnOnce`).
    let children = StoredValue::new(children);

    view! {
        <Show
            when=move || checked.get()
            fallback=|| view! {
                <div class="flex min-h-screen items-center justify-center"><Spinner class="size-5" /></div>
            }
        >
            <Show when=is_authenticated fallback=move || view! { <LoginPage /> }>
                {move || children.with_value(|c| c())}
            </Show>
        </Show>
    }
}

#[derive(Params, PartialEq, Clone, Debug)]
pub struct DocRouteParams {
    pub id: Option<DocId>,
}

#[component]
pub fn StudioPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let shell = app_state.0.shell;
    let viewer = app_state.0.viewer;
    let params = use_params::<DocRouteParams>();

    // `/doc/:id` wins over `#action=...&active_id=...`.
    let route_id = params.get_untracked().ok().and_then(|p| p.id);
    let hash_id = app_state
        .0
        .actions
        .studio_target(&DeepLink::parse(&location_hash()));
    let deep_link = route_id.or(hash_id);
    let remembered = load_last_doc_id();

    let list_url = page_list_url(&app_state.0.config.api_url);
    let session = app_state.0.session;

    spawn_local(async move {
        shell.start(deep_link, remembered).await;
        viewer.load_parents().await;
    });

    // Selection drives the viewer.
    Effect::new(move |_| {
        let id = shell.current_id.get();
        let force_edit = shell.force_edit.get_untracked();
        if let Some(id) = id {
            save_last_doc_id(Some(id));
            replace_hash(&DeepLink::studio(id).to_hash());
        }
        spawn_local(async move {
            viewer.load(id, force_edit).await;
        });
    });

    let _pagehide_handle = window_event_listener(ev::pagehide, move |_| {
        spawn_local(async move {
            viewer.release_held_lock().await;
        });
    });

    let search_timer: RwSignal<Option<i32>> = RwSignal::new(None);
    let on_search_change = Callback::new(move |term: String| {
        if let Some(tid) = search_timer.get_untracked() {
            clear_timeout(tid);
        }
        search_timer.set(None);

        if let SearchStep::Pending(ticket) = shell.on_search_input(term) {
            let tid = set_timeout(SEARCH_DEBOUNCE_MS, move || {
                spawn_local(async move {
                    shell.run_search(ticket).await;
                });
            });
            search_timer.set(tid);
        }
    });

    let on_select = Callback::new(move |id: DocId| shell.on_page_selected(id));

    let on_new_page = move |_: web_sys::MouseEvent| {
        spawn_local(async move {
            let _ = shell.create_page().await;
        });
    };

    view! {
        <div class="flex h-screen bg-background text-foreground">
            <aside class="flex w-64 shrink-0 flex-col border-r border-border bg-surface">
                <div class="flex items-center justify-between px-3 py-3">
                    <span class="text-sm font-semibold">"Doc Studio"</span>
                    <Button
                        variant=ButtonVariant::Ghost
                        size=ButtonSize::Xs
                        attr:title="New page"
                        on:click=on_new_page
                    >
                        "+ New"
                    </Button>
                </div>

                <div class="px-3 pb-2">
                    <Input
                        bind_value=shell.search_term
                        on_change=on_search_change
                        placeholder="Search pages..."
                        class="h-8 text-sm"
                    />
                </div>

                <div class="min-h-0 flex-1 overflow-y-auto px-2 pb-3">
                    <Show
                        when=move || shell.search_term.with(|t| !t.is_empty())
                        fallback=move || view! {
                            <Show
                                when=move || !(shell.loading.get() && shell.tree.with(|t| t.is_empty()))
                                fallback=|| view! { <div class="px-2 py-2"><Spinner /></div> }
                            >
                                <DocSidebar tree=shell.tree current_id=shell.current_id on_select=on_select />
                            </Show>
                        }
                    >
                        <SearchResults on_select=on_select />
                    </Show>
                </div>

                <div class="flex items-center justify-between gap-2 border-t border-border px-3 py-2">
                    <span
                        class="truncate text-xs text-muted-foreground"
                        title=move || session.with(|s| s.as_ref().and_then(|s| s.db.clone()).unwrap_or_default())
                    >
                        {move || session.with(|s| s.as_ref().and_then(|s| s.name.clone()).unwrap_or_default())}
                    </span>
                    <a
                        class="text-xs text-muted-foreground hover:text-foreground hover:underline"
                        href=list_url
                        target="_blank"
                    >
                        "Open list view"
                    </a>
                </div>
            </aside>

            <main class="min-w-0 flex-1 overflow-y-auto">
                <DocContent />
            </main>

            <ShareDialog />
            <ToastStack />
        </div>
    }
}

#[component]
fn SearchResults(on_select: Callback<DocId>) -> impl IntoView {
    let shell = expect_context::<AppContext>().0.shell;

    view! {
        <div class="space-y-0.5">
            <Show
                when=move || shell.search_results.with(|r| !r.is_empty())
                fallback=|| view! { <div class="px-2 py-1 text-xs text-muted-foreground">"No matching pages."</div> }
            >
                <For
                    each=move || shell.search_results.get()
                    key=|hit| hit.id
                    children=move |hit| {
                        let id = hit.id;
                        let parent = hit.parent_id.as_ref().map(|p| format!("in {}", p.name));
                        view! {
                            <button
                                class="flex w-full flex-col items-start rounded-md px-2 py-1 text-left hover:bg-surface-hover"
                                on:click=move |_| on_select.run(id)
                            >
                                <span class="w-full truncate text-sm">{hit.name.clone()}</span>
                                {parent.map(|p| view! { <span class="w-full truncate text-[11px] text-muted-foreground">{p}</span> })}
                            </button>
                        }
                    }
                />
            </Show>
        </div>
    }
}

/// Live contenteditable surface backing the visual editor.
struct VisualWidget(NodeRef<html::Div>);

impl ContentSource for VisualWidget {
    fn snapshot(&self) -> EditorContent {
        let html = self
            .0
            .get_untracked()
            .map(|el| el.inner_html())
            .unwrap_or_default();
        EditorContent::Raw(html)
    }
}

#[component]
fn DocContent() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let shell = app_state.0.shell;
    let viewer = app_state.0.viewer;
    let share = app_state.0.share;
    let share_open = app_state.0.share_open;
    let notifications = app_state.0.notifications;
    let api_url = StoredValue::new(app_state.0.config.api_url.clone());

    let confirm_delete: RwSignal<bool> = RwSignal::new(false);
    let editor_ref: NodeRef<html::Div> = NodeRef::new();

    // Hand the mounted widget to the controller so mode switches read live content.
    Effect::new(move |_| {
        if editor_ref.get().is_some() && viewer.mode.get_untracked() == ViewerMode::EditingVisual {
            viewer.register_widget(Arc::new(VisualWidget(editor_ref)));
        }
    });

    let is_editing = move || viewer.mode.get().is_editing();
    let crumbs = move || {
        viewer
            .breadcrumbs
            .get()
            .into_iter()
            .enumerate()
            .collect::<Vec<_>>()
    };

    let on_toggle_edit = move |_: web_sys::MouseEvent| {
        spawn_local(async move {
            viewer.toggle_edit().await;
        });
    };

    let on_toggle_view = move |_: web_sys::MouseEvent| {
        spawn_local(async move {
            viewer.toggle_view_mode().await;
        });
    };

    let on_toggle_code = move |_: web_sys::MouseEvent| viewer.toggle_code_view();

    let on_save = move |_: web_sys::MouseEvent| {
        spawn_local(async move {
            if viewer.save().await {
                shell.on_page_updated().await;
            }
        });
    };

    let on_sync = move |_: web_sys::MouseEvent| {
        spawn_local(async move {
            if viewer.refresh_from_disk().await {
                shell.on_page_updated().await;
            }
        });
    };

    let on_icon = move |_: web_sys::MouseEvent| {
        let current = viewer
            .doc
            .with_untracked(|d| d.as_ref().and_then(|d| d.icon.clone()))
            .unwrap_or_default();
        let Some(icon) = prompt("Enter an emoji or icon", &current) else {
            return;
        };
        spawn_local(async move {
            if viewer.set_icon(icon).await {
                shell.on_page_updated().await;
            }
        });
    };

    let on_copy_markdown = move |_: web_sys::MouseEvent| {
        let Some(markdown) = viewer.markdown_for_clipboard() else {
            notifications.warning("Nothing to copy");
            return;
        };
        spawn_local(async move {
            match copy_to_clipboard(&markdown).await {
                Ok(()) => {
                    notifications.success("Markdown copied to clipboard!");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "clipboard write failed");
                    notifications.danger("Failed to copy markdown");
                }
            }
        });
    };

    let on_print = move |_: web_sys::MouseEvent| {
        if let Some(id) = viewer.current_id() {
            open_in_new_tab(&print_url(&api_url.get_value(), id));
        }
    };

    let on_share = move |_: web_sys::MouseEvent| {
        if let Some(id) = viewer.current_id() {
            share_open.set(true);
            spawn_local(async move {
                share.open(id).await;
            });
        }
    };

    let on_confirm_delete = move |_: web_sys::MouseEvent| {
        confirm_delete.set(false);
        spawn_local(async move {
            if viewer.delete_page().await {
                save_last_doc_id(None);
                shell.on_page_deleted().await;
            }
        });
    };

    let meta = move || {
        viewer.doc.get().map(|d| {
            let author = d
                .write_uid
                .as_ref()
                .or(d.create_uid.as_ref())
                .map(|u| u.name.clone())
                .unwrap_or_default();
            let updated = d.write_date.clone().or(d.create_date.clone()).unwrap_or_default();
            let locked = d
                .locked_by
                .as_ref()
                .filter(|_| !viewer.mode.get().is_editing())
                .map(|u| format!("Locked by {}", u.name));
            view! {
                <div class="mt-1 flex flex-wrap items-center gap-3 text-xs text-muted-foreground">
                    <span>{author}</span>
                    <span>{updated}</span>
                    <span>{move || format!("{} min read", viewer.reading_time.get())}</span>
                    {locked.map(|l| view! { <span class="text-warning">{l}</span> })}
                </div>
            }
        })
    };

    let body = move || match viewer.mode.get() {
        ViewerMode::Viewing => match viewer.surface.get() {
            ViewSurface::Rendered => view! {
                <div
                    class="prose max-w-none"
                    inner_html=move || viewer.doc.with(|d| d.as_ref().map(|d| d.body_html.clone()).unwrap_or_default())
                ></div>
            }
            .into_any(),
            ViewSurface::Source => view! {
                <pre class="whitespace-pre-wrap rounded-md bg-muted px-4 py-3 font-mono text-sm">
                    {move || viewer.doc.with(|d| d.as_ref().map(|d| d.content_md.clone()).unwrap_or_default())}
                </pre>
            }
            .into_any(),
        },
        ViewerMode::EditingVisual => {
            // Seeded once per mount; the widget owns the content from here on.
            let initial = viewer.buffer.with_untracked(|b| {
                if b.html.trim().is_empty() {
                    EMPTY_EDITOR_HTML.to_string()
                } else {
                    b.html.clone()
                }
            });
            view! {
                <div
                    node_ref=editor_ref
                    contenteditable="true"
                    class="prose min-h-[24rem] max-w-none rounded-md border border-input px-4 py-3 outline-none focus-visible:ring-2 focus-visible:ring-ring/50"
                    inner_html=initial
                    on:input=move |_| {
                        if let Some(el) = editor_ref.get_untracked() {
                            viewer.on_widget_change(EditorContent::Raw(el.inner_html()));
                        }
                    }
                ></div>
            }
            .into_any()
        }
        ViewerMode::EditingMarkdown => view! {
            <Textarea
                value=Signal::derive(move || viewer.buffer.with(|b| b.markdown.clone()))
                on_change=Callback::new(move |v: String| viewer.set_markdown(v))
                placeholder="Write markdown..."
            />
        }
        .into_any(),
        ViewerMode::EditingCode => view! {
            <Textarea
                value=Signal::derive(move || viewer.buffer.with(|b| b.html.clone()))
                on_change=Callback::new(move |v: String| viewer.set_code(v))
                placeholder="<p>HTML</p>"
            />
        }
        .into_any(),
    };

    view! {
        <Show
            when=move || viewer.doc.with(|d| d.is_some())
            fallback=move || view! {
                <div class="flex h-full items-center justify-center text-sm text-muted-foreground">
                    <Show when=move || viewer.loading.get() fallback=|| "Select a page from the sidebar or create a new one.">
                        <Spinner class="size-5" />
                    </Show>
                </div>
            }
        >
            <div class="mx-auto w-full max-w-3xl px-8 py-6">
                {move || {
                    viewer
                        .doc
                        .with(|d| d.as_ref().and_then(|d| d.cover_image.clone()))
                        .map(|cover| view! {
                            <img
                                class="mb-4 h-40 w-full rounded-md object-cover"
                                src=image_data_url(&cover)
                                alt=""
                            />
                        })
                }}
                <nav class="mb-3 flex flex-wrap items-center gap-1 text-xs text-muted-foreground" aria-label="Breadcrumbs">
                    <For
                        each=crumbs
                        key=|(i, crumb)| (*i, crumb.id)
                        children=move |(i, crumb)| {
                            let id = crumb.id;
                            view! {
                                {(i > 0).then(|| view! { <span>"/"</span> })}
                                <button class="hover:text-foreground hover:underline" on:click=move |_| shell.on_page_selected(id)>
                                    {crumb.name.clone()}
                                </button>
                            }
                        }
                    />
                </nav>

                <Show
                    when=is_editing
                    fallback=move || view! {
                        <h1 class="flex items-center gap-2 text-2xl font-semibold">
                            {move || viewer.doc.with(|d| d.as_ref().and_then(|d| d.icon.clone()))
                                .map(|icon| view! { <span>{icon}</span> })}
                            <span>{move || viewer.doc.with(|d| d.as_ref().map(|d| d.name.clone()).unwrap_or_default())}</span>
                        </h1>
                    }
                >
                    <div class="flex flex-col gap-2">
                        <input
                            class="w-full border-b border-input bg-transparent py-1 text-2xl font-semibold outline-none"
                            placeholder="Untitled"
                            prop:value=move || viewer.buffer.with(|b| b.title.clone())
                            on:input=move |ev| viewer.set_title(event_target_value(&ev))
                        />
                        <div class="flex items-center gap-2">
                            <Label html_for="parent">"Parent"</Label>
                            <select
                                id="parent"
                                class="h-7 rounded-md border border-input bg-transparent px-2 text-xs"
                                on:change=move |ev| viewer.set_parent(event_target_value(&ev).parse().ok())
                            >
                                <option value="" selected=move || viewer.buffer.with(|b| b.parent_id.is_none())>
                                    "No parent"
                                </option>
                                <For
                                    each=move || viewer.parent_choices()
                                    key=|p| p.id
                                    children=move |p| {
                                        let id = p.id;
                                        view! {
                                            <option
                                                value=id.to_string()
                                                selected=move || viewer.buffer.with(|b| b.parent_id == Some(id))
                                            >
                                                {p.name.clone()}
                                            </option>
                                        }
                                    }
                                />
                            </select>
                        </div>
                    </div>
                </Show>

                {meta}

                <div class="my-4 flex flex-wrap items-center gap-1 border-y border-border py-2">
                    <Show
                        when=is_editing
                        fallback=move || view! {
                            <Button size=ButtonSize::Xs on:click=on_toggle_edit>"Edit"</Button>
                            <Button
                                variant=ButtonVariant::Ghost
                                size=ButtonSize::Xs
                                on:click=on_toggle_view
                            >
                                {move || match viewer.surface.get() {
                                    ViewSurface::Rendered => "Markdown",
                                    ViewSurface::Source => "Rendered",
                                }}
                            </Button>
                            <Button variant=ButtonVariant::Ghost size=ButtonSize::Xs on:click=on_share>"Share"</Button>
                            <Button variant=ButtonVariant::Ghost size=ButtonSize::Xs on:click=on_copy_markdown>"Copy markdown"</Button>
                            <Button variant=ButtonVariant::Ghost size=ButtonSize::Xs on:click=on_print>"Print"</Button>
                            <Button variant=ButtonVariant::Ghost size=ButtonSize::Xs on:click=on_sync>"Sync from disk"</Button>
                            <Button variant=ButtonVariant::Ghost size=ButtonSize::Xs on:click=on_icon>"Icon"</Button>
                            <Button
                                variant=ButtonVariant::Ghost
                                size=ButtonSize::Xs
                                class="text-destructive"
                                on:click=move |_| confirm_delete.set(true)
                            >
                                "Delete"
                            </Button>
                        }
                    >
                        <Button
                            variant=ButtonVariant::Ghost
                            size=ButtonSize::Xs
                            attr:disabled=move || viewer.mode.get() == ViewerMode::EditingCode
                            on:click=on_toggle_view
                        >
                            {move || if viewer.mode.get() == ViewerMode::EditingMarkdown { "Visual" } else { "Markdown" }}
                        </Button>
                        <Button
                            variant=ButtonVariant::Ghost
                            size=ButtonSize::Xs
                            attr:disabled=move || viewer.mode.get() == ViewerMode::EditingMarkdown
                            on:click=on_toggle_code
                        >
                            {move || if viewer.mode.get() == ViewerMode::EditingCode { "Visual" } else { "HTML" }}
                        </Button>
                        <span class="flex-1"></span>
                        <Button variant=ButtonVariant::Outline size=ButtonSize::Xs on:click=on_toggle_edit>"Cancel"</Button>
                        <Button size=ButtonSize::Xs attr:disabled=move || viewer.loading.get() on:click=on_save>"Save"</Button>
                    </Show>
                    <Show when=move || viewer.loading.get() fallback=|| ().into_view()>
                        <Spinner class="ml-2" />
                    </Show>
                </div>

                {body}

                <Show when=move || viewer.linked_pages.with(|l| !l.is_empty()) fallback=|| ().into_view()>
                    <div class="mt-8 border-t border-border pt-4">
                        <div class="mb-2 text-xs font-medium text-muted-foreground">"Linked pages"</div>
                        <div class="flex flex-wrap gap-2">
                            <For
                                each=move || viewer.linked_pages.get()
                                key=|p| p.id
                                children=move |p| {
                                    let id = p.id;
                                    view! {
                                        <Button
                                            variant=ButtonVariant::Outline
                                            size=ButtonSize::Xs
                                            on:click=move |_| shell.on_page_selected(id)
                                        >
                                            {p.name.clone()}
                                        </Button>
                                    }
                                }
                            />
                        </div>
                    </div>
                </Show>
            </div>

            <Show when=move || confirm_delete.get() fallback=|| ().into_view()>
                <div class="fixed inset-0 z-50 flex items-center justify-center bg-black/30 px-4">
                    <div class="w-full max-w-sm rounded-md border border-border bg-background p-4 shadow-lg">
                        <div class="mb-3 space-y-1">
                            <div class="text-sm font-medium text-destructive">"Delete page"</div>
                            <div class="text-xs text-muted-foreground">
                                "Are you sure you want to delete this document? This cannot be undone."
                            </div>
                        </div>
                        <div class="flex justify-end gap-2">
                            <Button
                                variant=ButtonVariant::Outline
                                size=ButtonSize::Sm
                                on:click=move |_| confirm_delete.set(false)
                            >
                                "Cancel"
                            </Button>
                            <Button
                                variant=ButtonVariant::Destructive
                                size=ButtonSize::Sm
                                on:click=on_confirm_delete
                            >
                                "Delete"
                            </Button>
                        </div>
                    </div>
                </div>
            </Show>
        </Show>
    }
}

#[component]
fn ShareDialog() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let share = app_state.0.share;
    let share_open = app_state.0.share_open;
    let notifications = app_state.0.notifications;
    let origin = StoredValue::new(
        location_origin().unwrap_or_else(|| app_state.0.config.api_url.clone()),
    );

    let on_user_search = Callback::new(move |term: String| {
        spawn_local(async move {
            share.search_users(term).await;
        });
    });

    let on_visibility = move |ev: web_sys::Event| {
        let Ok(v) = event_target_value(&ev).parse::<Visibility>() else {
            return;
        };
        spawn_local(async move {
            share.set_visibility(v).await;
        });
    };

    let on_copy_link = move |_: web_sys::MouseEvent| {
        let Some(link) = share.share_link(&origin.get_value()) else {
            return;
        };
        spawn_local(async move {
            match copy_to_clipboard(&link).await {
                Ok(()) => {
                    notifications.success("Link copied to clipboard");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "clipboard write failed");
                    notifications.danger("Failed to copy link");
                }
            }
        });
    };

    view! {
        <Show when=move || share_open.get() fallback=|| ().into_view()>
            <div class="fixed inset-0 z-50 flex items-center justify-center bg-black/30 px-4">
                <div class="w-full max-w-md rounded-md border border-border bg-background p-4 shadow-lg">
                    <div class="mb-3 flex items-center justify-between">
                        <div class="text-sm font-medium">"Share this document"</div>
                        <button
                            class="rounded-sm p-1 text-muted-foreground hover:bg-accent"
                            aria-label="Close"
                            on:click=move |_| share_open.set(false)
                        >
                            <X class="size-4" />
                        </button>
                    </div>

                    <Show when=move || share.loading.get() fallback=|| ().into_view()>
                        <div class="mb-2"><Spinner /></div>
                    </Show>

                    <div class="space-y-4">
                        <div class="flex items-center justify-between gap-2">
                            <Label html_for="visibility">"Visibility"</Label>
                            <select
                                id="visibility"
                                class="h-8 rounded-md border border-input bg-transparent px-2 text-sm"
                                on:change=on_visibility
                            >
                                {Visibility::iter()
                                    .map(|v| view! {
                                        <option value=v.to_string() selected=move || share.visibility.get() == v>
                                            {v.label()}
                                        </option>
                                    })
                                    .collect_view()}
                            </select>
                        </div>

                        <div class="space-y-1">
                            <Label>"Add people"</Label>
                            <Input
                                bind_value=share.search_term
                                on_change=on_user_search
                                placeholder="Search users by name..."
                                class="h-8 text-sm"
                            />
                            <For
                                each=move || share.search_results.get()
                                key=|u| u.id
                                children=move |user| {
                                    let label = match &user.email {
                                        Some(email) => format!("{} ({email})", user.name),
                                        None => user.name.clone(),
                                    };
                                    view! {
                                        <button
                                            class="flex w-full items-center justify-between rounded-md px-2 py-1 text-left text-sm hover:bg-accent"
                                            on:click=move |_| {
                                                let user = user.clone();
                                                spawn_local(async move {
                                                    share.add_user(user).await;
                                                });
                                            }
                                        >
                                            <span class="truncate">{label}</span>
                                            <span class="text-xs text-muted-foreground">"Add"</span>
                                        </button>
                                    }
                                }
                            />
                        </div>

                        <div class="space-y-1">
                            <Label>"People with access"</Label>
                            <Show
                                when=move || share.shares.with(|s| !s.is_empty())
                                fallback=|| view! { <div class="text-xs text-muted-foreground">"Not shared with anyone yet."</div> }
                            >
                                <For
                                    each=move || share.shares.get()
                                    key=|g| (g.id, g.permission)
                                    children=move |grant| {
                                        let share_id = grant.id;
                                        let current = grant.permission;
                                        view! {
                                            <div class="flex items-center justify-between gap-2 py-1 text-sm">
                                                <span class="truncate">{grant.user_name()}</span>
                                                <div class="flex items-center gap-1">
                                                    <select
                                                        class="h-7 rounded-md border border-input bg-transparent px-2 text-xs"
                                                        on:change=move |ev| {
                                                            let Ok(p) = event_target_value(&ev).parse::<Permission>() else {
                                                                return;
                                                            };
                                                            spawn_local(async move {
                                                                share.update_permission(share_id, p).await;
                                                            });
                                                        }
                                                    >
                                                        {Permission::iter()
                                                            .map(|p| view! {
                                                                <option value=p.to_string() selected=p == current>{p.label()}</option>
                                                            })
                                                            .collect_view()}
                                                    </select>
                                                    <button
                                                        class="rounded-sm p-1 text-muted-foreground hover:bg-accent hover:text-destructive"
                                                        aria-label="Remove access"
                                                        on:click=move |_| {
                                                            spawn_local(async move {
                                                                share.remove_share(share_id).await;
                                                            });
                                                        }
                                                    >
                                                        <X class="size-3" />
                                                    </button>
                                                </div>
                                            </div>
                                        }
                                    }
                                />
                            </Show>
                        </div>

                        <div class="flex justify-between">
                            <Button variant=ButtonVariant::Outline size=ButtonSize::Sm on:click=on_copy_link>
                                "Copy link"
                            </Button>
                            <Button size=ButtonSize::Sm on:click=move |_| share_open.set(false)>"Done"</Button>
                        </div>
                    </div>
                </div>
            </div>
        </Show>
    }
}

#[component]
fn ToastStack() -> impl IntoView {
    let notifications = expect_context::<AppContext>().0.notifications;

    view! {
        <div class="pointer-events-none fixed bottom-4 right-4 z-[60] flex w-80 flex-col gap-2">
            <For
                each=move || notifications.list()
                key=|t| t.id
                children=move |toast| {
                    let id = toast.id;
                    let _ = set_timeout(TOAST_TTL_MS, move || notifications.dismiss(id));

                    let tone = match toast.kind {
                        NoticeKind::Success => "border-success/40",
                        NoticeKind::Info => "border-border",
                        NoticeKind::Warning => "border-warning/40",
                        NoticeKind::Danger => "border-destructive/40 text-destructive",
                    };
                    view! {
                        <div class=format!("pointer-events-auto flex items-start justify-between gap-2 rounded-md border bg-background px-3 py-2 text-sm shadow-md {tone}")>
                            <span>{toast.message.clone()}</span>
                            <button
                                class="text-muted-foreground hover:text-foreground"
                                aria-label="Dismiss"
                                on:click=move |_| notifications.dismiss(id)
                            >
                                <X class="size-3" />
                            </button>
                        </div>
                    }
                }
            />
        </div>
    }
}
