use crate::models::{DocId, TreeNode};
use crate::storage::{load_expanded_nodes, save_expanded_nodes};
use icons::{ChevronDown, ChevronRight};
use leptos::prelude::*;
use std::collections::BTreeSet;

/// One visible line of the navigation tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct TreeRow {
    pub id: DocId,
    pub name: String,
    /// Backing markdown file, shown as a tooltip.
    pub file_path: Option<String>,
    pub level: usize,
    pub has_children: bool,
    pub expanded: bool,
}

/// Flatten the tree into the rows currently visible.
///
/// Children of a node are only emitted when its id is in `expanded`; the tree
/// itself is never mutated.
pub(crate) fn visible_rows(tree: &[TreeNode], expanded: &BTreeSet<DocId>) -> Vec<TreeRow> {
    fn walk(nodes: &[TreeNode], level: usize, expanded: &BTreeSet<DocId>, out: &mut Vec<TreeRow>) {
        for n in nodes {
            let is_open = expanded.contains(&n.id);
            out.push(TreeRow {
                id: n.id,
                name: n.name.clone(),
                file_path: n.file_path.clone(),
                level,
                has_children: !n.children.is_empty(),
                expanded: is_open,
            });
            if is_open {
                walk(&n.children, level + 1, expanded, out);
            }
        }
    }

    let mut out = Vec::new();
    walk(tree, 0, expanded, &mut out);
    out
}

pub(crate) fn toggle_expanded(expanded: &mut BTreeSet<DocId>, id: DocId) {
    if !expanded.remove(&id) {
        expanded.insert(id);
    }
}

/// Ids on the path from a root to `target`, excluding `target` itself.
pub(crate) fn ancestors_of(tree: &[TreeNode], target: DocId) -> Option<Vec<DocId>> {
    for n in tree {
        if n.id == target {
            return Some(vec![]);
        }
        if let Some(mut path) = ancestors_of(&n.children, target) {
            path.insert(0, n.id);
            return Some(path);
        }
    }
    None
}

#[component]
pub(crate) fn DocSidebar(
    #[prop(into)] tree: Signal<Vec<TreeNode>>,
    #[prop(into)] current_id: Signal<Option<DocId>>,
    on_select: Callback<DocId>,
) -> impl IntoView {
    let expanded: RwSignal<BTreeSet<DocId>> = RwSignal::new(load_expanded_nodes());

    let on_toggle = move |id: DocId| {
        expanded.update(|s| toggle_expanded(s, id));
        save_expanded_nodes(&expanded.get_untracked());
    };

    // Keep the selected page visible: open its ancestors once the tree knows it.
    Effect::new(move |_| {
        let Some(id) = current_id.get() else {
            return;
        };
        let Some(path) = ancestors_of(&tree.get(), id) else {
            return;
        };
        if path.iter().all(|p| expanded.get_untracked().contains(p)) {
            return;
        }
        expanded.update(|s| s.extend(path));
        save_expanded_nodes(&expanded.get_untracked());
    });

    view! {
        <nav class="space-y-0.5" aria-label="Pages">
            <Show
                when=move || !tree.get().is_empty()
                fallback=|| view! { <div class="px-2 py-1 text-xs text-muted-foreground">"No pages yet."</div> }
            >
                <For
                    each=move || visible_rows(&tree.get(), &expanded.get())
                    key=|row| (row.id, row.level, row.expanded, row.name.clone())
                    children=move |row| {
                        let id = row.id;
                        let is_selected = move || current_id.get() == Some(id);
                        let row_class = move || {
                            if is_selected() {
                                "group flex h-7 w-full cursor-pointer items-center gap-1 rounded-md bg-accent pr-2 text-sm text-accent-foreground"
                            } else {
                                "group flex h-7 w-full cursor-pointer items-center gap-1 rounded-md pr-2 text-sm text-muted-foreground hover:bg-surface-hover hover:text-foreground"
                            }
                        };
                        let tooltip = row.file_path.clone().unwrap_or_else(|| row.name.clone());
                        let indent = format!("padding-left: {}rem", 0.25 + row.level as f32 * 0.75);

                        view! {
                            <div
                                class=row_class
                                style=indent
                                title=tooltip
                                on:click=move |ev: web_sys::MouseEvent| {
                                    ev.stop_propagation();
                                    on_select.run(id);
                                }
                            >
                                <button
                                    class="flex size-4 shrink-0 items-center justify-center rounded-sm text-muted-foreground hover:bg-accent disabled:opacity-0"
                                    disabled=!row.has_children
                                    title=if row.expanded { "Collapse" } else { "Expand" }
                                    on:click=move |ev: web_sys::MouseEvent| {
                                        ev.stop_propagation();
                                        on_toggle(id);
                                    }
                                >
                                    {if row.expanded {
                                        view! { <ChevronDown class="size-3" /> }.into_any()
                                    } else {
                                        view! { <ChevronRight class="size-3" /> }.into_any()
                                    }}
                                </button>
                                <span class="truncate">{row.name.clone()}</span>
                            </div>
                        }
                    }
                />
            </Show>
        </nav>
    }
}
