use crate::models::{DocId, NewPage, SearchHit, TreeNode};
use crate::notify::Notifications;
use crate::rpc::DocBackend;
use leptos::prelude::*;
use std::sync::Arc;

/// Quiet period after the last keystroke before a page search is issued.
pub(crate) const SEARCH_DEBOUNCE_MS: i32 = 300;

/// What the view should do after a search keystroke.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SearchStep {
    /// Results were cleared on the spot; nothing to schedule.
    Cleared,
    /// Schedule `run_search` with this ticket after the debounce.
    Pending(u64),
}

/// Top-level shell state: tree, selection, search-as-you-type and page creation.
pub(crate) struct StudioShell<B: DocBackend> {
    backend: StoredValue<Arc<B>>,
    notifications: Notifications,

    pub tree: RwSignal<Vec<TreeNode>>,
    pub current_id: RwSignal<Option<DocId>>,
    /// Set by page creation; the viewer enters edit mode right after loading.
    pub force_edit: RwSignal<bool>,
    pub search_term: RwSignal<String>,
    pub search_results: RwSignal<Vec<SearchHit>>,
    pub loading: RwSignal<bool>,

    search_ticket: RwSignal<u64>,
}

impl<B: DocBackend> Clone for StudioShell<B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B: DocBackend> Copy for StudioShell<B> {}

impl<B: DocBackend> StudioShell<B> {
    pub fn new(backend: Arc<B>, notifications: Notifications) -> Self {
        Self {
            backend: StoredValue::new(backend),
            notifications,
            tree: RwSignal::new(vec![]),
            current_id: RwSignal::new(None),
            force_edit: RwSignal::new(false),
            search_term: RwSignal::new(String::new()),
            search_results: RwSignal::new(vec![]),
            loading: RwSignal::new(true),
            search_ticket: RwSignal::new(0),
        }
    }

    fn backend(&self) -> Arc<B> {
        self.backend.get_value()
    }

    /// Reconcile from disk, load the tree and pick the initial page.
    ///
    /// Selection order: `deep_link`, then `remembered` if it is still in the tree,
    /// then the first root.
    pub async fn start(&self, deep_link: Option<DocId>, remembered: Option<DocId>) {
        if let Err(e) = self.backend().sync_all_from_disk().await {
            tracing::warn!(error = %e, "auto-sync from disk failed");
        }

        if let Some(id) = deep_link {
            self.current_id.set(Some(id));
        }
        self.refresh_tree(remembered).await;
    }

    /// Reload the navigation tree, auto-selecting the first root when nothing is selected.
    pub async fn load_tree(&self) {
        self.refresh_tree(None).await;
    }

    async fn refresh_tree(&self, preferred: Option<DocId>) {
        self.loading.set(true);
        match self.backend().nav_tree().await {
            Ok(tree) => {
                if self.current_id.get_untracked().is_none() {
                    let pick = preferred
                        .filter(|id| tree_contains(&tree, *id))
                        .or_else(|| tree.first().map(|n| n.id));
                    self.current_id.set(pick);
                }
                self.tree.set(tree);
            }
            Err(e) => tracing::error!(error = %e, "loading navigation tree failed"),
        }
        self.loading.set(false);
    }

    pub fn on_search_input(&self, term: String) -> SearchStep {
        let ticket = self.search_ticket.get_untracked().wrapping_add(1);
        self.search_ticket.set(ticket);
        let empty = term.is_empty();
        self.search_term.set(term);

        if empty {
            self.search_results.set(vec![]);
            SearchStep::Cleared
        } else {
            SearchStep::Pending(ticket)
        }
    }

    /// Debounced search body. A superseded ticket does nothing.
    pub async fn run_search(&self, ticket: u64) {
        if self.search_ticket.get_untracked() != ticket {
            return;
        }
        let term = self.search_term.get_untracked();
        if term.is_empty() {
            return;
        }

        match self.backend().search_pages(&term).await {
            Ok(hits) => {
                if self.search_ticket.get_untracked() == ticket {
                    self.search_results.set(hits);
                }
            }
            Err(e) => tracing::error!(error = %e, "page search failed"),
        }
    }

    fn clear_search(&self) {
        self.search_ticket.update(|t| *t = t.wrapping_add(1));
        self.search_term.set(String::new());
        self.search_results.set(vec![]);
    }

    /// Create a default page, select it and flag it for immediate editing.
    pub async fn create_page(&self) -> Option<DocId> {
        self.loading.set(true);
        let created = self.backend().create_page(&NewPage::default()).await;

        let id = match created {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(error = %e, "creating page failed");
                self.notifications.danger("Could not create page");
                self.loading.set(false);
                return None;
            }
        };

        self.load_tree().await;
        self.force_edit.set(true);
        self.current_id.set(Some(id));
        self.clear_search();
        self.loading.set(false);
        Some(id)
    }

    /// Manual selection never forces edit mode.
    pub fn on_page_selected(&self, id: DocId) {
        self.force_edit.set(false);
        self.current_id.set(Some(id));
    }

    /// Refresh after the viewer changed something; re-runs an active search.
    pub async fn on_page_updated(&self) {
        self.load_tree().await;
        if !self.search_term.get_untracked().is_empty() {
            let ticket = self.search_ticket.get_untracked().wrapping_add(1);
            self.search_ticket.set(ticket);
            self.run_search(ticket).await;
        }
    }

    pub async fn on_page_deleted(&self) {
        self.force_edit.set(false);
        self.current_id.set(None);
        self.on_page_updated().await;
    }
}

fn tree_contains(tree: &[TreeNode], id: DocId) -> bool {
    tree.iter()
        .any(|n| n.id == id || tree_contains(&n.children, id))
}
