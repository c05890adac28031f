use crate::markup::{clean_html_fragment, reading_time_minutes, ContentSource, EditorContent};
use crate::models::{DocId, Document, PageRef, PageWrite};
use crate::notify::Notifications;
use crate::rpc::{DocBackend, RpcResult};
use leptos::prelude::*;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ViewerMode {
    Viewing,
    EditingVisual,
    EditingMarkdown,
    EditingCode,
}

impl ViewerMode {
    pub fn is_editing(self) -> bool {
        !matches!(self, ViewerMode::Viewing)
    }
}

/// What the read-only view shows: rendered HTML or the markdown source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum ViewSurface {
    #[default]
    Rendered,
    Source,
}

/// Mutable copy of the editable fields; owned separately from the view copy.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct EditBuffer {
    pub title: String,
    pub parent_id: Option<DocId>,
    pub html: String,
    pub markdown: String,
}

impl EditBuffer {
    pub fn from_document(doc: &Document) -> Self {
        Self {
            title: doc.name.clone(),
            parent_id: doc.parent_id(),
            html: doc.body_html.clone(),
            markdown: doc.content_md.clone(),
        }
    }
}

struct LoadedDoc {
    doc: Document,
    breadcrumbs: Vec<PageRef>,
    linked_pages: Vec<PageRef>,
}

/// Document viewer/editor controller.
///
/// Owns the view/edit lifecycle: lock acquisition and release, visual/markdown/code
/// switching through the backend converters, and save + disk sync.
/// All state lives in signals so the handle is `Copy` and can be moved into views freely.
pub(crate) struct DocViewer<B: DocBackend> {
    backend: StoredValue<Arc<B>>,
    notifications: Notifications,

    /// Last loaded view copy. Its body is always a fragment.
    pub doc: RwSignal<Option<Document>>,
    /// Identifier the latest load was issued for.
    pub target_id: RwSignal<Option<DocId>>,
    pub mode: RwSignal<ViewerMode>,
    pub surface: RwSignal<ViewSurface>,
    pub buffer: RwSignal<EditBuffer>,
    pub breadcrumbs: RwSignal<Vec<PageRef>>,
    pub linked_pages: RwSignal<Vec<PageRef>>,
    pub available_parents: RwSignal<Vec<PageRef>>,
    pub reading_time: RwSignal<usize>,
    pub loading: RwSignal<bool>,

    /// Load guard: results of a superseded load are dropped.
    load_ticket: RwSignal<u64>,

    /// Live visual widget, present only while it is mounted.
    widget: StoredValue<Option<Arc<dyn ContentSource>>>,
}

impl<B: DocBackend> Clone for DocViewer<B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B: DocBackend> Copy for DocViewer<B> {}

impl<B: DocBackend> DocViewer<B> {
    pub fn new(backend: Arc<B>, notifications: Notifications) -> Self {
        Self {
            backend: StoredValue::new(backend),
            notifications,
            doc: RwSignal::new(None),
            target_id: RwSignal::new(None),
            mode: RwSignal::new(ViewerMode::Viewing),
            surface: RwSignal::new(ViewSurface::Rendered),
            buffer: RwSignal::new(EditBuffer::default()),
            breadcrumbs: RwSignal::new(vec![]),
            linked_pages: RwSignal::new(vec![]),
            available_parents: RwSignal::new(vec![]),
            reading_time: RwSignal::new(0),
            loading: RwSignal::new(false),
            load_ticket: RwSignal::new(0),
            widget: StoredValue::new(None),
        }
    }

    fn backend(&self) -> Arc<B> {
        self.backend.get_value()
    }

    pub fn current_id(&self) -> Option<DocId> {
        self.doc.with_untracked(|d| d.as_ref().map(|d| d.id))
    }

    fn next_ticket(&self) -> u64 {
        let t = self.load_ticket.get_untracked().wrapping_add(1);
        self.load_ticket.set(t);
        t
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.load_ticket.get_untracked() == ticket
    }

    pub fn register_widget(&self, widget: Arc<dyn ContentSource>) {
        self.widget.set_value(Some(widget));
    }

    pub fn clear_widget(&self) {
        self.widget.set_value(None);
    }

    #[cfg(test)]
    pub fn has_widget(&self) -> bool {
        self.widget.with_value(|w| w.is_some())
    }

    /// Latest HTML: the live widget if mounted, else the buffer.
    fn live_html(&self) -> String {
        match self.widget.get_value() {
            Some(w) => w.snapshot().into_html(),
            None => self.buffer.with_untracked(|b| b.html.clone()),
        }
    }

    pub async fn load_parents(&self) {
        match self.backend().list_pages().await {
            Ok(pages) => self.available_parents.set(pages),
            Err(e) => tracing::error!(error = %e, "loading parent pages failed"),
        }
    }

    async fn fetch(&self, id: DocId) -> RpcResult<Option<LoadedDoc>> {
        let backend = self.backend();

        // Reconcile with the backing file before reading.
        backend.sync_from_disk(id).await?;

        let Some(mut doc) = backend.read_document(id).await? else {
            return Ok(None);
        };
        let breadcrumbs = backend.breadcrumbs(id).await?;
        let linked_pages = if doc.linked_page_ids.is_empty() {
            vec![]
        } else {
            backend.read_page_refs(&doc.linked_page_ids).await?
        };

        doc.body_html = clean_html_fragment(&doc.body_html);

        Ok(Some(LoadedDoc {
            doc,
            breadcrumbs,
            linked_pages,
        }))
    }

    /// Load `id` into the view copy, entering edit mode afterwards when `force_edit`.
    pub async fn load(&self, id: Option<DocId>, force_edit: bool) {
        if self.mode.get_untracked().is_editing() {
            if self.current_id() == id {
                // Reselecting the page being edited keeps the edit and its lock.
                return;
            }
            self.release_held_lock().await;
        }
        let ticket = self.next_ticket();

        self.mode.set(ViewerMode::Viewing);
        self.clear_widget();
        self.target_id.set(id);

        let Some(id) = id else {
            self.doc.set(None);
            self.loading.set(false);
            return;
        };

        self.loading.set(true);
        let result = self.fetch(id).await;

        if !self.is_current(ticket) {
            tracing::debug!(doc_id = id, "dropping superseded load");
            return;
        }

        match result {
            Ok(Some(loaded)) => {
                self.reading_time
                    .set(reading_time_minutes(&loaded.doc.content_md));
                self.buffer.set(EditBuffer::from_document(&loaded.doc));
                self.breadcrumbs.set(loaded.breadcrumbs);
                self.linked_pages.set(loaded.linked_pages);
                self.doc.set(Some(loaded.doc));
                self.loading.set(false);

                if force_edit {
                    self.enter_edit().await;
                }
            }
            Ok(None) => {
                tracing::warn!(doc_id = id, "document not found");
                self.notifications.info("This page no longer exists");
                self.doc.set(None);
                self.loading.set(false);
            }
            Err(e) => {
                tracing::error!(doc_id = id, error = %e, "loading document failed");
                if self.current_id() == Some(id) {
                    self.notifications.danger("Failed to load document");
                } else {
                    // Never leave the previous page actionable under the new selection.
                    self.doc.set(None);
                    self.breadcrumbs.set(vec![]);
                    self.linked_pages.set(vec![]);
                    self.buffer.set(EditBuffer::default());
                }
                self.loading.set(false);
            }
        }
    }

    pub async fn toggle_edit(&self) {
        if self.mode.get_untracked().is_editing() {
            self.cancel_edit().await;
        } else {
            self.enter_edit().await;
        }
    }

    pub async fn enter_edit(&self) {
        if self.mode.get_untracked().is_editing() {
            return;
        }
        let Some(doc) = self.doc.get_untracked() else {
            return;
        };

        let ticket = self.load_ticket.get_untracked();
        self.loading.set(true);
        let outcome = self.backend().acquire_lock(doc.id).await;
        self.loading.set(false);

        match outcome {
            Ok(lock) if lock.success => {
                if !self.is_current(ticket) || self.target_id.get_untracked() != Some(doc.id) {
                    // Another page was requested while waiting for the lock.
                    if let Err(e) = self.backend().release_lock(doc.id).await {
                        tracing::warn!(doc_id = doc.id, error = %e, "releasing stale lock failed");
                    }
                    return;
                }

                // Fresh strings from the view copy; the two never share storage.
                self.buffer.set(EditBuffer::from_document(&doc));
                self.clear_widget();
                self.mode.set(ViewerMode::EditingVisual);
                self.load_parents().await;
            }
            Ok(lock) => {
                let holder = lock
                    .locked_by
                    .unwrap_or_else(|| "another user".to_string());
                self.notifications
                    .danger(format!("Document is locked by {holder}"));
            }
            Err(e) => {
                tracing::error!(doc_id = doc.id, error = %e, "acquiring lock failed");
                self.notifications
                    .danger("Could not lock the document for editing");
            }
        }
    }

    /// Leave edit mode without saving. No conversion is involved.
    pub async fn cancel_edit(&self) {
        if !self.mode.get_untracked().is_editing() {
            return;
        }

        if let Some(id) = self.current_id() {
            if let Err(e) = self.backend().release_lock(id).await {
                tracing::warn!(doc_id = id, error = %e, "releasing lock failed");
                self.notifications
                    .warning("Could not release the document lock");
            }
        }

        self.clear_widget();
        self.mode.set(ViewerMode::Viewing);
        let fresh = self
            .doc
            .with_untracked(|d| d.as_ref().map(EditBuffer::from_document))
            .unwrap_or_default();
        self.buffer.set(fresh);
    }

    /// Best-effort release when the page goes away mid-edit.
    pub async fn release_held_lock(&self) {
        if !self.mode.get_untracked().is_editing() {
            return;
        }
        if let Some(id) = self.current_id() {
            if let Err(e) = self.backend().release_lock(id).await {
                tracing::warn!(doc_id = id, error = %e, "releasing lock on leave failed");
            }
        }
    }

    /// Visual ⇄ markdown. In viewing mode only the read-only surface flips.
    pub async fn toggle_view_mode(&self) {
        match self.mode.get_untracked() {
            ViewerMode::Viewing => {
                self.surface.update(|s| {
                    *s = match s {
                        ViewSurface::Rendered => ViewSurface::Source,
                        ViewSurface::Source => ViewSurface::Rendered,
                    }
                });
            }
            ViewerMode::EditingVisual | ViewerMode::EditingCode => {
                let html = self.live_html();
                self.loading.set(true);
                match self.backend().html_to_markdown(&html).await {
                    Ok(markdown) => {
                        self.buffer.update(|b| {
                            b.html = html;
                            b.markdown = markdown;
                        });
                        self.clear_widget();
                        self.mode.set(ViewerMode::EditingMarkdown);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "html to markdown conversion failed");
                        self.notifications
                            .warning("Failed to sync content between modes");
                    }
                }
                self.loading.set(false);
            }
            ViewerMode::EditingMarkdown => {
                let markdown = self.buffer.with_untracked(|b| b.markdown.clone());
                self.loading.set(true);
                match self.backend().markdown_to_html(&markdown).await {
                    Ok(html) => {
                        self.buffer.update(|b| b.html = html);
                        self.mode.set(ViewerMode::EditingVisual);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "markdown to html conversion failed");
                        self.notifications
                            .warning("Failed to sync content between modes");
                    }
                }
                self.loading.set(false);
            }
        }
    }

    /// Visual ⇄ raw HTML. Leaving visual pulls the widget content and drops the widget.
    pub fn toggle_code_view(&self) {
        match self.mode.get_untracked() {
            ViewerMode::EditingVisual => {
                if let Some(w) = self.widget.get_value() {
                    let html = w.snapshot().into_html();
                    self.buffer.update(|b| b.html = html);
                }
                self.clear_widget();
                self.mode.set(ViewerMode::EditingCode);
            }
            ViewerMode::EditingCode => self.mode.set(ViewerMode::EditingVisual),
            ViewerMode::Viewing | ViewerMode::EditingMarkdown => {}
        }
    }

    pub fn on_widget_change(&self, content: EditorContent) {
        if self.mode.get_untracked() != ViewerMode::EditingVisual {
            return;
        }
        let html = content.into_html();
        self.buffer.update(|b| b.html = html);
    }

    pub fn set_markdown(&self, markdown: String) {
        self.buffer.update(|b| b.markdown = markdown);
    }

    pub fn set_code(&self, html: String) {
        self.buffer.update(|b| b.html = html);
    }

    pub fn set_title(&self, title: String) {
        self.buffer.update(|b| b.title = title);
    }

    pub fn set_parent(&self, parent_id: Option<DocId>) {
        self.buffer.update(|b| b.parent_id = parent_id);
    }

    /// Parent choices for the edit form; a page cannot be its own parent.
    pub fn parent_choices(&self) -> Vec<PageRef> {
        let own = self.doc.with(|d| d.as_ref().map(|d| d.id));
        self.available_parents
            .get()
            .into_iter()
            .filter(|p| Some(p.id) != own)
            .collect()
    }

    async fn resolve_content(&self) -> RpcResult<String> {
        if self.mode.get_untracked() == ViewerMode::EditingMarkdown {
            let markdown = self.buffer.with_untracked(|b| b.markdown.clone());
            self.backend().markdown_to_html(&markdown).await
        } else {
            Ok(self.live_html())
        }
    }

    async fn persist(&self, id: DocId) -> RpcResult<()> {
        let backend = self.backend();
        let content = self.resolve_content().await?;
        let buf = self.buffer.get_untracked();

        backend
            .write_page(
                id,
                &PageWrite {
                    name: buf.title,
                    body_html: content.clone(),
                    parent_id: buf.parent_id,
                },
            )
            .await?;
        self.buffer.update(|b| b.html = content);

        backend.release_lock(id).await?;
        backend.sync_to_disk(id).await?;
        Ok(())
    }

    /// Write the buffer back, release the lock, sync to disk and reload.
    ///
    /// Returns `true` when the document was saved.
    pub async fn save(&self) -> bool {
        if !self.mode.get_untracked().is_editing() {
            return false;
        }
        let Some(id) = self.current_id() else {
            return false;
        };

        self.loading.set(true);
        match self.persist(id).await {
            Ok(()) => {
                self.clear_widget();
                self.mode.set(ViewerMode::Viewing);
                self.load(Some(id), false).await;
                self.notifications.success("Document saved successfully");
                self.loading.set(false);
                true
            }
            Err(e) => {
                tracing::error!(doc_id = id, error = %e, "saving document failed");
                self.notifications.danger("Failed to save document");
                self.loading.set(false);
                false
            }
        }
    }

    /// Unlink the current page. Confirmation happens in the view.
    pub async fn delete_page(&self) -> bool {
        let Some(doc) = self.doc.get_untracked() else {
            return false;
        };
        let prev_target = self.target_id.get_untracked();
        let prev_mode = self.mode.get_untracked();

        // Clear first so nothing reloads the id being deleted.
        self.next_ticket();
        self.doc.set(None);
        self.target_id.set(None);
        self.mode.set(ViewerMode::Viewing);
        self.clear_widget();

        match self.backend().delete_page(doc.id).await {
            Ok(()) => {
                self.notifications.success("Document deleted");
                true
            }
            Err(e) => {
                tracing::error!(doc_id = doc.id, error = %e, "deleting document failed");
                self.notifications.danger("Failed to delete document");
                self.doc.set(Some(doc));
                self.target_id.set(prev_target);
                self.mode.set(prev_mode);
                false
            }
        }
    }

    pub async fn set_icon(&self, icon: String) -> bool {
        let icon = icon.trim().to_string();
        if icon.is_empty() {
            return false;
        }
        let Some(id) = self.current_id() else {
            return false;
        };

        match self.backend().set_icon(id, &icon).await {
            Ok(()) => {
                self.load(Some(id), false).await;
                true
            }
            Err(e) => {
                tracing::error!(doc_id = id, error = %e, "updating icon failed");
                self.notifications.danger("Failed to update icon");
                false
            }
        }
    }

    /// Manual reconcile from the backing file. Returns `true` when the page was refreshed.
    pub async fn refresh_from_disk(&self) -> bool {
        let Some(id) = self.current_id() else {
            return false;
        };

        self.loading.set(true);
        let synced = match self.backend().sync_from_disk(id).await {
            Ok(true) => {
                self.notifications.success("Updated from disk");
                self.load(Some(id), false).await;
                true
            }
            Ok(false) => {
                self.notifications.warning("Could not read file from disk");
                false
            }
            Err(e) => {
                tracing::error!(doc_id = id, error = %e, "sync from disk failed");
                self.notifications.danger("Sync failed");
                false
            }
        };
        self.loading.set(false);
        synced
    }

    pub fn markdown_for_clipboard(&self) -> Option<String> {
        self.doc
            .with_untracked(|d| d.as_ref().map(|d| d.content_md.clone()))
            .filter(|md| !md.is_empty())
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use crate::notify::NoticeKind;
    use crate::testing::{doc, FakeBackend};
    use crate::models::LockOutcome;

    fn viewer_with(backend: FakeBackend) -> (DocViewer<FakeBackend>, Arc<FakeBackend>, Notifications) {
        let backend = Arc::new(backend);
        let notifications = Notifications::new();
        (DocViewer::new(backend.clone(), notifications), backend, notifications)
    }

    struct Snapshot(String);

    impl ContentSource for Snapshot {
        fn snapshot(&self) -> EditorContent {
            EditorContent::Fragment(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_load_syncs_then_reads_and_cleans_body() {
        let mut d = doc(1, "Runbook");
        d.body_html = "<html><body><p>Hi</p></body></html>".to_string();
        d.content_md = vec!["w"; 401].join(" ");
        d.linked_page_ids = vec![2];
        let (viewer, backend, _) = viewer_with(FakeBackend::with_docs(vec![d, doc(2, "Linked")]));

        viewer.load(Some(1), false).await;

        let calls = backend.calls();
        assert_eq!(calls[0], "action_sync_from_disk(1)");
        assert_eq!(calls[1], "read(1)");
        assert!(calls.contains(&"get_breadcrumbs(1)".to_string()));

        let loaded = viewer.doc.get_untracked().expect("doc loaded");
        assert_eq!(loaded.body_html, "<p>Hi</p>");
        assert_eq!(viewer.reading_time.get_untracked(), 3);
        assert_eq!(viewer.linked_pages.get_untracked()[0].name, "Linked");
        assert_eq!(viewer.mode.get_untracked(), ViewerMode::Viewing);
        assert!(!viewer.loading.get_untracked());
    }

    #[tokio::test]
    async fn test_lock_conflict_keeps_viewing_and_names_holder() {
        let backend = FakeBackend::with_docs(vec![doc(1, "Runbook")]);
        backend.set_lock(LockOutcome {
            success: false,
            locked_by: Some("Marc Demo".to_string()),
        });
        let (viewer, _, notifications) = viewer_with(backend);
        viewer.load(Some(1), false).await;

        viewer.toggle_edit().await;

        assert_eq!(viewer.mode.get_untracked(), ViewerMode::Viewing);
        let toasts = notifications.snapshot();
        assert_eq!(toasts.last().unwrap().message, "Document is locked by Marc Demo");
        assert_eq!(toasts.last().unwrap().kind, NoticeKind::Danger);
    }

    #[tokio::test]
    async fn test_edit_buffer_is_independent_of_view_copy() {
        let mut d = doc(1, "Runbook");
        d.body_html = "<p>original</p>".to_string();
        let (viewer, _, _) = viewer_with(FakeBackend::with_docs(vec![d]));
        viewer.load(Some(1), false).await;
        viewer.enter_edit().await;
        assert_eq!(viewer.mode.get_untracked(), ViewerMode::EditingVisual);

        viewer.on_widget_change(EditorContent::Fragment("<p>edited</p>".to_string()));
        viewer.set_title("Renamed".to_string());

        assert_eq!(viewer.buffer.get_untracked().html, "<p>edited</p>");
        let view_copy = viewer.doc.get_untracked().unwrap();
        assert_eq!(view_copy.body_html, "<p>original</p>");
        assert_eq!(view_copy.name, "Runbook");
    }

    #[tokio::test]
    async fn test_cancel_restores_view_without_conversion() {
        let mut d = doc(1, "Runbook");
        d.body_html = "<p>exact <b>html</b></p>".to_string();
        let (viewer, backend, _) = viewer_with(FakeBackend::with_docs(vec![d]));
        viewer.load(Some(1), false).await;
        viewer.enter_edit().await;
        viewer.on_widget_change(EditorContent::Raw("<p>scratch</p>".to_string()));
        viewer.set_markdown("scratch".to_string());

        viewer.toggle_edit().await;

        assert_eq!(viewer.mode.get_untracked(), ViewerMode::Viewing);
        assert_eq!(viewer.doc.get_untracked().unwrap().body_html, "<p>exact <b>html</b></p>");
        assert_eq!(viewer.buffer.get_untracked().html, "<p>exact <b>html</b></p>");
        let calls = backend.calls();
        assert!(calls.iter().all(|c| !c.starts_with("action_convert")));
        assert_eq!(calls.last().unwrap(), "action_release_lock(1)");
    }

    #[tokio::test]
    async fn test_visual_markdown_round_trip_uses_live_widget() {
        let (viewer, backend, _) = viewer_with(FakeBackend::with_docs(vec![doc(1, "Runbook")]));
        backend.set_converters("**md**", "<h1>{not a string}</h1>");
        viewer.load(Some(1), false).await;
        viewer.enter_edit().await;
        viewer.register_widget(Arc::new(Snapshot("<p>live</p>".to_string())));

        viewer.toggle_view_mode().await;
        assert_eq!(viewer.mode.get_untracked(), ViewerMode::EditingMarkdown);
        assert_eq!(viewer.buffer.get_untracked().markdown, "**md**");
        assert_eq!(viewer.buffer.get_untracked().html, "<p>live</p>");
        assert!(backend.calls().contains(&"action_convert_html_to_md(<p>live</p>)".to_string()));
        assert!(!viewer.has_widget());

        viewer.toggle_view_mode().await;
        assert_eq!(viewer.mode.get_untracked(), ViewerMode::EditingVisual);
        assert_eq!(viewer.buffer.get_untracked().html, "<h1>{not a string}</h1>");
    }

    #[tokio::test]
    async fn test_failed_conversion_keeps_mode() {
        let (viewer, backend, notifications) =
            viewer_with(FakeBackend::with_docs(vec![doc(1, "Runbook")]));
        viewer.load(Some(1), false).await;
        viewer.enter_edit().await;
        backend.fail("action_convert_html_to_md");

        viewer.toggle_view_mode().await;

        assert_eq!(viewer.mode.get_untracked(), ViewerMode::EditingVisual);
        assert_eq!(notifications.snapshot().last().unwrap().kind, NoticeKind::Warning);
        assert!(!viewer.loading.get_untracked());
    }

    #[tokio::test]
    async fn test_code_view_pulls_widget_and_drops_it() {
        let (viewer, backend, _) = viewer_with(FakeBackend::with_docs(vec![doc(1, "Runbook")]));
        viewer.load(Some(1), false).await;
        viewer.enter_edit().await;
        viewer.register_widget(Arc::new(Snapshot("<html><body><p>w</p></body></html>".to_string())));

        viewer.toggle_code_view();
        assert_eq!(viewer.mode.get_untracked(), ViewerMode::EditingCode);
        assert!(!viewer.has_widget());
        assert_eq!(viewer.buffer.get_untracked().html, "<p>w</p>");

        viewer.set_code("<p>typed</p>".to_string());
        assert!(viewer.save().await);
        assert!(backend.calls().contains(&"write(1, <p>typed</p>)".to_string()));
    }

    #[tokio::test]
    async fn test_save_in_markdown_converts_then_writes_releases_syncs_reloads() {
        let (viewer, backend, notifications) =
            viewer_with(FakeBackend::with_docs(vec![doc(1, "Runbook")]));
        backend.set_converters("# md", "<p>from md</p>");
        viewer.load(Some(1), false).await;
        viewer.enter_edit().await;
        viewer.toggle_view_mode().await;
        viewer.set_markdown("edited".to_string());
        viewer.set_title("Runbook v2".to_string());
        backend.clear_calls();

        assert!(viewer.save().await);

        let calls = backend.calls();
        assert_eq!(
            &calls[..5],
            &[
                "action_convert_md_to_html(edited)".to_string(),
                "write(1, <p>from md</p>)".to_string(),
                "action_release_lock(1)".to_string(),
                "action_sync_to_disk(1)".to_string(),
                "action_sync_from_disk(1)".to_string(),
            ]
        );
        assert_eq!(viewer.mode.get_untracked(), ViewerMode::Viewing);
        assert_eq!(viewer.doc.get_untracked().unwrap().name, "Runbook v2");
        assert_eq!(notifications.snapshot().last().unwrap().message, "Document saved successfully");
    }

    #[tokio::test]
    async fn test_failed_save_stays_in_edit() {
        let (viewer, backend, notifications) =
            viewer_with(FakeBackend::with_docs(vec![doc(1, "Runbook")]));
        viewer.load(Some(1), false).await;
        viewer.enter_edit().await;
        viewer.on_widget_change(EditorContent::Raw("<p>draft</p>".to_string()));
        backend.fail("write");

        assert!(!viewer.save().await);

        assert_eq!(viewer.mode.get_untracked(), ViewerMode::EditingVisual);
        assert_eq!(viewer.buffer.get_untracked().html, "<p>draft</p>");
        assert_eq!(notifications.snapshot().last().unwrap().message, "Failed to save document");
        assert!(!backend.calls().contains(&"action_release_lock(1)".to_string()));
    }

    #[tokio::test]
    async fn test_superseded_load_is_discarded() {
        let backend = FakeBackend::with_docs(vec![doc(1, "Slow"), doc(2, "Fast")]);
        backend.make_slow(1);
        let (viewer, _, _) = viewer_with(backend);

        tokio::join!(viewer.load(Some(1), false), viewer.load(Some(2), false));

        assert_eq!(viewer.doc.get_untracked().unwrap().name, "Fast");
        assert_eq!(viewer.target_id.get_untracked(), Some(2));
        assert!(!viewer.loading.get_untracked());
    }

    #[tokio::test]
    async fn test_load_error_only_reported_while_current() {
        let backend = FakeBackend::with_docs(vec![doc(2, "Fast")]);
        backend.make_slow(1);
        backend.fail("read(1)");
        let (viewer, backend, notifications) = viewer_with(backend);

        tokio::join!(viewer.load(Some(1), false), viewer.load(Some(2), false));
        assert!(notifications.snapshot().is_empty());

        backend.fail("read(2)");
        viewer.load(Some(2), false).await;
        assert_eq!(notifications.snapshot().last().unwrap().message, "Failed to load document");
        assert_eq!(viewer.current_id(), Some(2));
    }

    #[tokio::test]
    async fn test_failed_load_of_other_page_clears_previous_one() {
        let backend = FakeBackend::with_docs(vec![doc(1, "Shown")]);
        backend.fail("read(2)");
        let (viewer, _, notifications) = viewer_with(backend);
        viewer.load(Some(1), false).await;

        viewer.load(Some(2), false).await;

        assert!(notifications.snapshot().is_empty());
        assert_eq!(viewer.current_id(), None);
        assert!(viewer.breadcrumbs.get_untracked().is_empty());
        viewer.enter_edit().await;
        assert_eq!(viewer.mode.get_untracked(), ViewerMode::Viewing);
    }

    #[tokio::test]
    async fn test_reselecting_page_mid_edit_keeps_edit_and_lock() {
        let (viewer, backend, _) = viewer_with(FakeBackend::with_docs(vec![doc(1, "A")]));
        viewer.load(Some(1), false).await;
        viewer.enter_edit().await;
        viewer.on_widget_change(EditorContent::Fragment("<p>unsaved</p>".to_string()));
        backend.clear_calls();

        viewer.load(Some(1), false).await;

        assert_eq!(viewer.mode.get_untracked(), ViewerMode::EditingVisual);
        assert_eq!(viewer.buffer.get_untracked().html, "<p>unsaved</p>");
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_selecting_other_page_while_lock_pending_releases_it() {
        let backend = FakeBackend::with_docs(vec![doc(1, "A"), doc(2, "B")]);
        backend.make_slow_call("action_acquire_lock(1)");
        backend.make_slow(2);
        let (viewer, backend, _) = viewer_with(backend);
        viewer.load(Some(1), false).await;

        tokio::join!(viewer.enter_edit(), viewer.load(Some(2), false));

        assert_eq!(viewer.mode.get_untracked(), ViewerMode::Viewing);
        assert_eq!(viewer.current_id(), Some(2));
        let calls = backend.calls();
        assert!(calls.contains(&"action_release_lock(1)".to_string()));
        assert!(!calls.contains(&"action_acquire_lock(2)".to_string()));

        backend.clear_calls();
        assert!(!viewer.save().await);
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_force_edit_enters_edit_after_load() {
        let (viewer, backend, _) = viewer_with(FakeBackend::with_docs(vec![doc(1, "New Page")]));
        viewer.load(Some(1), true).await;
        assert_eq!(viewer.mode.get_untracked(), ViewerMode::EditingVisual);
        assert!(backend.calls().contains(&"action_acquire_lock(1)".to_string()));
    }

    #[tokio::test]
    async fn test_switching_documents_mid_edit_releases_lock() {
        let (viewer, backend, _) =
            viewer_with(FakeBackend::with_docs(vec![doc(1, "A"), doc(2, "B")]));
        viewer.load(Some(1), false).await;
        viewer.enter_edit().await;

        viewer.load(Some(2), false).await;

        assert!(backend.calls().contains(&"action_release_lock(1)".to_string()));
        assert_eq!(viewer.mode.get_untracked(), ViewerMode::Viewing);
    }

    #[tokio::test]
    async fn test_delete_failure_restores_document() {
        let (viewer, backend, notifications) =
            viewer_with(FakeBackend::with_docs(vec![doc(1, "Keep")]));
        viewer.load(Some(1), false).await;
        backend.fail("unlink");

        assert!(!viewer.delete_page().await);
        assert_eq!(viewer.doc.get_untracked().unwrap().name, "Keep");
        assert_eq!(notifications.snapshot().last().unwrap().message, "Failed to delete document");

        backend.clear_failures();
        assert!(viewer.delete_page().await);
        assert!(viewer.doc.get_untracked().is_none());
    }

    #[tokio::test]
    async fn test_refresh_from_disk_outcomes() {
        let (viewer, backend, notifications) =
            viewer_with(FakeBackend::with_docs(vec![doc(1, "Runbook")]));
        viewer.load(Some(1), false).await;

        backend.set_disk_sync(false);
        assert!(!viewer.refresh_from_disk().await);
        assert_eq!(notifications.snapshot().last().unwrap().message, "Could not read file from disk");

        backend.set_disk_sync(true);
        assert!(viewer.refresh_from_disk().await);
        assert_eq!(notifications.snapshot().last().unwrap().message, "Updated from disk");
    }

    #[tokio::test]
    async fn test_parent_choices_exclude_self() {
        let (viewer, _, _) =
            viewer_with(FakeBackend::with_docs(vec![doc(1, "A"), doc(2, "B")]));
        viewer.load(Some(1), false).await;
        viewer.enter_edit().await;
        let ids: Vec<DocId> = viewer.parent_choices().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[tokio::test]
    async fn test_clipboard_markdown_requires_content() {
        let mut d = doc(1, "A");
        d.content_md = String::new();
        let (viewer, _, _) = viewer_with(FakeBackend::with_docs(vec![d]));
        viewer.load(Some(1), false).await;
        assert!(viewer.markdown_for_clipboard().is_none());
    }
}
