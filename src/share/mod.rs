use crate::links::DeepLink;
use crate::models::{DocId, Permission, ShareGrant, UserHit, Visibility};
use crate::notify::Notifications;
use crate::rpc::DocBackend;
use leptos::prelude::*;
use std::sync::Arc;

/// Sharing panel state for one page: visibility, per-user grants, user type-ahead.
pub(crate) struct SharePanel<B: DocBackend> {
    backend: StoredValue<Arc<B>>,
    notifications: Notifications,

    pub page_id: RwSignal<Option<DocId>>,
    pub visibility: RwSignal<Visibility>,
    pub shares: RwSignal<Vec<ShareGrant>>,
    pub search_term: RwSignal<String>,
    pub search_results: RwSignal<Vec<UserHit>>,
    pub loading: RwSignal<bool>,
}

impl<B: DocBackend> Clone for SharePanel<B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B: DocBackend> Copy for SharePanel<B> {}

impl<B: DocBackend> SharePanel<B> {
    pub fn new(backend: Arc<B>, notifications: Notifications) -> Self {
        Self {
            backend: StoredValue::new(backend),
            notifications,
            page_id: RwSignal::new(None),
            visibility: RwSignal::new(Visibility::default()),
            shares: RwSignal::new(vec![]),
            search_term: RwSignal::new(String::new()),
            search_results: RwSignal::new(vec![]),
            loading: RwSignal::new(false),
        }
    }

    fn backend(&self) -> Arc<B> {
        self.backend.get_value()
    }

    /// Point the panel at `id` and load its access data.
    pub async fn open(&self, id: DocId) {
        self.page_id.set(Some(id));
        self.search_term.set(String::new());
        self.search_results.set(vec![]);
        self.reload().await;
    }

    /// Re-read visibility and grants. Failures are logged only.
    pub async fn reload(&self) {
        let Some(id) = self.page_id.get_untracked() else {
            return;
        };
        let backend = self.backend();

        self.loading.set(true);
        let result = async {
            let visibility = backend.read_visibility(id).await?;
            let shares = backend.list_shares(id).await?;
            Ok::<_, crate::rpc::RpcError>((visibility, shares))
        }
        .await;

        if self.page_id.get_untracked() == Some(id) {
            match result {
                Ok((visibility, shares)) => {
                    self.visibility.set(visibility);
                    self.shares.set(shares);
                }
                Err(e) => tracing::error!(doc_id = id, error = %e, "loading share data failed"),
            }
        }
        self.loading.set(false);
    }

    /// Type-ahead over external users. An empty term clears results without a request.
    pub async fn search_users(&self, term: String) {
        self.search_term.set(term.clone());
        if term.is_empty() {
            self.search_results.set(vec![]);
            return;
        }

        match self.backend().search_users(&term).await {
            Ok(users) => {
                // A newer keystroke owns the results now.
                if self.search_term.get_untracked() == term {
                    self.search_results.set(users);
                }
            }
            Err(e) => tracing::error!(error = %e, "user search failed"),
        }
    }

    /// Grant read access to `user`.
    pub async fn add_user(&self, user: UserHit) -> bool {
        let Some(id) = self.page_id.get_untracked() else {
            return false;
        };

        match self.backend().create_share(id, user.id, Permission::Read).await {
            Ok(_) => {
                self.search_term.set(String::new());
                self.search_results.set(vec![]);
                self.reload().await;
                self.notifications
                    .success(format!("Shared with {}", user.name));
                true
            }
            Err(e) => {
                tracing::error!(doc_id = id, user_id = user.id, error = %e, "creating share failed");
                self.notifications.danger("Could not share document");
                false
            }
        }
    }

    pub async fn update_permission(&self, share_id: i64, permission: Permission) -> bool {
        match self.backend().update_share(share_id, permission).await {
            Ok(()) => {
                self.reload().await;
                true
            }
            Err(e) => {
                tracing::error!(share_id, error = %e, "updating permission failed");
                self.notifications.danger("Failed to update permission");
                false
            }
        }
    }

    pub async fn remove_share(&self, share_id: i64) -> bool {
        match self.backend().delete_share(share_id).await {
            Ok(()) => {
                self.reload().await;
                true
            }
            Err(e) => {
                tracing::error!(share_id, error = %e, "removing share failed");
                self.notifications.danger("Failed to remove access");
                false
            }
        }
    }

    pub async fn set_visibility(&self, visibility: Visibility) -> bool {
        let Some(id) = self.page_id.get_untracked() else {
            return false;
        };

        match self.backend().set_visibility(id, visibility).await {
            Ok(()) => {
                self.visibility.set(visibility);
                self.notifications.success("Visibility updated");
                true
            }
            Err(e) => {
                tracing::error!(doc_id = id, error = %e, "updating visibility failed");
                self.notifications.danger("Failed to update visibility");
                false
            }
        }
    }

    /// Shareable deep link into the studio for the open page.
    pub fn share_link(&self, origin: &str) -> Option<String> {
        self.page_id
            .get_untracked()
            .map(|id| DeepLink::studio(id).to_web_url(origin))
    }
}
