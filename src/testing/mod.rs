//! In-memory backend for controller tests.

use crate::models::{
    DocId, Document, LockOutcome, NewPage, PageRef, PageWrite, Permission, SearchHit, ShareGrant,
    TreeNode, UserHit, Visibility,
};
use crate::rpc::{DocBackend, RpcError, RpcResult};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

pub(crate) fn doc(id: DocId, name: &str) -> Document {
    Document {
        id,
        name: name.to_string(),
        body_html: format!("<p>{name}</p>"),
        content_md: name.to_string(),
        parent_id: None,
        linked_page_ids: vec![],
        icon: None,
        cover_image: None,
        create_uid: None,
        create_date: None,
        write_uid: None,
        write_date: None,
        locked_by: None,
        visibility: Visibility::Internal,
    }
}

pub(crate) fn child(id: DocId, name: &str, parent: DocId) -> Document {
    let mut d = doc(id, name);
    d.parent_id = Some(PageRef {
        id: parent,
        name: String::new(),
    });
    d
}

pub(crate) fn user(id: i64, name: &str) -> UserHit {
    UserHit {
        id,
        name: name.to_string(),
        email: None,
    }
}

#[derive(Default)]
struct FakeState {
    docs: BTreeMap<DocId, Document>,
    shares: Vec<(DocId, ShareGrant)>,
    users: Vec<UserHit>,
    calls: Vec<String>,
    failures: BTreeSet<String>,
    slow: BTreeSet<String>,
    lock: Option<LockOutcome>,
    md_out: Option<String>,
    html_out: Option<String>,
    disk_sync: Option<bool>,
    next_id: i64,
}

/// Records every call as `method(args)` and answers from in-memory records.
///
/// `fail(key)` makes calls named `key` (or exactly equal to `key`) return a server error.
/// `make_slow_call(call)` yields to the executor a few times before answering,
/// so concurrent requests interleave.
#[derive(Default)]
pub(crate) struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    pub fn with_docs(docs: Vec<Document>) -> Self {
        let backend = Self::default();
        {
            let mut s = backend.lock();
            s.next_id = docs.iter().map(|d| d.id).max().unwrap_or(0) + 1;
            s.docs = docs.into_iter().map(|d| (d.id, d)).collect();
        }
        backend
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn fail(&self, key: &str) {
        self.lock().failures.insert(key.to_string());
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    pub fn make_slow(&self, id: DocId) {
        self.make_slow_call(&format!("read({id})"));
    }

    pub fn make_slow_call(&self, call: &str) {
        self.lock().slow.insert(call.to_string());
    }

    pub fn set_lock(&self, outcome: LockOutcome) {
        self.lock().lock = Some(outcome);
    }

    pub fn set_converters(&self, markdown: &str, html: &str) {
        let mut s = self.lock();
        s.md_out = Some(markdown.to_string());
        s.html_out = Some(html.to_string());
    }

    pub fn set_disk_sync(&self, ok: bool) {
        self.lock().disk_sync = Some(ok);
    }

    pub fn add_users(&self, users: Vec<UserHit>) {
        self.lock().users.extend(users);
    }

    pub fn add_share(&self, page: DocId, grant: ShareGrant) {
        self.lock().shares.push((page, grant));
    }

    async fn record(&self, call: String) -> RpcResult<()> {
        let slow = self.lock().slow.contains(&call);
        if slow {
            for _ in 0..5 {
                tokio::task::yield_now().await;
            }
        }

        let mut s = self.lock();
        let failing = s.failures.iter().any(|key| {
            *key == call || call.starts_with(&format!("{key}("))
        });
        s.calls.push(call.clone());
        if failing {
            Err(RpcError::server(format!("{call} failed")))
        } else {
            Ok(())
        }
    }

    fn build_tree(docs: &BTreeMap<DocId, Document>, parent: Option<DocId>) -> Vec<TreeNode> {
        docs.values()
            .filter(|d| d.parent_id() == parent)
            .map(|d| TreeNode {
                id: d.id,
                name: d.name.clone(),
                file_path: None,
                children: Self::build_tree(docs, Some(d.id)),
            })
            .collect()
    }
}

impl DocBackend for FakeBackend {
    async fn sync_from_disk(&self, id: DocId) -> RpcResult<bool> {
        self.record(format!("action_sync_from_disk({id})")).await?;
        Ok(self.lock().disk_sync.unwrap_or(true))
    }

    async fn sync_all_from_disk(&self) -> RpcResult<()> {
        self.record("sync_all_from_disk".to_string()).await
    }

    async fn sync_to_disk(&self, id: DocId) -> RpcResult<()> {
        self.record(format!("action_sync_to_disk({id})")).await
    }

    async fn nav_tree(&self) -> RpcResult<Vec<TreeNode>> {
        self.record("get_nav_tree".to_string()).await?;
        Ok(Self::build_tree(&self.lock().docs, None))
    }

    async fn breadcrumbs(&self, id: DocId) -> RpcResult<Vec<PageRef>> {
        self.record(format!("get_breadcrumbs({id})")).await?;
        let s = self.lock();
        let mut path = vec![];
        let mut cursor = s.docs.get(&id);
        while let Some(d) = cursor {
            path.insert(
                0,
                PageRef {
                    id: d.id,
                    name: d.name.clone(),
                },
            );
            cursor = d.parent_id().and_then(|p| s.docs.get(&p));
        }
        Ok(path)
    }

    async fn html_to_markdown(&self, html: &str) -> RpcResult<String> {
        self.record(format!("action_convert_html_to_md({html})")).await?;
        Ok(self.lock().md_out.clone().unwrap_or_else(|| html.to_string()))
    }

    async fn markdown_to_html(&self, markdown: &str) -> RpcResult<String> {
        self.record(format!("action_convert_md_to_html({markdown})")).await?;
        Ok(self
            .lock()
            .html_out
            .clone()
            .unwrap_or_else(|| format!("<p>{markdown}</p>")))
    }

    async fn acquire_lock(&self, id: DocId) -> RpcResult<LockOutcome> {
        self.record(format!("action_acquire_lock({id})")).await?;
        Ok(self.lock().lock.clone().unwrap_or(LockOutcome {
            success: true,
            locked_by: None,
        }))
    }

    async fn release_lock(&self, id: DocId) -> RpcResult<()> {
        self.record(format!("action_release_lock({id})")).await
    }

    async fn read_document(&self, id: DocId) -> RpcResult<Option<Document>> {
        self.record(format!("read({id})")).await?;
        Ok(self.lock().docs.get(&id).cloned())
    }

    async fn read_page_refs(&self, ids: &[DocId]) -> RpcResult<Vec<PageRef>> {
        self.record(format!("read_page_refs({ids:?})")).await?;
        let s = self.lock();
        Ok(ids
            .iter()
            .filter_map(|id| s.docs.get(id))
            .map(|d| PageRef {
                id: d.id,
                name: d.name.clone(),
            })
            .collect())
    }

    async fn list_pages(&self) -> RpcResult<Vec<PageRef>> {
        self.record("list_pages".to_string()).await?;
        Ok(self
            .lock()
            .docs
            .values()
            .map(|d| PageRef {
                id: d.id,
                name: d.name.clone(),
            })
            .collect())
    }

    async fn search_pages(&self, term: &str) -> RpcResult<Vec<SearchHit>> {
        self.record(format!("search_pages({term})")).await?;
        let needle = term.to_lowercase();
        Ok(self
            .lock()
            .docs
            .values()
            .filter(|d| d.name.to_lowercase().contains(&needle))
            .map(|d| SearchHit {
                id: d.id,
                name: d.name.clone(),
                parent_id: d.parent_id.clone(),
            })
            .collect())
    }

    async fn create_page(&self, page: &NewPage) -> RpcResult<DocId> {
        self.record(format!("create_page({})", page.name)).await?;
        let mut s = self.lock();
        let id = s.next_id.max(1);
        s.next_id = id + 1;
        let mut d = doc(id, &page.name);
        d.content_md = page.content_md.clone();
        s.docs.insert(id, d);
        Ok(id)
    }

    async fn write_page(&self, id: DocId, vals: &PageWrite) -> RpcResult<()> {
        self.record(format!("write({id}, {})", vals.body_html)).await?;
        let mut s = self.lock();
        if let Some(d) = s.docs.get_mut(&id) {
            d.name = vals.name.clone();
            d.body_html = vals.body_html.clone();
            d.parent_id = vals.parent_id.map(|p| PageRef {
                id: p,
                name: String::new(),
            });
        }
        Ok(())
    }

    async fn set_icon(&self, id: DocId, icon: &str) -> RpcResult<()> {
        self.record(format!("set_icon({id}, {icon})")).await?;
        if let Some(d) = self.lock().docs.get_mut(&id) {
            d.icon = Some(icon.to_string());
        }
        Ok(())
    }

    async fn delete_page(&self, id: DocId) -> RpcResult<()> {
        self.record(format!("unlink({id})")).await?;
        self.lock().docs.remove(&id);
        Ok(())
    }

    async fn read_visibility(&self, id: DocId) -> RpcResult<Visibility> {
        self.record(format!("read_visibility({id})")).await?;
        self.lock()
            .docs
            .get(&id)
            .map(|d| d.visibility)
            .ok_or_else(|| RpcError::server(format!("Document {id} not found")))
    }

    async fn set_visibility(&self, id: DocId, visibility: Visibility) -> RpcResult<()> {
        self.record(format!("set_visibility({id}, {visibility})")).await?;
        if let Some(d) = self.lock().docs.get_mut(&id) {
            d.visibility = visibility;
        }
        Ok(())
    }

    async fn list_shares(&self, id: DocId) -> RpcResult<Vec<ShareGrant>> {
        self.record(format!("list_shares({id})")).await?;
        Ok(self
            .lock()
            .shares
            .iter()
            .filter(|(page, _)| *page == id)
            .map(|(_, g)| g.clone())
            .collect())
    }

    async fn create_share(&self, id: DocId, user_id: i64, permission: Permission) -> RpcResult<i64> {
        self.record(format!("create_share({id}, {user_id}, {permission})"))
            .await?;
        let mut s = self.lock();
        let share_id = s.shares.iter().map(|(_, g)| g.id).max().unwrap_or(0) + 1;
        let name = s
            .users
            .iter()
            .find(|u| u.id == user_id)
            .map(|u| u.name.clone())
            .unwrap_or_default();
        s.shares.push((
            id,
            ShareGrant {
                id: share_id,
                user_id: Some(PageRef { id: user_id, name }),
                permission,
            },
        ));
        Ok(share_id)
    }

    async fn update_share(&self, share_id: i64, permission: Permission) -> RpcResult<()> {
        self.record(format!("update_share({share_id}, {permission})"))
            .await?;
        for (_, g) in self.lock().shares.iter_mut() {
            if g.id == share_id {
                g.permission = permission;
            }
        }
        Ok(())
    }

    async fn delete_share(&self, share_id: i64) -> RpcResult<()> {
        self.record(format!("delete_share({share_id})")).await?;
        self.lock().shares.retain(|(_, g)| g.id != share_id);
        Ok(())
    }

    async fn search_users(&self, term: &str) -> RpcResult<Vec<UserHit>> {
        self.record(format!("search_users({term})")).await?;
        let needle = term.to_lowercase();
        Ok(self
            .lock()
            .users
            .iter()
            .filter(|u| u.name.to_lowercase().contains(&needle))
            .take(crate::rpc::USER_SEARCH_LIMIT as usize)
            .cloned()
            .collect())
    }
}
