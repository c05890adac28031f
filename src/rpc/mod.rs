use crate::models::{
    DocId, Document, LockOutcome, NewPage, PageRef, PageWrite, Permission, SearchHit,
    SessionInfo, ShareGrant, TreeNode, UserHit, Visibility,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

pub(crate) const PAGE_MODEL: &str = "doc.page";
pub(crate) const SHARE_MODEL: &str = "doc.share";
pub(crate) const USER_MODEL: &str = "res.users";

/// Type-ahead cap for the user directory.
pub(crate) const USER_SEARCH_LIMIT: u32 = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum RpcErrorKind {
    Network,
    Http,
    Server,
    SessionExpired,
    Parse,
}

#[derive(Clone, Debug, Error)]
#[error("{message}")]
pub(crate) struct RpcError {
    pub kind: RpcErrorKind,
    pub message: String,
}

impl RpcError {
    fn network(e: reqwest::Error) -> Self {
        Self {
            kind: RpcErrorKind::Network,
            message: e.to_string(),
        }
    }

    pub(crate) fn parse(e: impl std::fmt::Display) -> Self {
        Self {
            kind: RpcErrorKind::Parse,
            message: e.to_string(),
        }
    }

    fn http(status: reqwest::StatusCode, body: String) -> Self {
        Self {
            kind: RpcErrorKind::Http,
            message: format!("Request failed ({status}): {body}"),
        }
    }

    pub(crate) fn server(message: impl Into<String>) -> Self {
        Self {
            kind: RpcErrorKind::Server,
            message: message.into(),
        }
    }

    fn session_expired() -> Self {
        Self {
            kind: RpcErrorKind::SessionExpired,
            message: "Session expired".to_string(),
        }
    }

    pub fn is_session_expired(&self) -> bool {
        self.kind == RpcErrorKind::SessionExpired
    }
}

pub(crate) type RpcResult<T> = Result<T, RpcError>;

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Serialize, Debug)]
struct JsonRpcRequest<'a, P: Serialize> {
    jsonrpc: &'static str,
    method: &'static str,
    params: &'a P,
    id: u64,
}

#[derive(Serialize, Debug)]
pub(crate) struct CallKwParams<'a> {
    pub model: &'a str,
    pub method: &'a str,
    pub args: Value,
    pub kwargs: Value,
}

#[derive(Deserialize, Debug)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcErrorBody>,
}

#[derive(Deserialize, Debug)]
struct JsonRpcErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<JsonRpcErrorData>,
}

#[derive(Deserialize, Debug)]
struct JsonRpcErrorData {
    #[serde(default)]
    name: String,
    #[serde(default)]
    message: String,
}

/// Turn a raw JSON-RPC envelope into the `result` payload or a typed error.
pub(crate) fn unwrap_envelope(data: Value) -> RpcResult<Value> {
    let resp: JsonRpcResponse = serde_json::from_value(data).map_err(RpcError::parse)?;

    if let Some(err) = resp.error {
        let (name, detail) = err
            .data
            .map(|d| (d.name, d.message))
            .unwrap_or_default();

        if name.ends_with("SessionExpiredException") {
            return Err(RpcError::session_expired());
        }

        let message = if detail.trim().is_empty() {
            err.message
        } else {
            detail
        };
        return Err(RpcError::server(message));
    }

    Ok(resp.result.unwrap_or(Value::Null))
}

/// Converter endpoints may answer with anything; the edit buffer only ever holds text.
pub(crate) fn coerce_text(v: Value) -> String {
    match v {
        Value::String(s) => s,
        Value::Null | Value::Bool(false) => String::new(),
        other => other.to_string(),
    }
}

/// Search domains are lists of `[field, operator, value]` triples.
pub(crate) fn domain(terms: &[(&str, &str, Value)]) -> Value {
    Value::Array(
        terms
            .iter()
            .map(|(f, op, v)| json!([f, op, v]))
            .collect(),
    )
}

/// Remote object client for the `/web/dataset/call_kw` JSON-RPC surface.
#[derive(Clone, Debug)]
pub(crate) struct OrmClient {
    pub(crate) base_url: String,
    pub(crate) db: Option<String>,
}

impl OrmClient {
    pub fn new(base_url: String, db: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            db,
        }
    }

    pub fn from_config(cfg: &crate::config::EnvConfig) -> Self {
        Self::new(cfg.api_url.clone(), cfg.db.clone())
    }

    pub(crate) fn call_kw_path(model: &str, method: &str) -> String {
        format!("/web/dataset/call_kw/{model}/{method}")
    }

    async fn post_json_rpc<P: Serialize>(&self, path: &str, params: &P) -> RpcResult<Value> {
        let client = reqwest::Client::new();
        let url = format!("{}{}", self.base_url, path);
        let body = JsonRpcRequest {
            jsonrpc: "2.0",
            method: "call",
            params,
            id: NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed),
        };

        let res = client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(RpcError::network)?;

        if res.status().is_success() {
            let data: Value = res.json().await.map_err(RpcError::parse)?;
            unwrap_envelope(data)
        } else {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            Err(RpcError::http(status, body))
        }
    }

    pub async fn call_kw(
        &self,
        model: &str,
        method: &str,
        args: Value,
        kwargs: Value,
    ) -> RpcResult<Value> {
        tracing::debug!(model, method, "call_kw");
        let params = CallKwParams {
            model,
            method,
            args,
            kwargs,
        };
        self.post_json_rpc(&Self::call_kw_path(model, method), &params)
            .await
    }

    pub async fn call(&self, model: &str, method: &str, args: Value) -> RpcResult<Value> {
        self.call_kw(model, method, args, json!({})).await
    }

    pub async fn read<T: serde::de::DeserializeOwned>(
        &self,
        model: &str,
        ids: &[i64],
        fields: &[&str],
    ) -> RpcResult<Vec<T>> {
        let data = self.call(model, "read", json!([ids, fields])).await?;
        serde_json::from_value(data).map_err(RpcError::parse)
    }

    pub async fn search_read<T: serde::de::DeserializeOwned>(
        &self,
        model: &str,
        domain: Value,
        fields: &[&str],
        limit: Option<u32>,
    ) -> RpcResult<Vec<T>> {
        let mut kwargs = json!({ "fields": fields });
        if let Some(limit) = limit {
            kwargs["limit"] = json!(limit);
        }
        let data = self
            .call_kw(model, "search_read", json!([domain]), kwargs)
            .await?;
        serde_json::from_value(data).map_err(RpcError::parse)
    }

    /// Returns the new record id.
    pub async fn create(&self, model: &str, vals: Value) -> RpcResult<i64> {
        let data = self.call(model, "create", json!([[vals]])).await?;

        // Batch create answers with a list of ids; older servers answer with a bare id.
        data.as_array()
            .and_then(|ids| ids.first())
            .and_then(|v| v.as_i64())
            .or_else(|| data.as_i64())
            .ok_or_else(|| RpcError::parse(format!("create returned no id: {data}")))
    }

    pub async fn write(&self, model: &str, ids: &[i64], vals: Value) -> RpcResult<()> {
        self.call(model, "write", json!([ids, vals])).await?;
        Ok(())
    }

    pub async fn unlink(&self, model: &str, ids: &[i64]) -> RpcResult<()> {
        self.call(model, "unlink", json!([ids])).await?;
        Ok(())
    }

    pub async fn authenticate(&self, db: &str, login: &str, password: &str) -> RpcResult<SessionInfo> {
        let data = self
            .post_json_rpc(
                "/web/session/authenticate",
                &json!({ "db": db, "login": login, "password": password }),
            )
            .await?;
        serde_json::from_value(data).map_err(RpcError::parse)
    }

    pub async fn session_info(&self) -> RpcResult<SessionInfo> {
        let data = self
            .post_json_rpc("/web/session/get_session_info", &json!({}))
            .await?;
        serde_json::from_value(data).map_err(RpcError::parse)
    }
}

/// Typed backend surface the controllers are written against.
///
/// `OrmClient` speaks it over the wire; tests provide an in-memory fake.
pub(crate) trait DocBackend: Send + Sync + 'static {
    async fn sync_from_disk(&self, id: DocId) -> RpcResult<bool>;
    async fn sync_all_from_disk(&self) -> RpcResult<()>;
    async fn sync_to_disk(&self, id: DocId) -> RpcResult<()>;

    async fn nav_tree(&self) -> RpcResult<Vec<TreeNode>>;
    async fn breadcrumbs(&self, id: DocId) -> RpcResult<Vec<PageRef>>;

    async fn html_to_markdown(&self, html: &str) -> RpcResult<String>;
    async fn markdown_to_html(&self, markdown: &str) -> RpcResult<String>;

    async fn acquire_lock(&self, id: DocId) -> RpcResult<LockOutcome>;
    async fn release_lock(&self, id: DocId) -> RpcResult<()>;

    async fn read_document(&self, id: DocId) -> RpcResult<Option<Document>>;
    async fn read_page_refs(&self, ids: &[DocId]) -> RpcResult<Vec<PageRef>>;
    async fn list_pages(&self) -> RpcResult<Vec<PageRef>>;
    async fn search_pages(&self, term: &str) -> RpcResult<Vec<SearchHit>>;
    async fn create_page(&self, page: &NewPage) -> RpcResult<DocId>;
    async fn write_page(&self, id: DocId, vals: &PageWrite) -> RpcResult<()>;
    async fn set_icon(&self, id: DocId, icon: &str) -> RpcResult<()>;
    async fn delete_page(&self, id: DocId) -> RpcResult<()>;

    async fn read_visibility(&self, id: DocId) -> RpcResult<Visibility>;
    async fn set_visibility(&self, id: DocId, visibility: Visibility) -> RpcResult<()>;
    async fn list_shares(&self, id: DocId) -> RpcResult<Vec<ShareGrant>>;
    async fn create_share(&self, id: DocId, user_id: i64, permission: Permission) -> RpcResult<i64>;
    async fn update_share(&self, share_id: i64, permission: Permission) -> RpcResult<()>;
    async fn delete_share(&self, share_id: i64) -> RpcResult<()>;
    async fn search_users(&self, term: &str) -> RpcResult<Vec<UserHit>>;
}

#[derive(Deserialize)]
struct VisibilityRow {
    #[serde(default)]
    visibility: Visibility,
}

impl DocBackend for OrmClient {
    async fn sync_from_disk(&self, id: DocId) -> RpcResult<bool> {
        let v = self.call(PAGE_MODEL, "action_sync_from_disk", json!([id])).await?;
        Ok(v.as_bool().unwrap_or(false))
    }

    async fn sync_all_from_disk(&self) -> RpcResult<()> {
        self.call(PAGE_MODEL, "sync_all_from_disk", json!([])).await?;
        Ok(())
    }

    async fn sync_to_disk(&self, id: DocId) -> RpcResult<()> {
        self.call(PAGE_MODEL, "action_sync_to_disk", json!([id])).await?;
        Ok(())
    }

    async fn nav_tree(&self) -> RpcResult<Vec<TreeNode>> {
        let v = self.call(PAGE_MODEL, "get_nav_tree", json!([])).await?;
        serde_json::from_value(v).map_err(RpcError::parse)
    }

    async fn breadcrumbs(&self, id: DocId) -> RpcResult<Vec<PageRef>> {
        let v = self.call(PAGE_MODEL, "get_breadcrumbs", json!([id])).await?;
        serde_json::from_value(v).map_err(RpcError::parse)
    }

    async fn html_to_markdown(&self, html: &str) -> RpcResult<String> {
        let v = self
            .call(PAGE_MODEL, "action_convert_html_to_md", json!([html]))
            .await?;
        Ok(coerce_text(v))
    }

    async fn markdown_to_html(&self, markdown: &str) -> RpcResult<String> {
        let v = self
            .call(PAGE_MODEL, "action_convert_md_to_html", json!([markdown]))
            .await?;
        Ok(coerce_text(v))
    }

    async fn acquire_lock(&self, id: DocId) -> RpcResult<LockOutcome> {
        let v = self.call(PAGE_MODEL, "action_acquire_lock", json!([id])).await?;
        serde_json::from_value(v).map_err(RpcError::parse)
    }

    async fn release_lock(&self, id: DocId) -> RpcResult<()> {
        self.call(PAGE_MODEL, "action_release_lock", json!([id])).await?;
        Ok(())
    }

    async fn read_document(&self, id: DocId) -> RpcResult<Option<Document>> {
        let mut rows: Vec<Document> = self.read(PAGE_MODEL, &[id], Document::FIELDS).await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    async fn read_page_refs(&self, ids: &[DocId]) -> RpcResult<Vec<PageRef>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        self.read(PAGE_MODEL, ids, &["id", "name"]).await
    }

    async fn list_pages(&self) -> RpcResult<Vec<PageRef>> {
        self.search_read(PAGE_MODEL, json!([]), &["id", "name"], None)
            .await
    }

    async fn search_pages(&self, term: &str) -> RpcResult<Vec<SearchHit>> {
        self.search_read(
            PAGE_MODEL,
            domain(&[("name", "ilike", json!(term))]),
            &["id", "name", "parent_id"],
            None,
        )
        .await
    }

    async fn create_page(&self, page: &NewPage) -> RpcResult<DocId> {
        let vals = serde_json::to_value(page).map_err(RpcError::parse)?;
        self.create(PAGE_MODEL, vals).await
    }

    async fn write_page(&self, id: DocId, vals: &PageWrite) -> RpcResult<()> {
        self.write(PAGE_MODEL, &[id], vals.to_vals()).await
    }

    async fn set_icon(&self, id: DocId, icon: &str) -> RpcResult<()> {
        self.write(PAGE_MODEL, &[id], json!({ "icon": icon })).await
    }

    async fn delete_page(&self, id: DocId) -> RpcResult<()> {
        self.unlink(PAGE_MODEL, &[id]).await
    }

    async fn read_visibility(&self, id: DocId) -> RpcResult<Visibility> {
        let rows: Vec<VisibilityRow> = self.read(PAGE_MODEL, &[id], &["visibility"]).await?;
        rows.into_iter()
            .next()
            .map(|r| r.visibility)
            .ok_or_else(|| RpcError::server(format!("Document {id} not found")))
    }

    async fn set_visibility(&self, id: DocId, visibility: Visibility) -> RpcResult<()> {
        self.write(PAGE_MODEL, &[id], json!({ "visibility": visibility }))
            .await
    }

    async fn list_shares(&self, id: DocId) -> RpcResult<Vec<ShareGrant>> {
        self.search_read(
            SHARE_MODEL,
            domain(&[("page_id", "=", json!(id))]),
            &["user_id", "permission"],
            None,
        )
        .await
    }

    async fn create_share(&self, id: DocId, user_id: i64, permission: Permission) -> RpcResult<i64> {
        self.create(
            SHARE_MODEL,
            json!({ "page_id": id, "user_id": user_id, "permission": permission }),
        )
        .await
    }

    async fn update_share(&self, share_id: i64, permission: Permission) -> RpcResult<()> {
        self.write(SHARE_MODEL, &[share_id], json!({ "permission": permission }))
            .await
    }

    async fn delete_share(&self, share_id: i64) -> RpcResult<()> {
        self.unlink(SHARE_MODEL, &[share_id]).await
    }

    async fn search_users(&self, term: &str) -> RpcResult<Vec<UserHit>> {
        // Only portal/external accounts can be granted per-document access.
        self.search_read(
            USER_MODEL,
            domain(&[("name", "ilike", json!(term)), ("share", "=", json!(true))]),
            &["id", "name", "email"],
            Some(USER_SEARCH_LIMIT),
        )
        .await
    }
}
