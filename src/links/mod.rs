use crate::models::DocId;
use std::collections::BTreeMap;

/// Client action that opens the studio.
pub(crate) const STUDIO_ACTION: &str = "odoo_doc_studio.action_doc_studio";
/// Registry tag the studio component is known by in the hosting web client.
pub(crate) const STUDIO_TAG: &str = "odoo_doc_studio.DocStudio";
/// Backend list view for bulk management.
pub(crate) const PAGE_LIST_ACTION: &str = "odoo_doc_studio.action_doc_page_list";
pub(crate) const REPORT_NAME: &str = "odoo_doc_studio.report_doc_page_template";

/// `#action=<name>&active_id=<id>` as used in shareable links.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct DeepLink {
    pub action: Option<String>,
    pub active_id: Option<DocId>,
}

impl DeepLink {
    pub fn studio(id: DocId) -> Self {
        Self {
            action: Some(STUDIO_ACTION.to_string()),
            active_id: Some(id),
        }
    }

    /// Parse a location hash (with or without the leading `#`).
    ///
    /// Unknown keys are ignored; a non-numeric `active_id` is dropped.
    pub fn parse(hash: &str) -> Self {
        let mut out = Self::default();
        let hash = hash.trim().trim_start_matches('#');

        for pair in hash.split('&') {
            let Some((k, v)) = pair.split_once('=') else {
                continue;
            };
            let v = urlencoding::decode(v)
                .map(|c| c.into_owned())
                .unwrap_or_else(|_| v.to_string());
            match k {
                "action" if !v.is_empty() => out.action = Some(v),
                "active_id" => out.active_id = v.trim().parse().ok(),
                _ => {}
            }
        }

        out
    }

    pub fn to_hash(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(a) = &self.action {
            parts.push(format!("action={}", urlencoding::encode(a)));
        }
        if let Some(id) = self.active_id {
            parts.push(format!("active_id={id}"));
        }
        format!("#{}", parts.join("&"))
    }

    /// Absolute link into the hosting web client.
    pub fn to_web_url(&self, origin: &str) -> String {
        format!("{}/web{}", origin.trim_end_matches('/'), self.to_hash())
    }
}

pub(crate) fn print_url(base_url: &str, id: DocId) -> String {
    format!("{}/report/pdf/{REPORT_NAME}/{id}", base_url.trim_end_matches('/'))
}

pub(crate) fn page_list_url(base_url: &str) -> String {
    DeepLink {
        action: Some(PAGE_LIST_ACTION.to_string()),
        active_id: None,
    }
    .to_web_url(base_url)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ActionRoute {
    /// Rendered by this app.
    Studio,
    /// Handled by the backend web client; the app only links to it.
    Backend,
}

/// Action name → route table, owned by the app shell and built once at start-up.
#[derive(Clone, Debug, Default)]
pub(crate) struct ActionTable {
    routes: BTreeMap<String, ActionRoute>,
}

impl ActionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut t = Self::new();
        t.register(STUDIO_ACTION, ActionRoute::Studio);
        t.register(STUDIO_TAG, ActionRoute::Studio);
        t.register(PAGE_LIST_ACTION, ActionRoute::Backend);
        t
    }

    pub fn register(&mut self, action: &str, route: ActionRoute) {
        self.routes.insert(action.to_string(), route);
    }

    pub fn resolve(&self, action: &str) -> Option<ActionRoute> {
        self.routes.get(action).copied()
    }

    /// Studio deep-link id carried by `link`, if its action belongs to the studio.
    ///
    /// A link without an action still counts; the studio is the default view.
    pub fn studio_target(&self, link: &DeepLink) -> Option<DocId> {
        let route = match &link.action {
            Some(a) => self.resolve(a)?,
            None => ActionRoute::Studio,
        };
        match route {
            ActionRoute::Studio => link.active_id,
            ActionRoute::Backend => None,
        }
    }
}
