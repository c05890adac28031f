use crate::models::DocId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub(crate) const EXPANDED_NODES_KEY: &str = "doc_studio_expanded_nodes";
pub(crate) const LAST_DOC_KEY: &str = "doc_studio_last_doc_id";

fn local_storage() -> Option<web_sys::Storage> {
    web_sys::window().and_then(|w| w.local_storage().ok().flatten())
}

pub(crate) fn load_json_from_storage<T: for<'de> Deserialize<'de>>(key: &str) -> Option<T> {
    let storage = local_storage()?;
    let json = storage.get_item(key).ok().flatten()?;
    serde_json::from_str(&json).ok()
}

pub(crate) fn save_json_to_storage<T: Serialize>(key: &str, value: &T) {
    if let Ok(json) = serde_json::to_string(value) {
        if let Some(storage) = local_storage() {
            let _ = storage.set_item(key, &json);
        }
    }
}

pub(crate) fn load_expanded_nodes() -> BTreeSet<DocId> {
    load_json_from_storage::<BTreeSet<DocId>>(EXPANDED_NODES_KEY).unwrap_or_default()
}

pub(crate) fn save_expanded_nodes(ids: &BTreeSet<DocId>) {
    save_json_to_storage(EXPANDED_NODES_KEY, ids);
}

pub(crate) fn load_last_doc_id() -> Option<DocId> {
    load_json_from_storage::<DocId>(LAST_DOC_KEY)
}

pub(crate) fn save_last_doc_id(id: Option<DocId>) {
    match id {
        Some(id) => save_json_to_storage(LAST_DOC_KEY, &id),
        None => {
            if let Some(storage) = local_storage() {
                let _ = storage.remove_item(LAST_DOC_KEY);
            }
        }
    }
}
