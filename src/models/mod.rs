use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

pub(crate) type DocId = i64;

/// `[id, "display name"]` as the backend encodes a many2one value.
///
/// An unset relation arrives as `false`; that is decoded as `None` by
/// [`deserialize_many2one`].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct PageRef {
    pub id: DocId,
    pub name: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Many2oneWire {
    Pair(i64, String),
    Unset(bool),
    Null(()),
}

pub(crate) fn deserialize_many2one<'de, D>(d: D) -> Result<Option<PageRef>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Many2oneWire::deserialize(d)? {
        Many2oneWire::Pair(id, name) => Some(PageRef { id, name }),
        Many2oneWire::Unset(_) | Many2oneWire::Null(_) => None,
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextWire {
    Text(String),
    Unset(bool),
    Null(()),
}

/// Char/Text/Html fields come back as `false` when empty.
pub(crate) fn deserialize_text<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match TextWire::deserialize(d)? {
        TextWire::Text(s) => s,
        TextWire::Unset(_) | TextWire::Null(_) => String::new(),
    })
}

pub(crate) fn deserialize_opt_text<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = deserialize_text(d)?;
    Ok(if s.is_empty() { None } else { Some(s) })
}

#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Display, EnumString,
    AsRefStr, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub(crate) enum Visibility {
    Private,
    #[default]
    Internal,
    Public,
}

impl Visibility {
    pub fn label(self) -> &'static str {
        match self {
            Visibility::Private => "Private",
            Visibility::Internal => "Internal",
            Visibility::Public => "Public",
        }
    }
}

#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Display, EnumString,
    AsRefStr, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub(crate) enum Permission {
    #[default]
    Read,
    Write,
}

impl Permission {
    pub fn label(self) -> &'static str {
        match self {
            Permission::Read => "Viewer",
            Permission::Write => "Editor",
        }
    }
}

/// Full field set of a `doc.page` record as the viewer reads it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub(crate) struct Document {
    pub id: DocId,

    #[serde(default, deserialize_with = "deserialize_text")]
    pub name: String,

    #[serde(default, deserialize_with = "deserialize_text")]
    pub body_html: String,

    #[serde(default, deserialize_with = "deserialize_text")]
    pub content_md: String,

    #[serde(default, deserialize_with = "deserialize_many2one")]
    pub parent_id: Option<PageRef>,

    #[serde(default)]
    pub linked_page_ids: Vec<DocId>,

    #[serde(default, deserialize_with = "deserialize_opt_text")]
    pub icon: Option<String>,

    /// Base64 payload; kept opaque.
    #[serde(default, deserialize_with = "deserialize_opt_text")]
    pub cover_image: Option<String>,

    #[serde(default, deserialize_with = "deserialize_many2one")]
    pub create_uid: Option<PageRef>,
    #[serde(default, deserialize_with = "deserialize_opt_text")]
    pub create_date: Option<String>,
    #[serde(default, deserialize_with = "deserialize_many2one")]
    pub write_uid: Option<PageRef>,
    #[serde(default, deserialize_with = "deserialize_opt_text")]
    pub write_date: Option<String>,

    #[serde(default, deserialize_with = "deserialize_many2one")]
    pub locked_by: Option<PageRef>,

    #[serde(default)]
    pub visibility: Visibility,
}

impl Document {
    pub const FIELDS: &'static [&'static str] = &[
        "name",
        "body_html",
        "content_md",
        "parent_id",
        "linked_page_ids",
        "create_uid",
        "create_date",
        "write_uid",
        "write_date",
        "cover_image",
        "icon",
        "locked_by",
        "visibility",
    ];

    pub fn parent_id(&self) -> Option<DocId> {
        self.parent_id.as_ref().map(|p| p.id)
    }
}

/// One node of `get_nav_tree`; children are nested inline.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct TreeNode {
    pub id: DocId,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_opt_text")]
    pub file_path: Option<String>,
    #[serde(default)]
    pub children: Vec<TreeNode>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct SearchHit {
    pub id: DocId,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_many2one")]
    pub parent_id: Option<PageRef>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct ShareGrant {
    pub id: i64,
    #[serde(default, deserialize_with = "deserialize_many2one")]
    pub user_id: Option<PageRef>,
    #[serde(default)]
    pub permission: Permission,
}

impl ShareGrant {
    pub fn user_name(&self) -> String {
        self.user_id
            .as_ref()
            .map(|u| u.name.clone())
            .unwrap_or_default()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct UserHit {
    pub id: i64,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_opt_text")]
    pub email: Option<String>,
}

/// Result of `action_acquire_lock`. A conflict is a value, not an error.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct LockOutcome {
    #[serde(default)]
    pub success: bool,
    #[serde(default, deserialize_with = "deserialize_opt_text")]
    pub locked_by: Option<String>,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct NewPage {
    pub name: String,
    pub content_md: String,
}

impl Default for NewPage {
    fn default() -> Self {
        Self {
            name: "New Page".to_string(),
            content_md: "# New Page\n\nStart writing...".to_string(),
        }
    }
}

/// Values written on save. `parent_id` serializes as `false` when cleared.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct PageWrite {
    pub name: String,
    pub body_html: String,
    pub parent_id: Option<DocId>,
}

impl PageWrite {
    pub fn to_vals(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "body_html": self.body_html,
            "parent_id": match self.parent_id {
                Some(id) => serde_json::Value::from(id),
                None => serde_json::Value::Bool(false),
            },
        })
    }
}

/// Session details returned by `/web/session/get_session_info`.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub(crate) struct SessionInfo {
    #[serde(default)]
    pub uid: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_opt_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_text")]
    pub db: Option<String>,
}
