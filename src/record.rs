//! Missing reference records
//!
//! One record per offending field occurrence. The serialized field names are
//! the report's column names.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::path::TreePath;

/// Message used when a global field has no nested schema
pub const EMPTY_SCHEMA: &str = "Empty schema found";

/// Message used when a global field points at an unknown definition
pub const MISSING_GLOBAL_FIELD: &str = "Referred Global Field Does not Exist";

/// What was missing: a list of dangling identifiers or a descriptive message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MissingRefs {
    List(Vec<String>),
    Message(String),
}

impl MissingRefs {
    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MissingRefs::List(items.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for MissingRefs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingRefs::List(items) => write!(f, "{}", items.join(", ")),
            MissingRefs::Message(message) => write!(f, "{}", message),
        }
    }
}

/// Set on a record only when a repair actually happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FixStatus {
    Fixed,
}

impl fmt::Display for FixStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixStatus::Fixed => write!(f, "Fixed"),
        }
    }
}

/// The root entity a record belongs to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Owner {
    pub uid: String,
    pub name: String,
    pub content_type_uid: Option<String>,
    pub locale: Option<String>,
}

impl Owner {
    pub fn new(uid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Owner of an entry or variant: carries its content type and locale
    pub fn entry(
        uid: impl Into<String>,
        name: impl Into<String>,
        content_type_uid: impl Into<String>,
        locale: impl Into<String>,
    ) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
            content_type_uid: Some(content_type_uid.into()),
            locale: Some(locale.into()),
        }
    }
}

/// A single missing reference record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingRef {
    pub tree: TreePath,
    #[serde(rename = "treeStr")]
    pub tree_str: String,
    pub data_type: String,
    pub display_name: String,
    #[serde(rename = "missingRefs")]
    pub missing_refs: MissingRefs,
    #[serde(rename = "ownerUid")]
    pub owner_uid: String,
    #[serde(rename = "ownerName")]
    pub owner_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type_uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(rename = "fixStatus", default, skip_serializing_if = "Option::is_none")]
    pub fix_status: Option<FixStatus>,
    #[serde(rename = "fixMessage", default, skip_serializing_if = "Option::is_none")]
    pub fix_message: Option<String>,
}

impl MissingRef {
    pub fn new(
        owner: &Owner,
        tree: &TreePath,
        data_type: impl Into<String>,
        display_name: impl Into<String>,
        missing_refs: MissingRefs,
    ) -> Self {
        Self {
            tree_str: tree.render(),
            tree: tree.clone(),
            data_type: data_type.into(),
            display_name: display_name.into(),
            missing_refs,
            owner_uid: owner.uid.clone(),
            owner_name: owner.name.clone(),
            content_type_uid: owner.content_type_uid.clone(),
            locale: owner.locale.clone(),
            fix_status: None,
            fix_message: None,
        }
    }

    /// Mark the record as repaired
    pub fn fixed(mut self) -> Self {
        self.fix_status = Some(FixStatus::Fixed);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.fix_message = Some(message.into());
        self
    }

    /// Drop the repair mark when the fix was never written
    pub fn unfix(&mut self) {
        self.fix_status = None;
        self.fix_message = None;
    }

    pub fn is_fixed(&self) -> bool {
        self.fix_status.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_serializes_report_columns() {
        let owner = Owner::new("page", "Page");
        let tree = TreePath::root().join("page", "Page").join("related", "Related");
        let record = MissingRef::new(&owner, &tree, "reference", "Related", MissingRefs::list(["page_0"]));
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["treeStr"], json!("Page ➜ Related"));
        assert_eq!(value["missingRefs"], json!(["page_0"]));
        assert_eq!(value["ownerUid"], json!("page"));
        assert!(value.get("fixStatus").is_none());

        let value = serde_json::to_value(record.fixed()).unwrap();
        assert_eq!(value["fixStatus"], json!("Fixed"));
    }

    #[test]
    fn test_message_refs_serialize_as_string() {
        let value = serde_json::to_value(MissingRefs::Message(EMPTY_SCHEMA.to_string())).unwrap();
        assert_eq!(value, json!("Empty schema found"));
    }
}
