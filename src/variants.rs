//! Entry variant validators
//!
//! Two narrow validators for entry variants:
//!
//! - [`PublishValidator`] checks `publish_details` rows: the environment and
//!   locale must exist and, for variants, the row must agree with the
//!   variant's own uid and locale. Entries and assets reuse it without the
//!   variant constraints.
//! - [`ReferenceValidator`] follows the dotted paths declared in
//!   `_variant._change_set` and checks every embedded `{uid, _content_type_uid}`
//!   object, then checks the `_metadata.references` index. An index row whose
//!   `path` no longer resolves is reported separately from a row whose target
//!   entry is missing.

use serde_json::{Map, Value};

use crate::checks::Checks;
use crate::fixer::Fixed;
use crate::index::ReferenceIndex;
use crate::path::TreePath;
use crate::record::{MissingRef, MissingRefs, Owner};

pub const PUBLISH_DETAILS: &str = "publish_details";
pub const CHANGE_SET: &str = "_change_set";
pub const VARIANT: &str = "_variant";
pub const METADATA: &str = "_metadata";
pub const REFERENCES: &str = "references";

/// Uid a variant is identified by (`_variant._uid`)
pub fn variant_uid(variant: &Map<String, Value>) -> Option<&str> {
    variant.get(VARIANT)?.get("_uid")?.as_str()
}

/// What a publish row must agree with
#[derive(Debug, Clone, Copy, Default)]
pub struct PublishScope<'s> {
    /// Locale the entity was exported under
    pub locale: Option<&'s str>,
    /// Uid of the variant the rows belong to
    pub variant_uid: Option<&'s str>,
}

/// Validates `publish_details` rows
#[derive(Debug, Clone, Copy)]
pub struct PublishValidator<'a> {
    index: &'a ReferenceIndex,
}

impl<'a> PublishValidator<'a> {
    pub fn new(index: &'a ReferenceIndex) -> Self {
        Self { index }
    }

    /// Reasons a single row is invalid; empty when the row is fine
    pub fn row_problems(&self, row: &Value, scope: PublishScope<'_>) -> Vec<String> {
        let mut problems = Vec::new();

        match row.get("environment").and_then(Value::as_str) {
            Some(env) if self.index.has_environment(env) => {}
            Some(env) => problems.push(format!("environment:{}", env)),
            None => problems.push("environment:<missing>".to_string()),
        }

        match row.get("locale").and_then(Value::as_str) {
            Some(code) if !self.index.has_locale(code) => problems.push(format!("locale:{}", code)),
            Some(code) => {
                if let Some(expected) = scope.locale {
                    if code != expected {
                        problems.push(format!("locale:{} (expected {})", code, expected));
                    }
                }
            }
            None => problems.push("locale:<missing>".to_string()),
        }

        if let (Some(expected), Some(found)) = (
            scope.variant_uid,
            row.get("variant_uid").and_then(Value::as_str),
        ) {
            if found != expected {
                problems.push(format!("variant:{}", found));
            }
        }
        problems
    }

    pub fn validate(
        &self,
        owner: &Owner,
        path: &TreePath,
        entity: &Map<String, Value>,
        scope: PublishScope<'_>,
    ) -> Vec<MissingRef> {
        let here = publish_path(path);
        publish_rows(entity)
            .iter()
            .map(|row| self.row_problems(row, scope))
            .filter(|problems| !problems.is_empty())
            .map(|problems| publish_record(owner, &here, problems))
            .collect()
    }

    /// Drop invalid rows
    pub fn fix(
        &self,
        owner: &Owner,
        path: &TreePath,
        mut entity: Map<String, Value>,
        scope: PublishScope<'_>,
    ) -> Fixed<Map<String, Value>> {
        let here = publish_path(path);
        let mut records = Vec::new();
        if let Some(Value::Array(rows)) = entity.get_mut(PUBLISH_DETAILS) {
            rows.retain(|row| {
                let problems = self.row_problems(row, scope);
                if problems.is_empty() {
                    return true;
                }
                records.push(
                    publish_record(owner, &here, problems)
                        .fixed()
                        .with_message("Removed publish details row"),
                );
                false
            });
        }
        Fixed { value: entity, records }
    }
}

fn publish_rows(entity: &Map<String, Value>) -> &[Value] {
    entity
        .get(PUBLISH_DETAILS)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn publish_path(path: &TreePath) -> TreePath {
    path.join(PUBLISH_DETAILS, "Publish details")
}

fn publish_record(owner: &Owner, here: &TreePath, problems: Vec<String>) -> MissingRef {
    MissingRef::new(owner, here, PUBLISH_DETAILS, "Publish details", MissingRefs::List(problems))
}

/// Validates references carried by a variant's change set
#[derive(Debug, Clone, Copy)]
pub struct ReferenceValidator<'a> {
    checks: Checks<'a>,
}

/// Verdict on one `_metadata.references` row
#[derive(Debug, Clone, PartialEq, Eq)]
enum RowVerdict {
    Valid,
    PathNotFound(String),
    Missing(String),
}

impl<'a> ReferenceValidator<'a> {
    pub fn new(checks: Checks<'a>) -> Self {
        Self { checks }
    }

    pub fn validate(&self, owner: &Owner, path: &TreePath, variant: &Map<String, Value>) -> Vec<MissingRef> {
        let root = Value::Object(variant.clone());
        let mut records = Vec::new();

        for change in change_set(variant) {
            let mut missing = Vec::new();
            for reached in resolve(&root, &segments(&change)) {
                self.collect_dangling(reached, &mut missing);
            }
            if !missing.is_empty() {
                records.push(change_record(owner, path, &change, MissingRefs::List(missing)));
            }
        }

        for (row, verdict) in self.metadata_verdicts(&root) {
            if let Some(record) = metadata_record(owner, path, &row, &verdict) {
                records.push(record);
            }
        }
        records
    }

    /// Remove dangling inline references and invalid index rows
    pub fn fix(&self, owner: &Owner, path: &TreePath, variant: Map<String, Value>) -> Fixed<Map<String, Value>> {
        let mut root = Value::Object(variant);
        // Index rows are judged against the variant as it was exported
        let exported = self.metadata_verdicts(&root);
        let changes = root.as_object().map(change_set).unwrap_or_default();
        let mut records = Vec::new();

        for change in changes {
            let mut missing = Vec::new();
            let segs = segments(&change);
            if let Some((last, parents)) = segs.split_last() {
                for parent in resolve_mut(&mut root, parents) {
                    self.prune_at(parent, last, &mut missing);
                }
            }
            if !missing.is_empty() {
                records.push(
                    change_record(owner, path, &change, MissingRefs::List(missing))
                        .fixed()
                        .with_message("Removed dangling references"),
                );
            }
        }

        // A valid row whose path was pruned away would dangle on the next run
        let verdicts: Vec<(Value, RowVerdict)> = exported
            .into_iter()
            .map(|(row, verdict)| match verdict {
                RowVerdict::Valid if !path_resolves(&root, declared_path(&row)) => {
                    let declared = declared_path(&row).to_string();
                    (row, RowVerdict::PathNotFound(declared))
                }
                other => (row, other),
            })
            .collect();

        if let Some(Value::Array(rows)) = root
            .get_mut(METADATA)
            .and_then(|m| m.get_mut(REFERENCES))
        {
            let mut verdicts = verdicts.into_iter();
            rows.retain(|_| {
                let Some((row, verdict)) = verdicts.next() else { return true };
                match metadata_record(owner, path, &row, &verdict) {
                    Some(record) => {
                        records.push(record.fixed().with_message("Removed reference index row"));
                        false
                    }
                    None => true,
                }
            });
        }

        let value = match root {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Fixed { value, records }
    }

    fn metadata_verdicts(&self, root: &Value) -> Vec<(Value, RowVerdict)> {
        let rows = root
            .get(METADATA)
            .and_then(|m| m.get(REFERENCES))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        rows.into_iter()
            .map(|row| {
                let declared = declared_path(&row);
                let verdict = if !path_resolves(root, declared) {
                    RowVerdict::PathNotFound(declared.to_string())
                } else if let Some(uid) = self.checks.dangling_entry(&row) {
                    RowVerdict::Missing(uid)
                } else {
                    RowVerdict::Valid
                };
                (row, verdict)
            })
            .collect()
    }

    fn collect_dangling(&self, value: &Value, missing: &mut Vec<String>) {
        if is_reference(value) {
            if let Some(uid) = self.checks.dangling_entry(value) {
                missing.push(uid);
            }
            return;
        }
        match value {
            Value::Array(items) => items.iter().for_each(|i| self.collect_dangling(i, missing)),
            Value::Object(map) => map.values().for_each(|v| self.collect_dangling(v, missing)),
            _ => {}
        }
    }

    /// Prune `parent[key]`, removing it outright if it is itself dangling
    fn prune_at(&self, parent: &mut Value, key: &str, missing: &mut Vec<String>) {
        let Value::Object(map) = parent else { return };
        let Some(target) = map.get_mut(key) else { return };
        if is_reference(target) {
            if let Some(uid) = self.checks.dangling_entry(target) {
                missing.push(uid);
                map.remove(key);
            }
            return;
        }
        self.prune(target, missing);
    }

    fn prune(&self, value: &mut Value, missing: &mut Vec<String>) {
        match value {
            Value::Array(items) => {
                items.retain(|item| match is_reference(item).then(|| self.checks.dangling_entry(item)).flatten() {
                    Some(uid) => {
                        missing.push(uid);
                        false
                    }
                    None => true,
                });
                items.iter_mut().for_each(|i| self.prune(i, missing));
            }
            Value::Object(map) => {
                let dangling: Vec<String> = map
                    .iter()
                    .filter(|(_, v)| is_reference(v))
                    .filter_map(|(k, v)| self.checks.dangling_entry(v).map(|uid| (k.clone(), uid)))
                    .map(|(k, uid)| {
                        missing.push(uid);
                        k
                    })
                    .collect();
                for key in dangling {
                    map.remove(&key);
                }
                map.values_mut().for_each(|v| self.prune(v, missing));
            }
            _ => {}
        }
    }
}

fn change_set(variant: &Map<String, Value>) -> Vec<String> {
    variant
        .get(VARIANT)
        .and_then(|v| v.get(CHANGE_SET))
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

fn change_record(owner: &Owner, path: &TreePath, change: &str, missing: MissingRefs) -> MissingRef {
    let here = segments(change)
        .into_iter()
        .fold(path.join(CHANGE_SET, "Change set"), |p, seg| p.join(seg, seg));
    MissingRef::new(owner, &here, "reference", change, missing)
}

fn declared_path(row: &Value) -> &str {
    row.get("path").and_then(Value::as_str).unwrap_or_default()
}

fn path_resolves(root: &Value, declared: &str) -> bool {
    !declared.is_empty() && !resolve(root, &segments(declared)).is_empty()
}

fn metadata_record(owner: &Owner, path: &TreePath, row: &Value, verdict: &RowVerdict) -> Option<MissingRef> {
    let declared = declared_path(row);
    let here = path
        .join(METADATA, METADATA)
        .join(REFERENCES, REFERENCES)
        .join(declared, declared);
    let missing = match verdict {
        RowVerdict::Valid => return None,
        RowVerdict::PathNotFound(p) => MissingRefs::Message(format!("Reference path not found: {}", p)),
        RowVerdict::Missing(uid) => MissingRefs::List(vec![uid.clone()]),
    };
    Some(MissingRef::new(owner, &here, "reference", "_metadata.references", missing))
}

fn is_reference(value: &Value) -> bool {
    value.get("uid").is_some_and(Value::is_string)
        && value.get("_content_type_uid").is_some_and(Value::is_string)
}

fn segments(path: &str) -> Vec<&str> {
    path.split('.').filter(|s| !s.is_empty()).collect()
}

/// Values reached by following `segments`, fanning out over arrays
fn resolve<'v>(value: &'v Value, segments: &[&str]) -> Vec<&'v Value> {
    let Some((first, rest)) = segments.split_first() else {
        return vec![value];
    };
    match value {
        Value::Object(map) => map.get(*first).map(|v| resolve(v, rest)).unwrap_or_default(),
        Value::Array(items) => items.iter().flat_map(|i| resolve(i, segments)).collect(),
        _ => Vec::new(),
    }
}

fn resolve_mut<'v>(value: &'v mut Value, segments: &[&str]) -> Vec<&'v mut Value> {
    let Some((first, rest)) = segments.split_first() else {
        return match value {
            Value::Array(items) => items.iter_mut().collect(),
            other => vec![other],
        };
    };
    match value {
        Value::Object(map) => map.get_mut(*first).map(|v| resolve_mut(v, rest)).unwrap_or_default(),
        Value::Array(items) => items.iter_mut().flat_map(|i| resolve_mut(i, segments)).collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::FieldHandlers;
    use crate::index::EntryMeta;
    use serde_json::json;

    fn index() -> ReferenceIndex {
        ReferenceIndex::default()
            .with_master_locale("en-us")
            .with_environments(["prod"])
            .with_entry(EntryMeta {
                uid: "e1".into(),
                title: "Home".into(),
                content_type_uid: "page".into(),
                locale: "en-us".into(),
            })
    }

    fn variant() -> Map<String, Value> {
        json!({
            "uid": "entry1",
            "_variant": {"_uid": "v1", "_change_set": ["hero.link", "cards"]},
            "hero": {"link": {"uid": "gone", "_content_type_uid": "page"}},
            "cards": [
                {"ref": [{"uid": "e1", "_content_type_uid": "page"}, {"uid": "lost", "_content_type_uid": "page"}]}
            ],
            "publish_details": [
                {"environment": "prod", "locale": "en-us", "variant_uid": "v1"},
                {"environment": "stage", "locale": "en-us", "variant_uid": "v1"},
                {"environment": "prod", "locale": "en-us", "variant_uid": "v2"}
            ],
            "_metadata": {"references": [
                {"uid": "e1", "_content_type_uid": "page", "path": "cards.ref"},
                {"uid": "e1", "_content_type_uid": "page", "path": "old.field"},
                {"uid": "gone", "_content_type_uid": "page", "path": "hero.link"}
            ]}
        })
        .as_object()
        .unwrap()
        .clone()
    }

    fn owner() -> Owner {
        Owner::entry("entry1", "Entry", "page", "en-us")
    }

    #[test]
    fn test_publish_rows_must_agree() {
        let index = index();
        let validator = PublishValidator::new(&index);
        let scope = PublishScope {
            locale: Some("en-us"),
            variant_uid: Some("v1"),
        };
        let records = validator.validate(&owner(), &TreePath::root(), &variant(), scope);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].missing_refs, MissingRefs::list(["environment:stage"]));
        assert_eq!(records[1].missing_refs, MissingRefs::list(["variant:v2"]));

        let fixed = validator.fix(&owner(), &TreePath::root(), variant(), scope);
        assert_eq!(fixed.value[PUBLISH_DETAILS].as_array().unwrap().len(), 1);
        assert!(validator
            .validate(&owner(), &TreePath::root(), &fixed.value, scope)
            .is_empty());
    }

    #[test]
    fn test_change_set_references() {
        let index = index();
        let validator = ReferenceValidator::new(Checks::new(&index, FieldHandlers::ALL, &[]));
        let records = validator.validate(&owner(), &TreePath::root(), &variant());

        let refs: Vec<_> = records.iter().map(|r| r.missing_refs.to_string()).collect();
        assert_eq!(
            refs,
            vec!["gone", "lost", "Reference path not found: old.field", "gone"]
        );
        assert_eq!(records[0].tree_str, "Change set ➜ hero ➜ link");
    }

    #[test]
    fn test_change_set_fix_is_idempotent() {
        let index = index();
        let validator = ReferenceValidator::new(Checks::new(&index, FieldHandlers::ALL, &[]));
        let fixed = validator.fix(&owner(), &TreePath::root(), variant());

        assert_eq!(fixed.records.len(), 4);
        assert!(fixed.value["hero"].get("link").is_none());
        assert_eq!(fixed.value["cards"][0]["ref"].as_array().unwrap().len(), 1);
        assert_eq!(fixed.value[METADATA][REFERENCES].as_array().unwrap().len(), 1);

        let again = validator.fix(&owner(), &TreePath::root(), fixed.value.clone());
        assert!(again.records.is_empty());
        assert!(validator.validate(&owner(), &TreePath::root(), &fixed.value).is_empty());
    }

    #[test]
    fn test_index_row_pruned_with_its_path() {
        let index = index();
        let validator = ReferenceValidator::new(Checks::new(&index, FieldHandlers::ALL, &[]));
        let variant = json!({
            "uid": "entry1",
            "_variant": {"_uid": "v1", "_change_set": ["hero.link"]},
            "hero": {"link": {"uid": "gone", "_content_type_uid": "page"}},
            "_metadata": {"references": [
                {"uid": "e1", "_content_type_uid": "page", "path": "hero.link"}
            ]}
        })
        .as_object()
        .unwrap()
        .clone();

        let first = validator.fix(&owner(), &TreePath::root(), variant);
        let refs: Vec<_> = first.records.iter().map(|r| r.missing_refs.to_string()).collect();
        assert_eq!(refs, vec!["gone", "Reference path not found: hero.link"]);
        assert!(first.value[METADATA][REFERENCES].as_array().unwrap().is_empty());

        let second = validator.fix(&owner(), &TreePath::root(), first.value.clone());
        assert!(second.records.is_empty());
        assert_eq!(second.value, first.value);
    }
}
