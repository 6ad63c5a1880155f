//! Composable studio projects
//!
//! A project is bound to one content type and, through its settings, to an
//! environment and a locale. Problems are reported only: a project cannot be
//! repaired by dropping the binding, so fix mode leaves the file untouched.

use serde_json::Value;
use tracing::warn;

use super::RunContext;
use crate::collector::Collector;
use crate::error::Result;
use crate::index::{collection_items, paths, ReferenceIndex};
use crate::io::read_json;
use crate::path::TreePath;
use crate::record::{MissingRef, MissingRefs, Owner};

/// A project binding and whether it resolves
struct Binding {
    pointer: &'static str,
    uid: &'static str,
    name: &'static str,
    exists: fn(&ReferenceIndex, &str) -> bool,
}

const BINDINGS: [Binding; 3] = [
    Binding {
        pointer: "/contentTypeUid",
        uid: "contentTypeUid",
        name: "Content type",
        exists: ReferenceIndex::has_content_type,
    },
    Binding {
        pointer: "/settings/configuration/environment",
        uid: "environment",
        name: "Environment",
        exists: ReferenceIndex::has_environment,
    },
    Binding {
        pointer: "/settings/configuration/locale",
        uid: "locale",
        name: "Locale",
        exists: ReferenceIndex::has_locale,
    },
];

pub fn run(ctx: &mut RunContext<'_>) -> Result<Collector> {
    let path = ctx.base.join(paths::COMPOSABLE_STUDIO);
    let mut collector = Collector::new();
    if !path.is_file() {
        warn!("{} not found, skipping composable studio", path.display());
        return Ok(collector);
    }

    let value: Value = read_json(&path)?;
    for project in projects(&value) {
        let uid = project.get("uid").and_then(Value::as_str).unwrap_or_default();
        let name = project.get("name").and_then(Value::as_str).unwrap_or(uid);
        let owner = Owner::new(uid, name);
        collector.begin(uid);

        let records = validate(ctx.index, &owner, project);
        ctx.progress.tick(records.is_empty(), uid, None);
        collector.extend(uid, records);
    }

    if ctx.fix && !collector.is_empty() {
        warn!("Composable studio projects are reported only and were not changed");
    }
    collector.finalize();
    Ok(collector)
}

/// A single project object or a collection of them
fn projects(value: &Value) -> Vec<&Value> {
    if value.get("uid").is_some() {
        vec![value]
    } else {
        collection_items(value).map(|(_, project)| project).collect()
    }
}

fn validate(index: &ReferenceIndex, owner: &Owner, project: &Value) -> Vec<MissingRef> {
    BINDINGS
        .iter()
        .filter_map(|binding| {
            let target = project.pointer(binding.pointer)?.as_str()?;
            if (binding.exists)(index, target) {
                return None;
            }
            let tree = TreePath::root().join(binding.uid, binding.name);
            Some(MissingRef::new(
                owner,
                &tree,
                binding.uid,
                binding.name,
                MissingRefs::list([target]),
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::testing::{read, run_module, write};
    use crate::modules::Module;
    use serde_json::json;

    #[test]
    fn test_project_bindings_are_report_only() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), paths::CONTENT_TYPES, json!([{"uid": "page", "schema": []}]));
        write(dir.path(), paths::ENVIRONMENTS, json!([{"uid": "env1"}]));
        let project = json!({
            "uid": "p1",
            "name": "Landing",
            "contentTypeUid": "gone",
            "settings": {"configuration": {"environment": "env1", "locale": "xx-xx"}}
        });
        write(dir.path(), paths::COMPOSABLE_STUDIO, project.clone());

        let collector = run_module(dir.path(), Module::ComposableStudio, true);
        let missing: Vec<String> = collector
            .get("p1")
            .unwrap()
            .iter()
            .map(|r| r.missing_refs.to_string())
            .collect();
        assert_eq!(missing, vec!["gone", "xx-xx"]);
        assert!(collector.records().all(|r| !r.is_fixed()));
        assert_eq!(read(dir.path(), paths::COMPOSABLE_STUDIO), project);
    }
}
