//! Extensions
//!
//! Field extensions may be scoped to a set of content types. An extension
//! whose scope is emptied by fixing is removed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use super::{unknown_content_types, Module, RunContext};
use crate::collector::Collector;
use crate::error::Result;
use crate::index::paths;
use crate::io::Collection;
use crate::path::TreePath;
use crate::record::{MissingRef, MissingRefs, Owner};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extension {
    pub uid: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<ExtensionScope>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionScope {
    #[serde(default)]
    pub content_types: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub fn run(ctx: &mut RunContext<'_>) -> Result<Collector> {
    let path = ctx.base.join(paths::EXTENSIONS);
    let mut collector = Collector::new();
    if !path.is_file() {
        warn!("{} not found, skipping extensions", path.display());
        return Ok(collector);
    }

    let mut extensions: Collection<Extension> = Collection::load(&path)?;
    let tree = TreePath::root()
        .join("scope", "Scope")
        .join("content_types", "Content types");
    let mut removed = Vec::new();

    for extension in extensions.values_mut() {
        collector.begin(&extension.uid);
        let Some(scope) = extension.scope.as_mut() else { continue };

        let missing = unknown_content_types(ctx.index, &scope.content_types);
        ctx.progress.tick(missing.is_empty(), &extension.uid, None);
        if missing.is_empty() {
            continue;
        }

        let owner = Owner::new(&extension.uid, &extension.title);
        let mut record = MissingRef::new(
            &owner,
            &tree,
            "content_types",
            "Content types",
            MissingRefs::List(missing.clone()),
        );
        if ctx.fix {
            scope.content_types.retain(|uid| !missing.contains(uid));
            let message = if scope.content_types.is_empty() {
                removed.push(extension.uid.clone());
                format!("Removed extension {}", extension.uid)
            } else {
                format!("Removed {}", missing.join(", "))
            };
            record = record.fixed().with_message(message);
        }
        collector.push(&extension.uid, record);
    }

    if ctx.fix && !collector.is_empty() {
        extensions.retain(|e| !removed.contains(&e.uid));
        ctx.persist(Module::Extensions, |format| extensions.save(&path, format))?;
    }
    collector.finalize();
    Ok(collector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::testing::{read, run_module, write};
    use serde_json::json;

    #[test]
    fn test_extension_scope() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), paths::CONTENT_TYPES, json!([{"uid": "page", "schema": []}]));
        write(
            dir.path(),
            paths::EXTENSIONS,
            json!([
                {"uid": "x1", "title": "Color", "scope": {"content_types": ["page", "ghost"]}},
                {"uid": "x2", "title": "Map", "scope": {"content_types": ["ghost"]}},
                {"uid": "x3", "title": "Global", "scope": {"content_types": ["$all"]}},
                {"uid": "x4", "title": "Widget"}
            ]),
        );

        let collector = run_module(dir.path(), Module::Extensions, false);
        assert_eq!(collector.owners().collect::<Vec<_>>(), vec!["x1", "x2"]);

        run_module(dir.path(), Module::Extensions, true);
        let written = read(dir.path(), paths::EXTENSIONS);
        let uids: Vec<&str> = written
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["uid"].as_str().unwrap())
            .collect();
        assert_eq!(uids, vec!["x1", "x3", "x4"]);
        assert_eq!(written[0]["scope"]["content_types"], json!(["page"]));
        assert!(run_module(dir.path(), Module::Extensions, false).is_empty());
    }
}
