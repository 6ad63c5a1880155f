//! Global field schemas
//!
//! Global fields share the content type shape, so this is the content type
//! audit pointed at `globalfields.json`.

use super::content_types::audit_schemas;
use super::{Module, RunContext};
use crate::collector::Collector;
use crate::error::Result;
use crate::index::paths;

pub fn run(ctx: &mut RunContext<'_>) -> Result<Collector> {
    audit_schemas(ctx, Module::GlobalFields, paths::GLOBAL_FIELDS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::testing::{read, run_module, write};
    use crate::record::EMPTY_SCHEMA;
    use serde_json::json;

    #[test]
    fn test_nested_global_field_problems() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            paths::GLOBAL_FIELDS,
            json!([
                {"uid": "seo", "title": "SEO", "schema": [
                    {"uid": "meta", "display_name": "Meta", "data_type": "global_field",
                     "reference_to": "meta", "schema": []}
                ]},
                {"uid": "meta", "title": "Meta", "schema": [
                    {"uid": "title", "display_name": "Title", "data_type": "text"}
                ]}
            ]),
        );

        let collector = run_module(dir.path(), Module::GlobalFields, false);
        let records = collector.get("seo").unwrap();
        assert_eq!(records[0].missing_refs.to_string(), EMPTY_SCHEMA);
        assert_eq!(records[0].tree_str, "Meta");

        run_module(dir.path(), Module::GlobalFields, true);
        let written = read(dir.path(), paths::GLOBAL_FIELDS);
        assert_eq!(written[0]["schema"], json!([]));
        assert!(run_module(dir.path(), Module::GlobalFields, false).is_empty());
    }
}
