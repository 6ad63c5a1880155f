//! Content type field rules
//!
//! A field rule names its operand and target fields by dotted uid paths into
//! the content type schema. Paths descend through groups, global fields and
//! modular blocks (`group.child`, `blocks.block_uid.child`).

use std::collections::BTreeSet;
use tracing::warn;

use super::{Module, RunContext};
use crate::collector::Collector;
use crate::error::Result;
use crate::index::paths;
use crate::io::Collection;
use crate::path::TreePath;
use crate::record::{MissingRef, MissingRefs, Owner};
use crate::schema::{ContentType, FieldRule, SchemaField};

const DATA_TYPE: &str = "field_rules";

pub fn run(ctx: &mut RunContext<'_>) -> Result<Collector> {
    let path = ctx.base.join(paths::CONTENT_TYPES);
    let mut collector = Collector::new();
    if !path.is_file() {
        warn!("{} not found, skipping field rules", path.display());
        return Ok(collector);
    }

    let mut collection: Collection<ContentType> = Collection::load(&path)?;
    let mut changed = false;

    for content_type in collection.values_mut() {
        let Some(rules) = content_type.field_rules.take() else { continue };
        let owner = Owner::new(&content_type.uid, &content_type.title);
        let fields = field_map(&content_type.schema);
        collector.begin(&content_type.uid);

        let records = if ctx.fix {
            let (kept, records) = fix_rules(&owner, &fields, rules);
            changed |= !records.is_empty();
            content_type.field_rules = Some(kept);
            records
        } else {
            let records = validate_rules(&owner, &fields, &rules);
            content_type.field_rules = Some(rules);
            records
        };

        ctx.progress.tick(records.is_empty(), &content_type.uid, None);
        collector.extend(&content_type.uid, records);
    }

    if changed {
        ctx.persist(Module::FieldRules, |format| collection.save(&path, format))?;
    }
    collector.finalize();
    Ok(collector)
}

/// Every addressable dotted uid path of a schema
pub fn field_map(schema: &[SchemaField]) -> BTreeSet<String> {
    let mut map = BTreeSet::new();
    collect(schema, "", &mut map);
    map
}

fn collect(fields: &[SchemaField], prefix: &str, map: &mut BTreeSet<String>) {
    for field in fields {
        let path = format!("{}{}", prefix, field.uid);
        for block in field.block_list() {
            collect(&block.schema, &format!("{}.{}.", path, block.uid), map);
        }
        collect(field.nested(), &format!("{}.", path), map);
        map.insert(path);
    }
}

/// One dangling field reference inside a rule
struct Dangling {
    rule: usize,
    kind: &'static str,
    field: String,
}

fn dangling(fields: &BTreeSet<String>, rules: &[FieldRule]) -> Vec<Dangling> {
    let mut found = Vec::new();
    for (rule, field_rule) in rules.iter().enumerate() {
        for condition in &field_rule.conditions {
            if !fields.contains(&condition.operand_field) {
                found.push(Dangling {
                    rule,
                    kind: "condition",
                    field: condition.operand_field.clone(),
                });
            }
        }
        for action in &field_rule.actions {
            if !fields.contains(&action.target_field) {
                found.push(Dangling {
                    rule,
                    kind: "action",
                    field: action.target_field.clone(),
                });
            }
        }
    }
    found
}

fn record(owner: &Owner, dangling: &Dangling) -> MissingRef {
    let tree = TreePath::root()
        .join(DATA_TYPE, "Field rules")
        .join(dangling.rule.to_string(), format!("Rule {}", dangling.rule))
        .join(dangling.kind, dangling.kind);
    MissingRef::new(
        owner,
        &tree,
        DATA_TYPE,
        "Field rules",
        MissingRefs::list([dangling.field.as_str()]),
    )
}

fn validate_rules(owner: &Owner, fields: &BTreeSet<String>, rules: &[FieldRule]) -> Vec<MissingRef> {
    dangling(fields, rules).iter().map(|d| record(owner, d)).collect()
}

/// Drop dangling conditions and actions, then rules the fix left without either
fn fix_rules(owner: &Owner, fields: &BTreeSet<String>, rules: Vec<FieldRule>) -> (Vec<FieldRule>, Vec<MissingRef>) {
    let found = dangling(fields, &rules);
    let records = found
        .iter()
        .map(|d| {
            record(owner, d)
                .fixed()
                .with_message(format!("Removed {} on {}", d.kind, d.field))
        })
        .collect();

    // Only rules this fix emptied are dropped
    let kept = rules
        .into_iter()
        .filter_map(|mut rule| {
            let had_conditions = !rule.conditions.is_empty();
            let had_actions = !rule.actions.is_empty();
            rule.conditions.retain(|c| fields.contains(&c.operand_field));
            rule.actions.retain(|a| fields.contains(&a.target_field));
            let emptied = (had_conditions && rule.conditions.is_empty()) || (had_actions && rule.actions.is_empty());
            (!emptied).then_some(rule)
        })
        .collect();
    (kept, records)
}
