//! Custom roles
//!
//! A role's `rules` grant access per module. Content type rules list
//! `content_types` and locale rules list `locales`; both must point at
//! exported items.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use super::{unknown_content_types, Module, RunContext, ALL_SCOPE};
use crate::collector::Collector;
use crate::error::Result;
use crate::index::{paths, ReferenceIndex};
use crate::io::Collection;
use crate::path::TreePath;
use crate::record::{MissingRef, MissingRefs, Owner};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomRole {
    pub uid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub rules: Vec<RoleRule>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleRule {
    #[serde(default)]
    pub module: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locales: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RoleRule {
    /// The uid list this rule scopes and the uids in it that do not resolve
    fn scoped(&mut self, index: &ReferenceIndex) -> Option<(&mut Vec<String>, Vec<String>)> {
        match self.module.as_str() {
            "content_type" => {
                let uids = self.content_types.as_mut()?;
                let missing = unknown_content_types(index, uids);
                Some((uids, missing))
            }
            "locale" => {
                let codes = self.locales.as_mut()?;
                let missing = codes
                    .iter()
                    .filter(|c| c.as_str() != ALL_SCOPE && !index.has_locale(c))
                    .cloned()
                    .collect();
                Some((codes, missing))
            }
            _ => None,
        }
    }
}

pub fn run(ctx: &mut RunContext<'_>) -> Result<Collector> {
    let path = ctx.base.join(paths::CUSTOM_ROLES);
    let mut collector = Collector::new();
    if !path.is_file() {
        warn!("{} not found, skipping custom roles", path.display());
        return Ok(collector);
    }

    let mut roles: Collection<CustomRole> = Collection::load(&path)?;
    let mut changed = false;

    for role in roles.values_mut() {
        let owner = Owner::new(&role.uid, &role.name);
        collector.begin(&role.uid);
        let mut records = Vec::new();

        for (position, rule) in role.rules.iter_mut().enumerate() {
            let module = rule.module.clone();
            let Some((uids, missing)) = rule.scoped(ctx.index) else { continue };
            if missing.is_empty() {
                continue;
            }
            let tree = TreePath::root()
                .join("rules", "Rules")
                .join(position.to_string(), &module);
            let mut record = MissingRef::new(&owner, &tree, module.as_str(), "Rules", MissingRefs::List(missing.clone()));
            if ctx.fix {
                uids.retain(|uid| !missing.contains(uid));
                record = record
                    .fixed()
                    .with_message(format!("Removed {} from {} rule", missing.join(", "), module));
            }
            records.push(record);
        }

        changed |= ctx.fix && !records.is_empty();
        ctx.progress.tick(records.is_empty(), &role.uid, None);
        collector.extend(&role.uid, records);
    }

    if changed {
        ctx.persist(Module::CustomRoles, |format| roles.save(&path, format))?;
    }
    collector.finalize();
    Ok(collector)
}
