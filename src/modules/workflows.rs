//! Workflows
//!
//! A workflow applies to the content types it lists. A workflow whose list
//! is emptied by fixing applies to nothing and is removed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use super::{unknown_content_types, Module, RunContext};
use crate::collector::Collector;
use crate::error::Result;
use crate::index::paths;
use crate::io::Collection;
use crate::path::TreePath;
use crate::record::{MissingRef, MissingRefs, Owner};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub uid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub content_types: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub fn run(ctx: &mut RunContext<'_>) -> Result<Collector> {
    let path = ctx.base.join(paths::WORKFLOWS);
    let mut collector = Collector::new();
    if !path.is_file() {
        warn!("{} not found, skipping workflows", path.display());
        return Ok(collector);
    }

    let mut workflows: Collection<Workflow> = Collection::load(&path)?;
    let tree = TreePath::root().join("content_types", "Content types");
    let mut changed = false;

    for workflow in workflows.values_mut() {
        let owner = Owner::new(&workflow.uid, &workflow.name);
        collector.begin(&workflow.uid);

        let missing = unknown_content_types(ctx.index, &workflow.content_types);
        if !missing.is_empty() {
            let mut record = MissingRef::new(
                &owner,
                &tree,
                "content_types",
                "Content types",
                MissingRefs::List(missing.clone()),
            );
            if ctx.fix {
                workflow.content_types.retain(|uid| !missing.contains(uid));
                let message = if workflow.content_types.is_empty() {
                    format!("Removed workflow {}", workflow.uid)
                } else {
                    format!("Removed {}", missing.join(", "))
                };
                record = record.fixed().with_message(message);
                changed = true;
            }
            collector.push(&workflow.uid, record);
        }
        ctx.progress.tick(missing.is_empty(), &workflow.uid, None);
    }

    if changed {
        let before = workflows.len();
        workflows.retain(|w| !w.content_types.is_empty());
        if workflows.len() < before {
            info!("Removing {} workflow(s) left without content types", before - workflows.len());
        }
        ctx.persist(Module::Workflows, |format| workflows.save(&path, format))?;
    }
    collector.finalize();
    Ok(collector)
}
