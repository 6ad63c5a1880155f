//! Module adapters
//!
//! One adapter per exported entity family. An adapter loads its root
//! entities, picks the checks it cares about, runs them in validate or fix
//! mode and hands back a [`Collector`]. Fixed data is written only through
//! [`RunContext::persist`], which consults the write gate.

pub mod assets;
pub mod composable_studio;
pub mod content_types;
pub mod custom_roles;
pub mod entries;
pub mod extensions;
pub mod field_rules;
pub mod global_fields;
pub mod variants;
pub mod workflows;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use crate::collector::Collector;
use crate::config::OutputFormat;
use crate::error::{AuditError, Result};
use crate::index::ReferenceIndex;
use crate::io::{Progress, WriteGate};

/// Scope value matching every item
pub const ALL_SCOPE: &str = "$all";

/// An auditable entity family
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Module {
    ContentTypes,
    GlobalFields,
    Entries,
    FieldRules,
    Variants,
    CustomRoles,
    Workflows,
    Extensions,
    ComposableStudio,
    Assets,
}

impl Module {
    /// Default run order
    pub const ALL: [Module; 10] = [
        Module::ContentTypes,
        Module::GlobalFields,
        Module::Entries,
        Module::FieldRules,
        Module::Variants,
        Module::CustomRoles,
        Module::Workflows,
        Module::Extensions,
        Module::ComposableStudio,
        Module::Assets,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Module::ContentTypes => "content-types",
            Module::GlobalFields => "global-fields",
            Module::Entries => "entries",
            Module::FieldRules => "field-rules",
            Module::Variants => "variants",
            Module::CustomRoles => "custom-roles",
            Module::Workflows => "workflows",
            Module::Extensions => "extensions",
            Module::ComposableStudio => "composable-studio",
            Module::Assets => "assets",
        }
    }

    /// Whether the module looks up entries by uid
    pub fn needs_entries(&self) -> bool {
        matches!(self, Module::Entries | Module::Variants)
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Module {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self> {
        Module::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| AuditError::UnknownModule(s.to_string()))
    }
}

/// Everything an adapter needs for one run
pub struct RunContext<'a> {
    pub base: &'a Path,
    pub index: &'a ReferenceIndex,
    pub fix: bool,
    pub skip_refs: &'a [String],
    pub format: OutputFormat,
    pub gate: &'a mut WriteGate,
    pub progress: &'a mut dyn Progress,
}

impl RunContext<'_> {
    /// Write fixed data if the gate allows it. Returns whether it was written.
    ///
    /// A declined confirmation is not an error: the file is left untouched.
    pub fn persist(&mut self, module: Module, write: impl FnOnce(OutputFormat) -> Result<()>) -> Result<bool> {
        if !self.fix {
            return Ok(false);
        }
        if !self.gate.allow(module.name()) {
            info!("Fixes for {} were not written", module);
            return Ok(false);
        }
        write(self.format)?;
        Ok(true)
    }
}

/// Run one module
///
/// Records keep their fix mark only if the module's writes were allowed.
pub fn run(module: Module, ctx: &mut RunContext<'_>) -> Result<Collector> {
    info!("Auditing {}", module);
    let mut collector = match module {
        Module::ContentTypes => content_types::run(ctx),
        Module::GlobalFields => global_fields::run(ctx),
        Module::Entries => entries::run(ctx),
        Module::FieldRules => field_rules::run(ctx),
        Module::Variants => variants::run(ctx),
        Module::CustomRoles => custom_roles::run(ctx),
        Module::Workflows => workflows::run(ctx),
        Module::Extensions => extensions::run(ctx),
        Module::ComposableStudio => composable_studio::run(ctx),
        Module::Assets => assets::run(ctx),
    }?;
    if ctx.gate.declined(module.name()) {
        collector.discard_fixes();
    }
    Ok(collector)
}

/// Content type uids that are neither `$all` nor known
pub(crate) fn unknown_content_types(index: &ReferenceIndex, uids: &[String]) -> Vec<String> {
    uids.iter()
        .filter(|uid| uid.as_str() != ALL_SCOPE && !index.has_content_type(uid))
        .cloned()
        .collect()
}

#[cfg(test)]
pub(crate) mod testing {
    //! Export-tree fixtures shared by the adapter tests

    use serde_json::Value;
    use std::fs;
    use std::path::Path;

    use super::*;
    use crate::index::IndexBuilder;
    use crate::io::NoProgress;

    pub fn write(base: &Path, relative: &str, value: Value) {
        let path = base.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
    }

    pub fn read(base: &Path, relative: &str) -> Value {
        serde_json::from_str(&fs::read_to_string(base.join(relative)).unwrap()).unwrap()
    }

    /// Run a module against `base` with an always-allowing gate
    pub fn run_module(base: &Path, module: Module, fix: bool) -> Collector {
        let index = IndexBuilder::new(base)
            .with_entries(module.needs_entries())
            .build()
            .unwrap();
        let skip = vec!["sys_assets".to_string()];
        let mut gate = WriteGate::always();
        let mut progress = NoProgress;
        let mut ctx = RunContext {
            base,
            index: &index,
            fix,
            skip_refs: &skip,
            format: OutputFormat::Pretty,
            gate: &mut gate,
            progress: &mut progress,
        };
        run(module, &mut ctx).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_names_round_trip() {
        for module in Module::ALL {
            assert_eq!(module.name().parse::<Module>().unwrap(), module);
        }
        assert!("nope".parse::<Module>().is_err());
    }

    #[test]
    fn test_serde_names_match() {
        let value = serde_json::to_value(Module::ComposableStudio).unwrap();
        assert_eq!(value, serde_json::json!("composable-studio"));
    }
}
