//! Audit orchestration
//!
//! Builds the reference index once, runs the selected modules in order and
//! writes one report per module. A module that fails aborts the run; reports
//! already written are kept.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use crate::config::{AuditConfig, OutputFormat, ReportConfig};
use crate::error::{AuditError, Result};
use crate::index::IndexBuilder;
use crate::io::{LogProgress, Progress, WriteGate};
use crate::modules::{self, Module, RunContext};
use crate::report::{Report, ReportWriter};

/// What to audit and how
#[derive(Debug, Clone)]
pub struct AuditOptions {
    pub data_dir: PathBuf,
    pub report_path: PathBuf,
    pub modules: Vec<Module>,
    pub skip_refs: Vec<String>,
    pub fix: bool,
    pub report: ReportConfig,
}

impl AuditOptions {
    pub fn from_config(config: &AuditConfig, fix: bool) -> Self {
        Self {
            data_dir: config.audit.data_dir.clone(),
            report_path: config.audit.report_path.clone(),
            modules: config.audit.modules.clone(),
            skip_refs: config.audit.skip_refs.clone(),
            fix,
            report: config.report.clone(),
        }
    }

    pub fn format(&self) -> OutputFormat {
        self.report.output_format
    }
}

/// Result of one module
#[derive(Debug, Clone, Serialize)]
pub struct ModuleResult {
    pub module: Module,
    pub report: Report,
}

impl ModuleResult {
    /// Owners with at least one record
    pub fn owners(&self) -> usize {
        self.report.len()
    }

    pub fn records(&self) -> usize {
        self.report.values().map(Vec::len).sum()
    }

    pub fn fixed(&self) -> usize {
        self.report.values().flatten().filter(|r| r.is_fixed()).count()
    }
}

/// Outcome of a whole run
#[derive(Debug, Clone, Serialize)]
pub struct AuditSummary {
    pub fix: bool,
    pub finished_at: DateTime<Utc>,
    pub modules: Vec<ModuleResult>,
}

impl AuditSummary {
    pub fn has_issues(&self) -> bool {
        self.modules.iter().any(|m| m.records() > 0)
    }

    pub fn total_records(&self) -> usize {
        self.modules.iter().map(ModuleResult::records).sum()
    }

    pub fn module(&self, module: Module) -> Option<&ModuleResult> {
        self.modules.iter().find(|m| m.module == module)
    }
}

/// Runs modules against one export
pub struct Auditor {
    options: AuditOptions,
    gate: WriteGate,
    progress: Box<dyn Progress>,
}

impl Auditor {
    pub fn new(options: AuditOptions, gate: WriteGate) -> Self {
        Self {
            options,
            gate,
            progress: Box::<LogProgress>::default(),
        }
    }

    pub fn with_progress(mut self, progress: Box<dyn Progress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn options(&self) -> &AuditOptions {
        &self.options
    }

    pub fn run(&mut self) -> Result<AuditSummary> {
        let base = self.options.data_dir.clone();
        if !base.is_dir() {
            return Err(AuditError::InvalidPath {
                module: "audit".to_string(),
                path: base,
            });
        }

        let index = IndexBuilder::new(&base)
            .with_entries(self.options.modules.iter().any(Module::needs_entries))
            .build()?;
        let writer = ReportWriter::new(&self.options.report_path, &self.options.report);

        let mut results = Vec::with_capacity(self.options.modules.len());
        for &module in &self.options.modules {
            let mut ctx = RunContext {
                base: &base,
                index: &index,
                fix: self.options.fix,
                skip_refs: &self.options.skip_refs,
                format: self.options.format(),
                gate: &mut self.gate,
                progress: self.progress.as_mut(),
            };
            let report = modules::run(module, &mut ctx)?.into_report();
            writer.write(module, &report)?;

            let result = ModuleResult { module, report };
            info!(
                module = %module,
                owners = result.owners(),
                records = result.records(),
                fixed = result.fixed(),
                "Module audited"
            );
            results.push(result);
        }

        Ok(AuditSummary {
            fix: self.options.fix,
            finished_at: Utc::now(),
            modules: results,
        })
    }
}
