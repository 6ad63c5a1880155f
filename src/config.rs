//! Configuration management for the auditor
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (audit.toml)
//! - Environment variables (AUDIT__*)
//!
//! ## Example config file (audit.toml):
//! ```toml
//! [audit]
//! data_dir = "./export"
//! report_path = "./audit-report"
//! modules = ["content-types", "global-fields", "entries"]
//! skip_refs = ["sys_assets"]
//! skip_confirm = false
//!
//! [report]
//! output_format = "pretty"
//! csv = true
//! columns = ["ownerUid", "treeStr", "missingRefs"]
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::modules::Module;

/// Main configuration for the auditor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Audit run settings
    #[serde(default)]
    pub audit: RunConfig,

    /// Report settings
    #[serde(default)]
    pub report: ReportConfig,
}

/// Audit run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Root of the exported content tree
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory the reports are written to
    #[serde(default = "default_report_path")]
    pub report_path: PathBuf,

    /// Modules to run, in order
    #[serde(default = "default_modules")]
    pub modules: Vec<Module>,

    /// Reference targets that are never reported (system assets)
    #[serde(default = "default_skip_refs")]
    pub skip_refs: Vec<String>,

    /// Write fixes without asking
    #[serde(default)]
    pub skip_confirm: bool,
}

/// Report configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Output format (pretty or compact)
    #[serde(default = "default_output_format")]
    pub output_format: OutputFormat,

    /// Write a CSV next to each JSON report
    #[serde(default = "default_true")]
    pub csv: bool,

    /// CSV columns to keep; empty keeps all
    #[serde(default)]
    pub columns: Vec<String>,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

// Default value functions
fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_report_path() -> PathBuf {
    PathBuf::from("audit-report")
}

fn default_modules() -> Vec<Module> {
    Module::ALL.to_vec()
}

fn default_skip_refs() -> Vec<String> {
    vec!["sys_assets".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_output_format() -> OutputFormat {
    OutputFormat::Pretty
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            report_path: default_report_path(),
            modules: default_modules(),
            skip_refs: default_skip_refs(),
            skip_confirm: false,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::Pretty,
            csv: true,
            columns: Vec::new(),
        }
    }
}

impl AuditConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, adding a specific file on top of the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["audit.toml", ".audit.toml", "config/audit.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "content-audit", "audit") {
            let xdg_config = config_dir.config_dir().join("audit.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // AUDIT__AUDIT__SKIP_CONFIRM=true etc.
        builder = builder.add_source(
            Environment::with_prefix("AUDIT")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AuditConfig::default();
        assert!(!config.audit.skip_confirm);
        assert_eq!(config.audit.skip_refs, vec!["sys_assets"]);
        assert_eq!(config.audit.modules.len(), Module::ALL.len());
    }

    #[test]
    fn test_serialize_config() {
        let config = AuditConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[audit]"));
        assert!(toml_str.contains("[report]"));
        assert!(toml_str.contains("content-types"));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[audit]\nmodules = [\"entries\"]\nskip_confirm = true\n\n[report]\ncsv = false\n",
        )
        .unwrap();

        let config = AuditConfig::load_from(path.to_str()).unwrap();
        assert_eq!(config.audit.modules, vec![Module::Entries]);
        assert!(config.audit.skip_confirm);
        assert!(!config.report.csv);
    }
}
