//! Content Audit
//!
//! Audits an exported content-management snapshot for dangling references
//! and, on request, repairs it in place.
//!
//! ## Features
//!
//! - **Reference index**: content types, global fields, locales, environments,
//!   extensions and entry metadata, loaded once per run
//! - **Validate mode**: read-only walk of schemas and entries that records
//!   every reference to something not in the export
//! - **Fix mode**: the same walk, rebuilding each value without the dangling
//!   parts and marking each record as fixed
//! - **Reports**: one JSON and one CSV report per module
//!
//! ## Export layout
//!
//! ```text
//! <data_dir>/
//! ├── content_types/schema.json
//! ├── global_fields/globalfields.json
//! ├── entries/<content type>/<locale>/
//! │   ├── index.json
//! │   ├── <chunk>.json
//! │   └── variants/index.json
//! ├── locales/locales.json, locales/master-locale.json
//! ├── environments/environments.json
//! ├── extensions/extensions.json
//! ├── marketplace_apps/marketplace_apps.json
//! ├── custom-roles/custom-roles.json
//! ├── workflows/workflows.json
//! ├── assets/assets.json
//! └── composable_studio/composable_studio.json
//! ```

pub mod audit;
pub mod checks;
pub mod collector;
pub mod config;
pub mod error;
pub mod fixer;
pub mod index;
pub mod io;
pub mod modules;
pub mod path;
pub mod record;
pub mod report;
pub mod schema;
pub mod variants;
pub mod walker;

pub use audit::{AuditOptions, AuditSummary, Auditor, ModuleResult};
pub use checks::{Checks, FieldHandlers};
pub use collector::Collector;
pub use config::AuditConfig;
pub use error::{AuditError, Result};
pub use fixer::{Fixed, Fixer};
pub use index::{IndexBuilder, ReferenceIndex};
pub use modules::Module;
pub use path::TreePath;
pub use record::{FixStatus, MissingRef, MissingRefs, Owner, EMPTY_SCHEMA, MISSING_GLOBAL_FIELD};
pub use report::{Report, ReportWriter};
pub use schema::{ContentType, DataType, FieldKind, SchemaField};
pub use walker::Walker;
