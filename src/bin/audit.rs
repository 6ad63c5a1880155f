//! Content Audit CLI
//!
//! Audits an exported content snapshot and optionally fixes it.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use content_audit::io::{StdinConfirm, WriteGate};
use content_audit::{AuditConfig, AuditOptions, AuditSummary, Auditor, Module};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "content-audit")]
#[command(about = "Find and fix dangling references in a content export")]
struct Cli {
    /// Config file to layer over the defaults
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report missing references without changing anything
    Audit(RunArgs),

    /// Report missing references and remove them from the export
    Fix(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Root of the exported content
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Directory for the reports
    #[arg(short, long)]
    report_path: Option<PathBuf>,

    /// Modules to run, comma separated
    #[arg(short, long, value_enum, value_delimiter = ',')]
    modules: Vec<Module>,

    /// Write fixes without asking
    #[arg(short, long)]
    yes: bool,

    /// CSV columns to keep, comma separated
    #[arg(long, value_delimiter = ',')]
    columns: Vec<String>,
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let mut config = AuditConfig::load_from(cli.config.as_deref()).context("loading configuration")?;

    let (args, fix) = match cli.command {
        Commands::Audit(args) => (args, false),
        Commands::Fix(args) => (args, true),
    };
    if let Some(data_dir) = args.data_dir {
        config.audit.data_dir = data_dir;
    }
    if let Some(report_path) = args.report_path {
        config.audit.report_path = report_path;
    }
    if !args.modules.is_empty() {
        config.audit.modules = args.modules;
    }
    if !args.columns.is_empty() {
        config.report.columns = args.columns;
    }
    let skip_confirm = args.yes || config.audit.skip_confirm;

    println!(
        "🔍 {} {}",
        if fix { "Fixing" } else { "Auditing" },
        config.audit.data_dir.display()
    );

    let gate = WriteGate::new(Box::new(StdinConfirm), skip_confirm);
    let options = AuditOptions::from_config(&config, fix);
    let summary = Auditor::new(options, gate).run()?;

    print_summary(&summary);
    println!("\n📄 Reports written to {}", config.audit.report_path.display());

    Ok(if !fix && summary.has_issues() { 2 } else { 0 })
}

fn print_summary(summary: &AuditSummary) {
    println!();
    println!("{:<20} {:>8} {:>8} {:>8}", "Module", "Owners", "Records", "Fixed");
    println!("{}", "-".repeat(47));
    for result in &summary.modules {
        let marker = if result.records() == 0 { "✅" } else { "❌" };
        println!(
            "{} {:<17} {:>8} {:>8} {:>8}",
            marker,
            result.module.name(),
            result.owners(),
            result.records(),
            result.fixed()
        );
    }
    println!("{}", "-".repeat(47));
    println!("Total records: {}", summary.total_records());
}
