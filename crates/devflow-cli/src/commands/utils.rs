use anyhow::{Context, Result};
use colored::Colorize;
use devflow_core::Scope;
use devflow_infrastructure::migration::MigrationOutcome;
use devflow_infrastructure::{ConfigMigrationService, ConfigStorage, DevflowPaths};
use serde_json::Value;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

/// Builds the migration service over the on-disk store and shipped catalog.
pub fn service() -> ConfigMigrationService {
    ConfigMigrationService::with_builtin_catalog(Arc::new(ConfigStorage::new()))
}

/// Resolves the configuration file of `scope`.
///
/// The project file lives at the root of the git repository containing the
/// current directory.
pub fn config_path(scope: Scope) -> Result<PathBuf> {
    match scope {
        Scope::Global => DevflowPaths::global_config_file()
            .context("Failed to resolve the global configuration file"),
        Scope::Project => {
            let cwd = env::current_dir().context("Failed to get current directory")?;
            let root = DevflowPaths::find_project_root(&cwd)?;
            Ok(DevflowPaths::project_config_file(&root))
        }
    }
}

/// Flag to pass to `devflow init` for `scope`.
pub fn init_flag(scope: Scope) -> &'static str {
    match scope {
        Scope::Global => "",
        Scope::Project => " --project",
    }
}

/// Parses a command-line value into a typed configuration value.
pub fn parse_value(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => raw
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(raw.to_string())),
    }
}

/// Prints the applied and skipped migrations of one run.
pub fn print_outcome(scope: Scope, outcome: &MigrationOutcome) {
    if outcome.applied.is_empty() && outcome.skipped.is_empty() {
        println!("✅ {} configuration is up to date", scope);
        return;
    }

    for id in &outcome.applied {
        println!("  {} {}", "✓".green(), id);
    }
    for skipped in &outcome.skipped {
        let followup = if skipped.superseded {
            "superseded by a newer migration, not retried"
        } else {
            "will be retried on the next run"
        };
        println!(
            "  {} {} ({}) skipped: {} ({})",
            "⚠".yellow(),
            skipped.id,
            skipped.description,
            skipped.reason,
            followup
        );
    }

    let version = outcome.document.migration_version().unwrap_or_else(|| "0".to_string());
    if outcome.is_clean() {
        println!("✅ {} configuration migrated to version {}", scope, version);
    } else {
        println!(
            "{} {} configuration at version {} with {} skipped migration(s)",
            "⚠".yellow(),
            scope,
            version,
            outcome.skipped.len()
        );
    }
}
