use anyhow::{Context, Result, bail};
use colored::Colorize;
use devflow_core::Scope;
use devflow_infrastructure::migration::MigrationId;

use super::utils::{config_path, init_flag, print_outcome, service};

pub fn status() -> Result<()> {
    let service = service();

    for scope in Scope::all() {
        let path = match config_path(*scope) {
            Ok(path) => path,
            Err(e) => {
                println!("{} {}: {}", "•".dimmed(), scope, e);
                continue;
            }
        };

        let status = service.status(*scope, &path)?;
        println!("📋 {} configuration ({})", scope, path.display());
        println!("  current version: {}", status.marker);
        println!(
            "  latest version:  {}",
            status
                .latest
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "-".to_string())
        );

        if status.is_up_to_date() {
            println!("  {}", "up to date".green());
        } else {
            for pending in &status.pending {
                let marker = if pending.prerequisite { " (required)" } else { "" };
                println!("  {} {} {}{}", "→".cyan(), pending.id, pending.description, marker);
            }
        }
    }

    Ok(())
}

/// Applies pending migrations. Without a scope, the global configuration runs
/// first and the project one is skipped when not inside a repository.
pub fn run(scope: Option<Scope>) -> Result<()> {
    let explicit = scope.is_some();
    let scopes: Vec<Scope> = match scope {
        Some(scope) => vec![scope],
        None => Scope::all().to_vec(),
    };

    let mut targets = Vec::new();
    for scope in scopes {
        let path = match config_path(scope) {
            Ok(path) => path,
            Err(e) if scope == Scope::Project && !explicit => {
                tracing::info!("Skipping project configuration: {}", e);
                continue;
            }
            Err(e) => return Err(e),
        };

        if !path.is_file() {
            if explicit {
                bail!(
                    "{} does not exist. Run 'devflow init{}' first.",
                    path.display(),
                    init_flag(scope)
                );
            }
            println!("{} No {} configuration yet, skipping", "•".dimmed(), scope);
            continue;
        }
        targets.push((scope, path));
    }

    for (scope, path) in &targets {
        println!("🔄 Migrating {} configuration ({})...", scope, path.display());
    }

    let outcomes = service()
        .migrate_all(&targets)
        .context("Migration aborted; fix the error above and run 'devflow migrate run' again")?;

    for (scope, outcome) in &outcomes {
        print_outcome(*scope, outcome);
    }

    Ok(())
}

pub fn down(id: &str, scope: Scope) -> Result<()> {
    let id = MigrationId::parse(id)?;
    let path = config_path(scope)?;

    let document = service().rollback(scope, &path, &id)?;
    println!(
        "↩️  Reversed {}; {} configuration now at version {}",
        id,
        scope,
        document.migration_version().unwrap_or_default()
    );

    Ok(())
}

pub fn new_id() {
    println!("{}", MigrationId::now());
}
