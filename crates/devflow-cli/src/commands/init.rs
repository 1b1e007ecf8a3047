use anyhow::Result;
use devflow_core::Scope;
use devflow_infrastructure::InitOutcome;
use devflow_infrastructure::migration_service::default_document;

use super::utils::{config_path, print_outcome, service};

pub fn run(scope: Scope) -> Result<()> {
    let path = config_path(scope)?;
    println!("📝 Initializing {} configuration at {}...", scope, path.display());

    match service().initialize(scope, &path, default_document(scope))? {
        InitOutcome::Created(document) => {
            println!(
                "✅ Created {} (version {})",
                path.display(),
                document.migration_version().unwrap_or_default()
            );
        }
        InitOutcome::Migrated(outcome) => {
            println!("ℹ️  {} already exists, checking for migrations", path.display());
            print_outcome(scope, &outcome);
        }
    }

    Ok(())
}
