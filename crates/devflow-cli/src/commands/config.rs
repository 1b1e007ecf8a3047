use anyhow::{Context, Result, bail};
use devflow_core::{MIGRATION_VERSION_KEY, Scope};
use devflow_infrastructure::ConfigStorage;
use serde_json::Value;

use super::utils::{config_path, init_flag, parse_value};

pub fn get(scope: Scope, key: &str) -> Result<()> {
    let path = config_path(scope)?;
    let document = ConfigStorage::new()
        .load(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let Some(document) = document else {
        bail!(
            "{} does not exist. Run 'devflow init{}' first.",
            path.display(),
            init_flag(scope)
        );
    };

    match document.get_path(key) {
        Some(Value::String(s)) => println!("{}", s),
        Some(value) => println!("{}", serde_json::to_string_pretty(value)?),
        None => bail!("'{}' is not set in the {} configuration", key, scope),
    }

    Ok(())
}

pub fn set(scope: Scope, key: &str, raw: &str) -> Result<()> {
    if key == MIGRATION_VERSION_KEY {
        bail!(
            "'{}' is managed by migrations; use 'devflow migrate' instead",
            MIGRATION_VERSION_KEY
        );
    }

    let path = config_path(scope)?;
    if !path.is_file() {
        bail!(
            "{} does not exist. Run 'devflow init{}' first.",
            path.display(),
            init_flag(scope)
        );
    }

    let value = parse_value(raw);
    ConfigStorage::new()
        .update(&path, |document| document.set_path(key, value).map(|_| ()))
        .with_context(|| format!("Failed to set '{}'", key))?;

    println!("✅ Set {} in {} configuration", key, scope);
    Ok(())
}
