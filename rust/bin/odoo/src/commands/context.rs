//! Context management commands.

use std::path::Path;

use anyhow::Result;

use crate::config::{ClientConfig, Context};

/// Fields `odoo context set` may change. `None` leaves the value as is.
#[derive(Debug, Default)]
pub struct ContextChanges {
    pub url: Option<String>,
    pub database: Option<String>,
    pub skip_tls: Option<bool>,
    pub timeout_secs: Option<u64>,
}

/// Register a new context. The first context becomes current.
pub fn create(
    name: &str,
    url: &str,
    database: &str,
    skip_tls: bool,
    client_config_path: &Path,
) -> Result<()> {
    let mut config = ClientConfig::load(client_config_path)?;
    config.add_context(Context {
        name: name.to_string(),
        url: url.trim_end_matches('/').to_string(),
        database: database.to_string(),
        skip_tls,
        ..Default::default()
    })?;
    config.save(client_config_path)?;

    println!("Context \"{}\" created.", name);
    println!("  Server:   {}", url);
    println!("  Database: {}", database);
    Ok(())
}

/// List all contexts.
pub fn list(client_config_path: &Path) -> Result<()> {
    let config = ClientConfig::load(client_config_path)?;

    if config.contexts.is_empty() {
        println!("No contexts configured.");
        println!("Run: odoo context create <name> --url <url> --database <db>");
        return Ok(());
    }

    println!("{:2} {:16} {:40} {:16} {:12}", "", "NAME", "SERVER", "DATABASE", "USER");
    for ctx in &config.contexts {
        let marker = if ctx.name == config.current_context { "*" } else { " " };
        let dash = |s: &str| if s.is_empty() { "-".to_string() } else { s.to_string() };
        println!(
            "{:2} {:16} {:40} {:16} {:12}",
            marker,
            ctx.name,
            dash(&ctx.url),
            dash(&ctx.database),
            dash(&ctx.username)
        );
    }

    Ok(())
}

/// Switch current context.
pub fn use_context(name: &str, client_config_path: &Path) -> Result<()> {
    let mut config = ClientConfig::load(client_config_path)?;
    config.switch_to(name)?;
    config.save(client_config_path)?;
    println!("Switched to context \"{}\".", name);
    Ok(())
}

/// Set properties on a context.
pub fn set(name: &str, changes: ContextChanges, client_config_path: &Path) -> Result<()> {
    let mut config = ClientConfig::load(client_config_path)?;
    apply(config.context_mut(name)?, changes);
    config.save(client_config_path)?;
    println!("Context \"{}\" updated.", name);
    Ok(())
}

fn apply(ctx: &mut Context, changes: ContextChanges) {
    if let Some(url) = changes.url {
        ctx.url = url.trim_end_matches('/').to_string();
    }
    if let Some(database) = changes.database {
        ctx.database = database;
    }
    if let Some(skip_tls) = changes.skip_tls {
        ctx.skip_tls = skip_tls;
    }
    if changes.timeout_secs.is_some() {
        ctx.timeout_secs = changes.timeout_secs;
    }
}

/// Delete a context.
pub fn delete(name: &str, client_config_path: &Path) -> Result<()> {
    let mut config = ClientConfig::load(client_config_path)?;
    config.remove_context(name)?;
    config.save(client_config_path)?;
    println!("Context \"{}\" deleted.", name);
    Ok(())
}
