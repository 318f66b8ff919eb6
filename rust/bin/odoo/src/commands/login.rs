//! Login / logout and identity commands.

use std::path::Path;

use anyhow::Result;
use odoo_client::Transport;

use crate::config::ClientConfig;

/// Authenticate against the current context and store the credentials.
pub fn login(username: &str, password: &str, client_config_path: &Path) -> Result<()> {
    let mut config = ClientConfig::load(client_config_path)?;
    let session = config.current()?.connect_as(username, password)?;

    let ctx = config.current_mut()?;
    ctx.username = username.to_string();
    ctx.password = password.to_string();
    config.save(client_config_path)?;

    println!("Logged in as {} (uid {}).", username, session.uid());
    println!("Credentials saved to context \"{}\".", config.current_context);
    Ok(())
}

/// Clear stored credentials from the current context.
pub fn logout(client_config_path: &Path) -> Result<()> {
    let mut config = ClientConfig::load(client_config_path)?;

    let ctx = config.current_mut()?;
    ctx.username.clear();
    ctx.password.clear();
    config.save(client_config_path)?;
    println!("Logged out from context \"{}\".", config.current_context);
    Ok(())
}

/// Print the server's version info. Needs no credentials.
pub fn server_version(client_config_path: &Path) -> Result<()> {
    let config = ClientConfig::load(client_config_path)?;
    let Ok(ctx) = config.current() else {
        return Ok(());
    };

    let info = ctx.transport()?.server_version()?;
    let version = info
        .get("server_version")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown");
    println!("server {} ({})", version, ctx.url);
    Ok(())
}

pub fn whoami(client_config_path: &Path) -> Result<()> {
    let config = ClientConfig::load(client_config_path)?;
    let ctx = config.current()?;
    let session = ctx.connect()?;

    println!("Context:  {}", ctx.name);
    println!("Server:   {}", ctx.url);
    println!("Database: {}", session.database());
    println!("User:     {} (uid {})", session.username(), session.uid());
    Ok(())
}
