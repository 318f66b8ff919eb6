//! Client-side context management.
//!
//! Reads/writes `~/.odoo/config.toml`.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use odoo_client::{Session, TransportOptions, XmlRpcTransport};
use serde::{Deserialize, Serialize};

/// A single context: one database on one Odoo server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Context {
    /// Context name (e.g. "prod").
    pub name: String,

    /// Server URL (e.g. "https://erp.example.com").
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,

    /// Database name on the server.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub database: String,

    /// Login (set by `odoo login`).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,

    /// Password or API key (set by `odoo login`).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,

    /// Accept self-signed certificates.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skip_tls: bool,

    /// Request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Context {
    /// Build the XML-RPC transport for this context.
    pub fn transport(&self) -> anyhow::Result<XmlRpcTransport> {
        if self.url.is_empty() {
            anyhow::bail!(
                "No server URL set for context \"{}\". Run `odoo context set {} --url <url>`.",
                self.name,
                self.name
            );
        }
        let options = TransportOptions {
            skip_tls: self.skip_tls,
            timeout: self.timeout_secs.map(Duration::from_secs),
        };
        XmlRpcTransport::with_options(&self.url, options)
            .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {}", e))
    }

    /// Authenticate with the stored credentials.
    pub fn connect(&self) -> anyhow::Result<Session> {
        if self.username.is_empty() {
            anyhow::bail!("Not logged in to context \"{}\". Run `odoo login`.", self.name);
        }
        self.connect_as(&self.username, &self.password)
    }

    /// Authenticate with explicit credentials.
    pub fn connect_as(&self, username: &str, password: &str) -> anyhow::Result<Session> {
        if self.database.is_empty() {
            anyhow::bail!(
                "No database set for context \"{}\". Run `odoo context set {} --database <name>`.",
                self.name,
                self.name
            );
        }
        let transport = self.transport()?;
        let session = Session::connect(Arc::new(transport), &self.database, username, password)?;
        Ok(session)
    }
}

/// Client configuration file: every known context plus the active one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(rename = "current-context", default)]
    pub current_context: String,

    #[serde(default)]
    pub contexts: Vec<Context>,
}

impl ClientConfig {
    /// `~/.odoo/config.toml`, falling back to the working directory when
    /// no home directory is known.
    pub fn default_path() -> PathBuf {
        let home = std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        home.join(".odoo").join("config.toml")
    }

    /// Read the file at `path`. A missing file is an empty configuration.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)
                .map_err(|e| anyhow::anyhow!("invalid config {}: {}", path.display(), e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write the file at `path`. On Unix the file is owner-only (0600).
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
            options.mode(0o600);
            // mode() only applies when the file is created.
            if path.exists() {
                std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
            }
        }
        let mut file = options.open(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }

    /// Context called `name`.
    pub fn context(&self, name: &str) -> anyhow::Result<&Context> {
        self.contexts
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| not_found(name))
    }

    pub fn context_mut(&mut self, name: &str) -> anyhow::Result<&mut Context> {
        self.contexts
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| not_found(name))
    }

    /// The active context.
    pub fn current(&self) -> anyhow::Result<&Context> {
        if self.current_context.is_empty() {
            anyhow::bail!("No current context. Run `odoo use context <name>`.");
        }
        self.context(&self.current_context)
    }

    pub fn current_mut(&mut self) -> anyhow::Result<&mut Context> {
        if self.current_context.is_empty() {
            anyhow::bail!("No current context. Run `odoo use context <name>`.");
        }
        let name = self.current_context.clone();
        self.context_mut(&name)
    }

    /// Register a new context. The first one registered becomes current.
    pub fn add_context(&mut self, ctx: Context) -> anyhow::Result<()> {
        if self.contexts.iter().any(|c| c.name == ctx.name) {
            anyhow::bail!("Context \"{}\" already exists. Use `odoo context set`.", ctx.name);
        }
        if self.current_context.is_empty() {
            self.current_context = ctx.name.clone();
        }
        self.contexts.push(ctx);
        Ok(())
    }

    pub fn switch_to(&mut self, name: &str) -> anyhow::Result<()> {
        self.context(name)?;
        self.current_context = name.to_string();
        Ok(())
    }

    /// Forget a context. Removing the active one leaves no context active.
    pub fn remove_context(&mut self, name: &str) -> anyhow::Result<Context> {
        let index = self
            .contexts
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| not_found(name))?;
        if self.current_context == name {
            self.current_context.clear();
        }
        Ok(self.contexts.remove(index))
    }
}

fn not_found(name: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "Context \"{}\" not found. Run `odoo context list` to see available contexts.",
        name
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prod() -> Context {
        Context {
            name: "prod".to_string(),
            url: "https://erp.example.com".to_string(),
            database: "prod".to_string(),
            skip_tls: true,
            ..Default::default()
        }
    }

    fn staging() -> Context {
        Context {
            name: "staging".to_string(),
            url: "https://staging.example.com".to_string(),
            database: "staging".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert!(config.current_context.is_empty());
        assert!(config.contexts.is_empty());
        assert!(config.current().is_err());
    }

    #[test]
    fn test_roundtrip() {
        let mut config = ClientConfig::default();
        config.add_context(prod()).unwrap();

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("current-context = \"prod\""));
        assert!(!toml_str.contains("password"));
        let back: ClientConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(back.contexts.len(), 1);
        assert!(back.contexts[0].skip_tls);
        assert_eq!(back.current().unwrap().database, "prod");
    }

    #[test]
    fn test_first_context_becomes_current() {
        let mut config = ClientConfig::default();
        config.add_context(prod()).unwrap();
        config.add_context(staging()).unwrap();
        assert_eq!(config.current().unwrap().name, "prod");
        assert!(config.add_context(prod()).is_err());

        config.switch_to("staging").unwrap();
        assert_eq!(config.current().unwrap().name, "staging");
        assert!(config.switch_to("missing").is_err());
        assert_eq!(config.current_context, "staging");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = ClientConfig::default();
        config.add_context(prod()).unwrap();
        config.save(&path).unwrap();

        let mut loaded = ClientConfig::load(&path).unwrap();
        loaded.current_mut().unwrap().username = "admin".to_string();
        loaded.save(&path).unwrap();

        let reloaded = ClientConfig::load(&path).unwrap();
        assert_eq!(reloaded.contexts.len(), 1);
        assert_eq!(reloaded.context("prod").unwrap().username, "admin");
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        // pre-existing, world-readable file
        std::fs::write(&path, "").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let mut config = ClientConfig::default();
        let mut ctx = prod();
        ctx.username = "admin".to_string();
        ctx.password = "secret".to_string();
        config.add_context(ctx).unwrap();
        config.save(&path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        let fresh = dir.path().join("fresh").join("config.toml");
        config.save(&fresh).unwrap();
        let mode = std::fs::metadata(&fresh).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert!(config.contexts.is_empty());
    }

    #[test]
    fn test_remove_context_clears_current() {
        let mut config = ClientConfig::default();
        config.add_context(prod()).unwrap();
        config.add_context(staging()).unwrap();

        assert_eq!(config.remove_context("staging").unwrap().name, "staging");
        assert_eq!(config.current_context, "prod");
        config.remove_context("prod").unwrap();
        assert!(config.current_context.is_empty());
        assert!(config.remove_context("prod").is_err());
        assert!(config.current_mut().is_err());
    }

    #[test]
    fn test_connect_requires_login_and_url() {
        let mut ctx = prod();
        assert!(ctx.connect().is_err());
        ctx.url.clear();
        assert!(ctx.transport().is_err());
    }
}
