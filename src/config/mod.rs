//! Site configuration from `config/site.yaml`.
//!
//! ```yaml
//! server:
//!   port: 8080
//!   hostname: localhost
//!   title: My Site
//!   description: Notes and posts
//! branding:
//!   favicon: /assets/favicon.png
//!   css_file: /assets/site.css
//! plugins:
//!   builtin/markdown:
//!     tables: "true"
//! ```
//!
//! Configuration faults abort startup; everything else in the system
//! recovers locally.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Hard limits on user-supplied strings.
const MAX_HOSTNAME_LENGTH: usize = 253;
const MAX_TITLE_LENGTH: usize = 200;
const MAX_DESC_LENGTH: usize = 500;

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub hostname: String,
    pub title: String,
    pub description: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            hostname: "localhost".to_string(),
            title: "loam server".to_string(),
            description: String::new(),
        }
    }
}

impl ServerConfig {
    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            bail!("server.port must be between 1 and 65535");
        }
        if !self.hostname.is_empty() && !is_valid_hostname(&self.hostname) {
            bail!("server.hostname is invalid: {}", self.hostname);
        }
        if self.title.len() > MAX_TITLE_LENGTH {
            bail!(
                "server.title too long: {} > {}",
                self.title.len(),
                MAX_TITLE_LENGTH
            );
        }
        if self.description.len() > MAX_DESC_LENGTH {
            bail!(
                "server.description too long: {} > {}",
                self.description.len(),
                MAX_DESC_LENGTH
            );
        }
        Ok(())
    }
}

/// `[branding]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrandingConfig {
    pub favicon: String,
    /// Accepts the legacy `cssfile` spelling.
    #[serde(alias = "cssfile")]
    pub css_file: String,
}

impl Default for BrandingConfig {
    fn default() -> Self {
        Self {
            favicon: "/assets/favicon.png".to_string(),
            css_file: String::new(),
        }
    }
}

impl BrandingConfig {
    fn validate(&self) -> Result<()> {
        for (field, value) in [("favicon", &self.favicon), ("css_file", &self.css_file)] {
            if !value.is_empty() && !is_valid_path(value) {
                bail!("branding.{field} path is invalid: {value}");
            }
        }
        Ok(())
    }
}

/// Per-plugin key/value maps, passed verbatim to the matching plugin.
pub type PluginsConfig = BTreeMap<String, BTreeMap<String, String>>;

/// Root configuration: the decoded `config/site.yaml` plus driver paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    #[serde(skip)]
    pub site_dir: PathBuf,
    #[serde(skip)]
    pub out_dir: PathBuf,

    pub server: ServerConfig,
    pub branding: BrandingConfig,
    pub plugins: PluginsConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site_dir: PathBuf::new(),
            out_dir: PathBuf::new(),
            server: ServerConfig::default(),
            branding: BrandingConfig::default(),
            plugins: PluginsConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load and validate `config/site.yaml` under the site root.
    pub fn load(site_dir: &Path) -> Result<Self> {
        let config_path = site_dir.join("config").join("site.yaml");
        let data = std::fs::read_to_string(&config_path)
            .with_context(|| format!("cannot read {}", config_path.display()))?;

        let mut config: SiteConfig = serde_yaml::from_str(&data)
            .with_context(|| format!("invalid YAML in {}", config_path.display()))?;
        config.site_dir = site_dir.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.server
            .validate()
            .context("server configuration error")?;
        self.branding
            .validate()
            .context("branding configuration error")?;
        for name in self.plugins.keys() {
            if name.is_empty() {
                bail!("plugin name cannot be empty");
            }
        }
        Ok(())
    }

    /// The verbatim config map of a plugin, empty when absent.
    pub fn plugin_params(&self, name: &str) -> BTreeMap<String, String> {
        self.plugins.get(name).cloned().unwrap_or_default()
    }
}

/// Basic RFC-952-style hostname validation; IPv4 literals pass.
fn is_valid_hostname(hostname: &str) -> bool {
    if hostname.is_empty() || hostname.len() > MAX_HOSTNAME_LENGTH {
        return false;
    }
    if hostname.starts_with('.') || hostname.ends_with('.') {
        return false;
    }
    hostname.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

/// Reject traversal attempts and control characters in configured paths.
fn is_valid_path(path: &str) -> bool {
    if path.is_empty() {
        return false;
    }
    if path.contains("../") || path.contains("..\\") {
        return false;
    }
    !path
        .chars()
        .any(|c| c == '\0' || matches!(c, '<' | '>' | '|' | '?' | '*'))
}
