use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::model::query::DEFAULT_LIMIT;
use crate::providers::clickup::DEFAULT_BASE_URL;
use crate::retrieval::orchestrator::DEFAULT_INVOICING_PAGE_SIZE;
use crate::retrieval::{ListCatalog, RetrievalConfig};

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub clickup: ClickUpConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub retrieval: RetrievalSettings,
}

#[derive(Debug, Deserialize)]
pub struct ClickUpConfig {
    pub api_token: Option<String>,
    /// Workspace (team) id for workspace-wide listing.
    pub team_id: Option<String>,
    pub invoicing_list_id: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for ClickUpConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            team_id: None,
            invoicing_list_id: None,
            base_url: default_base_url(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bearer token callers must present on tool routes.
    pub auth_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            auth_token: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RetrievalSettings {
    /// Replaces the built-in pipeline stage catalog when set.
    pub active_lists: Option<Vec<String>>,
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_invoicing_page_size")]
    pub invoicing_page_size: u32,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            active_lists: None,
            default_limit: default_limit(),
            invoicing_page_size: default_invoicing_page_size(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

fn default_invoicing_page_size() -> u32 {
    DEFAULT_INVOICING_PAGE_SIZE
}

fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("GATEWAY_CONFIG") {
        return PathBuf::from(path);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".pipeline-gateway")
        .join("config.toml")
}

/// Load the config file (if any) and apply environment overrides.
pub fn load_config() -> Result<AppConfig> {
    let mut config = load_config_from(&config_path())?;
    config.apply_overrides(|key| std::env::var(key).ok())?;
    Ok(config)
}

pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: AppConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(config)
}

impl AppConfig {
    /// Overlay values from the environment. Empty variables are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("CLICKUP_API_TOKEN") {
            self.clickup.api_token = Some(v);
        }
        if let Some(v) = get("CLICKUP_TEAM_ID") {
            self.clickup.team_id = Some(v);
        }
        if let Some(v) = get("CLICKUP_INVOICING_LIST_ID") {
            self.clickup.invoicing_list_id = Some(v);
        }
        if let Some(v) = get("CLICKUP_API_URL") {
            self.clickup.base_url = v;
        }
        if let Some(v) = get("GATEWAY_AUTH_TOKEN") {
            self.server.auth_token = Some(v);
        }
        if let Some(v) = get("HOST") {
            self.server.host = v;
        }
        if let Some(v) = get("PORT") {
            self.server.port = v
                .parse()
                .with_context(|| format!("PORT must be a port number, got {v:?}"))?;
        }
        Ok(())
    }

    /// Startup requirements. The workspace id is checked per request instead,
    /// since list-scoped queries work without it.
    pub fn validate(&self) -> Result<()> {
        if self.clickup.api_token.is_none() {
            bail!("No ClickUp API token configured. Set CLICKUP_API_TOKEN");
        }
        if self.server.auth_token.is_none() {
            bail!("No gateway auth token configured. Set GATEWAY_AUTH_TOKEN");
        }
        if self.retrieval.default_limit == 0 {
            bail!("retrieval.default_limit must be at least 1");
        }
        Ok(())
    }

    pub fn retrieval_config(&self) -> RetrievalConfig {
        let active_lists = match &self.retrieval.active_lists {
            Some(names) => ListCatalog::new(names),
            None => ListCatalog::default(),
        };
        RetrievalConfig {
            workspace_id: self.clickup.team_id.clone(),
            invoicing_list_id: self.clickup.invoicing_list_id.clone(),
            active_lists,
            default_limit: self.retrieval.default_limit,
            invoicing_page_size: self.retrieval.invoicing_page_size,
        }
    }
}
