pub mod clickup;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::AppConfig;
use crate::model::task::Task;

/// Which upstream collection a fetch targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Source {
    /// Every task in the workspace (team).
    Workspace(String),
    /// Tasks of one list.
    List(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub source: Source,
    pub search: Option<String>,
    /// Remote page size. `None` leaves the upstream default.
    pub page_size: Option<u32>,
}

impl FetchRequest {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            search: None,
            page_size: None,
        }
    }

    pub fn search(mut self, term: Option<&str>) -> Self {
        self.search = term.map(String::from);
        self
    }

    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("failed to decode upstream response: {0}")]
    Decode(String),
    #[error("{0:?} is not a usable identifier")]
    InvalidId(String),
}

#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;
    /// One listing request against the upstream API. No retries.
    async fn fetch_tasks(&self, request: &FetchRequest) -> Result<Vec<Task>, FetchError>;
    async fn fetch_task(&self, task_id: &str) -> Result<Task, FetchError>;
}


pub fn create_provider(config: &AppConfig) -> anyhow::Result<Arc<dyn Provider>> {
    let provider = clickup::ClickUpProvider::new(
        config.clickup.base_url.clone(),
        config.clickup.api_token.clone().unwrap_or_default(),
    )?;
    Ok(Arc::new(provider))
}
