use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::{FetchError, FetchRequest, Provider, Source};
use crate::model::task::Task;

pub const DEFAULT_BASE_URL: &str = "https://api.clickup.com/api/v2";

pub struct ClickUpProvider {
    base_url: Url,
    client: reqwest::Client,
}

impl ClickUpProvider {
    pub fn new(base_url: String, api_token: String) -> anyhow::Result<Self> {
        let base_url = Url::parse(&base_url).context("Invalid ClickUp API URL")?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("ClickUp API URL {base_url} cannot take a path");
        }

        // Personal tokens go in the header as-is, no Bearer prefix.
        let mut auth = HeaderValue::from_str(&api_token).context("Invalid ClickUp API token")?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { base_url, client })
    }

    /// Base URL extended by `segments`, each percent-encoded as exactly one
    /// path segment, so ids can neither climb the path nor start a query.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn tasks_url(&self, source: &Source) -> Result<Url, FetchError> {
        Ok(match source {
            Source::Workspace(team_id) => self.endpoint(&["team", path_id(team_id)?, "task"]),
            Source::List(list_id) => self.endpoint(&["list", path_id(list_id)?, "task"]),
        })
    }
}

/// Empty, `.` and `..` would collapse or drop the segment instead of naming
/// a resource.
fn path_id(id: &str) -> Result<&str, FetchError> {
    match id {
        "" | "." | ".." => Err(FetchError::InvalidId(id.to_string())),
        _ => Ok(id),
    }
}

#[derive(Deserialize)]
struct TasksResponse {
    #[serde(default)]
    tasks: Vec<Task>,
}

/// Fixed listing parameters plus the per-request search term and page size.
fn query_params(request: &FetchRequest) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("subtasks", "true".to_string()),
        ("archived", "false".to_string()),
    ];
    if matches!(request.source, Source::Workspace(_)) {
        params.push(("include_closed", "false".to_string()));
    }
    params.push(("order_by", "created".to_string()));
    params.push(("reverse", "true".to_string()));
    params.push(("page", "0".to_string()));
    if let Some(term) = &request.search {
        params.push(("search", term.clone()));
    }
    if let Some(size) = request.page_size {
        params.push(("limit", size.to_string()));
    }
    params
}

/// Decode a 2xx JSON body; anything else becomes `FetchError::Upstream`.
async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, FetchError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(FetchError::Upstream {
            status: status.as_u16(),
            body,
        });
    }
    resp.json::<T>().await.map_err(|e| {
        if e.is_decode() {
            FetchError::Decode(e.to_string())
        } else {
            FetchError::Transport(e)
        }
    })
}

#[async_trait]
impl Provider for ClickUpProvider {
    fn name(&self) -> &str {
        "ClickUp"
    }

    async fn fetch_tasks(&self, request: &FetchRequest) -> Result<Vec<Task>, FetchError> {
        let url = self.tasks_url(&request.source)?;
        debug!(%url, search = ?request.search, page_size = ?request.page_size, "Fetching tasks");

        let resp = self
            .client
            .get(url)
            .query(&query_params(request))
            .send()
            .await?;
        let parsed: TasksResponse = read_json(resp).await?;
        debug!(count = parsed.tasks.len(), "Fetched tasks");
        Ok(parsed.tasks)
    }

    async fn fetch_task(&self, task_id: &str) -> Result<Task, FetchError> {
        let url = self.endpoint(&["task", path_id(task_id)?]);
        debug!(%url, "Fetching task");

        let resp = self.client.get(url).send().await?;
        read_json(resp).await
    }
}
