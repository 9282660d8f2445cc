use std::cmp::Reverse;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::classifier::ListCatalog;
use super::matchers::{matches_job_number, matches_search, matches_sector};
use crate::model::query::{TaskQuery, DEFAULT_LIMIT};
use crate::model::task::{ResultItem, Task, TaskDetail};
use crate::providers::{FetchError, FetchRequest, Provider, Source};

pub const DEFAULT_INVOICING_PAGE_SIZE: u32 = 100;

/// Identifiers and catalogs the engine needs, injected at construction.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub workspace_id: Option<String>,
    pub invoicing_list_id: Option<String>,
    pub active_lists: ListCatalog,
    pub default_limit: usize,
    pub invoicing_page_size: u32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            workspace_id: None,
            invoicing_list_id: None,
            active_lists: ListCatalog::default(),
            default_limit: DEFAULT_LIMIT,
            invoicing_page_size: DEFAULT_INVOICING_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("workspace id is not configured")]
    MissingWorkspace,
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Response envelope of the list tool.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TaskListing {
    pub items: Vec<ResultItem>,
    pub total_returned: usize,
    pub active_count: usize,
    pub invoicing_count: usize,
    pub invoicing_included: bool,
    pub limit: usize,
}

pub struct TaskRetriever {
    provider: Arc<dyn Provider>,
    config: RetrievalConfig,
}

impl TaskRetriever {
    pub fn new(provider: Arc<dyn Provider>, config: RetrievalConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub async fn list_tasks(&self, query: &TaskQuery) -> Result<TaskListing, RetrievalError> {
        let source = match &query.list_id {
            Some(list_id) => Source::List(list_id.clone()),
            None => Source::Workspace(
                self.config
                    .workspace_id
                    .clone()
                    .ok_or(RetrievalError::MissingWorkspace)?,
            ),
        };

        let request = FetchRequest::new(source).search(query.upstream_search());
        let fetched = self.provider.fetch_tasks(&request).await?;
        let fetched_count = fetched.len();

        // A job number may sit on a task outside the catalog, so every
        // fetched task is a candidate. Invoicing-list tasks still only
        // arrive through the invoicing pool.
        let candidates: Vec<Task> = if query.job_number.is_some() {
            fetched
                .into_iter()
                .filter(|t| !self.is_invoicing_task(t))
                .collect()
        } else {
            fetched
                .into_iter()
                .filter(|t| self.config.active_lists.is_active(t))
                .collect()
        };

        let active = sort_newest_first(apply_filters(candidates, query));
        debug!(fetched = fetched_count, active = active.len(), "Active pool built");

        let (invoicing, invoicing_included) = self.invoicing_pool(query).await;

        let active_count = active.len();
        let invoicing_count = invoicing.len();
        let limit = query.limit.unwrap_or(self.config.default_limit);

        let items: Vec<ResultItem> = active
            .into_iter()
            .chain(invoicing)
            .take(limit)
            .map(ResultItem::from)
            .collect();

        Ok(TaskListing {
            total_returned: items.len(),
            items,
            active_count,
            invoicing_count,
            invoicing_included,
            limit,
        })
    }

    /// Single-task pass-through with field projection.
    pub async fn get_task(&self, task_id: &str) -> Result<TaskDetail, RetrievalError> {
        let task = self.provider.fetch_task(task_id).await?;
        Ok(TaskDetail::from(task))
    }

    fn is_invoicing_task(&self, task: &Task) -> bool {
        match (&self.config.invoicing_list_id, task.list_id()) {
            (Some(invoicing), Some(list_id)) => invoicing == list_id,
            _ => false,
        }
    }

    /// Fetch and refine the invoicing pool when the query calls for it.
    /// Upstream failures here degrade to an empty pool.
    async fn invoicing_pool(&self, query: &TaskQuery) -> (Vec<Task>, bool) {
        if !query.include_invoicing && query.job_number.is_none() {
            return (Vec::new(), false);
        }

        let Some(list_id) = &self.config.invoicing_list_id else {
            if query.include_invoicing {
                warn!("Invoicing requested but no invoicing list is configured");
            }
            return (Vec::new(), false);
        };

        let request = FetchRequest::new(Source::List(list_id.clone()))
            .search(query.upstream_search())
            .page_size(self.config.invoicing_page_size);

        let tasks = match self.provider.fetch_tasks(&request).await {
            Ok(tasks) => tasks,
            Err(e) => {
                warn!(error = %e, "Invoicing fetch failed, continuing without it");
                Vec::new()
            }
        };

        let pool = sort_newest_first(apply_filters(tasks, query));
        debug!(invoicing = pool.len(), "Invoicing pool built");
        (pool, true)
    }
}

/// Conjunctive local filters: search, then sector, then job number.
fn apply_filters(tasks: Vec<Task>, query: &TaskQuery) -> Vec<Task> {
    tasks
        .into_iter()
        .filter(|t| query.search.as_deref().is_none_or(|s| matches_search(t, s)))
        .filter(|t| query.sector.as_deref().is_none_or(|s| matches_sector(t, s)))
        .filter(|t| {
            query
                .job_number
                .as_deref()
                .is_none_or(|j| matches_job_number(t, j))
        })
        .collect()
}

/// Stable sort by creation time, newest first; missing timestamps count as zero.
fn sort_newest_first(mut tasks: Vec<Task>) -> Vec<Task> {
    tasks.sort_by_key(|t| Reverse(t.date_created.unwrap_or(0)));
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::tests::{make_task, make_task_in, with_field, MockProvider};
    use serde_json::json;

    const WORKSPACE: &str = "team-1";
    const INVOICING: &str = "inv-list";

    fn config() -> RetrievalConfig {
        RetrievalConfig {
            workspace_id: Some(WORKSPACE.into()),
            invoicing_list_id: Some(INVOICING.into()),
            ..RetrievalConfig::default()
        }
    }

    fn workspace() -> Source {
        Source::Workspace(WORKSPACE.into())
    }

    fn invoicing() -> Source {
        Source::List(INVOICING.into())
    }

    fn invoicing_task(id: &str, name: &str, created: Option<i64>) -> Task {
        make_task_in(id, name, INVOICING, "Invoicing", created)
    }

    fn retriever(provider: MockProvider, config: RetrievalConfig) -> (TaskRetriever, Arc<MockProvider>) {
        let provider = Arc::new(provider);
        (TaskRetriever::new(provider.clone(), config), provider)
    }

    fn query() -> TaskQuery {
        TaskQuery::default()
    }

    fn ids(listing: &TaskListing) -> Vec<&str> {
        listing.items.iter().map(|i| i.id.as_str()).collect()
    }

    /// Workspace with one active task and one in the invoicing list.
    fn two_list_provider() -> MockProvider {
        MockProvider::new()
            .with_tasks(
                workspace(),
                vec![
                    make_task("design", "Design job", "Design - Work in progress", Some(20)),
                    invoicing_task("inv", "Billed job", Some(10)),
                ],
            )
            .with_tasks(invoicing(), vec![invoicing_task("inv", "Billed job", Some(10))])
    }

    #[tokio::test]
    async fn without_invoicing_only_active_lists_appear() {
        let (r, provider) = retriever(two_list_provider(), config());
        let listing = r.list_tasks(&query()).await.unwrap();

        assert_eq!(ids(&listing), ["design"]);
        assert_eq!(listing.active_count, 1);
        assert_eq!(listing.invoicing_count, 0);
        assert!(!listing.invoicing_included);
        assert_eq!(listing.limit, DEFAULT_LIMIT);
        assert_eq!(provider.recorded().len(), 1);
    }

    #[tokio::test]
    async fn with_invoicing_active_comes_first() {
        let (r, provider) = retriever(two_list_provider(), config());
        let listing = r
            .list_tasks(&TaskQuery {
                include_invoicing: true,
                limit: Some(10),
                ..query()
            })
            .await
            .unwrap();

        assert_eq!(ids(&listing), ["design", "inv"]);
        assert_eq!(listing.active_count, 1);
        assert_eq!(listing.invoicing_count, 1);
        assert_eq!(listing.total_returned, 2);
        assert!(listing.invoicing_included);

        let requests = provider.recorded();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].source, workspace());
        assert_eq!(requests[1].source, invoicing());
        assert_eq!(requests[1].page_size, Some(DEFAULT_INVOICING_PAGE_SIZE));
    }

    #[tokio::test]
    async fn job_number_bypasses_catalog_and_pulls_invoicing() {
        let kitchen = with_field(
            make_task("kitchen", "Kitchen Job", "Site Survey", Some(5)),
            "Job Number",
            json!("4821"),
        );
        let provider = MockProvider::new()
            .with_tasks(
                workspace(),
                vec![kitchen, make_task("other", "Other", "Confirmed Order", Some(9))],
            )
            .with_tasks(invoicing(), vec![]);
        let (r, provider) = retriever(provider, config());

        let listing = r
            .list_tasks(&TaskQuery {
                job_number: Some("4821".into()),
                ..query()
            })
            .await
            .unwrap();

        assert_eq!(ids(&listing), ["kitchen"]);
        assert!(listing.invoicing_included);
        let requests = provider.recorded();
        assert_eq!(requests[0].search.as_deref(), Some("4821"));
        assert_eq!(requests[1].source, invoicing());
    }

    #[tokio::test]
    async fn job_number_never_duplicates_invoicing_list_tasks() {
        let inv = with_field(invoicing_task("inv", "Billed", Some(3)), "Job Number", json!("77"));
        let provider = MockProvider::new()
            .with_tasks(workspace(), vec![inv.clone()])
            .with_tasks(invoicing(), vec![inv]);
        let (r, _) = retriever(provider, config());

        let listing = r
            .list_tasks(&TaskQuery {
                job_number: Some("77".into()),
                ..query()
            })
            .await
            .unwrap();

        assert_eq!(ids(&listing), ["inv"]);
        assert_eq!(listing.active_count, 0);
        assert_eq!(listing.invoicing_count, 1);
    }

    #[tokio::test]
    async fn list_id_scopes_the_primary_fetch() {
        let provider = MockProvider::new().with_tasks(
            Source::List("901".into()),
            vec![make_task("a", "A", "Confirmed Order", Some(1))],
        );
        let (r, provider) = retriever(
            provider,
            RetrievalConfig {
                workspace_id: None,
                ..config()
            },
        );

        let listing = r
            .list_tasks(&TaskQuery {
                list_id: Some("901".into()),
                search: Some("a".into()),
                job_number: Some("zzz".into()),
                ..query()
            })
            .await
            .unwrap();

        assert!(listing.items.is_empty());
        let first = &provider.recorded()[0];
        assert_eq!(first.source, Source::List("901".into()));
        assert_eq!(first.search.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn missing_workspace_fails_before_any_fetch() {
        let (r, provider) = retriever(
            MockProvider::new(),
            RetrievalConfig {
                workspace_id: None,
                ..config()
            },
        );
        let err = r.list_tasks(&query()).await.unwrap_err();
        assert!(matches!(err, RetrievalError::MissingWorkspace));
        assert!(provider.recorded().is_empty());
    }

    #[tokio::test]
    async fn primary_failure_propagates() {
        let provider = MockProvider::new().with_failure(workspace(), 401, r#"{"err":"Token invalid"}"#);
        let (r, _) = retriever(provider, config());
        let err = r.list_tasks(&query()).await.unwrap_err();
        assert!(matches!(
            err,
            RetrievalError::Fetch(FetchError::Upstream { status: 401, .. })
        ));
    }

    #[tokio::test]
    async fn invoicing_failure_degrades_to_empty_pool() {
        let provider = MockProvider::new()
            .with_tasks(
                workspace(),
                vec![make_task("a", "A", "Confirmed Order", Some(1))],
            )
            .with_failure(invoicing(), 500, "boom");
        let (r, _) = retriever(provider, config());

        let listing = r
            .list_tasks(&TaskQuery {
                include_invoicing: true,
                ..query()
            })
            .await
            .unwrap();

        assert_eq!(ids(&listing), ["a"]);
        assert_eq!(listing.invoicing_count, 0);
        assert!(listing.invoicing_included);
    }

    #[tokio::test]
    async fn invoicing_requested_without_configured_list_is_skipped() {
        let (r, provider) = retriever(
            two_list_provider(),
            RetrievalConfig {
                invoicing_list_id: None,
                ..config()
            },
        );
        let listing = r
            .list_tasks(&TaskQuery {
                include_invoicing: true,
                ..query()
            })
            .await
            .unwrap();

        assert!(!listing.invoicing_included);
        assert_eq!(ids(&listing), ["design"]);
        assert_eq!(provider.recorded().len(), 1);
    }

    #[tokio::test]
    async fn pools_sort_newest_first_with_missing_dates_last() {
        let provider = MockProvider::new()
            .with_tasks(
                workspace(),
                vec![
                    make_task("none", "N", "Confirmed Order", None),
                    make_task("old", "O", "Confirmed Order", Some(100)),
                    make_task("new", "N2", "Fitting - Work in progress", Some(300)),
                    make_task("tie-a", "TA", "Confirmed Order", Some(200)),
                    make_task("tie-b", "TB", "Confirmed Order", Some(200)),
                ],
            )
            .with_tasks(
                invoicing(),
                vec![
                    invoicing_task("inv-old", "I1", Some(1)),
                    invoicing_task("inv-new", "I2", Some(999)),
                ],
            );
        let (r, _) = retriever(provider, config());

        let listing = r
            .list_tasks(&TaskQuery {
                include_invoicing: true,
                ..query()
            })
            .await
            .unwrap();

        assert_eq!(
            ids(&listing),
            ["new", "tie-a", "tie-b", "old", "none", "inv-new", "inv-old"]
        );
    }

    #[tokio::test]
    async fn limit_truncates_but_counts_report_pool_sizes() {
        let active: Vec<Task> = (0..5)
            .map(|i| make_task(&format!("a{i}"), "A", "Confirmed Order", Some(100 - i)))
            .collect();
        let provider = MockProvider::new()
            .with_tasks(workspace(), active)
            .with_tasks(invoicing(), vec![invoicing_task("i", "I", Some(1))]);
        let (r, _) = retriever(provider, config());

        let listing = r
            .list_tasks(&TaskQuery {
                include_invoicing: true,
                limit: Some(3),
                ..query()
            })
            .await
            .unwrap();

        assert_eq!(ids(&listing), ["a0", "a1", "a2"]);
        assert_eq!(listing.total_returned, 3);
        assert_eq!(listing.active_count, 5);
        assert_eq!(listing.invoicing_count, 1);
    }

    #[tokio::test]
    async fn filters_are_conjunctive_and_apply_to_both_pools() {
        let res = |id: &str, name: &str, list: &str| {
            with_field(make_task(id, name, list, Some(1)), "Sector", json!({ "label": "Residential" }))
        };
        let provider = MockProvider::new()
            .with_tasks(
                workspace(),
                vec![
                    res("match", "Kitchen", "Confirmed Order"),
                    res("wrong-name", "Bathroom", "Confirmed Order"),
                    make_task("no-sector", "Kitchen", "Confirmed Order", Some(1)),
                ],
            )
            .with_tasks(
                invoicing(),
                vec![
                    with_field(
                        invoicing_task("inv-match", "Kitchen", Some(1)),
                        "Sector",
                        json!("residential"),
                    ),
                    invoicing_task("inv-miss", "Kitchen", Some(1)),
                ],
            );
        let (r, provider) = retriever(provider, config());

        let listing = r
            .list_tasks(&TaskQuery {
                search: Some("kitchen".into()),
                sector: Some("residential".into()),
                include_invoicing: true,
                ..query()
            })
            .await
            .unwrap();

        assert_eq!(ids(&listing), ["match", "inv-match"]);
        for req in provider.recorded() {
            assert_eq!(req.search.as_deref(), Some("kitchen"));
        }
    }

    #[tokio::test]
    async fn identical_requests_yield_identical_envelopes() {
        let (r, _) = retriever(two_list_provider(), config());
        let q = TaskQuery {
            include_invoicing: true,
            ..query()
        };
        let first = r.list_tasks(&q).await.unwrap();
        let second = r.list_tasks(&q).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn get_task_projects_detail() {
        let (r, _) = retriever(two_list_provider(), config());
        let detail = r.get_task("design").await.unwrap();
        assert_eq!(detail.name, "Design job");
        assert_eq!(detail.list.as_deref(), Some("Design - Work in progress"));

        assert!(matches!(
            r.get_task("nope").await,
            Err(RetrievalError::Fetch(FetchError::Upstream { status: 404, .. }))
        ));
    }
}
