use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_LIMIT: usize = 40;

/// Query parameters exactly as the transport delivers them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTaskQuery {
    pub search: Option<String>,
    pub list_id: Option<String>,
    pub sector: Option<String>,
    pub job_number: Option<String>,
    pub include_invoicing: Option<String>,
    pub limit: Option<String>,
}

/// Parsed caller intent for the list tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    pub search: Option<String>,
    pub list_id: Option<String>,
    pub sector: Option<String>,
    pub job_number: Option<String>,
    pub include_invoicing: bool,
    /// `None` means the configured default applies.
    pub limit: Option<usize>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("limit must be a positive integer, got {0:?}")]
    InvalidLimit(String),
}

impl TryFrom<RawTaskQuery> for TaskQuery {
    type Error = QueryError;

    fn try_from(raw: RawTaskQuery) -> Result<Self, Self::Error> {
        let limit = match non_empty(raw.limit) {
            Some(s) => match s.parse::<usize>() {
                Ok(n) if n > 0 => Some(n),
                _ => return Err(QueryError::InvalidLimit(s)),
            },
            None => None,
        };

        Ok(TaskQuery {
            search: non_empty(raw.search),
            list_id: non_empty(raw.list_id),
            sector: non_empty(raw.sector),
            job_number: non_empty(raw.job_number),
            include_invoicing: non_empty(raw.include_invoicing)
                .map(|s| parse_flag(&s))
                .unwrap_or(false),
            limit,
        })
    }
}

impl TaskQuery {
    /// Term sent to the upstream search parameter: an explicit search wins
    /// over the job number.
    pub fn upstream_search(&self) -> Option<&str> {
        self.search.as_deref().or(self.job_number.as_deref())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}
