use std::collections::HashSet;

use crate::model::task::Task;

/// Pipeline stages whose lists make up the active pool.
pub const DEFAULT_ACTIVE_LISTS: &[&str] = &[
    "enquiry/quotation",
    "confirmed order",
    "design - work in progress",
    "production - work in progress",
    "fitting - work in progress",
];

/// Case-insensitive catalog of list names counted as active work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListCatalog {
    names: HashSet<String>,
}

impl ListCatalog {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names
                .into_iter()
                .map(|n| n.as_ref().trim().to_lowercase())
                .collect(),
        }
    }

    pub fn contains(&self, list_name: &str) -> bool {
        self.names.contains(&list_name.to_lowercase())
    }

    /// Whether the task's owning list is in the catalog. Tasks with no
    /// list are never active.
    pub fn is_active(&self, task: &Task) -> bool {
        task.list_name().is_some_and(|name| self.contains(name))
    }
}

impl Default for ListCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_ACTIVE_LISTS)
    }
}
