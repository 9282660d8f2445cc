//! The task retrieval engine behind the list tool: upstream fetch, local
//! refinement, pool classification, merge and truncation.

pub mod classifier;
pub mod matchers;
pub mod orchestrator;

pub use classifier::ListCatalog;
pub use orchestrator::{RetrievalConfig, RetrievalError, TaskListing, TaskRetriever};
