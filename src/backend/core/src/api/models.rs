//! Request and response bodies. Everything on the wire is camelCase.

use serde::{Deserialize, Serialize};

use crate::scheduler::ExecutionRecord;

/// Records returned by `/jobs/history` when no count is given.
pub const DEFAULT_HISTORY_COUNT: usize = 50;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Outcome of a lifecycle command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleResponse {
    pub success: bool,
    pub message: String,
}

impl LifecycleResponse {
    pub fn new(success: bool, changed: &str, unchanged: &str) -> Self {
        Self {
            success,
            message: if success { changed } else { unchanged }.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    pub count: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShutdownQuery {
    pub wait_for_jobs_to_complete: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    /// Number of items returned
    pub total_count: usize,
    pub items: Vec<ExecutionRecord>,
}

impl From<Vec<ExecutionRecord>> for HistoryPage {
    fn from(items: Vec<ExecutionRecord>) -> Self {
        Self {
            total_count: items.len(),
            items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_messages() {
        let changed = LifecycleResponse::new(true, "Scheduler started", "Scheduler already running");
        assert_eq!(changed.message, "Scheduler started");
        let unchanged = LifecycleResponse::new(false, "Scheduler started", "Scheduler already running");
        assert_eq!(unchanged.message, "Scheduler already running");
    }

    #[test]
    fn test_shutdown_query_name() {
        let query: ShutdownQuery =
            serde_json::from_str(r#"{"waitForJobsToComplete": false}"#).unwrap();
        assert_eq!(query.wait_for_jobs_to_complete, Some(false));
    }

    #[test]
    fn test_history_page_counts_items() {
        let page = HistoryPage::from(Vec::new());
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["totalCount"], 0);
        assert!(json["items"].as_array().unwrap().is_empty());
    }
}
