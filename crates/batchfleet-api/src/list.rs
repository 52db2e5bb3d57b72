//! Paginated list responses and request parameters.

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::job::Job;

/// One page of a Job listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobList {
    #[serde(default)]
    pub items: Vec<Job>,

    #[serde(default)]
    pub metadata: ListMeta,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListMeta {
    /// Opaque token for the next page; absent or empty on the last page.
    #[serde(rename = "continue", default, skip_serializing_if = "Option::is_none")]
    pub continue_token: Option<String>,
}

impl JobList {
    /// Token for the next page, treating an empty token as "no more pages".
    pub fn next_token(&self) -> Option<&str> {
        self.metadata
            .continue_token
            .as_deref()
            .filter(|token| !token.is_empty())
    }
}

/// Parameters of a single list request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
    /// Maximum objects returned in one page.
    pub limit: u32,
    pub continue_token: Option<String>,
    pub label_selector: Option<String>,
}

impl ListParams {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            continue_token: None,
            label_selector: None,
        }
    }

    pub fn labels(mut self, selector: impl Into<String>) -> Self {
        self.label_selector = Some(selector.into());
        self
    }

    pub fn continue_from(mut self, token: Option<&str>) -> Self {
        self.continue_token = token.map(str::to_string);
        self
    }

    /// URL query string for the list endpoint.
    pub fn to_query(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query.append_pair("limit", &self.limit.to_string());
        if let Some(ref selector) = self.label_selector {
            query.append_pair("labelSelector", selector);
        }
        if let Some(ref token) = self.continue_token {
            query.append_pair("continue", token);
        }
        query.finish()
    }
}
