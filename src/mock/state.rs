//! In-memory control-plane state

use std::collections::{BTreeMap, HashMap};

use batchfleet_api::{
    ClusterInfo, DaemonSet, Job, JobCondition, JobList, JobStatus, ListMeta, ListParams,
};

use crate::jobs::CompletionState;

use super::failure::ControlPlaneOp;

/// Objects held by the fake, keyed by namespace then name.
#[derive(Debug, Default)]
pub struct FakeState {
    pub jobs: BTreeMap<String, BTreeMap<String, Job>>,
    pub daemon_sets: BTreeMap<String, BTreeMap<String, DaemonSet>>,
    pub clusters: BTreeMap<String, ClusterInfo>,
    pub calls: HashMap<ControlPlaneOp, u32>,
}

const TOKEN_PREFIX: &str = "after:";

impl FakeState {
    pub fn count_call(&mut self, op: ControlPlaneOp) {
        *self.calls.entry(op).or_insert(0) += 1;
    }

    /// One page of jobs in name order, honouring limit, selector and token.
    pub fn list_page(&self, namespace: &str, params: &ListParams) -> JobList {
        let after = params
            .continue_token
            .as_deref()
            .and_then(|t| t.strip_prefix(TOKEN_PREFIX));
        let selector = params.label_selector.as_deref().map(parse_selector);

        let mut matching = self
            .jobs
            .get(namespace)
            .into_iter()
            .flat_map(|jobs| jobs.values())
            .filter(|job| after.map_or(true, |after| job.name() > after))
            .filter(|job| {
                selector.as_ref().map_or(true, |wanted| {
                    wanted
                        .iter()
                        .all(|(k, v)| job.metadata.labels.get(k) == Some(v))
                })
            });

        let limit = params.limit.max(1) as usize;
        let items: Vec<Job> = matching.by_ref().take(limit).cloned().collect();
        let more = matching.next().is_some();

        let continue_token = match items.last() {
            Some(last) if more => Some(format!("{}{}", TOKEN_PREFIX, last.name())),
            _ => None,
        };

        JobList {
            items,
            metadata: ListMeta { continue_token },
        }
    }
}

/// Parse an equality-based selector such as `a=b,c=d`.
pub fn parse_selector(selector: &str) -> Vec<(String, String)> {
    selector
        .split(',')
        .filter_map(|term| term.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}

/// The status the job controller reports for a job in `state`.
pub fn status_for(state: CompletionState, backoff_limit: u32) -> JobStatus {
    match state {
        CompletionState::Pending => JobStatus::default(),
        CompletionState::Running => JobStatus {
            active: Some(1),
            ..JobStatus::default()
        },
        CompletionState::Succeeded => JobStatus {
            succeeded: Some(1),
            conditions: vec![JobCondition::active("Complete", None)],
            ..JobStatus::default()
        },
        CompletionState::Failed => JobStatus {
            failed: Some(backoff_limit + 1),
            conditions: vec![JobCondition::active("Failed", Some("BackoffLimitExceeded"))],
            ..JobStatus::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::classify;
    use batchfleet_api::ObjectMeta;

    fn state_with(names: &[&str]) -> FakeState {
        let mut state = FakeState::default();
        let jobs = state.jobs.entry("default".to_string()).or_default();
        for name in names {
            let mut labels = BTreeMap::new();
            labels.insert("team".to_string(), "higgs".to_string());
            let job = Job::new(
                ObjectMeta::named(*name, "default").with_labels(labels),
                Default::default(),
            );
            jobs.insert(name.to_string(), job);
        }
        state
    }

    #[test]
    fn test_paging() {
        let state = state_with(&["a", "b", "c"]);

        let first = state.list_page("default", &ListParams::new(2));
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.next_token(), Some("after:b"));

        let second = state.list_page(
            "default",
            &ListParams::new(2).continue_from(first.next_token()),
        );
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].name(), "c");
        assert_eq!(second.next_token(), None);
    }

    #[test]
    fn test_exact_page_has_no_token() {
        let state = state_with(&["a", "b"]);
        let page = state.list_page("default", &ListParams::new(2));
        assert_eq!(page.next_token(), None);
    }

    #[test]
    fn test_selector_filters() {
        let state = state_with(&["a"]);
        let hit = state.list_page("default", &ListParams::new(10).labels("team=higgs"));
        let miss = state.list_page("default", &ListParams::new(10).labels("team=atlas"));
        assert_eq!(hit.items.len(), 1);
        assert!(miss.items.is_empty());
    }

    #[test]
    fn test_unknown_namespace_is_empty() {
        let state = state_with(&["a"]);
        assert!(state.list_page("other", &ListParams::new(10)).items.is_empty());
    }

    #[test]
    fn test_status_for_round_trips_through_classify() {
        for state in CompletionState::ALL {
            assert_eq!(classify(Some(&status_for(state, 5))), state);
        }
    }
}
