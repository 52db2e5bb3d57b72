//! In-memory control plane
//!
//! Implements both [`JobApi`] and [`ClusterApi`] over a [`FakeState`], with
//! per-call counting and failure injection. Objects only change when a test
//! changes them: created jobs stay pending until [`FakeControlPlane::set_job_state`]
//! moves them on.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use batchfleet_api::{
    ClusterInfo, ClusterSpec, ControlPlaneError, DaemonSet, Job, JobList, JobSpec, ListParams,
    ObjectMeta, ProvisioningProfile,
};

use crate::host::{ClusterApi, JobApi};
use crate::jobs::{CompletionState, DATASET_INDEX_LABEL, MANAGED_BY_LABEL, MANAGER, RUN_LABEL};

use super::failure::{ControlPlaneOp, FailureConfig, FailureInjector};
use super::state::{status_for, FakeState};

#[derive(Debug, Default)]
pub struct FakeControlPlane {
    state: Mutex<FakeState>,
    failures: Mutex<FailureInjector>,
}

impl FakeControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn injector(&self) -> MutexGuard<'_, FailureInjector> {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count the call, then return the injected error for it, if any.
    fn enter(&self, op: ControlPlaneOp, target: Option<&str>) -> Result<(), ControlPlaneError> {
        self.state().count_call(op);
        match self.injector().check(op, target) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    // === Test configuration ===

    /// Fail every call of `op`, or only calls naming `target`.
    pub fn fail_on(&self, op: ControlPlaneOp, target: Option<&str>, error: ControlPlaneError) {
        let mut config = FailureConfig::error(error);
        if let Some(target) = target {
            config = config.for_target(target);
        }
        self.inject(op, config);
    }

    pub fn inject(&self, op: ControlPlaneOp, config: FailureConfig) {
        self.injector().inject(op, config);
    }

    pub fn clear_failures(&self) {
        self.injector().clear();
    }

    /// Number of calls of `op` so far, failed ones included.
    pub fn calls(&self, op: ControlPlaneOp) -> u32 {
        self.state().calls.get(&op).copied().unwrap_or(0)
    }

    /// Add `count` pending jobs named `{run}-{i}` carrying the managed labels.
    pub fn seed_jobs(&self, namespace: &str, run: &str, count: usize) {
        let mut state = self.state();
        let jobs = state.jobs.entry(namespace.to_string()).or_default();
        for index in 0..count {
            let name = format!("{}-{}", run, index);
            let labels = BTreeMap::from([
                (MANAGED_BY_LABEL.to_string(), MANAGER.to_string()),
                (RUN_LABEL.to_string(), run.to_string()),
                (DATASET_INDEX_LABEL.to_string(), index.to_string()),
            ]);
            let job = Job::new(
                ObjectMeta::named(&name, namespace).with_labels(labels),
                JobSpec::default(),
            );
            jobs.insert(name, job);
        }
    }

    /// Add a job this tool does not manage.
    pub fn seed_foreign_job(&self, namespace: &str, name: &str) {
        let job = Job::new(ObjectMeta::named(name, namespace), JobSpec::default());
        self.state()
            .jobs
            .entry(namespace.to_string())
            .or_default()
            .insert(name.to_string(), job);
    }

    /// Overwrite a job's status as the job controller would. Returns false
    /// when the job does not exist.
    pub fn set_job_state(&self, namespace: &str, name: &str, state: CompletionState) -> bool {
        let mut fake = self.state();
        let Some(job) = fake.jobs.get_mut(namespace).and_then(|jobs| jobs.get_mut(name)) else {
            return false;
        };
        let backoff_limit = job
            .spec
            .as_ref()
            .and_then(|spec| spec.backoff_limit)
            .unwrap_or(0);
        job.status = Some(status_for(state, backoff_limit));
        true
    }

    pub fn job(&self, namespace: &str, name: &str) -> Option<Job> {
        self.state()
            .jobs
            .get(namespace)
            .and_then(|jobs| jobs.get(name))
            .cloned()
    }

    /// Names of every job in `namespace`, sorted.
    pub fn job_names(&self, namespace: &str) -> Vec<String> {
        self.state()
            .jobs
            .get(namespace)
            .map(|jobs| jobs.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn job_count(&self, namespace: &str) -> usize {
        self.state().jobs.get(namespace).map_or(0, |jobs| jobs.len())
    }

    pub fn daemon_set(&self, namespace: &str, name: &str) -> Option<DaemonSet> {
        self.state()
            .daemon_sets
            .get(namespace)
            .and_then(|sets| sets.get(name))
            .cloned()
    }

    pub fn add_cluster(&self, cluster: ClusterInfo) {
        self.state().clusters.insert(cluster.name.clone(), cluster);
    }

    /// Names of every cluster in every region, sorted.
    pub fn cluster_names(&self) -> Vec<String> {
        self.state().clusters.keys().cloned().collect()
    }

    pub fn cluster(&self, name: &str) -> Option<ClusterInfo> {
        self.state().clusters.get(name).cloned()
    }
}

impl JobApi for FakeControlPlane {
    fn create_job(&self, namespace: &str, job: &Job) -> Result<(), ControlPlaneError> {
        self.enter(ControlPlaneOp::CreateJob, Some(job.name()))?;

        let mut state = self.state();
        let jobs = state.jobs.entry(namespace.to_string()).or_default();
        if jobs.contains_key(job.name()) {
            return Err(ControlPlaneError::already_exists("jobs.batch", job.name()));
        }

        let mut stored = job.clone();
        stored.metadata.namespace = Some(namespace.to_string());
        stored.metadata.creation_timestamp = Some(chrono::Utc::now());
        stored.status = None;
        jobs.insert(job.name().to_string(), stored);
        Ok(())
    }

    fn list_jobs(&self, namespace: &str, params: &ListParams) -> Result<JobList, ControlPlaneError> {
        self.enter(ControlPlaneOp::ListJobs, None)?;
        Ok(self.state().list_page(namespace, params))
    }

    fn delete_job(&self, namespace: &str, name: &str) -> Result<(), ControlPlaneError> {
        self.enter(ControlPlaneOp::DeleteJob, Some(name))?;
        self.state()
            .jobs
            .get_mut(namespace)
            .and_then(|jobs| jobs.remove(name))
            .map(|_| ())
            .ok_or_else(|| ControlPlaneError::not_found("jobs.batch", name))
    }

    fn apply_daemon_set(
        &self,
        namespace: &str,
        daemon_set: &DaemonSet,
    ) -> Result<(), ControlPlaneError> {
        self.enter(ControlPlaneOp::ApplyDaemonSet, Some(daemon_set.name()))?;
        self.state()
            .daemon_sets
            .entry(namespace.to_string())
            .or_default()
            .insert(daemon_set.name().to_string(), daemon_set.clone());
        Ok(())
    }

    fn delete_daemon_set(&self, namespace: &str, name: &str) -> Result<(), ControlPlaneError> {
        self.enter(ControlPlaneOp::DeleteDaemonSet, Some(name))?;
        if let Some(sets) = self.state().daemon_sets.get_mut(namespace) {
            sets.remove(name);
        }
        Ok(())
    }
}

impl ClusterApi for FakeControlPlane {
    fn list_clusters(
        &self,
        _project: &str,
        region: &str,
    ) -> Result<Vec<ClusterInfo>, ControlPlaneError> {
        self.enter(ControlPlaneOp::ListClusters, None)?;
        Ok(self
            .state()
            .clusters
            .values()
            .filter(|cluster| cluster.location.as_deref() == Some(region))
            .cloned()
            .collect())
    }

    fn create_cluster(
        &self,
        _project: &str,
        spec: &ClusterSpec,
        _profile: &ProvisioningProfile,
    ) -> Result<(), ControlPlaneError> {
        self.enter(ControlPlaneOp::CreateCluster, Some(&spec.name))?;

        let mut state = self.state();
        if state.clusters.contains_key(&spec.name) {
            return Err(ControlPlaneError::already_exists("cluster", &spec.name));
        }
        let mut cluster = ClusterInfo::new(&spec.name, &spec.region);
        cluster.status = Some("PROVISIONING".to_string());
        cluster.current_node_count = Some(spec.node_count);
        state.clusters.insert(spec.name.clone(), cluster);
        Ok(())
    }

    fn delete_cluster(
        &self,
        _project: &str,
        _region: &str,
        name: &str,
    ) -> Result<(), ControlPlaneError> {
        self.enter(ControlPlaneOp::DeleteCluster, Some(name))?;
        self.state()
            .clusters
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ControlPlaneError::not_found("cluster", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::classify;

    #[test]
    fn test_create_then_duplicate() {
        let fake = FakeControlPlane::new();
        let job = Job::new(ObjectMeta::named("run6-0", "default"), JobSpec::default());

        fake.create_job("default", &job).unwrap();
        let err = fake.create_job("default", &job).unwrap_err();

        assert!(err.is_already_exists());
        assert_eq!(fake.calls(ControlPlaneOp::CreateJob), 2);
        assert!(fake.job("default", "run6-0").unwrap().metadata.creation_timestamp.is_some());
    }

    #[test]
    fn test_delete_missing_job() {
        let fake = FakeControlPlane::new();
        let err = fake.delete_job("default", "nope").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_set_job_state() {
        let fake = FakeControlPlane::new();
        fake.seed_jobs("default", "run6", 1);

        assert!(fake.set_job_state("default", "run6-0", CompletionState::Failed));
        assert!(!fake.set_job_state("default", "run6-9", CompletionState::Failed));

        let job = fake.job("default", "run6-0").unwrap();
        assert_eq!(classify(job.status.as_ref()), CompletionState::Failed);
    }

    #[test]
    fn test_failed_call_still_counted() {
        let fake = FakeControlPlane::new();
        fake.fail_on(
            ControlPlaneOp::ListClusters,
            None,
            ControlPlaneError::unavailable("down"),
        );

        assert!(fake.list_clusters("p", "r").is_err());
        fake.clear_failures();
        assert!(fake.list_clusters("p", "r").is_ok());
        assert_eq!(fake.calls(ControlPlaneOp::ListClusters), 2);
    }

    #[test]
    fn test_list_clusters_by_region() {
        let fake = FakeControlPlane::new();
        fake.add_cluster(ClusterInfo::new("a", "europe-west4"));
        fake.add_cluster(ClusterInfo::new("b", "us-central1"));

        let listed = fake.list_clusters("p", "europe-west4").unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "a");
    }

    #[test]
    fn test_created_cluster_is_provisioning() {
        let fake = FakeControlPlane::new();
        let spec = ClusterSpec {
            name: "kubecon-demo-0".to_string(),
            machine_type: "n1-standard-8".to_string(),
            node_count: 4,
            region: "europe-west4".to_string(),
            subnetwork: "kubecon-demo-0".to_string(),
        };

        fake.create_cluster("p", &spec, &ProvisioningProfile::default())
            .unwrap();

        let cluster = fake.cluster("kubecon-demo-0").unwrap();
        assert_eq!(cluster.status.as_deref(), Some("PROVISIONING"));
        assert_eq!(cluster.current_node_count, Some(4));
    }

    #[test]
    fn test_daemon_set_delete_is_idempotent() {
        let fake = FakeControlPlane::new();
        fake.delete_daemon_set("default", "batchfleet-prepull").unwrap();
        fake.delete_daemon_set("default", "batchfleet-prepull").unwrap();
        assert_eq!(fake.calls(ControlPlaneOp::DeleteDaemonSet), 2);
    }
}
