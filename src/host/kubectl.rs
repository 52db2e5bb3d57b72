//! `JobApi` over the kubectl command line
//!
//! Objects are piped to kubectl as JSON on stdin. Listing goes through
//! `kubectl get --raw` so page size, continuation token and label selector
//! reach the API server unchanged.

use std::sync::Arc;

use batchfleet_api::{ControlPlaneError, DaemonSet, Job, JobList, ListParams};
use serde::Serialize;
use tracing::debug;

use super::api::JobApi;
use super::runner::CommandRunner;

const KUBECTL: &str = "kubectl";

pub struct KubectlJobApi {
    runner: Arc<dyn CommandRunner>,
    /// kubeconfig context; `None` uses the current context.
    context: Option<String>,
}

impl KubectlJobApi {
    pub fn new(runner: Arc<dyn CommandRunner>, context: Option<String>) -> Self {
        Self { runner, context }
    }

    fn args(&self, rest: &[&str]) -> Vec<String> {
        let mut args = Vec::with_capacity(rest.len() + 2);
        if let Some(ref context) = self.context {
            args.push("--context".to_string());
            args.push(context.clone());
        }
        args.extend(rest.iter().map(|s| s.to_string()));
        args
    }

    fn run(&self, args: Vec<String>, stdin: Option<&str>) -> Result<String, ControlPlaneError> {
        let output = self
            .runner
            .run(KUBECTL, &args, stdin)
            .map_err(|e| ControlPlaneError::unavailable(format!("failed to run kubectl: {}", e)))?;

        if !output.success {
            return Err(ControlPlaneError::from_stderr(&output.stderr));
        }
        Ok(output.stdout)
    }

    fn pipe_object<T: Serialize>(
        &self,
        verb: &str,
        namespace: &str,
        object: &T,
    ) -> Result<(), ControlPlaneError> {
        let body = serde_json::to_string(object)
            .map_err(|e| ControlPlaneError::internal(format!("failed to encode object: {}", e)))?;
        let args = self.args(&[verb, "--namespace", namespace, "-f", "-"]);
        self.run(args, Some(&body))?;
        Ok(())
    }
}

/// API path of the Job collection in `namespace`.
pub fn jobs_path(namespace: &str, params: &ListParams) -> String {
    format!(
        "/apis/batch/v1/namespaces/{}/jobs?{}",
        namespace,
        params.to_query()
    )
}

impl JobApi for KubectlJobApi {
    fn create_job(&self, namespace: &str, job: &Job) -> Result<(), ControlPlaneError> {
        debug!(namespace, job = job.name(), "Creating job");
        self.pipe_object("create", namespace, job)
    }

    fn list_jobs(
        &self,
        namespace: &str,
        params: &ListParams,
    ) -> Result<JobList, ControlPlaneError> {
        let path = jobs_path(namespace, params);
        let stdout = self.run(self.args(&["get", "--raw", path.as_str()]), None)?;
        serde_json::from_str(&stdout)
            .map_err(|e| ControlPlaneError::internal(format!("unreadable job list: {}", e)))
    }

    fn delete_job(&self, namespace: &str, name: &str) -> Result<(), ControlPlaneError> {
        let args = self.args(&[
            "delete",
            "job",
            name,
            "--namespace",
            namespace,
            "--cascade=background",
            "--wait=false",
        ]);
        self.run(args, None)?;
        Ok(())
    }

    fn apply_daemon_set(
        &self,
        namespace: &str,
        daemon_set: &DaemonSet,
    ) -> Result<(), ControlPlaneError> {
        debug!(namespace, daemon_set = daemon_set.name(), "Applying daemonset");
        self.pipe_object("apply", namespace, daemon_set)
    }

    fn delete_daemon_set(&self, namespace: &str, name: &str) -> Result<(), ControlPlaneError> {
        let args = self.args(&[
            "delete",
            "daemonset",
            name,
            "--namespace",
            namespace,
            "--ignore-not-found",
            "--wait=false",
        ]);
        self.run(args, None)?;
        Ok(())
    }
}
