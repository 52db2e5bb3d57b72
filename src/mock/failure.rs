//! Failure injection for the fake control plane

use batchfleet_api::ControlPlaneError;

/// Control-plane calls that can be counted and failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlPlaneOp {
    CreateJob,
    ListJobs,
    DeleteJob,
    ApplyDaemonSet,
    DeleteDaemonSet,
    ListClusters,
    CreateCluster,
    DeleteCluster,
}

/// One injected failure
#[derive(Debug, Clone)]
pub struct FailureConfig {
    /// Error returned to the caller
    pub error: ControlPlaneError,
    /// Only calls naming this object fail (None = every call)
    pub target: Option<String>,
    /// Number of times to fail before succeeding (None = always fail)
    pub fail_count: Option<u32>,
}

impl FailureConfig {
    pub fn error(error: ControlPlaneError) -> Self {
        Self {
            error,
            target: None,
            fail_count: None,
        }
    }

    pub fn for_target(mut self, name: impl Into<String>) -> Self {
        self.target = Some(name.into());
        self
    }

    pub fn with_fail_count(mut self, count: u32) -> Self {
        self.fail_count = Some(count);
        self
    }

    fn applies_to(&self, target: Option<&str>) -> bool {
        match self.target {
            None => true,
            Some(ref wanted) => target == Some(wanted.as_str()),
        }
    }
}

#[derive(Debug)]
struct Injection {
    op: ControlPlaneOp,
    config: FailureConfig,
    hits: u32,
}

#[derive(Debug, Default)]
pub struct FailureInjector {
    injections: Vec<Injection>,
}

impl FailureInjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inject(&mut self, op: ControlPlaneOp, config: FailureConfig) {
        self.injections.push(Injection {
            op,
            config,
            hits: 0,
        });
    }

    pub fn clear(&mut self) {
        self.injections.clear();
    }

    pub fn clear_op(&mut self, op: ControlPlaneOp) {
        self.injections.retain(|i| i.op != op);
    }

    /// Error to return for a call of `op` on `target`, if one is injected.
    /// The first matching injection that still has failures left wins.
    pub fn check(&mut self, op: ControlPlaneOp, target: Option<&str>) -> Option<ControlPlaneError> {
        for injection in self
            .injections
            .iter_mut()
            .filter(|i| i.op == op && i.config.applies_to(target))
        {
            injection.hits += 1;
            match injection.config.fail_count {
                Some(limit) if injection.hits > limit => continue,
                _ => return Some(injection.config.error.clone()),
            }
        }
        None
    }
}
