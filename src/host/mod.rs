//! Control-plane access
//!
//! Traits the orchestrator drives, and their production implementations
//! over the `kubectl` and `gcloud` command line tools.

pub mod api;
pub mod gcloud;
pub mod kubectl;
pub mod runner;

pub use api::{ClusterApi, JobApi};
pub use gcloud::GcloudClusterApi;
pub use kubectl::KubectlJobApi;
pub use runner::{CommandOutput, CommandRunner, SystemRunner};
