//! batchfleet - batch deployment orchestrator
//!
//! Partitions a dataset manifest into one Kubernetes Job per dataset, tracks
//! and cleans up those Jobs, and creates or tears down the GKE cluster fleet
//! that runs them.

pub mod config;
pub mod deploy;
pub mod fleet;
pub mod host;
pub mod jobs;
pub mod mock;
pub mod partition;
pub mod summary;
pub mod watch;

pub use config::{BuiltinDefaults, ConfigError, Configuration};
pub use deploy::{DeployError, DeploymentFacade};
pub use fleet::{ClusterFleetManager, FleetError, FleetTarget};
pub use jobs::{CompletionState, JobLifecycleController, StatusSnapshot};
pub use partition::{partition, PartitionError, WorkUnit};
pub use summary::{BatchReport, ExitCode};
pub use watch::{StatusWatcher, Tick};
