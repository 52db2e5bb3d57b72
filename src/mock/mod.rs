//! Test doubles for the control plane
//!
//! - [`FakeControlPlane`]: in-memory jobs, daemon sets and clusters behind
//!   [`crate::host::JobApi`] and [`crate::host::ClusterApi`], with call
//!   counting and failure injection
//! - [`ScriptedRunner`]: a [`crate::host::CommandRunner`] that replays queued
//!   tool output and records what it was asked to run

mod failure;
mod fake;
mod runner;
mod state;

pub use failure::{ControlPlaneOp, FailureConfig, FailureInjector};
pub use fake::FakeControlPlane;
pub use runner::{RecordedCommand, ScriptedRunner};
pub use state::FakeState;
