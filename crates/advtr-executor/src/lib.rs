//! Lifecycle stage planning and command execution for advtr.
//!
//! An [`Image`](advtr_core::Image) is turned into an [`ImagePlan`]: the
//! ordered stages with their shell commands. A [`Builder`] then runs the
//! plans through a [`CommandRunner`].

pub mod builder;
pub mod plan;
pub mod runner;

pub use builder::{BuildReport, BuildStatus, Builder, StageReport};
pub use plan::{ImagePlan, PlanOptions, Planner, StagePlan};
pub use runner::{CommandOutput, CommandRunner, DryRunRunner, ShellRunner};
