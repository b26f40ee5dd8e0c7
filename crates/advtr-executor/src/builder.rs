//! Sequential image builder.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

use advtr_core::{Error, LifecycleStage, Result};

use crate::plan::ImagePlan;
use crate::runner::CommandRunner;

/// Where a build is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    Pending,
    Running {
        stage: LifecycleStage,
    },
    Succeeded,
    Failed {
        stage: LifecycleStage,
        command: String,
        message: String,
    },
}

impl BuildStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BuildStatus::Succeeded | BuildStatus::Failed { .. })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BuildStatus::Succeeded)
    }
}

/// Timing of one finished (or failed) stage.
#[derive(Debug, Clone)]
pub struct StageReport {
    pub stage: LifecycleStage,
    /// Commands that ran, including a failing last one.
    pub commands: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl StageReport {
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Outcome of building one image.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub label: String,
    pub tags: Vec<String>,
    pub status: BuildStatus,
    pub stages: Vec<StageReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl BuildReport {
    fn new(plan: &ImagePlan) -> Self {
        Self {
            label: plan.label.clone(),
            tags: plan.tags.clone(),
            status: BuildStatus::Pending,
            stages: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn duration(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|finished| finished - self.started_at)
    }

    /// `Err` with the failing command when the build failed.
    pub fn into_result(self) -> Result<Self> {
        match self.status {
            BuildStatus::Failed {
                command, message, ..
            } => Err(Error::ExecutionFailed { command, message }),
            _ => Ok(self),
        }
    }
}

/// Runs image plans one command at a time.
pub struct Builder {
    runner: Arc<dyn CommandRunner>,
    working_dir: PathBuf,
}

impl Builder {
    pub fn new(runner: Arc<dyn CommandRunner>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            working_dir: working_dir.into(),
        }
    }

    /// Run every stage of a plan, stopping at the first failing command.
    #[instrument(skip(self, plan), fields(image = %plan.label, runner = self.runner.name()))]
    pub async fn run(&self, plan: &ImagePlan) -> BuildReport {
        let mut report = BuildReport::new(plan);

        for stage in &plan.stages {
            report.status = BuildStatus::Running { stage: stage.stage };
            info!(stage = %stage.stage, commands = stage.commands.len(), "Running stage");

            let started_at = Utc::now();
            let mut ran = Vec::with_capacity(stage.commands.len());
            let mut failure = None;

            for command in &stage.commands {
                debug!("$ {}", command);
                ran.push(command.clone());

                match self.runner.run(command, &self.working_dir).await {
                    Ok(output) if output.success() => {
                        if !output.stdout.is_empty() {
                            debug!(stdout = %output.stdout.trim_end(), "Command output");
                        }
                    }
                    Ok(output) => {
                        let code = output
                            .exit_code
                            .map_or_else(|| "signal".to_string(), |c| c.to_string());
                        let stderr = output.stderr.trim();
                        let message = if stderr.is_empty() {
                            format!("exited with {}", code)
                        } else {
                            format!("exited with {}: {}", code, stderr)
                        };
                        failure = Some((command.clone(), message));
                        break;
                    }
                    Err(Error::ExecutionFailed { message, .. }) => {
                        failure = Some((command.clone(), message));
                        break;
                    }
                    Err(e) => {
                        failure = Some((command.clone(), e.to_string()));
                        break;
                    }
                }
            }

            report.stages.push(StageReport {
                stage: stage.stage,
                commands: ran,
                started_at,
                finished_at: Utc::now(),
            });

            if let Some((command, message)) = failure {
                error!(stage = %stage.stage, %command, %message, "Stage failed");
                report.status = BuildStatus::Failed {
                    stage: stage.stage,
                    command,
                    message,
                };
                report.finished_at = Some(Utc::now());
                return report;
            }
        }

        report.status = BuildStatus::Succeeded;
        report.finished_at = Some(Utc::now());
        info!(tags = ?report.tags, "Image built");
        report
    }

    /// Run plans in order. The first failed build aborts the rest.
    pub async fn run_all(&self, plans: &[ImagePlan]) -> Result<Vec<BuildReport>> {
        let mut reports = Vec::with_capacity(plans.len());
        for plan in plans {
            reports.push(self.run(plan).await.into_result()?);
        }
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::StagePlan;
    use crate::runner::{CommandOutput, DryRunRunner};
    use async_trait::async_trait;
    use std::path::Path;
    use tokio::sync::Mutex;

    /// Fails every command containing `fail`.
    #[derive(Default)]
    struct ScriptedRunner {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn run(&self, command: &str, _working_dir: &Path) -> Result<CommandOutput> {
            self.seen.lock().await.push(command.to_string());
            if command.contains("fail") {
                Ok(CommandOutput {
                    exit_code: Some(2),
                    stderr: "boom\n".to_string(),
                    ..Default::default()
                })
            } else {
                Ok(CommandOutput {
                    exit_code: Some(0),
                    stdout: "ok\n".to_string(),
                    ..Default::default()
                })
            }
        }
    }

    fn plan(label: &str, stages: &[(LifecycleStage, &[&str])]) -> ImagePlan {
        ImagePlan {
            label: label.to_string(),
            tags: vec![format!("bob/{}:latest", label)],
            stages: stages
                .iter()
                .map(|(stage, commands)| StagePlan {
                    stage: *stage,
                    commands: commands.iter().map(|c| c.to_string()).collect(),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_runs_stages_in_order() {
        let runner = Arc::new(DryRunRunner::new());
        let builder = Builder::new(runner.clone(), ".");
        let plan = plan(
            "api",
            &[
                (LifecycleStage::PreBuild, &["npm ci", "npm test"]),
                (LifecycleStage::Build, &["docker build -t bob/api:latest ."]),
            ],
        );

        let report = builder.run(&plan).await;
        assert!(report.status.is_success());
        assert!(report.finished_at.is_some());
        assert_eq!(report.stages.len(), 2);
        assert!(report.stages.iter().all(|s| s.duration() >= chrono::Duration::zero()));
        assert_eq!(
            runner.commands().await,
            vec!["npm ci", "npm test", "docker build -t bob/api:latest ."]
        );
    }

    #[tokio::test]
    async fn test_first_failure_stops_build() {
        let runner = Arc::new(ScriptedRunner::default());
        let builder = Builder::new(runner.clone(), ".");
        let plan = plan(
            "api",
            &[
                (LifecycleStage::PreBuild, &["./fail.sh", "never"]),
                (LifecycleStage::Build, &["docker build ."]),
            ],
        );

        let report = builder.run(&plan).await;
        assert_eq!(
            report.status,
            BuildStatus::Failed {
                stage: LifecycleStage::PreBuild,
                command: "./fail.sh".to_string(),
                message: "exited with 2: boom".to_string(),
            }
        );
        assert_eq!(report.stages.len(), 1);
        assert_eq!(*runner.seen.lock().await, vec!["./fail.sh"]);
    }

    #[tokio::test]
    async fn test_run_all_aborts_on_failure() {
        let runner = Arc::new(ScriptedRunner::default());
        let builder = Builder::new(runner.clone(), ".");
        let plans = vec![
            plan("api", &[(LifecycleStage::Build, &["build api"])]),
            plan("web", &[(LifecycleStage::Build, &["build web && fail"])]),
            plan("docs", &[(LifecycleStage::Build, &["build docs"])]),
        ];

        let err = builder.run_all(&plans).await.unwrap_err();
        match err {
            Error::ExecutionFailed { command, .. } => assert_eq!(command, "build web && fail"),
            other => panic!("expected ExecutionFailed, got {:?}", other),
        }
        assert_eq!(runner.seen.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn test_run_all_reports() {
        let builder = Builder::new(Arc::new(DryRunRunner::new()), ".");
        let plans = vec![
            plan("api", &[(LifecycleStage::Build, &["build api"])]),
            plan("web", &[(LifecycleStage::Build, &["build web"])]),
        ];

        let reports = builder.run_all(&plans).await.unwrap();
        let labels: Vec<_> = reports.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["api", "web"]);
        assert!(reports.iter().all(|r| r.status.is_terminal()));
    }
}
