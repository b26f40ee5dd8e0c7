//! Build (and push) images.

use advtr_core::{ImageOptions, TagValues, expand_images};
use advtr_executor::{Builder, DryRunRunner, PlanOptions, Planner, ShellRunner};
use anyhow::{Result, bail};
use clap::Args;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Build units to build (default: all)
    pub targets: Vec<String>,

    /// Image tag, repeatable (default: the unit's default tag). Matrix images
    /// are tagged `<tag>-<matrix tag>`
    #[arg(short = 'T', long = "tag")]
    pub tags: Vec<String>,

    /// Registry username (default: $USER, then $USERNAME)
    #[arg(short = 'U', long, env = "ADVTR_USER")]
    pub user: Option<String>,

    /// Repository name, required by the GitHub registry
    #[arg(long)]
    pub repo: Option<String>,

    /// Declared registry to tag and push for
    #[arg(long)]
    pub registry: Option<String>,

    /// Push images after building them
    #[arg(long)]
    pub push: bool,

    /// Leave out build arguments that have no value
    #[arg(long)]
    pub pass_args: bool,

    /// Value for a build argument option, repeatable
    #[arg(short = 'a', long = "arg", value_name = "OPTION=VALUE", value_parser = parse_option)]
    pub args: Vec<(String, String)>,

    /// Container tool to run
    #[arg(long, env = "ADVTR_TOOL", default_value = "docker")]
    pub tool: String,

    /// Print the commands instead of running them
    #[arg(long)]
    pub dry_run: bool,
}

fn parse_option(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((option, value)) if !option.trim_start_matches('-').is_empty() => Ok((
            option.trim_start_matches('-').to_string(),
            value.to_string(),
        )),
        _ => Err(format!("expected OPTION=VALUE, got '{}'", raw)),
    }
}

fn username(user: Option<&str>) -> Option<String> {
    user.map(str::to_string)
        .or_else(|| std::env::var("USER").ok())
        .or_else(|| std::env::var("USERNAME").ok())
        .filter(|name| !name.is_empty())
}

pub async fn run(file: &Path, args: BuildArgs) -> Result<()> {
    let loaded = super::load_config(file)?;
    if loaded.config.builds.is_empty() {
        bail!("No build units declared in {}", file.display());
    }

    let images = expand_images(
        &loaded.config,
        &ImageOptions {
            targets: args.targets,
            options: args.args.into_iter().collect(),
            pass_args: args.pass_args,
        },
    )?;

    let registry = loaded.config.registry.resolve(args.registry.as_deref())?;
    info!(registry = %registry.name, images = images.len(), "Planning builds");

    let mut values = TagValues::new();
    if let Some(user) = username(args.user.as_deref()) {
        values = values.with_username(user);
    }
    if let Some(repo) = args.repo {
        values = values.with_repo(repo);
    }

    let planner = Planner::new(
        registry,
        values,
        PlanOptions {
            tool: args.tool,
            tags: args.tags,
            push: args.push,
            config_dir: loaded.config_dir,
            working_dir: loaded.working_dir.clone(),
        },
    );
    let plans = planner.plan_all(&images)?;

    if args.dry_run {
        let runner = Arc::new(DryRunRunner::new());
        Builder::new(runner.clone(), loaded.working_dir)
            .run_all(&plans)
            .await?;
        for command in runner.commands().await {
            println!("{}", command);
        }
        return Ok(());
    }

    let builder = Builder::new(Arc::new(ShellRunner::new()), loaded.working_dir);
    for report in builder.run_all(&plans).await? {
        let seconds = report
            .duration()
            .map(|d| d.num_milliseconds() as f64 / 1000.0)
            .unwrap_or_default();
        println!(
            "✓ {} built in {:.1}s ({})",
            report.label,
            seconds,
            report.tags.join(", ")
        );
    }

    Ok(())
}
