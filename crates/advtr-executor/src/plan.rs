//! Stage plans: the shell commands each lifecycle stage runs for an image.

use std::path::{Component, Path, PathBuf};

use advtr_core::{BuildUnit, Image, LifecycleStage, Registry, Result, TagValues};

/// Settings shared by every image plan.
#[derive(Debug, Clone)]
pub struct PlanOptions {
    /// Container tool binary, e.g. `docker` or `podman`.
    pub tool: String,
    /// Tags requested by the caller. Empty means the image default.
    pub tags: Vec<String>,
    /// Plan the prepush, push and postpush stages.
    pub push: bool,
    /// Directory the config was loaded from. Dockerfile directories are
    /// relative to it.
    pub config_dir: PathBuf,
    /// Directory the commands run in.
    pub working_dir: PathBuf,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            tool: "docker".to_string(),
            tags: Vec::new(),
            push: false,
            config_dir: PathBuf::from("."),
            working_dir: PathBuf::from("."),
        }
    }
}

/// Commands of one lifecycle stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePlan {
    pub stage: LifecycleStage,
    pub commands: Vec<String>,
}

/// Everything needed to build (and push) one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePlan {
    pub label: String,
    /// Full image references, e.g. `bob/api:latest`.
    pub tags: Vec<String>,
    /// Non-empty stages, in execution order.
    pub stages: Vec<StagePlan>,
}

impl ImagePlan {
    pub fn stage(&self, stage: LifecycleStage) -> Option<&StagePlan> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    pub fn command_count(&self) -> usize {
        self.stages.iter().map(|s| s.commands.len()).sum()
    }
}

/// Turns images into stage plans for one registry.
#[derive(Debug, Clone)]
pub struct Planner {
    registry: Registry,
    values: TagValues,
    options: PlanOptions,
}

impl Planner {
    /// `values` carries the caller's tag values (username, repo); image name
    /// and tag are filled in per image.
    pub fn new(registry: Registry, values: TagValues, options: PlanOptions) -> Self {
        Self {
            registry,
            values,
            options,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn options(&self) -> &PlanOptions {
        &self.options
    }

    pub fn plan(&self, image: &Image) -> Result<ImagePlan> {
        let tags = self.tags(image)?;
        let mut stages = Vec::new();

        for stage in LifecycleStage::ALL {
            if stage.is_push_stage() && !self.options.push {
                continue;
            }

            let commands = match stage {
                LifecycleStage::Build => vec![self.build_command(image, &tags)],
                LifecycleStage::Push => vec![self.push_command(&tags)],
                _ => image.commands(stage).to_vec(),
            };

            if !commands.is_empty() {
                stages.push(StagePlan { stage, commands });
            }
        }

        Ok(ImagePlan {
            label: image.label(),
            tags,
            stages,
        })
    }

    pub fn plan_all(&self, images: &[Image]) -> Result<Vec<ImagePlan>> {
        images.iter().map(|image| self.plan(image)).collect()
    }

    /// `<tool> build -t <tag>... [--build-arg K=V]... [--rm] [-f <file>] <context>`
    pub fn build_command(&self, image: &Image, tags: &[String]) -> String {
        let mut parts = vec![self.options.tool.clone(), "build".to_string()];

        for tag in tags {
            parts.push("-t".to_string());
            parts.push(tag.clone());
        }

        for (argument, value) in image.build_arguments.iter() {
            parts.push("--build-arg".to_string());
            parts.push(shell_words::quote(&format!("{}={}", argument, value)).into_owned());
        }

        if image.rm() {
            parts.push("--rm".to_string());
        }

        if let Some(file) = image.file() {
            parts.push("-f".to_string());
            parts.push(shell_words::quote(&self.display_path(file)).into_owned());
        }

        let context = self
            .options
            .config_dir
            .join(image.dockerfile().unwrap_or(BuildUnit::DEFAULT_DOCKERFILE));
        parts.push(shell_words::quote(&self.display_path(&context)).into_owned());

        parts.join(" ")
    }

    /// `echo '<tag>'... | xargs -n 1 <tool> push`
    pub fn push_command(&self, tags: &[String]) -> String {
        let quoted: Vec<String> = tags.iter().map(|tag| format!("'{}'", tag)).collect();
        format!(
            "echo {} | xargs -n 1 {} push",
            quoted.join(" "),
            self.options.tool
        )
    }

    /// Requested tags, or the image default. Matrix images keep their entry
    /// tag as a suffix (`1.0-react`) so variants never share a tag.
    fn tags(&self, image: &Image) -> Result<Vec<String>> {
        let requested: Vec<String> = match (&image.matrix, self.options.tags.is_empty()) {
            (_, true) => vec![image.default_tag().to_string()],
            (Some(entry), false) => self
                .options
                .tags
                .iter()
                .map(|tag| format!("{}-{}", tag, entry.tag))
                .collect(),
            (None, false) => self.options.tags.clone(),
        };

        requested
            .into_iter()
            .map(|tag| {
                let values = self.values.clone().with_image(image.name()).with_tag(tag);
                self.registry.create_tag(&values)
            })
            .collect()
    }

    /// Path as seen from the working directory, `.` for the directory itself.
    fn display_path(&self, path: &Path) -> String {
        let base = normalize(&self.options.working_dir);
        let path = normalize(&self.options.working_dir.join(path));

        match path.strip_prefix(&base) {
            Ok(relative) if relative.as_os_str().is_empty() => ".".to_string(),
            Ok(relative) => relative.display().to_string(),
            Err(_) => path.display().to_string(),
        }
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
