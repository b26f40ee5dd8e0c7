//! Build units, build arguments and lifecycle stages.

use derive_more::Display;
use serde::Serialize;
use std::path::PathBuf;

use crate::{Error, Result};

/// A lifecycle stage of a build unit, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleStage {
    #[display("prebuild")]
    PreBuild,
    #[display("build")]
    Build,
    #[display("postbuild")]
    PostBuild,
    #[display("prepush")]
    PrePush,
    #[display("push")]
    Push,
    #[display("postpush")]
    PostPush,
}

impl LifecycleStage {
    /// All stages in the order they run.
    pub const ALL: [LifecycleStage; 6] = [
        LifecycleStage::PreBuild,
        LifecycleStage::Build,
        LifecycleStage::PostBuild,
        LifecycleStage::PrePush,
        LifecycleStage::Push,
        LifecycleStage::PostPush,
    ];

    /// Stages whose commands come from the configuration file.
    ///
    /// `build` and `push` are generated from the build unit itself.
    pub const USER_DEFINED: [LifecycleStage; 4] = [
        LifecycleStage::PreBuild,
        LifecycleStage::PostBuild,
        LifecycleStage::PrePush,
        LifecycleStage::PostPush,
    ];

    pub fn is_user_defined(&self) -> bool {
        !matches!(self, LifecycleStage::Build | LifecycleStage::Push)
    }

    /// Whether the stage only runs when images are pushed.
    pub fn is_push_stage(&self) -> bool {
        matches!(
            self,
            LifecycleStage::PrePush | LifecycleStage::Push | LifecycleStage::PostPush
        )
    }
}

/// A validated build-time variable declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildArgument {
    /// Variable name passed to the build tool (`--build-arg <argument>=...`).
    pub argument: String,
    /// Option name the user sets the value with (`--arg <option>=...`).
    pub option: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

/// An unvalidated build argument, as read from a config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildArgumentDraft {
    pub argument: Option<String>,
    pub option: Option<String>,
    pub default_value: Option<String>,
    /// Source text of the declaration, kept for diagnostics.
    pub raw: String,
}

impl BuildArgumentDraft {
    /// Parse the compact `ARGUMENT=option` form.
    pub fn from_compact(raw: &str) -> Self {
        let (argument, option) = match raw.split_once('=') {
            Some((argument, option)) => (argument, Some(option)),
            None => (raw, None),
        };

        Self {
            argument: Some(argument.to_string()),
            option: option.map(str::to_string),
            default_value: None,
            raw: raw.to_string(),
        }
    }

    /// Check that both `argument` and `option` are present and non-empty.
    ///
    /// An empty default value is dropped rather than stored.
    pub fn validate(self) -> Result<BuildArgument> {
        let argument = self.argument.filter(|a| !a.is_empty());
        let option = self.option.filter(|o| !o.is_empty());

        match (argument, option) {
            (Some(argument), Some(option)) => Ok(BuildArgument {
                argument,
                option,
                default_value: self.default_value.filter(|d| !d.is_empty()),
            }),
            _ => Err(Error::InvalidBuildArgument { raw: self.raw }),
        }
    }
}

/// One declared image-build target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildUnit {
    /// Key the unit was declared under in the `services` section.
    #[serde(skip)]
    pub key: String,
    pub name: String,
    /// Directory holding the Dockerfile. `None` whenever `file` is set.
    pub dockerfile: Option<String>,
    /// Absolute path to an explicit Dockerfile.
    pub file: Option<PathBuf>,
    pub default_tag: String,
    pub rm: bool,
    pub prebuild: Vec<String>,
    pub postbuild: Vec<String>,
    pub prepush: Vec<String>,
    pub postpush: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_arguments: Option<Vec<BuildArgument>>,
}

impl BuildUnit {
    pub const DEFAULT_TAG: &'static str = "latest";
    pub const DEFAULT_DOCKERFILE: &'static str = ".";

    /// A unit with every field at its default, named after its key.
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            name: key.clone(),
            key,
            dockerfile: Some(Self::DEFAULT_DOCKERFILE.to_string()),
            file: None,
            default_tag: Self::DEFAULT_TAG.to_string(),
            rm: false,
            prebuild: Vec::new(),
            postbuild: Vec::new(),
            prepush: Vec::new(),
            postpush: Vec::new(),
            build_arguments: None,
        }
    }

    /// User-declared commands for a stage. Generated stages have none.
    pub fn commands(&self, stage: LifecycleStage) -> &[String] {
        match stage {
            LifecycleStage::PreBuild => &self.prebuild,
            LifecycleStage::PostBuild => &self.postbuild,
            LifecycleStage::PrePush => &self.prepush,
            LifecycleStage::PostPush => &self.postpush,
            LifecycleStage::Build | LifecycleStage::Push => &[],
        }
    }

    pub fn commands_mut(&mut self, stage: LifecycleStage) -> Option<&mut Vec<String>> {
        match stage {
            LifecycleStage::PreBuild => Some(&mut self.prebuild),
            LifecycleStage::PostBuild => Some(&mut self.postbuild),
            LifecycleStage::PrePush => Some(&mut self.prepush),
            LifecycleStage::PostPush => Some(&mut self.postpush),
            LifecycleStage::Build | LifecycleStage::Push => None,
        }
    }

    /// Point the unit at an explicit Dockerfile, clearing `dockerfile`.
    pub fn set_file(&mut self, file: PathBuf) {
        self.file = Some(file);
        self.dockerfile = None;
    }
}
