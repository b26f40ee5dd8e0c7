//! Core domain types for the advtr image builder.
//!
//! This crate contains:
//! - Build units, build arguments and lifecycle stages
//! - Matrix entries
//! - Registry selection and tag formatting
//! - The extracted configuration aggregate
//! - Image expansion (build units x matrix entries)

pub mod build;
pub mod config;
pub mod error;
pub mod image;
pub mod matrix;
pub mod registry;

pub use build::{BuildArgument, BuildArgumentDraft, BuildUnit, LifecycleStage};
pub use config::ExtractedConfig;
pub use error::{Error, Result};
pub use image::{Image, ImageOptions, expand_images};
pub use matrix::MatrixEntry;
pub use registry::{Registry, RegistryEntry, RegistryKind, RegistrySelection, TagValues};
