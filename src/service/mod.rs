//! Resource cores: validation, not-found mapping and transaction scope.

pub mod build;
pub mod build_status;
pub mod validation;

pub use build::{BuildCore, NewBuild, UpdateBuild};
pub use build_status::{BuildStatusCore, NewBuildStatus, UpdateBuildStatus};
