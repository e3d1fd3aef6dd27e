// gkeg-common/src/model/mod.rs
pub mod artifact;
pub mod formula;
pub mod resource;

pub use artifact::{ArtifactClass, InstallLayout, LayoutEntry};
pub use formula::{BuildRecipe, EnvSetting, Formula, ResourceStage, SourceOrigin};
pub use resource::{PatchSpec, ResourceSpec};
