pub mod definition;
pub mod planner;
pub mod requirement;

pub use definition::{Dependency, DependencyTag, PlatformScope};
pub use planner::{plan, DependencyPlan, PlannedDependency, Provision};
pub use requirement::ExternalRequirement;
