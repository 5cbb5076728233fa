pub mod layer;
pub mod project;
pub mod seeds;

pub use layer::LayerConfig;
pub use project::{load_project_config, EmptySeedsPolicy, ProjectConfig};
pub use seeds::{load_seed_file, SeedsSpec};
