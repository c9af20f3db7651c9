mod metadata;
mod plan;
mod sdist;
mod wheel;

pub use metadata::render_metadata;
pub use plan::{package_sources, BuildPlan, PlannedFile};
pub use sdist::write_sdist;
pub use wheel::{
    dist_info_files, wheel_tag, write_editable_wheel, write_wheel,
};
