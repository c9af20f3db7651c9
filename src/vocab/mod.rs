mod archive_path;
mod dependency;
mod entry_points;
mod extra;
mod marker;
mod package_name;
mod ranges;
mod reqparse;
mod version;

// All this stuff is also re-exported from crate::prelude::*

pub use self::archive_path::ArchivePath;
pub use self::dependency::{
    Dependency, DependencyDecl, DependencySource, DependencyTable, VcsKind,
    VcsReference, MAIN_GROUP,
};
pub use self::entry_points::{render_entry_points, EntryPoint};
pub use self::extra::Extra;
pub use self::marker::{
    Marker, MarkerAtom, MarkerOp, MarkerValue, PYTHON_VERSION_ATTRIBUTES,
};
pub use self::package_name::PackageName;
pub use self::ranges::{CompareOp, Interval, VersionConstraint, VersionSet};
pub use self::reqparse::{ParseExtra, ParsedRequirement};
pub use self::version::Version;
