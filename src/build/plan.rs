use crate::prelude::*;

use crate::manifest::{FormatSet, Package, PackageInclude};
use std::process::Command;

// File selection for the two artifact targets. The output is a pair of
// ordered (source path, archive path) lists; everything downstream just
// streams bytes, so all policy -- ignore lists, excludes, format selectors
// -- lives here.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFile {
    pub source: PathBuf,
    pub archive: ArchivePath,
}

#[derive(Debug)]
pub struct BuildPlan {
    /// Sorted by archive path, relative to the sdist's top directory.
    pub sdist_files: Vec<PlannedFile>,
    /// Sorted by archive path, relative to the wheel root.
    pub wheel_files: Vec<PlannedFile>,
    /// License-like files destined for `dist-info/licenses/`.
    pub licenses: Vec<PathBuf>,
}

/// What the version-control helper reports as ignored. When the source
/// root isn't a working tree (or git is unavailable) nothing is filtered.
struct VcsIgnores {
    ignored: HashSet<PathBuf>,
}

impl VcsIgnores {
    fn detect(root: &Path) -> VcsIgnores {
        let empty = VcsIgnores {
            ignored: HashSet::new(),
        };
        if !root.join(".git").exists() {
            return empty;
        }
        let output = Command::new("git")
            .arg("-C")
            .arg(root)
            .args(["ls-files", "--others", "--ignored", "--exclude-standard", "-z"])
            .output();
        match output {
            Ok(output) if output.status.success() => VcsIgnores {
                ignored: output
                    .stdout
                    .split(|b| *b == 0)
                    .filter(|piece| !piece.is_empty())
                    .map(|piece| {
                        PathBuf::from(String::from_utf8_lossy(piece).into_owned())
                    })
                    .collect(),
            },
            _ => {
                warn!(
                    "git ls-files failed in {}; not filtering ignored files",
                    root.display()
                );
                empty
            }
        }
    }

    fn is_ignored(&self, relative: &Path) -> bool {
        self.ignored.contains(relative)
    }
}

fn is_transient(name: &str) -> bool {
    name == "__pycache__"
        || name == ".git"
        || name == ".DS_Store"
        || name.ends_with(".pyc")
        || name.ends_with(".pyo")
}

/// Depth-first walk with sorted entries, so selection order never depends
/// on readdir order.
fn walk(path: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries: Vec<std::fs::DirEntry> = std::fs::read_dir(path)
        .with_context(|| format!("listing {}", path.display()))?
        .collect::<std::io::Result<_>>()?;
    entries.sort_by_key(|entry| entry.file_name());
    for entry in entries {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if is_transient(&name) {
            continue;
        }
        let child = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            walk(&child, out)?;
        } else if file_type.is_file() {
            out.push(child);
        }
    }
    Ok(())
}

static LICENSE_LIKE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i-u:LICEN[SC]E|COPYING|NOTICE|AUTHORS)(\..*)?$").unwrap()
});

/// The package roots to put on an import path: (base directory, module
/// path) per declared package, with default discovery when the manifest
/// doesn't say. Shared with the editable build.
pub fn package_sources(
    package: &Package,
    root: &Path,
) -> Result<Vec<(PathBuf, PackageInclude)>> {
    let declared = if package.build.packages.is_empty() {
        let module = package.name.module();
        let mut found = None;
        for (from, candidate) in [
            (Some(PathBuf::from("src")), module.clone()),
            (None, module.clone()),
            (Some(PathBuf::from("src")), format!("{}.py", module)),
            (None, format!("{}.py", module)),
        ] {
            let base = match &from {
                Some(from) => root.join(from),
                None => root.to_owned(),
            };
            if base.join(&candidate).exists() {
                found = Some(PackageInclude {
                    include: candidate,
                    from,
                    formats: FormatSet::default(),
                });
                break;
            }
        }
        vec![found.ok_or_else(|| {
            anyhow!(
                "no packages found: expected {}/ or src/{0}/ (or declare \
                 tool.wheelwright.packages)",
                package.name.module()
            )
        })?]
    } else {
        package.build.packages.clone()
    };

    Ok(declared
        .into_iter()
        .map(|include| {
            let base = match &include.from {
                Some(from) => root.join(from),
                None => root.to_owned(),
            };
            (base, include)
        })
        .collect())
}

impl BuildPlan {
    pub fn new(package: &Package, root: &Path) -> Result<BuildPlan> {
        let ignores = VcsIgnores::detect(root);

        // Directory dependencies that live inside the source tree are their
        // own projects; they are never walked into an archive.
        let dependency_dirs: Vec<PathBuf> = package
            .groups
            .values()
            .flatten()
            .filter_map(|dep| match &dep.source {
                DependencySource::Directory { path, .. } => Some(path.clone()),
                _ => None,
            })
            .collect();

        let excluded = |relative: &Path| -> bool {
            package
                .build
                .exclude
                .iter()
                .any(|pattern| relative.starts_with(pattern))
                || dependency_dirs
                    .iter()
                    .any(|dir| root.join(relative).starts_with(dir))
        };

        let mut sdist: Vec<PlannedFile> = Vec::new();
        let mut wheel: Vec<PlannedFile> = Vec::new();
        let push = |list: &mut Vec<PlannedFile>,
                    source: PathBuf,
                    archive: ArchivePath| {
            let planned = PlannedFile { source, archive };
            if !list.iter().any(|existing| existing.archive == planned.archive) {
                list.push(planned);
            }
        };

        // 1. declared packages, transitively, minus ignored and excluded
        for (base, include) in package_sources(package, root)? {
            let target = base.join(&include.include);
            let mut files = Vec::new();
            if target.is_dir() {
                walk(&target, &mut files)?;
            } else if target.is_file() {
                files.push(target.clone());
            } else {
                bail!(
                    "declared package {:?} not found under {}",
                    include.include,
                    base.display()
                );
            }
            for file in files {
                let relative = file.strip_prefix(root).unwrap_or(&file);
                if ignores.is_ignored(relative) || excluded(relative) {
                    continue;
                }
                if include.formats.sdist {
                    push(
                        &mut sdist,
                        file.clone(),
                        ArchivePath::from_relative(root, &file)?,
                    );
                }
                if include.formats.wheel {
                    // Inside the wheel the `from` prefix disappears: the
                    // package root sits at the archive root.
                    push(
                        &mut wheel,
                        file.clone(),
                        ArchivePath::from_relative(&base, &file)?,
                    );
                }
            }
        }

        // 2. explicit includes; these override the ignore list
        for entry in &package.build.include {
            let target = root.join(&entry.path);
            let mut files = Vec::new();
            if target.is_dir() {
                walk(&target, &mut files)?;
            } else if target.is_file() {
                files.push(target);
            } else {
                warn!("include entry {:?} matches nothing", entry.path);
                continue;
            }
            for file in files {
                let relative = file.strip_prefix(root).unwrap_or(&file);
                if excluded(relative) {
                    continue;
                }
                let archive = ArchivePath::from_relative(root, &file)?;
                if entry.formats.sdist {
                    push(&mut sdist, file.clone(), archive.clone());
                }
                if entry.formats.wheel {
                    push(&mut wheel, file.clone(), archive);
                }
            }
        }

        // 3. standard metadata files always ride along in the sdist
        let manifest = root.join(crate::manifest::MANIFEST_FILE);
        if manifest.is_file() {
            push(
                &mut sdist,
                manifest.clone(),
                ArchivePath::from_relative(root, &manifest)?,
            );
        }
        for readme in &package.readmes {
            if let crate::manifest::ReadmeRef::Path(path) = readme {
                if path.is_file() {
                    push(
                        &mut sdist,
                        path.clone(),
                        ArchivePath::from_relative(root, path)?,
                    );
                }
            }
        }

        let mut licenses: Vec<PathBuf> = Vec::new();
        let mut root_entries: Vec<std::fs::DirEntry> = std::fs::read_dir(root)
            .with_context(|| format!("listing {}", root.display()))?
            .collect::<std::io::Result<_>>()?;
        root_entries.sort_by_key(|entry| entry.file_name());
        for entry in root_entries {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if LICENSE_LIKE.is_match(name) && entry.path().is_file() {
                licenses.push(entry.path());
                push(
                    &mut sdist,
                    entry.path(),
                    ArchivePath::from_relative(root, &entry.path())?,
                );
            }
        }

        sdist.sort_by(|a, b| a.archive.cmp(&b.archive));
        wheel.sort_by(|a, b| a.archive.cmp(&b.archive));

        Ok(BuildPlan {
            sdist_files: sdist,
            wheel_files: wheel,
            licenses,
        })
    }
}
