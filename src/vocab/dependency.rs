use crate::prelude::*;

use std::hash::{Hash, Hasher};

// Dependencies are a closed set of variants -- registry, path, directory,
// url, vcs -- instead of a class hierarchy dispatching on runtime type.
// Everything that varies by kind is a match on the source tag.

pub const MAIN_GROUP: &str = "main";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum VcsKind {
    Git,
    Hg,
    Svn,
    Bzr,
}

impl VcsKind {
    pub const ALL: &'static [VcsKind] =
        &[VcsKind::Git, VcsKind::Hg, VcsKind::Svn, VcsKind::Bzr];
}

impl Display for VcsKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                VcsKind::Git => "git",
                VcsKind::Hg => "hg",
                VcsKind::Svn => "svn",
                VcsKind::Bzr => "bzr",
            }
        )
    }
}

impl TryFrom<&str> for VcsKind {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Ok(match value {
            "git" => VcsKind::Git,
            "hg" => VcsKind::Hg,
            "svn" => VcsKind::Svn,
            "bzr" => VcsKind::Bzr,
            _ => bail!("unknown version control kind {:?}", value),
        })
    }
}

try_from_str_boilerplate!(VcsKind);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VcsReference {
    DefaultBranch,
    Branch(String),
    Tag(String),
    Rev(String),
}

impl VcsReference {
    pub fn name(&self) -> Option<&str> {
        match self {
            VcsReference::DefaultBranch => None,
            VcsReference::Branch(s)
            | VcsReference::Tag(s)
            | VcsReference::Rev(s) => Some(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DependencySource {
    Registry {
        constraint: VersionConstraint,
        /// Named repository to fetch from, when the manifest pins one.
        index: Option<String>,
    },
    /// A single distributable file on disk (sdist or wheel).
    Path { path: PathBuf, develop: bool },
    /// A source tree on disk. `build_backend` records the backend its own
    /// manifest declares, when that manifest is readable.
    Directory {
        path: PathBuf,
        develop: bool,
        build_backend: Option<String>,
    },
    Url { url: Url },
    Vcs {
        kind: VcsKind,
        url: String,
        reference: VcsReference,
        subdirectory: Option<String>,
        develop: bool,
    },
}

impl DependencySource {
    pub fn is_direct(&self) -> bool {
        !matches!(self, DependencySource::Registry { .. })
    }
}

#[derive(Debug, Clone)]
pub struct Dependency {
    pub name: PackageName,
    pub source: DependencySource,
    pub extras: Vec<Extra>,
    pub marker: Option<Marker>,
    /// Python versions this dependency applies to, separate from the marker
    /// so range reasoning doesn't have to re-derive it.
    pub python: Option<VersionSet>,
    pub optional: bool,
}

// Identity is (name, source, extras, marker): the constraint participates
// through the registry source, direct origins compare by origin and
// reference only. The python set is already folded into the marker.
impl PartialEq for Dependency {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.source == other.source
            && self.extras == other.extras
            && self.marker == other.marker
    }
}

impl Eq for Dependency {}

impl Hash for Dependency {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.source.hash(state);
        self.extras.hash(state);
        self.marker.hash(state);
    }
}

impl Dependency {
    pub fn registry(name: PackageName, constraint: VersionConstraint) -> Dependency {
        Dependency {
            name,
            source: DependencySource::Registry {
                constraint,
                index: None,
            },
            extras: Vec::new(),
            marker: None,
            python: None,
            optional: false,
        }
    }

    /// Parse a standardized dependency string: `name[extras] constraint ;
    /// marker` or `name[extras] @ url ; marker`.
    pub fn from_requirement_string(
        input: &str,
        parse_extra: ParseExtra,
    ) -> Result<Dependency> {
        let parsed = super::reqparse::requirement(input, parse_extra)?;
        let source = match &parsed.url {
            Some(url) => source_from_url(url)?,
            None => DependencySource::Registry {
                constraint: parsed
                    .constraint
                    .unwrap_or_else(VersionConstraint::any),
                index: None,
            },
        };
        Ok(Dependency {
            name: parsed.name,
            source,
            extras: parsed.extras,
            marker: parsed.marker,
            python: None,
            optional: false,
        })
    }

    /// The marker actually gating this dependency: the declared marker
    /// intersected with the per-dependency python constraint.
    pub fn effective_marker(&self) -> Marker {
        let base = self.marker.clone().unwrap_or(Marker::Always);
        match &self.python {
            Some(set) => base.intersect(&Marker::for_python_set(set)),
            None => base,
        }
    }
}

fn parse_subdirectory_fragment(fragment: &str) -> Option<String> {
    fragment.split('&').find_map(|piece| {
        piece
            .strip_prefix("subdirectory=")
            .map(|value| value.to_owned())
    })
}

/// Interpret a direct-reference URL: `git+...`/`hg+...`/... become VCS
/// sources (with `@rev` and `#subdirectory=` pulled apart), `file://`
/// becomes a path or directory source, anything else stays a plain URL.
fn source_from_url(raw: &str) -> Result<DependencySource> {
    for kind in VcsKind::ALL {
        let prefix = format!("{}+", kind);
        if let Some(rest) = raw.strip_prefix(&prefix) {
            let mut url = Url::parse(rest)
                .with_context(|| format!("invalid {} url {:?}", kind, rest))?;
            let subdirectory =
                url.fragment().and_then(parse_subdirectory_fragment);
            url.set_fragment(None);
            // A trailing @rev lives in the path: user@host is already part
            // of the authority, so splitting the path is unambiguous.
            let split = url
                .path()
                .rsplit_once('@')
                .map(|(path, rev)| (path.to_owned(), rev.to_owned()));
            let reference = match split {
                Some((path, rev)) if !rev.is_empty() => {
                    url.set_path(&path);
                    VcsReference::Rev(rev)
                }
                _ => VcsReference::DefaultBranch,
            };
            return Ok(DependencySource::Vcs {
                kind: *kind,
                url: url.to_string(),
                reference,
                subdirectory,
                develop: false,
            });
        }
    }
    let url = Url::parse(raw).with_context(|| format!("invalid url {:?}", raw))?;
    if url.scheme() == "file" {
        let path = url
            .to_file_path()
            .map_err(|_| anyhow!("can't interpret {:?} as a local path", raw))?;
        let treat_as_file = path.is_file()
            || matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("whl" | "zip" | "gz" | "bz2" | "xz" | "tar")
            );
        if treat_as_file {
            return Ok(DependencySource::Path {
                path,
                develop: false,
            });
        }
        return Ok(DependencySource::Directory {
            path,
            develop: false,
            build_backend: None,
        });
    }
    Ok(DependencySource::Url { url })
}

impl Display for Dependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name.normalized())?;
        if !self.extras.is_empty() {
            let mut extras: Vec<&str> =
                self.extras.iter().map(Extra::normalized).collect();
            extras.sort_unstable();
            extras.dedup();
            write!(f, "[{}]", extras.join(","))?;
        }
        match &self.source {
            DependencySource::Registry { constraint, .. } => {
                if !constraint.is_any() {
                    write!(f, " ({})", constraint)?;
                }
            }
            DependencySource::Path { path, .. }
            | DependencySource::Directory { path, .. } => {
                match Url::from_file_path(path) {
                    Ok(url) => write!(f, " @ {}", url)?,
                    Err(_) => write!(f, " @ file://{}", path.display())?,
                }
            }
            DependencySource::Url { url } => write!(f, " @ {}", url)?,
            DependencySource::Vcs {
                kind,
                url,
                reference,
                subdirectory,
                ..
            } => {
                write!(f, " @ {}+{}", kind, url)?;
                if let Some(name) = reference.name() {
                    write!(f, "@{}", name)?;
                }
                if let Some(sub) = subdirectory {
                    write!(f, "#subdirectory={}", sub)?;
                }
            }
        }
        let marker = self.effective_marker();
        match marker {
            Marker::Always => Ok(()),
            marker => write!(f, " ; {}", marker),
        }
    }
}

/// The structured inline form a manifest can declare a dependency with,
/// either a bare constraint string or a table of recognized keys. Unknown
/// keys are tolerated (with a warning), so they're collected rather than
/// rejected.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DependencyDecl {
    Constraint(String),
    Table(DependencyTable),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DependencyTable {
    pub version: Option<String>,
    pub path: Option<PathBuf>,
    pub url: Option<String>,
    pub git: Option<String>,
    pub hg: Option<String>,
    pub svn: Option<String>,
    pub bzr: Option<String>,
    pub branch: Option<String>,
    pub tag: Option<String>,
    pub rev: Option<String>,
    pub subdirectory: Option<String>,
    #[serde(default)]
    pub extras: Vec<String>,
    pub markers: Option<String>,
    pub python: Option<String>,
    #[serde(default)]
    pub optional: bool,
    pub develop: Option<bool>,
    pub allow_prereleases: Option<bool>,
    pub source: Option<String>,
    #[serde(flatten)]
    pub unknown: IndexMap<String, serde_json::Value>,
}

impl Dependency {
    /// Validate an inline declaration into a Dependency. `root` anchors
    /// relative paths; `field` is the manifest path used in diagnostics.
    pub fn from_declaration(
        name: &str,
        decl: &DependencyDecl,
        root: &Path,
        field: &str,
    ) -> Result<Dependency> {
        let name: PackageName = name
            .try_into()
            .with_context(|| format!("{}: bad dependency name", field))?;
        let table = match decl {
            DependencyDecl::Constraint(constraint) => {
                let constraint: VersionConstraint =
                    (&**constraint).try_into().with_context(|| {
                        format!("{}: bad version constraint", field)
                    })?;
                return Ok(Dependency::registry(name, constraint));
            }
            DependencyDecl::Table(table) => table,
        };

        for key in table.unknown.keys() {
            warn!("{}: ignoring unknown key {:?}", field, key);
        }

        let vcs: Vec<(VcsKind, &String)> = [
            (VcsKind::Git, &table.git),
            (VcsKind::Hg, &table.hg),
            (VcsKind::Svn, &table.svn),
            (VcsKind::Bzr, &table.bzr),
        ]
        .into_iter()
        .filter_map(|(kind, url)| url.as_ref().map(|u| (kind, u)))
        .collect();

        let origins = usize::from(table.version.is_some())
            + usize::from(table.path.is_some())
            + usize::from(table.url.is_some())
            + vcs.len();
        if origins != 1 {
            bail!(
                "{}: expected exactly one of version, path, url, or a VCS \
                 key, found {}",
                field,
                origins
            );
        }

        let references: Vec<VcsReference> = [
            table.branch.as_ref().map(|b| VcsReference::Branch(b.clone())),
            table.tag.as_ref().map(|t| VcsReference::Tag(t.clone())),
            table.rev.as_ref().map(|r| VcsReference::Rev(r.clone())),
        ]
        .into_iter()
        .flatten()
        .collect();
        if references.len() > 1 {
            bail!("{}: branch, tag, and rev are mutually exclusive", field);
        }
        if !references.is_empty() && vcs.is_empty() {
            bail!(
                "{}: branch/tag/rev only make sense with a VCS origin",
                field
            );
        }
        if table.subdirectory.is_some() && vcs.is_empty() {
            warn!("{}: ignoring subdirectory on a non-VCS dependency", field);
        }

        let develop = table.develop.unwrap_or(false);

        let source = if let Some((kind, url)) = vcs.first() {
            DependencySource::Vcs {
                kind: *kind,
                url: (*url).clone(),
                reference: references
                    .into_iter()
                    .next()
                    .unwrap_or(VcsReference::DefaultBranch),
                subdirectory: table.subdirectory.clone(),
                develop,
            }
        } else if let Some(path) = &table.path {
            let resolved = if path.is_absolute() {
                path.clone()
            } else {
                root.join(path)
            };
            if resolved.is_file() {
                if develop {
                    warn!(
                        "{}: develop has no effect on a file dependency",
                        field
                    );
                }
                DependencySource::Path {
                    path: resolved,
                    develop: false,
                }
            } else {
                DependencySource::Directory {
                    build_backend: peek_build_backend(&resolved),
                    path: resolved,
                    develop,
                }
            }
        } else if let Some(url) = &table.url {
            if develop {
                warn!("{}: develop has no effect on a url dependency", field);
            }
            DependencySource::Url {
                url: Url::parse(url)
                    .with_context(|| format!("{}: invalid url", field))?,
            }
        } else {
            if develop {
                warn!(
                    "{}: develop has no effect on a registry dependency",
                    field
                );
            }
            let mut constraint: VersionConstraint = table
                .version
                .as_deref()
                .unwrap()
                .try_into()
                .with_context(|| format!("{}: bad version constraint", field))?;
            if let Some(allow) = table.allow_prereleases {
                constraint = constraint.with_prereleases(allow);
            }
            DependencySource::Registry {
                constraint,
                index: table.source.clone(),
            }
        };

        if table.source.is_some() && source.is_direct() {
            warn!(
                "{}: ignoring source on a dependency with a direct origin",
                field
            );
        }

        let extras = table
            .extras
            .iter()
            .map(|e| {
                Extra::try_from(&**e)
                    .with_context(|| format!("{}.extras", field))
            })
            .collect::<Result<Vec<Extra>>>()?;

        let python: Option<VersionSet> = table
            .python
            .as_deref()
            .map(|p| {
                VersionSet::try_from(p)
                    .with_context(|| format!("{}.python", field))
            })
            .transpose()?;

        let declared_marker: Option<Marker> = table
            .markers
            .as_deref()
            .map(|m| {
                super::reqparse::marker(m, ParseExtra::Allowed)
                    .with_context(|| format!("{}.markers", field))
            })
            .transpose()?;

        // The python constraint folds into the marker; when both are given
        // the effective marker is their intersection.
        let marker = match (&declared_marker, &python) {
            (Some(marker), Some(set)) => {
                Some(marker.intersect(&Marker::for_python_set(set)))
            }
            (Some(marker), None) => Some(marker.clone()),
            (None, Some(set)) => Some(Marker::for_python_set(set)),
            (None, None) => None,
        }
        .filter(|m| m != &Marker::Always);

        Ok(Dependency {
            name,
            source,
            extras,
            marker,
            python,
            optional: table.optional,
        })
    }
}

fn peek_build_backend(directory: &Path) -> Option<String> {
    let text = std::fs::read_to_string(directory.join("pyproject.toml")).ok()?;
    let doc: toml_edit::Document = text.parse().ok()?;
    doc.as_item()
        .as_table_like()?
        .get("build-system")?
        .as_table_like()?
        .get("build-backend")?
        .as_str()
        .map(|s| s.to_owned())
}
