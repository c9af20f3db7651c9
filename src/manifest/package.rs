use crate::prelude::*;

use super::schema::*;

// The validated in-memory package. Everything here is immutable after
// loading, except `version`, which a frontend may assign exactly once
// before artifact emission (that's what `dynamic = ["version"]` defers).

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl Contact {
    /// `Display Name <email@host>`, or whichever half is present.
    pub fn display_form(&self) -> String {
        match (&self.name, &self.email) {
            (Some(name), Some(email)) => format!("{} <{}>", name, email),
            (Some(name), None) => name.clone(),
            (None, Some(email)) => email.clone(),
            (None, None) => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum License {
    Expr(String),
    Text(String),
    /// Read at emission time, not load time.
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadmeRef {
    Path(PathBuf),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptTarget {
    Callable {
        module: String,
        object: Option<String>,
    },
    File {
        reference: PathBuf,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FormatSet {
    pub sdist: bool,
    pub wheel: bool,
}

impl Default for FormatSet {
    fn default() -> Self {
        FormatSet {
            sdist: true,
            wheel: true,
        }
    }
}

impl FormatSet {
    fn from_decl(
        decl: Option<&FormatDecl>,
        field: &str,
        issues: &mut Vec<SchemaIssue>,
    ) -> FormatSet {
        let names: Vec<&str> = match decl {
            None => return FormatSet::default(),
            Some(FormatDecl::One(name)) => vec![name.as_str()],
            Some(FormatDecl::Many(names)) => {
                names.iter().map(|n| n.as_str()).collect()
            }
        };
        let mut set = FormatSet {
            sdist: false,
            wheel: false,
        };
        for name in names {
            match name {
                "sdist" => set.sdist = true,
                "wheel" => set.wheel = true,
                other => issues.push(SchemaIssue::new(
                    field,
                    format!("unknown format {:?} (expected sdist or wheel)", other),
                )),
            }
        }
        set
    }
}

#[derive(Debug, Clone)]
pub struct PackageInclude {
    pub include: String,
    pub from: Option<PathBuf>,
    pub formats: FormatSet,
}

#[derive(Debug, Clone)]
pub struct IncludeEntry {
    pub path: String,
    pub formats: FormatSet,
}

#[derive(Debug, Clone, Default)]
pub struct BuildConfig {
    /// Script for build-time native extensions. Declared, never executed
    /// here; its presence switches the wheel to a platform-specific tag.
    pub script: Option<String>,
    pub packages: Vec<PackageInclude>,
    pub include: Vec<IncludeEntry>,
    pub exclude: Vec<String>,
    pub requires: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Package {
    pub name: PackageName,
    version: Option<Version>,
    pub summary: Option<String>,
    pub readmes: Vec<ReadmeRef>,
    pub readme_content_type: Option<String>,
    pub license: Option<License>,
    pub authors: Vec<Contact>,
    pub maintainers: Vec<Contact>,
    pub keywords: Vec<String>,
    pub classifiers: Vec<String>,
    pub urls: IndexMap<String, String>,
    pub requires_python: VersionSet,
    /// Group name -> ordered dependencies; the runtime group is "main".
    pub groups: IndexMap<String, Vec<Dependency>>,
    /// Extras name -> names of `main` dependencies the extra turns on.
    pub extras: IndexMap<Extra, Vec<PackageName>>,
    pub scripts: IndexMap<String, ScriptTarget>,
    pub gui_scripts: IndexMap<String, ScriptTarget>,
    /// group -> name -> validated `module:object` target.
    pub entry_points: IndexMap<String, IndexMap<String, String>>,
    pub dynamic: HashSet<String>,
    pub build: BuildConfig,
}

impl Package {
    pub fn version(&self) -> Result<&Version> {
        self.version.as_ref().ok_or_else(|| {
            anyhow!(
                "project.version is dynamic and has not been assigned; \
                 a frontend must set it before building"
            )
        })
    }

    pub fn version_opt(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    /// Versions deferred via `dynamic` are assigned exactly once.
    pub fn set_version(&mut self, version: Version) -> Result<()> {
        if self.version.is_some() {
            bail!("project.version has already been assigned");
        }
        self.version = Some(version);
        Ok(())
    }

    pub fn main_dependencies(&self) -> &[Dependency] {
        self.groups
            .get(MAIN_GROUP)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn dist_name(&self) -> String {
        self.name.filename()
    }

    pub fn dist_info_name(&self) -> Result<String> {
        Ok(format!(
            "{}-{}.dist-info",
            self.dist_name(),
            self.version()?.filename()
        ))
    }
}

static CONTACT: Lazy<Regex> = Lazy::new(|| {
    // [ \t] instead of \s: the unicode tables are compiled out of our
    // regex build.
    Regex::new(
        r"^[ \t]*(?P<name>[^<>]*?)[ \t]*(<(?P<email>[^<>@ \t]+@[^<>@ \t]+)>)?[ \t]*$",
    )
    .unwrap()
});

fn contact_from_decl(
    decl: &ContactDecl,
    field: &str,
    issues: &mut Vec<SchemaIssue>,
) -> Option<Contact> {
    match decl {
        ContactDecl::Compact(text) => match CONTACT.captures(text) {
            Some(captures) => {
                let name = captures
                    .name("name")
                    .map(|m| m.as_str())
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned);
                let email = captures.name("email").map(|m| m.as_str().to_owned());
                if name.is_none() && email.is_none() {
                    issues.push(SchemaIssue::new(field, "empty contact"));
                    return None;
                }
                Some(Contact { name, email })
            }
            None => {
                issues.push(SchemaIssue::new(
                    field,
                    format!(
                        "expected `Display Name <email@host>`, got {:?}",
                        text
                    ),
                ));
                None
            }
        },
        ContactDecl::Table { name, email } => {
            if name.is_none() && email.is_none() {
                issues.push(SchemaIssue::new(
                    field,
                    "expected at least one of name and email",
                ));
                return None;
            }
            if let Some(email) = email {
                if !email.contains('@') {
                    issues.push(SchemaIssue::new(
                        field,
                        format!("{:?} does not look like an email address", email),
                    ));
                    return None;
                }
            }
            Some(Contact {
                name: name.clone(),
                email: email.clone(),
            })
        }
    }
}

// The closed classifier vocabulary is checked by namespace; the `Private ::`
// prefix is the standard escape hatch and always permitted.
const CLASSIFIER_NAMESPACES: &[&str] = &[
    "Development Status",
    "Environment",
    "Framework",
    "Intended Audience",
    "License",
    "Natural Language",
    "Operating System",
    "Programming Language",
    "Topic",
    "Typing",
];

const READABLE_README_SUFFIXES: &[&str] = &["md", "rst", "txt"];

/// Applies the dual-schema rule: a field declared in the modern table must
/// not be re-declared in the legacy table unless listed in `dynamic` (in
/// which case the legacy value wins).
struct Reconciler<'a> {
    dynamic: &'a HashSet<String>,
    issues: &'a mut Vec<SchemaIssue>,
}

impl Reconciler<'_> {
    fn field<T>(&mut self, name: &str, modern: Option<T>, legacy: Option<T>) -> Option<T> {
        match (modern, legacy) {
            (Some(modern), Some(legacy)) => {
                if self.dynamic.contains(name) {
                    Some(legacy)
                } else {
                    self.issues.push(SchemaIssue::new(
                        format!("project.{}", name),
                        format!(
                            "declared in both the project table and the legacy \
                             tool table; list {:?} in project.dynamic to defer \
                             it, or drop one declaration",
                            name
                        ),
                    ));
                    Some(modern)
                }
            }
            (Some(modern), None) => Some(modern),
            (None, Some(legacy)) => Some(legacy),
            (None, None) => None,
        }
    }
}

enum DepsDecl<'a> {
    Modern(&'a [String]),
    Legacy(&'a IndexMap<String, DependencyDecl>),
}

impl Package {
    pub fn assemble(
        project: ProjectTable,
        legacy: LegacyTable,
        build_system: BuildSystemTable,
        root: &Path,
    ) -> Result<Package> {
        let mut issues: Vec<SchemaIssue> = Vec::new();

        for key in project.unknown.keys() {
            warn!("project: ignoring unknown key {:?}", key);
        }
        for key in legacy.unknown.keys() {
            warn!("legacy tool table: ignoring unknown key {:?}", key);
        }

        let mut dynamic: HashSet<String> =
            project.dynamic.iter().cloned().collect();
        if dynamic.remove("name") {
            issues.push(SchemaIssue::new(
                "project.dynamic",
                "the name field may not be dynamic",
            ));
        }

        let mut reconcile = Reconciler {
            dynamic: &dynamic,
            issues: &mut issues,
        };

        // -- identity ----------------------------------------------------
        let raw_name = reconcile.field("name", project.name.clone(), legacy.name.clone());
        let raw_version =
            reconcile.field("version", project.version.clone(), legacy.version.clone());
        let summary = reconcile.field(
            "description",
            project.description.clone(),
            legacy.description.clone(),
        );
        let readme =
            reconcile.field("readme", project.readme.clone(), legacy.readme.clone());
        let license =
            reconcile.field("license", project.license.clone(), legacy.license.clone());
        let authors =
            reconcile.field("authors", project.authors.clone(), legacy.authors.clone());
        let maintainers = reconcile.field(
            "maintainers",
            project.maintainers.clone(),
            legacy.maintainers.clone(),
        );
        let keywords =
            reconcile.field("keywords", project.keywords.clone(), legacy.keywords.clone());
        let classifiers = reconcile.field(
            "classifiers",
            project.classifiers.clone(),
            legacy.classifiers.clone(),
        );

        let legacy_urls: Option<IndexMap<String, String>> = {
            let mut urls = IndexMap::new();
            if let Some(homepage) = &legacy.homepage {
                urls.insert("Homepage".to_owned(), homepage.clone());
            }
            if let Some(repository) = &legacy.repository {
                urls.insert("Repository".to_owned(), repository.clone());
            }
            if let Some(documentation) = &legacy.documentation {
                urls.insert("Documentation".to_owned(), documentation.clone());
            }
            if let Some(more) = &legacy.urls {
                urls.extend(more.clone());
            }
            (!urls.is_empty()).then_some(urls)
        };
        let urls = reconcile
            .field("urls", project.urls.clone(), legacy_urls)
            .unwrap_or_default();

        let scripts_decl =
            reconcile.field("scripts", project.scripts.clone(), legacy.scripts.clone());
        let entry_points_decl = reconcile.field(
            "entry-points",
            project.entry_points.clone(),
            legacy.plugins.clone(),
        );

        let deps_decl = reconcile.field(
            "dependencies",
            project.dependencies.as_deref().map(DepsDecl::Modern),
            legacy.dependencies.as_ref().map(DepsDecl::Legacy),
        );

        // The legacy schema spells the interpreter constraint as a
        // dependency on "python"; the modern one as requires-python.
        let legacy_python: Option<String> = legacy
            .dependencies
            .as_ref()
            .and_then(|deps| deps.get("python"))
            .and_then(|decl| match decl {
                DependencyDecl::Constraint(c) => Some(c.clone()),
                DependencyDecl::Table(table) => table.version.clone(),
            });
        let requires_python_decl = reconcile.field(
            "requires-python",
            project.requires_python.clone(),
            legacy_python,
        );

        // -- name and version -------------------------------------------
        let name: Option<PackageName> = match &raw_name {
            Some(raw) => match PackageName::try_from(raw.as_str()) {
                Ok(name) => Some(name),
                Err(error) => {
                    issues.push(SchemaIssue::new("project.name", error.to_string()));
                    None
                }
            },
            None => {
                issues.push(SchemaIssue::new("project.name", "missing"));
                None
            }
        };

        let version: Option<Version> = match &raw_version {
            Some(raw) => match Version::try_from(raw.as_str()) {
                Ok(version) => Some(version),
                Err(error) => {
                    issues
                        .push(SchemaIssue::new("project.version", error.to_string()));
                    None
                }
            },
            None => {
                if !dynamic.contains("version") {
                    issues.push(SchemaIssue::new(
                        "project.version",
                        "missing (and not listed in project.dynamic)",
                    ));
                }
                None
            }
        };

        if let Some(summary) = &summary {
            if summary.contains('\n') {
                issues.push(SchemaIssue::new(
                    "project.description",
                    "must not contain newlines",
                ));
            }
        }

        // -- readme ------------------------------------------------------
        let mut readmes: Vec<ReadmeRef> = Vec::new();
        let mut readme_content_type: Option<String> = None;
        fn add_readme_path(
            raw: &str,
            root: &Path,
            readmes: &mut Vec<ReadmeRef>,
            issues: &mut Vec<SchemaIssue>,
        ) {
            let suffix = Path::new(raw)
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_ascii_lowercase());
            match suffix.as_deref() {
                Some(suffix) if READABLE_README_SUFFIXES.contains(&suffix) => {
                    readmes.push(ReadmeRef::Path(root.join(raw)));
                }
                _ => issues.push(SchemaIssue::new(
                    "project.readme",
                    format!("{:?} must end in one of .md, .rst, .txt", raw),
                )),
            }
        }
        if let Some(decl) = &readme {
            match decl {
                ReadmeDecl::Path(raw) => {
                    add_readme_path(raw, root, &mut readmes, &mut issues)
                }
                ReadmeDecl::Paths(raws) => {
                    for raw in raws {
                        add_readme_path(raw, root, &mut readmes, &mut issues);
                    }
                }
                ReadmeDecl::Table {
                    file,
                    text,
                    content_type,
                } => {
                    readme_content_type = content_type.clone();
                    match (file, text) {
                        (Some(file), None) => {
                            add_readme_path(file, root, &mut readmes, &mut issues)
                        }
                        (None, Some(text)) => {
                            readmes.push(ReadmeRef::Text(text.clone()))
                        }
                        _ => issues.push(SchemaIssue::new(
                            "project.readme",
                            "expected exactly one of file and text",
                        )),
                    }
                }
            }
        }

        // -- license -----------------------------------------------------
        let license = license.and_then(|decl| match decl {
            LicenseDecl::Expr(expr) => Some(License::Expr(expr)),
            LicenseDecl::Table { text, file } => match (text, file) {
                (Some(text), None) => Some(License::Text(text)),
                (None, Some(file)) => Some(License::File(root.join(file))),
                _ => {
                    issues.push(SchemaIssue::new(
                        "project.license",
                        "expected exactly one of text and file",
                    ));
                    None
                }
            },
        });

        // -- people ------------------------------------------------------
        let parse_contacts = |decls: &Option<Vec<ContactDecl>>,
                                  field: &str,
                                  issues: &mut Vec<SchemaIssue>|
         -> Vec<Contact> {
            decls
                .iter()
                .flatten()
                .enumerate()
                .filter_map(|(i, decl)| {
                    contact_from_decl(decl, &format!("{}[{}]", field, i), issues)
                })
                .collect()
        };
        let authors = parse_contacts(&authors, "project.authors", &mut issues);
        let maintainers =
            parse_contacts(&maintainers, "project.maintainers", &mut issues);

        // -- classifiers -------------------------------------------------
        let classifiers = classifiers.unwrap_or_default();
        for (i, classifier) in classifiers.iter().enumerate() {
            if classifier.starts_with("Private ::") {
                continue;
            }
            let namespace = classifier
                .split(" :: ")
                .next()
                .unwrap_or(classifier)
                .trim();
            if !CLASSIFIER_NAMESPACES.contains(&namespace) {
                issues.push(SchemaIssue::new(
                    format!("project.classifiers[{}]", i),
                    format!("unknown classifier namespace {:?}", namespace),
                ));
            }
        }

        // -- scripts and entry points ------------------------------------
        let parse_scripts = |decls: Option<&IndexMap<String, ScriptDecl>>,
                                 field: &str,
                                 issues: &mut Vec<SchemaIssue>|
         -> IndexMap<String, ScriptTarget> {
            let mut out = IndexMap::new();
            for (name, decl) in decls.into_iter().flatten() {
                let path = format!("{}.{}", field, name);
                match decl {
                    ScriptDecl::Target(target) => {
                        match EntryPoint::from_target(name, target) {
                            Ok(entry) => {
                                out.insert(
                                    name.clone(),
                                    ScriptTarget::Callable {
                                        module: entry.module,
                                        object: entry.object,
                                    },
                                );
                            }
                            Err(error) => issues
                                .push(SchemaIssue::new(path, error.to_string())),
                        }
                    }
                    ScriptDecl::File { reference, kind } => {
                        if kind != "file" {
                            issues.push(SchemaIssue::new(
                                path,
                                format!("unknown script type {:?}", kind),
                            ));
                        } else {
                            out.insert(
                                name.clone(),
                                ScriptTarget::File {
                                    reference: root.join(reference),
                                },
                            );
                        }
                    }
                }
            }
            out
        };
        let scripts =
            parse_scripts(scripts_decl.as_ref(), "project.scripts", &mut issues);
        let gui_scripts = parse_scripts(
            project.gui_scripts.as_ref(),
            "project.gui-scripts",
            &mut issues,
        );

        let mut entry_points: IndexMap<String, IndexMap<String, String>> =
            IndexMap::new();
        for (group, entries) in entry_points_decl.into_iter().flatten() {
            let mut validated = IndexMap::new();
            for (name, target) in entries {
                let path = format!("project.entry-points.{}.{}", group, name);
                match EntryPoint::from_target(&name, &target) {
                    Ok(_) => {
                        validated.insert(name, target);
                    }
                    Err(error) => {
                        issues.push(SchemaIssue::new(path, error.to_string()))
                    }
                }
            }
            entry_points.insert(group, validated);
        }

        // -- requires-python ---------------------------------------------
        let requires_python = match &requires_python_decl {
            Some(raw) => match VersionSet::try_from(raw.as_str()) {
                Ok(set) => set,
                Err(error) => {
                    issues.push(SchemaIssue::new(
                        "project.requires-python",
                        error.to_string(),
                    ));
                    VersionSet::any()
                }
            },
            None => VersionSet::any(),
        };

        // -- dependency groups -------------------------------------------
        let mut main: Vec<Dependency> = Vec::new();
        match &deps_decl {
            Some(DepsDecl::Modern(entries)) => {
                for (i, entry) in entries.iter().enumerate() {
                    match Dependency::from_requirement_string(
                        entry,
                        ParseExtra::NotAllowed,
                    ) {
                        Ok(dep) => main.push(dep),
                        Err(error) => issues.push(SchemaIssue::new(
                            format!("project.dependencies[{}]", i),
                            format!("{:#}", error),
                        )),
                    }
                }
            }
            Some(DepsDecl::Legacy(entries)) => {
                for (dep_name, decl) in entries.iter() {
                    if dep_name == "python" {
                        continue;
                    }
                    let path =
                        format!("tool.wheelwright.dependencies.{}", dep_name);
                    match Dependency::from_declaration(dep_name, decl, root, &path)
                    {
                        Ok(dep) => main.push(dep),
                        Err(error) => issues
                            .push(SchemaIssue::new(path, format!("{:#}", error))),
                    }
                }
            }
            None => {}
        }

        let mut groups: IndexMap<String, Vec<Dependency>> = IndexMap::new();

        let mut extras: IndexMap<Extra, Vec<PackageName>> = IndexMap::new();
        if let Some(optional) = &project.optional_dependencies {
            for (extra_name, entries) in optional {
                let path =
                    format!("project.optional-dependencies.{}", extra_name);
                let extra = match Extra::try_from(extra_name.as_str()) {
                    Ok(extra) => extra,
                    Err(error) => {
                        issues.push(SchemaIssue::new(path, error.to_string()));
                        continue;
                    }
                };
                let mut names = Vec::new();
                for (i, entry) in entries.iter().enumerate() {
                    match Dependency::from_requirement_string(
                        entry,
                        ParseExtra::NotAllowed,
                    ) {
                        Ok(mut dep) => {
                            dep.optional = true;
                            names.push(dep.name.clone());
                            main.push(dep);
                        }
                        Err(error) => issues.push(SchemaIssue::new(
                            format!("{}[{}]", path, i),
                            format!("{:#}", error),
                        )),
                    }
                }
                extras.insert(extra, names);
            }
        }

        if let Some(legacy_extras) = &legacy.extras {
            for (extra_name, names) in legacy_extras {
                let path = format!("tool.wheelwright.extras.{}", extra_name);
                let extra = match Extra::try_from(extra_name.as_str()) {
                    Ok(extra) => extra,
                    Err(error) => {
                        issues.push(SchemaIssue::new(path, error.to_string()));
                        continue;
                    }
                };
                if extras.contains_key(&extra) {
                    issues.push(SchemaIssue::new(
                        path,
                        "extra is already defined by project.optional-dependencies",
                    ));
                    continue;
                }
                let mut members = Vec::new();
                for raw in names {
                    let Ok(dep_name) = PackageName::try_from(raw.as_str())
                    else {
                        issues.push(SchemaIssue::new(
                            path.clone(),
                            format!("invalid dependency name {:?}", raw),
                        ));
                        continue;
                    };
                    match main.iter().find(|dep| dep.name == dep_name) {
                        Some(dep) => {
                            if !dep.optional {
                                warn!(
                                    "{}: {} is not marked optional; it is \
                                     installed unconditionally",
                                    path, raw
                                );
                            }
                            members.push(dep_name);
                        }
                        None => issues.push(SchemaIssue::new(
                            path.clone(),
                            format!(
                                "{:?} is not a dependency in the main group",
                                raw
                            ),
                        )),
                    }
                }
                extras.insert(extra, members);
            }
        }

        groups.insert(MAIN_GROUP.to_owned(), main);

        if let Some(dev) = &legacy.dev_dependencies {
            warn!(
                "tool.wheelwright.dev-dependencies is deprecated; use \
                 tool.wheelwright.group.dev.dependencies"
            );
            let mut deps = Vec::new();
            for (dep_name, decl) in dev {
                let path =
                    format!("tool.wheelwright.dev-dependencies.{}", dep_name);
                match Dependency::from_declaration(dep_name, decl, root, &path) {
                    Ok(dep) => deps.push(dep),
                    Err(error) => issues
                        .push(SchemaIssue::new(path, format!("{:#}", error))),
                }
            }
            groups.insert("dev".to_owned(), deps);
        }

        for (group_name, table) in &legacy.group {
            let mut deps = Vec::new();
            for (dep_name, decl) in &table.dependencies {
                let path = format!(
                    "tool.wheelwright.group.{}.dependencies.{}",
                    group_name, dep_name
                );
                match Dependency::from_declaration(dep_name, decl, root, &path) {
                    Ok(dep) => deps.push(dep),
                    Err(error) => {
                        issues.push(SchemaIssue::new(path, format!("{:#}", error)))
                    }
                }
            }
            match groups.entry(group_name.clone()) {
                indexmap::map::Entry::Occupied(mut slot) => {
                    slot.get_mut().extend(deps)
                }
                indexmap::map::Entry::Vacant(slot) => {
                    slot.insert(deps);
                }
            }
        }

        // -- build configuration -----------------------------------------
        let mut build = BuildConfig {
            script: legacy.build.as_ref().and_then(|b| b.script.clone()),
            requires: build_system.requires.clone(),
            ..BuildConfig::default()
        };
        for (i, decl) in legacy.packages.iter().enumerate() {
            let field = format!("tool.wheelwright.packages[{}]", i);
            match decl {
                PackageDecl::Name(include) => build.packages.push(PackageInclude {
                    include: include.clone(),
                    from: None,
                    formats: FormatSet::default(),
                }),
                PackageDecl::Table {
                    include,
                    from,
                    format,
                } => build.packages.push(PackageInclude {
                    include: include.clone(),
                    from: from.clone(),
                    formats: FormatSet::from_decl(
                        format.as_ref(),
                        &field,
                        &mut issues,
                    ),
                }),
            }
        }
        for (i, decl) in legacy.include.iter().enumerate() {
            let field = format!("tool.wheelwright.include[{}]", i);
            match decl {
                IncludeDecl::Path(path) => build.include.push(IncludeEntry {
                    path: path.clone(),
                    formats: FormatSet::default(),
                }),
                IncludeDecl::Table { path, format } => {
                    build.include.push(IncludeEntry {
                        path: path.clone(),
                        formats: FormatSet::from_decl(
                            format.as_ref(),
                            &field,
                            &mut issues,
                        ),
                    })
                }
            }
        }
        build.exclude = legacy.exclude.clone();

        if !issues.is_empty() {
            return Err(BackendError::ManifestSchema { issues }.into());
        }

        Ok(Package {
            name: name.unwrap(),
            version,
            summary,
            readmes,
            readme_content_type,
            license,
            authors,
            maintainers,
            keywords: keywords.unwrap_or_default(),
            classifiers,
            urls,
            requires_python,
            groups,
            extras,
            scripts,
            gui_scripts,
            entry_points,
            dynamic,
            build,
        })
    }
}
