use crate::prelude::*;

// The raw serde shapes of the manifest tables, before validation. Every
// reconcilable field is an Option so "declared at all" is distinguishable
// from "declared empty" -- the dual-schema rule cares about the difference.

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ReadmeDecl {
    Path(String),
    Paths(Vec<String>),
    Table {
        file: Option<String>,
        text: Option<String>,
        #[serde(rename = "content-type")]
        content_type: Option<String>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LicenseDecl {
    Expr(String),
    Table {
        text: Option<String>,
        file: Option<String>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ContactDecl {
    Compact(String),
    Table {
        name: Option<String>,
        email: Option<String>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ScriptDecl {
    Target(String),
    File {
        reference: String,
        #[serde(rename = "type")]
        kind: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FormatDecl {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PackageDecl {
    Name(String),
    Table {
        include: String,
        from: Option<PathBuf>,
        format: Option<FormatDecl>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IncludeDecl {
    Path(String),
    Table {
        path: String,
        format: Option<FormatDecl>,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProjectTable {
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub readme: Option<ReadmeDecl>,
    pub requires_python: Option<String>,
    pub license: Option<LicenseDecl>,
    pub authors: Option<Vec<ContactDecl>>,
    pub maintainers: Option<Vec<ContactDecl>>,
    pub keywords: Option<Vec<String>>,
    pub classifiers: Option<Vec<String>>,
    pub urls: Option<IndexMap<String, String>>,
    pub scripts: Option<IndexMap<String, ScriptDecl>>,
    pub gui_scripts: Option<IndexMap<String, ScriptDecl>>,
    pub entry_points: Option<IndexMap<String, IndexMap<String, String>>>,
    pub dependencies: Option<Vec<String>>,
    pub optional_dependencies: Option<IndexMap<String, Vec<String>>>,
    #[serde(default)]
    pub dynamic: Vec<String>,
    #[serde(flatten)]
    pub unknown: IndexMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupTable {
    #[serde(default)]
    pub dependencies: IndexMap<String, DependencyDecl>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BuildTable {
    pub script: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LegacyTable {
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub readme: Option<ReadmeDecl>,
    pub license: Option<LicenseDecl>,
    pub authors: Option<Vec<ContactDecl>>,
    pub maintainers: Option<Vec<ContactDecl>>,
    pub keywords: Option<Vec<String>>,
    pub classifiers: Option<Vec<String>>,
    pub homepage: Option<String>,
    pub repository: Option<String>,
    pub documentation: Option<String>,
    pub urls: Option<IndexMap<String, String>>,
    pub scripts: Option<IndexMap<String, ScriptDecl>>,
    pub plugins: Option<IndexMap<String, IndexMap<String, String>>>,
    pub dependencies: Option<IndexMap<String, DependencyDecl>>,
    #[serde(default)]
    pub group: IndexMap<String, GroupTable>,
    pub dev_dependencies: Option<IndexMap<String, DependencyDecl>>,
    pub extras: Option<IndexMap<String, Vec<String>>>,
    #[serde(default)]
    pub packages: Vec<PackageDecl>,
    #[serde(default)]
    pub include: Vec<IncludeDecl>,
    #[serde(default)]
    pub exclude: Vec<String>,
    pub build: Option<BuildTable>,
    #[serde(flatten)]
    pub unknown: IndexMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BuildSystemTable {
    #[serde(default)]
    pub requires: Vec<String>,
    pub build_backend: Option<String>,
    #[serde(flatten)]
    pub unknown: IndexMap<String, serde_json::Value>,
}
