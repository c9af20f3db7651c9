mod package;
mod schema;

pub use package::{
    BuildConfig, Contact, FormatSet, IncludeEntry, License, Package,
    PackageInclude, ReadmeRef, ScriptTarget,
};
pub use schema::{BuildSystemTable, LegacyTable, ProjectTable};

use crate::prelude::*;

pub const MANIFEST_FILE: &str = "pyproject.toml";

/// Loader for the declarative manifest: one TOML file, two schemas (the
/// standardized project table and our legacy tool table), one validated
/// Package out the other end.
pub struct Manifest;

fn subtable<'a>(
    item: &'a toml_edit::Item,
    key: &str,
) -> Option<&'a toml_edit::Item> {
    item.as_table_like().and_then(|table| table.get(key))
}

fn deserialize_table<T: serde::de::DeserializeOwned + Default>(
    doc: &toml_edit::Document,
    path: &[&str],
    issues: &mut Vec<SchemaIssue>,
) -> T {
    let mut item = doc.as_item();
    for key in path {
        match subtable(item, key) {
            Some(next) => item = next,
            None => return T::default(),
        }
    }
    match toml_edit::de::from_item(item.clone()) {
        Ok(value) => value,
        Err(error) => {
            issues.push(SchemaIssue::new(path.join("."), error.to_string()));
            T::default()
        }
    }
}

impl Manifest {
    pub fn load(root: &Path) -> Result<Package> {
        let path = root.join(MANIFEST_FILE);
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        Manifest::parse(&text, root)
    }

    pub fn parse(text: &str, root: &Path) -> Result<Package> {
        let doc: toml_edit::Document =
            text.parse().map_err(BackendError::ManifestSyntax)?;

        let mut issues: Vec<SchemaIssue> = Vec::new();
        let project: ProjectTable =
            deserialize_table(&doc, &["project"], &mut issues);
        let legacy: LegacyTable =
            deserialize_table(&doc, &["tool", "wheelwright"], &mut issues);
        let build_system: BuildSystemTable =
            deserialize_table(&doc, &["build-system"], &mut issues);
        if !issues.is_empty() {
            // The table shapes are wrong; field-level validation on top of
            // defaults would only bury the real problem in noise.
            return Err(BackendError::ManifestSchema { issues }.into());
        }

        Package::assemble(project, legacy, build_system, root)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use indoc::indoc;

    fn parse(text: &str) -> Result<Package> {
        Manifest::parse(text, Path::new("/nonexistent"))
    }

    fn schema_issues(error: &anyhow::Error) -> Vec<String> {
        match error.downcast_ref::<BackendError>() {
            Some(BackendError::ManifestSchema { issues }) => {
                issues.iter().map(|issue| issue.to_string()).collect()
            }
            other => panic!("expected a schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_minimal_modern_manifest() {
        let package = parse(indoc! {r#"
            [project]
            name = "demo"
            version = "0.1"
        "#})
        .unwrap();
        assert_eq!(package.name.as_given(), "demo");
        assert_eq!(package.version().unwrap(), &"0.1".try_into().unwrap());
        assert!(package.main_dependencies().is_empty());
        assert!(package.requires_python.is_any());
    }

    #[test]
    fn test_not_toml_is_a_syntax_error() {
        let error = parse("project = [broken").unwrap_err();
        assert!(matches!(
            error.downcast_ref::<BackendError>(),
            Some(BackendError::ManifestSyntax(_))
        ));
    }

    #[test]
    fn test_modern_dependencies() {
        let package = parse(indoc! {r#"
            [project]
            name = "demo"
            version = "0.1"
            dependencies = [
                "requests[security]>=2.13,<3.0",
                "tomli >=1.1.0 ; python_version < '3.11'",
            ]
        "#})
        .unwrap();
        let deps = package.main_dependencies();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].to_string(), "requests[security] (>=2.13,<3.0)");
        assert!(deps[1].marker.is_some());
    }

    #[test]
    fn test_dependency_errors_are_aggregated_with_paths() {
        let error = parse(indoc! {r#"
            [project]
            name = "demo"
            version = "not a version"
            dependencies = ["ok >=1.0", "broken ==", "-bad-name"]
        "#})
        .unwrap_err();
        let issues = schema_issues(&error);
        assert_eq!(issues.len(), 3);
        assert!(issues[0].starts_with("project.version"));
        assert!(issues[1].starts_with("project.dependencies[1]"));
        assert!(issues[2].starts_with("project.dependencies[2]"));
    }

    #[test]
    fn test_dual_declaration_is_an_error() {
        let error = parse(indoc! {r#"
            [project]
            name = "demo"
            version = "0.1"

            [tool.wheelwright]
            version = "0.2"
        "#})
        .unwrap_err();
        let issues = schema_issues(&error);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].starts_with("project.version"));
    }

    #[test]
    fn test_dynamic_defers_to_legacy() {
        let package = parse(indoc! {r#"
            [project]
            name = "demo"
            version = "0.1"
            dynamic = ["version"]

            [tool.wheelwright]
            version = "0.2"
        "#})
        .unwrap();
        assert_eq!(package.version().unwrap(), &"0.2".try_into().unwrap());
    }

    #[test]
    fn test_dynamic_version_may_be_unassigned() {
        let mut package = parse(indoc! {r#"
            [project]
            name = "demo"
            dynamic = ["version"]
        "#})
        .unwrap();
        assert!(package.version().is_err());
        package.set_version("1.2.3".try_into().unwrap()).unwrap();
        assert_eq!(package.version().unwrap(), &"1.2.3".try_into().unwrap());
        assert!(package.set_version("2.0".try_into().unwrap()).is_err());
    }

    #[test]
    fn test_name_may_not_be_dynamic() {
        let error = parse(indoc! {r#"
            [project]
            name = "demo"
            version = "0.1"
            dynamic = ["name"]
        "#})
        .unwrap_err();
        let issues = schema_issues(&error);
        assert!(issues[0].starts_with("project.dynamic"));
    }

    #[test]
    fn test_missing_version_without_dynamic() {
        let error = parse(indoc! {r#"
            [project]
            name = "demo"
        "#})
        .unwrap_err();
        let issues = schema_issues(&error);
        assert!(issues[0].starts_with("project.version"));
    }

    #[test]
    fn test_legacy_manifest() {
        let package = parse(indoc! {r#"
            [tool.wheelwright]
            name = "demo"
            version = "1.0"
            description = "A demo"
            authors = ["Jane Doe <jane@example.com>"]
            homepage = "https://example.com"

            [tool.wheelwright.dependencies]
            python = "^3.8"
            requests = { version = "^2.13", extras = ["security"], optional = true }
            cleo = ">=0.6,<0.7"

            [tool.wheelwright.extras]
            http = ["requests"]

            [tool.wheelwright.group.dev.dependencies]
            pytest = "^7.0"
        "#})
        .unwrap();
        assert_eq!(package.name.as_given(), "demo");
        assert_eq!(
            package.requires_python,
            ">=3.8, <4.0".try_into().unwrap()
        );
        assert_eq!(package.main_dependencies().len(), 2);
        assert_eq!(package.groups.get("dev").unwrap().len(), 1);
        assert_eq!(package.urls.get("Homepage").unwrap(), "https://example.com");
        assert_eq!(package.authors.len(), 1);
        assert_eq!(
            package.authors[0].display_form(),
            "Jane Doe <jane@example.com>"
        );
        let http: Extra = "http".try_into().unwrap();
        assert_eq!(package.extras.get(&http).unwrap().len(), 1);
    }

    #[test]
    fn test_extras_must_reference_main_dependencies() {
        let error = parse(indoc! {r#"
            [tool.wheelwright]
            name = "demo"
            version = "1.0"

            [tool.wheelwright.dependencies]
            requests = { version = "^2.13", optional = true }

            [tool.wheelwright.extras]
            http = ["requests", "missing-dep"]
        "#})
        .unwrap_err();
        let issues = schema_issues(&error);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].starts_with("tool.wheelwright.extras.http"));
        assert!(issues[0].contains("missing-dep"));
    }

    #[test]
    fn test_scripts_and_entry_points() {
        let package = parse(indoc! {r#"
            [project]
            name = "demo"
            version = "0.1"

            [project.scripts]
            demo = "demo.cli:main"

            [project.entry-points."demo.plugins"]
            core = "demo.plugins.core"
        "#})
        .unwrap();
        assert!(matches!(
            package.scripts.get("demo"),
            Some(ScriptTarget::Callable { .. })
        ));
        assert_eq!(
            package
                .entry_points
                .get("demo.plugins")
                .and_then(|g| g.get("core"))
                .map(String::as_str),
            Some("demo.plugins.core")
        );

        let error = parse(indoc! {r#"
            [project]
            name = "demo"
            version = "0.1"

            [project.scripts]
            demo = "1bad:target"
        "#})
        .unwrap_err();
        let issues = schema_issues(&error);
        assert!(issues[0].starts_with("project.scripts.demo"));
    }

    #[test]
    fn test_description_must_be_single_line() {
        let error = parse(indoc! {r#"
            [project]
            name = "demo"
            version = "0.1"
            description = """line one
            line two"""
        "#})
        .unwrap_err();
        let issues = schema_issues(&error);
        assert!(issues[0].starts_with("project.description"));
    }

    #[test]
    fn test_classifier_vocabulary() {
        let package = parse(indoc! {r#"
            [project]
            name = "demo"
            version = "0.1"
            classifiers = [
                "Development Status :: 4 - Beta",
                "Programming Language :: Python :: 3",
                "Private :: Do Not Upload",
            ]
        "#})
        .unwrap();
        assert_eq!(package.classifiers.len(), 3);

        let error = parse(indoc! {r#"
            [project]
            name = "demo"
            version = "0.1"
            classifiers = ["Totally Made Up :: Thing"]
        "#})
        .unwrap_err();
        let issues = schema_issues(&error);
        assert!(issues[0].starts_with("project.classifiers[0]"));
    }

    #[test]
    fn test_readme_suffix_check() {
        let error = parse(indoc! {r#"
            [project]
            name = "demo"
            version = "0.1"
            readme = "README.docx"
        "#})
        .unwrap_err();
        let issues = schema_issues(&error);
        assert!(issues[0].starts_with("project.readme"));

        let package = parse(indoc! {r#"
            [project]
            name = "demo"
            version = "0.1"
            readme = ["README.md", "CHANGELOG.rst"]
        "#})
        .unwrap();
        assert_eq!(package.readmes.len(), 2);
    }

    #[test]
    fn test_optional_dependencies_become_extras() {
        let package = parse(indoc! {r#"
            [project]
            name = "demo"
            version = "0.1"
            dependencies = ["idna"]

            [project.optional-dependencies]
            socks = ["pysocks >=1.5.6"]
        "#})
        .unwrap();
        let socks: Extra = "socks".try_into().unwrap();
        assert_eq!(package.extras.get(&socks).unwrap().len(), 1);
        let deps = package.main_dependencies();
        assert_eq!(deps.len(), 2);
        assert!(deps[1].optional);
    }
}
