use crate::prelude::*;

use crate::manifest::{License, Package, ReadmeRef};
use std::fmt::Write as _;

// Core Metadata emission (version 2.3). The same bytes serve as the
// wheel's METADATA and the sdist's PKG-INFO, so this is the single place
// that decides field order -- which is what makes builds reproducible.

const METADATA_VERSION: &str = "2.3";

fn field(out: &mut String, name: &str, value: &str) {
    // Continuation lines keep multi-line values (license texts mostly)
    // parseable by email-style readers.
    let mut lines = value.split('\n');
    let _ = writeln!(out, "{}: {}", name, lines.next().unwrap_or(""));
    for line in lines {
        let _ = writeln!(out, "        {}", line);
    }
}

fn infer_content_type(package: &Package) -> Option<&'static str> {
    for readme in &package.readmes {
        if let ReadmeRef::Path(path) = readme {
            return match path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_ascii_lowercase())
                .as_deref()
            {
                Some("md") => Some("text/markdown"),
                Some("rst") => Some("text/x-rst"),
                _ => Some("text/plain"),
            };
        }
    }
    None
}

/// Requires-Dist lines: every `main` dependency, canonicalized. Optional
/// dependencies appear once per extra that turns them on, gated by an
/// `extra == "..."` conjunct on top of their own marker.
fn requires_dist_lines(package: &Package) -> Vec<String> {
    let mut lines = Vec::new();
    for dep in package.main_dependencies() {
        if dep.optional {
            continue;
        }
        lines.push(dep.to_string());
    }
    for (extra, members) in &package.extras {
        for dep in package.main_dependencies() {
            if !members.contains(&dep.name) {
                continue;
            }
            let extra_atom = Marker::atom(
                MarkerValue::Variable("extra".to_owned()),
                MarkerOp::Compare(CompareOp::Equal),
                MarkerValue::Literal(extra.normalized().to_owned()),
            );
            let marker = dep
                .effective_marker()
                .exclude_extra(extra)
                .intersect(&extra_atom);
            let mut gated = dep.clone();
            gated.marker = Some(marker);
            gated.python = None;
            lines.push(gated.to_string());
        }
    }
    lines
}

fn contacts(out: &mut String, label: &str, people: &[crate::manifest::Contact]) {
    let names: Vec<&str> = people
        .iter()
        .filter(|person| person.email.is_none())
        .filter_map(|person| person.name.as_deref())
        .collect();
    let mailboxes: Vec<String> = people
        .iter()
        .filter(|person| person.email.is_some())
        .map(|person| person.display_form())
        .collect();
    if !names.is_empty() {
        field(out, label, &names.join(", "));
    }
    if !mailboxes.is_empty() {
        field(out, &format!("{}-email", label), &mailboxes.join(", "));
    }
}

pub fn render_metadata(package: &Package) -> Result<String> {
    let version = package.version()?;
    let mut out = String::new();

    field(&mut out, "Metadata-Version", METADATA_VERSION);
    field(&mut out, "Name", package.name.as_given());
    field(&mut out, "Version", &version.to_string());
    if let Some(summary) = &package.summary {
        field(&mut out, "Summary", summary);
    }
    if !package.keywords.is_empty() {
        field(&mut out, "Keywords", &package.keywords.join(","));
    }
    contacts(&mut out, "Author", &package.authors);
    contacts(&mut out, "Maintainer", &package.maintainers);
    match &package.license {
        Some(License::Expr(expr)) => field(&mut out, "License", expr),
        Some(License::Text(text)) => field(&mut out, "License", text),
        Some(License::File(path)) => {
            let text = std::fs::read_to_string(path).with_context(|| {
                format!("reading license file {}", path.display())
            })?;
            field(&mut out, "License", text.trim_end());
        }
        None => {}
    }
    for classifier in &package.classifiers {
        field(&mut out, "Classifier", classifier);
    }
    if !package.requires_python.is_any() {
        field(
            &mut out,
            "Requires-Python",
            &package.requires_python.to_string(),
        );
    }
    for line in requires_dist_lines(package) {
        field(&mut out, "Requires-Dist", &line);
    }
    for (name, url) in &package.urls {
        field(&mut out, "Project-URL", &format!("{}, {}", name, url));
    }
    for extra in package.extras.keys() {
        field(&mut out, "Provides-Extra", extra.normalized());
    }

    let description = render_description(package)?;
    if let Some(description) = description {
        if let Some(content_type) = package
            .readme_content_type
            .as_deref()
            .or_else(|| infer_content_type(package))
        {
            field(&mut out, "Description-Content-Type", content_type);
        }
        out.push('\n');
        out.push_str(&description);
        if !description.ends_with('\n') {
            out.push('\n');
        }
    }

    Ok(out)
}

/// Multiple readmes concatenate in declared order, separated by a blank
/// line.
fn render_description(package: &Package) -> Result<Option<String>> {
    if package.readmes.is_empty() {
        return Ok(None);
    }
    let mut pieces = Vec::new();
    for readme in &package.readmes {
        match readme {
            ReadmeRef::Path(path) => {
                let text = std::fs::read_to_string(path).with_context(|| {
                    format!("reading readme {}", path.display())
                })?;
                pieces.push(text.trim_end().to_owned());
            }
            ReadmeRef::Text(text) => pieces.push(text.trim_end().to_owned()),
        }
    }
    Ok(Some(pieces.join("\n\n")))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::manifest::Manifest;
    use indoc::indoc;

    fn package_from(manifest: &str) -> Package {
        Manifest::parse(manifest, Path::new("/nonexistent")).unwrap()
    }

    #[test]
    fn test_basic_metadata() {
        let package = package_from(indoc! {r#"
            [project]
            name = "Demo"
            version = "0.1"
            description = "A demonstration"
            keywords = ["packaging", "demo"]
            classifiers = ["Programming Language :: Python :: 3"]
            requires-python = ">=3.8"
            authors = [
                { name = "Jane Doe", email = "jane@example.com" },
                { name = "Anonymous Collective" },
            ]
            dependencies = ["requests[security]>=2.13,<3.0"]

            [project.urls]
            Homepage = "https://example.com"
        "#});
        let rendered = render_metadata(&package).unwrap();
        insta::assert_snapshot!(rendered, @r###"
        Metadata-Version: 2.3
        Name: Demo
        Version: 0.1
        Summary: A demonstration
        Keywords: packaging,demo
        Author: Anonymous Collective
        Author-email: Jane Doe <jane@example.com>
        Classifier: Programming Language :: Python :: 3
        Requires-Python: >=3.8
        Requires-Dist: requests[security] (>=2.13,<3.0)
        Project-URL: Homepage, https://example.com
        "###);
    }

    #[test]
    fn test_extras_get_marker_gates() {
        let package = package_from(indoc! {r#"
            [project]
            name = "demo"
            version = "0.1"
            dependencies = ["idna"]

            [project.optional-dependencies]
            socks = ["pysocks >=1.5.6 ; sys_platform != 'win32'"]
        "#});
        let rendered = render_metadata(&package).unwrap();
        assert!(rendered.contains("Requires-Dist: idna\n"));
        assert!(rendered.contains(
            "Requires-Dist: pysocks (>=1.5.6) ; sys_platform != \"win32\" and \
             extra == \"socks\"\n"
        ));
        assert!(rendered.contains("Provides-Extra: socks\n"));
        // the optional dependency is not in the unconditional list
        assert!(!rendered.contains("Requires-Dist: pysocks (>=1.5.6)\nRequires"));
    }

    #[test]
    fn test_metadata_is_deterministic() {
        let manifest = indoc! {r#"
            [project]
            name = "demo"
            version = "0.1"
            dependencies = ["b-pkg", "a-pkg"]
        "#};
        let first = render_metadata(&package_from(manifest)).unwrap();
        let second = render_metadata(&package_from(manifest)).unwrap();
        assert_eq!(first, second);
        // declaration order is preserved, not alphabetized
        let b = first.find("b-pkg").unwrap();
        let a = first.find("a-pkg").unwrap();
        assert!(b < a);
    }
}
