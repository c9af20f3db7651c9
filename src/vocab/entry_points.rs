use crate::prelude::*;

// Writer for entry_points.txt, the INI-shaped file inside .dist-info.
// Installers own the read side; a build backend only ever emits it, so the
// format knowledge here is one target grammar and one renderer.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    pub name: String,
    pub module: String,
    pub object: Option<String>,
}

impl EntryPoint {
    /// Build from a target string of the `mod.sub:callable` (or bare
    /// `mod.sub`) shape used by script declarations.
    pub fn from_target(name: &str, target: &str) -> Result<EntryPoint> {
        static TARGET: Lazy<Regex> = Lazy::new(|| {
            Regex::new(
                r"(?x)^
                  (?P<module> [a-zA-Z_][a-zA-Z0-9_]* (\.[a-zA-Z_][a-zA-Z0-9_]*)*)
                  (: (?P<object> [a-zA-Z_][a-zA-Z0-9_]* (\.[a-zA-Z_][a-zA-Z0-9_]*)*))?
                  $",
            )
            .unwrap()
        });
        let captures = TARGET
            .captures(target)
            .ok_or_else(|| anyhow!("invalid entry point target {:?}", target))?;
        Ok(EntryPoint {
            name: name.to_owned(),
            module: captures.name("module").unwrap().as_str().to_owned(),
            object: captures.name("object").map(|m| m.as_str().to_owned()),
        })
    }

    pub fn target(&self) -> String {
        match &self.object {
            Some(object) => format!("{}:{}", self.module, object),
            None => self.module.clone(),
        }
    }
}

/// Render sections in the given order. The output lands in the wheel, so
/// it has to be deterministic; order is preserved from the manifest.
pub fn render_entry_points(
    sections: &IndexMap<String, Vec<EntryPoint>>,
) -> String {
    let mut out = String::new();
    for (section, entries) in sections {
        if entries.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("[{}]\n", section));
        for entry in entries {
            out.push_str(&format!("{} = {}\n", entry.name, entry.target()));
        }
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use indoc::indoc;

    #[test]
    fn test_target_validation() {
        let ep = EntryPoint::from_target("demo", "demo.cli:main").unwrap();
        assert_eq!(ep.module, "demo.cli");
        assert_eq!(ep.object.as_deref(), Some("main"));
        assert_eq!(ep.target(), "demo.cli:main");

        let bare = EntryPoint::from_target("plug", "demo.plugin").unwrap();
        assert_eq!(bare.object, None);
        assert_eq!(bare.target(), "demo.plugin");

        assert!(EntryPoint::from_target("x", "1bad:main").is_err());
        assert!(EntryPoint::from_target("x", "demo:").is_err());
        assert!(EntryPoint::from_target("x", "demo:main:extra").is_err());
        assert!(EntryPoint::from_target("x", "demo/cli:main").is_err());
        assert!(EntryPoint::from_target("x", "").is_err());
    }

    #[test]
    fn test_render() {
        let mut sections = IndexMap::new();
        sections.insert(
            "console_scripts".to_owned(),
            vec![
                EntryPoint::from_target("demo", "demo.cli:main").unwrap(),
                EntryPoint::from_target("demo-admin", "demo.cli:admin").unwrap(),
            ],
        );
        sections.insert("empty".to_owned(), Vec::new());
        sections.insert(
            "demo.plugins".to_owned(),
            vec![EntryPoint::from_target("core", "demo.plugins.core").unwrap()],
        );
        let rendered = render_entry_points(&sections);
        let expected = indoc! {"
            [console_scripts]
            demo = demo.cli:main
            demo-admin = demo.cli:admin

            [demo.plugins]
            core = demo.plugins.core
        "};
        assert_eq!(rendered, expected);
    }
}
