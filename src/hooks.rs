use crate::prelude::*;

use crate::build::{
    dist_info_files, wheel_tag, write_editable_wheel, write_sdist, write_wheel,
    BuildPlan,
};
use crate::manifest::Manifest;

// The frontend-facing hook surface. Each operation constructs a fresh
// object graph from the manifest -- there is no shared state between
// invocations -- and returns the name of what it wrote, relative to the
// directory it was handed.

pub type ConfigSettings = HashMap<String, String>;

pub struct Backend {
    root: PathBuf,
}

impl Backend {
    pub fn new(root: impl Into<PathBuf>) -> Backend {
        Backend { root: root.into() }
    }

    pub fn source_root(&self) -> &Path {
        &self.root
    }

    fn package(&self) -> Result<crate::manifest::Package> {
        Manifest::load(&self.root)
    }

    fn log_config(config: Option<&ConfigSettings>) {
        if let Some(config) = config {
            for (key, value) in config {
                debug!("config setting {}={}", key, value);
            }
        }
    }

    /// The backend is self-contained: building an sdist needs nothing
    /// beyond what is already running.
    pub fn get_requires_for_build_sdist(
        &self,
        config: Option<&ConfigSettings>,
    ) -> Result<Vec<String>> {
        Self::log_config(config);
        Ok(Vec::new())
    }

    /// Empty for pure wheels; when the manifest declares a build script the
    /// build-system requires come back so the frontend can install them.
    pub fn get_requires_for_build_wheel(
        &self,
        config: Option<&ConfigSettings>,
    ) -> Result<Vec<String>> {
        Self::log_config(config);
        let package = self.package()?;
        if package.build.script.is_some() {
            Ok(package.build.requires.clone())
        } else {
            Ok(Vec::new())
        }
    }

    /// Emit just the dist-info directory into `metadata_directory`; returns
    /// its name.
    pub fn prepare_metadata_for_build_wheel(
        &self,
        metadata_directory: &Path,
        config: Option<&ConfigSettings>,
    ) -> Result<String> {
        Self::log_config(config);
        let package = self.package()?;
        let dist_info = package.dist_info_name()?;
        let tag = wheel_tag(&package);
        let dir = metadata_directory.join(&dist_info);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating {}", dir.display()))?;

        let files = dist_info_files(&package, None, &tag)?;
        let mut rows: Vec<String> = Vec::new();
        for (name, contents) in &files {
            std::fs::write(dir.join(name), contents)
                .with_context(|| format!("writing {}/{}", dist_info, name))?;
            let digest = ring::digest::digest(&ring::digest::SHA256, contents);
            rows.push(format!(
                "{}/{},sha256={},{}\n",
                dist_info,
                name,
                data_encoding::BASE64URL_NOPAD.encode(digest.as_ref()),
                contents.len(),
            ));
        }
        rows.push(format!("{}/RECORD,,\n", dist_info));
        rows.sort();
        std::fs::write(dir.join("RECORD"), rows.concat())
            .with_context(|| format!("writing {}/RECORD", dist_info))?;
        Ok(dist_info)
    }

    pub fn build_sdist(
        &self,
        sdist_directory: &Path,
        config: Option<&ConfigSettings>,
    ) -> Result<String> {
        Self::log_config(config);
        let package = self.package()?;
        let plan = BuildPlan::new(&package, &self.root)?;
        write_sdist(&package, &plan, sdist_directory)
    }

    /// When `metadata_directory` is given, its METADATA bytes are reused
    /// verbatim; the contract is that they match what
    /// `prepare_metadata_for_build_wheel` would emit for this tree.
    pub fn build_wheel(
        &self,
        wheel_directory: &Path,
        config: Option<&ConfigSettings>,
        metadata_directory: Option<&Path>,
    ) -> Result<String> {
        Self::log_config(config);
        let package = self.package()?;
        let metadata = metadata_directory
            .map(|dir| read_prepared_metadata(dir))
            .transpose()?;
        let plan = BuildPlan::new(&package, &self.root)?;
        write_wheel(&package, &plan, wheel_directory, metadata)
    }

    /// Same artifact shape as build_wheel, but the payload is a loader stub
    /// that points the interpreter at the source tree.
    pub fn build_editable(
        &self,
        wheel_directory: &Path,
        config: Option<&ConfigSettings>,
        metadata_directory: Option<&Path>,
    ) -> Result<String> {
        Self::log_config(config);
        if metadata_directory.is_some() {
            debug!("editable build regenerates metadata; ignoring prepared dist-info");
        }
        let package = self.package()?;
        write_editable_wheel(&package, &self.root, wheel_directory)
    }
}

/// Locate the single `*.dist-info/METADATA` under a prepared metadata
/// directory.
fn read_prepared_metadata(metadata_directory: &Path) -> Result<Vec<u8>> {
    let mut candidates: Vec<PathBuf> = std::fs::read_dir(metadata_directory)
        .with_context(|| format!("listing {}", metadata_directory.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_dir()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.ends_with(".dist-info"))
                    .unwrap_or(false)
        })
        .collect();
    candidates.sort();
    match candidates.as_slice() {
        [single] => {
            let path = single.join("METADATA");
            std::fs::read(&path)
                .with_context(|| format!("reading {}", path.display()))
        }
        [] => bail!(
            "no .dist-info directory in {}",
            metadata_directory.display()
        ),
        _ => bail!(
            "multiple .dist-info directories in {}",
            metadata_directory.display()
        ),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use indoc::indoc;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("pyproject.toml"),
            indoc! {r#"
                [project]
                name = "demo"
                version = "0.1"
            "#},
        )
        .unwrap();
        std::fs::create_dir_all(dir.path().join("demo")).unwrap();
        std::fs::write(dir.path().join("demo/__init__.py"), "").unwrap();
        dir
    }

    #[test]
    fn test_get_requires() {
        let dir = fixture();
        let backend = Backend::new(dir.path());
        assert!(backend
            .get_requires_for_build_sdist(None)
            .unwrap()
            .is_empty());
        assert!(backend
            .get_requires_for_build_wheel(None)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_get_requires_with_build_script() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("pyproject.toml"),
            indoc! {r#"
                [build-system]
                requires = ["setuptools", "cffi"]

                [project]
                name = "demo"
                version = "0.1"

                [tool.wheelwright.build]
                script = "build.py"
            "#},
        )
        .unwrap();
        std::fs::create_dir_all(dir.path().join("demo")).unwrap();
        std::fs::write(dir.path().join("demo/__init__.py"), "").unwrap();

        let backend = Backend::new(dir.path());
        assert_eq!(
            backend.get_requires_for_build_wheel(None).unwrap(),
            vec!["setuptools".to_owned(), "cffi".to_owned()],
        );
    }

    #[test]
    fn test_prepare_metadata_then_build_wheel() {
        let dir = fixture();
        let backend = Backend::new(dir.path());

        let metadata_dir = tempfile::tempdir().unwrap();
        let dist_info = backend
            .prepare_metadata_for_build_wheel(metadata_dir.path(), None)
            .unwrap();
        assert_eq!(dist_info, "demo-0.1.dist-info");
        let metadata_path =
            metadata_dir.path().join(&dist_info).join("METADATA");
        assert!(metadata_path.is_file());
        let record = std::fs::read_to_string(
            metadata_dir.path().join(&dist_info).join("RECORD"),
        )
        .unwrap();
        assert!(record.contains("demo-0.1.dist-info/METADATA,sha256="));
        assert!(record.contains("demo-0.1.dist-info/RECORD,,\n"));

        // marker bytes prove the wheel reuses the prepared file verbatim
        let mut canned =
            std::fs::read_to_string(&metadata_path).unwrap();
        canned.push_str("X-Canary: prepared\n");
        std::fs::write(&metadata_path, &canned).unwrap();

        let wheel_dir = tempfile::tempdir().unwrap();
        let wheel_name = backend
            .build_wheel(wheel_dir.path(), None, Some(metadata_dir.path()))
            .unwrap();
        assert_eq!(wheel_name, "demo-0.1-py3-none-any.whl");

        let file =
            std::fs::File::open(wheel_dir.path().join(&wheel_name)).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        let mut entry =
            archive.by_name("demo-0.1.dist-info/METADATA").unwrap();
        let mut contents = String::new();
        use std::io::Read as _;
        entry.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, canned);
    }

    #[test]
    fn test_build_sdist_and_wheel_names() {
        let dir = fixture();
        let backend = Backend::new(dir.path());

        let out = tempfile::tempdir().unwrap();
        assert_eq!(
            backend.build_sdist(out.path(), None).unwrap(),
            "demo-0.1.tar.gz"
        );
        assert_eq!(
            backend.build_wheel(out.path(), None, None).unwrap(),
            "demo-0.1-py3-none-any.whl"
        );
        assert_eq!(
            backend.build_editable(out.path(), None, None).unwrap(),
            "demo-0.1-py3-none-any.whl"
        );
    }
}
