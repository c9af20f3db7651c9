use crate::prelude::*;

use super::metadata::render_metadata;
use super::plan::BuildPlan;
use crate::manifest::{Package, ScriptTarget};
use crate::util::{archive_epoch, civil_from_epoch};
use std::io::Write as _;
use zip::write::FileOptions;
use zip::CompressionMethod;

// The wheel: a zip whose bytes are pinned down the same way the sdist's
// are. Fixed DOS timestamps, fixed modes, fixed compression level, entries
// written in a fixed order, RECORD last.

const COMPRESSION_LEVEL: i32 = 6;

// Suffixes that are already compressed get stored as-is; deflating them
// again wastes time and can grow the archive.
const STORED_SUFFIXES: &[&str] = &[
    "bz2", "gif", "gz", "jpeg", "jpg", "png", "whl", "woff", "woff2", "xz",
    "zip",
];

pub fn wheel_tag(package: &Package) -> String {
    if package.build.script.is_some() {
        format!("py3-none-{}", host_platform_tag())
    } else {
        "py3-none-any".to_owned()
    }
}

/// Platform tag for the host, used when a build script makes the wheel
/// platform-specific. The backend never runs an interpreter, so this comes
/// from the host triple alone.
fn host_platform_tag() -> String {
    let arch = match std::env::consts::ARCH {
        "x86" => "i686",
        other => other,
    };
    match std::env::consts::OS {
        "linux" => format!("linux_{}", arch),
        "macos" => format!("macosx_11_0_{}", arch),
        "windows" => match arch {
            "x86_64" => "win_amd64".to_owned(),
            "i686" => "win32".to_owned(),
            other => format!("win_{}", other),
        },
        other => format!("{}_{}", other, arch),
    }
}

fn zip_timestamp() -> zip::DateTime {
    let (year, month, day, hour, minute, second) =
        civil_from_epoch(archive_epoch());
    // DOS timestamps start at 1980; anything earlier pins to the epoch of
    // the format itself.
    if year < 1980 {
        return zip::DateTime::default();
    }
    zip::DateTime::from_date_and_time(year, month, day, hour, minute, second)
        .unwrap_or_default()
}

fn options_for(name: &str) -> FileOptions {
    let already_compressed = name
        .rsplit('.')
        .next()
        .map(|suffix| STORED_SUFFIXES.contains(&suffix))
        .unwrap_or(false);
    let method = if already_compressed {
        CompressionMethod::Stored
    } else {
        CompressionMethod::Deflated
    };
    let mut options = FileOptions::default()
        .compression_method(method)
        .last_modified_time(zip_timestamp())
        .unix_permissions(0o644);
    if method == CompressionMethod::Deflated {
        options = options.compression_level(Some(COMPRESSION_LEVEL));
    }
    options
}

struct WheelArchive<W: std::io::Write + std::io::Seek> {
    zip: zip::ZipWriter<W>,
    record: Vec<(String, String, u64)>,
}

impl<W: std::io::Write + std::io::Seek> WheelArchive<W> {
    fn new(writer: W) -> WheelArchive<W> {
        WheelArchive {
            zip: zip::ZipWriter::new(writer),
            record: Vec::new(),
        }
    }

    fn add(&mut self, name: &str, contents: &[u8]) -> Result<()> {
        self.zip
            .start_file(name, options_for(name))
            .with_context(|| format!("archiving {}", name))?;
        self.zip.write_all(contents)?;
        let digest = ring::digest::digest(&ring::digest::SHA256, contents);
        self.record.push((
            name.to_owned(),
            format!(
                "sha256={}",
                data_encoding::BASE64URL_NOPAD.encode(digest.as_ref())
            ),
            contents.len() as u64,
        ));
        Ok(())
    }

    /// Write RECORD (with its own empty row) and close the archive.
    fn finish(mut self, dist_info: &str) -> Result<W> {
        let record_name = format!("{}/RECORD", dist_info);
        self.record.sort_by(|a, b| a.0.cmp(&b.0));
        let mut contents = String::new();
        let mut rows: Vec<(String, String, String)> = self
            .record
            .iter()
            .map(|(name, hash, size)| {
                (name.clone(), hash.clone(), size.to_string())
            })
            .collect();
        rows.push((record_name.clone(), String::new(), String::new()));
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        for (name, hash, size) in rows {
            contents.push_str(&format!("{},{},{}\n", name, hash, size));
        }
        self.zip
            .start_file(record_name.as_str(), options_for(&record_name))
            .with_context(|| format!("archiving {}", record_name))?;
        self.zip.write_all(contents.as_bytes())?;
        Ok(self.zip.finish()?)
    }
}

fn render_wheel_file(package: &Package, tag: &str) -> String {
    let purelib = package.build.script.is_none();
    format!(
        "Wheel-Version: 1.0\nGenerator: {} {}\nRoot-Is-Purelib: {}\nTag: {}\n",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        purelib,
        tag,
    )
}

fn script_sections(package: &Package) -> IndexMap<String, Vec<EntryPoint>> {
    let mut sections: IndexMap<String, Vec<EntryPoint>> = IndexMap::new();
    let callable_entries = |scripts: &IndexMap<String, ScriptTarget>| {
        scripts
            .iter()
            .filter_map(|(name, target)| match target {
                ScriptTarget::Callable { module, object } => Some(EntryPoint {
                    name: name.clone(),
                    module: module.clone(),
                    object: object.clone(),
                }),
                ScriptTarget::File { .. } => None,
            })
            .collect::<Vec<EntryPoint>>()
    };
    let console = callable_entries(&package.scripts);
    if !console.is_empty() {
        sections.insert("console_scripts".to_owned(), console);
    }
    let gui = callable_entries(&package.gui_scripts);
    if !gui.is_empty() {
        sections.insert("gui_scripts".to_owned(), gui);
    }
    for (group, entries) in &package.entry_points {
        let parsed: Vec<EntryPoint> = entries
            .iter()
            .filter_map(|(name, target)| {
                EntryPoint::from_target(name, target).ok()
            })
            .collect();
        if !parsed.is_empty() {
            sections.insert(group.clone(), parsed);
        }
    }
    sections
}

/// The dist-info files other than RECORD, in emission order. Shared by the
/// wheel writer, the editable writer, and the metadata-preparation hook;
/// `metadata` overrides METADATA generation when a frontend supplies the
/// bytes from a previous prepare step.
pub fn dist_info_files(
    package: &Package,
    metadata: Option<Vec<u8>>,
    tag: &str,
) -> Result<Vec<(String, Vec<u8>)>> {
    let mut files = Vec::new();
    let metadata = match metadata {
        Some(bytes) => bytes,
        None => render_metadata(package)?.into_bytes(),
    };
    files.push(("METADATA".to_owned(), metadata));
    files.push((
        "WHEEL".to_owned(),
        render_wheel_file(package, tag).into_bytes(),
    ));
    let sections = script_sections(package);
    if !sections.is_empty() {
        files.push((
            "entry_points.txt".to_owned(),
            render_entry_points(&sections).into_bytes(),
        ));
    }
    Ok(files)
}

fn write_wheel_archive(
    package: &Package,
    dest: &Path,
    metadata: Option<Vec<u8>>,
    payload: &[(String, Vec<u8>)],
    licenses: &[PathBuf],
) -> Result<String> {
    let version = package.version()?;
    let tag = wheel_tag(package);
    let dist_info = package.dist_info_name()?;
    let filename = format!(
        "{}-{}-{}.whl",
        package.dist_name(),
        version.filename(),
        tag,
    );

    let staging = tempfile::NamedTempFile::new_in(dest)
        .with_context(|| format!("creating output in {}", dest.display()))?;
    let mut archive = WheelArchive::new(staging);

    for (name, contents) in payload {
        archive.add(name, contents)?;
    }

    // Scripts declared as file references unpack into the data directory's
    // scripts/ area at install time.
    let data_dir =
        format!("{}-{}.data", package.dist_name(), version.filename());
    for (name, target) in &package.scripts {
        if let ScriptTarget::File { reference } = target {
            if !reference.is_file() {
                return Err(BackendError::InvalidReference {
                    path: format!("project.scripts.{}", name),
                    message: format!("{} does not exist", reference.display()),
                }
                .into());
            }
            let contents = std::fs::read(reference).with_context(|| {
                format!("reading script file {}", reference.display())
            })?;
            archive.add(&format!("{}/scripts/{}", data_dir, name), &contents)?;
        }
    }

    for license in licenses {
        let file_name = license
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("bad license filename"))?;
        let contents = std::fs::read(license).with_context(|| {
            format!("reading license file {}", license.display())
        })?;
        archive.add(
            &format!("{}/licenses/{}", dist_info, file_name),
            &contents,
        )?;
    }

    for (name, contents) in dist_info_files(package, metadata, &tag)? {
        archive.add(&format!("{}/{}", dist_info, name), &contents)?;
    }

    let mut staging = archive.finish(&dist_info)?;
    staging.flush()?;
    staging
        .persist(dest.join(&filename))
        .with_context(|| format!("writing {}", filename))?;
    Ok(filename)
}

pub fn write_wheel(
    package: &Package,
    plan: &BuildPlan,
    dest: &Path,
    metadata: Option<Vec<u8>>,
) -> Result<String> {
    let mut payload = Vec::new();
    for planned in &plan.wheel_files {
        let contents = std::fs::read(&planned.source).with_context(|| {
            format!("reading {}", planned.source.display())
        })?;
        payload.push((planned.archive.to_string(), contents));
    }
    write_wheel_archive(package, dest, metadata, &payload, &plan.licenses)
}

/// An editable wheel: no package payload, just a loader stub that makes the
/// source tree importable, plus the usual dist-info.
pub fn write_editable_wheel(
    package: &Package,
    root: &Path,
    dest: &Path,
) -> Result<String> {
    let mut source_dirs: Vec<String> = Vec::new();
    for (base, _) in super::plan::package_sources(package, root)? {
        let rendered = base.display().to_string();
        if !source_dirs.contains(&rendered) {
            source_dirs.push(rendered);
        }
    }
    let pth_name = format!("{}.pth", package.dist_name());
    let mut pth = String::new();
    for dir in &source_dirs {
        pth.push_str(dir);
        pth.push('\n');
    }
    let payload = vec![(pth_name, pth.into_bytes())];
    write_wheel_archive(package, dest, None, &payload, &[])
}
