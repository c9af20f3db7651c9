use crate::prelude::*;

use super::metadata::render_metadata;
use super::plan::BuildPlan;
use crate::manifest::Package;
use crate::util::archive_epoch;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write as _;

// The sdist: a gzipped tar whose bytes are a pure function of the source
// tree. Entry order, ownership, modes, and timestamps are all pinned down;
// gzip's own header timestamp is zero by default, which is exactly what we
// want.

enum Entry {
    Directory,
    File(Vec<u8>),
}

fn tar_header(mtime: u64) -> tar::Header {
    let mut header = tar::Header::new_ustar();
    header.set_uid(0);
    header.set_gid(0);
    header.set_mtime(mtime);
    // set_username/set_groupname only fail on oversized names; "" isn't.
    header.set_username("").unwrap();
    header.set_groupname("").unwrap();
    header
}

pub fn write_sdist(
    package: &Package,
    plan: &BuildPlan,
    dest: &Path,
) -> Result<String> {
    let version = package.version()?;
    let stem = format!("{}-{}", package.dist_name(), version.filename());
    let filename = format!("{}.tar.gz", stem);
    let mtime = archive_epoch();

    // Assemble every archive path (files plus the directories they imply)
    // up front so the whole archive can be emitted in one sorted pass.
    let mut entries: Vec<(ArchivePath, Entry)> = Vec::new();
    let mut directories: HashSet<ArchivePath> = HashSet::new();
    let mut add_file = |path: &ArchivePath, contents: Vec<u8>| {
        for ancestor in path.ancestors() {
            directories.insert(ancestor);
        }
        entries.push((path.clone(), Entry::File(contents)));
    };

    for planned in &plan.sdist_files {
        let contents = std::fs::read(&planned.source).with_context(|| {
            format!("reading {}", planned.source.display())
        })?;
        add_file(&planned.archive, contents);
    }
    let pkg_info: ArchivePath = "PKG-INFO".try_into().unwrap();
    add_file(&pkg_info, render_metadata(package)?.into_bytes());

    entries.extend(
        directories
            .into_iter()
            .map(|directory| (directory, Entry::Directory)),
    );
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let staging = tempfile::NamedTempFile::new_in(dest)
        .with_context(|| format!("creating output in {}", dest.display()))?;
    let encoder = GzEncoder::new(staging, Compression::new(6));
    let mut builder = tar::Builder::new(encoder);

    for (path, entry) in &entries {
        let archived = format!("{}/{}", stem, path);
        match entry {
            Entry::Directory => {
                let mut header = tar_header(mtime);
                header.set_entry_type(tar::EntryType::Directory);
                header.set_mode(0o755);
                header.set_size(0);
                builder
                    .append_data(
                        &mut header,
                        format!("{}/", archived),
                        std::io::empty(),
                    )
                    .with_context(|| format!("archiving {}", archived))?;
            }
            Entry::File(contents) => {
                let mut header = tar_header(mtime);
                header.set_entry_type(tar::EntryType::Regular);
                header.set_mode(0o644);
                header.set_size(contents.len() as u64);
                builder
                    .append_data(&mut header, &archived, contents.as_slice())
                    .with_context(|| format!("archiving {}", archived))?;
            }
        }
    }

    let encoder = builder
        .into_inner()
        .context("finishing tar stream")?;
    let mut staging = encoder.finish().context("finishing gzip stream")?;
    staging.flush()?;
    // Success: move the finished archive into place. On any earlier error
    // the temp file is dropped and removed, so no partial output survives.
    staging
        .persist(dest.join(&filename))
        .with_context(|| format!("writing {}", filename))?;

    Ok(filename)
}
